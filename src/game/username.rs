use rand::Rng;

/// Display names are capped server-side at 12 characters.
pub const MAX_USERNAME_LEN: usize = 12;

const ADJECTIVES: [&str; 10] = [
    "Swift", "Quick", "Clever", "Sharp", "Bright", "Smart", "Fast", "Keen", "Wise", "Bold",
];
const NOUNS: [&str; 10] = [
    "Ace", "Pro", "Star", "Bee", "Hawk", "Wolf", "Lynx", "Fox", "Owl", "Bear",
];

/// Strips everything outside `[A-Za-z0-9_-]` and truncates to the cap.
pub fn sanitize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_USERNAME_LEN)
        .collect()
}

/// Sanitized caller-provided name, or a random one when nothing usable
/// survives sanitization.
pub fn effective(raw: Option<&str>) -> String {
    let safe = sanitize(raw.unwrap_or(""));
    if safe.is_empty() {
        random_name()
    } else {
        safe
    }
}

/// Adjective + noun + number, already within the allowed charset.
pub fn random_name() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    let number = rng.gen_range(0..100u32);
    sanitize(&format!("{adjective}{noun}{number}"))
}
