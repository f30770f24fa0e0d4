use serde::{Deserialize, Serialize};

use crate::models::card::Card;

/// Full serialized copy of the in-progress client game state, keyed by the
/// local calendar date. A snapshot whose `date` is not today is stale and
/// must be discarded whole, never partially trusted.
///
/// Field names match the persisted layout of the web client so a stored
/// state survives an engine swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub date: String,
    #[serde(rename = "startAt", default)]
    pub start_at: Option<i64>,
    pub board: Vec<Card>,
    #[serde(default)]
    pub cleared: Vec<usize>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    #[serde(rename = "sessionToken", default)]
    pub session_token: Option<String>,
    #[serde(rename = "foundSets", default)]
    pub found_sets: Vec<[Card; 3]>,
}

/// Same-day completion record retained for the summary overlay after the
/// active-session snapshot has been deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSnapshot {
    pub date: String,
    #[serde(rename = "foundSets", default)]
    pub found_sets: Vec<[Card; 3]>,
}
