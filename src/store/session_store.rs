use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::logger;
use crate::models::snapshot::{CompletionSnapshot, PersistedSnapshot};

const SESSION_KEY: &str = "session_v1.json";
const COMPLETED_KEY: &str = "completed_v1.json";
const USERNAME_KEY: &str = "last_username";

/// The only code path that touches local persistence.
///
/// Writes are best-effort: a failed write is logged and swallowed, the
/// session simply degrades to "must restart" on the next visit. Reads
/// return `None` on missing, corrupt or stale data.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Today's local calendar date, the staleness boundary for snapshots.
    pub fn today() -> String {
        Local::now().format("%Y-%m-%d").to_string()
    }

    /// A snapshot dated anything but today must be discarded whole.
    pub fn is_stale(snapshot: &PersistedSnapshot) -> bool {
        snapshot.date != Self::today()
    }

    pub fn persist_session(&self, snapshot: &PersistedSnapshot) {
        self.write_json(SESSION_KEY, snapshot);
    }

    /// Loads the active-session snapshot. Stale snapshots are deleted and
    /// reported as absent, enforcing the daily-reset boundary in one place.
    pub fn load_session(&self) -> Option<PersistedSnapshot> {
        let snapshot: PersistedSnapshot = self.read_json(SESSION_KEY)?;
        if Self::is_stale(&snapshot) {
            self.clear_session();
            return None;
        }
        Some(snapshot)
    }

    pub fn clear_session(&self) {
        let _ = fs::remove_file(self.path(SESSION_KEY));
    }

    pub fn persist_completion(&self, snapshot: &CompletionSnapshot) {
        self.write_json(COMPLETED_KEY, snapshot);
    }

    /// Same-day completion record, if any. Records from earlier days are
    /// reported as absent.
    pub fn load_completion(&self) -> Option<CompletionSnapshot> {
        let snapshot: CompletionSnapshot = self.read_json(COMPLETED_KEY)?;
        if snapshot.date != Self::today() {
            return None;
        }
        Some(snapshot)
    }

    /// Remembers the last-used display name for prefill.
    pub fn remember_username(&self, name: &str) {
        if let Err(error) = self.try_write(USERNAME_KEY, name.as_bytes()) {
            logger!(WARN, "[STORE] Failed to persist `{USERNAME_KEY}`: {error}");
        }
    }

    pub fn last_username(&self) -> Option<String> {
        let bytes = fs::read(self.path(USERNAME_KEY)).ok()?;
        let name = String::from_utf8(bytes).ok()?;
        if name.is_empty() {
            return None;
        }
        Some(name)
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) {
        let result = serde_json::to_vec(value)
            .map_err(io::Error::from)
            .and_then(|bytes| self.try_write(key, &bytes));
        if let Err(error) = result {
            logger!(WARN, "[STORE] Failed to persist `{key}`: {error}");
        }
    }

    fn try_write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), bytes)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = fs::read(self.path(key)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

impl AsRef<Path> for SessionStore {
    fn as_ref(&self) -> &Path {
        &self.dir
    }
}
