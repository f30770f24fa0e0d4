use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::game::board::{BoardState, RemovalPolicy};
use crate::game::username;
use crate::game::validator::is_valid_set;
use crate::logger;
use crate::models::card::Card;
use crate::models::requests::{StartSessionRequest, SubmitSetRequest};
use crate::models::settings::Settings;
use crate::models::snapshot::{CompletionSnapshot, PersistedSnapshot};
use crate::net::gateway::Gateway;
use crate::store::session_store::SessionStore;
use crate::utils::errors::GatewayError;

const DEFAULT_CLOCK_SKEW_MS: i64 = 3_000;
const DEFAULT_QUERY_THROTTLE: Duration = Duration::from_millis(200);

/// Where the session is in its lifecycle. One authoritative tag instead
/// of inferring state from a handful of nullable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    Starting,
    Active,
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Complete => "complete",
        }
    }
}

/// Opaque server-issued session identity plus submission capability.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub session_id: String,
    pub session_token: Option<String>,
}

/// Outcome of a start request, for the welcome message.
#[derive(Debug, Clone)]
pub struct StartedSession {
    pub username: String,
    pub session_id: Option<String>,
}

/// Outcome of submitting the current selection. Everything but
/// `Accepted` is a user-facing, non-fatal condition.
#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted(serde_json::Value),
    /// Local pre-check failed; the gateway was never contacted.
    NotASet,
    /// Selection did not hold exactly three cards.
    NeedThree,
    /// The gateway turned the submission down.
    Rejected { detail: String },
}

/// Orchestrates the session lifecycle: start, server reconciliation,
/// resumption, submission and the completion transition. Owns the board
/// and is the only writer of persisted snapshots.
pub struct GameSession<G: Gateway> {
    gateway: G,
    store: SessionStore,
    board: BoardState,
    phase: Phase,
    start_at: Option<i64>,
    credentials: Option<Credentials>,
    found_sets: Vec<[Card; 3]>,
    clock_skew_ms: i64,
    query_throttle: Duration,
    last_session_query: Option<Instant>,
}

impl<G: Gateway> GameSession<G> {
    pub fn new(gateway: G, store: SessionStore) -> Self {
        Self {
            gateway,
            store,
            board: BoardState::new(),
            phase: Phase::NotStarted,
            start_at: None,
            credentials: None,
            found_sets: Vec::new(),
            clock_skew_ms: DEFAULT_CLOCK_SKEW_MS,
            query_throttle: DEFAULT_QUERY_THROTTLE,
            last_session_query: None,
        }
    }

    pub fn from_settings(gateway: G, store: SessionStore, settings: &Settings) -> Self {
        let mut session = Self::new(gateway, store);
        session.clock_skew_ms = settings.clock_skew_ms;
        session.query_throttle = Duration::from_millis(settings.session_query_throttle_ms);
        session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            logger!(
                DEBUG,
                "[SESSION] Phase `{}` -> `{}`",
                self.phase.as_str(),
                phase.as_str()
            );
        }
        self.phase = phase;
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn start_at(&self) -> Option<i64> {
        self.start_at
    }

    pub fn session_id(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.session_id.as_str())
    }

    pub fn found_sets(&self) -> &[[Card; 3]] {
        &self.found_sets
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Starts (or restarts) a session with the gateway.
    ///
    /// The daily-board fetch is best-effort: on failure the board already
    /// in memory is kept so the start transition never hard-fails over a
    /// flaky board endpoint. Safe to call twice; re-adopting the same
    /// authoritative board is idempotent.
    pub async fn start(&mut self, username: Option<&str>) -> Result<StartedSession, GatewayError> {
        let name = username::effective(username);
        let previous = self.phase;
        self.set_phase(Phase::Starting);
        logger!(INFO, "[SESSION] Starting session as `{name}`");

        let request = StartSessionRequest {
            username: name.clone(),
        };
        let response = match self.gateway.start_session(&request).await {
            Ok(response) => response,
            Err(error) => {
                self.set_phase(previous);
                return Err(error);
            }
        };

        self.store.remember_username(&name);
        self.credentials = response.session_id.clone().map(|session_id| Credentials {
            session_id,
            session_token: response.session_token.clone(),
        });

        let now = now_ms();
        self.start_at = Some(resolve_start_time(
            response.start_ts.as_deref(),
            None,
            now,
            self.clock_skew_ms,
        ));

        match self.gateway.daily_board().await {
            Ok(cards) if !cards.is_empty() => self.board.adopt(cards),
            Ok(_) => {}
            Err(error) => {
                logger!(
                    WARN,
                    "[SESSION] Daily board fetch failed, keeping current board ({error})"
                );
            }
        }

        self.set_phase(Phase::Active);
        self.persist_snapshot();
        self.sync_completion();
        Ok(StartedSession {
            username: name,
            session_id: self.credentials.as_ref().map(|c| c.session_id.clone()),
        })
    }

    /// Resume on load. Precedence: active server session, then same-day
    /// local snapshot, else stay `NotStarted` without fetching the board
    /// (an unstarted viewer must not see today's puzzle).
    pub async fn resume(&mut self) -> bool {
        let saved_start = self.store.load_session().and_then(|saved| saved.start_at);
        if self.resume_from_server(saved_start).await {
            return true;
        }
        if self.restore_from_snapshot() {
            return true;
        }
        false
    }

    async fn resume_from_server(&mut self, saved_start: Option<i64>) -> bool {
        // Rapid re-render storms must not hammer the session endpoint.
        if let Some(at) = self.last_session_query {
            if at.elapsed() < self.query_throttle {
                return false;
            }
        }
        let response = match self.gateway.active_session().await {
            Ok(response) => response,
            Err(error) => {
                logger!(DEBUG, "[SESSION] Active-session query failed ({error})");
                return false;
            }
        };
        self.last_session_query = Some(Instant::now());

        if !response.active {
            return false;
        }
        let Some(cards) = response.board.filter(|board| !board.is_empty()) else {
            return false;
        };

        logger!(INFO, "[SESSION] Resuming server session");
        self.board.adopt(cards);
        // The server board is authoritative; offline clearing state does
        // not apply to it.
        self.board.reset_cleared();
        self.credentials = response.session_id.clone().map(|session_id| Credentials {
            session_id,
            session_token: None,
        });

        let now = now_ms();
        self.start_at = Some(resolve_start_time(
            response.start_ts.as_deref(),
            saved_start,
            now,
            self.clock_skew_ms,
        ));
        self.set_phase(Phase::Active);
        self.persist_snapshot();
        self.sync_completion();
        true
    }

    fn restore_from_snapshot(&mut self) -> bool {
        let Some(saved) = self.store.load_session() else {
            return false;
        };
        // No start time means the player never pressed start; do not
        // silently resume into a board state.
        let Some(start_at) = saved.start_at else {
            return false;
        };
        if saved.board.is_empty() {
            return false;
        }

        logger!(INFO, "[SESSION] Restoring local snapshot from {}", saved.date);
        self.board.restore(saved.board, saved.cleared);
        self.start_at = Some(start_at);
        self.credentials = saved.session_id.map(|session_id| Credentials {
            session_id,
            session_token: saved.session_token,
        });
        self.found_sets = saved.found_sets;
        self.set_phase(Phase::Active);
        self.sync_completion();
        true
    }

    pub fn toggle_select(&mut self, index: usize) {
        self.board.toggle_select(index);
    }

    /// Submits the selected triplet.
    ///
    /// An invalid triplet is rejected locally without a network call. A
    /// gateway failure without a session is annotated with a start hint,
    /// since the likely cause is the missing session rather than the set
    /// itself.
    pub async fn submit_selected(&mut self) -> Result<SubmitOutcome, GatewayError> {
        let Some(indices) = self.board.selected_triplet() else {
            return Ok(SubmitOutcome::NeedThree);
        };
        let Some(cards) = self.board.selected_cards() else {
            return Ok(SubmitOutcome::NotASet);
        };
        if !is_valid_set(&cards[0], &cards[1], &cards[2]) {
            return Ok(SubmitOutcome::NotASet);
        }

        let request = SubmitSetRequest {
            indices: indices.to_vec(),
            session_id: self.credentials.as_ref().map(|c| c.session_id.clone()),
            session_token: self
                .credentials
                .as_ref()
                .and_then(|c| c.session_token.clone()),
            seconds: if self.credentials.is_some() {
                self.elapsed_seconds()
            } else {
                None
            },
        };

        match self.gateway.submit_set(&request).await {
            Ok(data) => {
                self.found_sets.push(cards);
                let policy = if self.credentials.is_some() {
                    RemovalPolicy::Splice
                } else {
                    RemovalPolicy::MarkCleared
                };
                self.board.apply_match(indices, policy);
                self.persist_snapshot();
                self.sync_completion();
                Ok(SubmitOutcome::Accepted(data))
            }
            Err(_) if self.credentials.is_none() => Ok(SubmitOutcome::Rejected {
                detail: "Tip: start a game to keep server and client boards in sync.".to_string(),
            }),
            Err(error) if error.is_user_facing() => Ok(SubmitOutcome::Rejected {
                detail: error.to_string(),
            }),
            Err(error) => Err(error),
        }
    }

    /// Whole seconds since the session started, clamped to zero. `None`
    /// before a start.
    pub fn elapsed_seconds(&self) -> Option<u64> {
        let start = self.start_at?;
        let delta = now_ms().saturating_sub(start);
        Some((delta.max(0) / 1_000) as u64)
    }

    /// Derived completion: started, at least three cards on the board and
    /// no valid triplet left among non-cleared cards. A pure function of
    /// current state, never a stored flag.
    pub fn complete(&self) -> bool {
        self.start_at.is_some()
            && self.board.cards().len() >= 3
            && !self.board.has_remaining_sets()
    }

    fn sync_completion(&mut self) {
        if self.phase != Phase::Active || !self.complete() {
            return;
        }
        self.set_phase(Phase::Complete);
        logger!(
            INFO,
            "[SESSION] Puzzle complete with {} found sets",
            self.found_sets.len()
        );
        self.store.persist_completion(&CompletionSnapshot {
            date: SessionStore::today(),
            found_sets: self.found_sets.clone(),
        });
        // Deleting the active snapshot forces a fresh session next visit.
        self.store.clear_session();
    }

    fn persist_snapshot(&self) {
        let mut cleared: Vec<usize> = self.board.cleared().iter().copied().collect();
        cleared.sort_unstable();
        self.store.persist_session(&PersistedSnapshot {
            date: SessionStore::today(),
            start_at: self.start_at,
            board: self.board.cards().to_vec(),
            cleared,
            session_id: self.credentials.as_ref().map(|c| c.session_id.clone()),
            session_token: self
                .credentials
                .as_ref()
                .and_then(|c| c.session_token.clone()),
            found_sets: self.found_sets.clone(),
        });
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn parse_timestamp_ms(ts: &str) -> Option<i64> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(ts) {
        return Some(parsed.timestamp_millis());
    }
    // Some backends emit naive ISO timestamps without an offset.
    ts.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Effective start-time resolution.
///
/// Prefers the server timestamp, then the locally cached start, then the
/// local clock. A result more than `skew_ms` ahead of the local clock is
/// discarded (a fast server clock would make the elapsed timer negative)
/// in favor of the fallback or the local clock.
pub(crate) fn resolve_start_time(
    server_ts: Option<&str>,
    fallback: Option<i64>,
    now_ms: i64,
    skew_ms: i64,
) -> i64 {
    let parsed = server_ts.and_then(parse_timestamp_ms);
    let effective = parsed.or(fallback).unwrap_or(now_ms);
    if effective - now_ms > skew_ms {
        return fallback
            .filter(|saved| saved - now_ms <= skew_ms)
            .unwrap_or(now_ms);
    }
    effective
}
