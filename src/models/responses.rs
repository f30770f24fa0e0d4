use serde::Deserialize;

use crate::models::card::Card;

/// Response of `POST /api/start_session`.
///
/// `start_ts` is optional; when absent (or unparseable) the client falls
/// back to its own clock.
#[derive(Debug, Clone, Deserialize)]
pub struct StartSessionResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub start_ts: Option<String>,
}

/// Response of `GET /api/session`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActiveSessionResponse {
    pub active: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub start_ts: Option<String>,
    #[serde(default)]
    pub board: Option<Vec<Card>>,
}

/// Response of `GET /api/daily`.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyBoardResponse {
    pub board: Vec<Card>,
}

/// Response of `GET /api/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub date: String,
    pub completed: bool,
    #[serde(default)]
    pub seconds: Option<u64>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub placement: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Leader {
    pub username: String,
    pub best: u64,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// Response of `GET /api/leaderboard`.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardResponse {
    pub date: String,
    pub leaders: Vec<Leader>,
}

/// Response of `GET /api/found_sets`.
#[derive(Debug, Clone, Deserialize)]
pub struct FoundSetsResponse {
    pub username: String,
    pub date: String,
    pub sets: Vec<Vec<Card>>,
}

/// Error body shape of 4xx responses: `{"detail": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<String>,
}
