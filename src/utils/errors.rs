use thiserror::Error;

/// Failures talking to the game backend over HTTP.
///
/// Timeouts are kept distinct from other transport failures so the UI can
/// tell a slow server apart from a dead one. `Rejected` carries the
/// server-provided detail text from a 4xx response and is the only variant
/// suitable for showing to the player verbatim.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request timed out")]
    Timeout,
    #[error("{detail}")]
    Rejected { status: u16, detail: String },
    #[error("gateway returned status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response body: {0}")]
    InvalidBody(String),
    #[error("could not build http client: {0}")]
    Setup(String),
}

impl GatewayError {
    /// Whether the error message is safe to surface to the player as-is.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Failures loading client settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
