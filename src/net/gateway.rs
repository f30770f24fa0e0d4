use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::models::card::Card;
use crate::models::requests::{StartSessionRequest, SubmitSetRequest};
use crate::models::responses::{
    ActiveSessionResponse, DailyBoardResponse, ErrorDetail, FoundSetsResponse,
    LeaderboardResponse, StartSessionResponse, StatusResponse,
};
use crate::models::settings::Settings;
use crate::utils::errors::GatewayError;

/// The HTTP contract the game engine requires from the backend.
///
/// Injected into the session so tests can run against a canned gateway.
#[allow(async_fn_in_trait)]
pub trait Gateway {
    async fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<StartSessionResponse, GatewayError>;

    async fn daily_board(&self) -> Result<Vec<Card>, GatewayError>;

    async fn active_session(&self) -> Result<ActiveSessionResponse, GatewayError>;

    async fn submit_set(
        &self,
        request: &SubmitSetRequest,
    ) -> Result<serde_json::Value, GatewayError>;

    async fn status(&self) -> Result<StatusResponse, GatewayError>;

    async fn leaderboard(
        &self,
        date: Option<&str>,
        limit: Option<u32>,
    ) -> Result<LeaderboardResponse, GatewayError>;

    async fn found_sets(
        &self,
        username: &str,
        date: Option<&str>,
    ) -> Result<FoundSetsResponse, GatewayError>;
}

/// reqwest-backed gateway with a client-side timeout on every request.
pub struct HttpGateway {
    base_url: String,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(settings: &Settings) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(|error| GatewayError::Setup(error.to_string()))?;
        Ok(Self {
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_transport(error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Network(error.to_string())
        }
    }

    /// Maps a response to the error taxonomy: 2xx parses the body, 4xx
    /// carries the server's `detail` text, everything else is opaque.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|error| GatewayError::InvalidBody(error.to_string()));
        }
        if status.is_client_error() {
            let detail = response
                .json::<ErrorDetail>()
                .await
                .ok()
                .and_then(|body| body.detail)
                .unwrap_or_else(|| canned_detail(status));
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }
        Err(GatewayError::Status(status.as_u16()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::read_json(response).await
    }

    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::read_json(response).await
    }
}

fn canned_detail(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("request rejected")
        .to_string()
}

impl Gateway for HttpGateway {
    async fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<StartSessionResponse, GatewayError> {
        self.post_json("/api/start_session", request).await
    }

    async fn daily_board(&self) -> Result<Vec<Card>, GatewayError> {
        let response: DailyBoardResponse = self.get_json("/api/daily", &[]).await?;
        Ok(response.board)
    }

    async fn active_session(&self) -> Result<ActiveSessionResponse, GatewayError> {
        self.get_json("/api/session", &[]).await
    }

    async fn submit_set(
        &self,
        request: &SubmitSetRequest,
    ) -> Result<serde_json::Value, GatewayError> {
        self.post_json("/api/submit_set", request).await
    }

    async fn status(&self) -> Result<StatusResponse, GatewayError> {
        self.get_json("/api/status", &[]).await
    }

    async fn leaderboard(
        &self,
        date: Option<&str>,
        limit: Option<u32>,
    ) -> Result<LeaderboardResponse, GatewayError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.get_json("/api/leaderboard", &query).await
    }

    async fn found_sets(
        &self,
        username: &str,
        date: Option<&str>,
    ) -> Result<FoundSetsResponse, GatewayError> {
        let mut query: Vec<(&str, String)> = vec![("username", username.to_string())];
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }
        self.get_json("/api/found_sets", &query).await
    }
}
