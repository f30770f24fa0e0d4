use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Versioned realtime message wrapper carried over the `/ws` socket.
///
/// `id` and `ts` are auto-populated on send if absent. The `date` field is
/// not part of the envelope proper but the backend's direct event form
/// places it at the top level, so it is captured here too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<u8>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Envelope {
    pub fn new(kind: &str) -> Self {
        Self {
            v: None,
            kind: kind.to_string(),
            room: None,
            from: None,
            id: None,
            ts: None,
            date: None,
            payload: None,
        }
    }

    /// Fills `v`, `id` and `ts` if the caller left them empty.
    pub fn fill_defaults(&mut self) {
        if self.v.is_none() {
            self.v = Some(1);
        }
        if self.id.is_none() {
            self.id = Some(Uuid::new_v4().to_string());
        }
        if self.ts.is_none() {
            self.ts = Some(Utc::now().to_rfc3339());
        }
    }

    /// Interprets this envelope as a game push event, if it is one.
    ///
    /// Supports both the direct form (`type` on the envelope itself) and
    /// the broker-wrapped form where the event object is nested under
    /// `payload`.
    pub fn game_event(&self) -> Option<GameEvent> {
        if let Some(kind) = EventKind::parse(&self.kind) {
            return Some(GameEvent {
                kind,
                date: self.date.clone(),
            });
        }
        let payload = self.payload.as_ref()?;
        let nested = payload
            .get("event")
            .or_else(|| payload.get("type"))?
            .as_str()?;
        let kind = EventKind::parse(nested)?;
        let date = payload
            .get("date")
            .and_then(|value| value.as_str())
            .map(str::to_string);
        Some(GameEvent { kind, date })
    }
}

/// Recognized inbound push event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Another player finished today's puzzle.
    Completion,
    /// Leaderboard standings changed; consumers should refetch.
    LeaderboardChange,
    /// The daily board rotated.
    DailyUpdate,
}

impl EventKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "completion" => Some(Self::Completion),
            "leaderboard_change" => Some(Self::LeaderboardChange),
            "daily_update" => Some(Self::DailyUpdate),
            _ => None,
        }
    }
}

/// A classified push event. Carries no authoritative state; it only tells
/// the consumer what to refetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEvent {
    pub kind: EventKind,
    pub date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fill_defaults_populates_missing_fields() {
        let mut envelope = Envelope::new("subscribe");
        envelope.fill_defaults();
        assert_eq!(envelope.v, Some(1));
        assert!(envelope.id.is_some());
        assert!(envelope.ts.is_some());
    }

    #[test]
    fn test_fill_defaults_keeps_existing_id() {
        let mut envelope = Envelope::new("action");
        envelope.id = Some("fixed".to_string());
        envelope.fill_defaults();
        assert_eq!(envelope.id.as_deref(), Some("fixed"));
    }

    #[test]
    fn test_direct_event_form() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"type":"completion","date":"2026-08-25","username":"Bee"}"#)
                .unwrap();
        let event = envelope.game_event().unwrap();
        assert_eq!(event.kind, EventKind::Completion);
        assert_eq!(event.date.as_deref(), Some("2026-08-25"));
    }

    #[test]
    fn test_broker_wrapped_event_form() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"v":1,"type":"update","room":"daily","id":"x","ts":"2026-08-25T10:00:00Z","payload":{"event":"leaderboard_change","date":"2026-08-25"}}"#,
        )
        .unwrap();
        let event = envelope.game_event().unwrap();
        assert_eq!(event.kind, EventKind::LeaderboardChange);
        assert_eq!(event.date.as_deref(), Some("2026-08-25"));
    }

    #[test]
    fn test_wrapped_event_with_type_key() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"type":"update","payload":{"type":"daily_update","date":"2026-08-26"}}"#,
        )
        .unwrap();
        let event = envelope.game_event().unwrap();
        assert_eq!(event.kind, EventKind::DailyUpdate);
    }

    #[test]
    fn test_unrecognized_event_is_none() {
        let envelope: Envelope = serde_json::from_str(r#"{"type":"pong"}"#).unwrap();
        assert_eq!(envelope.game_event(), None);
    }
}
