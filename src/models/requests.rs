use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StartSessionRequest {
    pub username: String,
}

/// Body for `POST /api/submit_set`.
///
/// Session fields are omitted entirely in no-session play; `seconds` is
/// only sent alongside session credentials since elapsed time has no
/// authority without a server session.
#[derive(Debug, Serialize)]
pub struct SubmitSetRequest {
    pub indices: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_submit_request_omits_absent_session_fields() {
        let request = SubmitSetRequest {
            indices: vec![0, 1, 2],
            session_id: None,
            session_token: None,
            seconds: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"indices":[0,1,2]}"#);
    }

    #[test]
    fn test_submit_request_includes_session_fields_when_present() {
        let request = SubmitSetRequest {
            indices: vec![4, 7, 9],
            session_id: Some("s1".to_string()),
            session_token: Some("t1".to_string()),
            seconds: Some(42),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["session_id"], "s1");
        assert_eq!(json["session_token"], "t1");
        assert_eq!(json["seconds"], 42);
    }
}
