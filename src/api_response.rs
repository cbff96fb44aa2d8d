/// The response envelope every auth endpoint speaks.
///
/// Both the server handlers and the client-side sender use this shape, so a
/// payload produced on one side deserializes unchanged on the other.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error_messages: Vec<String>,
}

impl ApiResponse {
    pub fn success(result: serde_json::Value) -> Self {
        Self {
            is_success: true,
            result: Some(result),
            error_messages: Vec::new(),
        }
    }

    /// A success acknowledgement with no payload (revoke, registration echo
    /// callers that ignore the body).
    pub fn accepted() -> Self {
        Self {
            is_success: true,
            result: None,
            error_messages: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            result: None,
            error_messages: vec![message.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_serializes_camel_case() {
        let envelope = ApiResponse::success(json!({"accessToken": "a"}));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["isSuccess"], true);
        assert_eq!(value["result"]["accessToken"], "a");
        assert_eq!(value["errorMessages"], json!([]));
    }

    #[test]
    fn failure_envelope_carries_message() {
        let envelope = ApiResponse::failure("Token Invalid");
        assert!(!envelope.is_success);
        assert_eq!(envelope.error_messages, vec!["Token Invalid".to_string()]);
        assert!(envelope.result.is_none());
    }

    #[test]
    fn envelope_round_trips() {
        let envelope = ApiResponse::success(json!({"id": 1}));
        let text = serde_json::to_string(&envelope).unwrap();
        let parsed: ApiResponse = serde_json::from_str(&text).unwrap();

        assert!(parsed.is_success);
        assert_eq!(parsed.result.unwrap()["id"], 1);
    }
}
