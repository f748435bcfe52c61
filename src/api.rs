//! Chat history over the REST side of the backend.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::common::{Message, MessageSender};

/// Uniform error for failed REST calls. `status` is 0 when no response
/// arrived at all.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("API error {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    /// Builds the error from a non-success response body, preferring the
    /// server's own `message`/`error` text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|value| value.get("message").or_else(|| value.get("error")))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                StatusCode::from_u16(status)
                    .ok()
                    .and_then(|code| code.canonical_reason())
                    .unwrap_or("Request failed")
                    .to_string()
            });
        let details = parsed.and_then(|value| value.get("details").cloned());

        Self {
            status,
            message,
            details,
        }
    }

    fn network(err: reqwest::Error) -> Self {
        Self {
            status: err.status().map(|code| code.as_u16()).unwrap_or(0),
            message: err.to_string(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(alias = "_id")]
    pub conversation_id: String,
    #[serde(default)]
    pub participants: Vec<MessageSender>,
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    pub async fn get_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.get("chat/conversations").await
    }

    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        self.get(&format!("chat/conversations/{conversation_id}/messages"))
            .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = join_url(&self.base_url, path);
        log::debug!("GET {url}");

        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(ApiError::network)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::network)?;
        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &body);
            log::warn!("GET {url} failed: {err}");
            return Err(err);
        }
        decode_data(status.as_u16(), &body)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Accepts either a bare payload or the `{ "data": ... }` envelope.
fn decode_data<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    let invalid = |reason: String| ApiError {
        status,
        message: "invalid response body".to_string(),
        details: Some(Value::String(reason)),
    };

    let value: Value = serde_json::from_str(body).map_err(|err| invalid(err.to_string()))?;
    let payload = match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(payload).map_err(|err| invalid(err.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_prefers_server_message() {
        let err = ApiError::from_response(
            422,
            r#"{"message":"Validation failed","details":{"field":"budget"}}"#,
        );
        assert_eq!(err.status, 422);
        assert_eq!(err.message, "Validation failed");
        assert_eq!(err.details, Some(json!({"field": "budget"})));
    }

    #[test]
    fn error_reads_error_field() {
        let err = ApiError::from_response(401, r#"{"error":"Token expired"}"#);
        assert_eq!(err.message, "Token expired");
        assert_eq!(err.details, None);
    }

    #[test]
    fn error_falls_back_to_status_text() {
        let err = ApiError::from_response(503, "<html>bad gateway</html>");
        assert_eq!(err.message, "Service Unavailable");
        assert_eq!(err.to_string(), "API error 503: Service Unavailable");
    }

    #[test]
    fn decodes_enveloped_and_bare_payloads() {
        let bare: Vec<u32> = decode_data(200, "[1,2,3]").unwrap();
        assert_eq!(bare, vec![1, 2, 3]);

        let wrapped: Vec<u32> = decode_data(200, r#"{"success":true,"data":[4]}"#).unwrap();
        assert_eq!(wrapped, vec![4]);

        let err = decode_data::<Vec<u32>>(200, "nope").unwrap_err();
        assert_eq!(err.message, "invalid response body");
    }

    #[test]
    fn conversation_from_server_shape() {
        let raw = r#"{
            "_id": "c1",
            "participants": [{"userId": "u1", "name": "Ada", "username": "ada"}],
            "unreadCount": 3
        }"#;
        let conversation: Conversation = serde_json::from_str(raw).unwrap();
        assert_eq!(conversation.conversation_id, "c1");
        assert_eq!(conversation.unread_count, 3);
        assert!(conversation.last_message.is_none());
    }

    #[test]
    fn joins_urls_without_double_slashes() {
        assert_eq!(
            join_url("http://host/api/", "/chat/conversations"),
            "http://host/api/chat/conversations"
        );
    }
}
