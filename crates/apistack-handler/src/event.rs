//! Proxy event and response records exchanged with the gateway.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::HandlerResult;

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub request_id: String,
    pub stage: String,
    /// Milliseconds since the Unix epoch when the gateway received the request.
    #[serde(default)]
    pub request_time_epoch: i64,
}

/// A request as the gateway forwards it to the function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEvent {
    pub http_method: String,
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub query_string_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub request_context: RequestContext,
}

impl ProxyEvent {
    pub fn new(http_method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_method: http_method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_request_context(mut self, request_id: impl Into<String>, stage: impl Into<String>) -> Self {
        self.request_context = RequestContext {
            request_id: request_id.into(),
            stage: stage.into(),
            ..RequestContext::default()
        };
        self
    }
}

/// What the function returns to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ProxyResponse {
    /// A JSON response.
    pub fn json<T: Serialize>(status_code: u16, body: &T) -> HandlerResult<Self> {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string());
        Ok(Self {
            status_code,
            headers,
            body: serde_json::to_string(body)?,
        })
    }

    /// `{"message": ...}` with the given status.
    pub fn message(status_code: u16, message: impl Into<String>) -> HandlerResult<Self> {
        Self::json(status_code, &MessageBody { message: message.into() })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_decodes_with_defaults() {
        let e: ProxyEvent = serde_json::from_str(r#"{"httpMethod":"GET","path":"/api"}"#).unwrap();
        assert_eq!(e.http_method, "GET");
        assert!(e.body.is_none());
        assert!(e.headers.is_empty());
    }

    #[test]
    fn json_response_sets_content_type() {
        let r = ProxyResponse::message(400, "bad").unwrap();
        assert_eq!(r.headers["Content-Type"], "application/json");
        assert_eq!(r.body, r#"{"message":"bad"}"#);
        assert!(!r.is_success());
    }
}
