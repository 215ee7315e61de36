//! The greeting function.
//!
//! `GET` answers with a fresh id, a bcrypt credential derived from it, the
//! caller's display name and a greeting quoting the runtime version. `POST`
//! accepts a JSON array of content items.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::credential;
use crate::error::{HandlerError, HandlerResult};
use crate::event::{ProxyEvent, ProxyResponse};
use crate::runtime::VersionProvider;

/// Display name used when none is configured.
pub const DEFAULT_DISPLAY_NAME: &str = "sam.leung";

/// Anything that turns a proxy event into a proxy response.
///
/// Client mistakes come back as `Ok` responses with a 4xx status. `Err` means
/// the function itself failed.
pub trait ProxyHandler: Send + Sync {
    fn handle(&self, event: &ProxyEvent) -> HandlerResult<ProxyResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub full_name: String,
}

impl User {
    /// The full name is the display name with an exclamation mark.
    pub fn from_display_name(name: &str) -> Self {
        Self {
            full_name: format!("{name}!"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    pub uuid: String,
    pub key: String,
    pub user: User,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeAck {
    pub accepted: usize,
    pub message: String,
}

pub struct GreetingHandler {
    display_name: String,
    version: Arc<dyn VersionProvider>,
    cost: u32,
}

impl std::fmt::Debug for GreetingHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GreetingHandler")
            .field("display_name", &self.display_name)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

impl GreetingHandler {
    pub fn new(display_name: impl Into<String>, version: Arc<dyn VersionProvider>) -> Self {
        Self {
            display_name: display_name.into(),
            version,
            cost: credential::DEFAULT_COST,
        }
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn greet(&self) -> HandlerResult<Greeting> {
        let uuid = Uuid::new_v4().to_string();
        let key = credential::derive(&uuid, self.cost)?;
        let user = User::from_display_name(&self.display_name);
        let message = format!(
            "Hi {}, Welcome to deno {} 🦕",
            user.full_name,
            self.version.runtime_version()
        );
        Ok(Greeting {
            uuid,
            key,
            user,
            message,
        })
    }

    pub fn intake(&self, body: Option<&str>) -> HandlerResult<IntakeAck> {
        let raw = body.unwrap_or_default();
        let value: Value =
            serde_json::from_str(raw).map_err(|e| HandlerError::MalformedBody(e.to_string()))?;
        let Value::Array(items) = value else {
            return Err(HandlerError::MalformedBody("expected a JSON array".to_string()));
        };
        Ok(IntakeAck {
            accepted: items.len(),
            message: format!("Received {} item(s), {}", items.len(), self.display_name),
        })
    }

    fn dispatch(&self, event: &ProxyEvent) -> HandlerResult<ProxyResponse> {
        match event.http_method.to_ascii_uppercase().as_str() {
            "GET" => ProxyResponse::json(200, &self.greet()?),
            "POST" => ProxyResponse::json(200, &self.intake(event.body.as_deref())?),
            other => Err(HandlerError::MethodNotAllowed(other.to_string())),
        }
    }
}

impl ProxyHandler for GreetingHandler {
    fn handle(&self, event: &ProxyEvent) -> HandlerResult<ProxyResponse> {
        tracing::debug!(
            method = %event.http_method,
            path = %event.path,
            request_id = %event.request_context.request_id,
            "handling proxy event"
        );
        match self.dispatch(event) {
            Ok(resp) => Ok(resp),
            Err(e @ (HandlerError::MalformedBody(_) | HandlerError::MethodNotAllowed(_))) => {
                ProxyResponse::message(e.status_code(), e.to_string())
            }
            Err(e) => {
                tracing::error!(error = %e, "handler failed");
                Err(e)
            }
        }
    }
}
