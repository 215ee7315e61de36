//! Axum front end.
//!
//! Every request falls through to one proxy handler that applies the
//! manifest's checks in gateway order: route, API key, throttle, body
//! validation. Requests that pass are turned into a [`ProxyEvent`] and handed
//! to the compute handler on the blocking pool.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use apistack_core::model::HttpVerb;
use apistack_handler::{GreetingHandler, PackageVersion, ProxyEvent, ProxyHandler, ProxyResponse};
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use subtle::ConstantTimeEq;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::gateway::RouteTable;
use crate::throttle::{retry_after_secs, Throttler};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    routes: Arc<RouteTable>,
    handler: Arc<dyn ProxyHandler>,
    api_key: Arc<str>,
    throttler: Arc<Throttler>,
}

impl AppState {
    pub fn new(routes: RouteTable, handler: Arc<dyn ProxyHandler>, api_key: impl Into<String>) -> Self {
        Self {
            routes: Arc::new(routes),
            handler,
            api_key: Arc::from(api_key.into()),
            throttler: Arc::new(Throttler::new()),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let manifest = config.load_manifest()?;
        let routes = RouteTable::from_manifest(&manifest)?;
        tracing::info!(
            stack = %manifest.stack,
            digest = %manifest.digest,
            routes = routes.len(),
            stage = routes.stage(),
            "manifest loaded"
        );
        let handler = GreetingHandler::new(config.display_name.clone(), Arc::new(PackageVersion));
        Ok(Self::new(routes, Arc::new(handler), config.api_key.clone()))
    }
}

pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    Router::new().fallback(proxy).with_state(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id)),
    )
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect()
}

/// Constant-time key comparison. Pads both sides so length is not leaked
/// through an early return.
fn key_matches(presented: Option<&str>, expected: &str) -> bool {
    let Some(presented) = presented else {
        return false;
    };
    let len = presented.len().max(expected.len());
    let mut a = vec![0u8; len];
    let mut b = vec![0xFFu8; len];
    a[..presented.len()].copy_from_slice(presented.as_bytes());
    b[..expected.len()].copy_from_slice(expected.as_bytes());
    let same_len = presented.len().ct_eq(&expected.len());
    (same_len & a.ct_eq(&b)).into()
}

fn into_http(resp: ProxyResponse) -> Result<Response, ApiError> {
    let status = StatusCode::from_u16(resp.status_code)
        .map_err(|_| ApiError::BadGateway(format!("handler returned status {}", resp.status_code)))?;
    let mut out = Response::new(Body::from(resp.body));
    *out.status_mut() = status;
    for (k, v) in resp.headers {
        let name = HeaderName::try_from(k.as_str())
            .map_err(|_| ApiError::BadGateway(format!("handler returned bad header name {k}")))?;
        let value = HeaderValue::from_str(&v)
            .map_err(|_| ApiError::BadGateway(format!("handler returned bad value for {k}")))?;
        out.headers_mut().insert(name, value);
    }
    Ok(out)
}

async fn proxy(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let path = uri.path().to_string();
    let missing = || ApiError::MissingAuthenticationToken {
        verb: method.to_string(),
        path: path.clone(),
    };

    let verb: HttpVerb = method.as_str().parse().map_err(|_| missing())?;
    let route = state.routes.lookup(&path, verb).ok_or_else(missing)?;

    if route.api_key_required {
        let presented = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
        if !key_matches(presented, &state.api_key) {
            return Err(ApiError::Forbidden);
        }
        if let Some(settings) = route.throttle {
            if !state.throttler.try_acquire(&state.api_key, &route.method_id, settings) {
                return Err(ApiError::TooManyRequests {
                    method: route.method_id.clone(),
                    retry_after: retry_after_secs(settings),
                });
            }
        }
    }

    let text = String::from_utf8(body.to_vec())
        .map_err(|_| ApiError::InvalidBody(vec!["body is not valid UTF-8".to_string()]))?;

    if let Some(validator) = &route.validator {
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ApiError::InvalidBody(vec![e.to_string()]))?;
        validator.validate(&value).map_err(ApiError::InvalidBody)?;
    }

    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let query = Query::<BTreeMap<String, String>>::try_from_uri(&uri)
        .map(|q| q.0)
        .unwrap_or_default();

    let mut event = ProxyEvent::new(method.as_str(), path.clone())
        .with_request_context(request_id, state.routes.stage());
    event.request_context.request_time_epoch =
        (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
    event.headers = header_map(&headers);
    event.query_string_parameters = query;
    if !text.is_empty() {
        event = event.with_body(text);
    }

    let handler = Arc::clone(&state.handler);
    let resp = tokio::task::spawn_blocking(move || handler.handle(&event))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::BadGateway(e.to_string()))?;

    into_http(resp)
}

/// Bind, serve and stop on Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "gateway emulator listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_comparison() {
        assert!(key_matches(Some("secret"), "secret"));
        assert!(!key_matches(Some("secreT"), "secret"));
        assert!(!key_matches(Some("secret-longer"), "secret"));
        assert!(!key_matches(Some("sec"), "secret"));
        assert!(!key_matches(Some(""), "secret"));
        assert!(!key_matches(None, "secret"));
        assert!(key_matches(Some(""), ""));
    }
}
