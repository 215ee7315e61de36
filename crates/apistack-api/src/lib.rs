//! apistack-api
//!
//! Local gateway emulator. Loads (or synthesizes) a manifest, rebuilds its
//! route table and serves it over HTTP with the same key, throttle and body
//! checks a deployed gateway applies, forwarding accepted requests to the
//! compute handler.

pub mod config;
pub mod error;
pub mod gateway;
pub mod server;
pub mod throttle;

pub use crate::config::ServerConfig;
pub use crate::error::ApiError;
pub use crate::gateway::{Route, RouteTable};
pub use crate::server::{router, serve, AppState, API_KEY_HEADER, REQUEST_ID_HEADER};
pub use crate::throttle::Throttler;
