//! apistack-handler
//!
//! The compute function the gateway integrates with:
//! - proxy event and response records
//! - the greeting handler (`GET` greeting, `POST` body intake)
//! - bcrypt credential derivation
//! - injectable runtime version

pub mod credential;
pub mod error;
pub mod event;
pub mod handler;
pub mod runtime;

pub use crate::error::{HandlerError, HandlerResult};
pub use crate::event::{ProxyEvent, ProxyResponse};
pub use crate::handler::{Greeting, GreetingHandler, IntakeAck, ProxyHandler, User, DEFAULT_DISPLAY_NAME};
pub use crate::runtime::{HandlerAddress, PackageVersion, StaticVersion, VersionProvider};
