//! HTTP surface and process wiring for slotwatch.
//!
//! Exposes the tick trigger (bearer-protected), the device subscription
//! API and the service/location browsing API; owns configuration loading
//! and tracing bootstrap. All engine collaborators are constructed here and
//! injected, never created at first use.

pub mod config;
pub mod dates;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;

pub use config::{AppConfig, ConfigError, load_config};
pub use observability::{apply_logging_level, init_tracing, shutdown_tracing};
pub use server::{AppState, ServerBuilder, SlotwatchServer, build_app};
