//! Transports the ToolsUniverse server can listen on.
//!
//! - `stdio` (default feature): a single session on stdin/stdout
//! - `tcp`: one session per TCP connection
//! - `http`: JSON-RPC over POST, built on axum
//!
//! `MCP_TRANSPORT` picks one at startup; a transport whose feature is not
//! compiled in falls back to the default.

mod config;
mod error;
mod service;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

#[cfg(feature = "tcp")]
pub use config::TcpConfig;

#[cfg(feature = "http")]
pub use config::HttpConfig;
