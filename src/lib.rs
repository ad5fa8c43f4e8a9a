//! ToolsUniverse MCP Server Library
//!
//! A collection of local utility tools (image background removal, audio
//! conversion and analysis, text processing and everyday calculators) served
//! over the Model Context Protocol.
//!
//! # Architecture
//!
//! - **core**: Configuration, error handling, path security, transports and the server handler
//! - **domains**: Business logic organized by bounded contexts
//!   - **tools**: The utility tools, grouped by category
//!   - **resources**: Server information and the tool catalog
//!
//! # Example
//!
//! ```rust,no_run
//! use tools_universe::{core::McpServer, core::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config);
//!     // Start the server...
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
