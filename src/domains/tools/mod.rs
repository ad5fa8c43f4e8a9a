//! Tools domain module.
//!
//! Every tool is a stateless operation over a file or a piece of text,
//! exposed to MCP clients with typed JSON parameters.
//!
//! ## Architecture
//!
//! - `definitions/` - Tool implementations grouped by category (one file per tool)
//! - `router.rs` - Dynamic ToolRouter builder for STDIO/TCP transport
//! - `registry.rs` - Central tool registry and HTTP dispatch
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a file under the matching category in `definitions/`
//! 2. Define params, `execute()`, `http_handler()`, `to_tool()` and `create_route()`
//! 3. Export it from the category's `mod.rs` and from `definitions/mod.rs`
//! 4. Add the route in `router.rs` using `with_route()`
//! 5. Register it in `registry.rs` for listing and HTTP dispatch

pub mod definitions;
mod error;
mod registry;
pub mod router;

pub use error::ToolError;
pub use registry::{ToolCategory, ToolRegistry};
pub use router::build_tool_router;
