//! Resource definitions module.
//!
//! Each resource is defined in its own file with its URI, metadata and a
//! renderer producing the content from the server configuration.

mod server_info;
mod tool_catalog;

pub use server_info::ServerInfoResource;
pub use tool_catalog::ToolCatalogResource;

use super::error::ResourceError;
use crate::core::config::Config;

/// Trait for resource definitions.
///
/// Each resource must implement this trait to provide its metadata and content.
pub trait ResourceDefinition {
    /// The unique URI of the resource.
    const URI: &'static str;

    /// The display name of the resource.
    const NAME: &'static str;

    /// A description of the resource.
    const DESCRIPTION: &'static str;

    /// The MIME type of the resource content.
    const MIME_TYPE: &'static str;

    /// Render the resource content.
    fn render(config: &Config) -> Result<String, ResourceError>;
}
