//! Server info resource definition.

use serde::Serialize;
use std::path::PathBuf;

use super::ResourceDefinition;
use crate::core::config::Config;
use crate::domains::resources::error::ResourceError;
use crate::domains::tools::ToolRegistry;

/// Server name, version and the limits applied to tool calls.
pub struct ServerInfoResource;

#[derive(Debug, Serialize)]
struct ServerInfo<'a> {
    name: &'a str,
    version: &'a str,
    tool_count: usize,
    limits: Limits,
    security: Security<'a>,
}

#[derive(Debug, Serialize)]
struct Limits {
    max_image_pixels: u64,
    max_audio_seconds: u64,
    max_spectrum_window: usize,
}

#[derive(Debug, Serialize)]
struct Security<'a> {
    root_path: Option<&'a PathBuf>,
    allow_symlinks: bool,
}

impl ResourceDefinition for ServerInfoResource {
    const URI: &'static str = "tools://server/info";
    const NAME: &'static str = "Server Information";
    const DESCRIPTION: &'static str = "Server version, resource limits and file access policy";
    const MIME_TYPE: &'static str = "application/json";

    fn render(config: &Config) -> Result<String, ResourceError> {
        let info = ServerInfo {
            name: &config.server.name,
            version: &config.server.version,
            tool_count: ToolRegistry::get_all_tools().len(),
            limits: Limits {
                max_image_pixels: config.tools.image.max_pixels,
                max_audio_seconds: config.tools.audio.max_duration_secs,
                max_spectrum_window: config.tools.audio.max_spectrum_window,
            },
            security: Security {
                root_path: config.security.root_path.as_ref(),
                allow_symlinks: config.security.allow_symlinks,
            },
        };
        Ok(serde_json::to_string_pretty(&info)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info_metadata() {
        assert_eq!(ServerInfoResource::URI, "tools://server/info");
        assert_eq!(ServerInfoResource::MIME_TYPE, "application/json");
    }

    #[test]
    fn test_server_info_render() {
        let mut config = Config::default();
        config.tools.image.max_pixels = 1_000;
        config.security.root_path = Some(PathBuf::from("/srv/files"));

        let json: serde_json::Value =
            serde_json::from_str(&ServerInfoResource::render(&config).unwrap()).unwrap();
        assert_eq!(json["name"], "tools-universe");
        assert_eq!(json["tool_count"], 11);
        assert_eq!(json["limits"]["max_image_pixels"], 1_000);
        assert_eq!(json["security"]["root_path"], "/srv/files");
    }
}
