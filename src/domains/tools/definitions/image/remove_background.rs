//! Remove background tool definition.
//!
//! Makes the dominant border color of an image transparent and writes the
//! result as PNG.

use base64::Engine;
use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

use super::background::{BackgroundOptions, RemovalStats, remove_background};
use super::raster::{encode_png, load_rgba};
use crate::core::config::Config;
use crate::core::security::{validate_output_path, validate_path};
use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{
    format_size, run_blocking, sibling_path, structured_result_with, tool_error_result,
    write_atomic,
};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the remove background tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveBackgroundParams {
    /// Path to the input image (PNG, JPEG, WebP, GIF, BMP...).
    pub path: String,

    /// Where to write the PNG result (default: `<name>_no_bg.png` next to the input).
    #[serde(default)]
    pub output_path: Option<String>,

    /// Replace the output file if it already exists.
    #[serde(default)]
    pub overwrite: bool,

    /// Also return the resulting PNG inline as base64 image content.
    #[serde(default)]
    pub inline: bool,

    /// RGB distance under which a pixel counts as background (default: 50).
    #[serde(default)]
    pub color_tolerance: Option<f32>,

    /// Sobel magnitude above which a pixel counts as an edge (default: 50).
    #[serde(default)]
    pub edge_threshold: Option<f32>,

    /// Pixels within this radius of an edge are softened instead of cleared (default: 3).
    #[serde(default)]
    pub edge_radius: Option<u32>,

    /// Color quantization bucket width per channel (default: 30).
    #[serde(default)]
    pub bucket_size: Option<u8>,

    /// Share of all pixels a color cluster needs to be a background candidate (default: 0.05).
    #[serde(default)]
    pub common_share: Option<f64>,

    /// Share of a candidate cluster's pixels that must lie on the image border (default: 0.10).
    #[serde(default)]
    pub border_share: Option<f64>,
}

impl RemoveBackgroundParams {
    fn options(&self) -> BackgroundOptions {
        let defaults = BackgroundOptions::default();
        BackgroundOptions {
            bucket_size: self.bucket_size.unwrap_or(defaults.bucket_size),
            edge_threshold: self.edge_threshold.unwrap_or(defaults.edge_threshold),
            color_tolerance: self.color_tolerance.unwrap_or(defaults.color_tolerance),
            edge_radius: self.edge_radius.unwrap_or(defaults.edge_radius),
            common_share: self.common_share.unwrap_or(defaults.common_share),
            border_share: self.border_share.unwrap_or(defaults.border_share),
        }
    }
}

// ============================================================================
// Structured Output Types
// ============================================================================

/// Structured output for background removal.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RemoveBackgroundResult {
    pub input: String,
    pub output: String,
    pub png_bytes: u64,
    #[serde(flatten)]
    pub stats: RemovalStats,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Remove background tool - color-cluster + edge heuristic.
pub struct ImageRemoveBackgroundTool;

impl ImageRemoveBackgroundTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "image_remove_background";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Remove the background of an image. Detects the dominant color along the \
         image border, makes matching pixels transparent while softening them near \
         detected edges, and writes the result as PNG.";

    /// Execute the tool logic (for STDIO/TCP transport via rmcp).
    #[instrument(skip_all, fields(path = %params.path))]
    pub fn execute(params: &RemoveBackgroundParams, config: &Config) -> CallToolResult {
        info!("Remove background tool called for path: {}", params.path);

        match Self::run(params, config) {
            Ok((result, png)) => {
                let summary = format!(
                    "Removed background {} ({:.1}% of {}x{} pixels): {} cleared, {} softened. Saved {} ({})",
                    result.stats.background_color,
                    result.stats.background_share * 100.0,
                    result.stats.width,
                    result.stats.height,
                    result.stats.transparent_pixels,
                    result.stats.softened_pixels,
                    result.output,
                    format_size(result.png_bytes)
                );
                info!("{}", summary);

                let mut content = vec![Content::text(summary)];
                if params.inline {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
                    content.push(Content::image(encoded, "image/png"));
                }
                structured_result_with(content, &result)
            }
            Err(e) => tool_error_result(&e),
        }
    }

    fn run(
        params: &RemoveBackgroundParams,
        config: &Config,
    ) -> Result<(RemoveBackgroundResult, Vec<u8>), ToolError> {
        let input = validate_path(&params.path, config)?;
        if !input.is_file() {
            return Err(ToolError::invalid_arguments(format!(
                "Path is not a file: {}",
                params.path
            )));
        }

        let output_request = match &params.output_path {
            Some(p) => p.clone(),
            None => default_output_path(&input).display().to_string(),
        };
        let output = validate_output_path(&output_request, config, params.overwrite)?;

        let mut image = load_rgba(&input, &config.tools.image)?;
        let stats = remove_background(&mut image, &params.options())?;
        let png = encode_png(&image)?;
        write_atomic(&output, &png)?;

        Ok((
            RemoveBackgroundResult {
                input: input.display().to_string(),
                output: output.display().to_string(),
                png_bytes: png.len() as u64,
                stats,
            },
            png,
        ))
    }

    /// HTTP handler for this tool (for HTTP transport).
    #[cfg(feature = "http")]
    pub fn http_handler(
        arguments: serde_json::Value,
        config: Arc<Config>,
    ) -> Result<serde_json::Value, String> {
        use crate::domains::tools::definitions::common::{http_response, parse_http_args};

        let params: RemoveBackgroundParams = parse_http_args(arguments)?;
        info!("Remove background tool (HTTP) called for path: {}", params.path);
        Ok(http_response(Self::execute(&params, &config)))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<RemoveBackgroundParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for STDIO/TCP transport.
    pub fn create_route<S>(config: Arc<Config>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let config = config.clone();
            async move {
                let params: RemoveBackgroundParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(run_blocking(move || Self::execute(&params, &config)).await)
            }
            .boxed()
        })
    }
}

/// `<dir>/<stem>_no_bg.png`
fn default_output_path(input: &Path) -> PathBuf {
    sibling_path(input, "_no_bg", "png")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn params(path: &str) -> RemoveBackgroundParams {
        serde_json::from_value(serde_json::json!({ "path": path })).unwrap()
    }

    fn write_sample(dir: &TempDir) -> PathBuf {
        let mut img = RgbaImage::from_pixel(30, 30, Rgba([240, 240, 240, 255]));
        for y in 10..20 {
            for x in 10..20 {
                img.put_pixel(x, y, Rgba([20, 120, 20, 255]));
            }
        }
        let path = dir.path().join("leaf.png");
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_default_output_path() {
        let out = default_output_path(Path::new("/tmp/photos/cat.jpeg"));
        assert_eq!(out, PathBuf::from("/tmp/photos/cat_no_bg.png"));
    }

    #[test]
    fn test_params_defaults() {
        let p = params("a.png");
        assert_eq!(p.options(), BackgroundOptions::default());
        assert!(!p.inline);
        assert!(!p.overwrite);
    }

    #[test]
    fn test_params_share_overrides() {
        let p: RemoveBackgroundParams = serde_json::from_value(serde_json::json!({
            "path": "a.png",
            "common_share": 0.2,
            "border_share": 0.5
        }))
        .unwrap();
        let options = p.options();
        assert_eq!(options.common_share, 0.2);
        assert_eq!(options.border_share, 0.5);
        assert_eq!(options.bucket_size, BackgroundOptions::default().bucket_size);
    }

    #[test]
    fn test_out_of_range_share_is_tool_error() {
        let dir = TempDir::new().unwrap();
        let input = write_sample(&dir);
        let p: RemoveBackgroundParams = serde_json::from_value(serde_json::json!({
            "path": input.to_str().unwrap(),
            "border_share": 1.5
        }))
        .unwrap();
        let result = ImageRemoveBackgroundTool::execute(&p, &Config::default());
        assert_eq!(result.is_error, Some(true));
        assert!(!dir.path().join("leaf_no_bg.png").exists());
    }

    #[test]
    fn test_remove_background_writes_png() {
        let dir = TempDir::new().unwrap();
        let input = write_sample(&dir);

        let result = ImageRemoveBackgroundTool::execute(
            &params(input.to_str().unwrap()),
            &Config::default(),
        );
        assert_eq!(result.is_error, Some(false));

        let output = dir.path().join("leaf_no_bg.png");
        let written = image::open(&output).unwrap().to_rgba8();
        assert_eq!(written.get_pixel(0, 0)[3], 0);
        assert_eq!(written.get_pixel(15, 15)[3], 255);

        let structured = result.structured_content.unwrap();
        assert_eq!(structured["width"], 30);
        assert_eq!(structured["background_color"], "#ffffff");
    }

    #[test]
    fn test_existing_output_needs_overwrite() {
        let dir = TempDir::new().unwrap();
        let input = write_sample(&dir);
        std::fs::write(dir.path().join("leaf_no_bg.png"), b"old").unwrap();

        let mut p = params(input.to_str().unwrap());
        let result = ImageRemoveBackgroundTool::execute(&p, &Config::default());
        assert_eq!(result.is_error, Some(true));

        p.overwrite = true;
        let result = ImageRemoveBackgroundTool::execute(&p, &Config::default());
        assert_eq!(result.is_error, Some(false));
    }

    #[test]
    fn test_inline_adds_image_content() {
        let dir = TempDir::new().unwrap();
        let input = write_sample(&dir);

        let mut p = params(input.to_str().unwrap());
        p.inline = true;
        let result = ImageRemoveBackgroundTool::execute(&p, &Config::default());
        assert_eq!(result.content.len(), 2);
    }

    #[test]
    fn test_nonexistent_input() {
        let result =
            ImageRemoveBackgroundTool::execute(&params("/nonexistent/photo.png"), &Config::default());
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_non_image_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("notes.png");
        std::fs::write(&input, "just text").unwrap();

        let result =
            ImageRemoveBackgroundTool::execute(&params(input.to_str().unwrap()), &Config::default());
        assert_eq!(result.is_error, Some(true));
        assert!(!dir.path().join("notes_no_bg.png").exists());
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_handler_missing_path() {
        let result = ImageRemoveBackgroundTool::http_handler(
            serde_json::json!({ "inline": true }),
            Arc::new(Config::default()),
        );
        assert!(result.is_err());
    }
}
