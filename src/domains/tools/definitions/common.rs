//! Common utilities shared across tool definitions.
//!
//! Result builders, HTTP response shaping and small formatting helpers.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::domains::tools::ToolError;

/// Create an error result with a formatted message.
pub fn error_result(message: &str) -> CallToolResult {
    warn!("{}", message);
    CallToolResult::error(vec![Content::text(message.to_string())])
}

/// Run CPU-bound tool work (decoding, DFTs, pixel passes) on the blocking pool.
pub async fn run_blocking<F>(work: F) -> CallToolResult
where
    F: FnOnce() -> CallToolResult + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .unwrap_or_else(|e| error_result(&format!("Task failed: {}", e)))
}

/// Write `bytes` to `path` through a temp file in the same directory, so a
/// failed write never leaves a truncated output behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ToolError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| ToolError::from(e.error))?;
    Ok(())
}

/// Create an error result from a tool error.
pub fn tool_error_result(error: &ToolError) -> CallToolResult {
    error_result(&error.to_string())
}

/// Create a success result carrying a text summary and structured JSON.
///
/// Falls back to text-only output when the data cannot be serialized.
pub fn structured_result<T: Serialize>(summary: String, data: &T) -> CallToolResult {
    structured_result_with(vec![Content::text(summary)], data)
}

/// Like [`structured_result`] but with caller-provided content blocks.
pub fn structured_result_with<T: Serialize>(content: Vec<Content>, data: &T) -> CallToolResult {
    match serde_json::to_value(data) {
        Ok(structured) => CallToolResult {
            content,
            structured_content: Some(structured),
            is_error: Some(false),
            meta: None,
        },
        Err(e) => {
            warn!("Failed to serialize structured content: {}", e);
            CallToolResult::success(content)
        }
    }
}

/// Shape a tool result as the JSON body returned over HTTP.
#[cfg(feature = "http")]
pub fn http_response(result: CallToolResult) -> serde_json::Value {
    let mut response = serde_json::json!({
        "content": result.content,
        "isError": result.is_error.unwrap_or(false)
    });

    if let (Some(structured), Some(object)) = (result.structured_content, response.as_object_mut()) {
        object.insert("structuredContent".to_string(), structured);
    }

    response
}

/// Deserialize HTTP call arguments into a tool's params struct.
#[cfg(feature = "http")]
pub fn parse_http_args<T: serde::de::DeserializeOwned>(
    arguments: serde_json::Value,
) -> Result<T, String> {
    serde_json::from_value(arguments).map_err(|e| format!("Invalid arguments: {}", e))
}

/// Output path next to `input`: `<dir>/<stem><suffix>.<extension>`.
pub fn sibling_path(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}{}.{}", stem, suffix, extension))
}

/// Round to two decimal places (currency and percentages).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a byte count in human-readable form.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// Format seconds as M:SS.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
