//! Convert-to-WAV tool definition.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

use super::clip::decode_file;
use super::wav::write_wav;
use crate::core::config::Config;
use crate::core::security::{validate_output_path, validate_path};
use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{
    format_duration, format_size, run_blocking, sibling_path, structured_result, tool_error_result,
};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the audio conversion tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AudioConvertParams {
    /// Path to the input audio file (mp3, flac, ogg, wav, aac, m4a).
    pub path: String,

    /// Where to write the WAV file (default: same name with a `.wav` extension).
    #[serde(default)]
    pub output_path: Option<String>,

    /// Replace the output file if it already exists.
    #[serde(default)]
    pub overwrite: bool,
}

// ============================================================================
// Structured Output Types
// ============================================================================

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AudioConvertResult {
    pub input: String,
    pub output: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Decode any supported audio format and re-encode it as 16-bit PCM WAV.
pub struct AudioConvertWavTool;

impl AudioConvertWavTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "audio_convert_wav";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Convert an audio file (MP3, FLAC, OGG Vorbis, AAC/M4A, WAV) to 16-bit PCM WAV. \
         Keeps the original sample rate and channel count.";

    /// Execute the tool logic (for STDIO/TCP transport via rmcp).
    #[instrument(skip_all, fields(path = %params.path))]
    pub fn execute(params: &AudioConvertParams, config: &Config) -> CallToolResult {
        info!("Audio convert tool called for path: {}", params.path);

        match Self::run(params, config) {
            Ok(result) => {
                let summary = format!(
                    "Converted {} ({}) to {} ({}), {} Hz, {} channel(s), {}",
                    result.input,
                    format_size(result.input_bytes),
                    result.output,
                    format_size(result.output_bytes),
                    result.sample_rate,
                    result.channels,
                    format_duration(result.duration_secs)
                );
                info!("{}", summary);
                structured_result(summary, &result)
            }
            Err(e) => tool_error_result(&e),
        }
    }

    fn run(params: &AudioConvertParams, config: &Config) -> Result<AudioConvertResult, ToolError> {
        let input = validate_path(&params.path, config)?;
        let input_bytes = std::fs::metadata(&input)?.len();

        let output_request = match &params.output_path {
            Some(p) => p.clone(),
            None => default_output_path(&input).display().to_string(),
        };
        let output = validate_output_path(&output_request, config, params.overwrite)?;
        if output == input {
            return Err(ToolError::invalid_arguments(
                "output path must differ from the input file",
            ));
        }

        let clip = decode_file(&input, &config.tools.audio)?;
        let output_bytes = write_wav(&output, &clip)?;

        Ok(AudioConvertResult {
            input: input.display().to_string(),
            output: output.display().to_string(),
            sample_rate: clip.sample_rate,
            channels: clip.channels,
            duration_secs: clip.duration_secs(),
            input_bytes,
            output_bytes,
        })
    }

    /// HTTP handler for this tool (for HTTP transport).
    #[cfg(feature = "http")]
    pub fn http_handler(
        arguments: serde_json::Value,
        config: Arc<Config>,
    ) -> Result<serde_json::Value, String> {
        use crate::domains::tools::definitions::common::{http_response, parse_http_args};

        let params: AudioConvertParams = parse_http_args(arguments)?;
        info!("Audio convert tool (HTTP) called for path: {}", params.path);
        Ok(http_response(Self::execute(&params, &config)))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<AudioConvertParams>(),
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
                let params: AudioConvertParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(run_blocking(move || Self::execute(&params, &config)).await)
            }
            .boxed()
        })
    }
}

/// `<stem>.wav`, or `<stem>_converted.wav` when the input is already WAV.
fn default_output_path(input: &Path) -> PathBuf {
    let is_wav = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    if is_wav {
        sibling_path(input, "_converted", "wav")
    } else {
        sibling_path(input, "", "wav")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::audio::clip::AudioClip;
    use crate::domains::tools::definitions::audio::wav::encode_wav;
    use tempfile::TempDir;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/a/song.flac")),
            PathBuf::from("/a/song.wav")
        );
        assert_eq!(
            default_output_path(Path::new("/a/song.WAV")),
            PathBuf::from("/a/song_converted.wav")
        );
    }

    #[test]
    fn test_convert_wav_to_wav() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("tone.wav");
        let clip = AudioClip::new(16_000, 2, vec![0.25; 3_200]).unwrap();
        std::fs::write(&input, encode_wav(&clip)).unwrap();

        let params = AudioConvertParams {
            path: input.to_str().unwrap().to_string(),
            output_path: None,
            overwrite: false,
        };
        let result = AudioConvertWavTool::execute(&params, &Config::default());
        assert_eq!(result.is_error, Some(false));

        let structured = result.structured_content.unwrap();
        assert_eq!(structured["sample_rate"], 16_000);
        assert_eq!(structured["channels"], 2);
        assert_eq!(structured["output_bytes"], 44 + 3_200 * 2);
        assert!(dir.path().join("tone_converted.wav").exists());
    }

    #[test]
    fn test_convert_refuses_in_place() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("tone.wav");
        std::fs::write(&input, encode_wav(&AudioClip::silence(8_000, 1, 100))).unwrap();

        let params = AudioConvertParams {
            path: input.to_str().unwrap().to_string(),
            output_path: Some(input.to_str().unwrap().to_string()),
            overwrite: true,
        };
        let result = AudioConvertWavTool::execute(&params, &Config::default());
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_convert_undecodable_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("fake.ogg");
        std::fs::write(&input, b"OggS but not really").unwrap();

        let params = AudioConvertParams {
            path: input.to_str().unwrap().to_string(),
            output_path: None,
            overwrite: false,
        };
        let result = AudioConvertWavTool::execute(&params, &Config::default());
        assert_eq!(result.is_error, Some(true));
        assert!(!dir.path().join("fake.wav").exists());
    }
}
