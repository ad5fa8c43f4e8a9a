//! Audio effect tool definition.
//!
//! Decodes an audio file, applies a single effect and writes the result as
//! 16-bit WAV.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::clip::{AudioClip, decode_file};
use super::wav::write_wav;
use crate::core::config::Config;
use crate::core::security::{validate_output_path, validate_path};
use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{
    format_duration, format_size, run_blocking, sibling_path, structured_result, tool_error_result,
};

const MIN_SPEED: f32 = 0.25;
const MAX_SPEED: f32 = 4.0;
const MAX_GAIN_DB: f32 = 48.0;

// ============================================================================
// Tool Parameters
// ============================================================================

/// The effect to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioEffect {
    /// Play the clip backwards.
    Reverse,
    /// Amplify or attenuate by a number of decibels.
    Gain { db: f32 },
    /// Scale so the loudest sample reaches `peak_db` dBFS (default -1).
    Normalize {
        #[serde(default = "default_peak_db")]
        peak_db: f32,
    },
    /// Ramp up from silence over the first `seconds`.
    FadeIn { seconds: f32 },
    /// Ramp down to silence over the last `seconds`.
    FadeOut { seconds: f32 },
    /// Change playback speed (pitch follows); 0.25 to 4.0.
    Speed { factor: f32 },
    /// Feedback echo with the given delay and decay (0 to 1, exclusive).
    Echo { delay_secs: f32, decay: f32 },
    /// Downmix all channels to one.
    Mono,
}

fn default_peak_db() -> f32 {
    -1.0
}

impl AudioEffect {
    /// Short label used in default output file names.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Reverse => "reverse",
            Self::Gain { .. } => "gain",
            Self::Normalize { .. } => "normalize",
            Self::FadeIn { .. } => "fade_in",
            Self::FadeOut { .. } => "fade_out",
            Self::Speed { .. } => "speed",
            Self::Echo { .. } => "echo",
            Self::Mono => "mono",
        }
    }
}

/// Parameters for the audio effect tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AudioEffectParams {
    /// Path to the input audio file.
    pub path: String,

    /// Effect to apply, e.g. `{"type": "gain", "db": -6}`.
    pub effect: AudioEffect,

    /// Where to write the WAV result (default: `<name>_<effect>.wav` next to the input).
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
pub struct AudioEffectResult {
    pub input: String,
    pub output: String,
    pub effect: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub input_duration_secs: f64,
    pub output_duration_secs: f64,
    pub output_bytes: u64,
}

// ============================================================================
// Effects
// ============================================================================

/// Apply `effect` to `clip`.
pub fn apply_effect(clip: AudioClip, effect: &AudioEffect) -> Result<AudioClip, ToolError> {
    match *effect {
        AudioEffect::Reverse => Ok(reverse(clip)),
        AudioEffect::Gain { db } => {
            if !db.is_finite() || db.abs() > MAX_GAIN_DB {
                return Err(ToolError::invalid_arguments(format!(
                    "gain must be within ±{} dB",
                    MAX_GAIN_DB
                )));
            }
            Ok(scale(clip, db_to_amplitude(db)))
        }
        AudioEffect::Normalize { peak_db } => {
            if !peak_db.is_finite() || peak_db > 0.0 {
                return Err(ToolError::invalid_arguments("peak_db must be at most 0 dBFS"));
            }
            let peak = clip.peak();
            if peak == 0.0 {
                return Ok(clip);
            }
            Ok(scale(clip, db_to_amplitude(peak_db) / peak))
        }
        AudioEffect::FadeIn { seconds } => {
            let frames = seconds_to_frames(&clip, seconds)?;
            Ok(fade(clip, frames, true))
        }
        AudioEffect::FadeOut { seconds } => {
            let frames = seconds_to_frames(&clip, seconds)?;
            Ok(fade(clip, frames, false))
        }
        AudioEffect::Speed { factor } => {
            if !(MIN_SPEED..=MAX_SPEED).contains(&factor) {
                return Err(ToolError::invalid_arguments(format!(
                    "speed factor must be between {} and {}",
                    MIN_SPEED, MAX_SPEED
                )));
            }
            Ok(change_speed(clip, factor))
        }
        AudioEffect::Echo { delay_secs, decay } => {
            if !(0.0..1.0).contains(&decay) {
                return Err(ToolError::invalid_arguments("decay must be in [0, 1)"));
            }
            let delay = seconds_to_frames(&clip, delay_secs)?;
            if delay == 0 {
                return Err(ToolError::invalid_arguments("echo delay must be positive"));
            }
            if delay >= clip.frames() {
                return Err(ToolError::invalid_arguments(format!(
                    "echo delay must be shorter than the clip ({:.3}s)",
                    clip.duration_secs()
                )));
            }
            echo(clip, delay, decay)
        }
        AudioEffect::Mono => {
            let samples = clip.mono_mix();
            AudioClip::new(clip.sample_rate, 1, samples)
        }
    }
}

fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Frames covered by `seconds`, capped at the clip length.
fn seconds_to_frames(clip: &AudioClip, seconds: f32) -> Result<usize, ToolError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ToolError::invalid_arguments("durations must be non-negative"));
    }
    let frames = (f64::from(seconds) * f64::from(clip.sample_rate)).round();
    Ok(if frames >= clip.frames() as f64 {
        clip.frames()
    } else {
        frames as usize
    })
}

fn reverse(mut clip: AudioClip) -> AudioClip {
    let channels = usize::from(clip.channels);
    clip.samples = clip
        .samples
        .chunks_exact(channels)
        .rev()
        .flatten()
        .copied()
        .collect();
    clip
}

fn scale(mut clip: AudioClip, factor: f32) -> AudioClip {
    clip.samples.iter_mut().for_each(|s| *s *= factor);
    clip
}

/// Linear fade over `frames` frames at the start (`fade_in`) or end.
fn fade(mut clip: AudioClip, frames: usize, fade_in: bool) -> AudioClip {
    let total = clip.frames();
    let n = frames.min(total);
    if n == 0 {
        return clip;
    }
    let channels = usize::from(clip.channels);

    for (i, frame) in clip.samples.chunks_exact_mut(channels).enumerate() {
        let gain = if fade_in {
            if i >= n {
                break;
            }
            i as f32 / n as f32
        } else {
            if i < total - n {
                continue;
            }
            (total - 1 - i) as f32 / n as f32
        };
        frame.iter_mut().for_each(|s| *s *= gain);
    }
    clip
}

/// Resample by linear interpolation so the clip plays `factor` times faster.
fn change_speed(clip: AudioClip, factor: f32) -> AudioClip {
    let channels = usize::from(clip.channels);
    let frames = clip.frames();
    let out_frames = (frames as f64 / f64::from(factor)).round() as usize;
    let mut samples = Vec::with_capacity(out_frames * channels);

    for j in 0..out_frames {
        let pos = j as f64 * f64::from(factor);
        let i0 = (pos.floor() as usize).min(frames.saturating_sub(1));
        let i1 = (i0 + 1).min(frames.saturating_sub(1));
        let t = (pos - i0 as f64) as f32;
        for c in 0..channels {
            let a = clip.samples[i0 * channels + c];
            let b = clip.samples[i1 * channels + c];
            samples.push(a + (b - a) * t);
        }
    }

    AudioClip {
        samples,
        ..clip
    }
}

fn echo(mut clip: AudioClip, delay_frames: usize, decay: f32) -> Result<AudioClip, ToolError> {
    let offset = delay_frames
        .checked_mul(usize::from(clip.channels))
        .ok_or_else(|| ToolError::invalid_arguments("echo delay is too long"))?;
    for i in offset..clip.samples.len() {
        clip.samples[i] += clip.samples[i - offset] * decay;
    }
    Ok(clip)
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Audio effect tool.
pub struct AudioEffectTool;

impl AudioEffectTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "audio_effect";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Apply an effect to an audio file and save it as WAV. Effects: reverse, \
         gain (dB), normalize (peak dBFS), fade_in/fade_out (seconds), speed (factor), \
         echo (delay, decay), mono.";

    /// Execute the tool logic (for STDIO/TCP transport via rmcp).
    #[instrument(skip_all, fields(path = %params.path, effect = params.effect.label()))]
    pub fn execute(params: &AudioEffectParams, config: &Config) -> CallToolResult {
        info!("Audio effect tool called for path: {}", params.path);

        match Self::run(params, config) {
            Ok(result) => {
                let summary = format!(
                    "Applied {} to {} ({} -> {}), saved {} ({})",
                    result.effect,
                    result.input,
                    format_duration(result.input_duration_secs),
                    format_duration(result.output_duration_secs),
                    result.output,
                    format_size(result.output_bytes)
                );
                info!("{}", summary);
                structured_result(summary, &result)
            }
            Err(e) => tool_error_result(&e),
        }
    }

    fn run(params: &AudioEffectParams, config: &Config) -> Result<AudioEffectResult, ToolError> {
        let input = validate_path(&params.path, config)?;
        let output_request = match &params.output_path {
            Some(p) => p.clone(),
            None => sibling_path(&input, &format!("_{}", params.effect.label()), "wav")
                .display()
                .to_string(),
        };
        let output = validate_output_path(&output_request, config, params.overwrite)?;

        let clip = decode_file(&input, &config.tools.audio)?;
        let input_duration = clip.duration_secs();
        debug!("Decoded {:.2}s of audio", input_duration);

        let processed = apply_effect(clip, &params.effect)?;
        let bytes = write_wav(&output, &processed)?;

        Ok(AudioEffectResult {
            input: input.display().to_string(),
            output: output.display().to_string(),
            effect: params.effect.label().to_string(),
            sample_rate: processed.sample_rate,
            channels: processed.channels,
            input_duration_secs: input_duration,
            output_duration_secs: processed.duration_secs(),
            output_bytes: bytes,
        })
    }

    /// HTTP handler for this tool (for HTTP transport).
    #[cfg(feature = "http")]
    pub fn http_handler(
        arguments: serde_json::Value,
        config: Arc<Config>,
    ) -> Result<serde_json::Value, String> {
        use crate::domains::tools::definitions::common::{http_response, parse_http_args};

        let params: AudioEffectParams = parse_http_args(arguments)?;
        info!("Audio effect tool (HTTP) called for path: {}", params.path);
        Ok(http_response(Self::execute(&params, &config)))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<AudioEffectParams>(),
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
                let params: AudioEffectParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(run_blocking(move || Self::execute(&params, &config)).await)
            }
            .boxed()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
