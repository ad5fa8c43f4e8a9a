//! Spectrum analysis tool definition.
//!
//! Runs a Hann-windowed DFT over one window of the mono mix and reports the
//! dominant frequency, the strongest peaks and coarse band energies.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::clip::{AudioClip, decode_file};
use crate::core::config::{Config, MIN_SPECTRUM_WINDOW};
use crate::core::security::validate_path;
use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{
    round2, run_blocking, structured_result, tool_error_result,
};

const DEFAULT_WINDOW: usize = 1024;
const DEFAULT_PEAKS: usize = 5;
const MAX_PEAKS: usize = 50;
const DB_FLOOR: f64 = -120.0;

/// (name, low Hz, high Hz)
const BANDS: &[(&str, f64, f64)] = &[
    ("sub_bass", 20.0, 60.0),
    ("bass", 60.0, 250.0),
    ("low_mid", 250.0, 500.0),
    ("mid", 500.0, 2_000.0),
    ("upper_mid", 2_000.0, 4_000.0),
    ("presence", 4_000.0, 6_000.0),
    ("brilliance", 6_000.0, 20_000.0),
];

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the spectrum tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AudioSpectrumParams {
    /// Path to the audio file.
    pub path: String,

    /// DFT window length in samples; a power of two (default: 1024).
    #[serde(default)]
    pub window_size: Option<usize>,

    /// Where the window starts, in seconds from the beginning (default: 0).
    #[serde(default)]
    pub offset_secs: Option<f64>,

    /// Number of spectral peaks to report (default: 5, max: 50).
    #[serde(default)]
    pub peaks: Option<usize>,

    /// Include the full per-bin magnitude list.
    #[serde(default)]
    pub include_bins: bool,
}

// ============================================================================
// Structured Output Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SpectrumBin {
    pub frequency_hz: f64,
    pub magnitude_db: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct BandEnergy {
    pub band: String,
    pub low_hz: f64,
    pub high_hz: f64,
    /// Share of total spectral energy in this band, 0 to 1.
    pub share: f64,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Spectrum {
    pub sample_rate: u32,
    pub window_size: usize,
    pub bin_width_hz: f64,
    /// Strongest non-DC bin; absent for silence.
    pub dominant_frequency_hz: Option<f64>,
    pub peaks: Vec<SpectrumBin>,
    pub bands: Vec<BandEnergy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins: Option<Vec<SpectrumBin>>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AudioSpectrumResult {
    pub path: String,
    pub offset_secs: f64,
    pub duration_secs: f64,
    #[serde(flatten)]
    pub spectrum: Spectrum,
}

// ============================================================================
// Analysis
// ============================================================================

/// Amplitude per bin `0..=window/2` of a Hann-windowed DFT.
///
/// `samples` shorter than `window` are zero-padded.
pub fn magnitudes(samples: &[f32], window: usize) -> Vec<f64> {
    let hann: Vec<f64> = (0..window)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (window - 1) as f64).cos())
        .collect();
    let gain: f64 = hann.iter().sum();
    let input: Vec<f64> = (0..window)
        .map(|i| f64::from(samples.get(i).copied().unwrap_or(0.0)) * hann[i])
        .collect();

    (0..=window / 2)
        .map(|k| {
            let step = 2.0 * PI * k as f64 / window as f64;
            let (re, im) = input
                .iter()
                .enumerate()
                .fold((0.0, 0.0), |(re, im), (i, x)| {
                    let angle = step * i as f64;
                    (re + x * angle.cos(), im - x * angle.sin())
                });
            let scale = if k == 0 || k == window / 2 { 1.0 } else { 2.0 };
            (re * re + im * im).sqrt() * scale / gain
        })
        .collect()
}

fn to_db(amplitude: f64) -> f64 {
    if amplitude <= 0.0 {
        DB_FLOOR
    } else {
        (20.0 * amplitude.log10()).max(DB_FLOOR)
    }
}

/// Analyze `window` samples of the mono mix starting at frame `offset`.
pub fn analyze(
    clip: &AudioClip,
    offset: usize,
    window: usize,
    peak_count: usize,
    include_bins: bool,
) -> Spectrum {
    let mono = clip.mono_mix();
    let start = offset.min(mono.len());
    let end = (start + window).min(mono.len());
    let mags = magnitudes(&mono[start..end], window);

    let bin_width = f64::from(clip.sample_rate) / window as f64;
    let bin = |k: usize| SpectrumBin {
        frequency_hz: round2(k as f64 * bin_width),
        magnitude_db: round2(to_db(mags[k])),
    };

    let dominant = (1..mags.len())
        .filter(|&k| mags[k] > 0.0)
        .max_by(|&a, &b| mags[a].total_cmp(&mags[b]))
        .map(|k| round2(k as f64 * bin_width));

    let mut local_maxima: Vec<usize> = (1..mags.len())
        .filter(|&k| {
            let left = mags[k - 1];
            let right = mags.get(k + 1).copied().unwrap_or(0.0);
            mags[k] > 0.0 && mags[k] > left && mags[k] >= right
        })
        .collect();
    local_maxima.sort_by(|&a, &b| mags[b].total_cmp(&mags[a]));
    let peaks = local_maxima.into_iter().take(peak_count).map(bin).collect();

    let energy = |k: usize| mags[k] * mags[k];
    let total: f64 = (1..mags.len()).map(energy).sum();
    let bands = BANDS
        .iter()
        .map(|&(name, low, high)| {
            let band: f64 = (1..mags.len())
                .filter(|&k| {
                    let f = k as f64 * bin_width;
                    f >= low && f < high
                })
                .map(energy)
                .sum();
            BandEnergy {
                band: name.to_string(),
                low_hz: low,
                high_hz: high,
                share: if total > 0.0 {
                    (band / total * 10_000.0).round() / 10_000.0
                } else {
                    0.0
                },
            }
        })
        .collect();

    Spectrum {
        sample_rate: clip.sample_rate,
        window_size: window,
        bin_width_hz: round2(bin_width),
        dominant_frequency_hz: dominant,
        peaks,
        bands,
        bins: include_bins.then(|| (0..mags.len()).map(bin).collect()),
    }
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Spectrum analyzer tool.
pub struct AudioSpectrumTool;

impl AudioSpectrumTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "audio_spectrum";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Analyze the frequency content of an audio file. Runs a Hann-windowed DFT over \
         one window of the mono mix and reports the dominant frequency, strongest peaks \
         and energy per frequency band.";

    /// Execute the tool logic (for STDIO/TCP transport via rmcp).
    #[instrument(skip_all, fields(path = %params.path))]
    pub fn execute(params: &AudioSpectrumParams, config: &Config) -> CallToolResult {
        info!("Audio spectrum tool called for path: {}", params.path);

        match Self::run(params, config) {
            Ok(result) => {
                let dominant = result
                    .spectrum
                    .dominant_frequency_hz
                    .map(|f| format!("{} Hz", f))
                    .unwrap_or_else(|| "none (silence)".to_string());
                let summary = format!(
                    "Spectrum of {} at {:.2}s ({} samples, {} Hz bins): dominant frequency {}",
                    result.path,
                    result.offset_secs,
                    result.spectrum.window_size,
                    result.spectrum.bin_width_hz,
                    dominant
                );
                info!("{}", summary);
                structured_result(summary, &result)
            }
            Err(e) => tool_error_result(&e),
        }
    }

    fn run(params: &AudioSpectrumParams, config: &Config) -> Result<AudioSpectrumResult, ToolError> {
        let window = params.window_size.unwrap_or(DEFAULT_WINDOW);
        let max_window = config.tools.audio.max_spectrum_window;
        if !window.is_power_of_two() || !(MIN_SPECTRUM_WINDOW..=max_window).contains(&window) {
            return Err(ToolError::invalid_arguments(format!(
                "window_size must be a power of two between {} and {}",
                MIN_SPECTRUM_WINDOW, max_window
            )));
        }

        let peak_count = params.peaks.unwrap_or(DEFAULT_PEAKS);
        if peak_count > MAX_PEAKS {
            return Err(ToolError::invalid_arguments(format!(
                "peaks must be at most {}",
                MAX_PEAKS
            )));
        }

        let offset_secs = params.offset_secs.unwrap_or(0.0);
        if !offset_secs.is_finite() || offset_secs < 0.0 {
            return Err(ToolError::invalid_arguments("offset_secs must be non-negative"));
        }

        let input = validate_path(&params.path, config)?;
        let clip = decode_file(&input, &config.tools.audio)?;

        let offset = (offset_secs * f64::from(clip.sample_rate)).round() as usize;
        if offset >= clip.frames() {
            return Err(ToolError::invalid_arguments(format!(
                "offset {:.2}s is past the end of the audio ({:.2}s)",
                offset_secs,
                clip.duration_secs()
            )));
        }
        debug!("Analyzing {} samples from frame {}", window, offset);

        Ok(AudioSpectrumResult {
            path: input.display().to_string(),
            offset_secs,
            duration_secs: clip.duration_secs(),
            spectrum: analyze(&clip, offset, window, peak_count, params.include_bins),
        })
    }

    /// HTTP handler for this tool (for HTTP transport).
    #[cfg(feature = "http")]
    pub fn http_handler(
        arguments: serde_json::Value,
        config: Arc<Config>,
    ) -> Result<serde_json::Value, String> {
        use crate::domains::tools::definitions::common::{http_response, parse_http_args};

        let params: AudioSpectrumParams = parse_http_args(arguments)?;
        info!("Audio spectrum tool (HTTP) called for path: {}", params.path);
        Ok(http_response(Self::execute(&params, &config)))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<AudioSpectrumParams>(),
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
                let params: AudioSpectrumParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(run_blocking(move || Self::execute(&params, &config)).await)
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::audio::wav::encode_wav;
    use tempfile::TempDir;

    fn sine(freq: f64, rate: u32, frames: usize, amplitude: f32) -> AudioClip {
        let samples = (0..frames)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / f64::from(rate)).sin() as f32)
            .collect();
        AudioClip::new(rate, 1, samples).unwrap()
    }

    fn params(path: &str) -> AudioSpectrumParams {
        serde_json::from_value(serde_json::json!({ "path": path })).unwrap()
    }

    #[test]
    fn test_dominant_frequency_of_sine() {
        let clip = sine(1_000.0, 8_000, 4_096, 0.8);
        let spectrum = analyze(&clip, 0, 1024, 3, false);

        assert_eq!(spectrum.bin_width_hz, 7.81);
        assert_eq!(spectrum.dominant_frequency_hz, Some(1000.0));
        assert_eq!(spectrum.peaks[0].frequency_hz, 1000.0);
        assert!(spectrum.bins.is_none());

        let mid = spectrum.bands.iter().find(|b| b.band == "mid").unwrap();
        assert!(mid.share > 0.99);
    }

    #[test]
    fn test_sine_amplitude_is_recovered() {
        let clip = sine(1_000.0, 8_000, 1_024, 0.5);
        let mags = magnitudes(&clip.samples, 1024);
        assert!((mags[128] - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_silence_has_no_dominant_frequency() {
        let clip = AudioClip::silence(8_000, 2, 2_048);
        let spectrum = analyze(&clip, 0, 256, 5, true);

        assert_eq!(spectrum.dominant_frequency_hz, None);
        assert!(spectrum.peaks.is_empty());
        assert!(spectrum.bands.iter().all(|b| b.share == 0.0));
        let bins = spectrum.bins.unwrap();
        assert_eq!(bins.len(), 129);
        assert_eq!(bins[0].magnitude_db, DB_FLOOR);
    }

    #[test]
    fn test_short_tail_is_zero_padded() {
        let clip = sine(500.0, 8_000, 300, 0.5);
        let spectrum = analyze(&clip, 200, 1024, 1, false);
        assert_eq!(spectrum.window_size, 1024);
        assert!(spectrum.dominant_frequency_hz.is_some());
    }

    #[test]
    fn test_tool_rejects_bad_window() {
        let mut p = params("/tmp/whatever.wav");
        p.window_size = Some(1000);
        let result = AudioSpectrumTool::execute(&p, &Config::default());
        assert_eq!(result.is_error, Some(true));

        p.window_size = Some(1 << 20);
        let result = AudioSpectrumTool::execute(&p, &Config::default());
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_tool_on_wav_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, encode_wav(&sine(1_000.0, 8_000, 8_000, 0.5))).unwrap();

        let result = AudioSpectrumTool::execute(&params(path.to_str().unwrap()), &Config::default());
        assert_eq!(result.is_error, Some(false));
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["dominant_frequency_hz"], 1000.0);
        assert_eq!(structured["window_size"], 1024);
    }

    #[test]
    fn test_tool_offset_past_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.wav");
        std::fs::write(&path, encode_wav(&AudioClip::silence(8_000, 1, 800))).unwrap();

        let mut p = params(path.to_str().unwrap());
        p.offset_secs = Some(5.0);
        let result = AudioSpectrumTool::execute(&p, &Config::default());
        assert_eq!(result.is_error, Some(true));
    }
}
