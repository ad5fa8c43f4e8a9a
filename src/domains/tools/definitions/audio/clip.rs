//! Decoded audio held in memory.
//!
//! Files are decoded with symphonia into interleaved `f32` samples; effects
//! and analysis work on this representation and the WAV encoder writes it
//! back out.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::core::config::AudioConfig;
use crate::domains::tools::ToolError;

/// Interleaved PCM samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioClip {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Result<Self, ToolError> {
        if sample_rate == 0 {
            return Err(ToolError::invalid_arguments("sample rate must be positive"));
        }
        if channels == 0 {
            return Err(ToolError::invalid_arguments("channel count must be positive"));
        }
        if samples.len() % usize::from(channels) != 0 {
            return Err(ToolError::invalid_arguments(
                "sample count is not a multiple of the channel count",
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    /// `frames` frames of digital silence.
    pub fn silence(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            samples: vec![0.0; frames * usize::from(channels)],
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Average of all channels per frame.
    pub fn mono_mix(&self) -> Vec<f32> {
        let channels = usize::from(self.channels);
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

/// Decode an audio file (mp3, flac, ogg/vorbis, wav, aac, m4a) into memory.
///
/// Decoding stops with a resource-limit error once the configured maximum
/// duration has been read.
pub fn decode_file(path: &Path, config: &AudioConfig) -> Result<AudioClip, ToolError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let detected = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ToolError::decode(format!("unsupported or corrupt audio: {}", e)))?;
    let mut format = detected.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ToolError::decode("no decodable audio track"))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ToolError::decode(format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(ToolError::decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(ToolError::decode(e.to_string())),
        }

        if channels > 0 && sample_rate > 0 {
            let seconds = samples.len() as u64 / u64::from(channels) / u64::from(sample_rate);
            if seconds > config.max_duration_secs {
                return Err(ToolError::resource_limit(format!(
                    "audio is longer than {} seconds",
                    config.max_duration_secs
                )));
            }
        }
    }

    if samples.is_empty() {
        return Err(ToolError::decode("file contains no audio samples"));
    }

    debug!(
        "Decoded {} samples ({} Hz, {} channels)",
        samples.len(),
        sample_rate,
        channels
    );
    AudioClip::new(sample_rate, channels, samples)
}
