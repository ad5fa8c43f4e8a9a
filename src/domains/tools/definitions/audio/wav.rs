//! 16-bit PCM WAV encoder.
//!
//! Layout: 44-byte RIFF/WAVE header (one `fmt ` chunk, one `data` chunk)
//! followed by little-endian interleaved samples.

use std::path::Path;

use super::clip::AudioClip;
use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::write_atomic;

pub const WAV_HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;
const PCM_FORMAT: u16 = 1;

/// Encoded size of a clip: header plus two bytes per sample.
pub fn encoded_len(clip: &AudioClip) -> usize {
    WAV_HEADER_LEN + clip.samples.len() * 2
}

/// Encode a clip as a 16-bit PCM WAV file.
///
/// Samples outside `[-1, 1]` are clamped.
pub fn encode_wav(clip: &AudioClip) -> Vec<u8> {
    let data_len = (clip.samples.len() * 2) as u32;
    let block_align = clip.channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = clip.sample_rate * u32::from(block_align);

    let mut out = Vec::with_capacity(encoded_len(clip));
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    out.extend_from_slice(&clip.channels.to_le_bytes());
    out.extend_from_slice(&clip.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for &sample in &clip.samples {
        out.extend_from_slice(&to_pcm16(sample).to_le_bytes());
    }

    out
}

/// Encode and write a clip; returns the number of bytes written.
pub fn write_wav(path: &Path, clip: &AudioClip) -> Result<u64, ToolError> {
    let bytes = encode_wav(clip);
    write_atomic(path, &bytes)?;
    Ok(bytes.len() as u64)
}

fn to_pcm16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}
