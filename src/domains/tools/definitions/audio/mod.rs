//! Audio tools module.
//!
//! Decoding goes through symphonia into an in-memory [`AudioClip`]; results
//! are written back as 16-bit PCM WAV.

pub mod clip;
pub mod convert;
pub mod effects;
pub mod spectrum;
pub mod wav;

pub use clip::AudioClip;
pub use convert::{AudioConvertParams, AudioConvertWavTool};
pub use effects::{AudioEffect, AudioEffectParams, AudioEffectTool};
pub use spectrum::{AudioSpectrumParams, AudioSpectrumTool};
