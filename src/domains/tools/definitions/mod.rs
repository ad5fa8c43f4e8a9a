//! Tool definitions module.
//!
//! Tools are grouped by category, one file per tool.

pub mod audio;
pub mod calc;
pub mod common;
pub mod image;
pub mod text;

pub use audio::{AudioConvertWavTool, AudioEffectTool, AudioSpectrumTool};
pub use calc::{CalcAgeTool, CalcBmiTool, CalcEmiTool};
pub use image::ImageRemoveBackgroundTool;
pub use text::{TextMarkdownToHtmlTool, TextMinifyJsTool, TextRegexTestTool, TextWordCountTool};
