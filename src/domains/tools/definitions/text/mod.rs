//! Text tools module.

pub mod markdown;
pub mod minify_js;
pub mod regex_test;
pub mod word_count;

pub use markdown::{MarkdownParams, TextMarkdownToHtmlTool};
pub use minify_js::{MinifyJsParams, TextMinifyJsTool};
pub use regex_test::{RegexTestParams, TextRegexTestTool};
pub use word_count::{TextWordCountTool, WordCountParams};
