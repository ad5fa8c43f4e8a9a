//! Tool Registry - central registration and dispatch for all tools.
//!
//! This module provides:
//! - A registry of all available tools, grouped by category
//! - HTTP dispatch for tool calls (when http feature is enabled)
//! - Tool metadata for listing

use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "http")]
use tracing::warn;

use rmcp::model::Tool;

use crate::core::config::Config;

use super::definitions::{
    AudioConvertWavTool, AudioEffectTool, AudioSpectrumTool, CalcAgeTool, CalcBmiTool,
    CalcEmiTool, ImageRemoveBackgroundTool, TextMarkdownToHtmlTool, TextMinifyJsTool,
    TextRegexTestTool, TextWordCountTool,
};

/// Tool grouping used by the catalog resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Image,
    Audio,
    Text,
    Calculator,
}

// ============================================================================
// Tool Registry
// ============================================================================

/// Tool registry - manages all available tools.
pub struct ToolRegistry {
    #[cfg_attr(not(feature = "http"), allow(dead_code))]
    config: Arc<Config>,
}

impl ToolRegistry {
    /// Create a new tool registry.
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Get all tool names.
    pub fn tool_names(&self) -> Vec<&'static str> {
        Self::categorized_tools()
            .into_iter()
            .map(|(_, name, _)| name)
            .collect()
    }

    /// Every tool with its category and registered name.
    ///
    /// This is the single source of truth for listing; both transports and
    /// the catalog resource read from it.
    pub fn categorized_tools() -> Vec<(ToolCategory, &'static str, Tool)> {
        use ToolCategory::*;
        vec![
            (Image, ImageRemoveBackgroundTool::NAME, ImageRemoveBackgroundTool::to_tool()),
            (Audio, AudioConvertWavTool::NAME, AudioConvertWavTool::to_tool()),
            (Audio, AudioEffectTool::NAME, AudioEffectTool::to_tool()),
            (Audio, AudioSpectrumTool::NAME, AudioSpectrumTool::to_tool()),
            (Text, TextWordCountTool::NAME, TextWordCountTool::to_tool()),
            (Text, TextMarkdownToHtmlTool::NAME, TextMarkdownToHtmlTool::to_tool()),
            (Text, TextMinifyJsTool::NAME, TextMinifyJsTool::to_tool()),
            (Text, TextRegexTestTool::NAME, TextRegexTestTool::to_tool()),
            (Calculator, CalcEmiTool::NAME, CalcEmiTool::to_tool()),
            (Calculator, CalcBmiTool::NAME, CalcBmiTool::to_tool()),
            (Calculator, CalcAgeTool::NAME, CalcAgeTool::to_tool()),
        ]
    }

    /// Get all tools as Tool models (metadata).
    pub fn get_all_tools() -> Vec<Tool> {
        Self::categorized_tools()
            .into_iter()
            .map(|(_, _, tool)| tool)
            .collect()
    }

    /// Dispatch an HTTP tool call to the appropriate handler.
    #[cfg(feature = "http")]
    pub fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        match name {
            ImageRemoveBackgroundTool::NAME => {
                ImageRemoveBackgroundTool::http_handler(arguments, self.config.clone())
            }
            AudioConvertWavTool::NAME => {
                AudioConvertWavTool::http_handler(arguments, self.config.clone())
            }
            AudioEffectTool::NAME => AudioEffectTool::http_handler(arguments, self.config.clone()),
            AudioSpectrumTool::NAME => {
                AudioSpectrumTool::http_handler(arguments, self.config.clone())
            }
            TextWordCountTool::NAME => TextWordCountTool::http_handler(arguments),
            TextMarkdownToHtmlTool::NAME => TextMarkdownToHtmlTool::http_handler(arguments),
            TextMinifyJsTool::NAME => TextMinifyJsTool::http_handler(arguments),
            TextRegexTestTool::NAME => TextRegexTestTool::http_handler(arguments),
            CalcEmiTool::NAME => CalcEmiTool::http_handler(arguments),
            CalcBmiTool::NAME => CalcBmiTool::http_handler(arguments),
            CalcAgeTool::NAME => CalcAgeTool::http_handler(arguments),
            _ => {
                warn!("Unknown tool requested: {}", name);
                Err(format!("Unknown tool: {}", name))
            }
        }
    }
}
