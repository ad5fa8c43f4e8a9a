//! Tool Router - builds the rmcp ToolRouter for STDIO/TCP transport.
//!
//! Each tool knows how to create its own route; tools that touch the file
//! system receive the shared configuration.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;

use crate::core::config::Config;

use super::definitions::{
    AudioConvertWavTool, AudioEffectTool, AudioSpectrumTool, CalcAgeTool, CalcBmiTool,
    CalcEmiTool, ImageRemoveBackgroundTool, TextMarkdownToHtmlTool, TextMinifyJsTool,
    TextRegexTestTool, TextWordCountTool,
};

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(config: Arc<Config>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolRouter::new()
        .with_route(ImageRemoveBackgroundTool::create_route(config.clone()))
        .with_route(AudioConvertWavTool::create_route(config.clone()))
        .with_route(AudioEffectTool::create_route(config.clone()))
        .with_route(AudioSpectrumTool::create_route(config))
        .with_route(TextWordCountTool::create_route())
        .with_route(TextMarkdownToHtmlTool::create_route())
        .with_route(TextMinifyJsTool::create_route())
        .with_route(TextRegexTestTool::create_route())
        .with_route(CalcEmiTool::create_route())
        .with_route(CalcBmiTool::create_route())
        .with_route(CalcAgeTool::create_route())
}
