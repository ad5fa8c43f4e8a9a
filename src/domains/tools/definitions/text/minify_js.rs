//! JavaScript minifier tool definition.
//!
//! Comment stripping and whitespace collapsing only; no renaming. String and
//! template literals are copied verbatim. Regex literals are not recognized,
//! so a literal containing `//` or `/*` outside a character class may be
//! mangled.

use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::domains::tools::definitions::common::{format_size, round2, structured_result};

/// Literals and comments, in priority order.
static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<template>`(?:\\[\s\S]|[^`\\])*`)",
        r#"|(?P<double>"(?:\\.|[^"\\\n])*")"#,
        r"|(?P<single>'(?:\\.|[^'\\\n])*')",
        r"|(?P<license>/\*![\s\S]*?\*/)",
        r"|(?P<block>/\*[\s\S]*?\*/)",
        r"|(?P<line>//[^\n]*)",
    ))
    .unwrap()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static AROUND_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ ]*([{}()\[\];,:=<>!&|?*/%^~])[ ]*").unwrap());
static NEWLINE_AFTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([;,{(\[])\n").unwrap());
static NEWLINE_BEFORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n([;,)}\]])").unwrap());

/// Parameters for the JS minifier.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MinifyJsParams {
    /// JavaScript source code.
    pub code: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MinifyJsResult {
    pub minified: String,
    pub original_bytes: usize,
    pub minified_bytes: usize,
    pub saved_bytes: usize,
    pub savings_percent: f64,
}

/// Collapse whitespace in a run of code that holds no literals or comments.
///
/// Runs containing a newline become a single newline so statements relying
/// on automatic semicolon insertion stay separate.
fn squeeze(code: &str) -> String {
    let collapsed = WHITESPACE.replace_all(code, |c: &regex::Captures| {
        if c[0].contains('\n') { "\n" } else { " " }
    });
    let tight = AROUND_PUNCT.replace_all(&collapsed, "${1}");
    let tight = NEWLINE_AFTER.replace_all(&tight, "${1}");
    NEWLINE_BEFORE.replace_all(&tight, "${1}").into_owned()
}

/// Minify JavaScript source.
pub fn minify_js(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut code = String::new();
    let mut last = 0;

    for caps in TOKEN.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        code.push_str(&source[last..whole.start()]);
        last = whole.end();

        if caps.name("block").is_some() {
            code.push(' ');
        } else if caps.name("line").is_some() {
            code.push('\n');
        } else {
            out.push_str(&squeeze(&code));
            code.clear();
            out.push_str(whole.as_str());
        }
    }
    code.push_str(&source[last..]);
    out.push_str(&squeeze(&code));

    out.trim().to_string()
}

/// JavaScript minifier tool.
pub struct TextMinifyJsTool;

impl TextMinifyJsTool {
    pub const NAME: &'static str = "text_minify_js";

    pub const DESCRIPTION: &'static str = "Minify JavaScript by removing comments and collapsing whitespace. String and \
         template literals are preserved; `/*! ... */` license comments are kept.";

    #[instrument(skip_all, fields(len = params.code.len()))]
    pub fn execute(params: &MinifyJsParams) -> CallToolResult {
        info!("Minify JS tool called ({} bytes)", params.code.len());

        let minified = minify_js(&params.code);
        let original_bytes = params.code.len();
        let minified_bytes = minified.len();
        let saved_bytes = original_bytes.saturating_sub(minified_bytes);
        let savings_percent = if original_bytes == 0 {
            0.0
        } else {
            round2(saved_bytes as f64 / original_bytes as f64 * 100.0)
        };
        debug!("Minified {} -> {} bytes", original_bytes, minified_bytes);

        let summary = format!(
            "Minified {} to {} (saved {}%)\n\n{}",
            format_size(original_bytes as u64),
            format_size(minified_bytes as u64),
            savings_percent,
            minified
        );
        let result = MinifyJsResult {
            minified,
            original_bytes,
            minified_bytes,
            saved_bytes,
            savings_percent,
        };
        structured_result(summary, &result)
    }

    #[cfg(feature = "http")]
    pub fn http_handler(arguments: serde_json::Value) -> Result<serde_json::Value, String> {
        use crate::domains::tools::definitions::common::{http_response, parse_http_args};

        let params: MinifyJsParams = parse_http_args(arguments)?;
        Ok(http_response(Self::execute(&params)))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<MinifyJsParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    pub fn create_route<S>() -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            async move {
                let params: MinifyJsParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params))
            }
            .boxed()
        })
    }
}
