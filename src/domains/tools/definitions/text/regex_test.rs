//! Regex tester tool definition.

use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::{Captures, Regex, RegexBuilder};
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{structured_result, tool_error_result};

/// Matches beyond this are counted but not listed.
pub const MAX_LISTED_MATCHES: usize = 1000;
const COMPILED_SIZE_LIMIT: usize = 10 * (1 << 20);

/// One `$` token of a JS replacement template, scanned left to right.
static JS_REPLACEMENT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:\$|&|<([A-Za-z_][A-Za-z0-9_]*)>|\{([A-Za-z0-9_]+)\}|([0-9]{1,2}))?").unwrap()
});

/// Parameters for the regex tester.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RegexTestParams {
    /// Regular expression (Rust `regex` syntax; no lookaround or backreferences).
    pub pattern: String,

    /// Text to search.
    pub text: String,

    /// Flags: g (all matches), i (ignore case), m (multi-line), s (dot matches newline), x (verbose).
    #[serde(default)]
    pub flags: String,

    /// Replacement template: `$1`, `${name}`, `$<name>`, `$&` for the whole match, `$$` for a literal `$`.
    #[serde(default)]
    pub replacement: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub global: bool,
    pub ignore_case: bool,
    pub multi_line: bool,
    pub dot_all: bool,
    pub verbose: bool,
}

impl RegexFlags {
    /// Parse a JS-style flag string such as `"gi"`.
    pub fn parse(flags: &str) -> Result<Self, ToolError> {
        let mut parsed = Self::default();
        for c in flags.chars() {
            let slot = match c {
                'g' => &mut parsed.global,
                'i' => &mut parsed.ignore_case,
                'm' => &mut parsed.multi_line,
                's' => &mut parsed.dot_all,
                'x' => &mut parsed.verbose,
                other => {
                    return Err(ToolError::invalid_arguments(format!(
                        "unknown regex flag '{}'",
                        other
                    )));
                }
            };
            if *slot {
                return Err(ToolError::invalid_arguments(format!(
                    "duplicate regex flag '{}'",
                    c
                )));
            }
            *slot = true;
        }
        Ok(parsed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct RegexMatch {
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Numbered groups 1..n; `null` for groups that did not participate.
    pub groups: Vec<Option<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub named_groups: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RegexTestResult {
    pub pattern: String,
    pub flags: String,
    pub match_count: usize,
    pub truncated: bool,
    pub matches: Vec<RegexMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<String>,
}

/// Compile `pattern` with the given flags.
pub fn build_regex(pattern: &str, flags: RegexFlags) -> Result<Regex, ToolError> {
    RegexBuilder::new(pattern)
        .case_insensitive(flags.ignore_case)
        .multi_line(flags.multi_line)
        .dot_matches_new_line(flags.dot_all)
        .ignore_whitespace(flags.verbose)
        .size_limit(COMPILED_SIZE_LIMIT)
        .build()
        .map_err(|e| ToolError::invalid_arguments(format!("invalid pattern: {}", e)))
}

/// Rewrite a JS replacement template into the `regex` crate's syntax.
///
/// `group_count` is `Regex::captures_len`, so group 0 is included. Numeric
/// references are always braced so `$1x` stays group 1 followed by `x`. A
/// two-digit reference to a missing group falls back to one digit plus a
/// literal, and `$` tokens JS leaves alone come out as literal `$`.
fn translate_replacement(template: &str, group_count: usize) -> String {
    let group = |n: usize| (1..group_count).contains(&n);
    JS_REPLACEMENT_TOKEN
        .replace_all(template, |caps: &Captures| {
            if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
                return format!("${{{}}}", name.as_str());
            }
            if let Some(digits) = caps.get(3) {
                let digits = digits.as_str();
                let (first, rest) = digits.split_at(1);
                return match (digits.parse::<usize>(), first.parse::<usize>()) {
                    (Ok(n), _) if group(n) => format!("${{{}}}", n),
                    (_, Ok(n)) if group(n) => format!("${{{}}}{}", n, rest),
                    _ => format!("$${}", digits),
                };
            }
            match &caps[0] {
                "$&" => "${0}".to_string(),
                _ => "$$".to_string(),
            }
        })
        .into_owned()
}

/// Run `regex` over `text`, listing all matches when `global` is set and the
/// first one otherwise.
pub fn collect_matches(regex: &Regex, text: &str, global: bool) -> (usize, Vec<RegexMatch>) {
    let names: Vec<(usize, &str)> = regex
        .capture_names()
        .enumerate()
        .filter_map(|(i, name)| name.map(|n| (i, n)))
        .collect();

    let limit = if global { usize::MAX } else { 1 };
    let mut total = 0;
    let mut matches = Vec::new();

    for caps in regex.captures_iter(text).take(limit) {
        total += 1;
        if matches.len() >= MAX_LISTED_MATCHES {
            continue;
        }
        let Some(whole) = caps.get(0) else { continue };
        let group = |i: usize| caps.get(i).map(|m| m.as_str().to_string());

        matches.push(RegexMatch {
            start: whole.start(),
            end: whole.end(),
            text: whole.as_str().to_string(),
            groups: (1..caps.len()).map(group).collect(),
            named_groups: names
                .iter()
                .map(|&(i, name)| (name.to_string(), group(i)))
                .collect(),
        });
    }

    (total, matches)
}

/// Regex tester tool.
pub struct TextRegexTestTool;

impl TextRegexTestTool {
    pub const NAME: &'static str = "text_regex_test";

    pub const DESCRIPTION: &'static str = "Test a regular expression against a text. Lists matches with byte offsets and \
         capture groups, and optionally shows the result of a replacement. \
         Supports flags g, i, m, s and x.";

    #[instrument(skip_all, fields(pattern = %params.pattern, flags = %params.flags))]
    pub fn execute(params: &RegexTestParams) -> CallToolResult {
        info!("Regex test tool called with pattern: {}", params.pattern);

        match Self::run(params) {
            Ok(result) => {
                let mut summary = format!(
                    "/{}/{} matched {} time(s)",
                    result.pattern, result.flags, result.match_count
                );
                if result.truncated {
                    summary.push_str(&format!(" (first {} listed)", MAX_LISTED_MATCHES));
                }
                if let Some(replaced) = &result.replaced {
                    summary.push_str(&format!("\n\nReplaced:\n{}", replaced));
                }
                structured_result(summary, &result)
            }
            Err(e) => tool_error_result(&e),
        }
    }

    fn run(params: &RegexTestParams) -> Result<RegexTestResult, ToolError> {
        let flags = RegexFlags::parse(&params.flags)?;
        let regex = build_regex(&params.pattern, flags)?;
        let (match_count, matches) = collect_matches(&regex, &params.text, flags.global);

        let replaced = params.replacement.as_deref().map(|template| {
            let template = translate_replacement(template, regex.captures_len());
            let limit = if flags.global { 0 } else { 1 };
            regex
                .replacen(&params.text, limit, template.as_str())
                .into_owned()
        });

        Ok(RegexTestResult {
            pattern: params.pattern.clone(),
            flags: params.flags.clone(),
            truncated: match_count > matches.len(),
            match_count,
            matches,
            replaced,
        })
    }

    #[cfg(feature = "http")]
    pub fn http_handler(arguments: serde_json::Value) -> Result<serde_json::Value, String> {
        use crate::domains::tools::definitions::common::{http_response, parse_http_args};

        let params: RegexTestParams = parse_http_args(arguments)?;
        Ok(http_response(Self::execute(&params)))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<RegexTestParams>(),
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
                let params: RegexTestParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params))
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pattern: &str, text: &str, flags: &str) -> RegexTestParams {
        RegexTestParams {
            pattern: pattern.into(),
            text: text.into(),
            flags: flags.into(),
            replacement: None,
        }
    }

    #[test]
    fn test_flag_parsing() {
        let flags = RegexFlags::parse("gim").unwrap();
        assert!(flags.global && flags.ignore_case && flags.multi_line);
        assert!(!flags.dot_all);
        assert!(RegexFlags::parse("gq").is_err());
        assert!(RegexFlags::parse("gg").is_err());
        assert_eq!(RegexFlags::parse("").unwrap(), RegexFlags::default());
    }

    #[test]
    fn test_global_matches_with_groups() {
        let result = TextRegexTestTool::run(&params(
            r"(\d+)-(?P<unit>[a-z]+)",
            "10-kg and 20-lb",
            "g",
        ))
        .unwrap();

        assert_eq!(result.match_count, 2);
        assert!(!result.truncated);
        let second = &result.matches[1];
        assert_eq!((second.start, second.end), (10, 15));
        assert_eq!(second.text, "20-lb");
        assert_eq!(second.groups, vec![Some("20".into()), Some("lb".into())]);
        assert_eq!(second.named_groups["unit"], Some("lb".into()));
    }

    #[test]
    fn test_without_global_only_first_match() {
        let result = TextRegexTestTool::run(&params(r"\d", "1 2 3", "")).unwrap();
        assert_eq!(result.match_count, 1);
        assert_eq!(result.matches[0].text, "1");
    }

    #[test]
    fn test_case_insensitive_and_optional_group() {
        let result = TextRegexTestTool::run(&params(r"hello( world)?", "HELLO there", "i")).unwrap();
        assert_eq!(result.matches[0].groups, vec![None]);
    }

    #[test]
    fn test_replacement_js_syntax() {
        let mut p = params(r"(?P<word>\w+)@(\w+)", "a@b c@d", "g");
        p.replacement = Some("$2:$<word>[$&]".into());
        let result = TextRegexTestTool::run(&p).unwrap();
        assert_eq!(result.replaced.as_deref(), Some("b:a[a@b] d:c[c@d]"));

        p.flags = String::new();
        p.replacement = Some("${2}".into());
        let result = TextRegexTestTool::run(&p).unwrap();
        assert_eq!(result.replaced.as_deref(), Some("b c@d"));
    }

    #[test]
    fn test_numeric_reference_followed_by_text() {
        let mut p = params(r"(\w)(\w)", "ab", "");
        p.replacement = Some("$1x|$2_".into());
        let result = TextRegexTestTool::run(&p).unwrap();
        assert_eq!(result.replaced.as_deref(), Some("ax|b_"));

        // Only two groups exist, so `$12` is group 1 then "2".
        p.replacement = Some("$12".into());
        let result = TextRegexTestTool::run(&p).unwrap();
        assert_eq!(result.replaced.as_deref(), Some("a2"));
    }

    #[test]
    fn test_escaped_dollar_is_literal() {
        let mut p = params(r"(?P<word>\w+)", "hi", "");
        p.replacement = Some("$$&".into());
        let result = TextRegexTestTool::run(&p).unwrap();
        assert_eq!(result.replaced.as_deref(), Some("$&"));

        p.replacement = Some("$$<word> $$1 $".into());
        let result = TextRegexTestTool::run(&p).unwrap();
        assert_eq!(result.replaced.as_deref(), Some("$<word> $1 $"));
    }

    #[test]
    fn test_unknown_references_stay_literal() {
        let mut p = params(r"(\w+)", "hi", "");
        p.replacement = Some("$0 $5 $x ${1}".into());
        let result = TextRegexTestTool::run(&p).unwrap();
        assert_eq!(result.replaced.as_deref(), Some("$0 $5 $x hi"));
    }

    #[test]
    fn test_match_list_is_capped() {
        let text = "a".repeat(MAX_LISTED_MATCHES + 5);
        let result = TextRegexTestTool::run(&params("a", &text, "g")).unwrap();
        assert_eq!(result.match_count, MAX_LISTED_MATCHES + 5);
        assert_eq!(result.matches.len(), MAX_LISTED_MATCHES);
        assert!(result.truncated);
    }

    #[test]
    fn test_invalid_pattern_is_tool_error() {
        let result = TextRegexTestTool::execute(&params("(unclosed", "x", ""));
        assert_eq!(result.is_error, Some(true));
    }
}
