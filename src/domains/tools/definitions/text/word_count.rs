//! Word count tool definition.

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
use std::collections::HashMap;
use tracing::{info, instrument};

use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{round2, structured_result, tool_error_result};

const READING_WPM: usize = 200;
const SPEAKING_WPM: usize = 130;
const MAX_KEYWORDS: usize = 50;
const MIN_KEYWORD_LEN: usize = 3;

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());
static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").unwrap());

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "his", "how", "its", "may", "who", "did", "yes", "she", "him",
    "too", "use", "that", "with", "have", "this", "will", "your", "from", "they", "been", "were",
    "what", "when", "than", "then", "them", "into", "also", "more", "some", "such", "which",
    "there", "their", "would", "about", "these", "other",
];

/// Parameters for the word count tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WordCountParams {
    /// Text to analyze.
    pub text: String,

    /// Number of most frequent keywords to report (default: 0, max: 50).
    #[serde(default)]
    pub top_keywords: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

/// Text statistics. All zero for empty or whitespace-only text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
pub struct WordStats {
    pub words: usize,
    pub characters: usize,
    pub characters_no_spaces: usize,
    pub sentences: usize,
    pub paragraphs: usize,
    pub lines: usize,
    pub average_word_length: f64,
    pub reading_time_minutes: usize,
    pub speaking_time_minutes: usize,
    pub keywords: Vec<KeywordCount>,
}

/// Compute statistics for `text`, with up to `keyword_limit` keywords.
pub fn count_words(text: &str, keyword_limit: usize) -> WordStats {
    let text = text.trim();
    if text.is_empty() {
        return WordStats::default();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let letters: usize = words.iter().map(|w| w.chars().count()).sum();
    let non_blank = |s: &&str| !s.trim().is_empty();

    WordStats {
        words: words.len(),
        characters: text.chars().count(),
        characters_no_spaces: letters,
        sentences: SENTENCE_END.split(text).filter(non_blank).count(),
        paragraphs: BLANK_LINE.split(text).filter(non_blank).count(),
        lines: text.lines().count(),
        average_word_length: round2(letters as f64 / words.len() as f64),
        reading_time_minutes: words.len().div_ceil(READING_WPM),
        speaking_time_minutes: words.len().div_ceil(SPEAKING_WPM),
        keywords: top_keywords(&words, keyword_limit),
    }
}

fn top_keywords(words: &[&str], limit: usize) -> Vec<KeywordCount> {
    if limit == 0 {
        return Vec::new();
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in words {
        let normalized = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if normalized.chars().count() < MIN_KEYWORD_LEN || STOP_WORDS.contains(&normalized.as_str())
        {
            continue;
        }
        *counts.entry(normalized).or_default() += 1;
    }

    let mut ranked: Vec<KeywordCount> = counts
        .into_iter()
        .map(|(word, count)| KeywordCount { word, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    ranked.truncate(limit);
    ranked
}

/// Word count tool.
pub struct TextWordCountTool;

impl TextWordCountTool {
    pub const NAME: &'static str = "text_word_count";

    pub const DESCRIPTION: &'static str = "Count words, characters, sentences, paragraphs and lines in a text. \
         Also estimates reading and speaking time and can list the most frequent keywords.";

    #[instrument(skip_all, fields(len = params.text.len()))]
    pub fn execute(params: &WordCountParams) -> CallToolResult {
        info!("Word count tool called ({} bytes)", params.text.len());

        if params.top_keywords > MAX_KEYWORDS {
            return tool_error_result(&ToolError::invalid_arguments(format!(
                "top_keywords must be at most {}",
                MAX_KEYWORDS
            )));
        }

        let stats = count_words(&params.text, params.top_keywords);
        let summary = format!(
            "{} words, {} characters ({} without spaces), {} sentences, {} paragraphs. \
             Reading time ~{} min, speaking time ~{} min",
            stats.words,
            stats.characters,
            stats.characters_no_spaces,
            stats.sentences,
            stats.paragraphs,
            stats.reading_time_minutes,
            stats.speaking_time_minutes
        );
        structured_result(summary, &stats)
    }

    #[cfg(feature = "http")]
    pub fn http_handler(arguments: serde_json::Value) -> Result<serde_json::Value, String> {
        use crate::domains::tools::definitions::common::{http_response, parse_http_args};

        let params: WordCountParams = parse_http_args(arguments)?;
        Ok(http_response(Self::execute(&params)))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<WordCountParams>(),
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
                let params: WordCountParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params))
            }
            .boxed()
        })
    }
}
