//! Markdown to HTML tool definition.
//!
//! A line-oriented converter for the common subset of Markdown: headings,
//! fenced code, blockquotes, lists, rules and paragraphs, with inline images,
//! links, emphasis, strikethrough and code spans. Input is HTML-escaped before
//! any inline rule runs, so raw HTML in the source is shown as text.

use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::domains::tools::definitions::common::structured_result;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$").unwrap());
static RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s{0,3}(?:(?:-\s*){3,}|(?:\*\s*){3,}|(?:_\s*){3,})$").unwrap()
});
static QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s{0,3}>\s?(.*)$").unwrap());
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").unwrap());
static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s+(.*)$").unwrap());

static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").unwrap());
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*|__([^_]+)__").unwrap());
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*|\b_([^_]+)_\b").unwrap());
static STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~([^~]+)~~").unwrap());

/// Parameters for the Markdown conversion tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MarkdownParams {
    /// Markdown source.
    pub markdown: String,

    /// Wrap the output in a complete HTML document.
    #[serde(default)]
    pub full_document: bool,

    /// Document title when `full_document` is set (default: "Document").
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MarkdownResult {
    pub html: String,
    pub input_bytes: usize,
    pub output_bytes: usize,
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn safe_url(url: &str) -> &str {
    let lower = url.trim_start().to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("vbscript:") || lower.starts_with("data:")
    {
        "#"
    } else {
        url
    }
}

/// Apply inline rules to one already-escaped run of text outside code spans.
fn inline_rules(text: &str) -> String {
    let text = IMAGE.replace_all(text, |c: &Captures| {
        format!(r#"<img src="{}" alt="{}">"#, safe_url(&c[2]), &c[1])
    });
    let text = LINK.replace_all(&text, |c: &Captures| {
        format!(r#"<a href="{}">{}</a>"#, safe_url(&c[2]), &c[1])
    });
    let text = BOLD.replace_all(&text, |c: &Captures| {
        let inner = c.get(1).or_else(|| c.get(2)).map_or("", |m| m.as_str());
        format!("<strong>{}</strong>", inner)
    });
    let text = ITALIC.replace_all(&text, |c: &Captures| {
        let inner = c.get(1).or_else(|| c.get(2)).map_or("", |m| m.as_str());
        format!("<em>{}</em>", inner)
    });
    STRIKE.replace_all(&text, "<del>${1}</del>").into_owned()
}

/// Escape `text` and convert inline Markdown; code spans are left literal.
pub fn render_inline(text: &str) -> String {
    let escaped = escape_html(text);
    let mut out = String::with_capacity(escaped.len());
    let mut last = 0;
    for caps in CODE_SPAN.captures_iter(&escaped) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&inline_rules(&escaped[last..whole.start()]));
        out.push_str("<code>");
        out.push_str(code.as_str());
        out.push_str("</code>");
        last = whole.end();
    }
    out.push_str(&inline_rules(&escaped[last..]));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Numbered,
}

#[derive(Default)]
struct Renderer {
    html: String,
    paragraph: Vec<String>,
    quote: Vec<String>,
    list: Option<(ListKind, Vec<String>)>,
    code: Option<(String, Vec<String>)>,
}

impl Renderer {
    fn flush(&mut self) {
        if !self.paragraph.is_empty() {
            let body = render_inline(&self.paragraph.join("\n"));
            self.html.push_str(&format!("<p>{}</p>\n", body));
            self.paragraph.clear();
        }
        if !self.quote.is_empty() {
            let body = render_inline(&self.quote.join("\n"));
            self.html
                .push_str(&format!("<blockquote>\n<p>{}</p>\n</blockquote>\n", body));
            self.quote.clear();
        }
        if let Some((kind, items)) = self.list.take() {
            let tag = match kind {
                ListKind::Bullet => "ul",
                ListKind::Numbered => "ol",
            };
            self.html.push_str(&format!("<{}>\n", tag));
            for item in items {
                self.html
                    .push_str(&format!("<li>{}</li>\n", render_inline(&item)));
            }
            self.html.push_str(&format!("</{}>\n", tag));
        }
    }

    fn list_item(&mut self, kind: ListKind, item: &str) {
        if !matches!(&self.list, Some((k, _)) if *k == kind) {
            self.flush();
            self.list = Some((kind, Vec::new()));
        }
        if let Some((_, items)) = self.list.as_mut() {
            items.push(item.to_string());
        }
    }

    fn close_code(&mut self) {
        if let Some((lang, lines)) = self.code.take() {
            let class = if lang.is_empty() {
                String::new()
            } else {
                format!(r#" class="language-{}""#, escape_html(&lang))
            };
            self.html.push_str(&format!(
                "<pre><code{}>{}</code></pre>\n",
                class,
                escape_html(&lines.join("\n"))
            ));
        }
    }

    fn line(&mut self, line: &str) {
        let trimmed = line.trim_start();

        if let Some(fence) = trimmed.strip_prefix("```") {
            if self.code.is_some() {
                self.close_code();
            } else {
                self.flush();
                self.code = Some((fence.trim().to_string(), Vec::new()));
            }
            return;
        }
        if let Some((_, lines)) = self.code.as_mut() {
            lines.push(line.to_string());
            return;
        }

        if trimmed.is_empty() {
            self.flush();
        } else if let Some(c) = HEADING.captures(trimmed) {
            self.flush();
            let level = c[1].len();
            self.html.push_str(&format!(
                "<h{}>{}</h{}>\n",
                level,
                render_inline(&c[2]),
                level
            ));
        } else if RULE.is_match(line) {
            self.flush();
            self.html.push_str("<hr>\n");
        } else if let Some(c) = QUOTE.captures(line) {
            if self.quote.is_empty() {
                self.flush();
            }
            self.quote.push(c[1].to_string());
        } else if let Some(c) = BULLET.captures(line) {
            self.list_item(ListKind::Bullet, &c[1]);
        } else if let Some(c) = NUMBERED.captures(line) {
            self.list_item(ListKind::Numbered, &c[1]);
        } else {
            if !self.quote.is_empty() || self.list.is_some() {
                self.flush();
            }
            self.paragraph.push(trimmed.to_string());
        }
    }

    fn finish(mut self) -> String {
        self.flush();
        // An unterminated fence runs to the end of the input.
        self.close_code();
        self.html
    }
}

/// Convert Markdown to an HTML fragment.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut renderer = Renderer::default();
    for line in markdown.lines() {
        renderer.line(line);
    }
    renderer.finish()
}

/// Wrap a fragment in a minimal HTML5 document.
pub fn wrap_document(body: &str, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        body
    )
}

/// Markdown to HTML tool.
pub struct TextMarkdownToHtmlTool;

impl TextMarkdownToHtmlTool {
    pub const NAME: &'static str = "text_markdown_to_html";

    pub const DESCRIPTION: &'static str = "Convert Markdown to HTML. Supports headings, fenced code blocks, blockquotes, \
         lists, horizontal rules, images, links, bold, italic, strikethrough and inline code. \
         Raw HTML in the input is escaped.";

    #[instrument(skip_all, fields(len = params.markdown.len()))]
    pub fn execute(params: &MarkdownParams) -> CallToolResult {
        info!("Markdown tool called ({} bytes)", params.markdown.len());

        let fragment = markdown_to_html(&params.markdown);
        let html = if params.full_document {
            wrap_document(&fragment, params.title.as_deref().unwrap_or("Document"))
        } else {
            fragment
        };

        let result = MarkdownResult {
            input_bytes: params.markdown.len(),
            output_bytes: html.len(),
            html,
        };
        structured_result(result.html.clone(), &result)
    }

    #[cfg(feature = "http")]
    pub fn http_handler(arguments: serde_json::Value) -> Result<serde_json::Value, String> {
        use crate::domains::tools::definitions::common::{http_response, parse_http_args};

        let params: MarkdownParams = parse_http_args(arguments)?;
        Ok(http_response(Self::execute(&params)))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<MarkdownParams>(),
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
                let params: MarkdownParams =
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

    #[test]
    fn test_headings() {
        assert_eq!(markdown_to_html("# Title"), "<h1>Title</h1>\n");
        assert_eq!(markdown_to_html("### Sub ###"), "<h3>Sub</h3>\n");
        assert_eq!(markdown_to_html("#NoSpace"), "<p>#NoSpace</p>\n");
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        assert_eq!(
            markdown_to_html("one\ntwo\n\nthree"),
            "<p>one\ntwo</p>\n<p>three</p>\n"
        );
    }

    #[test]
    fn test_inline_rules() {
        assert_eq!(
            render_inline("**bold** and *it* and ~~gone~~ and `x*y*z`"),
            "<strong>bold</strong> and <em>it</em> and <del>gone</del> and <code>x*y*z</code>"
        );
        assert_eq!(
            render_inline("see [docs](https://example.com?a=1&b=2)"),
            r#"see <a href="https://example.com?a=1&amp;b=2">docs</a>"#
        );
        assert_eq!(
            render_inline("![cat](cat.png)"),
            r#"<img src="cat.png" alt="cat">"#
        );
    }

    #[test]
    fn test_snake_case_is_not_italic() {
        assert_eq!(render_inline("my_var_name"), "my_var_name");
        assert_eq!(render_inline("_word_"), "<em>word</em>");
    }

    #[test]
    fn test_html_is_escaped() {
        assert_eq!(
            markdown_to_html("<script>alert('x')</script>"),
            "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;</p>\n"
        );
    }

    #[test]
    fn test_javascript_links_neutralized() {
        assert_eq!(
            render_inline("[x](javascript:alert(1))"),
            r##"<a href="#">x</a>)"##
        );
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            markdown_to_html("- a\n- b\n1. c\n2. d"),
            "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n<ol>\n<li>c</li>\n<li>d</li>\n</ol>\n"
        );
    }

    #[test]
    fn test_rule_and_quote() {
        assert_eq!(
            markdown_to_html("> quoted\n> text\n\n---"),
            "<blockquote>\n<p>quoted\ntext</p>\n</blockquote>\n<hr>\n"
        );
    }

    #[test]
    fn test_fenced_code_is_literal() {
        let html = markdown_to_html("```rust\nlet x = **y** < 3;\n\n# not a heading\n```");
        assert_eq!(
            html,
            "<pre><code class=\"language-rust\">let x = **y** &lt; 3;\n\n# not a heading</code></pre>\n"
        );
    }

    #[test]
    fn test_unterminated_fence() {
        assert_eq!(
            markdown_to_html("```\ncode"),
            "<pre><code>code</code></pre>\n"
        );
    }

    #[test]
    fn test_full_document() {
        let params = MarkdownParams {
            markdown: "hi".into(),
            full_document: true,
            title: Some("A & B".into()),
        };
        let result = TextMarkdownToHtmlTool::execute(&params);
        let html = result.structured_content.unwrap()["html"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains("<p>hi</p>"));
    }
}
