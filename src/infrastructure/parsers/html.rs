//! HTML parser

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::domain::parser::{matches_any, DocumentParser, ParsedDocument, ParserInput};
use crate::domain::ImporterError;

/// Extracts the title and visible body text
#[derive(Debug, Clone, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }

    fn extract_title(document: &Html) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn extract_meta(document: &Html) -> Vec<(String, String)> {
        let Ok(selector) = Selector::parse("meta[name][content]") else {
            return Vec::new();
        };

        document
            .select(&selector)
            .filter_map(|el| {
                let name = el.value().attr("name")?.trim().to_lowercase();
                let content = el.value().attr("content")?.trim().to_string();
                (!name.is_empty()).then_some((name, content))
            })
            .collect()
    }

    fn extract_text(document: &Html) -> String {
        let body = Selector::parse("body")
            .ok()
            .and_then(|sel| document.select(&sel).next());

        let text = match body {
            Some(body) => Self::element_text(&body),
            None => document.root_element().text().collect::<String>(),
        };

        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn element_text(element: &ElementRef<'_>) -> String {
        let mut text = String::new();

        for node in element.children() {
            if let Some(el) = ElementRef::wrap(node) {
                let tag = el.value().name();
                if matches!(tag, "script" | "style" | "noscript" | "head" | "template") {
                    continue;
                }

                let block = matches!(
                    tag,
                    "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "br" | "li" | "tr"
                        | "td" | "th" | "section" | "article"
                );
                if block && !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }

                text.push_str(&Self::element_text(&el));

                if block {
                    text.push('\n');
                }
            } else if let Some(t) = node.value().as_text() {
                text.push_str(t);
            }
        }

        text
    }
}

#[async_trait]
impl DocumentParser for HtmlParser {
    fn name(&self) -> &str {
        "html"
    }

    fn supports(&self, content_type: &str) -> bool {
        matches_any(content_type, &["text/html", "application/xhtml+xml"])
    }

    async fn parse(&self, input: &ParserInput) -> Result<ParsedDocument, ImporterError> {
        let raw = input.text().await?;

        let document = Html::parse_document(&raw);
        let mut parsed = ParsedDocument::new(Self::extract_text(&document));

        if let Some(title) = Self::extract_title(&document) {
            parsed.metadata.add("title", title);
        }
        for (name, content) in Self::extract_meta(&document) {
            parsed.metadata.add(name, content);
        }

        Ok(parsed)
    }
}
