//! Markdown parser

use async_trait::async_trait;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};

use crate::domain::parser::{matches_any, DocumentParser, ParsedDocument, ParserInput};
use crate::domain::ImporterError;

/// Renders Markdown to plain text, taking the first H1 as title
#[derive(Debug, Clone, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }

    fn ensure_line_break(text: &mut String) {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
    }

    fn extract_text_and_title(markdown: &str) -> (String, Option<String>) {
        let mut text = String::new();
        let mut title: Option<String> = None;
        let mut heading: Option<(HeadingLevel, String)> = None;

        for event in Parser::new(markdown) {
            match event {
                Event::Start(Tag::Heading(level, ..)) => {
                    heading = Some((level, String::new()));
                }
                Event::End(Tag::Heading(..)) => {
                    if let Some((level, current)) = heading.take() {
                        let current = current.trim().to_string();
                        if level == HeadingLevel::H1 && title.is_none() && !current.is_empty() {
                            title = Some(current.clone());
                        }
                        Self::ensure_line_break(&mut text);
                        text.push_str(&current);
                        text.push('\n');
                    }
                }
                Event::Text(t) | Event::Code(t) => match heading {
                    Some((_, ref mut current)) => current.push_str(&t),
                    None => text.push_str(&t),
                },
                Event::SoftBreak | Event::HardBreak => match heading {
                    Some((_, ref mut current)) => current.push(' '),
                    None => text.push('\n'),
                },
                Event::Start(Tag::Paragraph) | Event::Start(Tag::CodeBlock(_)) => {
                    Self::ensure_line_break(&mut text);
                }
                Event::Start(Tag::Item) => {
                    Self::ensure_line_break(&mut text);
                    text.push_str("- ");
                }
                Event::End(Tag::Paragraph) | Event::End(Tag::CodeBlock(_)) | Event::End(Tag::Item) => {
                    Self::ensure_line_break(&mut text);
                }
                _ => {}
            }
        }

        let text = text
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        (text, title)
    }
}

#[async_trait]
impl DocumentParser for MarkdownParser {
    fn name(&self) -> &str {
        "markdown"
    }

    fn supports(&self, content_type: &str) -> bool {
        matches_any(content_type, &["text/markdown", "text/x-markdown"])
    }

    async fn parse(&self, input: &ParserInput) -> Result<ParsedDocument, ImporterError> {
        let raw = input.text().await?;
        let (text, title) = Self::extract_text_and_title(&raw);

        let mut parsed = ParsedDocument::new(text);
        if let Some(title) = title {
            parsed.metadata.add("title", title);
        }
        Ok(parsed)
    }
}
