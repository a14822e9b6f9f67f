//! Built-in and external parsers

pub mod external;
pub mod html;
pub mod json;
pub mod markdown;
pub mod plain_text;
pub mod registry;

pub use external::{ExternalParser, ExternalParserConfig};
pub use html::HtmlParser;
pub use json::JsonParser;
pub use markdown::MarkdownParser;
pub use plain_text::PlainTextParser;
pub use registry::ParserRegistry;
