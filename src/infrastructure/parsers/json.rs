//! JSON parser

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::content_type;
use crate::domain::parser::{matches_any, DocumentParser, ParsedDocument, ParserInput};
use crate::domain::ImporterError;

/// Pretty-prints JSON and records a summary of its structure
#[derive(Debug, Clone, Default)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }

    fn describe_structure(value: &Value) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "boolean".to_string(),
            Value::Number(_) => "number".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Array(arr) => format!("array[{}]", arr.len()),
            Value::Object(obj) => {
                let keys: Vec<&str> = obj.keys().map(String::as_str).take(5).collect();
                if keys.len() < obj.len() {
                    format!("object{{{},...}}", keys.join(", "))
                } else {
                    format!("object{{{}}}", keys.join(", "))
                }
            }
        }
    }
}

#[async_trait]
impl DocumentParser for JsonParser {
    fn name(&self) -> &str {
        "json"
    }

    fn supports(&self, content_type: &str) -> bool {
        content_type.ends_with("+json") || matches_any(content_type, &[content_type::JSON])
    }

    async fn parse(&self, input: &ParserInput) -> Result<ParsedDocument, ImporterError> {
        let bytes = input.content.to_bytes().await?;

        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            ImporterError::content_type_mismatch(&input.content_type, format!("Invalid JSON: {}", e))
        })?;

        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| ImporterError::extraction(&input.reference, e.to_string()))?;

        Ok(ParsedDocument::new(text).with_field("json_structure", Self::describe_structure(&value)))
    }
}
