//! Ordered regex rules turning free text into metadata fields

use regex::Captures;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::condition::CachedPattern;
use super::error::ImporterError;
use super::metadata::Metadata;

/// Literal text or a capture group of the rule's match
///
/// Numbers select a group (0 is the whole match), strings are used as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSelector {
    Group(usize),
    Literal(String),
}

impl FieldSelector {
    /// Resolve against a match; out-of-range groups yield an empty string
    fn resolve(&self, captures: &Captures<'_>) -> String {
        match self {
            Self::Group(index) => captures
                .get(*index)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            Self::Literal(text) => text.clone(),
        }
    }
}

impl From<usize> for FieldSelector {
    fn from(index: usize) -> Self {
        Self::Group(index)
    }
}

impl From<&str> for FieldSelector {
    fn from(text: &str) -> Self {
        Self::Literal(text.to_string())
    }
}

impl From<String> for FieldSelector {
    fn from(text: String) -> Self {
        Self::Literal(text)
    }
}

/// One extraction rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRule {
    #[serde(flatten)]
    pub pattern: CachedPattern,
    pub field: FieldSelector,
    pub value: FieldSelector,
}

impl ExtractionRule {
    pub fn new(
        pattern: impl Into<String>,
        field: impl Into<FieldSelector>,
        value: impl Into<FieldSelector>,
    ) -> Self {
        Self {
            pattern: CachedPattern::new(pattern),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.pattern.set_case_sensitive(case_sensitive);
        self
    }
}

/// Outcome of an extraction pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldExtraction {
    /// Field/value pairs in rule order, then line order
    pub fields: Vec<(String, String)>,
    /// Rules skipped because their pattern did not compile
    pub errors: Vec<ImporterError>,
}

impl FieldExtraction {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append every extracted pair to the metadata
    pub fn apply_to(&self, metadata: &mut Metadata) {
        for (field, value) in &self.fields {
            metadata.add(field.clone(), value.clone());
        }
    }

    /// Merge another pass into this one
    pub fn extend(&mut self, other: FieldExtraction) {
        self.fields.extend(other.fields);
        self.errors.extend(other.errors);
    }
}

/// Applies extraction rules to text, line by line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldExtractor {
    rules: Vec<ExtractionRule>,
}

impl FieldExtractor {
    pub fn new(rules: Vec<ExtractionRule>) -> Self {
        Self { rules }
    }

    pub fn with_rule(mut self, rule: ExtractionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compile every rule, failing on the first bad pattern
    pub fn validate(&self) -> Result<(), ImporterError> {
        for rule in &self.rules {
            rule.pattern.validate()?;
        }
        Ok(())
    }

    /// Run every rule against every line of the text
    pub fn extract(&self, text: &str) -> FieldExtraction {
        let mut result = FieldExtraction::default();
        if self.rules.is_empty() {
            return result;
        }

        let lines: Vec<&str> = split_lines(text).collect();

        for rule in &self.rules {
            let regex = match rule.pattern.unanchored() {
                Ok(regex) => regex,
                Err(e) => {
                    warn!(pattern = %rule.pattern.pattern(), error = %e, "Skipping extraction rule");
                    result.errors.push(e);
                    continue;
                }
            };

            for line in &lines {
                let Some(captures) = regex.captures(line) else {
                    continue;
                };

                let field = rule.field.resolve(&captures);
                if field.is_empty() {
                    continue;
                }
                let value = rule.value.resolve(&captures);
                result.fields.push((field, value));
            }
        }

        result
    }
}

/// Split on `\n`, `\r\n` or a lone `\r`
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(extraction: &FieldExtraction) -> Vec<(&str, &str)> {
        extraction
            .fields
            .iter()
            .map(|(f, v)| (f.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_groups_per_line() {
        let extractor =
            FieldExtractor::new(vec![ExtractionRule::new(r"^(\d) (\d) (\d)$", 1, 3)]);
        let result = extractor.extract("1 2 3\n4 5 6");

        assert_eq!(pairs(&result), vec![("1", "3"), ("4", "6")]);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_rule_order_then_line_order() {
        let extractor = FieldExtractor::new(vec![
            ExtractionRule::new(r"^b=(.*)", "second", 1),
            ExtractionRule::new(r"^a=(.*)", "first", 1),
        ]);
        let result = extractor.extract("a=1\nb=2\na=3");

        assert_eq!(
            pairs(&result),
            vec![("second", "2"), ("first", "1"), ("first", "3")]
        );
    }

    #[test]
    fn test_literal_field_and_group_value() {
        let extractor = FieldExtractor::new(vec![ExtractionRule::new(
            r"^<field2>(.*)</field2>",
            "field2",
            1,
        )]);
        let result = extractor.extract("noise\n<field2>value two</field2>\n");

        assert_eq!(pairs(&result), vec![("field2", "value two")]);
    }

    #[test]
    fn test_reversed_groups() {
        let extractor = FieldExtractor::new(vec![ExtractionRule::new(r"^(S.*?):(.*)", 2, 1)]);
        let result = extractor.extract("StdoutBefore:field4");

        assert_eq!(pairs(&result), vec![("field4", "StdoutBefore")]);
    }

    #[test]
    fn test_whole_match_and_out_of_range_group() {
        let extractor = FieldExtractor::new(vec![ExtractionRule::new(r"^key \w+", 0, 7)]);
        let result = extractor.extract("key value");

        assert_eq!(pairs(&result), vec![("key value", "")]);
    }

    #[test]
    fn test_empty_field_name_skipped() {
        let extractor = FieldExtractor::new(vec![ExtractionRule::new(r"^(x*)=(.*)", 1, 2)]);
        let result = extractor.extract("=orphan\nxx=kept");

        assert_eq!(pairs(&result), vec![("xx", "kept")]);
    }

    #[test]
    fn test_bad_rule_is_isolated() {
        let extractor = FieldExtractor::new(vec![
            ExtractionRule::new(r"^(unclosed", 1, 1),
            ExtractionRule::new(r"^(\w+):(.*)", 1, 2),
        ]);
        let result = extractor.extract("title:Hello");

        assert_eq!(pairs(&result), vec![("title", "Hello")]);
        assert_eq!(result.errors.len(), 1);
        assert!(extractor.validate().is_err());
    }

    #[test]
    fn test_line_terminators() {
        let lines: Vec<&str> = split_lines("a\r\nb\rc\nd").collect();
        assert_eq!(lines, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_case_sensitive_rule() {
        let extractor = FieldExtractor::new(vec![
            ExtractionRule::new(r"^TITLE:(.*)", "title", 1).with_case_sensitive(true),
        ]);

        assert!(extractor.extract("title:x").is_empty());
        assert_eq!(extractor.extract("TITLE:x").fields.len(), 1);
    }

    #[test]
    fn test_apply_appends() {
        let extractor = FieldExtractor::new(vec![ExtractionRule::new(r"^tag:(.*)", "tag", 1)]);
        let mut metadata: Metadata = [("tag", "existing")].into_iter().collect();

        extractor.extract("tag:a\ntag:b").apply_to(&mut metadata);
        assert_eq!(metadata.get("tag").unwrap(), &["existing", "a", "b"]);
    }

    #[test]
    fn test_deserialize_rules() {
        let extractor: FieldExtractor = serde_json::from_value(serde_json::json!([
            {"pattern": "^(f.*):(.*)", "field": 1, "value": 2},
            {"pattern": "^f.*StdErr.*", "field": "field3", "value": 1, "case_sensitive": true}
        ]))
        .unwrap();

        assert_eq!(extractor.rules().len(), 2);
        assert_eq!(extractor.rules()[0].field, FieldSelector::Group(1));
        assert_eq!(
            extractor.rules()[1].field,
            FieldSelector::Literal("field3".to_string())
        );
    }
}
