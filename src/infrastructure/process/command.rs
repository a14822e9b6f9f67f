//! Command line tokenizing and placeholder substitution
//!
//! The template is split into arguments first and placeholders are
//! resolved per argument, so substituted values containing spaces,
//! quotes or backslashes reach the process as a single, unaltered
//! argument.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::process::Placeholder;
use crate::domain::ImporterError;

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{(INPUT_META|OUTPUT_META|INPUT|OUTPUT|REFERENCE)\}").unwrap()
});

/// Values bound to placeholders for one invocation
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: Vec<(Placeholder, String)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, placeholder: Placeholder, value: impl Into<String>) {
        self.values.push((placeholder, value.into()));
    }

    fn value_of(&self, token: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(p, _)| p.token() == token)
            .map(|(_, v)| v.as_str())
    }

    /// Replace bound placeholders in a single pass, leaving unbound ones as-is
    pub fn resolve(&self, template: &str) -> String {
        PLACEHOLDER_PATTERN
            .replace_all(template, |caps: &regex::Captures<'_>| {
                let token = &caps[0];
                self.value_of(token).unwrap_or(token).to_string()
            })
            .into_owned()
    }
}

/// Split a command line into arguments
///
/// Whitespace separates arguments; single or double quotes group text
/// and are removed. Backslashes are literal so Windows-style paths
/// survive.
pub fn tokenize(command: &str) -> Result<Vec<String>, ImporterError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote: Option<char> = None;

    for c in command.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_arg = true;
            }
            None if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            None => {
                current.push(c);
                in_arg = true;
            }
        }
    }

    if quote.is_some() {
        return Err(ImporterError::configuration(format!(
            "Unterminated quote in command: {}",
            command
        )));
    }
    if in_arg {
        args.push(current);
    }

    Ok(args)
}

/// Tokenize a command and resolve placeholders in every argument
pub fn build_argv(command: &str, bindings: &Bindings) -> Result<Vec<String>, ImporterError> {
    let args: Vec<String> = tokenize(command)?
        .iter()
        .map(|arg| bindings.resolve(arg))
        .collect();

    if args.is_empty() {
        return Err(ImporterError::configuration("Command line is empty"));
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_quotes() {
        let args = tokenize(r#"tool -a "two words" 'single "inner"' x""y"#).unwrap();
        assert_eq!(args, vec!["tool", "-a", "two words", r#"single "inner""#, "xy"]);
    }

    #[test]
    fn test_tokenize_keeps_backslashes_and_empty_quotes() {
        let args = tokenize(r#"C:\bin\tool.exe "" end"#).unwrap();
        assert_eq!(args, vec![r"C:\bin\tool.exe", "", "end"]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(tokenize("tool \"open").is_err());
    }

    #[test]
    fn test_reference_with_spaces_stays_one_argument() {
        let mut bindings = Bindings::new();
        bindings.bind(Placeholder::Reference, r"c:\ref with spaces\doc.txt");
        bindings.bind(Placeholder::Input, "/tmp/in");

        let argv = build_argv("tool -ic ${INPUT} -ref ${REFERENCE}", &bindings).unwrap();
        assert_eq!(
            argv,
            vec!["tool", "-ic", "/tmp/in", "-ref", r"c:\ref with spaces\doc.txt"]
        );
    }

    #[test]
    fn test_resolve_is_single_pass() {
        let mut bindings = Bindings::new();
        bindings.bind(Placeholder::Reference, "${INPUT}");
        bindings.bind(Placeholder::Input, "/tmp/in");

        assert_eq!(bindings.resolve("${REFERENCE}|${INPUT}"), "${INPUT}|/tmp/in");
        assert_eq!(bindings.resolve("${OUTPUT_META}"), "${OUTPUT_META}");
    }

    #[test]
    fn test_empty_command() {
        assert!(build_argv("   ", &Bindings::new()).is_err());
    }
}
