//! YAML error diagnostics for estimate and reference files

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::entities::activity::ActivityType;

/// YAML parse error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("{filename}: {message}")]
#[diagnostic(code(pave::yaml::syntax))]
pub struct YamlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    filename: String,

    message: String,
}

impl YamlSyntaxError {
    /// Build a diagnostic from a serde_yml error
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();
        let help = suggest_fix(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            filename: filename.to_string(),
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors loading a YAML input file
#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("IO error: {0}")]
    #[diagnostic(code(pave::yaml::io))]
    Io(#[from] std::io::Error),
}

/// Convert a 1-based line/column to a byte offset, clamped to the source
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let line_start = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum::<usize>();

    let line_len = source[line_start.min(source.len())..]
        .find('\n')
        .unwrap_or(source.len() - line_start.min(source.len()));

    (line_start + column.saturating_sub(1).min(line_len)).min(source.len())
}

/// Hints for the mistakes people actually make in estimate files
fn suggest_fix(message: &str) -> Option<String> {
    let msg = message.to_lowercase();

    if msg.contains("expected one of `excavation`") {
        let names: Vec<String> = ActivityType::ALL.iter().map(|t| t.to_string()).collect();
        return Some(format!("Activity types are: {}", names.join(", ")));
    }

    if msg.contains("unknown variant") && (msg.contains("`fs`") || msg.contains("`ss`")) {
        return Some("Dependency kinds are FS, SS, FF or SF".to_string());
    }

    if msg.contains("missing field `production_rate`") {
        return Some("Every activity needs a production_rate (output per standard shift)".to_string());
    }

    if msg.contains("missing field `crew`") {
        return Some("Every activity needs a crew: { headcount: N, hourly_rate: R }".to_string());
    }

    if msg.contains("premature end of input") || msg.contains("did not find expected") {
        return Some("Check for an unterminated [list] or {mapping}".to_string());
    }

    if msg.contains("tab") {
        return Some("YAML requires spaces for indentation, not tabs".to_string());
    }

    if msg.contains("invalid type: string") && msg.contains("f64") {
        return Some("Numbers must not be quoted or carry units (write 1200, not \"1,200 SY\")".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_to_offset() {
        let source = "line1\nline2\nline3";
        assert_eq!(line_col_to_offset(source, 1, 1), 0);
        assert_eq!(line_col_to_offset(source, 2, 1), 6);
        assert_eq!(line_col_to_offset(source, 3, 3), 14);
        // past the end clamps instead of panicking
        assert_eq!(line_col_to_offset(source, 9, 9), source.len());
    }

    #[test]
    fn test_suggest_fix() {
        assert!(suggest_fix("missing field `crew` at line 4").is_some());
        assert!(suggest_fix("found a tab character").is_some());
        assert!(suggest_fix("something unrelated").is_none());
    }

    #[test]
    fn test_from_serde_error_keeps_message() {
        let source = "activities: [";
        let err = serde_yml::from_str::<serde_yml::Value>(source).unwrap_err();
        let diag = YamlSyntaxError::from_serde_error(&err, source, "job.yaml");
        assert!(!diag.message().is_empty());
        assert!(diag.to_string().starts_with("job.yaml:"));
    }
}
