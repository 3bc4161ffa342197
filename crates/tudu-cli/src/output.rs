//! Shared output layer for pretty/text/JSON parity across all commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its result
//! accordingly: framed output for humans, compact rows for scripts, or stable
//! JSON.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--json` flag
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. `output` in the user config (`~/.config/tudu/config.toml`)
//! 4. Default: [`OutputMode::Pretty`] if stdout is a TTY, [`OutputMode::Text`] if piped.
//!
//! Resolution itself lives in `tudu_core::config::resolve_output`; this module
//! only parses its answer.

use serde::Serialize;
use std::io::{self, Write};

use tudu_core::error::{ErrorCode, StoreError};
use tudu_core::lock::LockError;
use tudu_core::store::snapshot::SnapshotError;
use tudu_core::sync::RemoteError;

use crate::workspace::WorkspaceError;

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 60;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-optimized output (sections, markers, aligned columns).
    Pretty,
    /// Tab-separated rows for scripts and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Parse the normalized mode string produced by config resolution.
    /// Anything unrecognized reads as text.
    pub fn from_resolved(raw: &str) -> Self {
        match raw {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Text,
        }
    }

    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// Render a serializable value to stdout in the requested format.
///
/// Pretty and text share `human_fn`; use [`render_mode`] when they differ.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            human_fn(value, &mut out)?;
        }
    }
    Ok(())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (`E####`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Create a simple error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    /// Build from a stable error code, taking the suggestion from its hint.
    pub fn coded(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

impl From<&StoreError> for CliError {
    fn from(err: &StoreError) -> Self {
        Self::coded(err.code(), err.to_string())
    }
}

impl From<&SnapshotError> for CliError {
    fn from(err: &SnapshotError) -> Self {
        Self::coded(err.code(), err.to_string())
    }
}

impl From<&LockError> for CliError {
    fn from(err: &LockError) -> Self {
        Self::coded(err.code(), err.to_string())
    }
}

impl From<&RemoteError> for CliError {
    fn from(err: &RemoteError) -> Self {
        Self::coded(err.code(), err.to_string())
    }
}

impl From<&WorkspaceError> for CliError {
    fn from(err: &WorkspaceError) -> Self {
        Self::coded(err.code(), err.to_string())
    }
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(mode, error, &mut out)?;
    Ok(())
}

fn write_error(mode: OutputMode, error: &CliError, out: &mut dyn Write) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// Marks an error whose rendering has already happened; `main` only sets
/// the exit status for it.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Reported(pub String);

/// Render `error` and hand it back as a failure so the process exits non-zero.
pub fn fail<T>(mode: OutputMode, error: impl Into<CliError>) -> anyhow::Result<T> {
    let error = error.into();
    render_error(mode, &error)?;
    Err(Reported(error.message).into())
}

/// Unwrap `result`, rendering the error through [`fail`] otherwise.
pub fn check<T, E>(mode: OutputMode, result: Result<T, E>) -> anyhow::Result<T>
where
    CliError: for<'a> From<&'a E>,
{
    match result {
        Ok(value) => Ok(value),
        Err(err) => fail(mode, CliError::from(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tudu_core::model::ValidationError;

    #[test]
    fn resolved_mode_strings_parse() {
        assert_eq!(OutputMode::from_resolved("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_resolved("pretty"), OutputMode::Pretty);
        assert_eq!(OutputMode::from_resolved("text"), OutputMode::Text);
        assert_eq!(OutputMode::from_resolved("bogus"), OutputMode::Text);
    }

    #[test]
    fn output_mode_predicates() {
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Pretty.is_json());
        assert!(!OutputMode::Text.is_json());
    }

    #[test]
    fn pretty_kv_aligns_keys() {
        let mut buf = Vec::new();
        pretty_kv(&mut buf, "pending", "3").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "pending:     3\n");
    }

    #[test]
    fn pretty_section_has_rule() {
        let mut buf = Vec::new();
        pretty_section(&mut buf, "Lists").unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Lists");
        assert_eq!(lines[1].len(), PRETTY_RULE_WIDTH);
    }

    #[test]
    fn store_error_carries_code_and_hint() {
        let err = StoreError::NotFound { id: "srv-7".into() };
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2001"));
        assert!(cli.message.contains("srv-7"));
        assert!(cli.suggestion.is_some());
    }

    #[test]
    fn validation_error_maps_to_invalid_title() {
        let err = StoreError::from(ValidationError::EmptyTitle);
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2002"));
    }

    #[test]
    fn remote_errors_map_to_codes() {
        assert_eq!(
            CliError::from(&RemoteError::Unauthorized).error_code.as_deref(),
            Some("E4003")
        );
        assert_eq!(
            CliError::from(&RemoteError::Network("refused".into()))
                .error_code
                .as_deref(),
            Some("E4002")
        );
    }

    #[test]
    fn json_error_is_wrapped() {
        let mut buf = Vec::new();
        let err = CliError::coded(ErrorCode::AmbiguousId, "id prefix 'srv' matches 4 entities");
        write_error(OutputMode::Json, &err, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["error"]["error_code"], "E2004");
        assert_eq!(
            value["error"]["message"],
            "id prefix 'srv' matches 4 entities"
        );
        assert!(value["error"]["suggestion"].is_string());
    }

    #[test]
    fn human_error_shows_code_and_suggestion() {
        let mut buf = Vec::new();
        let err = CliError::coded(ErrorCode::NotInitialized, "no workspace");
        write_error(OutputMode::Text, &err, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("error[E1001]: no workspace"));
        assert!(text.contains("suggestion: Run `tudu init`"));
    }

    #[test]
    fn plain_error_omits_code() {
        let mut buf = Vec::new();
        write_error(OutputMode::Pretty, &CliError::new("boom"), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "error: boom\n");
    }

    #[test]
    fn cli_error_serialization_skips_empty_fields() {
        let json = serde_json::to_value(CliError::new("boom")).unwrap();
        assert!(json.get("suggestion").is_none());
        assert!(json.get("error_code").is_none());
    }
}
