//! Diagnostic infrastructure for error reporting
//!
//! Structured diagnostics with source context, rendered through codespan or
//! serialized to JSON for tooling.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, LabelStyle, Severity};
use codespan_reporting::files::{Files, SimpleFiles};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::WriteColor;
use serde::{Deserialize, Serialize};

use super::config::WarningConfig;
use super::error::BindError;
use super::symbols::Location;

/// Source files of one compilation
pub type SourceFiles = SimpleFiles<String, String>;

/// Error code for a diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        self.0
    }
}

/// A diagnostic message with source code context
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The underlying codespan diagnostic
    inner: CsDiagnostic<usize>,
    /// Error code (e.g., "E2001")
    code: Option<ErrorCode>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            inner: CsDiagnostic::new(severity).with_message(message),
            code: None,
        }
    }

    /// Create an error diagnostic
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Create a note diagnostic
    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }

    /// Set the error code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.inner = self.inner.with_code(code.0);
        self.code = Some(code);
        self
    }

    /// Add a primary label (main error location); intrinsic locations add nothing
    pub fn with_primary_label(mut self, location: Location, message: impl Into<String>) -> Self {
        if !location.is_intrinsic() {
            let label = Label::primary(location.file, location.span.start..location.span.end)
                .with_message(message);
            self.inner.labels.push(label);
        }
        self
    }

    /// Add a secondary label (related location)
    pub fn with_secondary_label(mut self, location: Location, message: impl Into<String>) -> Self {
        if !location.is_intrinsic() {
            let label = Label::secondary(location.file, location.span.start..location.span.end)
                .with_message(message);
            self.inner.labels.push(label);
        }
        self
    }

    /// Add a note (additional context)
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.inner.notes.push(note.into());
        self
    }

    /// Create diagnostic from a BindError
    pub fn from_bind_error(error: &BindError, severity: Severity) -> Self {
        let mut diag = Diagnostic::new(severity, error.to_string())
            .with_code(ErrorCode(error.code()));
        if let Some(location) = error.location() {
            diag = diag.with_primary_label(location, error.label());
        }
        if let Some(previous) = error.previous() {
            diag = diag.with_secondary_label(previous, "previous declaration was here");
        }
        diag
    }

    pub fn severity(&self) -> Severity {
        self.inner.severity
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_ref().map(|c| c.as_str())
    }

    pub fn message(&self) -> &str {
        &self.inner.message
    }

    pub fn notes(&self) -> &[String] {
        &self.inner.notes
    }

    /// Number of secondary labels
    pub fn secondary_label_count(&self) -> usize {
        self.inner
            .labels
            .iter()
            .filter(|l| l.style == LabelStyle::Secondary)
            .count()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.inner.severity, Severity::Error | Severity::Bug)
    }

    /// Emit the diagnostic to a terminal writer
    pub fn emit(
        &self,
        writer: &mut dyn WriteColor,
        files: &SourceFiles,
    ) -> Result<(), codespan_reporting::files::Error> {
        let config = term::Config::default();
        term::emit(writer, &config, files, &self.inner)
    }

    /// Get the underlying codespan diagnostic (for testing/custom rendering)
    pub fn inner(&self) -> &CsDiagnostic<usize> {
        &self.inner
    }

    /// Convert to JSON representation for IDE integration
    pub fn to_json(&self, files: &SourceFiles) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&JsonDiagnostic::from_diagnostic(self, files))
    }
}

/// JSON representation of a diagnostic for IDE integration
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonDiagnostic {
    /// Error code (e.g., "E2001")
    pub code: Option<String>,
    /// Severity level
    pub severity: String,
    /// Main error message
    pub message: String,
    /// Source locations with labels
    pub labels: Vec<JsonLabel>,
    /// Additional notes
    pub notes: Vec<String>,
}

/// JSON representation of a diagnostic label
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLabel {
    /// File path
    pub file: String,
    /// Start line (1-indexed)
    pub start_line: usize,
    /// Start column (1-indexed)
    pub start_column: usize,
    /// End line (1-indexed)
    pub end_line: usize,
    /// End column (1-indexed)
    pub end_column: usize,
    /// Label message
    pub message: Option<String>,
    /// Label style (primary or secondary)
    pub style: String,
}

impl JsonDiagnostic {
    /// Convert a Diagnostic to JSON representation
    pub fn from_diagnostic(diag: &Diagnostic, files: &SourceFiles) -> Self {
        let severity = match diag.inner.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Help => "help",
            Severity::Bug => "bug",
        };

        let labels = diag
            .inner
            .labels
            .iter()
            .filter_map(|label| {
                let file = files.get(label.file_id).ok()?;
                let start = file.location((), label.range.start).ok()?;
                let end = file.location((), label.range.end).ok()?;
                Some(JsonLabel {
                    file: file.name().to_string(),
                    start_line: start.line_number,
                    start_column: start.column_number,
                    end_line: end.line_number,
                    end_column: end.column_number,
                    message: Some(label.message.clone()),
                    style: match label.style {
                        LabelStyle::Primary => "primary",
                        LabelStyle::Secondary => "secondary",
                    }
                    .to_string(),
                })
            })
            .collect();

        JsonDiagnostic {
            code: diag.code.as_ref().map(|c| c.0.to_string()),
            severity: severity.to_string(),
            message: diag.inner.message.clone(),
            labels,
            notes: diag.inner.notes.clone(),
        }
    }
}

/// Collected diagnostics of one compilation
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
    config: WarningConfig,
}

impl Diagnostics {
    pub fn new(config: WarningConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Record a diagnostic, applying the warning policy
    pub fn push(&mut self, mut diag: Diagnostic) {
        if diag.severity() == Severity::Warning {
            if let Some(code) = diag.code() {
                if self.config.disabled.iter().any(|c| c == code) {
                    return;
                }
            }
            if self.config.deny_all {
                diag.inner.severity = Severity::Error;
            }
        }
        match diag.severity() {
            Severity::Error | Severity::Bug => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Note | Severity::Help => {}
        }
        self.items.push(diag);
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics carrying `code`
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.items.iter().filter(move |d| d.code() == Some(code))
    }

    /// Emit every diagnostic in order
    pub fn emit_all(
        &self,
        writer: &mut dyn WriteColor,
        files: &SourceFiles,
    ) -> Result<(), codespan_reporting::files::Error> {
        for diag in &self.items {
            diag.emit(writer, files)?;
        }
        Ok(())
    }

    /// All diagnostics as one JSON array
    pub fn to_json(&self, files: &SourceFiles) -> Result<String, serde_json::Error> {
        let all: Vec<JsonDiagnostic> = self
            .items
            .iter()
            .map(|d| JsonDiagnostic::from_diagnostic(d, files))
            .collect();
        serde_json::to_string_pretty(&all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Span;

    fn files() -> SourceFiles {
        let mut files = SimpleFiles::new();
        files.add("main.spl".to_string(), "type A = B;\ntype A = C;\n".to_string());
        files
    }

    fn duplicate() -> BindError {
        BindError::DuplicateDeclaration {
            name: "A".into(),
            location: Location::new(0, Span::new(17, 18, 2, 6)),
            previous: Location::new(0, Span::new(5, 6, 1, 6)),
        }
    }

    // ── Building ──

    #[test]
    fn test_from_bind_error_carries_both_locations() {
        let diag = Diagnostic::from_bind_error(&duplicate(), Severity::Error);
        assert_eq!(diag.code(), Some("E2001"));
        assert_eq!(diag.inner().labels.len(), 2);
        assert_eq!(diag.secondary_label_count(), 1);
    }

    #[test]
    fn test_intrinsic_locations_add_no_labels() {
        let diag = Diagnostic::error("x").with_primary_label(Location::INTRINSIC, "here");
        assert!(diag.inner().labels.is_empty());
    }

    // ── JSON ──

    #[test]
    fn test_json_lines_and_columns() {
        let diag = Diagnostic::from_bind_error(&duplicate(), Severity::Error);
        let json = JsonDiagnostic::from_diagnostic(&diag, &files());
        assert_eq!(json.severity, "error");
        assert_eq!(json.labels[0].start_line, 2);
        assert_eq!(json.labels[0].start_column, 6);
        assert_eq!(json.labels[1].style, "secondary");
        assert_eq!(json.labels[1].start_line, 1);
    }

    // ── Sink ──

    #[test]
    fn test_sink_counts_and_policies() {
        let mut sink = Diagnostics::new(WarningConfig::default());
        sink.push(Diagnostic::from_bind_error(&duplicate(), Severity::Error));
        sink.push(Diagnostic::warning("w").with_code(ErrorCode("E2010")));
        sink.push(Diagnostic::note("n"));
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.warning_count(), 1);
        assert_eq!(sink.len(), 3);

        let mut denied = Diagnostics::new(WarningConfig {
            deny_all: true,
            ..WarningConfig::default()
        });
        denied.push(Diagnostic::warning("w").with_code(ErrorCode("E2010")));
        assert_eq!(denied.error_count(), 1);

        let mut quiet = Diagnostics::new(WarningConfig {
            disabled: vec!["E2010".into()],
            ..WarningConfig::default()
        });
        quiet.push(Diagnostic::warning("w").with_code(ErrorCode("E2010")));
        assert!(quiet.is_empty());
    }

    #[test]
    fn test_render_to_buffer() {
        let mut sink = Diagnostics::default();
        sink.push(Diagnostic::from_bind_error(&duplicate(), Severity::Error));
        let mut buffer = termcolor::Buffer::no_color();
        sink.emit_all(&mut buffer, &files()).unwrap();
        let text = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(text.contains("E2001"));
        assert!(text.contains("previous declaration was here"));
    }
}
