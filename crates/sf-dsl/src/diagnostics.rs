use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use std::fmt;

use crate::error::{DslError, ParseError};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The content cannot be used.
    Error,
    /// The content is used but probably not as intended.
    Warning,
}

/// A diagnostic message with a location in some content text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// How serious it is.
    pub severity: Severity,
    /// Byte range in the text.
    pub span: std::ops::Range<usize>,
    /// Main message.
    pub message: String,
    /// Optional label shown at the span.
    pub label: Option<String>,
}

impl Diagnostic {
    /// An error diagnostic.
    pub fn error(span: std::ops::Range<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            span,
            message: message.into(),
            label: None,
        }
    }

    /// A warning diagnostic.
    pub fn warning(span: std::ops::Range<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            span,
            message: message.into(),
            label: None,
        }
    }

    /// Attach a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(e: &ParseError) -> Self {
        Diagnostic::error(e.span.clone(), e.message.clone())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{prefix}: {}", self.message)
    }
}

/// Render diagnostics against `source` with ariadne.
pub fn render_diagnostics(source: &str, name: &str, diagnostics: &[Diagnostic], color: bool) -> String {
    let mut output = Vec::new();

    for diag in diagnostics {
        let (kind, tint) = match diag.severity {
            Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
        };
        let span = diag.span.start.min(source.len())..diag.span.end.min(source.len());
        let label_text = diag.label.as_deref().unwrap_or(&diag.message);
        Report::build(kind, (name, span.clone()))
            .with_config(Config::default().with_color(color))
            .with_message(&diag.message)
            .with_label(Label::new((name, span)).with_message(label_text).with_color(tint))
            .finish()
            .write((name, Source::from(source)), &mut output)
            .ok();
    }

    String::from_utf8(output).unwrap_or_default()
}

/// Render a DSL error. Formula errors point into the formula text; other
/// errors render as a single line.
pub fn render_error(error: &DslError, name: &str, color: bool) -> String {
    match error {
        DslError::Formula { text, errors } => {
            let diags: Vec<Diagnostic> = errors.iter().map(Diagnostic::from).collect();
            render_diagnostics(text, name, &diags, color)
        }
        other => format!("{}\n", Diagnostic::error(0..0, other.to_string())),
    }
}
