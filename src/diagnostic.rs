use crate::span::Span;

/// A fatal compile error raised by the expansion pass.
///
/// The pass has no warnings: everything it can detect either aborts the
/// compile unit (size mismatch, unresolvable subscript) or is an internal
/// invariant that panics. The host compiler owns severity beyond that.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            message,
            span,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let mut report = Report::build(ReportKind::Error, filename, self.span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.start as usize..self.span.end as usize))
                    .with_message(&self.message)
                    .with_color(Color::Red),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        report
            .finish()
            .eprint((filename, Source::from(source)))
            .ok();
    }
}

/// Render a list of diagnostics in order.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let d = Diagnostic::error("inconsistent vector sizes".to_string(), Span::new(10, 15));
        assert_eq!(d.message, "inconsistent vector sizes");
        assert_eq!(d.span, Span::new(10, 15));
        assert!(d.notes.is_empty());
    }

    #[test]
    fn test_with_note() {
        let d = Diagnostic::error("inconsistent vector sizes".to_string(), Span::dummy())
            .with_note("left operand spans 3 cells".to_string())
            .with_note("right operand spans 2 cells".to_string());
        assert_eq!(d.notes.len(), 2);
        assert_eq!(d.notes[0], "left operand spans 3 cells");
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "var v[3]\nvar w[2]\nv = w\n";
        let d = Diagnostic::error("inconsistent vector sizes".to_string(), Span::new(18, 23))
            .with_note("left operand spans 3 cells".to_string());
        // Render to stderr; we only care that it terminates cleanly.
        d.render("script.coble", source);
    }

    #[test]
    fn test_render_diagnostics_multiple() {
        let source = "v = w\nw = v\n";
        let diags = vec![
            Diagnostic::error("inconsistent vector sizes".to_string(), Span::new(0, 5)),
            Diagnostic::error("inconsistent vector sizes".to_string(), Span::new(6, 11)),
        ];
        render_diagnostics(&diags, "script.coble", source);
    }
}
