use crate::span::Span;

/// A diagnostic raised while building IR (fatal error or warning).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    fn report<'a>(
        &self,
        origin: &'a str,
        colored: bool,
    ) -> ariadne::Report<'static, (&'a str, std::ops::Range<usize>)> {
        use ariadne::{Color, Config, Label, Report, ReportKind};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, origin, self.span.start as usize)
            .with_config(Config::default().with_color(colored))
            .with_message(&self.message)
            .with_label(
                Label::new((origin, self.span.range()))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report.finish()
    }

    /// Render the diagnostic to stderr using ariadne.
    ///
    /// `origin` names where `source` came from (a function name, a pass,
    /// or `<mnemonic>` for a single generator line).
    pub fn render(&self, origin: &str, source: &str) -> std::io::Result<()> {
        self.report(origin, true)
            .eprint((origin, ariadne::Source::from(source)))
    }

    /// Render the diagnostic into a string (no colors).
    pub fn render_to_string(&self, origin: &str, source: &str) -> String {
        let mut buf = Vec::new();
        let written = self
            .report(origin, false)
            .write((origin, ariadne::Source::from(source)), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.message.clone(),
        }
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], origin: &str, source: &str) {
    for diag in diagnostics {
        if diag.render(origin, source).is_err() {
            log::debug!("failed to render diagnostic: {}", diag.message);
        }
    }
}
