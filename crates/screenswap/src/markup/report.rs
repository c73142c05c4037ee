use ariadne::{Config, Label, Report, ReportKind, Source};

use crate::error::MarkupError;

impl MarkupError {
    /// Renders every issue as a labelled source excerpt.
    pub fn report(&self) -> String {
        let filename = self.location.as_str();
        let mut report_string = String::new();
        for issue in &self.issues {
            let mut report_bytes = Vec::new();
            let written = Report::build(ReportKind::Error, (filename, issue.span.clone()))
                .with_config(Config::default().with_color(false))
                .with_message(&issue.message)
                .with_label(Label::new((filename, issue.span.clone())).with_message(&issue.message))
                .finish()
                .write((filename, Source::from(self.source_text.as_str())), &mut report_bytes);
            match written {
                Ok(()) => report_string.push_str(&String::from_utf8_lossy(&report_bytes)),
                Err(error) => {
                    log::warn!("failed to render markup report: {error}");
                    report_string.push_str(&format!("{filename}: {}\n", issue.message));
                }
            }
        }
        report_string
    }
}
