use crate::analyzer::AnalysisMode;
use crate::pipeline::InputSource;

/// Which input widget is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    #[default]
    Text,
    Url,
}

/// View state owned by the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub input_kind: InputKind,
    pub text: String,
    pub url: String,
    pub mode: AnalysisMode,
    pub report: Option<String>,
    pub show_report: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch input widget. Any shown report is dropped.
    pub fn select_input(&mut self, kind: InputKind) {
        self.input_kind = kind;
        self.report = None;
        self.show_report = false;
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.select_input(InputKind::Text);
        self.text = text.into();
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.select_input(InputKind::Url);
        self.url = url.into();
    }

    pub fn input_source(&self) -> InputSource {
        match self.input_kind {
            InputKind::Text => InputSource::Text(self.text.clone()),
            InputKind::Url => InputSource::Url(self.url.trim().to_string()),
        }
    }

    pub fn set_report(&mut self, report: String) {
        self.show_report = !report.is_empty();
        self.report = Some(report);
    }

    pub fn fail(&mut self) {
        self.show_report = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switching_input_hides_report() {
        let mut state = SessionState::new();
        state.set_text("claim");
        state.set_report("report".to_string());
        assert!(state.show_report);

        state.select_input(InputKind::Url);
        assert!(!state.show_report);
        assert!(state.report.is_none());
        assert_eq!(state.text, "claim");
        assert!(state.url.is_empty());
    }

    #[test]
    fn test_input_source_follows_active_widget() {
        let mut state = SessionState::new();
        state.set_text("some text");
        assert_eq!(state.input_source(), InputSource::Text("some text".to_string()));
        state.set_url(" https://example.com/x ");
        assert_eq!(state.input_source(), InputSource::Url("https://example.com/x".to_string()));
    }

    #[test]
    fn test_empty_report_is_not_shown() {
        let mut state = SessionState::new();
        state.set_report(String::new());
        assert!(!state.show_report);
        state.set_report("r".to_string());
        state.fail();
        assert!(!state.show_report);
        assert_eq!(state.mode, AnalysisMode::ContextualAnalysis);
    }
}
