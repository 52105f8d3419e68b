use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::acquirer::truncate_chars;
use crate::config::{Config, Credentials};
use crate::event_bus::EventBus;
use crate::llm_manager::{LLMManager, LLMProvider};
use crate::providers::gemini::GeminiProvider;

/// Framing the prompt asks the model to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMode {
    #[default]
    ContextualAnalysis,
    BiasDetection,
    FactualConsistencyCheck,
    SensationalismToneAnalysis,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 4] = [
        AnalysisMode::ContextualAnalysis,
        AnalysisMode::BiasDetection,
        AnalysisMode::FactualConsistencyCheck,
        AnalysisMode::SensationalismToneAnalysis,
    ];

    /// Label embedded verbatim in the prompt.
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::ContextualAnalysis => "Contextual Analysis",
            AnalysisMode::BiasDetection => "Bias Detection",
            AnalysisMode::FactualConsistencyCheck => "Factual Consistency Check",
            AnalysisMode::SensationalismToneAnalysis => "Sensationalism/Tone Analysis",
        }
    }

    /// Short command-line alias.
    pub fn alias(&self) -> &'static str {
        match self {
            AnalysisMode::ContextualAnalysis => "contextual",
            AnalysisMode::BiasDetection => "bias",
            AnalysisMode::FactualConsistencyCheck => "factual",
            AnalysisMode::SensationalismToneAnalysis => "sensationalism",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AnalysisMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AnalysisMode::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(wanted) || m.alias().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<_> = AnalysisMode::ALL.iter().map(|m| m.alias()).collect();
                anyhow!("Unknown analysis mode '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Category of a failed analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotConfigured,
    RateLimited,
    AuthFailed,
    SafetyRejected,
    InputTooLong,
    Unknown,
}

impl ErrorKind {
    pub fn explanation(&self) -> &'static str {
        match self {
            ErrorKind::NotConfigured => {
                "API Error: Gemini API key is not configured. Set GEMINI_API_KEY in your environment or .env file."
            }
            ErrorKind::RateLimited => {
                "API Error: You might have hit a rate limit or quota. Please try again later."
            }
            ErrorKind::AuthFailed => {
                "API Error: Invalid or missing API key. Please double-check your .env file or deployment secrets."
            }
            ErrorKind::SafetyRejected => {
                "API Error: Content may violate safety guidelines. Please try different content or rephrase your request."
            }
            ErrorKind::InputTooLong => {
                "API Error: Input text is too long for analysis. Please try a shorter article or summary."
            }
            ErrorKind::Unknown => "An unexpected error occurred during AI analysis.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Map a service failure description to an [`ErrorKind`].
///
/// Rules are checked in order, case-insensitively; the first match wins.
pub fn classify_error(message: &str) -> ErrorKind {
    let msg = message.to_lowercase();
    let has = |needle: &str| msg.contains(needle);

    if has("quota") || has("rate limit") {
        ErrorKind::RateLimited
    } else if has("authentication") || has("api key") || has("unauthorized") {
        ErrorKind::AuthFailed
    } else if has("content_filter") || has("safety") {
        ErrorKind::SafetyRejected
    } else if has("tokens") && has("exceeded") {
        ErrorKind::InputTooLong
    } else {
        ErrorKind::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

impl AnalysisFailure {
    /// Category explanation first, original diagnostic appended.
    pub fn message(&self) -> String {
        format!("{} Details: {}", self.kind.explanation(), self.detail)
    }
}

impl fmt::Display for AnalysisFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for AnalysisFailure {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisResult {
    Report(String),
    Failure(AnalysisFailure),
}

impl AnalysisResult {
    fn failure(kind: ErrorKind, detail: impl Into<String>) -> Self {
        AnalysisResult::Failure(AnalysisFailure {
            kind,
            detail: detail.into(),
        })
    }
}

/// Renders the prompt and issues one completion request per analysis.
pub struct Analyzer {
    manager: Option<LLMManager>,
    max_chars: usize,
}

impl Analyzer {
    pub fn new(manager: LLMManager, max_chars: usize) -> Self {
        Self {
            manager: Some(manager),
            max_chars,
        }
    }

    /// An analyzer that refuses every request with `NotConfigured`.
    pub fn not_configured(max_chars: usize) -> Self {
        Self {
            manager: None,
            max_chars,
        }
    }

    /// Build the Gemini-backed analyzer, or a refusing one when no key is present.
    pub fn from_config(config: &Config, credentials: &Credentials, bus: Option<Arc<EventBus>>) -> Self {
        let max_chars = config.analysis.max_chars;
        let Some(api_key) = credentials.api_key() else {
            return Self::not_configured(max_chars);
        };

        let provider = GeminiProvider::new(api_key, &config.provider);
        info!(
            "Using {} model {} (context window {} tokens)",
            provider.name(),
            provider.model_name(),
            provider.context_size()
        );
        let mut manager = LLMManager::new(Box::new(provider));
        if let Some(bus) = bus {
            manager = manager.with_event_bus(bus);
        }
        Self::new(manager, max_chars)
    }

    pub fn is_configured(&self) -> bool {
        self.manager.is_some()
    }

    /// Model behind this analyzer, if configured.
    pub fn model_name(&self) -> Option<&str> {
        self.manager.as_ref().map(|m| m.provider().model_name())
    }

    pub fn render_prompt(&self, text: &str, mode: AnalysisMode) -> String {
        render_prompt(&truncate_chars(text, self.max_chars), mode)
    }

    /// Analyze `text`, which must be non-empty after trimming.
    pub async fn analyze(&self, text: &str, mode: AnalysisMode) -> AnalysisResult {
        let Some(manager) = &self.manager else {
            return AnalysisResult::failure(ErrorKind::NotConfigured, "GEMINI_API_KEY is not set");
        };

        let prompt = self.render_prompt(text, mode);
        match manager.send_prompt(&prompt).await {
            Ok(report) => AnalysisResult::Report(report),
            Err(e) => {
                let detail = format!("{:#}", e);
                let kind = classify_error(&detail);
                warn!("Analysis failed ({}): {}", kind, detail);
                AnalysisResult::failure(kind, detail)
            }
        }
    }
}

fn render_prompt(content: &str, mode: AnalysisMode) -> String {
    let label = mode.label();
    format!(
        r#"You are an expert AI assistant specialized in analyzing news and social media content for disinformation, bias, and factual inconsistencies. Your goal is to provide a comprehensive and unbiased "{label}" report on the provided text.

**Focus on the following aspects for your analysis:**
- **Factual Consistency:** Are claims supported by evidence? Any logical fallacies?
- **Source Credibility (if implied/known):** Does the text use reliable sources? (If URL provided, assume standard news unless otherwise evident).
- **Tone and Language:** Is it sensationalist, inflammatory, or emotionally manipulative?
- **Omissions/Context:** Is crucial context missing? Are facts presented selectively?
- **Logical Coherence:** Does the argument make sense?

Here is the content to analyze:
---
{content}
---

Please provide a detailed report for "{label}" based on the content above. Summarize your findings, highlight specific examples where possible, and provide a conclusion on the likelihood of disinformation or bias."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ANALYSIS_MAX_CHARS;
    use crate::llm_manager::testing::ScriptedProvider;
    use std::sync::atomic::Ordering;

    fn analyzer_with(provider: ScriptedProvider) -> Analyzer {
        Analyzer::new(LLMManager::new(Box::new(provider)), DEFAULT_ANALYSIS_MAX_CHARS)
    }

    #[test]
    fn test_classification_priority() {
        assert_eq!(classify_error("quota exceeded, unauthorized"), ErrorKind::RateLimited);
        assert_eq!(classify_error("Rate Limit reached"), ErrorKind::RateLimited);
        assert_eq!(classify_error("API key not valid"), ErrorKind::AuthFailed);
        assert_eq!(classify_error("Authentication failed"), ErrorKind::AuthFailed);
        assert_eq!(classify_error("401 Unauthorized"), ErrorKind::AuthFailed);
        assert_eq!(classify_error("blocked by SAFETY settings"), ErrorKind::SafetyRejected);
        assert_eq!(classify_error("finish_reason: content_filter"), ErrorKind::SafetyRejected);
        assert_eq!(classify_error("max tokens exceeded"), ErrorKind::InputTooLong);
        assert_eq!(classify_error("tokens limit reached"), ErrorKind::Unknown);
        assert_eq!(classify_error("connection reset"), ErrorKind::Unknown);
        assert_eq!(classify_error("unauthorized: safety"), ErrorKind::AuthFailed);
    }

    #[test]
    fn test_failure_message_order() {
        let failure = AnalysisFailure {
            kind: ErrorKind::InputTooLong,
            detail: "tokens exceeded".to_string(),
        };
        let message = failure.message();
        assert!(message.starts_with(ErrorKind::InputTooLong.explanation()));
        assert!(message.ends_with("tokens exceeded"));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Bias Detection".parse::<AnalysisMode>().unwrap(), AnalysisMode::BiasDetection);
        assert_eq!("sensationalism".parse::<AnalysisMode>().unwrap(), AnalysisMode::SensationalismToneAnalysis);
        assert_eq!(
            " factual consistency check ".parse::<AnalysisMode>().unwrap(),
            AnalysisMode::FactualConsistencyCheck
        );
        assert!("sarcasm".parse::<AnalysisMode>().is_err());
        for mode in AnalysisMode::ALL {
            assert_eq!(mode.label().parse::<AnalysisMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_prompt_template() {
        let analyzer = Analyzer::not_configured(DEFAULT_ANALYSIS_MAX_CHARS);
        let prompt = analyzer.render_prompt("The moon is cheese.", AnalysisMode::SensationalismToneAnalysis);
        assert_eq!(prompt.matches("\"Sensationalism/Tone Analysis\"").count(), 2);
        for dimension in [
            "Factual Consistency:",
            "Source Credibility",
            "Tone and Language:",
            "Omissions/Context:",
            "Logical Coherence:",
        ] {
            assert!(prompt.contains(dimension), "missing {}", dimension);
        }
        assert!(prompt.contains("---\nThe moon is cheese.\n---"));
        assert!(prompt.contains("likelihood of disinformation or bias"));
    }

    #[test]
    fn test_prompt_embeds_truncated_text() {
        let analyzer = Analyzer::not_configured(DEFAULT_ANALYSIS_MAX_CHARS);
        let text = format!("{}{}", "x".repeat(15_000), "y".repeat(500));
        let prompt = analyzer.render_prompt(&text, AnalysisMode::ContextualAnalysis);
        let body = prompt.split("---\n").nth(1).unwrap();
        let embedded = body.strip_suffix('\n').unwrap();
        assert_eq!(embedded.chars().count(), 15_000);
        assert!(!embedded.contains('y'));
    }

    #[tokio::test]
    async fn test_report_passthrough() {
        let analyzer = analyzer_with(ScriptedProvider::replying("Report body"));
        let result = analyzer.analyze("Example claim text", "Bias Detection".parse().unwrap()).await;
        assert_eq!(result, AnalysisResult::Report("Report body".to_string()));
    }

    #[tokio::test]
    async fn test_service_error_is_classified() {
        let analyzer = analyzer_with(ScriptedProvider::failing("Rate limit exceeded, quota hit"));
        match analyzer.analyze("claim", AnalysisMode::ContextualAnalysis).await {
            AnalysisResult::Failure(failure) => {
                assert_eq!(failure.kind, ErrorKind::RateLimited);
                assert!(failure.message().contains("Rate limit exceeded, quota hit"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_every_mode_yields_report_or_classified_failure() {
        for mode in AnalysisMode::ALL {
            let ok = analyzer_with(ScriptedProvider::replying("fine"));
            assert!(matches!(ok.analyze("text", mode).await, AnalysisResult::Report(r) if !r.is_empty()));

            let bad = analyzer_with(ScriptedProvider::failing("socket closed"));
            assert!(matches!(
                bad.analyze("text", mode).await,
                AnalysisResult::Failure(AnalysisFailure { kind: ErrorKind::Unknown, .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_unconfigured_never_calls_service() {
        let analyzer = Analyzer::not_configured(DEFAULT_ANALYSIS_MAX_CHARS);
        assert!(!analyzer.is_configured());
        let result = analyzer.analyze("claim", AnalysisMode::BiasDetection).await;
        match result {
            AnalysisResult::Failure(f) => assert_eq!(f.kind, ErrorKind::NotConfigured),
            other => panic!("expected failure, got {:?}", other),
        }

        let analyzer = Analyzer::from_config(&Config::default(), &Credentials::new(None), None);
        assert!(!analyzer.is_configured());
    }

    #[tokio::test]
    async fn test_prompt_sent_once() {
        let provider = ScriptedProvider::replying("ok");
        let calls = provider.calls();
        let last = provider.last_prompt();
        let analyzer = analyzer_with(provider);
        analyzer.analyze("claim text", AnalysisMode::FactualConsistencyCheck).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(last.lock().unwrap().as_deref().unwrap().contains("claim text"));
    }
}
