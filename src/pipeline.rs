use std::sync::Arc;

use anyhow::Result;
use log::info;
use thiserror::Error;

use crate::acquirer::{ContentAcquirer, FetchError};
use crate::analyzer::{AnalysisFailure, AnalysisMode, AnalysisResult, Analyzer};
use crate::event_bus::{Event, EventBus, EventEmitter};
use crate::impl_event_emitter;
use crate::report::Report;

/// Where the content to analyze comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Text(String),
    Url(String),
}

impl InputSource {
    fn raw(&self) -> &str {
        match self {
            InputSource::Text(s) | InputSource::Url(s) => s,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Please provide content (text or URL) for analysis.")]
    EmptyInput,
    #[error("Failed to extract readable text from the provided URL. It might be behind a paywall or an image-only site.")]
    NoReadableText,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Analysis(#[from] AnalysisFailure),
}

/// Acquisition followed by analysis, strictly in sequence.
pub struct Pipeline {
    acquirer: ContentAcquirer,
    analyzer: Analyzer,
    event_bus: Option<Arc<EventBus>>,
}

impl Pipeline {
    pub fn new(acquirer: ContentAcquirer, analyzer: Analyzer) -> Self {
        Self {
            acquirer,
            analyzer,
            event_bus: None,
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Run one request. Empty input is rejected before any network call.
    pub async fn run(&self, source: &InputSource, mode: AnalysisMode) -> Result<Report, PipelineError> {
        if source.raw().trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let text = match source {
            InputSource::Text(text) => text.clone(),
            InputSource::Url(url) => self.acquire(url).await?,
        };

        let _ = self
            .emit_event(Event::AnalysisStarted {
                mode: mode.label().to_string(),
            })
            .await;

        match self.analyzer.analyze(&text, mode).await {
            AnalysisResult::Report(report) => {
                info!("Analysis complete ({} characters)", report.len());
                let _ = self
                    .emit_event(Event::AnalysisCompleted {
                        chars: report.chars().count(),
                    })
                    .await;
                Ok(Report::new(report))
            }
            AnalysisResult::Failure(failure) => {
                let _ = self
                    .emit_event(Event::AnalysisFailed {
                        kind: failure.kind.to_string(),
                        message: failure.message(),
                    })
                    .await;
                Err(failure.into())
            }
        }
    }

    async fn acquire(&self, url: &str) -> Result<String, PipelineError> {
        let _ = self
            .emit_event(Event::FetchStarted {
                url: url.to_string(),
            })
            .await;

        let result = match self.acquirer.fetch(url).await {
            Ok(text) if text.trim().is_empty() => Err(PipelineError::NoReadableText),
            Ok(text) => Ok(text),
            Err(e) => Err(e.into()),
        };

        let event = match &result {
            Ok(text) => Event::FetchCompleted {
                chars: text.chars().count(),
            },
            Err(e) => Event::FetchFailed {
                error: e.to_string(),
            },
        };
        let _ = self.emit_event(event).await;

        result
    }
}

impl_event_emitter!(Pipeline);
