use std::time::Duration;

use log::{debug, info};
use reqwest::Client;
use scraper::{Html, Selector};
use thiserror::Error;

use crate::config::AcquisitionConfig;

/// Broad category of an acquisition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    Network,
    Parse,
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport, timeout, DNS/TLS or non-2xx status.
    #[error("Failed to fetch content from URL: {0}. Check URL or network.")]
    Network(String),
    /// Paragraph selector could not be built. Malformed markup itself is
    /// parsed best-effort and never lands here.
    #[error("Failed to parse content from URL: {0}.")]
    Parse(String),
}

impl FetchError {
    pub fn reason(&self) -> FetchFailure {
        match self {
            FetchError::Network(_) => FetchFailure::Network,
            FetchError::Parse(_) => FetchFailure::Parse,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Turns a URL into cleaned paragraph text.
pub struct ContentAcquirer {
    client: Client,
    max_chars: usize,
}

impl ContentAcquirer {
    pub fn new(config: &AcquisitionConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            max_chars: config.max_chars,
        })
    }

    /// GET `url` and return its paragraph text, whitespace-collapsed and truncated.
    ///
    /// An empty string is a valid return value; callers decide whether that is
    /// a failure. No retries.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;

        let text = extract_paragraph_text(&body)?;
        let text = truncate_chars(&text, self.max_chars);
        info!("Extracted {} characters from {}", text.chars().count(), url);
        Ok(text)
    }
}

/// Text of every `<p>` element, joined by single spaces, whitespace collapsed.
pub fn extract_paragraph_text(html: &str) -> Result<String, FetchError> {
    let selector = Selector::parse("p").map_err(|e| FetchError::Parse(e.to_string()))?;
    let document = Html::parse_document(html);

    let joined = document
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(clean_text(&joined))
}

/// Collapse whitespace runs to one space and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hard cut at `max_chars` characters. Not sentence or word aware.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
