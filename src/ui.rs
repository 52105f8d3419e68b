use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use colored::*;
use crossterm::terminal;
use indicatif::{ProgressBar, ProgressStyle};

use crate::analyzer::AnalysisMode;
use crate::config::UIConfig;
use crate::event_bus::{Event, EventBus, EventEmitter};
use crate::impl_event_emitter;

const DISCLAIMER: &str = "Disclaimer: This AI tool provides analytical insights and is not a definitive arbiter of truth. Always verify information from multiple reliable sources.";

/// Terminal front end: header, spinner driven by bus events, report output
pub struct TerminalUI {
    headless: bool,
    progress_bars: bool,
    spinner: Option<ProgressBar>,
    event_bus: Option<Arc<EventBus>>,
    start_time: Instant,
}

impl TerminalUI {
    pub fn new(headless: bool, config: &UIConfig) -> Self {
        if !config.colorful {
            colored::control::set_override(false);
        }
        Self {
            headless,
            progress_bars: config.progress_bars && !headless,
            spinner: None,
            event_bus: None,
            start_time: Instant::now(),
        }
    }

    fn rule() -> String {
        let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80).min(80);
        "=".repeat(width)
    }

    pub fn start(&mut self, mode: AnalysisMode, model: Option<&str>) -> Result<()> {
        if self.headless {
            return Ok(());
        }

        println!("{}", Self::rule().bright_blue());
        println!("{}", "AI Disinformation Detector".bright_white().bold());
        println!("{}", Self::rule().bright_blue());
        println!("{} {}", "Mode:".cyan().bold(), mode.label());
        if let Some(model) = model {
            println!("{} {}", "Model:".cyan().bold(), model);
        }
        println!("{}", DISCLAIMER.yellow());
        println!();

        if self.progress_bars {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner.set_message("Preparing...");
            self.spinner = Some(spinner);
        }

        if let Some(bus) = &self.event_bus {
            let spinner = self.spinner.clone();
            let mut receiver = bus.subscribe();

            tokio::spawn(async move {
                while let Ok(event) = receiver.recv().await {
                    Self::handle_event(&event, &spinner);
                }
            });
        }

        Ok(())
    }

    fn handle_event(event: &Event, spinner: &Option<ProgressBar>) {
        let Some(pb) = spinner else {
            return;
        };
        if let Some(message) = status_message(event) {
            pb.set_message(message);
        }
        match event {
            Event::FetchCompleted { .. } => {
                pb.println(format!("{} Content fetched from URL successfully.", "ℹ".bright_cyan()));
            }
            Event::AnalysisCompleted { .. } | Event::AnalysisFailed { .. } | Event::FetchFailed { .. } => {
                pb.finish_and_clear();
            }
            _ => {}
        }
    }

    fn stop_spinner(&self) {
        if let Some(pb) = &self.spinner {
            pb.finish_and_clear();
        }
    }

    pub fn display_report(&self, report: &str) {
        self.stop_spinner();
        if self.headless {
            println!("{}", report);
            return;
        }
        println!("{}", "✓ Analysis complete!".bright_green().bold());
        println!("{}", Self::rule().bright_blue());
        println!("{}", "AI Analysis Report:".bright_white().bold());
        println!();
        println!("{}", report);
        println!("{}", Self::rule().bright_blue());
    }

    pub fn display_saved(&self, path: &str) {
        if !self.headless {
            println!("{} {}", "⬇ Report saved to".bright_magenta(), path.bright_white());
        }
    }

    pub fn display_warning(&self, message: &str) {
        self.stop_spinner();
        eprintln!("{} {}", "⚠ Warning:".yellow().bold(), message);
    }

    pub fn display_error(&self, error: &str) {
        self.stop_spinner();
        eprintln!("{} {}", "✗ Error:".red().bold(), error);
    }

    pub async fn finish(&self) {
        self.stop_spinner();
        if self.headless {
            return;
        }
        let Some(bus) = &self.event_bus else {
            return;
        };
        let metrics = bus.get_metrics().await;
        let elapsed = self.start_time.elapsed();

        println!();
        println!(
            "⏱️  {}:{:02} | 🌐 Pages: {} | 🤖 API Calls: {} | 🪙  Tokens: ~{} | ❌ Failures: {}",
            elapsed.as_secs() / 60,
            elapsed.as_secs() % 60,
            metrics.pages_fetched.to_string().bright_cyan(),
            metrics.total_api_calls.to_string().bright_cyan(),
            metrics.total_tokens.to_string().bright_cyan(),
            metrics.failures.to_string().bright_red(),
        );
    }
}

/// Spinner text for an event, if it changes the current status.
fn status_message(event: &Event) -> Option<String> {
    match event {
        Event::FetchStarted { url } => Some(format!("🌐 Fetching content from URL... {}", url)),
        Event::AnalysisStarted { mode } => {
            Some(format!("🧠 AI is performing analysis for disinformation... ({})", mode))
        }
        Event::APICallStarted { provider, model } => {
            Some(format!("🤖 Calling {} ({})", provider.bright_cyan(), model))
        }
        Event::APIError { provider, .. } => Some(format!("❌ {} request failed", provider)),
        _ => None,
    }
}

impl_event_emitter!(TerminalUI);
