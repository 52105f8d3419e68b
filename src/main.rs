use std::io::{self, Read};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

mod acquirer;
mod analyzer;
mod config;
mod event_bus;
mod llm_manager;
mod logger;
mod pipeline;
mod providers;
mod report;
mod session;
mod ui;

use acquirer::ContentAcquirer;
use analyzer::{AnalysisMode, Analyzer};
use config::{Config, Credentials};
use event_bus::{Event, EventBus, EventEmitter};
use pipeline::{Pipeline, PipelineError};
use session::SessionState;
use ui::TerminalUI;

#[derive(Parser)]
#[command(name = "disinfo_detector", version, about)]
struct Args {
    /// Fetch the article from this URL instead of taking text
    #[arg(short, long, conflicts_with_all = ["file", "text"])]
    url: Option<String>,
    /// Read the text to analyze from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<String>,
    /// Analysis mode: label ("Bias Detection") or alias (contextual, bias, factual, sensationalism)
    #[arg(short, long)]
    mode: Option<String>,
    /// Where to write the report (defaults to the configured report file)
    #[arg(short, long)]
    output: Option<String>,
    /// Do not write the report to disk
    #[arg(long)]
    no_save: bool,
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
    /// Print only the report
    #[arg(long)]
    headless: bool,
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
    /// Debug logging
    #[arg(long)]
    debug: bool,
    /// List analysis modes and exit
    #[arg(long)]
    list_modes: bool,
    /// Text to analyze; `-` reads stdin
    text: Vec<String>,
}

fn read_text(args: &Args) -> Result<String> {
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path));
    }
    if args.text.len() == 1 && args.text[0] == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read text from stdin")?;
        return Ok(buf);
    }
    Ok(args.text.join(" "))
}

fn build_session(args: &Args, config: &Config) -> Result<SessionState> {
    let mut session = SessionState::new();
    match &args.url {
        Some(url) => session.set_url(url.as_str()),
        None => session.set_text(read_text(args)?),
    }
    let mode = args.mode.as_deref().unwrap_or(&config.analysis.default_mode);
    session.mode = mode.parse()?;
    Ok(session)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logger::init(args.verbose, args.debug);

    if args.list_modes {
        for mode in AnalysisMode::ALL {
            println!("{:<16}{}", mode.alias(), mode.label());
        }
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    dotenv::dotenv().ok();

    let mut config = Config::load(args.config.as_deref())?;
    config.merge_with_args(args.headless);
    let credentials = Credentials::from_env();

    let mut session = build_session(&args, &config)?;

    let bus = Arc::new(EventBus::new(100));
    let mut ui = TerminalUI::new(args.headless, &config.ui);
    ui.set_event_bus(bus.clone());

    let acquirer = ContentAcquirer::new(&config.acquisition).context("Failed to build HTTP client")?;
    let analyzer = Analyzer::from_config(&config, &credentials, Some(bus.clone()));
    let mut pipeline = Pipeline::new(acquirer, analyzer);
    pipeline.set_event_bus(bus.clone());
    if !pipeline.analyzer().is_configured() {
        warn!("{} not set; analysis requests will be refused", config::API_KEY_VAR);
    }

    ui.start(session.mode, pipeline.analyzer().model_name())?;

    let outcome = pipeline.run(&session.input_source(), session.mode).await;
    let code = match outcome {
        Ok(report) => {
            session.set_report(report.text().to_string());
            if let (true, Some(text)) = (session.show_report, session.report.as_deref()) {
                ui.display_report(text);
            }

            if !args.no_save {
                let target = args.output.as_deref().unwrap_or(&config.ui.report_file);
                match report.save(target) {
                    Ok(path) => {
                        let path = path.display().to_string();
                        info!("Report written to {} ({})", path, report.mime_type());
                        let _ = bus.emit(Event::ReportSaved { path: path.clone() }).await;
                        ui.display_saved(&path);
                    }
                    Err(e) => ui.display_error(&format!("{:#}", e)),
                }
            }
            ExitCode::SUCCESS
        }
        Err(PipelineError::EmptyInput) => {
            session.fail();
            ui.display_warning(&PipelineError::EmptyInput.to_string());
            ExitCode::from(2)
        }
        Err(PipelineError::Fetch(e)) => {
            session.fail();
            warn!("Acquisition failed ({:?}): {}", e.reason(), e);
            ui.display_error(&format!(
                "Error fetching/parsing URL content: {}. Please ensure it's a valid, publicly accessible URL.",
                e
            ));
            ExitCode::FAILURE
        }
        Err(e) => {
            session.fail();
            ui.display_error(&e.to_string());
            ExitCode::FAILURE
        }
    };

    ui.finish().await;
    Ok(code)
}
