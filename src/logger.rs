use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

pub fn init(verbose: bool, debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    // Logs go to stderr so a headless report on stdout stays clean
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}
