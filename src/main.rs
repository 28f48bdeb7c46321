// src/main.rs
use clap::Parser;
use sparkmark::cli::args::Cli;
use sparkmark::cli::execute_command;
use sparkmark::config::load_settings;
use sparkmark::exitcode;
use tracing::{debug, error, info};
use tracing_subscriber::{
    filter::{filter_fn, LevelFilter},
    fmt::{self, format::FmtSpan},
    prelude::*,
};

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug, cli.no_color);

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(exitcode::CONFIG);
        }
    };
    debug!(db_url = %settings.db_url, "settings loaded");

    if let Err(e) = execute_command(cli, &settings) {
        eprintln!("Error: {}", e);
        let code = if e.is_configuration() {
            exitcode::CONFIG
        } else {
            exitcode::SOFTWARE
        };
        std::process::exit(code);
    }
}

fn setup_logging(verbosity: u8, no_color: bool) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("Don't be crazy, max is -d -d -d");
            LevelFilter::TRACE
        }
    };

    let noisy_modules = ["html5ever", "selectors", "hyper", "hyper_util", "mio", "want", "tower"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(!no_color)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    let filtered_layer = fmt_layer.with_filter(filter).with_filter(module_filter);

    tracing_subscriber::registry().with(filtered_layer).init();

    match filter {
        LevelFilter::INFO => info!("Debug mode: info"),
        LevelFilter::DEBUG => debug!("Debug mode: debug"),
        LevelFilter::TRACE => debug!("Debug mode: trace"),
        _ => {}
    }
}
