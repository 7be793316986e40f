// src/main.rs
mod app;
mod cert;
mod config;
mod ui;
mod utils;

use clap::Parser;
use config::IssuerConfig;
use std::{path::PathBuf, process::ExitCode};
use utils::logging::{ConsoleLogger, FileLogger, Logger, MultiLogger};
use utils::signals::TerminationSignals;

/// Interactive issuance of CA-signed TLS certificates for the homelab cluster.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Issuer defaults (CA subject, validity, key algorithm, openssl path)
    #[arg(short, long, default_value = "issuer_config.json")]
    pub config: String,
    /// Log tool invocations and their output
    #[arg(short, long)]
    pub debug: bool,
    /// Overrides the log file from the config
    #[arg(short, long)]
    pub log_file: Option<String>,
    /// Directory all relative paths are resolved against
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,
    /// Write the effective configuration to --config and exit
    #[arg(long)]
    pub write_config: bool,
}

fn build_logger(args: &Args, config: &IssuerConfig) -> Box<dyn Logger> {
    let mut loggers: Vec<Box<dyn Logger>> = vec![Box::new(ConsoleLogger::new(args.debug))];
    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| config.log_file_path());
    match FileLogger::new(&log_file, args.debug) {
        Ok(file_logger) => loggers.push(Box::new(file_logger)),
        Err(e) => eprintln!("Logging to console only, cannot open {}: {}", log_file, e),
    }
    Box::new(MultiLogger::new(loggers))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse();

    if let Some(dir) = &args.workdir {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("Error: cannot enter {}: {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let config = match IssuerConfig::load_or_default(&args.config).and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid configuration {}: {}", args.config, e);
            return ExitCode::FAILURE;
        }
    };

    if args.write_config {
        return match config.save_to_file(&args.config) {
            Ok(()) => {
                println!("Wrote {}", args.config);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: cannot write {}: {}", args.config, e);
                ExitCode::FAILURE
            }
        };
    }

    let mut logger = build_logger(&args, &config);
    logger.debug_log(&format!("Loaded configuration from {}", args.config));

    let mut signals = match TerminationSignals::install() {
        Ok(signals) => signals,
        Err(e) => {
            eprintln!("Error: cannot install signal handlers: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Prompts block on stdin, so the workflow runs off the async runtime while
    // the interrupt handler stays responsive.
    let workflow = tokio::task::spawn_blocking(move || app::run_interactive(config, logger));

    tokio::select! {
        joined = workflow => match joined {
            Ok(Ok(_)) => ExitCode::SUCCESS,
            // Already reported by the workflow's logger.
            Ok(Err(_)) => ExitCode::FAILURE,
            Err(e) => {
                eprintln!("Error: issuance task failed: {}", e);
                ExitCode::FAILURE
            }
        },
        reason = signals.recv() => {
            let removed = utils::scoped::purge_pending();
            eprintln!("\n{}; removed {} transient file(s)", reason, removed);
            // The blocking reader cannot be cancelled, so leave without
            // waiting for the runtime to shut down.
            std::process::exit(reason.exit_code().into());
        }
    }
}
