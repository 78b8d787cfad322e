//! Agents CLI Binary
//!
//! Command-line interface for browsing and installing agents from a remote catalog.

use agent_catalog::logging::init_logging;
use agent_catalog::tooling::cli::{Cli, CliContext};
use clap::Parser;
use std::process;

fn main() {
    let cli = Cli::parse();

    let config = match CliContext::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(Some(&cli.logging_config(&config.logging))) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let context = match CliContext::new(config, cli.config.clone(), cli.install_dir.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error initializing: {}", e);
            process::exit(1);
        }
    };

    let result = context.execute(&cli.command);
    context.shutdown();

    match result {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
