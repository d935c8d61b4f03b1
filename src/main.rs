// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

mod cmd;
mod codegen;
mod config;
mod dialect;
mod error;
mod filter;
mod migration;
mod parser;
mod progress;
mod provider;
mod schema;

use clap::Parser;
use cmd::Cli;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "migration_dumper=debug",
        _ => "migration_dumper=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = cmd::run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
