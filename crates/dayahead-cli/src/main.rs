mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;

fn main() {
    init_tracing();

    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let summary = commands::run(&cli)?;

    for path in &summary.files {
        println!("{}", path.display());
    }
    if !summary.failed_countries.is_empty() {
        let failed: Vec<_> = summary
            .failed_countries
            .iter()
            .map(|c| c.as_str())
            .collect();
        eprintln!("warning: no data written for: {}", failed.join(", "));
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
