#![deny(unsafe_code)]

mod args;
mod commands;
mod exit_codes;
mod helpers;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use args::Cli;
use commands::dispatch;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("fatal: {err:?}");
            exit_codes::EXIT_ARGS_ERROR
        }
    };
    std::process::exit(code);
}
