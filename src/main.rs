//! Plasmar CLI — Rust-native infrastructure resource generation.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "plasmar",
    version,
    about = "Rust-native infrastructure resource generation — declarative environments, reusable IAM templates, provider-agnostic descriptors"
)]
struct Cli {
    #[command(subcommand)]
    command: plasmar::cli::Commands,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = plasmar::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
