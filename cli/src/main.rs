mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{deck, render, run as run_all};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::Run => run_all::run(&cli),
        Commands::Render => render::run(&cli),
        Commands::Deck => deck::run(&cli),
    }
}

/// `info` by default, `-v` for debug, `-vv` for trace; `RUST_LOG` takes precedence.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> anyhow::Result<()> { run() }
