//! Sitewright - an asset pipeline and dev server for static sites.

mod cli;
mod config;
mod core;
mod embed;
mod graph;
mod logger;
mod serve;
mod step;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::Config;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Config::load(&cli.config)?;

    match &cli.command {
        Commands::Build { build_args } => cli::build::build_site(config, build_args.mode()),
        Commands::Dev {
            build_args,
            interface,
            port,
        } => cli::dev::dev_site(config, build_args.mode(), *interface, *port),
    }
}
