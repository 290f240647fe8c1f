mod address;
mod cli;
mod commands;
mod config;
mod engine;
mod manifest;
mod progress;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

use config::Overrides;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: Option<PathBuf>,
    pub manifest_path: PathBuf,
    pub state_path: Option<PathBuf>,
    pub overrides: Overrides,
}

fn main() {
    if let Err(e) = run() {
        ui::error(&format!("{e:#}"));
        if let Some(advice) = advice(&e) {
            ui::dim(advice);
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: cli.config,
        manifest_path: cli.manifest,
        state_path: cli.state,
        overrides: Overrides {
            url: cli.controller.url,
            site: cli.controller.site,
            api_key: cli.controller.api_key,
            insecure: cli.controller.insecure,
        },
    };

    match cli.command {
        Command::Plan(args) => commands::plan::run(&ctx, &args),
        Command::Apply(args) => commands::apply::run(&ctx, &args),
        Command::Destroy(args) => commands::destroy::run(&ctx, &args),
        Command::Import { address, id } => commands::import::run(&ctx, &address, &id),
        Command::Show { address } => commands::show::run(&ctx, &address),
        Command::Refresh => commands::refresh::run(&ctx),
        Command::Schema { kind } => commands::schema::run(kind),
        Command::Config(cmd) => commands::config::run(&ctx, &cmd),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "netform", &mut io::stdout());
            Ok(())
        }
    }
}

/// Hint for controller errors anywhere in the chain
fn advice(e: &anyhow::Error) -> Option<&'static str> {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<controller::Error>())
        .map(|e| e.category().advice())
}
