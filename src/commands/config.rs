use anyhow::Result;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::{ProviderConfig, default_config_path, expand_path};
use crate::ui;

pub fn run(ctx: &Context, cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => path(ctx),
    }
}

fn config_path(ctx: &Context) -> Result<std::path::PathBuf> {
    match &ctx.config_path {
        Some(path) => Ok(expand_path(path)),
        None => default_config_path(),
    }
}

fn path(ctx: &Context) -> Result<()> {
    println!("{}", config_path(ctx)?.display());
    Ok(())
}

fn show(ctx: &Context) -> Result<()> {
    let path = config_path(ctx)?;
    let config = ProviderConfig::load(Some(path.as_path()))?.with_overrides(&ctx.overrides);

    ui::header("Provider Configuration");
    println!();
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    };
    ui::kv("File", &source);

    ui::section("controller");
    let controller = &config.controller;
    ui::kv("url", controller.url.as_deref().unwrap_or("(not set)"));
    ui::kv("site", &controller.site);
    ui::kv(
        "api_key",
        if controller.api_key.is_some() {
            "(set)"
        } else {
            "(not set)"
        },
    );
    ui::kv("insecure", &controller.insecure.to_string());
    ui::kv("timeout", &format!("{}s", controller.timeout_secs));
    ui::kv("api_prefix", &controller.api_prefix);

    ui::section("retry");
    ui::kv("max_attempts", &config.retry.max_attempts.to_string());
    ui::kv("base_delay", &format!("{}ms", config.retry.base_delay_ms));
    ui::kv("backoff_factor", &config.retry.backoff_factor.to_string());
    ui::kv("max_delay", &format!("{}ms", config.retry.max_delay_ms));

    ui::section("reconcile");
    ui::kv("strict", &config.reconcile.strict.to_string());
    let policy = toml::to_string(&config.reconcile.policy)?;
    for line in policy.lines() {
        if let Some((key, value)) = line.split_once(" = ") {
            ui::kv(key, value.trim_matches('"'));
        }
    }

    if let Err(e) = config.connection() {
        println!();
        ui::warn(&e.to_string());
    }
    Ok(())
}
