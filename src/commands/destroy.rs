use anyhow::{Result, bail};
use colored::Colorize;

use super::Session;
use crate::Context;
use crate::cli::DestroyArgs;
use crate::engine::{ExecuteOptions, Executor, Plan};
use crate::manifest::Manifest;
use crate::ui;

pub fn run(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    let mut session = Session::open(ctx)?;
    if session.state.resources.is_empty() {
        ui::info("Nothing to destroy: no objects are tracked");
        return Ok(());
    }

    let plan = Plan::destroy(&session.state, args.address.as_ref())?;
    if !args.yes {
        println!();
        println!(
            "  {} {} object(s) will be deleted from the controller",
            "⚠".yellow(),
            plan.entries.len()
        );
    }

    // Deletes never bind declared intent
    let manifest = Manifest::default();
    let summary = Executor {
        client: &session.client,
        manifest: &manifest,
        state: &mut session.state,
        state_path: &session.state_path,
        reconciler: session.config.reconciler(),
    }
    .execute(
        &plan,
        &ExecuteOptions {
            dry_run: false,
            yes: args.yes,
            verbose: ctx.verbose > 0,
        },
    )?;

    if !summary.is_success() {
        bail!("{} deletes failed", summary.failed);
    }
    Ok(())
}
