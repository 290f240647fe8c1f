use anyhow::{Result, bail};

use super::Session;
use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{ExecuteOptions, Executor};

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let mut session = Session::open(ctx)?;
    let plan = super::plan::compute(ctx, &session, args.jobs)?;
    let manifest = session.manifest()?;

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
            dry_run: args.dry_run,
            yes: args.yes,
            verbose: ctx.verbose > 0,
        },
    )?;

    if !summary.is_success() {
        bail!("{} of {} changes failed", summary.failed, plan.changes().count());
    }
    Ok(())
}
