use anyhow::Result;

use super::Session;
use crate::Context;
use crate::cli::PlanArgs;
use crate::engine::{Plan, Planner, differ};
use crate::progress;

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let session = Session::open(ctx)?;
    let plan = compute(ctx, &session, args.jobs)?;
    differ::display_plan(&plan, ctx.verbose > 0);
    if plan.has_changes() {
        println!();
        println!("  {}", differ::summary_line(&plan));
    }
    Ok(())
}

/// Read the controller and compute the plan for the session's manifest
pub fn compute(ctx: &Context, session: &Session, jobs: usize) -> Result<Plan> {
    let manifest = session.manifest()?;
    let pb = (!ctx.quiet).then(|| progress::spinner("Reading controller state..."));
    let plan = Planner {
        client: &session.client,
        manifest: &manifest,
        state: &session.state,
        reconciler: session.config.preview_reconciler(),
        jobs,
    }
    .plan();
    if let Some(pb) = &pb {
        progress::finish_clear(pb);
    }
    plan
}
