//! Plan execution
//!
//! Steps run one at a time in dependency order: deletes first, dependents
//! before their dependencies, then creates and updates in kind order.
//! Declared intent is bound again right before each step, so a reference to
//! an object created earlier in the same run resolves to its new id. State
//! is saved after every successful step.

use anyhow::Result;
use colored::Colorize;
use controller::{Client, KindVisitor, Object};
use reconcile::Reconciler;
use std::collections::BTreeSet;
use std::path::Path;

use crate::address::Address;
use crate::manifest::Manifest;
use crate::progress;
use crate::state::State;
use crate::ui::{self, Mark};

use super::differ::display_plan;
use super::lifecycle::{self, UpdateOutcome};
use super::planner::{Action, Plan, PlannedChange};

#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    NoChange,
    Created,
    Modified,
    Removed,
    Failed { error: String },
    Skipped { reason: String },
}

/// Summary of execution results
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

pub struct Executor<'a> {
    pub client: &'a Client,
    pub manifest: &'a Manifest,
    pub state: &'a mut State,
    pub state_path: &'a Path,
    /// Strict unless disabled in config
    pub reconciler: Reconciler,
}

/// Order in which planned changes are applied
pub fn apply_order(plan: &Plan) -> Vec<&PlannedChange> {
    let deletes = plan
        .entries
        .iter()
        .rev()
        .filter(|e| e.action == Action::Delete);
    let writes = plan
        .entries
        .iter()
        .filter(|e| matches!(e.action, Action::Create | Action::Recreate | Action::Update));
    deletes.chain(writes).collect()
}

impl Executor<'_> {
    /// Show the plan, confirm, and apply it
    pub fn execute(&mut self, plan: &Plan, opts: &ExecuteOptions) -> Result<ExecuteSummary> {
        display_plan(plan, opts.verbose);

        let mut summary = ExecuteSummary {
            no_change: plan.count(Action::NoChange),
            ..Default::default()
        };
        if !plan.has_changes() {
            return Ok(summary);
        }

        if opts.dry_run {
            println!();
            ui::mark(Mark::Info, "Dry run - no changes made");
            return Ok(summary);
        }

        if !opts.yes && !confirm_proceed()? {
            println!();
            ui::mark(Mark::Error, "Aborted");
            summary.skipped = plan.changes().count();
            return Ok(summary);
        }

        let steps = apply_order(plan);
        let pb = progress::bar(steps.len() as u64, "Applying");
        let mut failed: BTreeSet<Address> = BTreeSet::new();
        let mut outcomes = Vec::with_capacity(steps.len());

        for entry in steps {
            pb.set_message(entry.address.to_string());
            let result = match self.blocked_by(entry, &failed) {
                Some(dependency) => ApplyResult::Skipped {
                    reason: format!("depends on {dependency}, which failed"),
                },
                None => self.apply_step(entry).unwrap_or_else(|e| ApplyResult::Failed {
                    error: format!("{e:#}"),
                }),
            };
            if matches!(result, ApplyResult::Failed { .. } | ApplyResult::Skipped { .. }) {
                failed.insert(entry.address.clone());
            }
            summary.record(&result);
            pb.inc(1);
            outcomes.push((entry, result));
        }
        progress::finish_clear(&pb);

        print_results(&outcomes);
        print_summary(&summary);
        Ok(summary)
    }

    fn blocked_by(&self, entry: &PlannedChange, failed: &BTreeSet<Address>) -> Option<Address> {
        if entry.action == Action::Delete {
            return None;
        }
        self.manifest
            .dependencies(&entry.address)
            .ok()?
            .into_iter()
            .find(|dependency| failed.contains(dependency))
    }

    fn apply_step(&mut self, entry: &PlannedChange) -> Result<ApplyResult> {
        log::debug!("Applying {} ({})", entry.address, entry.action);
        let address = &entry.address;

        if entry.action == Action::Delete {
            let Some(id) = self.state.id_of(address).map(str::to_string) else {
                return Ok(ApplyResult::NoChange);
            };
            lifecycle::delete(self.client, address.kind, &id)?;
            self.state.forget(address);
            self.state.touch(self.state_path)?;
            return Ok(ApplyResult::Removed);
        }

        if entry.action == Action::Recreate {
            self.state.forget(address);
        }

        let result = address.kind.visit(ApplyEntry {
            executor: self,
            address,
        })?;
        if result != ApplyResult::NoChange {
            self.state.touch(self.state_path)?;
        }
        Ok(result)
    }
}

struct ApplyEntry<'e, 'a> {
    executor: &'e mut Executor<'a>,
    address: &'e Address,
}

impl KindVisitor for ApplyEntry<'_, '_> {
    type Output = Result<ApplyResult>;

    fn visit<T: Object>(self) -> Self::Output {
        let Executor {
            client,
            manifest,
            state,
            reconciler,
            ..
        } = self.executor;
        let address = self.address;
        let declared = manifest.bind::<T>(address, state)?;
        let site = client.site().to_string();

        if let Some(id) = state.id_of(address).map(str::to_string) {
            match lifecycle::update::<T>(client, reconciler, &id, &declared)? {
                UpdateOutcome::Replaced(object) => {
                    state.track(address, object.id(), &site);
                    return Ok(ApplyResult::Modified);
                }
                UpdateOutcome::Unchanged(_) => return Ok(ApplyResult::NoChange),
                UpdateOutcome::Missing => {
                    log::warn!("{address} ({id}) disappeared since planning, creating it again");
                    state.forget(address);
                }
            }
        }

        let created = lifecycle::create::<T>(client, reconciler, &declared)?;
        state.track(address, created.id(), &site);
        Ok(ApplyResult::Created)
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

fn print_results(outcomes: &[(&PlannedChange, ApplyResult)]) {
    println!();
    for (entry, result) in outcomes {
        let address = &entry.address;
        match result {
            ApplyResult::NoChange => ui::mark(Mark::Unchanged, &address.to_string()),
            ApplyResult::Created => ui::mark(Mark::Success, &format!("{address} created")),
            ApplyResult::Modified => ui::mark(Mark::Success, &format!("{address} updated")),
            ApplyResult::Removed => ui::mark(Mark::Success, &format!("{address} deleted")),
            ApplyResult::Failed { error } => {
                ui::mark(Mark::Error, &format!("{address}: {}", error.red()));
            }
            ApplyResult::Skipped { reason } => {
                ui::mark(Mark::Skipped, &format!("{address} skipped: {}", reason.dimmed()));
            }
        }
    }
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} updated", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} deleted", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::planner::Planner;
    use controller::{Kind, MockBackend, RetryConfig};
    use pretty_assertions::assert_eq;
    use reconcile::MergePolicy;
    use serde_json::json;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
[user_group.kids]
name = "kids"
qos_rate_max_down = 2000

[network.iot]
name = "IoT"
vlan_enabled = true
vlan = 30

[wlan.iot]
name = "iot"
networkconf_id = "${network.iot.id}"
usergroup_id = "${user_group.kids.id}"
"#;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    struct Fixture {
        mock: MockBackend,
        client: Client,
        _temp: TempDir,
        state_path: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let mock = MockBackend::new();
        let client = Client::with_backend(Box::new(mock.clone())).retry(RetryConfig::no_retry());
        let temp = TempDir::new().unwrap();
        let state_path = temp.path().join("netform.state.toml");
        Fixture {
            mock,
            client,
            _temp: temp,
            state_path,
        }
    }

    fn run(fx: &Fixture, manifest: &Manifest, state: &mut State) -> ExecuteSummary {
        let plan = Planner {
            client: &fx.client,
            manifest,
            state: &*state,
            reconciler: Reconciler::lenient(MergePolicy::default()),
            jobs: 2,
        }
        .plan()
        .unwrap();
        Executor {
            client: &fx.client,
            manifest,
            state,
            state_path: &fx.state_path,
            reconciler: Reconciler::new(MergePolicy::default()),
        }
        .execute(
            &plan,
            &ExecuteOptions {
                yes: true,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_apply_resolves_references_created_in_the_same_run() {
        let fx = fixture();
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let mut state = State::default();

        let summary = run(&fx, &manifest, &mut state);
        assert_eq!(summary.created, 3);
        assert!(summary.is_success());

        let network_id = state.id_of(&addr("network.iot")).unwrap().to_string();
        let group_id = state.id_of(&addr("user_group.kids")).unwrap().to_string();
        let wlan_id = state.id_of(&addr("wlan.iot")).unwrap();
        let wlan = fx.mock.get(Kind::Wlan, wlan_id).unwrap();
        assert_eq!(wlan["networkconf_id"], json!(network_id));
        assert_eq!(wlan["usergroup_id"], json!(group_id));

        // State was persisted
        let saved = State::load(&fx.state_path).unwrap();
        assert_eq!(saved.resources.len(), 3);
    }

    #[test]
    fn test_second_apply_is_a_no_op() {
        let fx = fixture();
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let mut state = State::default();
        run(&fx, &manifest, &mut state);

        let summary = run(&fx, &manifest, &mut state);
        assert_eq!(summary.total_changes(), 0);
        assert_eq!(summary.no_change, 3);
    }

    #[test]
    fn test_update_preserves_remote_only_fields() {
        let fx = fixture();
        fx.mock.insert(
            Kind::Network,
            "n1",
            json!({ "name": "IoT", "vlan": 10, "purpose": "corporate", "ip_subnet": "10.30.0.1/24" }),
        );
        let mut state = State::default();
        state.track(&addr("network.iot"), "n1", "default");
        let manifest = Manifest::parse("[network.iot]\nvlan = 30\n").unwrap();

        let summary = run(&fx, &manifest, &mut state);
        assert_eq!(summary.modified, 1);
        let stored = fx.mock.get(Kind::Network, "n1").unwrap();
        assert_eq!(stored["vlan"], json!(30));
        assert_eq!(stored["ip_subnet"], json!("10.30.0.1/24"));
        assert_eq!(stored["purpose"], json!("corporate"));
    }

    #[test]
    fn test_removed_declarations_are_deleted() {
        let fx = fixture();
        fx.mock.insert(Kind::Wlan, "w1", json!({ "name": "old" }));
        let mut state = State::default();
        state.track(&addr("wlan.old"), "w1", "default");

        let summary = run(&fx, &Manifest::default(), &mut state);
        assert_eq!(summary.removed, 1);
        assert_eq!(fx.mock.count(Kind::Wlan), 0);
        assert!(state.get(&addr("wlan.old")).is_none());
    }

    #[test]
    fn test_failed_dependency_skips_dependents() {
        let fx = fixture();
        let manifest = Manifest::parse(
            r#"
[network.iot]
name = "IoT"

[wlan.iot]
name = "iot"
networkconf_id = "${network.iot.id}"
"#,
        )
        .unwrap();
        let mut state = State::default();
        // Tracked network that will fail to update: the mock fails the next request
        fx.mock.insert(Kind::Network, "n1", json!({ "name": "old" }));
        state.track(&addr("network.iot"), "n1", "default");

        let plan = Planner {
            client: &fx.client,
            manifest: &manifest,
            state: &state,
            reconciler: Reconciler::lenient(MergePolicy::default()),
            jobs: 1,
        }
        .plan()
        .unwrap();
        fx.mock.fail_next(1);

        let summary = Executor {
            client: &fx.client,
            manifest: &manifest,
            state: &mut state,
            state_path: &fx.state_path,
            reconciler: Reconciler::new(MergePolicy::default()),
        }
        .execute(
            &plan,
            &ExecuteOptions {
                yes: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(fx.mock.count(Kind::Wlan), 0);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let fx = fixture();
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let mut state = State::default();
        let plan = Planner {
            client: &fx.client,
            manifest: &manifest,
            state: &state,
            reconciler: Reconciler::lenient(MergePolicy::default()),
            jobs: 1,
        }
        .plan()
        .unwrap();
        assert_eq!(plan.count(Action::Create), 3);

        let summary = Executor {
            client: &fx.client,
            manifest: &manifest,
            state: &mut state,
            state_path: &fx.state_path,
            reconciler: Reconciler::default(),
        }
        .execute(
            &plan,
            &ExecuteOptions {
                dry_run: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(summary.total_changes(), 0);
        assert!(fx.mock.calls().is_empty());
        assert!(state.resources.is_empty());
        assert!(!fx.state_path.exists());
    }

    #[test]
    fn test_apply_order_deletes_dependents_first() {
        let entry = |address: &str, action| PlannedChange {
            address: addr(address),
            action,
            id: None,
            changes: Vec::new(),
        };
        let plan = Plan {
            entries: vec![
                entry("user_group.a", Action::Create),
                entry("network.b", Action::Delete),
                entry("network.c", Action::NoChange),
                entry("wlan.d", Action::Delete),
                entry("wlan.e", Action::Update),
            ],
        };
        let order: Vec<_> = apply_order(&plan)
            .iter()
            .map(|e| e.address.to_string())
            .collect();
        assert_eq!(order, vec!["wlan.d", "network.b", "user_group.a", "wlan.e"]);
    }
}
