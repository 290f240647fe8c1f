use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::address::Address;
use controller::Kind;

#[derive(Parser)]
#[command(name = "netform")]
#[command(version)]
#[command(about = "Declarative configuration for network controllers", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Provider config file [default: ~/.config/netform/provider.toml]
    #[arg(long, global = true, env = "NETFORM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Manifest declaring the desired objects
    #[arg(
        short,
        long,
        global = true,
        env = "NETFORM_MANIFEST",
        default_value = "netform.toml"
    )]
    pub manifest: PathBuf,

    /// State file [default: netform.state.toml next to the manifest]
    #[arg(long, global = true, env = "NETFORM_STATE")]
    pub state: Option<PathBuf>,

    #[command(flatten)]
    pub controller: ControllerArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection overrides; each takes precedence over the config file
#[derive(Args, Clone, Default)]
pub struct ControllerArgs {
    /// Controller base URL
    #[arg(long, global = true, env = "NETFORM_URL")]
    pub url: Option<String>,

    /// Controller site
    #[arg(long, global = true, env = "NETFORM_SITE")]
    pub site: Option<String>,

    /// Controller API key
    #[arg(long, global = true, env = "NETFORM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true, env = "NETFORM_INSECURE")]
    pub insecure: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Apply the manifest to the controller
    ///
    /// Updates fetch the current object, merge the declared fields into it
    /// and replace it as a whole. There is no revision check between the
    /// fetch and the replace: a concurrent change made in between is
    /// overwritten.
    Apply(ApplyArgs),

    /// Delete managed objects from the controller
    Destroy(DestroyArgs),

    /// Adopt an existing controller object into state
    Import {
        /// Address to track the object as (e.g. network.lan)
        address: Address,

        /// Controller id of the object
        id: String,
    },

    /// Show the remote object behind an address as a manifest entry
    Show {
        /// Address of a tracked object
        address: Address,
    },

    /// Drop state entries whose objects were deleted on the controller
    Refresh,

    /// Show the fields and merge rules of each kind
    Schema {
        /// Limit output to one kind
        kind: Option<Kind>,
    },

    /// Inspect provider configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Number of parallel reads
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Show the plan without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Number of parallel reads while planning
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Only destroy this address
    pub address: Option<Address>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file location
    Path,
}
