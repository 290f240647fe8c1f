//! Command implementations

pub mod apply;
pub mod config;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod schema;
pub mod show;

use anyhow::Result;
use controller::Client;
use std::path::PathBuf;

use crate::Context;
use crate::config::{ProviderConfig, expand_path};
use crate::manifest::Manifest;
use crate::state::State;

/// Everything a controller-facing command needs
pub struct Session {
    pub config: ProviderConfig,
    pub client: Client,
    pub manifest_path: PathBuf,
    pub state_path: PathBuf,
    pub state: State,
}

impl Session {
    /// Load config and state and connect to the controller
    pub fn open(ctx: &Context) -> Result<Self> {
        let config = ProviderConfig::load(ctx.config_path.as_deref())?.with_overrides(&ctx.overrides);
        let connection = config.connection()?;
        log::info!("Using controller {} (site '{}')", connection.url, connection.site);
        let client = Client::connect(connection).retry(config.retry_config());

        let manifest_path = expand_path(&ctx.manifest_path);
        let state_path = ctx
            .state_path
            .as_deref()
            .map_or_else(|| State::default_path(&manifest_path), expand_path);
        let state = State::load(&state_path)?;

        Ok(Self {
            config,
            client,
            manifest_path,
            state_path,
            state,
        })
    }

    pub fn manifest(&self) -> Result<Manifest> {
        if !self.manifest_path.exists() {
            anyhow::bail!(
                "Manifest {} not found (use --manifest to point at another file)",
                self.manifest_path.display()
            );
        }
        Manifest::load(&self.manifest_path)
    }

    pub fn save_state(&mut self) -> Result<()> {
        self.state.touch(&self.state_path)
    }
}
