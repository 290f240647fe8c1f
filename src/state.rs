use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use controller::Kind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::address::Address;

/// Current state file format
const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Objects created or imported by netform, keyed by address
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct State {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub resources: BTreeMap<Address, TrackedResource>,
}

/// One managed object
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TrackedResource {
    pub kind: Kind,
    /// Controller-assigned id
    pub id: String,
    pub site: String,
    /// Last time netform created, updated or imported it
    pub last_applied: DateTime<Utc>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

// ============================================================================
// State Implementation
// ============================================================================

impl State {
    /// Default state file, next to the manifest
    pub fn default_path(manifest: &Path) -> PathBuf {
        manifest
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("netform.state.toml")
    }

    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: State = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            anyhow::bail!(
                "State file {} has version {}, this netform understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!("Loaded state from {} ({} resources)", path.display(), state.resources.len());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        // Write then rename so an interrupted save never truncates the state
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Update the last_updated timestamp and save
    pub fn touch(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        self.save(path)
    }

    // ========================================================================
    // Resource Helpers
    // ========================================================================

    pub fn get(&self, address: &Address) -> Option<&TrackedResource> {
        self.resources.get(address)
    }

    /// Controller id of a tracked object
    pub fn id_of(&self, address: &Address) -> Option<&str> {
        self.resources.get(address).map(|r| r.id.as_str())
    }

    /// Record an object as managed, replacing any previous entry
    pub fn track(&mut self, address: &Address, id: &str, site: &str) {
        log::debug!("Tracking {address} as {id}");
        self.resources.insert(
            address.clone(),
            TrackedResource {
                kind: address.kind,
                id: id.to_string(),
                site: site.to_string(),
                last_applied: Utc::now(),
            },
        );
    }

    /// Stop tracking an object
    pub fn forget(&mut self, address: &Address) -> Option<TrackedResource> {
        log::debug!("Forgetting {address}");
        self.resources.remove(address)
    }

    /// Address already tracking this controller id, if any
    pub fn address_of(&self, kind: Kind, id: &str) -> Option<&Address> {
        self.resources
            .iter()
            .find(|(address, tracked)| address.kind == kind && tracked.id == id)
            .map(|(address, _)| address)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.resources.keys()
    }
}

// ============================================================================
// Tests
// ============================================================================
