//! Declarative manifest
//!
//! ```toml
//! [network.iot]
//! name = "IoT"
//! vlan_enabled = true
//! vlan = 30
//!
//! [wlan.iot]
//! name = "iot"
//! networkconf_id = "${network.iot.id}"
//! ```
//!
//! Each `[<kind>.<name>]` table is the declared intent for one object.
//! A string of the form `${<kind>.<name>.id}` refers to the controller id of
//! another managed object. References are resolved from state when an
//! intent is bound; a reference to an object that does not exist yet binds
//! as unresolved. A literal `${` in a value is written `$${`.

use anyhow::{Context, Result};
use controller::{Kind, KindVisitor, Object};
use reconcile::{Shape, UNRESOLVED_KEY};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use toml::{Table, Value};

use crate::address::Address;
use crate::state::State;

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{([a-z_]+)\.([A-Za-z0-9][A-Za-z0-9_-]*)\.id\}$")
        .unwrap_or_else(|e| panic!("invalid reference regex: {e}"))
});

/// Structural problems in a manifest
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("[{kind}] must be a table of named objects")]
    KindNotATable { kind: String },

    #[error("{address}: expected a table")]
    NotATable { address: Address },

    #[error("{address}: malformed reference '{reference}' (expected ${{<kind>.<name>.id}})")]
    MalformedReference { address: Address, reference: String },

    #[error("{address}: reference to {target}, which is not declared in the manifest")]
    UndeclaredReference { address: Address, target: Address },

    #[error("{address}: a {} cannot reference {target}; references must point at kinds applied earlier", .address.kind)]
    ReferenceOrder { address: Address, target: Address },
}

/// A parsed, validated manifest
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    resources: BTreeMap<Address, Table>,
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Invalid manifest: {}", path.display()))?;
        log::debug!(
            "Loaded manifest {} ({} resources)",
            path.display(),
            manifest.resources.len()
        );
        Ok(manifest)
    }

    /// Parse and validate manifest text
    pub fn parse(content: &str) -> Result<Self> {
        let root: Table = toml::from_str(content).context("Failed to parse TOML")?;

        let mut resources = BTreeMap::new();
        for (kind_name, entries) in root {
            let kind = kind_name.parse::<Kind>().map_err(anyhow::Error::msg)?;
            let Value::Table(entries) = entries else {
                return Err(ManifestError::KindNotATable { kind: kind_name }.into());
            };
            for (name, body) in entries {
                let address = Address::new(kind, name)?;
                let Value::Table(body) = body else {
                    return Err(ManifestError::NotATable { address }.into());
                };
                resources.insert(address, body);
            }
        }

        let manifest = Self { resources };
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        for (address, body) in &self.resources {
            for target in references(address, body)? {
                if !address.kind.may_reference(target.kind) {
                    return Err(ManifestError::ReferenceOrder {
                        address: address.clone(),
                        target,
                    }
                    .into());
                }
                if !self.resources.contains_key(&target) {
                    return Err(ManifestError::UndeclaredReference {
                        address: address.clone(),
                        target,
                    }
                    .into());
                }
            }
            // Surface unknown fields and type errors before anything is planned
            address.kind.visit(CheckBinding {
                manifest: self,
                address,
            })?;
        }
        Ok(())
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.resources.contains_key(address)
    }

    /// Declared addresses, in apply order
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.resources.keys()
    }

    /// Addresses that `address` references
    pub fn dependencies(&self, address: &Address) -> Result<Vec<Address>> {
        match self.resources.get(address) {
            Some(body) => references(address, body),
            None => Ok(Vec::new()),
        }
    }

    /// Referenced objects that have no id in `state` yet, by top-level field
    pub fn pending(&self, address: &Address, state: &State) -> Result<BTreeMap<String, Vec<Address>>> {
        let Some(body) = self.resources.get(address) else {
            return Ok(BTreeMap::new());
        };
        let mut pending = BTreeMap::new();
        for (field, value) in body {
            let mut targets = Vec::new();
            walk_references(address, value, &mut targets)?;
            targets.retain(|target| state.id_of(target).is_none());
            targets.sort();
            targets.dedup();
            if !targets.is_empty() {
                pending.insert(field.clone(), targets);
            }
        }
        Ok(pending)
    }

    /// Bind the declared intent of `address`, resolving references from `state`
    pub fn bind<T: Object>(&self, address: &Address, state: &State) -> Result<T::Intent> {
        let body = self
            .resources
            .get(address)
            .with_context(|| format!("{address} is not declared in the manifest"))?;
        let resolved = resolve_table(body, state);
        Value::Table(resolved)
            .try_into::<T::Intent>()
            .with_context(|| format!("{address}: invalid {} declaration", T::NAME))
    }
}

struct CheckBinding<'a> {
    manifest: &'a Manifest,
    address: &'a Address,
}

impl KindVisitor for CheckBinding<'_> {
    type Output = Result<()>;

    fn visit<T: Object>(self) -> Self::Output {
        self.manifest
            .bind::<T>(self.address, &State::default())
            .map(|_| ())
    }
}

// ============================================================================
// References
// ============================================================================

/// Whether `text` holds a `${` that is not escaped as `$${`
fn has_reference_syntax(text: &str) -> bool {
    text.replace("$${", "").contains("${")
}

/// Parse a reference string into the address it points at
fn parse_reference(address: &Address, text: &str) -> Result<Option<Address>> {
    if !has_reference_syntax(text) {
        return Ok(None);
    }
    let malformed = || ManifestError::MalformedReference {
        address: address.clone(),
        reference: text.to_string(),
    };
    let captures = REFERENCE_RE.captures(text).ok_or_else(malformed)?;
    let kind = captures[1].parse::<Kind>().map_err(|_| malformed())?;
    Ok(Some(Address::new(kind, &captures[2])?))
}

fn walk_references(address: &Address, value: &Value, out: &mut Vec<Address>) -> Result<()> {
    match value {
        Value::String(text) => {
            if let Some(target) = parse_reference(address, text)? {
                out.push(target);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_references(address, item, out)?;
            }
        }
        Value::Table(table) => {
            for item in table.values() {
                walk_references(address, item, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Every address referenced from a declaration body
pub fn references(address: &Address, body: &Table) -> Result<Vec<Address>> {
    let mut out = Vec::new();
    for value in body.values() {
        walk_references(address, value, &mut out)?;
    }
    out.sort();
    out.dedup();
    Ok(out)
}

fn unresolved_marker(target: &Address) -> Value {
    let mut marker = Table::new();
    marker.insert(UNRESOLVED_KEY.to_string(), Value::String(format!("{target}.id")));
    Value::Table(marker)
}

fn is_marker(value: &Value) -> bool {
    matches!(value, Value::Table(t) if t.contains_key(UNRESOLVED_KEY))
}

fn resolve_value(value: &Value, state: &State) -> Value {
    match value {
        Value::String(text) => {
            let Some(captures) = REFERENCE_RE.captures(text) else {
                return Value::String(text.replace("$${", "${"));
            };
            let target = captures[1]
                .parse::<Kind>()
                .ok()
                .and_then(|kind| Address::new(kind, &captures[2]).ok());
            match target {
                Some(target) => match state.id_of(&target) {
                    Some(id) => Value::String(id.to_string()),
                    None => unresolved_marker(&target),
                },
                None => value.clone(),
            }
        }
        Value::Array(items) => {
            let resolved: Vec<Value> = items.iter().map(|item| resolve_value(item, state)).collect();
            // A list is only as known as its least-known element
            let marker = resolved.iter().find(|item| is_marker(item)).cloned();
            marker.unwrap_or(Value::Array(resolved))
        }
        Value::Table(table) if !table.contains_key(UNRESOLVED_KEY) => {
            Value::Table(resolve_table(table, state))
        }
        other => other.clone(),
    }
}

fn resolve_table(table: &Table, state: &State) -> Table {
    table
        .iter()
        .map(|(key, value)| (key.clone(), resolve_value(value, state)))
        .collect()
}

// ============================================================================
// Rendering
// ============================================================================

fn escape_value(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(text.replace("${", "$${")),
        Value::Array(items) => Value::Array(items.iter().map(escape_value).collect()),
        Value::Table(table) => Value::Table(escape_table(table)),
        other => other.clone(),
    }
}

fn escape_table(table: &Table) -> Table {
    table
        .iter()
        .map(|(key, value)| (key.clone(), escape_value(value)))
        .collect()
}

/// Render a remote object as a manifest entry
///
/// Protected fields are left out: they are never taken from a manifest.
pub fn render<T: Object>(address: &Address, object: &T) -> Result<String> {
    let Some(intent) = object.observe().into_known() else {
        anyhow::bail!("{address} has nothing to render");
    };
    let mut body = match Value::try_from(&intent)
        .with_context(|| format!("Failed to render {address}"))?
    {
        Value::Table(table) => table,
        _ => Table::new(),
    };
    for field in T::protected_fields() {
        body.remove(field);
    }
    let body = escape_table(&body);

    let mut named = Table::new();
    named.insert(address.name.clone(), Value::Table(body));
    let mut root = Table::new();
    root.insert(address.kind.name().to_string(), Value::Table(named));
    toml::to_string_pretty(&root).context("Failed to serialize manifest entry")
}
