//! Script store: content bundles, year variants, and tokenized scripts.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use pageant_data::{ContentDef, DanceRosterDef, validate_content};
use pageant_script::{ScriptSyntaxError, split_script};

use crate::errors::EventError;

/// Identity of a loaded script: asset, entry, and the year variant picked.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScriptKey {
    pub asset: String,
    pub entry: String,
    /// The suffix applied to `entry`, such as `y2`.
    pub variant: Option<String>,
}

impl ScriptKey {
    pub fn new(asset: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            entry: entry.into(),
            variant: None,
        }
    }

    /// The entry id actually read from the bundle.
    pub fn resolved_entry(&self) -> String {
        match &self.variant {
            Some(variant) => format!("{}_{variant}", self.entry),
            None => self.entry.clone(),
        }
    }
}

impl fmt::Display for ScriptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.asset, self.resolved_entry())
    }
}

/// An immutable, tokenized script.
#[derive(Clone, Debug, PartialEq)]
pub struct Script {
    pub key: ScriptKey,
    commands: Arc<[String]>,
}

impl Script {
    pub fn parse(key: ScriptKey, text: &str) -> Result<Script, ScriptSyntaxError> {
        let commands = split_script(text)?;
        Ok(Script {
            key,
            commands: commands.into(),
        })
    }

    pub fn from_commands(key: ScriptKey, commands: Vec<String>) -> Script {
        Script {
            key,
            commands: commands.into(),
        }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// All loaded event text, keyed by asset then entry.
#[derive(Debug, Clone, Default)]
pub struct ScriptStore {
    assets: HashMap<String, BTreeMap<String, String>>,
    dance_roster: Option<DanceRosterDef>,
}

impl ScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from content, refusing content that fails validation.
    pub fn from_content(content: ContentDef) -> Result<ScriptStore> {
        let errors = validate_content(&content);
        if !errors.is_empty() {
            let joined = errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
            return Err(anyhow!("{} content error(s): {joined}", errors.len()));
        }
        let mut store = ScriptStore::new();
        for bundle in content.bundles {
            store.assets.insert(bundle.asset, bundle.entries);
        }
        store.dance_roster = content.dance_roster;
        Ok(store)
    }

    /// Load a RON content file.
    pub fn load(path: &Path) -> Result<ScriptStore> {
        let text = fs::read_to_string(path).with_context(|| format!("reading content from '{}'", path.display()))?;
        let content: ContentDef =
            ron::from_str(&text).with_context(|| format!("parsing content RON from '{}'", path.display()))?;
        let store = Self::from_content(content).with_context(|| format!("validating '{}'", path.display()))?;
        info!(
            "{} event asset(s) loaded from '{}'",
            store.assets.len(),
            path.display()
        );
        Ok(store)
    }

    /// Add or replace one asset's entries.
    pub fn insert_asset(&mut self, asset: impl Into<String>, entries: BTreeMap<String, String>) {
        self.assets.insert(asset.into(), entries);
    }

    pub fn set_dance_roster(&mut self, roster: DanceRosterDef) {
        self.dance_roster = Some(roster);
    }

    pub fn dance_roster(&self) -> Option<&DanceRosterDef> {
        self.dance_roster.as_ref()
    }

    pub fn has_asset(&self, asset: &str) -> bool {
        self.assets.contains_key(asset)
    }

    /// Raw text of one entry, with no variant handling.
    pub fn entry(&self, asset: &str, entry: &str) -> Option<&str> {
        self.assets.get(asset)?.get(entry).map(String::as_str)
    }

    /// Pick the year variant of an entry: `{entry}_y{year}` if present, else
    /// `{entry}_y2` on even years, else the base entry.
    pub fn resolve_key(&self, asset: &str, entry: &str, year: u32) -> Result<ScriptKey, EventError> {
        let entries = self
            .assets
            .get(asset)
            .ok_or_else(|| EventError::UnknownAsset(asset.to_string()))?;
        let exact = format!("y{year}");
        let mut candidates = vec![Some(exact)];
        if year % 2 == 0 {
            candidates.push(Some("y2".to_string()));
        }
        candidates.push(None);
        for variant in candidates {
            let key = ScriptKey {
                asset: asset.to_string(),
                entry: entry.to_string(),
                variant,
            };
            if entries.contains_key(&key.resolved_entry()) {
                debug!("resolved {asset}:{entry} for year {year} to {key}");
                return Ok(key);
            }
        }
        Err(EventError::MissingScript {
            asset: asset.to_string(),
            entry: entry.to_string(),
        })
    }

    /// Resolve and tokenize a script for the given year.
    pub fn resolve(&self, asset: &str, entry: &str, year: u32) -> Result<Script> {
        let key = self.resolve_key(asset, entry, year)?;
        let text = self
            .entry(&key.asset, &key.resolved_entry())
            .ok_or_else(|| anyhow!("entry vanished while resolving {key}"))?;
        Script::parse(key.clone(), text).with_context(|| format!("splitting script {key}"))
    }
}
