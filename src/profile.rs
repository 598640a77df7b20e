//! Mapping profiles: key column pairs plus an ordered list of mapping rules.
//!
//! Profiles are persisted as YAML (or JSON when the file ends in `.json`).
//! Field names and [`WriteMode`] spellings are part of the file format and
//! must not change between releases; anything that fails to deserialize or
//! validate is reported as [`MergeError::ProfileFormat`].

use std::{collections::BTreeMap, fmt, fs, path::Path};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    batch::BatchFilter,
    error::{MergeError, MergeResult},
    key::KeyOptions,
    transform::Transform,
};

pub const CURRENT_PROFILE_VERSION: u32 = 1;
pub const DEFAULT_APPEND_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Overwrite,
    FillIfEmpty,
    AppendIfDifferent,
    SkipIfExists,
}

impl WriteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteMode::Overwrite => "overwrite",
            WriteMode::FillIfEmpty => "fill_if_empty",
            WriteMode::AppendIfDifferent => "append_if_different",
            WriteMode::SkipIfExists => "skip_if_exists",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pairing of a target key column with the source column holding the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyColumn {
    pub target: String,
    pub source: String,
}

impl KeyColumn {
    pub fn new(target: impl Into<String>, source: impl Into<String>) -> Self {
        KeyColumn {
            target: target.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Source dataset the rule reads from; `None` applies it to every source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub source_column: String,
    pub target_column: String,
    pub write_mode: WriteMode,
    #[serde(default = "default_append_separator")]
    pub append_separator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    /// Add `target_column` to the target when it does not exist yet.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub create_target: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_append_separator() -> String {
    DEFAULT_APPEND_SEPARATOR.to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_profile_version() -> u32 {
    CURRENT_PROFILE_VERSION
}

impl MappingRule {
    pub fn new(
        source_column: impl Into<String>,
        target_column: impl Into<String>,
        write_mode: WriteMode,
    ) -> Self {
        MappingRule {
            source: None,
            source_column: source_column.into(),
            target_column: target_column.into(),
            write_mode,
            append_separator: default_append_separator(),
            transform: None,
            create_target: false,
            enabled: true,
        }
    }

    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.append_separator = separator.into();
        self
    }

    pub fn creating_target(mut self) -> Self {
        self.create_target = true;
        self
    }

    pub fn applies_to(&self, source: &str) -> bool {
        self.enabled && self.source.as_deref().is_none_or(|name| name == source)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingProfile {
    #[serde(default = "default_profile_version")]
    pub profile_version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub key_columns: Vec<KeyColumn>,
    /// Per-source override of the source-side key columns, in `key_columns` order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_keys: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub key_options: KeyOptions,
    /// Target rows the profile is applied to.
    #[serde(default, skip_serializing_if = "BatchFilter::is_all")]
    pub batch: BatchFilter,
    #[serde(default)]
    pub rules: Vec<MappingRule>,
}

impl MappingProfile {
    pub fn new(name: impl Into<String>, key_columns: Vec<KeyColumn>) -> Self {
        MappingProfile {
            profile_version: CURRENT_PROFILE_VERSION,
            name: name.into(),
            description: String::new(),
            key_columns,
            source_keys: BTreeMap::new(),
            key_options: KeyOptions::default(),
            batch: BatchFilter::All,
            rules: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening profile file {path:?}"))?;
        let origin = path.display().to_string();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let profile = if is_json {
            Self::from_json_str(&raw, &origin)?
        } else {
            Self::from_yaml_str(&raw, &origin)?
        };
        debug!(
            "Loaded profile '{}' with {} rule(s) from {:?}",
            profile.name,
            profile.rules.len(),
            path
        );
        Ok(profile)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate_as(&path.display().to_string())?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let contents = if is_json {
            serde_json::to_string_pretty(self).context("Serializing profile to JSON")?
        } else {
            self.to_yaml_string()?
        };
        fs::write(path, contents).with_context(|| format!("Writing profile file {path:?}"))
    }

    pub fn from_yaml_str(raw: &str, origin: &str) -> MergeResult<Self> {
        let profile: MappingProfile = serde_yaml::from_str(raw)
            .map_err(|err| MergeError::profile_format(origin, err.to_string()))?;
        profile.validate_as(origin)?;
        Ok(profile)
    }

    pub fn from_json_str(raw: &str, origin: &str) -> MergeResult<Self> {
        let profile: MappingProfile = serde_json::from_str(raw)
            .map_err(|err| MergeError::profile_format(origin, err.to_string()))?;
        profile.validate_as(origin)?;
        Ok(profile)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing profile to YAML")
    }

    pub fn validate(&self) -> MergeResult<()> {
        let origin = if self.name.is_empty() {
            "<unnamed>".to_string()
        } else {
            format!("'{}'", self.name)
        };
        self.validate_as(&origin)
    }

    fn validate_as(&self, origin: &str) -> MergeResult<()> {
        let fail = |message: String| Err(MergeError::profile_format(origin, message));

        if self.profile_version == 0 || self.profile_version > CURRENT_PROFILE_VERSION {
            return fail(format!(
                "unsupported profile_version {} (expected {CURRENT_PROFILE_VERSION})",
                self.profile_version
            ));
        }
        if self.key_columns.is_empty() {
            return fail("at least one key column pair is required".to_string());
        }
        for (idx, key) in self.key_columns.iter().enumerate() {
            if key.target.trim().is_empty() || key.source.trim().is_empty() {
                return fail(format!("key column pair {} has an empty column name", idx + 1));
            }
        }
        for (source, columns) in &self.source_keys {
            if columns.len() != self.key_columns.len() {
                return fail(format!(
                    "source_keys for '{source}' lists {} column(s) but {} key column pair(s) are declared",
                    columns.len(),
                    self.key_columns.len()
                ));
            }
        }
        if let Err(message) = self.batch.validate() {
            return fail(format!("batch: {message}"));
        }
        for (idx, rule) in self.rules.iter().enumerate() {
            let position = idx + 1;
            if rule.source_column.trim().is_empty() || rule.target_column.trim().is_empty() {
                return fail(format!("rule {position} has an empty column name"));
            }
            if rule.source.as_deref().is_some_and(|s| s.trim().is_empty()) {
                return fail(format!("rule {position} names an empty source"));
            }
            if rule.write_mode == WriteMode::AppendIfDifferent && rule.append_separator.is_empty()
            {
                return fail(format!(
                    "rule {position} appends values but has an empty append_separator"
                ));
            }
        }
        Ok(())
    }

    pub fn target_key_columns(&self) -> Vec<String> {
        self.key_columns.iter().map(|k| k.target.clone()).collect()
    }

    /// Key columns to read from the named source.
    pub fn source_key_columns(&self, source: &str) -> Vec<String> {
        match self.source_keys.get(source) {
            Some(columns) => columns.clone(),
            None => self.key_columns.iter().map(|k| k.source.clone()).collect(),
        }
    }

    pub fn add_rule(&mut self, rule: MappingRule) -> usize {
        self.rules.push(rule);
        self.rules.len() - 1
    }

    pub fn remove_rule(&mut self, index: usize) -> Option<MappingRule> {
        (index < self.rules.len()).then(|| self.rules.remove(index))
    }

    pub fn move_rule_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.rules.len() {
            return false;
        }
        self.rules.swap(index, index - 1);
        true
    }

    pub fn move_rule_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.rules.len() {
            return false;
        }
        self.rules.swap(index, index + 1);
        true
    }

    /// Enabled rules with their position in the profile.
    pub fn enabled_rules(&self) -> impl Iterator<Item = (usize, &MappingRule)> {
        self.rules.iter().enumerate().filter(|(_, rule)| rule.enabled)
    }

    pub fn rules_for_source<'a>(
        &'a self,
        source: &'a str,
    ) -> impl Iterator<Item = (usize, &'a MappingRule)> + 'a {
        self.rules
            .iter()
            .enumerate()
            .filter(move |(_, rule)| rule.applies_to(source))
    }
}
