//! Descriptor configuration.
//!
//! A descriptor tree is declared as nested groups and targets, in TOML or
//! JSON. A node with `children` is a group; a node with `address` is a
//! target. Unknown fields are rejected.
//!
//! ```toml
//! policy = "load_balanced"
//!
//! [[children]]
//! address = "10.0.0.1:9001"
//! connect_timeout_ms = 500
//!
//! [[children]]
//! policy = "ordered"
//!
//! [[children.children]]
//! address = "10.0.1.1:9001"
//!
//! [[children.children]]
//! address = "10.0.1.2:9001"
//! ```

use std::path::Path;

use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::descriptor::Descriptor;
use crate::error::{DescriptorError, Result};
use crate::group::{Group, SelectionPolicy};
use crate::target::{Target, TargetTimeouts};

/// One node of a descriptor declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DescriptorConfig {
    Group(GroupConfig),
    Target(TargetConfig),
}

// Node kind is picked by key; the chosen variant reports its own errors.
impl<'de> Deserialize<'de> for DescriptorConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let node = serde_json::Value::deserialize(deserializer)?;
        let Some(fields) = node.as_object() else {
            return Err(de::Error::custom(format!(
                "descriptor node must be a table, got {}",
                node
            )));
        };

        if fields.contains_key("children") {
            GroupConfig::deserialize(node)
                .map(DescriptorConfig::Group)
                .map_err(de::Error::custom)
        } else if fields.contains_key("address") {
            TargetConfig::deserialize(node)
                .map(DescriptorConfig::Target)
                .map_err(de::Error::custom)
        } else {
            let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
            Err(de::Error::custom(format!(
                "descriptor node needs `address` (target) or `children` (group), found keys {:?}",
                keys
            )))
        }
    }
}

/// Group declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    #[serde(default)]
    pub policy: SelectionPolicy,
    pub children: Vec<DescriptorConfig>,
}

/// Target declaration.
///
/// Timeouts are signed so that a negative value in a file is reported as a
/// descriptive error instead of a generic type mismatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_timeout_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_timeout_ms: Option<i64>,
}

impl TargetConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout_ms: None,
            socket_timeout_ms: None,
            total_timeout_ms: None,
        }
    }

    pub fn build(&self) -> Result<Target> {
        let timeouts = TargetTimeouts::from_millis(
            self.connect_timeout_ms,
            self.socket_timeout_ms,
            self.total_timeout_ms,
        )?;
        Ok(Target::new(self.address.clone())?.with_timeouts(timeouts))
    }
}

impl GroupConfig {
    pub fn build(&self) -> Result<Group> {
        let children = self
            .children
            .iter()
            .map(DescriptorConfig::build)
            .collect::<Result<Vec<_>>>()?;
        Group::new(self.policy, children)
    }
}

impl DescriptorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Reads a declaration from disk, choosing the parser by file extension
    /// (`.toml` or `.json`).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            _ => Err(DescriptorError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Builds the descriptor tree, failing on the first invalid node.
    pub fn build(&self) -> Result<Descriptor> {
        let descriptor = match self {
            DescriptorConfig::Target(target) => Descriptor::Target(target.build()?),
            DescriptorConfig::Group(group) => Descriptor::Group(group.build()?),
        };
        debug!(
            leaves = descriptor.leaf_count(),
            is_group = descriptor.is_group(),
            "Built descriptor"
        );
        Ok(descriptor)
    }
}

impl From<TargetConfig> for DescriptorConfig {
    fn from(config: TargetConfig) -> Self {
        DescriptorConfig::Target(config)
    }
}

impl From<GroupConfig> for DescriptorConfig {
    fn from(config: GroupConfig) -> Self {
        DescriptorConfig::Group(config)
    }
}
