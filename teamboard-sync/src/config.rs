//! Engine configuration
//!
//! Precedence, lowest to highest: built-in defaults, an optional YAML file, then
//! `TEAMBOARD_*` environment variables (e.g. `TEAMBOARD_CONFLICT_POLICY=reject_stale`).

use crate::error::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "TEAMBOARD_";

/// What happens when two gestures race on the same container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Every position write lands; the later write per document wins
    #[default]
    LastWriteWins,
    /// Re-read the container before writing and refuse if it moved underneath us
    RejectStale,
}

/// When sparse positions get closed up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactionPolicy {
    /// Only reorders and moves renumber; deletes leave gaps
    #[default]
    Never,
    /// Renumber the remaining siblings after every delete
    AfterDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub conflict_policy: ConflictPolicy,
    pub compaction: CompactionPolicy,
    /// Carry the checklist along when a task changes column
    pub copy_checklist_on_move: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            compaction: CompactionPolicy::default(),
            copy_checklist_on_move: true,
        }
    }
}

impl SyncConfig {
    /// Defaults plus environment overrides
    pub fn load() -> Result<Self> {
        Ok(Self::figment(None).extract()?)
    }

    /// Defaults, then `path`, then environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("loading sync config from {}", path.display());
        Ok(Self::figment(Some(path)).extract()?)
    }

    /// The provider chain, exposed so callers can merge their own layers on top
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }
}
