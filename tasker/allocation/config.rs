//! Tasker configuration loaded from TOML.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    error::TaskerError,
    model::AssetRepresentation,
    orchestrator::reallocation::ReallocationStrategy,
    registry::StrategySelection,
};

/// Which allocation pass an allocator runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocatorPass {
    /// Runs in registration order on unassigned tasks and assets.
    #[default]
    Primary,
    /// Gives assets additional tasks that are still unassigned.
    ExtraTasks,
    /// Lets leftover assets share already-assigned tasks.
    ExtraAssets,
}

/// One `[[allocator]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Pass the allocator runs in.
    #[serde(default)]
    pub pass: AllocatorPass,
    /// Registered name or script function.
    pub strategy: StrategySelection,
    /// Restricts a primary allocator to tasks of this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
}

impl AllocatorConfig {
    /// Primary allocator over all task types.
    #[must_use]
    pub const fn primary(strategy: StrategySelection) -> Self {
        Self {
            pass: AllocatorPass::Primary,
            strategy,
            task_type: None,
        }
    }

    /// Allocator for the given pass.
    #[must_use]
    pub const fn pass(pass: AllocatorPass, strategy: StrategySelection) -> Self {
        Self {
            pass,
            strategy,
            task_type: None,
        }
    }

    /// Scopes the allocator to one task type.
    #[must_use]
    pub fn for_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }
}

/// Full tasker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskerConfig {
    /// Task generation strategy; no tasks are generated when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<StrategySelection>,
    /// Scoring strategy; the matrix stays zero when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<StrategySelection>,
    /// Allocators in registration order.
    #[serde(rename = "allocator")]
    pub allocators: Vec<AllocatorConfig>,
    /// Asset granularity.
    pub asset_representation: AssetRepresentation,
    /// Which committed pairs are held across cycles.
    pub reallocation_strategy: ReallocationStrategy,
    /// Drops friendly and neutral tracks before task generation.
    pub ignore_ally_tracks: bool,
    /// Resends unchanged assignments every cycle.
    pub update_assignments: bool,
    /// Seconds between `update` calls.
    pub update_interval: f64,
    /// Seconds between track pushes to accepting assignees; disabled when not positive.
    pub track_update_interval: f64,
    /// Comm channel stamped on outgoing assignments.
    pub comm_channel: String,
    /// Accepts received assignments immediately.
    pub auto_accept_received: bool,
}

impl Default for TaskerConfig {
    fn default() -> Self {
        Self {
            generator: None,
            evaluator: None,
            allocators: Vec::new(),
            asset_representation: AssetRepresentation::default(),
            reallocation_strategy: ReallocationStrategy::default(),
            ignore_ally_tracks: false,
            update_assignments: false,
            update_interval: 1.0,
            track_update_interval: 0.0,
            comm_channel: "default".into(),
            auto_accept_received: false,
        }
    }
}

impl TaskerConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading tasker config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but cannot be honored.
    pub fn validate(&self) -> Result<(), TaskerError> {
        if !(self.update_interval.is_finite() && self.update_interval > 0.0) {
            return Err(TaskerError::Config(format!(
                "update_interval must be positive, got {}",
                self.update_interval
            )));
        }
        if !self.track_update_interval.is_finite() {
            return Err(TaskerError::Config("track_update_interval must be finite".into()));
        }
        Ok(())
    }

    /// Allocators of `pass`, in registration order.
    ///
    /// Extra passes hold one allocator each; the tasker uses the first entry and reports
    /// the rest as configuration errors.
    pub fn allocators_for(&self, pass: AllocatorPass) -> impl Iterator<Item = &AllocatorConfig> {
        self.allocators.iter().filter(move |a| a.pass == pass)
    }
}
