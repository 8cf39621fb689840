use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::EditorResult;

pub const DEFAULT_CONFIG_NAME: &str = "quire.config.json";

/// Document behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentConfig {
    /// Record undo/redo history
    #[serde(default = "default_true")]
    pub history: bool,

    /// Maximum number of undo levels (0 = unlimited)
    #[serde(default = "default_max_undo_levels")]
    pub max_undo_levels: usize,

    /// Keep a log of every applied operation
    #[serde(default = "default_true")]
    pub record_operations: bool,

    /// Normalization gives up after `dirty paths × factor` iterations. A
    /// factor of 0 counts as 1.
    #[serde(default = "default_iteration_factor")]
    pub normalize_iteration_factor: usize,

    /// Remove blocks from inline contexts (and vice versa) and pad inline
    /// elements with text
    #[serde(default = "default_true")]
    pub enforce_block_inline: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_undo_levels() -> usize {
    100
}

fn default_iteration_factor() -> usize {
    42
}

impl DocumentConfig {
    pub fn from_json(source: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load config from a directory, falling back to defaults when there is
    /// no config file
    pub fn load(dir: impl Into<PathBuf>) -> EditorResult<Self> {
        let config_path = dir.into().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            history: default_true(),
            max_undo_levels: default_max_undo_levels(),
            record_operations: default_true(),
            normalize_iteration_factor: default_iteration_factor(),
            enforce_block_inline: default_true(),
        }
    }
}
