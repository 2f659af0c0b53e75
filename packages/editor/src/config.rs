use crate::errors::EditorResult;
use serde::{Deserialize, Serialize};

/// Editor session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum undo levels kept (0 = unlimited)
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Name hashed into every generated node id
    #[serde(default = "default_id_seed")]
    pub id_seed: String,

    /// Fraction of a sibling's height, from its top, below which a drop
    /// lands before it rather than after
    #[serde(default = "default_drop_split_ratio")]
    pub drop_split_ratio: f32,

    /// Drop the selection whenever undo/redo runs, not only when the
    /// selected node disappears
    #[serde(default)]
    pub clear_selection_on_undo: bool,
}

fn default_max_history() -> usize {
    100
}

fn default_id_seed() -> String {
    "document".to_string()
}

fn default_drop_split_ratio() -> f32 {
    0.5
}

impl EditorConfig {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> EditorResult<Self> {
        let mut config: EditorConfig = serde_json::from_str(json)?;
        if !(0.0..=1.0).contains(&config.drop_split_ratio) {
            config.drop_split_ratio = default_drop_split_ratio();
        }
        Ok(config)
    }

    pub fn with_id_seed(mut self, seed: impl Into<String>) -> Self {
        self.id_seed = seed.into();
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            id_seed: default_id_seed(),
            drop_split_ratio: default_drop_split_ratio(),
            clear_selection_on_undo: false,
        }
    }
}
