use serde::{Deserialize, Serialize};

/// Tunables for an [`Editor`](crate::editor::Editor) instance.
///
/// Hosts usually deserialize this from their own settings file and pass it
/// to `Editor::with_config`; `Default` matches the shipped behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of history entries kept; the oldest entry is evicted
    /// first once the cap is reached.
    pub history_depth: usize,
    /// Number of `tick()` calls an edit must sit undisturbed before it is
    /// folded into a single history entry. Further edits restart the count.
    pub settle_ticks: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_depth: 100,
            settle_ticks: 2,
        }
    }
}
