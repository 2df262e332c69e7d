//! Sequencer configuration.

use serde::{Deserialize, Serialize};

/// Sequencer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Theme substituted for operands written without `theme.`
    pub default_theme: String,
    /// Report operands missing from the plugin catalog
    pub check_operands: bool,
    /// Report components missing from the plugin catalog, and emit an empty
    /// order for catalog components the source never mentions
    pub check_components: bool,
    /// Maximum components resolved at once on the async path
    pub max_workers: usize,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            default_theme: "default".to_string(),
            check_operands: true,
            check_components: true,
            max_workers: 4,
        }
    }
}

impl SequenceConfig {
    /// Create a configuration for a theme
    #[must_use]
    pub fn for_theme(theme: impl Into<String>) -> Self {
        Self::default().with_default_theme(theme)
    }

    /// Set the default theme
    #[must_use]
    pub fn with_default_theme(mut self, theme: impl Into<String>) -> Self {
        self.default_theme = theme.into();
        self
    }

    /// Set whether operands are checked against the catalog
    #[must_use]
    pub fn with_check_operands(mut self, check: bool) -> Self {
        self.check_operands = check;
        self
    }

    /// Set whether components are checked against the catalog
    #[must_use]
    pub fn with_check_components(mut self, check: bool) -> Self {
        self.check_components = check;
        self
    }

    /// Set the worker bound, at least 1
    #[must_use]
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    /// Parse a JSON configuration, missing fields taking their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(json)?;
        let workers = config.max_workers;
        Ok(config.with_max_workers(workers))
    }
}
