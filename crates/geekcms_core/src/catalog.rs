//! Plugin catalog for operand validation.
//!
//! The sequencer never looks at how plugins are registered. It asks a
//! [`PluginCatalog`] whether a qualified reference or a component name is
//! known. [`PluginRegistry`] is the in-memory implementation used by the CLI,
//! loaded from a JSON manifest.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::plugin::PluginRef;

/// Capability answering "is this a registered plugin / component?"
pub trait PluginCatalog {
    /// Whether `plugin` is registered
    ///
    /// Sentinels are never registered plugins.
    fn is_known_plugin(&self, plugin: &PluginRef) -> bool;

    /// Whether `component` is a registered component name
    fn is_known_component(&self, component: &str) -> bool;

    /// Registered component names, in registration order
    fn components(&self) -> Vec<String>;
}

/// Catalog that accepts every plugin and component and registers none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissiveCatalog;

impl PluginCatalog for PermissiveCatalog {
    fn is_known_plugin(&self, plugin: &PluginRef) -> bool {
        !plugin.is_sentinel()
    }

    fn is_known_component(&self, _component: &str) -> bool {
        true
    }

    fn components(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Category of data a plugin reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Raw inputs loaded by a theme
    Resources,
    /// Rendered outputs
    Products,
    /// Messages passed between plugins
    Messages,
}

/// A registered plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    /// Owning theme
    pub theme: String,
    /// Plugin name
    pub plugin: String,
    /// Asset categories the plugin accepts
    #[serde(default)]
    pub accepts: Vec<AssetKind>,
}

impl PluginEntry {
    /// Create a new entry accepting no assets
    #[must_use]
    pub fn new(theme: impl Into<String>, plugin: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            plugin: plugin.into(),
            accepts: Vec::new(),
        }
    }

    /// Set the accepted asset kinds
    #[must_use]
    pub fn with_accepts(mut self, accepts: impl IntoIterator<Item = AssetKind>) -> Self {
        self.accepts = accepts.into_iter().collect();
        self
    }

    /// Check if the plugin accepts an asset kind
    #[must_use]
    pub fn accepts(&self, kind: AssetKind) -> bool {
        self.accepts.contains(&kind)
    }
}

/// Error from registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Plugin already registered
    #[error("plugin already registered: {0}")]
    DuplicatePlugin(String),

    /// Component already registered
    #[error("component already registered: {0}")]
    DuplicateComponent(String),

    /// Theme or plugin name is not an identifier
    #[error("invalid plugin `{name}`: {reason}")]
    InvalidPlugin {
        /// Offending `theme.plugin` text
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Component name is not an identifier
    #[error("invalid component name `{0}`")]
    InvalidComponent(String),
}

/// Serialized form of a [`PluginRegistry`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryManifest {
    /// Component names
    #[serde(default)]
    pub components: Vec<String>,
    /// Plugin entries
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

/// In-memory registry of components and plugins
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    /// Registered components
    components: IndexSet<String>,
    /// Registered plugins by reference
    plugins: IndexMap<PluginRef, PluginEntry>,
}

impl PluginRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a manifest
    ///
    /// # Errors
    ///
    /// Returns error on duplicate or malformed entries
    pub fn from_manifest(manifest: RegistryManifest) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for component in manifest.components {
            registry.register_component(component)?;
        }
        for entry in manifest.plugins {
            registry.register(entry)?;
        }
        Ok(registry)
    }

    /// Parse a JSON manifest into a registry
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or the manifest is invalid
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let manifest: RegistryManifest =
            serde_json::from_str(json).map_err(|e| RegistryError::InvalidPlugin {
                name: "<manifest>".to_string(),
                reason: e.to_string(),
            })?;
        Self::from_manifest(manifest)
    }

    /// Snapshot the registry as a manifest
    #[must_use]
    pub fn to_manifest(&self) -> RegistryManifest {
        RegistryManifest {
            components: self.components.iter().cloned().collect(),
            plugins: self.plugins.values().cloned().collect(),
        }
    }

    /// Register a component name
    ///
    /// # Errors
    ///
    /// Returns error if the name is malformed or already registered
    pub fn register_component(&mut self, name: impl Into<String>) -> Result<(), RegistryError> {
        let name = name.into();
        if !crate::plugin::is_identifier(&name) {
            return Err(RegistryError::InvalidComponent(name));
        }
        if !self.components.insert(name.clone()) {
            return Err(RegistryError::DuplicateComponent(name));
        }
        Ok(())
    }

    /// Register a plugin
    ///
    /// # Errors
    ///
    /// Returns error if the plugin is malformed or already registered
    pub fn register(&mut self, entry: PluginEntry) -> Result<PluginRef, RegistryError> {
        let plugin = PluginRef::new(entry.theme.clone(), entry.plugin.clone()).map_err(|e| {
            RegistryError::InvalidPlugin {
                name: format!("{}.{}", entry.theme, entry.plugin),
                reason: e.to_string(),
            }
        })?;
        if self.plugins.contains_key(&plugin) {
            return Err(RegistryError::DuplicatePlugin(plugin.to_string()));
        }
        self.plugins.insert(plugin.clone(), entry);
        Ok(plugin)
    }

    /// Remove a plugin
    pub fn unregister(&mut self, plugin: &PluginRef) -> Option<PluginEntry> {
        self.plugins.shift_remove(plugin)
    }

    /// Get a plugin entry
    #[must_use]
    pub fn get(&self, plugin: &PluginRef) -> Option<&PluginEntry> {
        self.plugins.get(plugin)
    }

    /// Plugins owned by a theme, in registration order
    #[must_use]
    pub fn plugins_of(&self, theme: &str) -> Vec<&PluginRef> {
        self.plugins
            .keys()
            .filter(|p| p.theme() == Some(theme))
            .collect()
    }

    /// Themes that own at least one plugin, in registration order
    #[must_use]
    pub fn themes(&self) -> Vec<&str> {
        let themes: IndexSet<&str> = self.plugins.values().map(|e| e.theme.as_str()).collect();
        themes.into_iter().collect()
    }

    /// Number of registered plugins
    #[must_use]
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Check if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.components.is_empty()
    }
}

impl PluginCatalog for PluginRegistry {
    fn is_known_plugin(&self, plugin: &PluginRef) -> bool {
        self.plugins.contains_key(plugin)
    }

    fn is_known_component(&self, component: &str) -> bool {
        self.components.contains(component)
    }

    fn components(&self) -> Vec<String> {
        self.components.iter().cloned().collect()
    }
}

impl<C: PluginCatalog + ?Sized> PluginCatalog for &C {
    fn is_known_plugin(&self, plugin: &PluginRef) -> bool {
        (**self).is_known_plugin(plugin)
    }

    fn is_known_component(&self, component: &str) -> bool {
        (**self).is_known_component(component)
    }

    fn components(&self) -> Vec<String> {
        (**self).components()
    }
}

impl<C: PluginCatalog + ?Sized> PluginCatalog for std::sync::Arc<C> {
    fn is_known_plugin(&self, plugin: &PluginRef) -> bool {
        (**self).is_known_plugin(plugin)
    }

    fn is_known_component(&self, component: &str) -> bool {
        (**self).is_known_component(component)
    }

    fn components(&self) -> Vec<String> {
        (**self).components()
    }
}
