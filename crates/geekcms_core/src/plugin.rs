//! Plugin references.
//!
//! A plugin is addressed by the theme that owns it and its own name, and is
//! written `theme.plugin` in qualified form. Two sentinel references, `HEAD`
//! and `TAIL`, anchor the two ends of an execution order. They are not bound
//! to any real plugin and never compare equal to one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IdentError;

/// Check whether `text` is a valid theme, plugin or component identifier
///
/// Identifiers start with a letter or underscore and continue with letters,
/// digits or underscores.
#[must_use]
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Reference to a plugin, or to one of the two ordering sentinels
///
/// The derived ordering places `Head` before every plugin and `Tail` after
/// every plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PluginRef {
    /// Anchor that precedes everything it is related to
    Head,
    /// A real plugin owned by a theme
    Plugin {
        /// Owning theme
        theme: String,
        /// Plugin name within the theme
        plugin: String,
    },
    /// Anchor that follows everything it is related to
    Tail,
}

impl PluginRef {
    /// Create a reference to a real plugin
    ///
    /// # Errors
    ///
    /// Returns error if either part is not an identifier
    pub fn new(theme: impl Into<String>, plugin: impl Into<String>) -> Result<Self, IdentError> {
        let theme = theme.into();
        let plugin = plugin.into();
        for part in [&theme, &plugin] {
            if part.is_empty() {
                return Err(IdentError::Empty);
            }
            if !is_identifier(part) {
                return Err(IdentError::Invalid(part.clone()));
            }
        }
        Ok(Self::Plugin { theme, plugin })
    }

    /// Owning theme, `None` for sentinels
    #[must_use]
    pub fn theme(&self) -> Option<&str> {
        match self {
            Self::Plugin { theme, .. } => Some(theme),
            Self::Head | Self::Tail => None,
        }
    }

    /// Plugin name, `None` for sentinels
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Plugin { plugin, .. } => Some(plugin),
            Self::Head | Self::Tail => None,
        }
    }

    /// Whether this is `HEAD` or `TAIL`
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        matches!(self, Self::Head | Self::Tail)
    }

    /// Qualified `theme.plugin` form (the sentinel name for sentinels)
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PluginRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "HEAD"),
            Self::Tail => write!(f, "TAIL"),
            Self::Plugin { theme, plugin } => write!(f, "{}.{}", theme, plugin),
        }
    }
}

impl FromStr for PluginRef {
    type Err = IdentError;

    /// Parse a fully qualified `theme.plugin` reference
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((theme, plugin)) => Self::new(theme, plugin),
            None if s.is_empty() => Err(IdentError::Empty),
            None => Err(IdentError::Unqualified(s.to_string())),
        }
    }
}
