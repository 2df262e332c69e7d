//! Conflict and error types for plugin sequencing.
//!
//! Every error raised while sequencing a component names that component, so a
//! failure in one component can be reported alongside the orders of the
//! components that resolved.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::plugin::PluginRef;

/// Sequencing result type
pub type SequenceResult<T> = Result<T, SequenceError>;

/// Malformed identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentError {
    /// Identifier is empty
    #[error("empty identifier")]
    Empty,

    /// Identifier contains characters outside letters, digits and underscore
    #[error("invalid identifier `{0}`")]
    Invalid(String),

    /// A `theme.plugin` form was required
    #[error("expected `theme.plugin`, got `{0}`")]
    Unqualified(String),
}

/// Discriminant of a [`SequenceError`], used in structured reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Malformed line, operator or identifier
    Syntax,
    /// Same pair declared under two priorities
    AmbiguousPriority,
    /// Ordering constraints form a cycle
    CycleConflict,
    /// Operand not registered in the plugin catalog
    UnknownOperand,
    /// Component not registered in the plugin catalog
    UnknownComponent,
    /// The resolver for the component did not run to completion
    Internal,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Syntax => "syntax",
            Self::AmbiguousPriority => "ambiguous_priority",
            Self::CycleConflict => "cycle_conflict",
            Self::UnknownOperand => "unknown_operand",
            Self::UnknownComponent => "unknown_component",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Error raised while sequencing one component
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    /// Malformed line, unrecognized operator or malformed operand
    #[error("syntax error in component `{component}` at line {line}: {reason}: `{text}`")]
    Syntax {
        /// Component the line belongs to (empty before the first header)
        component: String,
        /// 1-based line number within the component block
        line: usize,
        /// Offending line content
        text: String,
        /// What is wrong with it
        reason: String,
    },

    /// The same `(before, after)` pair declared under two priorities
    #[error(
        "ambiguous priority in component `{component}`: `{before} << {after}` declared with priorities {first} and {second}"
    )]
    AmbiguousPriority {
        /// Component name
        component: String,
        /// Preceding plugin
        before: PluginRef,
        /// Following plugin
        after: PluginRef,
        /// Priority of the first declaration
        first: u32,
        /// Priority of the conflicting declaration
        second: u32,
    },

    /// Topological sort cannot complete
    #[error("cycle in component `{component}`: {}", join_plugins(.plugins))]
    CycleConflict {
        /// Component name
        component: String,
        /// Plugins on the cycle, in first-seen order
        plugins: Vec<PluginRef>,
    },

    /// Operand not present in the plugin catalog
    #[error("unknown plugin `{plugin}` in component `{component}` at line {line}")]
    UnknownOperand {
        /// Component name
        component: String,
        /// The unregistered reference
        plugin: PluginRef,
        /// 1-based line number within the component block
        line: usize,
    },

    /// Component header not present in the plugin catalog
    #[error("unknown component `{component}`")]
    UnknownComponent {
        /// Component name
        component: String,
    },

    /// Resolution of the component failed outside the DSL, e.g. a panicking
    /// catalog
    #[error("resolver failed for component `{component}`: {reason}")]
    Internal {
        /// Component name
        component: String,
        /// Failure description
        reason: String,
    },
}

impl SequenceError {
    /// Kind of conflict
    #[must_use]
    pub const fn kind(&self) -> ConflictKind {
        match self {
            Self::Syntax { .. } => ConflictKind::Syntax,
            Self::AmbiguousPriority { .. } => ConflictKind::AmbiguousPriority,
            Self::CycleConflict { .. } => ConflictKind::CycleConflict,
            Self::UnknownOperand { .. } => ConflictKind::UnknownOperand,
            Self::UnknownComponent { .. } => ConflictKind::UnknownComponent,
            Self::Internal { .. } => ConflictKind::Internal,
        }
    }

    /// Component the error was raised in
    #[must_use]
    pub fn component(&self) -> &str {
        match self {
            Self::Syntax { component, .. }
            | Self::AmbiguousPriority { component, .. }
            | Self::CycleConflict { component, .. }
            | Self::UnknownOperand { component, .. }
            | Self::UnknownComponent { component }
            | Self::Internal { component, .. } => component,
        }
    }

    /// Plugins involved in the conflict
    #[must_use]
    pub fn plugins(&self) -> Vec<PluginRef> {
        match self {
            Self::AmbiguousPriority { before, after, .. } => vec![before.clone(), after.clone()],
            Self::CycleConflict { plugins, .. } => plugins.clone(),
            Self::UnknownOperand { plugin, .. } => vec![plugin.clone()],
            Self::Syntax { .. } | Self::UnknownComponent { .. } | Self::Internal { .. } => {
                Vec::new()
            }
        }
    }
}

fn join_plugins(plugins: &[PluginRef]) -> String {
    plugins
        .iter()
        .map(PluginRef::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
