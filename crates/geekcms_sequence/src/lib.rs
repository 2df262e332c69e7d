//! GeekCMS Plugin Sequencer
//!
//! Turns the plugin relation DSL of a theme into one deterministic execution
//! order per component, or a conflict report naming what went wrong.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod concurrent;
pub mod config;
pub mod group;
pub mod lexer;
pub mod operand;
pub mod output;
pub mod relation;
pub mod resolve;
pub mod sequencer;

pub use chain::{ComponentSpec, PrecedenceFact};
pub use concurrent::resolve_concurrently;
pub use config::SequenceConfig;
pub use group::{group, AmbiguousPriority, RelationGroup};
pub use lexer::{lex, ComponentBlock, LineKind, SourceLine};
pub use output::{ConflictReport, SequenceOutput, SequenceReport};
pub use relation::{normalize, Direction, RawRelation, Relation, RelationError};
pub use resolve::resolve_order;
pub use sequencer::{build_spec, sequence_component, Sequencer};

use geekcms_core::{PermissiveCatalog, SequenceResult};

/// Sequence a relation source with no plugin catalog
///
/// # Errors
///
/// Returns error if the source cannot be split into component blocks
pub fn sequence_source(source: &str, default_theme: &str) -> SequenceResult<SequenceOutput> {
    Sequencer::new(SequenceConfig::for_theme(default_theme), PermissiveCatalog).sequence(source)
}
