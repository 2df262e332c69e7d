//! Relation grouping.
//!
//! Normalized relations are partitioned by their left operand. Within a group
//! the successors are ordered by ascending priority, ties broken by the order
//! they first appeared in the source.

use geekcms_core::PluginRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::relation::Relation;

/// Successors of one plugin, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationGroup {
    /// Common left operand
    pub x: PluginRef,
    /// Successors ordered by `(priority, first_seen)`
    pub ordered_ys: Vec<PluginRef>,
}

/// The same `(x, y)` pair declared under two different priorities
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{x} << {y}` declared with priorities {first} and {second}")]
pub struct AmbiguousPriority {
    /// Left operand
    pub x: PluginRef,
    /// Right operand
    pub y: PluginRef,
    /// Priority of the first declaration
    pub first: u32,
    /// Priority of the conflicting declaration
    pub second: u32,
}

/// Group relations by left operand
///
/// Groups come out in order of first appearance of their `x`. Repeating an
/// identical `(x, p, y)` is harmless.
///
/// # Errors
///
/// Returns error if an `(x, y)` pair appears under two priorities
pub fn group(relations: &[Relation]) -> Result<Vec<RelationGroup>, AmbiguousPriority> {
    let mut by_x: IndexMap<&PluginRef, IndexMap<&PluginRef, u32>> = IndexMap::new();

    for relation in relations {
        let successors = by_x.entry(&relation.x).or_default();
        match successors.get(&relation.y) {
            Some(&first) if first != relation.priority => {
                return Err(AmbiguousPriority {
                    x: relation.x.clone(),
                    y: relation.y.clone(),
                    first,
                    second: relation.priority,
                });
            }
            Some(_) => {}
            None => {
                successors.insert(&relation.y, relation.priority);
            }
        }
    }

    Ok(by_x
        .into_iter()
        .map(|(x, successors)| {
            let mut ys: Vec<(&PluginRef, u32)> = successors.into_iter().collect();
            // Stable sort keeps first-seen order among equal priorities.
            ys.sort_by_key(|&(_, priority)| priority);
            RelationGroup {
                x: x.clone(),
                ordered_ys: ys.into_iter().map(|(y, _)| y.clone()).collect(),
            }
        })
        .collect())
}
