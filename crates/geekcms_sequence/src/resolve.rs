//! Order resolution.
//!
//! A stable topological sort over the component's precedence facts. Among the
//! nodes whose predecessors have all been placed, the one mentioned first in
//! the source goes next. `HEAD` and `TAIL` take part as ordering anchors and
//! are dropped from the result.

use geekcms_core::{PluginRef, SequenceError, SequenceResult};
use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeSet;

use crate::chain::ComponentSpec;

/// Resolve one component into its execution order
///
/// Plugins that take part in no fact are appended after the constrained ones,
/// in source order.
///
/// # Errors
///
/// Returns [`SequenceError::CycleConflict`] naming the plugins of one cycle if
/// the facts cannot all be satisfied
pub fn resolve_order(spec: &ComponentSpec) -> SequenceResult<Vec<PluginRef>> {
    let rank = |plugin: &PluginRef| -> usize {
        match plugin {
            PluginRef::Head => 0,
            PluginRef::Tail => usize::MAX,
            _ => spec.plugins.get_index_of(plugin).map_or(usize::MAX - 1, |i| i + 1),
        }
    };

    let mut nodes: IndexSet<&PluginRef> = IndexSet::new();
    let mut successors: IndexMap<&PluginRef, Vec<&PluginRef>> = IndexMap::new();
    let mut in_degree: IndexMap<&PluginRef, usize> = IndexMap::new();
    for fact in &spec.facts {
        nodes.insert(&fact.earlier);
        nodes.insert(&fact.later);
        successors.entry(&fact.earlier).or_default().push(&fact.later);
        *in_degree.entry(&fact.later).or_default() += 1;
        in_degree.entry(&fact.earlier).or_default();
    }

    let mut available: BTreeSet<(usize, &PluginRef)> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&node, _)| (rank(node), node))
        .collect();

    let mut placed: Vec<&PluginRef> = Vec::with_capacity(nodes.len());
    while let Some((_, node)) = available.pop_first() {
        placed.push(node);
        for &next in successors.get(node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    available.insert((rank(next), next));
                }
            }
        }
    }

    if placed.len() != nodes.len() {
        let remaining: IndexSet<&PluginRef> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree > 0)
            .map(|(&node, _)| node)
            .collect();
        let mut cycle = find_cycle(&spec.facts, &remaining, &rank);
        cycle.sort_by_key(|p| rank(p));
        tracing::warn!(
            component = %spec.name,
            cycle = ?cycle.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "precedence cycle"
        );
        return Err(SequenceError::CycleConflict {
            component: spec.name.clone(),
            plugins: cycle,
        });
    }

    let mut order: Vec<PluginRef> = placed
        .into_iter()
        .filter(|p| !p.is_sentinel())
        .cloned()
        .collect();
    for plugin in &spec.plugins {
        if !nodes.contains(plugin) {
            order.push(plugin.clone());
        }
    }

    tracing::debug!(component = %spec.name, plugins = order.len(), "resolved order");
    Ok(order)
}

/// Extract one cycle from the nodes a topological sort could not place
///
/// Every remaining node has a remaining predecessor, so walking predecessors
/// from any of them must revisit a node.
fn find_cycle(
    facts: &IndexSet<crate::chain::PrecedenceFact>,
    remaining: &IndexSet<&PluginRef>,
    rank: &impl Fn(&PluginRef) -> usize,
) -> Vec<PluginRef> {
    let mut predecessors: IndexMap<&PluginRef, Vec<&PluginRef>> = IndexMap::new();
    for fact in facts {
        if remaining.contains(&fact.earlier) && remaining.contains(&fact.later) {
            predecessors.entry(&fact.later).or_default().push(&fact.earlier);
        }
    }

    let Some(&start) = remaining.iter().min_by_key(|p| rank(**p)) else {
        return Vec::new();
    };

    let mut path: IndexSet<&PluginRef> = IndexSet::new();
    let mut current = start;
    while path.insert(current) {
        match predecessors
            .get(current)
            .and_then(|preds| preds.iter().min_by_key(|p| rank(**p)))
        {
            Some(&prev) => current = prev,
            None => break,
        }
    }

    match path.get_index_of(current) {
        Some(at) => path.into_iter().skip(at).cloned().collect(),
        None => path.into_iter().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::PrecedenceFact;

    fn plugin(name: &str) -> PluginRef {
        PluginRef::new("t", name).unwrap()
    }

    fn component(facts: &[(&str, &str)], plugins: &[&str]) -> ComponentSpec {
        let mut spec = ComponentSpec::new("c");
        for name in plugins {
            spec.mention(&plugin(name));
        }
        for (a, b) in facts {
            spec.facts
                .insert(PrecedenceFact::new(plugin(a), plugin(b)));
        }
        spec
    }

    fn names(order: &[PluginRef]) -> Vec<&str> {
        order.iter().filter_map(PluginRef::name).collect()
    }

    #[test]
    fn test_resolve_empty() {
        let order = resolve_order(&ComponentSpec::new("c")).unwrap();
        assert!(order.is_empty());
    }

    #[test]
    fn test_resolve_chain() {
        let spec = component(&[("b", "c"), ("a", "b")], &["c", "b", "a"]);
        assert_eq!(names(&resolve_order(&spec).unwrap()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_resolve_ties_by_first_mention() {
        let spec = component(&[("a", "b"), ("c", "b")], &["a", "b", "c"]);
        assert_eq!(names(&resolve_order(&spec).unwrap()), vec!["a", "c", "b"]);

        let spec = component(&[("a", "b"), ("c", "b")], &["c", "b", "a"]);
        assert_eq!(names(&resolve_order(&spec).unwrap()), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_resolve_appends_unconstrained() {
        let spec = component(&[("b", "c")], &["lone", "b", "c", "other"]);
        assert_eq!(
            names(&resolve_order(&spec).unwrap()),
            vec!["b", "c", "lone", "other"]
        );
    }

    #[test]
    fn test_resolve_strips_sentinels() {
        let mut spec = component(&[("a", "b")], &["a", "b"]);
        for name in ["a", "b"] {
            spec.facts
                .insert(PrecedenceFact::new(PluginRef::Head, plugin(name)));
            spec.facts
                .insert(PrecedenceFact::new(plugin(name), PluginRef::Tail));
        }
        let order = resolve_order(&spec).unwrap();
        assert_eq!(order, vec![plugin("a"), plugin("b")]);
    }

    #[test]
    fn test_resolve_two_cycle() {
        let spec = component(&[("a", "b"), ("b", "a")], &["a", "b"]);
        match resolve_order(&spec) {
            Err(SequenceError::CycleConflict { component, plugins }) => {
                assert_eq!(component, "c");
                assert_eq!(plugins, vec![plugin("a"), plugin("b")]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_cycle_excludes_downstream() {
        let spec = component(
            &[("x", "a"), ("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")],
            &["x", "a", "b", "c", "d"],
        );
        match resolve_order(&spec) {
            Err(SequenceError::CycleConflict { plugins, .. }) => {
                assert_eq!(names(&plugins), vec!["a", "b", "c"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_self_loop() {
        let spec = component(&[("a", "a")], &["a"]);
        match resolve_order(&spec) {
            Err(SequenceError::CycleConflict { plugins, .. }) => {
                assert_eq!(plugins, vec![plugin("a")]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }
}
