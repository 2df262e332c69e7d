//! Chain expansion and component specs.
//!
//! A group `x: [y1, y2, .., yn]` becomes the strict facts
//! `x < y1 < y2 < .. < yn`. Successors of different predecessors stay
//! unordered unless some chain orders them transitively.
//!
//! Unary anchors are expanded here too, once the whole component is known:
//! `x <<` places `x` before every plugin not already required to precede it,
//! and `>> y` places `y` after every plugin not already required to follow it.

use geekcms_core::PluginRef;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::group::RelationGroup;
use crate::relation::Relation;

/// `earlier` strictly before `later`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrecedenceFact {
    /// Runs first
    pub earlier: PluginRef,
    /// Runs after `earlier`
    pub later: PluginRef,
}

impl PrecedenceFact {
    /// Create a new fact
    #[must_use]
    pub fn new(earlier: PluginRef, later: PluginRef) -> Self {
        Self { earlier, later }
    }
}

/// Expand relation groups into chain facts
///
/// `TAIL` never takes part in a sibling chain: `x <<` alongside `x << y`
/// yields `x < TAIL` and `x < y`. Groups headed by `HEAD` hold back anchors,
/// which are ordered among themselves by [`ComponentSpec::expand_anchors`].
#[must_use]
pub fn expand(groups: &[RelationGroup]) -> IndexSet<PrecedenceFact> {
    let mut facts = IndexSet::new();
    for group in groups {
        if group.x == PluginRef::Head {
            for y in &group.ordered_ys {
                facts.insert(PrecedenceFact::new(PluginRef::Head, y.clone()));
            }
            continue;
        }

        if group.ordered_ys.contains(&PluginRef::Tail) {
            facts.insert(PrecedenceFact::new(group.x.clone(), PluginRef::Tail));
        }
        let mut prev = &group.x;
        for y in group.ordered_ys.iter().filter(|y| !y.is_sentinel()) {
            facts.insert(PrecedenceFact::new(prev.clone(), y.clone()));
            prev = y;
        }
    }
    facts
}

/// Everything the order resolver needs for one component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentSpec {
    /// Component name
    pub name: String,
    /// Strict precedence facts
    pub facts: IndexSet<PrecedenceFact>,
    /// Plugins mentioned on bare lines
    pub loose: IndexSet<PluginRef>,
    /// Every real plugin of the component, in first-seen order
    pub plugins: IndexSet<PluginRef>,
}

impl ComponentSpec {
    /// Create an empty spec
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Record a plugin mention
    pub fn mention(&mut self, plugin: &PluginRef) {
        if !plugin.is_sentinel() {
            self.plugins.insert(plugin.clone());
        }
    }

    /// Record a plugin mentioned with no relation
    pub fn add_loose(&mut self, plugin: PluginRef) {
        self.mention(&plugin);
        self.loose.insert(plugin);
    }

    /// Build a spec from normalized relations, their groups, and loose plugins
    ///
    /// Plugins are ranked by first mention: relations are read `x` then `y`
    /// in source order, bare lines in place.
    #[must_use]
    pub fn build(
        name: impl Into<String>,
        mentions: impl IntoIterator<Item = PluginRef>,
        loose: impl IntoIterator<Item = PluginRef>,
        relations: &[Relation],
        groups: &[RelationGroup],
    ) -> Self {
        let mut spec = Self::new(name);
        for plugin in mentions {
            spec.mention(&plugin);
        }
        for plugin in loose {
            spec.add_loose(plugin);
        }
        spec.facts = expand(groups);
        spec.expand_anchors(relations);
        spec.pin_sentinels();
        tracing::debug!(
            component = %spec.name,
            plugins = spec.plugins.len(),
            facts = spec.facts.len(),
            "expanded component"
        );
        spec
    }

    /// Expand unary anchors into facts against the rest of the component
    ///
    /// Anchors on the same side are first ordered by ascending priority. Each
    /// anchor is then placed against every plugin that the chain facts and
    /// that priority order do not already put on its other side, so the
    /// result does not depend on the order anchors are declared in.
    pub fn expand_anchors(&mut self, relations: &[Relation]) {
        let front = anchors(relations.iter().filter(|r| r.is_front_anchor()).map(|r| (&r.x, r.priority)));
        let back = anchors(relations.iter().filter(|r| r.is_back_anchor()).map(|r| (&r.y, r.priority)));
        if front.is_empty() && back.is_empty() {
            return;
        }

        let explicit = Reachability::new(chain_edges(&self.facts));
        let mut ranked: Vec<(&PluginRef, &PluginRef)> = Vec::new();
        for side in [&front, &back] {
            for (&a, &pa) in side {
                let before = explicit.ancestors(a);
                for (&b, &pb) in side {
                    if pa < pb && !before.contains(b) {
                        ranked.push((a, b));
                    }
                }
            }
        }

        let graph = Reachability::new(chain_edges(&self.facts).chain(ranked.iter().copied()));
        let mut deferred: Vec<PrecedenceFact> = ranked
            .iter()
            .map(|&(a, b)| PrecedenceFact::new(a.clone(), b.clone()))
            .collect();

        for &anchor in front.keys() {
            let before = graph.ancestors(anchor);
            for plugin in &self.plugins {
                if plugin != anchor && !front.contains_key(plugin) && !before.contains(plugin) {
                    deferred.push(PrecedenceFact::new(anchor.clone(), plugin.clone()));
                }
            }
        }
        for &anchor in back.keys() {
            let after = graph.descendants(anchor);
            for plugin in &self.plugins {
                if plugin != anchor && !back.contains_key(plugin) && !after.contains(plugin) {
                    deferred.push(PrecedenceFact::new(plugin.clone(), anchor.clone()));
                }
            }
        }

        for fact in deferred {
            tracing::trace!(earlier = %fact.earlier, later = %fact.later, "anchor fact");
            self.facts.insert(fact);
        }
    }

    /// Link every plugin after `HEAD` and before `TAIL` when they are in use
    fn pin_sentinels(&mut self) {
        let mentions = |sentinel: &PluginRef, facts: &IndexSet<PrecedenceFact>| {
            facts
                .iter()
                .any(|f| &f.earlier == sentinel || &f.later == sentinel)
        };
        let head = mentions(&PluginRef::Head, &self.facts);
        let tail = mentions(&PluginRef::Tail, &self.facts);
        for plugin in &self.plugins {
            if head {
                self.facts
                    .insert(PrecedenceFact::new(PluginRef::Head, plugin.clone()));
            }
            if tail {
                self.facts
                    .insert(PrecedenceFact::new(plugin.clone(), PluginRef::Tail));
            }
        }
    }

    /// Check if a plugin takes part in any fact
    #[must_use]
    pub fn is_constrained(&self, plugin: &PluginRef) -> bool {
        self.facts
            .iter()
            .any(|f| &f.earlier == plugin || &f.later == plugin)
    }
}

/// Anchored plugins with their lowest declared priority, first-seen order
fn anchors<'a>(
    entries: impl Iterator<Item = (&'a PluginRef, u32)>,
) -> IndexMap<&'a PluginRef, u32> {
    let mut out: IndexMap<&PluginRef, u32> = IndexMap::new();
    for (plugin, priority) in entries {
        let slot = out.entry(plugin).or_insert(priority);
        *slot = (*slot).min(priority);
    }
    out
}

/// Fact edges between real plugins
fn chain_edges(
    facts: &IndexSet<PrecedenceFact>,
) -> impl Iterator<Item = (&PluginRef, &PluginRef)> + '_ {
    facts
        .iter()
        .filter(|f| !f.earlier.is_sentinel() && !f.later.is_sentinel())
        .map(|f| (&f.earlier, &f.later))
}

/// Forward and reverse adjacency over real plugins
struct Reachability<'a> {
    successors: IndexMap<&'a PluginRef, Vec<&'a PluginRef>>,
    predecessors: IndexMap<&'a PluginRef, Vec<&'a PluginRef>>,
}

impl<'a> Reachability<'a> {
    fn new(edges: impl Iterator<Item = (&'a PluginRef, &'a PluginRef)>) -> Self {
        let mut successors: IndexMap<&PluginRef, Vec<&PluginRef>> = IndexMap::new();
        let mut predecessors: IndexMap<&PluginRef, Vec<&PluginRef>> = IndexMap::new();
        for (earlier, later) in edges {
            successors.entry(earlier).or_default().push(later);
            predecessors.entry(later).or_default().push(earlier);
        }
        Self {
            successors,
            predecessors,
        }
    }

    fn ancestors(&self, plugin: &PluginRef) -> IndexSet<&'a PluginRef> {
        walk(&self.predecessors, plugin)
    }

    fn descendants(&self, plugin: &PluginRef) -> IndexSet<&'a PluginRef> {
        walk(&self.successors, plugin)
    }
}

fn walk<'a>(
    edges: &IndexMap<&'a PluginRef, Vec<&'a PluginRef>>,
    start: &PluginRef,
) -> IndexSet<&'a PluginRef> {
    let mut seen = IndexSet::new();
    let mut stack: Vec<&PluginRef> = edges.get(start).cloned().unwrap_or_default();
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        if let Some(next) = edges.get(current) {
            stack.extend(next.iter().copied());
        }
    }
    seen
}
