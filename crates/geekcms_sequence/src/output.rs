//! Sequencing output and its serializable report.

use geekcms_core::{ConflictKind, PluginCatalog, PluginRef, SequenceError, SequenceResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::SequenceConfig;

/// Per-component results of one sequencing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceOutput {
    components: IndexMap<String, SequenceResult<Vec<PluginRef>>>,
}

impl SequenceOutput {
    /// Create an empty output
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a component result
    pub fn insert(&mut self, component: String, result: SequenceResult<Vec<PluginRef>>) {
        self.components.insert(component, result);
    }

    /// Add an empty order for each catalog component not yet present
    pub fn fill_catalog_components<C: PluginCatalog + ?Sized>(
        &mut self,
        config: &SequenceConfig,
        catalog: &C,
    ) {
        if !config.check_components {
            return;
        }
        for component in catalog.components() {
            self.components.entry(component).or_insert_with(|| Ok(Vec::new()));
        }
    }

    /// Result for a component
    #[must_use]
    pub fn result(&self, component: &str) -> Option<&SequenceResult<Vec<PluginRef>>> {
        self.components.get(component)
    }

    /// Resolved order for a component, `None` if absent or conflicted
    #[must_use]
    pub fn order(&self, component: &str) -> Option<&[PluginRef]> {
        match self.components.get(component) {
            Some(Ok(order)) => Some(order),
            _ => None,
        }
    }

    /// All conflicts, in component order
    #[must_use]
    pub fn errors(&self) -> Vec<&SequenceError> {
        self.components
            .values()
            .filter_map(|r| r.as_ref().err())
            .collect()
    }

    /// Whether every component resolved
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.components.values().all(Result::is_ok)
    }

    /// Component names in output order
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Iterate over component results
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SequenceResult<Vec<PluginRef>>)> {
        self.components.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of components
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if there are no components
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Resolved orders as qualified `theme.plugin` names
    #[must_use]
    pub fn qualified(&self) -> IndexMap<String, Vec<String>> {
        self.components
            .iter()
            .filter_map(|(name, result)| {
                result.as_ref().ok().map(|order| {
                    (
                        name.clone(),
                        order.iter().map(PluginRef::qualified_name).collect(),
                    )
                })
            })
            .collect()
    }

    /// Build the serializable report
    #[must_use]
    pub fn report(&self) -> SequenceReport {
        SequenceReport {
            orders: self.qualified(),
            conflicts: self.errors().into_iter().map(ConflictReport::from).collect(),
        }
    }
}

/// Serializable summary of a sequencing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceReport {
    /// Resolved orders by component
    pub orders: IndexMap<String, Vec<String>>,
    /// Conflicts, one per failed component
    pub conflicts: Vec<ConflictReport>,
}

/// Serializable conflict entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Component that failed
    pub component: String,
    /// Conflict kind
    pub kind: ConflictKind,
    /// Plugins involved
    pub plugins: Vec<String>,
    /// Human readable description
    pub message: String,
}

impl From<&SequenceError> for ConflictReport {
    fn from(err: &SequenceError) -> Self {
        Self {
            component: err.component().to_string(),
            kind: err.kind(),
            plugins: err.plugins().iter().map(PluginRef::qualified_name).collect(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(name: &str) -> PluginRef {
        PluginRef::new("t", name).unwrap()
    }

    fn output() -> SequenceOutput {
        let mut output = SequenceOutput::new();
        output.insert("ok".to_string(), Ok(vec![plugin("a"), plugin("b")]));
        output.insert(
            "bad".to_string(),
            Err(SequenceError::CycleConflict {
                component: "bad".to_string(),
                plugins: vec![plugin("x"), plugin("y")],
            }),
        );
        output
    }

    #[test]
    fn test_output_accessors() {
        let output = output();
        assert_eq!(output.len(), 2);
        assert!(!output.is_ok());
        assert_eq!(output.order("ok"), Some(&[plugin("a"), plugin("b")][..]));
        assert_eq!(output.order("bad"), None);
        assert_eq!(output.order("missing"), None);
        assert_eq!(output.errors().len(), 1);
    }

    #[test]
    fn test_output_qualified() {
        let qualified = output().qualified();
        assert_eq!(qualified.len(), 1);
        assert_eq!(qualified["ok"], vec!["t.a", "t.b"]);
    }

    #[test]
    fn test_report_json() {
        let report = output().report();
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].kind, ConflictKind::CycleConflict);
        assert_eq!(report.conflicts[0].plugins, vec!["t.x", "t.y"]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["orders"]["ok"][1], "t.b");
        assert_eq!(json["conflicts"][0]["kind"], "cycle_conflict");
    }
}
