//! Sequencer: relation source in, one execution order per component out.
//!
//! Each component goes through the same pipeline: lines are classified,
//! operands resolved, relations normalized and grouped, groups expanded to
//! chain facts, and the facts sorted. Components share nothing, so a failure
//! in one leaves the others untouched.

use geekcms_core::{PluginCatalog, PluginRef, SequenceError, SequenceResult};

use crate::chain::ComponentSpec;
use crate::config::SequenceConfig;
use crate::group::group;
use crate::lexer::{lex, ComponentBlock, LineKind, SourceLine};
use crate::operand;
use crate::output::SequenceOutput;
use crate::relation::{normalize, RawRelation, Relation};
use crate::resolve::resolve_order;

/// Resolves relation sources against a plugin catalog
#[derive(Debug, Clone)]
pub struct Sequencer<C> {
    config: SequenceConfig,
    catalog: C,
}

impl<C: PluginCatalog> Sequencer<C> {
    /// Create a new sequencer
    #[must_use]
    pub fn new(config: SequenceConfig, catalog: C) -> Self {
        Self { config, catalog }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Catalog in use
    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Sequence every component of a relation source
    ///
    /// Per-component conflicts are recorded in the output. Only a failure to
    /// split the source into components is returned as an error.
    ///
    /// # Errors
    ///
    /// Returns error if the source cannot be split into component blocks
    pub fn sequence(&self, source: &str) -> SequenceResult<SequenceOutput> {
        let blocks = lex(source)?;
        let mut output = SequenceOutput::new();
        for block in &blocks {
            let result = sequence_component(block, &self.config, &self.catalog);
            output.insert(block.name.clone(), result);
        }
        output.fill_catalog_components(&self.config, &self.catalog);
        Ok(output)
    }
}

/// Run the full pipeline for one component block
///
/// # Errors
///
/// Returns the first conflict found in the component
pub fn sequence_component<C: PluginCatalog + ?Sized>(
    block: &ComponentBlock,
    config: &SequenceConfig,
    catalog: &C,
) -> SequenceResult<Vec<PluginRef>> {
    let spec = build_spec(block, config, catalog)?;
    resolve_order(&spec)
}

/// Parse a component block into its resolver input
///
/// # Errors
///
/// Returns error on malformed lines, unknown operands or components, and
/// ambiguous priorities
#[tracing::instrument(skip_all, fields(component = %block.name))]
pub fn build_spec<C: PluginCatalog + ?Sized>(
    block: &ComponentBlock,
    config: &SequenceConfig,
    catalog: &C,
) -> SequenceResult<ComponentSpec> {
    if let Some(err) = &block.header_error {
        return Err(err.clone());
    }
    if config.check_components && !catalog.is_known_component(&block.name) {
        tracing::warn!("component is not registered");
        return Err(SequenceError::UnknownComponent {
            component: block.name.clone(),
        });
    }

    let mut relations: Vec<Relation> = Vec::new();
    let mut mentions: Vec<PluginRef> = Vec::new();
    let mut loose: Vec<PluginRef> = Vec::new();

    for token in block.tokens() {
        let (line, kind) = token?;
        match kind {
            LineKind::BareIdentifier(text) => {
                let plugin = operand::resolve(&text, &config.default_theme)
                    .map_err(|e| syntax_error(block, line, e.to_string()))?;
                check_operand(block, line, &plugin, config, catalog)?;
                mentions.push(plugin.clone());
                loose.push(plugin);
            }
            kind => {
                let relation = RawRelation::from_line(&kind, &config.default_theme)
                    .and_then(normalize)
                    .map_err(|e| syntax_error(block, line, e.to_string()))?;
                check_operand(block, line, &relation.x, config, catalog)?;
                check_operand(block, line, &relation.y, config, catalog)?;
                tracing::trace!(x = %relation.x, p = relation.priority, y = %relation.y, "relation");
                mentions.push(relation.x.clone());
                mentions.push(relation.y.clone());
                relations.push(relation);
            }
        }
    }

    let groups = group(&relations).map_err(|e| {
        tracing::warn!(error = %e, "ambiguous priority");
        SequenceError::AmbiguousPriority {
            component: block.name.clone(),
            before: e.x,
            after: e.y,
            first: e.first,
            second: e.second,
        }
    })?;

    tracing::debug!(
        relations = relations.len(),
        groups = groups.len(),
        loose = loose.len(),
        "grouped relations"
    );
    Ok(ComponentSpec::build(
        block.name.clone(),
        mentions,
        loose,
        &relations,
        &groups,
    ))
}

fn check_operand<C: PluginCatalog + ?Sized>(
    block: &ComponentBlock,
    line: &SourceLine,
    plugin: &PluginRef,
    config: &SequenceConfig,
    catalog: &C,
) -> SequenceResult<()> {
    if config.check_operands && !plugin.is_sentinel() && !catalog.is_known_plugin(plugin) {
        tracing::warn!(plugin = %plugin, line = line.number, "unknown operand");
        return Err(SequenceError::UnknownOperand {
            component: block.name.clone(),
            plugin: plugin.clone(),
            line: line.number,
        });
    }
    Ok(())
}

fn syntax_error(block: &ComponentBlock, line: &SourceLine, reason: String) -> SequenceError {
    SequenceError::Syntax {
        component: block.name.clone(),
        line: line.number,
        text: line.text.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geekcms_core::{ConflictKind, PermissiveCatalog, PluginEntry, PluginRegistry};

    fn plugin(name: &str) -> PluginRef {
        PluginRef::new("t", name).unwrap()
    }

    fn sequencer() -> Sequencer<PermissiveCatalog> {
        Sequencer::new(SequenceConfig::for_theme("t"), PermissiveCatalog)
    }

    fn registry() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.register_component("pre_load").unwrap();
        registry.register_component("render").unwrap();
        for name in ["a", "b", "c"] {
            registry.register(PluginEntry::new("t", name)).unwrap();
        }
        registry
    }

    #[test]
    fn test_sequence_simple() {
        let output = sequencer().sequence("pre_load:\n  a << b\n").unwrap();
        assert_eq!(output.order("pre_load"), Some(&[plugin("a"), plugin("b")][..]));
    }

    #[test]
    fn test_sequence_syntax_error_is_local() {
        let output = sequencer()
            .sequence("broken:\n  a <> b\nfine:\n  a << b\n")
            .unwrap();
        let err = output.result("broken").unwrap().as_ref().unwrap_err();
        assert_eq!(err.kind(), ConflictKind::Syntax);
        match err {
            SequenceError::Syntax { line, reason, .. } => {
                assert_eq!(*line, 2);
                assert!(reason.contains("<>"));
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
        assert!(output.order("fine").is_some());
    }

    #[test]
    fn test_sequence_malformed_operand() {
        let output = sequencer().sequence("c:\n  a << b.c.d\n").unwrap();
        let err = output.result("c").unwrap().as_ref().unwrap_err();
        assert_eq!(err.kind(), ConflictKind::Syntax);
    }

    #[test]
    fn test_sequence_unknown_operand() {
        let sequencer = Sequencer::new(SequenceConfig::for_theme("t"), registry());
        let output = sequencer.sequence("pre_load:\n  a << ghost\n").unwrap();
        let err = output.result("pre_load").unwrap().as_ref().unwrap_err();
        assert_eq!(
            err,
            &SequenceError::UnknownOperand {
                component: "pre_load".to_string(),
                plugin: plugin("ghost"),
                line: 2,
            }
        );
    }

    #[test]
    fn test_sequence_unknown_operand_unchecked() {
        let config = SequenceConfig::for_theme("t").with_check_operands(false);
        let output = Sequencer::new(config, registry())
            .sequence("pre_load:\n  a << ghost\n")
            .unwrap();
        assert_eq!(
            output.order("pre_load"),
            Some(&[plugin("a"), plugin("ghost")][..])
        );
    }

    #[test]
    fn test_sequence_unknown_component() {
        let sequencer = Sequencer::new(SequenceConfig::for_theme("t"), registry());
        let output = sequencer.sequence("post_load:\n  a\n").unwrap();
        let err = output.result("post_load").unwrap().as_ref().unwrap_err();
        assert_eq!(err.kind(), ConflictKind::UnknownComponent);
    }

    #[test]
    fn test_sequence_fills_catalog_components() {
        let sequencer = Sequencer::new(SequenceConfig::for_theme("t"), registry());
        let output = sequencer.sequence("render:\n  b << c\n").unwrap();
        let names: Vec<&str> = output.component_names().collect();
        assert_eq!(names, vec!["render", "pre_load"]);
        assert_eq!(output.order("pre_load"), Some(&[][..]));
    }

    #[test]
    fn test_sequence_bad_header_is_local() {
        let output = sequencer()
            .sequence("good:\n  a << b\nbad-name:\n  c\nother:\n  d\n")
            .unwrap();
        assert_eq!(
            output.component_names().collect::<Vec<_>>(),
            vec!["good", "bad-name", "other"]
        );
        assert_eq!(output.order("good"), Some(&[plugin("a"), plugin("b")][..]));
        assert_eq!(output.order("other"), Some(&[plugin("d")][..]));
        match output.result("bad-name") {
            Some(Err(SequenceError::Syntax { component, line, .. })) => {
                assert_eq!(component, "bad-name");
                assert_eq!(*line, 1);
            }
            other => panic!("expected header error, got {:?}", other),
        }
    }

    #[test]
    fn test_sequence_document_error() {
        assert!(sequencer().sequence("a << b\n").is_err());
    }

    #[test]
    fn test_build_spec_mentions_in_normalized_order() {
        let blocks = lex("c:\n  b >> a\n  z\n").unwrap();
        let spec = build_spec(&blocks[0], &SequenceConfig::for_theme("t"), &PermissiveCatalog).unwrap();
        let names: Vec<_> = spec.plugins.iter().filter_map(PluginRef::name).collect();
        assert_eq!(names, vec!["a", "b", "z"]);
        assert!(spec.loose.contains(&plugin("z")));
    }
}
