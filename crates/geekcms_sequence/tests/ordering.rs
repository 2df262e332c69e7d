//! End-to-end ordering scenarios for the relation DSL.

use geekcms_core::{ConflictKind, PluginRef, SequenceError};
use geekcms_sequence::{sequence_source, SequenceOutput};
use proptest::prelude::*;

fn run(source: &str) -> SequenceOutput {
    sequence_source(source, "t").unwrap()
}

fn order(source: &str, component: &str) -> Vec<String> {
    let output = run(source);
    match output.result(component) {
        Some(Ok(order)) => order
            .iter()
            .filter_map(PluginRef::name)
            .map(str::to_string)
            .collect(),
        other => panic!("expected order for {}, got {:?}", component, other),
    }
}

fn order_of(output: &SequenceOutput, component: &str) -> Vec<String> {
    output
        .order(component)
        .unwrap_or_default()
        .iter()
        .filter_map(PluginRef::name)
        .map(str::to_string)
        .collect()
}

fn conflict(source: &str, component: &str) -> SequenceError {
    match run(source).result(component) {
        Some(Err(err)) => err.clone(),
        other => panic!("expected conflict for {}, got {:?}", component, other),
    }
}

#[test]
fn test_shared_successor_ties_by_source_order() {
    let source = "pre_load:\n    loader_a <<0 loader_b\n    loader_c <<1 loader_b\n";
    assert_eq!(
        order(source, "pre_load"),
        vec!["loader_a", "loader_c", "loader_b"]
    );
}

#[test]
fn test_shared_successor_reversed_lines() {
    let source = "pre_load:\n    loader_c <<1 loader_b\n    loader_a <<0 loader_b\n";
    assert_eq!(
        order(source, "pre_load"),
        vec!["loader_c", "loader_a", "loader_b"]
    );
}

#[test]
fn test_front_anchor_with_bare_plugin() {
    assert_eq!(
        order("pre_load:\n    my_loader <<\n    my_filter\n", "pre_load"),
        vec!["my_loader", "my_filter"]
    );
    assert_eq!(
        order("pre_load:\n    my_filter\n    my_loader <<\n", "pre_load"),
        vec!["my_loader", "my_filter"]
    );
}

#[test]
fn test_back_anchor() {
    assert_eq!(
        order("build:\n    >> last\n    a << b\n    c\n", "build"),
        vec!["a", "b", "c", "last"]
    );
}

#[test]
fn test_anchor_priorities() {
    let source = "build:\n    other\n    second <<1\n    first <<\n    >> end\n    2>> very_end\n";
    assert_eq!(
        order(source, "build"),
        vec!["first", "second", "other", "end", "very_end"]
    );
}

#[test]
fn test_sibling_priorities() {
    assert_eq!(
        order("build:\n    x <<1 b\n    x <<0 a\n", "build"),
        vec!["x", "a", "b"]
    );
}

#[test]
fn test_back_anchor_with_binary_relation_is_conjunctive() {
    assert_eq!(
        order("build:\n    >> a\n    a << b\n    c\n", "build"),
        vec!["c", "a", "b"]
    );
}

#[test]
fn test_inline_header_relations() {
    let source = "pre_load: my_loader\npre_load: my_filter >> my_loader\n";
    assert_eq!(order(source, "pre_load"), vec!["my_loader", "my_filter"]);
}

#[test]
fn test_qualified_operands() {
    let output = run("render:\n    shared.base << page\n");
    let qualified = output.qualified();
    assert_eq!(qualified["render"], vec!["shared.base", "t.page"]);
}

#[test]
fn test_two_cycle() {
    let err = conflict("c:\n    a <<0 b\n    b <<0 a\n", "c");
    assert_eq!(err.kind(), ConflictKind::CycleConflict);
    let names: Vec<_> = err.plugins().iter().filter_map(|p| p.name().map(str::to_string)).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_ambiguous_priority() {
    let err = conflict("c:\n    a <<0 b\n    a <<1 b\n", "c");
    assert_eq!(err.kind(), ConflictKind::AmbiguousPriority);
}

#[test]
fn test_ambiguous_priority_across_spellings() {
    let err = conflict("c:\n    a <<2 b\n    b >> a\n", "c");
    assert_eq!(err.kind(), ConflictKind::AmbiguousPriority);
}

#[test]
fn test_front_and_back_anchor_conflict() {
    let err = conflict("c:\n    p <<\n    >> p\n    q\n", "c");
    assert_eq!(err.kind(), ConflictKind::CycleConflict);

    assert_eq!(order("c:\n    p <<\n    >> p\n", "c"), vec!["p"]);
    assert_eq!(order("c:\n    p <<\n    p <<\n    q\n", "c"), vec!["p", "q"]);
}

#[test]
fn test_front_anchor_priority_implies_order() {
    assert_eq!(
        order("c:\n    z <<0\n    x <<1\n    q << z\n", "c"),
        vec!["q", "z", "x"]
    );
}

#[test]
fn test_back_anchor_priority_implies_order() {
    assert_eq!(
        order("c:\n    >> a\n    1>> b\n    b << q\n", "c"),
        vec!["a", "b", "q"]
    );
}

#[test]
fn test_malformed_header_stays_local() {
    let output = run("good:\n    a << b\nbad-name:\n    c\nother:\n    d\n");
    assert_eq!(order_of(&output, "good"), vec!["a", "b"]);
    assert_eq!(order_of(&output, "other"), vec!["d"]);
    assert_eq!(output.errors().len(), 1);
    assert_eq!(output.errors()[0].component(), "bad-name");
    assert_eq!(output.errors()[0].kind(), ConflictKind::Syntax);
}

#[test]
fn test_conflict_does_not_spread() {
    let output = run("bad:\n    a << b\n    b << a\ngood:\n    a << b\n");
    assert!(!output.is_ok());
    assert_eq!(output.errors().len(), 1);
    assert_eq!(output.errors()[0].component(), "bad");
    assert!(output.order("good").is_some());
}

#[test]
fn test_unknown_operator() {
    let err = conflict("c:\n    a <<< b\n", "c");
    assert_eq!(err.kind(), ConflictKind::Syntax);
}

#[test]
fn test_misplaced_unary_operand() {
    assert_eq!(conflict("c:\n    a >>\n", "c").kind(), ConflictKind::Syntax);
    assert_eq!(conflict("c:\n    << a\n", "c").kind(), ConflictKind::Syntax);
}

#[test]
fn test_mirrored_spelling_same_order() {
    let left = run("c:\n    x << y\n    z\n");
    let right = run("c:\n    y >> x\n    z\n");
    assert_eq!(left, right);
}

#[test]
fn test_idempotent() {
    let source = "a:\n    p <<1 q\n    p <<0 r\n    >> s\nb:\n    x << y\n    y << x\n";
    assert_eq!(run(source), run(source));
    assert_eq!(run(source).report(), run(source).report());
}

fn render(edges: &[(usize, usize, bool)], loose: &[usize]) -> String {
    let mut source = String::from("c:\n");
    for &(i, j, mirrored) in edges {
        if mirrored {
            source.push_str(&format!("    p{} {}>> p{}\n", j, j, i));
        } else {
            source.push_str(&format!("    p{} <<{} p{}\n", i, j, j));
        }
    }
    for &k in loose {
        source.push_str(&format!("    p{}\n", k));
    }
    source
}

fn arb_graph() -> impl Strategy<Value = (Vec<(usize, usize, bool)>, Vec<usize>)> {
    (2usize..8).prop_flat_map(|n| {
        let edges = prop::collection::vec((0..n, 0..n, any::<bool>()), 0..12).prop_map(|raw| {
            raw.into_iter()
                .filter(|(i, j, _)| i < j)
                .collect::<Vec<_>>()
        });
        let loose = prop::collection::vec(0..n, 0..4);
        (edges, loose)
    })
}

proptest! {
    #[test]
    fn prop_every_plugin_once((edges, loose) in arb_graph()) {
        let output = run(&render(&edges, &loose));
        let order = output.order("c").unwrap_or_default().to_vec();

        let mut expected: Vec<usize> = edges.iter().flat_map(|&(i, j, _)| [i, j]).chain(loose.iter().copied()).collect();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(order.len(), expected.len());

        let position = |k: usize| order.iter().position(|p| p.name() == Some(format!("p{}", k).as_str()));
        for k in &expected {
            prop_assert!(position(*k).is_some());
        }
        for &(i, j, _) in &edges {
            prop_assert!(position(i) < position(j));
        }
    }

    #[test]
    fn prop_mirrored_spelling_equivalent((edges, loose) in arb_graph()) {
        let flipped: Vec<_> = edges.iter().map(|&(i, j, m)| (i, j, !m)).collect();
        prop_assert_eq!(run(&render(&edges, &loose)), run(&render(&flipped, &loose)));
    }
}
