//! Tests for ReferenceGraph operations

use haste_code_chunker::{parse_source, Language, ReferenceKind, UnitId};
use haste_graph::{ExpandDirection, Expanded, GraphBuilder, ReferenceGraph};
use pretty_assertions::assert_eq;

const STATS_CODE: &str = r"
def sum(numbers):
    total = 0
    for n in numbers:
        total += n
    return total

def average(numbers):
    return sum(numbers) / len(numbers)

def median(numbers):
    ordered = sorted(numbers)
    return ordered[len(ordered) // 2]

def variance(numbers):
    mean = average(numbers)
    return sum([(x - mean) ** 2 for x in numbers]) / len(numbers)
";

fn ids(expanded: &[Expanded]) -> Vec<UnitId> {
    expanded.iter().map(|e| e.id).collect()
}

#[test]
fn test_add_edge_rejects_self_loops_and_duplicates() {
    let mut graph = ReferenceGraph::with_units(2);

    assert!(graph.add_edge(UnitId(0), UnitId(1), ReferenceKind::Call));
    assert!(!graph.add_edge(UnitId(0), UnitId(1), ReferenceKind::Call));
    assert!(!graph.add_edge(UnitId(0), UnitId(0), ReferenceKind::Call));
    assert!(!graph.add_edge(UnitId(0), UnitId(5), ReferenceKind::Call));
    assert!(graph.add_edge(UnitId(0), UnitId(1), ReferenceKind::Import));

    assert_eq!(graph.edge_count(), 2);
    assert_eq!(graph.stats(), (2, 2));
}

#[test]
fn test_get_callees_and_callers() {
    let mut graph = ReferenceGraph::with_units(3);

    // main -> helper, run -> helper
    graph.add_edge(UnitId(0), UnitId(2), ReferenceKind::Call);
    graph.add_edge(UnitId(1), UnitId(2), ReferenceKind::Call);
    graph.add_edge(UnitId(1), UnitId(0), ReferenceKind::Import);

    assert_eq!(graph.callees(UnitId(1)), vec![UnitId(2)]);
    assert_eq!(graph.callers(UnitId(2)), vec![UnitId(0), UnitId(1)]);
    assert!(graph.callers(UnitId(1)).is_empty());
}

#[test]
fn test_required_dependencies_ignore_imports() {
    let mut graph = ReferenceGraph::with_units(4);

    graph.add_edge(UnitId(0), UnitId(1), ReferenceKind::Call);
    graph.add_edge(UnitId(0), UnitId(2), ReferenceKind::Inherit);
    graph.add_edge(UnitId(0), UnitId(3), ReferenceKind::Import);

    assert_eq!(
        graph.required_dependencies(UnitId(0)),
        vec![UnitId(1), UnitId(2)]
    );
}

#[test]
fn test_expand_depth_1_and_2() {
    let mut graph = ReferenceGraph::with_units(3);

    // A -> B -> C
    graph.add_edge(UnitId(0), UnitId(1), ReferenceKind::Call);
    graph.add_edge(UnitId(1), UnitId(2), ReferenceKind::Call);

    let depth1 = graph
        .expand(&[UnitId(0)], 1, ExpandDirection::Outgoing)
        .unwrap();
    assert_eq!(ids(&depth1), vec![UnitId(0), UnitId(1)]);

    let depth2 = graph
        .expand(&[UnitId(0)], 2, ExpandDirection::Outgoing)
        .unwrap();
    assert_eq!(
        depth2,
        vec![
            Expanded { id: UnitId(0), hops: 0 },
            Expanded { id: UnitId(1), hops: 1 },
            Expanded { id: UnitId(2), hops: 2 },
        ]
    );
}

#[test]
fn test_two_cycle_terminates_without_duplicates() {
    let mut graph = ReferenceGraph::with_units(2);

    // A -> B -> A (mutual recursion)
    graph.add_edge(UnitId(0), UnitId(1), ReferenceKind::Call);
    graph.add_edge(UnitId(1), UnitId(0), ReferenceKind::Call);

    for depth in [1, 2, 10, usize::MAX] {
        let expanded = graph
            .expand(&[UnitId(0)], depth, ExpandDirection::Both)
            .unwrap();
        assert_eq!(ids(&expanded), vec![UnitId(0), UnitId(1)]);
    }
}

#[test]
fn test_expansion_is_monotonic_in_depth() {
    let units = parse_source(STATS_CODE, Language::Python).unwrap();
    let graph = GraphBuilder::new().build(&units).unwrap();

    let mut previous = 0;
    for depth in 0..4 {
        let expanded = graph
            .expand(&[UnitId(3)], depth, ExpandDirection::Outgoing)
            .unwrap();
        assert!(expanded.len() >= previous);
        previous = expanded.len();
    }
}

#[test]
fn test_built_graph_links_average_to_sum() {
    let units = parse_source(STATS_CODE, Language::Python).unwrap();
    let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["sum", "average", "median", "variance"]);

    let graph = GraphBuilder::new().build(&units).unwrap();
    assert_eq!(graph.callees(UnitId(1)), vec![UnitId(0)]);
    assert_eq!(graph.callees(UnitId(3)), vec![UnitId(0), UnitId(1)]);
    assert!(graph.callees(UnitId(2)).is_empty());

    let expanded = graph
        .expand(&[UnitId(1)], 1, ExpandDirection::Outgoing)
        .unwrap();
    assert_eq!(ids(&expanded), vec![UnitId(1), UnitId(0)]);

    let with_callers = graph
        .expand(&[UnitId(1)], 1, ExpandDirection::Both)
        .unwrap();
    assert_eq!(ids(&with_callers), vec![UnitId(1), UnitId(0), UnitId(3)]);
}
