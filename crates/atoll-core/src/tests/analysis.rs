use super::schema_fixture;
use crate::analysis::*;
use crate::config::{AllowedParent, EntityDef, LinkDef, ParentRule};
use crate::error::ConfigError;

fn edge<'a>(from: &'a str, to: &'a str) -> DependencyEdge<'a> {
    DependencyEdge { from, to }
}

#[test]
fn topo_sort_is_deterministic_with_lexicographic_tie_break() {
    let nodes: Vec<String> = ["b", "a", "c"].iter().map(|s| s.to_string()).collect();
    let ordered = topo_sort_deterministic(&nodes, &[edge("a", "c")]).unwrap();
    assert_eq!(ordered, vec!["a", "b", "c"]);
}

#[test]
fn topo_sort_runs_twice_with_identical_output() {
    let nodes: Vec<String> = ["site", "region", "rack", "vlan"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let edges = [edge("region", "site"), edge("site", "rack")];
    let first = topo_sort_deterministic(&nodes, &edges).unwrap();
    let second = topo_sort_deterministic(&nodes, &edges).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, vec!["region", "site", "rack", "vlan"]);
}

#[test]
fn topo_sort_reports_cycle_nodes() {
    let nodes: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let cycle = topo_sort_deterministic(&nodes, &[edge("a", "b"), edge("b", "a")]).unwrap_err();
    assert_eq!(cycle, vec!["a", "b"]);
}

#[test]
fn analyze_groups_entities_by_root() {
    let schema = schema_fixture();
    let analysis = ModelAnalysis::analyze(&schema).unwrap();

    let definitions = analysis.for_root("definitions").unwrap();
    assert_eq!(definitions.ordered, vec!["tenant"]);

    let infra = analysis.for_root("infrastructure").unwrap();
    let index = |name: &str| infra.ordered.iter().position(|t| t == name).unwrap();

    // Site and rack reach the infrastructure root transitively through region.
    assert!(index("region") < index("site"));
    assert!(index("site") < index("rack"));

    // Edge-unrelated nodes appear in lexicographic order.
    assert!(index("region") < index("vlan"));
}

#[test]
fn analyze_is_deterministic() {
    let schema = schema_fixture();
    let first = ModelAnalysis::analyze(&schema).unwrap();
    let second = ModelAnalysis::analyze(&schema).unwrap();

    for category in first.categories() {
        let a = first.for_root(&category.root).unwrap();
        let b = second.for_root(&category.root).unwrap();
        assert_eq!(a.ordered, b.ordered);
        assert_eq!(a.dependencies, b.dependencies);
    }
    assert_eq!(first.global_order(), second.global_order());
}

#[test]
fn ordered_respects_every_dependency_edge() {
    let schema = schema_fixture();
    let analysis = ModelAnalysis::analyze(&schema).unwrap();

    for category in analysis.categories() {
        let a = analysis.for_root(&category.root).unwrap();
        let index = |name: &str| a.ordered.iter().position(|t| t == name).unwrap();
        for (dependent, deps) in &a.dependencies {
            for dep in deps {
                assert!(
                    index(dep) < index(dependent),
                    "{dep} must precede {dependent} in root {}",
                    category.root
                );
            }
        }
    }
}

#[test]
fn closure_walks_the_dependency_chain() {
    let schema = schema_fixture();
    let analysis = ModelAnalysis::analyze(&schema).unwrap();
    let infra = analysis.for_root("infrastructure").unwrap();

    let needed = closure(infra, ["rack"]);
    let needed: Vec<&str> = needed.iter().map(String::as_str).collect();
    assert_eq!(needed, vec!["rack", "region", "site"]);
}

#[test]
fn closure_ignores_unknown_seeds() {
    let schema = schema_fixture();
    let analysis = ModelAnalysis::analyze(&schema).unwrap();
    let infra = analysis.for_root("infrastructure").unwrap();

    let needed = closure(infra, ["rack", "does-not-exist", ""]);
    assert!(needed.contains("rack"));
    assert!(needed.contains("site"));
    assert!(needed.contains("region"));
    assert_eq!(needed.len(), 3);
}

#[test]
fn cycle_in_one_root_fails_analysis_naming_both_nodes() {
    let mut schema = schema_fixture();

    let mut a = EntityDef::default();
    a.parent = ParentRule {
        required: false,
        allowed: vec![AllowedParent {
            root: Some("infrastructure".to_string()),
            ..Default::default()
        }],
    };
    a.links.insert(
        "b".to_string(),
        LinkDef {
            entity: "b".to_string(),
            field: "b".to_string(),
            required: false,
        },
    );

    let mut b = EntityDef::default();
    b.parent = a.parent.clone();
    b.links.insert(
        "a".to_string(),
        LinkDef {
            entity: "a".to_string(),
            field: "a".to_string(),
            required: false,
        },
    );

    schema.entities.insert("a".to_string(), a);
    schema.entities.insert("b".to_string(), b);

    let err = ModelAnalysis::analyze(&schema).unwrap_err();
    match err {
        ConfigError::DependencyCycle { root, nodes } => {
            assert_eq!(root, "infrastructure");
            assert_eq!(nodes, vec!["a", "b"]);
        }
        other => panic!("expected DependencyCycle, got {other:?}"),
    }
}

#[test]
fn global_order_prefixes_sorted_roots_and_deduplicates() {
    let schema = schema_fixture();
    let analysis = ModelAnalysis::analyze(&schema).unwrap();

    // 'definitions' sorts before 'infrastructure', so tenant leads.
    assert_eq!(
        analysis.global_order(),
        ["tenant", "region", "site", "rack", "vlan"]
    );
}

#[test]
fn category_names_and_resolution() {
    let schema = schema_fixture();
    let analysis = ModelAnalysis::analyze(&schema).unwrap();

    assert_eq!(analysis.category_name("infrastructure"), "Infrastructure");
    assert_eq!(analysis.resolve_category("Infrastructure"), Some("infrastructure"));
    assert_eq!(analysis.resolve_category("  definitions "), Some("definitions"));
    assert_eq!(analysis.resolve_category("nope"), None);

    assert_eq!(title_case_category("rack_elevations"), "Rack Elevations");
}

#[test]
fn root_propagation_covers_transitive_parents() {
    let schema = schema_fixture();
    let roots = compute_entity_roots(&schema).unwrap();

    assert!(roots["site"].contains("infrastructure"));
    assert!(roots["rack"].contains("infrastructure"));
    assert!(!roots["rack"].contains("definitions"));
    assert!(roots["tenant"].contains("definitions"));
}
