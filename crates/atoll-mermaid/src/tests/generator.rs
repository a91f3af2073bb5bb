use super::config_fixture;
use crate::anchors::{insert_before_marker, remove_anchored_block};
use crate::generator::{CONNECTIONS_ID, DocumentGenerator};
use atoll_core::domain::{DomainObject, ParentRef};
use serde_json::json;

fn object(id: &str, entity: &str, attributes: serde_json::Value) -> DomainObject {
    DomainObject {
        id: id.to_string(),
        entity: entity.to_string(),
        parent: ParentRef::root("infrastructure"),
        attributes: attributes.as_object().unwrap().clone(),
    }
}

fn generator() -> DocumentGenerator {
    DocumentGenerator::new(config_fixture())
}

#[test]
fn document_id_depends_only_on_entity_and_object_id() {
    let generator = generator();

    let with_attrs = generator
        .render_entity_block("site", &object("ab12", "site", json!({ "name": "DC East" })))
        .unwrap();
    let without_attrs = generator
        .render_entity_block("site", &object("ab12", "site", json!({})))
        .unwrap();

    assert_eq!(with_attrs.document_id, "site_ab12");
    assert_eq!(with_attrs.document_id, without_attrs.document_id);
    assert_eq!(
        generator.resolve_document_id("site", "ab12").unwrap(),
        "site_ab12"
    );
}

#[test]
fn structural_block_carries_anchor_pair_and_one_insertion_marker() {
    let generator = generator();
    let rendered = generator
        .render_entity_block(
            "site",
            &object("ab12", "site", json!({ "name": "DC East", "status": "planned" })),
        )
        .unwrap();

    let block = &rendered.block;
    assert!(block.starts_with("%% BEGIN site_ab12\n"));
    assert!(block.ends_with("%% END site_ab12"));
    assert!(block.contains("subgraph site_ab12[DC East]"));
    assert_eq!(block.matches("%% INSERT site_ab12").count(), 1);
}

#[test]
fn structural_block_renders_attribute_summary_in_model_order() {
    let generator = generator();
    let rendered = generator
        .render_entity_block(
            "site",
            &object("ab12", "site", json!({ "status": "active", "name": "DC East" })),
        )
        .unwrap();

    // Model declaration order is name, status; the object's own key order does not matter.
    assert!(rendered.block.contains("attr_site_ab12"));
    let name_idx = rendered.block.find("name: DC East").unwrap();
    let status_idx = rendered.block.find("status: active").unwrap();
    assert!(name_idx < status_idx);
}

#[test]
fn absent_attributes_are_left_out_of_the_summary() {
    let generator = generator();
    let rendered = generator
        .render_entity_block("site", &object("ab12", "site", json!({ "name": "DC East" })))
        .unwrap();

    assert!(!rendered.block.contains("status:"));
}

#[test]
fn block_without_attributes_skips_the_summary_node() {
    let generator = generator();
    let rendered = generator
        .render_entity_block("site", &object("ab12", "site", json!({})))
        .unwrap();

    assert!(!rendered.block.contains("attr_site_ab12"));
    // Unresolved label variables degrade to an empty label, never an error.
    assert!(rendered.block.contains("subgraph site_ab12[]"));
}

#[test]
fn style_lines_live_inside_the_anchored_region() {
    let generator = generator();
    let rendered = generator
        .render_entity_block(
            "site",
            &object("ab12", "site", json!({ "name": "DC East", "status": "planned" })),
        )
        .unwrap();

    let style_idx = rendered.block.find("style site_ab12").unwrap();
    let end_idx = rendered.block.find("%% END site_ab12").unwrap();
    assert!(style_idx < end_idx);

    // Status overlay merges over the entity base style.
    assert!(rendered.block.contains("fill:#e2e8f0"));
    assert!(rendered.block.contains("stroke-dasharray:4 2"));
}

#[test]
fn leaf_blocks_render_a_single_node() {
    let generator = generator();
    let rendered = generator
        .render_entity_block("sensor", &object("cc1", "sensor", json!({ "name": "Temp \"A\"" })))
        .unwrap();

    assert_eq!(rendered.document_id, "sensor_cc1");
    assert!(rendered.block.contains(r#"sensor_cc1["Temp \"A\""]"#));
    assert!(!rendered.block.contains("%% INSERT sensor_cc1"));
    assert!(!rendered.block.contains("subgraph"));
}

#[test]
fn parent_document_id_resolves_roots_and_entities() {
    let generator = generator();

    assert_eq!(
        generator
            .parent_document_id(&ParentRef::root("infrastructure"))
            .unwrap(),
        "infrastructure"
    );
    assert_eq!(
        generator
            .parent_document_id(&ParentRef::entity("region", "r9"))
            .unwrap(),
        "region_r9"
    );
    assert!(generator.parent_document_id(&ParentRef::root("attic")).is_err());
}

#[test]
fn initial_document_contains_frontmatter_roots_and_connections() {
    let generator = generator();
    let doc = generator.initial_document("Main Topology", "light").unwrap();

    assert!(doc.starts_with("---\n"));
    assert!(doc.contains("title: Main Topology"));
    assert!(doc.contains("theme: neutral"));
    assert!(doc.contains("themeVariables:"));
    assert!(doc.contains("    fontSize: 14px"));
    assert!(doc.contains("flowchart TB"));

    for id in ["definitions", "infrastructure", CONNECTIONS_ID] {
        assert!(doc.contains(&format!("%% BEGIN {id}")), "missing begin for {id}");
        assert!(doc.contains(&format!("%% END {id}")), "missing end for {id}");
        assert!(doc.contains(&format!("%% INSERT {id}")), "missing marker for {id}");
    }

    // Only the infrastructure root hosts the connections region.
    let connections_idx = doc.find("%% BEGIN connections").unwrap();
    let infra_idx = doc.find("subgraph infrastructure[").unwrap();
    assert!(infra_idx < connections_idx);

    // Root style line comes from the stylesheet.
    assert!(doc.contains("style infrastructure fill:#f8fafc,stroke:#64748b"));
}

#[test]
fn blocks_round_trip_through_a_generated_document() {
    let generator = generator();
    let doc = generator.initial_document("Main Topology", "light").unwrap();

    let region = generator
        .render_entity_block("region", &object("r1", "region", json!({ "name": "EMEA" })))
        .unwrap();
    let inserted = insert_before_marker(&doc, "infrastructure", &region.block).unwrap();
    let restored = remove_anchored_block(&inserted, &region.document_id).unwrap();

    assert_eq!(restored, doc);
}
