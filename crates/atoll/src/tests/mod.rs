
use std::sync::Arc;

use crate::store::MemoryStore;
use crate::{Diagram, Engine};
use atoll_core::config::LoadedConfig;

pub(crate) const MODEL: &str = r#"
version: 1
roots:
  definitions:
    description: Reusable definitions
  infrastructure:
    description: Physical infrastructure
entities:
  tenant:
    parent:
      allowed:
        - root: definitions
    attributes:
      name: { required: true }
      slug: { required: true }
  region:
    parent:
      allowed:
        - entity: region
          field: parent
        - root: infrastructure
    attributes:
      name: { required: true }
      slug: { required: true }
  site:
    parent:
      required: true
      allowed:
        - entity: region
          field: region
    links:
      tenant: { entity: tenant, field: tenant }
    attributes:
      name: { required: true }
      slug: { required: true }
      status:
        values: [active, planned, retired]
        labels: [Active, Planned, Retired]
  rack:
    parent:
      allowed:
        - entity: site
          field: site
    attributes:
      name: { required: true }
      units:
        type: integer
        minimum: 1
        maximum: 100
"#;

pub(crate) const MAPPING: &str = r#"
version: 1
globals:
  indentation: "  "
  line_separator: "\n"
roots:
  definitions:
    id: definitions
    label: Definitions
  infrastructure:
    id: infrastructure
    label: Infrastructure
    connections: true
entities:
  tenant:
    kind: structural
    id: "tenant_{{ object.id }}"
    label: "{{ object.name }}"
  region:
    kind: structural
    id: "region_{{ object.id }}"
    label: "{{ object.name }}"
  site:
    kind: structural
    id: "site_{{ object.id }}"
    label: "{{ object.name }}"
  rack:
    kind: structural
    id: "rack_{{ object.id }}"
    label: "{{ object.name }}"
attribute_node:
  id: "attr_{{ object.document_id }}"
  template: '{{ id }}@{ shape: comment, label: "{{ label }}" }'
"#;

pub(crate) const STYLES: &str = r##"
version: 1
frontmatter:
  title: "{{ diagram.name }}"
  config:
    theme: neutral
themes:
  light:
    roots:
      infrastructure:
        style: { fill: "#f8fafc" }
    entities:
      site:
        style: { fill: "#e2e8f0" }
    statuses:
      planned:
        style: { stroke-dasharray: "4 2" }
"##;

/// Engine over a shared in-memory store (the store doubles as both contracts).
pub(crate) fn engine_fixture() -> (Arc<MemoryStore>, Engine) {
    let store = Arc::new(MemoryStore::new());
    let config = LoadedConfig::from_yaml(MODEL, MAPPING, STYLES).unwrap();
    let engine = Engine::new(config, store.clone(), store.clone()).unwrap();
    (store, engine)
}

pub(crate) fn diagram_fixture(engine: &Engine) -> Diagram {
    engine.create_diagram_sync("Test Topology", "light").unwrap()
}
