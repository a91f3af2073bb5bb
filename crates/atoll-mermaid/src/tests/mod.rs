mod generator;
mod template;

use std::sync::Arc;

use atoll_core::config::LoadedConfig;

const MODEL: &str = r#"
version: 1
roots:
  definitions: {}
  infrastructure: {}
entities:
  tenant:
    parent:
      allowed:
        - root: definitions
    attributes:
      name: { required: true }
  region:
    parent:
      allowed:
        - root: infrastructure
    attributes:
      name: { required: true }
      slug: { required: true }
  site:
    parent:
      allowed:
        - entity: region
          field: region
    attributes:
      name: { required: true }
      status:
        values: [active, planned]
  sensor:
    parent:
      allowed:
        - entity: site
          field: site
    attributes:
      name: { required: true }
"#;

const MAPPING: &str = r#"
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
  sensor:
    kind: leaf
    id: "sensor_{{ object.id }}"
    label: "{{ object.name }}"
attribute_node:
  id: "attr_{{ object.document_id }}"
  template: '{{ id }}@{ shape: comment, label: "{{ label }}" }'
"#;

const STYLES: &str = r##"
version: 1
frontmatter:
  title: "{{ diagram.name }}"
  config:
    theme: neutral
    look: classic
    theme_variables:
      fontSize: 14px
themes:
  light:
    roots:
      infrastructure:
        style: { fill: "#f8fafc", stroke: "#64748b" }
    entities:
      site:
        style: { fill: "#e2e8f0" }
        attributes: { stroke: "#a16207" }
    statuses:
      planned:
        style: { stroke-dasharray: "4 2" }
    attributes:
      fill: "#fffbeb"
"##;

pub(crate) fn config_fixture() -> Arc<LoadedConfig> {
    Arc::new(LoadedConfig::from_yaml(MODEL, MAPPING, STYLES).unwrap())
}
