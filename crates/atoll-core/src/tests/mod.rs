mod analysis;

use crate::config::EntitySchema;

/// Schema used across the test modules: a definitions root with a standalone `tenant`, an
/// infrastructure chain `region -> site -> rack`, an independent `vlan` for tie-breaking,
/// and a `site -> tenant` link that crosses roots.
pub(crate) fn schema_fixture() -> EntitySchema {
    let yaml = r#"
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
  region:
    parent:
      allowed:
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
  vlan:
    parent:
      allowed:
        - root: infrastructure
    attributes:
      name: { required: true }
      vid:
        type: integer
        pattern: "^[1-9][0-9]*$"
"#;
    serde_yaml::from_str(yaml).unwrap()
}
