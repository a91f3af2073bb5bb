use crate::template::apply;
use serde_json::json;

#[test]
fn substitutes_dotted_paths() {
    let ctx = json!({ "object": { "id": "ab12", "name": "DC East" } });
    assert_eq!(apply("site_{{ object.id }}", &ctx), "site_ab12");
    assert_eq!(apply("{{ object.name }} ({{ object.id }})", &ctx), "DC East (ab12)");
}

#[test]
fn unresolved_variables_render_empty() {
    let ctx = json!({ "object": { "id": "ab12" } });
    assert_eq!(apply("label: {{ object.name }}", &ctx), "label: ");
    assert_eq!(apply("{{ nothing.at.all }}", &ctx), "");
}

#[test]
fn null_and_non_scalar_values_render_empty() {
    let ctx = json!({ "object": { "tags": ["a", "b"], "meta": {}, "gone": null } });
    assert_eq!(apply("{{ object.tags }}{{ object.meta }}{{ object.gone }}", &ctx), "");
}

#[test]
fn numbers_and_booleans_render_plainly() {
    let ctx = json!({ "object": { "units": 42, "active": true } });
    assert_eq!(apply("{{ object.units }}/{{ object.active }}", &ctx), "42/true");
}

#[test]
fn tolerates_whitespace_inside_braces() {
    let ctx = json!({ "object": { "id": "x" } });
    assert_eq!(apply("{{object.id}} {{   object.id   }}", &ctx), "x x");
}

#[test]
fn unterminated_variable_is_left_verbatim() {
    let ctx = json!({ "object": { "id": "x" } });
    assert_eq!(apply("before {{ object.id", &ctx), "before {{ object.id");
}
