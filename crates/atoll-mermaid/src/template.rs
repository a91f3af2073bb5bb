//! `{{ dotted.path }}` template substitution.
//!
//! Unresolved variables substitute to the empty string, never an error, so blocks render
//! gracefully from partial attribute maps.

use serde_json::Value;

pub fn apply(template: &str, ctx: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(close) => {
                out.push_str(&resolve(ctx, after[..close].trim()));
                rest = &after[close + 2..];
            }
            None => {
                // Unterminated variable: emit the remainder verbatim.
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

fn resolve(ctx: &Value, expr: &str) -> String {
    let mut current = ctx;
    for part in expr.split('.') {
        match current.get(part.trim()) {
            Some(value) => current = value,
            None => return String::new(),
        }
    }

    match current {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Null and non-scalar values render as nothing.
        _ => String::new(),
    }
}
