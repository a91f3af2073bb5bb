//! Theme/status style resolution against the stylesheet configuration.

use atoll_core::config::StyleSheet;
use indexmap::IndexMap;

/// Entity base style with an optional status overlay (e.g. active/planned) on top.
pub fn resolve_entity_style(
    styles: &StyleSheet,
    theme: &str,
    entity: &str,
    status: Option<&str>,
) -> IndexMap<String, String> {
    let Some(theme) = styles.theme(theme) else {
        return IndexMap::new();
    };

    let mut resolved = theme
        .entities
        .get(entity)
        .map(|e| e.style.clone())
        .unwrap_or_default();

    if let Some(status) = status {
        if let Some(overlay) = theme.statuses.get(status) {
            for (key, value) in &overlay.style {
                resolved.insert(key.clone(), value.clone());
            }
        }
    }

    resolved
}

/// Base attribute-node style merged with the entity's per-attribute overrides.
pub fn resolve_attribute_style(
    styles: &StyleSheet,
    theme: &str,
    entity: &str,
) -> IndexMap<String, String> {
    let Some(theme) = styles.theme(theme) else {
        return IndexMap::new();
    };

    let mut resolved = theme.attributes.clone();
    if let Some(entity_style) = theme.entities.get(entity) {
        for (key, value) in &entity_style.attributes {
            resolved.insert(key.clone(), value.clone());
        }
    }

    resolved
}

pub fn resolve_root_style(styles: &StyleSheet, theme: &str, root: &str) -> IndexMap<String, String> {
    styles
        .theme(theme)
        .and_then(|t| t.roots.get(root))
        .map(|r| r.style.clone())
        .unwrap_or_default()
}

/// Renders a `style <id> k:v,k:v` statement, or nothing if every value is empty.
pub fn style_line(document_id: &str, style: &IndexMap<String, String>) -> Option<String> {
    let parts: Vec<String> = style
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{key}:{value}"))
        .collect();

    if parts.is_empty() {
        return None;
    }
    Some(format!("style {document_id} {}", parts.join(",")))
}
