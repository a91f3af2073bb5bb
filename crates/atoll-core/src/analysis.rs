//! Model graph analysis: per-root dependency orderings and reachability closures.
//!
//! Analysis is a pure function of the entity schema. It runs once at startup into an
//! immutable [`ModelAnalysis`]; concurrent readers share it without locking. If hot-reload
//! is ever needed, swap the whole structure atomically instead of mutating it in place.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::config::EntitySchema;
use crate::error::{ConfigError, ConfigResult};

/// Dependency analysis for one root scope.
#[derive(Debug, Clone)]
pub struct CategoryAnalysis {
    pub root: String,
    /// All entity types reachable from this root, sorted.
    pub nodes: Vec<String>,
    /// Deterministic topological order (dependencies first).
    pub ordered: Vec<String>,
    /// dependent -> sorted list of direct dependencies (subset of `nodes`).
    pub dependencies: BTreeMap<String, Vec<String>>,
}

/// A root scope with its display name (title-cased root key).
#[derive(Debug, Clone)]
pub struct Category {
    pub root: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

#[derive(Debug)]
pub struct ModelAnalysis {
    by_root: BTreeMap<String, CategoryAnalysis>,
    categories: Vec<Category>,
    global_order: Vec<String>,
}

impl ModelAnalysis {
    /// Analyzes the schema once. Any malformed schema (divergent root propagation, dependency
    /// cycle) is a fatal configuration error.
    pub fn analyze(schema: &EntitySchema) -> ConfigResult<Self> {
        let roots_by_entity = compute_entity_roots(schema)?;

        let mut by_root: BTreeMap<String, CategoryAnalysis> = BTreeMap::new();
        let mut root_keys: Vec<&String> = schema.roots.keys().collect();
        root_keys.sort();

        for root in root_keys {
            let nodes: BTreeSet<String> = schema
                .entities
                .keys()
                .filter(|entity| {
                    roots_by_entity
                        .get(entity.as_str())
                        .is_some_and(|roots| roots.contains(root))
                })
                .cloned()
                .collect();

            let edges = dependency_edges(schema, &nodes);
            let node_list: Vec<String> = nodes.iter().cloned().collect();

            let ordered = match topo_sort_deterministic(&node_list, &edges) {
                Ok(ordered) => ordered,
                Err(cycle_nodes) => {
                    return Err(ConfigError::DependencyCycle {
                        root: root.clone(),
                        nodes: cycle_nodes,
                    });
                }
            };

            let mut dependencies: BTreeMap<String, Vec<String>> = node_list
                .iter()
                .map(|n| (n.clone(), Vec::new()))
                .collect();
            for edge in &edges {
                if let Some(deps) = dependencies.get_mut(edge.to) {
                    deps.push(edge.from.to_string());
                }
            }
            for deps in dependencies.values_mut() {
                deps.sort();
                deps.dedup();
            }

            by_root.insert(
                root.clone(),
                CategoryAnalysis {
                    root: root.clone(),
                    nodes: node_list,
                    ordered,
                    dependencies,
                },
            );
        }

        let categories: Vec<Category> = by_root
            .keys()
            .map(|root| Category {
                root: root.clone(),
                name: title_case_category(root),
            })
            .collect();

        // Deterministic global order: sorted root keys, first occurrence of a type wins.
        let mut global_order: Vec<String> = Vec::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for analysis in by_root.values() {
            for ty in &analysis.ordered {
                if seen.insert(ty.as_str()) {
                    global_order.push(ty.clone());
                }
            }
        }

        let summary = categories
            .iter()
            .map(|c| format!("{}={}", c.name, by_root[&c.root].ordered.len()))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(categories = categories.len(), %summary, "model analysis ready");

        Ok(Self {
            by_root,
            categories,
            global_order,
        })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    pub fn category_name(&self, root: &str) -> String {
        self.categories
            .iter()
            .find(|c| c.root == root)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| title_case_category(root))
    }

    /// Converts category input (display name or raw root key, any case) to a root key.
    pub fn resolve_category(&self, category: &str) -> Option<&str> {
        let norm = normalize_category_input(category);
        self.categories
            .iter()
            .find(|c| {
                norm == normalize_category_input(&c.name) || norm == normalize_category_input(&c.root)
            })
            .map(|c| c.root.as_str())
    }

    pub fn for_root(&self, root: &str) -> Option<&CategoryAnalysis> {
        self.by_root.get(root)
    }

    pub fn ordered_for_root(&self, root: &str) -> Option<&[String]> {
        self.by_root.get(root).map(|a| a.ordered.as_slice())
    }

    /// All entity types, dependencies first, deduplicated across roots.
    pub fn global_order(&self) -> &[String] {
        &self.global_order
    }

    /// Union of per-root closures for the seed types.
    pub fn needed_global<'a, I>(&self, seeds: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        let mut needed = BTreeSet::new();
        for analysis in self.by_root.values() {
            needed.extend(closure(analysis, seeds.clone()));
        }
        needed
    }
}

/// Formats a root key for display, e.g. `rack_elevations` -> `Rack Elevations`.
pub fn title_case_category(root: &str) -> String {
    root.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_category_input(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Computes, for every entity type, the set of roots it can ultimately attach to: direct
/// root attachments from the allowed-parent list, propagated transitively through
/// parent-entity links until fixpoint. The pass count is bounded; exceeding it means the
/// schema is malformed.
pub fn compute_entity_roots(
    schema: &EntitySchema,
) -> ConfigResult<FxHashMap<String, BTreeSet<String>>> {
    let mut roots_by_entity: FxHashMap<String, BTreeSet<String>> = FxHashMap::default();

    for (entity, def) in &schema.entities {
        let direct: BTreeSet<String> = def
            .parent
            .allowed
            .iter()
            .filter_map(|a| a.root.clone())
            .collect();
        roots_by_entity.insert(entity.clone(), direct);
    }

    let max_passes = schema.entities.len() + 5;
    let mut passes = 0usize;
    let mut changed = true;

    while changed {
        if passes > max_passes {
            return Err(ConfigError::RootPropagationDiverged { passes: max_passes });
        }
        passes += 1;
        changed = false;

        for (entity, def) in &schema.entities {
            for allowed in &def.parent.allowed {
                let Some(parent) = allowed.entity.as_deref() else {
                    continue;
                };
                let Some(parent_roots) = roots_by_entity.get(parent).cloned() else {
                    continue;
                };
                let Some(child_roots) = roots_by_entity.get_mut(entity.as_str()) else {
                    continue;
                };
                let before = child_roots.len();
                child_roots.extend(parent_roots);
                if child_roots.len() != before {
                    changed = true;
                }
            }
        }
    }

    Ok(roots_by_entity)
}

/// Dependency edges restricted to `nodes`: parent-entity edges (parent -> child) and link
/// edges (target -> linker). Self-edges dropped, duplicates collapsed, output sorted.
pub fn dependency_edges<'a>(
    schema: &'a EntitySchema,
    nodes: &BTreeSet<String>,
) -> Vec<DependencyEdge<'a>> {
    let mut edges: Vec<DependencyEdge<'a>> = Vec::new();

    for (entity, def) in &schema.entities {
        if !nodes.contains(entity.as_str()) {
            continue;
        }

        for allowed in &def.parent.allowed {
            let Some(parent) = allowed.entity.as_deref() else {
                continue;
            };
            if parent == entity || !nodes.contains(parent) {
                continue;
            }
            edges.push(DependencyEdge {
                from: parent,
                to: entity,
            });
        }

        for link in def.links.values() {
            let target = link.entity.as_str();
            if target.is_empty() || target == entity || !nodes.contains(target) {
                continue;
            }
            edges.push(DependencyEdge {
                from: target,
                to: entity,
            });
        }
    }

    edges.sort_by(|a, b| a.from.cmp(b.from).then(a.to.cmp(b.to)));
    edges.dedup();
    edges
}

/// Kahn's algorithm with a lexicographic tie-break: the smallest zero-indegree node is
/// always emitted next, and newly freed nodes are inserted into a sorted ready list, so the
/// output is a pure function of node names and edges. `Err` carries the nodes stuck in a
/// cycle.
pub fn topo_sort_deterministic(
    nodes: &[String],
    edges: &[DependencyEdge<'_>],
) -> Result<Vec<String>, Vec<String>> {
    let node_set: BTreeSet<&str> = nodes.iter().map(String::as_str).collect();

    let mut indegree: FxHashMap<&str, usize> = nodes.iter().map(|n| (n.as_str(), 0)).collect();
    let mut outgoing: FxHashMap<&str, BTreeSet<&str>> =
        nodes.iter().map(|n| (n.as_str(), BTreeSet::new())).collect();

    for edge in edges {
        if !node_set.contains(edge.from) || !node_set.contains(edge.to) {
            continue;
        }
        let out = outgoing.entry(edge.from).or_default();
        if !out.insert(edge.to) {
            continue;
        }
        *indegree.entry(edge.to).or_default() += 1;
    }

    let mut ready: Vec<&str> = nodes
        .iter()
        .map(String::as_str)
        .filter(|n| indegree.get(n).copied().unwrap_or(0) == 0)
        .collect();
    ready.sort();

    let mut ordered: Vec<String> = Vec::with_capacity(nodes.len());
    while !ready.is_empty() {
        let node = ready.remove(0);
        ordered.push(node.to_string());

        let Some(outs) = outgoing.get(node) else {
            continue;
        };
        // BTreeSet iteration is already sorted.
        for next in outs {
            let Some(deg) = indegree.get_mut(next) else {
                continue;
            };
            *deg -= 1;
            if *deg == 0 {
                let idx = ready.partition_point(|r| *r < *next);
                ready.insert(idx, next);
            }
        }
    }

    if ordered.len() != nodes.len() {
        let mut cycle_nodes: Vec<String> = nodes
            .iter()
            .filter(|n| indegree.get(n.as_str()).copied().unwrap_or(0) > 0)
            .cloned()
            .collect();
        cycle_nodes.sort();
        return Err(cycle_nodes);
    }

    Ok(ordered)
}

/// Reverse reachability: the seed types plus everything their dependency lists pull in,
/// to fixpoint. Unknown seeds are ignored.
pub fn closure<'a, I>(analysis: &CategoryAnalysis, seeds: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut needed: BTreeSet<String> = BTreeSet::new();
    let mut stack: Vec<&str> = Vec::new();

    for seed in seeds {
        if seed.is_empty() || !analysis.dependencies.contains_key(seed) {
            continue;
        }
        if needed.insert(seed.to_string()) {
            stack.push(seed);
        }
    }

    while let Some(current) = stack.pop() {
        let Some(deps) = analysis.dependencies.get(current) else {
            continue;
        };
        for dep in deps {
            if needed.insert(dep.clone()) {
                stack.push(dep);
            }
        }
    }

    needed
}
