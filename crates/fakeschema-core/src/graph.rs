use std::collections::VecDeque;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A `(model, field)` node of the field graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldKey {
    pub model: String,
    pub field: String,
}

impl FieldKey {
    pub fn new(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.model, self.field)
    }
}

/// Field -> fields it reads, in discovery order.
pub type FieldDependencies = IndexMap<FieldKey, IndexSet<FieldKey>>;
/// Model -> other models it reads, in registration order.
pub type ModelDependencies = IndexMap<String, IndexSet<String>>;

/// Summary of field graph structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldGraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub models: usize,
    pub independent_models: Vec<String>,
}

/// Report for field dependency ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldGraphReport {
    pub summary: FieldGraphSummary,
    pub topo_order: Option<Vec<String>>,
    pub cycle: Option<Vec<String>>,
}

/// Build a deterministic dependency report, applying the tie-break to the order.
pub fn build_field_graph_report(
    fields: &FieldDependencies,
    models: &ModelDependencies,
) -> FieldGraphReport {
    let summary = FieldGraphSummary {
        nodes: collect_nodes(fields).len(),
        edges: fields.values().map(IndexSet::len).sum(),
        models: models.len(),
        independent_models: independent_models(models)
            .into_iter()
            .map(str::to_string)
            .collect(),
    };

    match field_order(fields, models) {
        Ok(order) => FieldGraphReport {
            summary,
            topo_order: Some(order.iter().map(ToString::to_string).collect()),
            cycle: None,
        },
        Err(cycle) => FieldGraphReport {
            summary,
            topo_order: None,
            cycle: Some(cycle.iter().map(ToString::to_string).collect()),
        },
    }
}

/// Topological order followed by the independent-first tie-break.
///
/// On a cycle, returns the nodes that could not be ordered.
pub fn field_order(
    fields: &FieldDependencies,
    models: &ModelDependencies,
) -> Result<Vec<FieldKey>, Vec<FieldKey>> {
    let base = toposort(fields)?;
    Ok(prioritize_independent(base, fields, models))
}

/// Kahn's algorithm; zero in-degree ties are broken by discovery order.
pub fn toposort(fields: &FieldDependencies) -> Result<Vec<FieldKey>, Vec<FieldKey>> {
    let nodes = collect_nodes(fields);

    let mut dependents: IndexMap<&FieldKey, Vec<&FieldKey>> = IndexMap::new();
    let mut indegree: IndexMap<&FieldKey, usize> = IndexMap::new();
    for node in &nodes {
        let count = fields.get(*node).map(IndexSet::len).unwrap_or(0);
        indegree.insert(*node, count);
    }
    for (node, dependencies) in fields {
        for dependency in dependencies {
            dependents.entry(dependency).or_default().push(node);
        }
    }

    let mut ready: VecDeque<&FieldKey> = nodes
        .iter()
        .copied()
        .filter(|node| indegree.get(*node).copied() == Some(0))
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(node) = ready.pop_front() {
        order.push(node.clone());
        let Some(targets) = dependents.get(node) else {
            continue;
        };
        for target in targets {
            if let Some(count) = indegree.get_mut(*target) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.push_back(*target);
                }
            }
        }
    }

    if order.len() == nodes.len() {
        Ok(order)
    } else {
        let cycle_nodes = indegree
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(node, _)| node.clone())
            .collect();
        Err(cycle_nodes)
    }
}

/// Reorder a topological order: fields of independent models first, then
/// fields with no dependencies of their own, then everything else.
///
/// Relative order inside the first and last groups is kept, so every field
/// still follows its dependencies.
pub fn prioritize_independent(
    order: Vec<FieldKey>,
    fields: &FieldDependencies,
    models: &ModelDependencies,
) -> Vec<FieldKey> {
    let independent = independent_models(models);

    let (mut prioritized, rest): (Vec<FieldKey>, Vec<FieldKey>) = order
        .into_iter()
        .partition(|key| independent.contains(key.model.as_str()));

    let mut placed: IndexSet<FieldKey> = prioritized.iter().cloned().collect();
    for (key, dependencies) in fields {
        if dependencies.is_empty() && !placed.contains(key) && rest.contains(key) {
            placed.insert(key.clone());
            prioritized.push(key.clone());
        }
    }

    prioritized.extend(rest.into_iter().filter(|key| !placed.contains(key)));
    prioritized
}

/// Models whose dependency set is empty, in map order.
pub fn independent_models(models: &ModelDependencies) -> IndexSet<&str> {
    models
        .iter()
        .filter(|(_, dependencies)| dependencies.is_empty())
        .map(|(model, _)| model.as_str())
        .collect()
}

fn collect_nodes(fields: &FieldDependencies) -> IndexSet<&FieldKey> {
    let mut nodes: IndexSet<&FieldKey> = fields.keys().collect();
    for dependencies in fields.values() {
        nodes.extend(dependencies.iter());
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(model: &str, field: &str) -> FieldKey {
        FieldKey::new(model, field)
    }

    fn graph(edges: &[(FieldKey, &[FieldKey])]) -> FieldDependencies {
        edges
            .iter()
            .map(|(node, deps)| (node.clone(), deps.iter().cloned().collect()))
            .collect()
    }

    fn model_deps(fields: &FieldDependencies) -> ModelDependencies {
        let mut models = ModelDependencies::new();
        for (node, deps) in fields {
            let entry = models.entry(node.model.clone()).or_default();
            for dep in deps {
                if dep.model != node.model {
                    entry.insert(dep.model.clone());
                }
            }
        }
        models
    }

    fn assert_respects_dependencies(order: &[FieldKey], fields: &FieldDependencies) {
        for (node, deps) in fields {
            let node_idx = order.iter().position(|item| item == node).unwrap();
            for dep in deps {
                let dep_idx = order.iter().position(|item| item == dep).unwrap();
                assert!(dep_idx < node_idx, "{dep} must precede {node}");
            }
        }
    }

    #[test]
    fn toposort_keeps_discovery_order_for_ties() {
        let fields = graph(&[
            (key("A", "x"), &[]),
            (key("A", "y"), &[]),
            (key("B", "z"), &[]),
        ]);
        let order = toposort(&fields).unwrap();
        assert_eq!(order, vec![key("A", "x"), key("A", "y"), key("B", "z")]);
    }

    #[test]
    fn toposort_orders_dependencies() {
        let fields = graph(&[
            (key("Order", "total"), &[key("Line", "order_id"), key("Line", "price")]),
            (key("Line", "order_id"), &[key("Order", "id")]),
            (key("Line", "price"), &[]),
            (key("Order", "id"), &[]),
        ]);
        let order = toposort(&fields).unwrap();
        assert_respects_dependencies(&order, &fields);
        assert_eq!(order.last(), Some(&key("Order", "total")));
    }

    #[test]
    fn toposort_reports_cycle() {
        let fields = graph(&[
            (key("A", "b_ref"), &[key("B", "a_ref")]),
            (key("B", "a_ref"), &[key("A", "b_ref")]),
            (key("C", "id"), &[]),
        ]);
        let cycle = toposort(&fields).unwrap_err();
        assert_eq!(cycle, vec![key("A", "b_ref"), key("B", "a_ref")]);

        let report = build_field_graph_report(&fields, &model_deps(&fields));
        assert!(report.topo_order.is_none());
        assert!(report.cycle.unwrap().contains(&"A.b_ref".to_string()));
    }

    #[test]
    fn dependencies_missing_from_the_map_are_nodes() {
        let fields = graph(&[(key("A", "ref"), &[key("B", "id")])]);
        let order = toposort(&fields).unwrap();
        assert_eq!(order, vec![key("B", "id"), key("A", "ref")]);
    }

    #[test]
    fn tie_break_moves_independent_models_first() {
        let fields = graph(&[
            (key("Line", "id"), &[]),
            (key("Line", "price"), &[key("Product", "price")]),
            (key("Product", "price"), &[]),
            (key("Product", "value"), &[key("Product", "price")]),
            (key("Line", "note"), &[]),
        ]);
        let models = model_deps(&fields);
        let order = field_order(&fields, &models).unwrap();

        assert_eq!(
            order,
            vec![
                key("Product", "price"),
                key("Product", "value"),
                key("Line", "id"),
                key("Line", "note"),
                key("Line", "price"),
            ]
        );
        assert_respects_dependencies(&order, &fields);
    }

    #[test]
    fn tie_break_respects_dependencies_on_layered_graphs() {
        // Deterministic pseudo-random DAGs: node i may only depend on nodes < i.
        let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        for _ in 0..50 {
            let node_count = (next() % 12 + 2) as usize;
            let nodes: Vec<FieldKey> = (0..node_count)
                .map(|idx| key(&format!("M{}", next() % 4), &format!("f{idx}")))
                .collect();
            let mut fields = FieldDependencies::new();
            for (idx, node) in nodes.iter().enumerate().rev() {
                let mut deps = IndexSet::new();
                for candidate in nodes.iter().take(idx) {
                    if next() % 3 == 0 {
                        deps.insert(candidate.clone());
                    }
                }
                fields.insert(node.clone(), deps);
            }

            let models = model_deps(&fields);
            let order = field_order(&fields, &models).unwrap();
            assert_eq!(order.len(), fields.len());
            assert_respects_dependencies(&order, &fields);
        }
    }

    #[test]
    fn report_counts_nodes_and_edges() {
        let fields = graph(&[
            (key("A", "id"), &[]),
            (key("B", "a_id"), &[key("A", "id")]),
        ]);
        let report = build_field_graph_report(&fields, &model_deps(&fields));
        assert_eq!(report.summary.nodes, 2);
        assert_eq!(report.summary.edges, 1);
        assert_eq!(report.summary.independent_models, vec!["A".to_string()]);
        assert_eq!(
            report.topo_order.unwrap(),
            vec!["A.id".to_string(), "B.a_id".to_string()]
        );
    }
}
