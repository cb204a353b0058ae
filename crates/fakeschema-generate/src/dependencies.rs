use fakeschema_core::{
    FieldDependencies, FieldGraphReport, FieldKey, ModelDependencies,
    build_field_graph_report, field_order, independent_models,
};
use indexmap::IndexSet;
use tracing::debug;

use crate::errors::GenerationError;
use crate::registry::ModelRegistry;

/// Field- and model-level dependency maps for every registered model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    pub field_dependencies: FieldDependencies,
    pub model_dependencies: ModelDependencies,
    /// Models registered from the catalog while building.
    pub auto_registered: Vec<String>,
}

impl DependencyGraph {
    /// Analyze every registered model, pulling referenced models in from the
    /// catalog until no new model appears.
    pub fn build(registry: &mut ModelRegistry) -> Result<Self, GenerationError> {
        let mut graph = DependencyGraph::default();

        let mut index = 0;
        while let Some(descriptor) = registry.get_index(index) {
            let definition = descriptor.definition().clone();
            index += 1;

            let mut model_deps = IndexSet::new();

            for field in &definition.fields {
                let key = FieldKey::new(&definition.name, &field.name);
                let mut deps = IndexSet::new();

                if let Some(closing) = field.directive.graph_closing().map_err(|err| {
                    GenerationError::InvalidArguments(format!("{key}: {err}"))
                })? {
                    let target_name = closing.target_model().to_string();
                    if !registry.contains(&target_name) {
                        registry.resolve(&target_name)?;
                        debug!(
                            model = %target_name,
                            requested_by = %key,
                            "auto-registered referenced model"
                        );
                        graph.auto_registered.push(target_name.clone());
                    }
                    let target = registry
                        .get(&target_name)
                        .ok_or_else(|| GenerationError::UnknownModel(target_name.clone()))?;

                    for target_field in closing.target_fields() {
                        if !target.has_field(target_field) {
                            return Err(GenerationError::unknown_field(&target_name, target_field));
                        }
                        deps.insert(FieldKey::new(&target_name, target_field));
                    }
                    for source_field in closing.source_fields() {
                        if !definition.has_field(source_field) {
                            return Err(GenerationError::unknown_field(
                                &definition.name,
                                source_field,
                            ));
                        }
                        deps.insert(FieldKey::new(&definition.name, source_field));
                    }
                    if target_name != definition.name {
                        model_deps.insert(target_name);
                    }
                }

                graph.field_dependencies.insert(key, deps);
            }

            graph
                .model_dependencies
                .insert(definition.name.clone(), model_deps);
        }

        Ok(graph)
    }

    /// Topologically sorted field order with the independent-first tie-break.
    pub fn field_order(&self) -> Result<Vec<FieldKey>, GenerationError> {
        field_order(&self.field_dependencies, &self.model_dependencies).map_err(|cycle| {
            GenerationError::CyclicDependency(cycle.iter().map(ToString::to_string).collect())
        })
    }

    pub fn report(&self) -> FieldGraphReport {
        build_field_graph_report(&self.field_dependencies, &self.model_dependencies)
    }

    pub fn independent_models(&self) -> Vec<&str> {
        independent_models(&self.model_dependencies)
            .into_iter()
            .collect()
    }

    pub fn dependencies_of(&self, key: &FieldKey) -> Option<&IndexSet<FieldKey>> {
        self.field_dependencies.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fakeschema_core::{Directive, ModelCatalog, ModelDefinition};
    use serde_json::json;

    fn reference(model: &str, field: &str) -> Directive {
        Directive::with_params("reference", json!({"model": model, "field": field}))
    }

    fn catalog() -> ModelCatalog {
        ModelCatalog::new(vec![
            ModelDefinition::new("Customer").field("id", Directive::new("uuid4")),
            ModelDefinition::new("Order")
                .field("id", Directive::new("uuid4"))
                .field("customer_id", reference("Customer", "id")),
            ModelDefinition::new("Invoice").field("order_id", reference("Order", "id")),
            ModelDefinition::new("Supplier").field("id", Directive::new("uuid4")),
        ])
    }

    #[test]
    fn closes_over_referenced_models_only() {
        let mut registry = ModelRegistry::with_catalog(catalog());
        registry.resolve("Invoice").unwrap();

        let graph = DependencyGraph::build(&mut registry).unwrap();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["Invoice", "Order", "Customer"]
        );
        assert_eq!(graph.auto_registered, vec!["Order", "Customer"]);
        assert!(!registry.contains("Supplier"));

        let invoice = graph.model_dependencies.get("Invoice").unwrap();
        assert_eq!(invoice.iter().collect::<Vec<_>>(), vec!["Order"]);
        assert!(graph.model_dependencies["Customer"].is_empty());
        assert_eq!(graph.independent_models(), vec!["Customer"]);
    }

    #[test]
    fn leaf_fields_are_recorded_with_empty_sets() {
        let mut registry = ModelRegistry::with_catalog(catalog());
        registry.resolve("Customer").unwrap();
        let graph = DependencyGraph::build(&mut registry).unwrap();
        let deps = graph
            .dependencies_of(&FieldKey::new("Customer", "id"))
            .unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn unknown_target_model_fails() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelDefinition::new("Order").field("customer_id", reference("Customer", "id"))).unwrap();
        let err = DependencyGraph::build(&mut registry).unwrap_err();
        assert!(matches!(err, GenerationError::UnknownModel(name) if name == "Customer"));
    }

    #[test]
    fn unknown_target_field_fails() {
        let mut registry = ModelRegistry::with_catalog(catalog());
        registry.register(ModelDefinition::new("Refund").field("email", reference("Customer", "email"))).unwrap();
        let err = DependencyGraph::build(&mut registry).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::UnknownField { ref model, ref field } if model == "Customer" && field == "email"
        ));
    }

    #[test]
    fn source_fields_become_dependencies() {
        let mut registry = ModelRegistry::new();
        registry.register(
            ModelDefinition::new("Product")
                .field("id", Directive::new("uuid4"))
                .field("price", Directive::new("random_float")),
        ).unwrap();
        registry.register(
            ModelDefinition::new("Line")
                .field("product_id", reference("Product", "id"))
                .field(
                    "unit_price",
                    Directive::with_params(
                        "reference",
                        json!({
                            "model": "Product",
                            "field": "price",
                            "conditions": [{"field": "product_id", "value": {"value_of": "id"}}]
                        }),
                    ),
                ),
        ).unwrap();

        let graph = DependencyGraph::build(&mut registry).unwrap();
        let deps = graph
            .dependencies_of(&FieldKey::new("Line", "unit_price"))
            .unwrap();
        assert_eq!(
            deps.iter().cloned().collect::<Vec<_>>(),
            vec![
                FieldKey::new("Product", "price"),
                FieldKey::new("Product", "id"),
                FieldKey::new("Line", "product_id"),
            ]
        );
    }

    #[test]
    fn self_reference_is_cyclic() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelDefinition::new("Node").field("parent", reference("Node", "parent"))).unwrap();
        let graph = DependencyGraph::build(&mut registry).unwrap();
        assert!(graph.model_dependencies["Node"].is_empty());
        assert!(matches!(
            graph.field_order(),
            Err(GenerationError::CyclicDependency(nodes)) if nodes == vec!["Node.parent".to_string()]
        ));
    }

    #[test]
    fn mutual_references_are_cyclic() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelDefinition::new("A").field("b", reference("B", "a"))).unwrap();
        registry.register(ModelDefinition::new("B").field("a", reference("A", "b"))).unwrap();

        let graph = DependencyGraph::build(&mut registry).unwrap();
        let err = graph.field_order().unwrap_err();
        assert!(matches!(err, GenerationError::CyclicDependency(nodes) if nodes.len() == 2));
    }
}
