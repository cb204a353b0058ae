use std::collections::{BTreeMap, BTreeSet};

use jsonschema::JSONSchema;
use schemars::schema_for;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::model::{GraphClosing, ModelCatalog};

/// JSON Schema for catalog documents.
pub fn catalog_json_schema() -> Result<JsonValue> {
    let schema = schema_for!(ModelCatalog);
    serde_json::to_value(&schema).map_err(|err| Error::Other(err.to_string()))
}

/// Validate a catalog document against the catalog JSON Schema.
pub fn validate_catalog_json(catalog_json: &JsonValue) -> Result<()> {
    let schema = catalog_json_schema()?;
    let compiled = JSONSchema::compile(&schema).map_err(|err| Error::Other(err.to_string()))?;

    if let Err(errors) = compiled.validate(catalog_json) {
        let issues: Vec<String> = errors
            .map(|error| {
                let path = error.instance_path.to_string();
                let path = if path.is_empty() { "/".to_string() } else { path };
                format!("{path}: {error}")
            })
            .collect();
        return Err(Error::InvalidCatalog(issues.join("; ")));
    }

    Ok(())
}

/// Validate internal consistency of a catalog.
///
/// This checks:
/// - duplicate models/fields and empty names
/// - graph-closing directives parse and point at declared fields
/// - `register` only names known models
pub fn validate_catalog(catalog: &ModelCatalog) -> Result<()> {
    if catalog.catalog_version != crate::CATALOG_VERSION {
        return Err(Error::InvalidCatalog(format!(
            "unsupported catalog_version '{}' (expected {})",
            catalog.catalog_version,
            crate::CATALOG_VERSION
        )));
    }

    let mut declared: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for model in &catalog.models {
        if model.name.trim().is_empty() {
            return Err(Error::InvalidCatalog("model name must not be empty".into()));
        }
        if declared.contains_key(model.name.as_str()) {
            return Err(Error::InvalidCatalog(format!(
                "duplicate model name: {}",
                model.name
            )));
        }

        let mut fields = BTreeSet::new();
        for field in &model.fields {
            if field.name.trim().is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "empty field name in model {}",
                    model.name
                )));
            }
            if !fields.insert(field.name.as_str()) {
                return Err(Error::InvalidCatalog(format!(
                    "duplicate field name: {}.{}",
                    model.name, field.name
                )));
            }
            if field.directive.kind.trim().is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "empty directive kind: {}.{}",
                    model.name, field.name
                )));
            }
        }
        declared.insert(model.name.as_str(), fields);
    }

    for name in &catalog.register {
        if !declared.contains_key(name.as_str()) {
            return Err(Error::InvalidCatalog(format!(
                "register names unknown model: {name}"
            )));
        }
    }

    for model in &catalog.models {
        let own = declared.get(model.name.as_str());
        for field in &model.fields {
            let Some(closing) = field.directive.graph_closing().map_err(|err| {
                Error::InvalidCatalog(format!("{}.{}: {err}", model.name, field.name))
            })?
            else {
                continue;
            };

            let target_model = closing.target_model();
            let target = declared.get(target_model).ok_or_else(|| {
                Error::InvalidCatalog(format!(
                    "{}.{} references unknown model {}",
                    model.name, field.name, target_model
                ))
            })?;
            for target_field in closing.target_fields() {
                if !target.contains(target_field) {
                    return Err(Error::InvalidCatalog(format!(
                        "{}.{} references unknown field {}.{}",
                        model.name, field.name, target_model, target_field
                    )));
                }
            }
            for source_field in closing.source_fields() {
                if !own.is_some_and(|fields| fields.contains(source_field)) {
                    return Err(Error::InvalidCatalog(format!(
                        "{}.{} reads unknown field {}.{}",
                        model.name, field.name, model.name, source_field
                    )));
                }
            }
            if let GraphClosing::Reference(args) = &closing {
                if args.model == model.name && args.field == field.name {
                    return Err(Error::InvalidCatalog(format!(
                        "{}.{} references itself",
                        model.name, field.name
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Directive, ModelDefinition};
    use serde_json::json;

    fn catalog(models: Vec<ModelDefinition>) -> ModelCatalog {
        ModelCatalog::new(models)
    }

    fn customer() -> ModelDefinition {
        ModelDefinition::new("Customer")
            .field("id", Directive::new("uuid4"))
            .field("name", Directive::new("name"))
    }

    #[test]
    fn accepts_consistent_catalog() {
        let order = ModelDefinition::new("Order").field(
            "customer_id",
            Directive::with_params("reference", json!({"model": "Customer", "field": "id"})),
        );
        validate_catalog(&catalog(vec![customer(), order])).unwrap();
    }

    #[test]
    fn rejects_duplicate_fields() {
        let model = ModelDefinition::new("Customer")
            .field("id", Directive::new("uuid4"))
            .field("id", Directive::new("uuid4"));
        let err = validate_catalog(&catalog(vec![model])).unwrap_err();
        assert!(err.to_string().contains("duplicate field name"));
    }

    #[test]
    fn rejects_unknown_reference_targets() {
        let order = ModelDefinition::new("Order").field(
            "customer_id",
            Directive::with_params("reference", json!({"model": "Customer", "field": "email"})),
        );
        let err = validate_catalog(&catalog(vec![customer(), order])).unwrap_err();
        assert!(err.to_string().contains("unknown field Customer.email"));
    }

    #[test]
    fn rejects_unknown_register_entries() {
        let mut catalog = catalog(vec![customer()]);
        catalog.register.push("Invoice".to_string());
        assert!(matches!(
            validate_catalog(&catalog),
            Err(Error::InvalidCatalog(_))
        ));
    }

    #[test]
    fn json_schema_rejects_missing_models() {
        let err = validate_catalog_json(&json!({"catalog_version": "0.1"})).unwrap_err();
        assert!(matches!(err, Error::InvalidCatalog(_)));

        validate_catalog_json(&json!({"catalog_version": "0.1", "models": []})).unwrap();
    }
}
