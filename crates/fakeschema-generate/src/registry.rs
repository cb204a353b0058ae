use std::collections::HashSet;

use fakeschema_core::{Directive, ModelCatalog, ModelDefinition, Value};
use indexmap::IndexMap;
use tracing::debug;

use crate::errors::GenerationError;
use crate::store::{Candidate, GeneratedRow, ScratchRecord};

/// A registered model. The definition is fixed once registered.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    definition: ModelDefinition,
}

impl ModelDescriptor {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.definition.field_names()
    }

    pub fn field_count(&self) -> usize {
        self.definition.fields.len()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.definition.has_field(field)
    }

    pub fn directive(&self, field: &str) -> Option<&Directive> {
        self.definition
            .get_field(field)
            .map(|definition| &definition.directive)
    }
}

/// Finalized rows plus the scratch record of one model.
#[derive(Debug, Default)]
struct ModelStore {
    rows: Vec<GeneratedRow>,
    scratch: Option<ScratchRecord>,
    live: bool,
}

#[derive(Debug)]
struct ModelEntry {
    descriptor: ModelDescriptor,
    store: ModelStore,
}

/// Registered models and their data, in registration order.
///
/// Unregistered names are resolved through the catalog handle only; there is
/// no other lookup.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    catalog: Option<ModelCatalog>,
    models: IndexMap<String, ModelEntry>,
    revision: u64,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: ModelCatalog) -> Self {
        Self {
            catalog: Some(catalog),
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> Option<&ModelCatalog> {
        self.catalog.as_ref()
    }

    /// Bumped whenever a model is added.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Register a model. Re-registering a known name is a no-op returning `false`.
    ///
    /// A definition that declares the same field twice is rejected.
    pub fn register(&mut self, definition: ModelDefinition) -> Result<bool, GenerationError> {
        if self.models.contains_key(&definition.name) {
            return Ok(false);
        }
        let mut seen = HashSet::with_capacity(definition.fields.len());
        if let Some(duplicate) = definition.field_names().find(|field| !seen.insert(*field)) {
            return Err(GenerationError::InvalidCatalog(format!(
                "duplicate field name: {}.{duplicate}",
                definition.name
            )));
        }
        let name = definition.name.clone();
        self.models.insert(
            name,
            ModelEntry {
                descriptor: ModelDescriptor { definition },
                store: ModelStore::default(),
            },
        );
        self.revision += 1;
        Ok(true)
    }

    /// Return a registered model, registering it from the catalog if needed.
    pub fn resolve(&mut self, name: &str) -> Result<&ModelDescriptor, GenerationError> {
        if !self.models.contains_key(name) {
            let definition = self
                .catalog
                .as_ref()
                .and_then(|catalog| catalog.model(name))
                .cloned()
                .ok_or_else(|| GenerationError::UnknownModel(name.to_string()))?;
            debug!(model = %name, "registering model from catalog");
            self.register(definition)?;
        }
        self.get(name)
            .ok_or_else(|| GenerationError::UnknownModel(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.get(name).map(|entry| &entry.descriptor)
    }

    pub(crate) fn get_index(&self, index: usize) -> Option<&ModelDescriptor> {
        self.models.get_index(index).map(|(_, entry)| &entry.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.values().map(|entry| &entry.descriptor)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Finalized rows; `None` when the model was never registered.
    pub fn rows(&self, name: &str) -> Option<&[GeneratedRow]> {
        self.models.get(name).map(|entry| entry.store.rows.as_slice())
    }

    /// The model's scratch record if it is live in the current pass.
    pub fn live_scratch(&self, name: &str) -> Option<&ScratchRecord> {
        let entry = self.models.get(name)?;
        if entry.store.live {
            entry.store.scratch.as_ref()
        } else {
            None
        }
    }

    /// Finalized rows followed by the live scratch record.
    pub fn candidates(&self, name: &str) -> Result<Vec<Candidate<'_>>, GenerationError> {
        let entry = self
            .models
            .get(name)
            .ok_or_else(|| GenerationError::UnknownModel(name.to_string()))?;
        let mut candidates: Vec<Candidate<'_>> =
            entry.store.rows.iter().map(Candidate::Finalized).collect();
        if entry.store.live {
            if let Some(scratch) = &entry.store.scratch {
                candidates.push(Candidate::Draft(scratch));
            }
        }
        Ok(candidates)
    }

    /// Append externally supplied rows to a model's finalized store.
    ///
    /// Every declared field must be present; unknown keys are rejected.
    pub fn ingest(
        &mut self,
        name: &str,
        rows: Vec<IndexMap<String, Value>>,
    ) -> Result<usize, GenerationError> {
        let entry = self
            .models
            .get_mut(name)
            .ok_or_else(|| GenerationError::UnknownModel(name.to_string()))?;

        let mut prepared = Vec::with_capacity(rows.len());
        for mut row in rows {
            if let Some(unknown) = row
                .keys()
                .find(|field| !entry.descriptor.has_field(field.as_str()))
            {
                return Err(GenerationError::unknown_field(name, unknown));
            }
            let mut values = IndexMap::with_capacity(entry.descriptor.field_count());
            for field in entry.descriptor.field_names() {
                let value = row.shift_remove(field).ok_or_else(|| {
                    GenerationError::InvalidArguments(format!(
                        "ingested row for {name} is missing field {field}"
                    ))
                })?;
                values.insert(field.to_string(), value);
            }
            prepared.push(GeneratedRow::from_values(values));
        }

        let count = prepared.len();
        entry.store.rows.extend(prepared);
        Ok(count)
    }

    /// Mark every scratch record stale; the next touch clears it.
    pub(crate) fn begin_pass(&mut self) {
        for entry in self.models.values_mut() {
            entry.store.live = false;
        }
    }

    /// Make the model's scratch record live for this pass, creating or
    /// clearing it as needed.
    pub(crate) fn touch(&mut self, name: &str) -> Result<(), GenerationError> {
        let entry = self
            .models
            .get_mut(name)
            .ok_or_else(|| GenerationError::UnknownModel(name.to_string()))?;
        if entry.store.live {
            return Ok(());
        }
        match entry.store.scratch.as_mut() {
            Some(scratch) => scratch.clear(),
            None => {
                entry.store.scratch = Some(ScratchRecord::new(entry.descriptor.field_names()));
            }
        }
        entry.store.live = true;
        Ok(())
    }

    pub(crate) fn assign(
        &mut self,
        name: &str,
        field: &str,
        value: Value,
    ) -> Result<(), GenerationError> {
        let scratch = self
            .models
            .get_mut(name)
            .filter(|entry| entry.store.live)
            .and_then(|entry| entry.store.scratch.as_mut())
            .ok_or_else(|| GenerationError::unset_field(name, field))?;
        if scratch.set(field, value) {
            Ok(())
        } else {
            Err(GenerationError::unknown_field(name, field))
        }
    }

    /// Copy every live scratch record into its store and clear it.
    ///
    /// Returns the number of rows appended.
    pub(crate) fn finalize_pass(&mut self) -> Result<usize, GenerationError> {
        let mut finalized = Vec::new();
        for (name, entry) in &self.models {
            if !entry.store.live {
                continue;
            }
            if let Some(scratch) = &entry.store.scratch {
                finalized.push((name.clone(), scratch.finalize(name)?));
            }
        }

        let count = finalized.len();
        for (name, row) in finalized {
            if let Some(entry) = self.models.get_mut(&name) {
                entry.store.rows.push(row);
                if let Some(scratch) = entry.store.scratch.as_mut() {
                    scratch.clear();
                }
                entry.store.live = false;
            }
        }
        Ok(count)
    }

    /// Drop the drafts of a pass that failed; finalized rows are untouched.
    pub(crate) fn abandon_pass(&mut self) {
        for entry in self.models.values_mut() {
            if let Some(scratch) = entry.store.scratch.as_mut() {
                scratch.clear();
            }
            entry.store.live = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> ModelDefinition {
        ModelDefinition::new("Customer")
            .field("id", Directive::new("uuid4"))
            .field("name", Directive::new("name"))
    }

    #[test]
    fn register_is_idempotent() {
        let mut registry = ModelRegistry::new();
        assert!(registry.register(customer()).unwrap());
        let revision = registry.revision();
        assert!(!registry.register(customer()).unwrap());
        assert_eq!(registry.revision(), revision);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Customer"]);
        assert_eq!(registry.rows("Customer"), Some(&[][..]));
        assert!(registry.rows("Order").is_none());
    }

    #[test]
    fn resolve_uses_the_catalog_handle_only() {
        let mut registry = ModelRegistry::with_catalog(ModelCatalog::new(vec![customer()]));
        assert_eq!(registry.resolve("Customer").unwrap().name(), "Customer");
        assert!(registry.contains("Customer"));

        let err = registry.resolve("Invoice").unwrap_err();
        assert!(matches!(err, GenerationError::UnknownModel(name) if name == "Invoice"));
        assert!(!registry.contains("Invoice"));
    }

    #[test]
    fn register_rejects_duplicate_fields() {
        let mut registry = ModelRegistry::new();
        let definition = ModelDefinition::new("Counter")
            .field("x", Directive::with_params("constant", serde_json::json!({"value": 1})))
            .field("x", Directive::with_params("constant", serde_json::json!({"value": 2})));

        let err = registry.register(definition).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidCatalog(message) if message.contains("Counter.x")));
        assert!(!registry.contains("Counter"));
        assert_eq!(registry.revision(), 0);
    }

    #[test]
    fn live_scratch_joins_the_candidate_pool() {
        let mut registry = ModelRegistry::new();
        registry.register(customer()).unwrap();
        assert!(registry.candidates("Customer").unwrap().is_empty());

        registry.begin_pass();
        registry.touch("Customer").unwrap();
        registry.assign("Customer", "id", Value::Int(7)).unwrap();
        let candidates = registry.candidates("Customer").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].get("id"), Some(&Value::Int(7)));
        assert!(candidates[0].get("name").is_none());

        registry.assign("Customer", "name", Value::from("Ada")).unwrap();
        assert_eq!(registry.finalize_pass().unwrap(), 1);
        assert_eq!(registry.rows("Customer").unwrap().len(), 1);
        assert!(registry.live_scratch("Customer").is_none());
    }

    #[test]
    fn ingest_checks_declared_fields() {
        let mut registry = ModelRegistry::new();
        registry.register(customer()).unwrap();

        let mut row = IndexMap::new();
        row.insert("name".to_string(), Value::from("Ada"));
        row.insert("id".to_string(), Value::Int(1));
        assert_eq!(registry.ingest("Customer", vec![row]).unwrap(), 1);
        let stored = &registry.rows("Customer").unwrap()[0];
        assert_eq!(stored.fields().collect::<Vec<_>>(), vec!["id", "name"]);

        let mut partial = IndexMap::new();
        partial.insert("id".to_string(), Value::Int(2));
        assert!(matches!(
            registry.ingest("Customer", vec![partial]),
            Err(GenerationError::InvalidArguments(_))
        ));

        let mut unknown = IndexMap::new();
        unknown.insert("email".to_string(), Value::from("a@b.c"));
        assert!(matches!(
            registry.ingest("Customer", vec![unknown]),
            Err(GenerationError::UnknownField { .. })
        ));
    }
}
