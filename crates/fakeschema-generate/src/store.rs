use fakeschema_core::Value;
use indexmap::IndexMap;
use serde::Serialize;

use crate::errors::GenerationError;

/// A finalized, immutable row. Fields keep declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GeneratedRow {
    values: IndexMap<String, Value>,
}

impl GeneratedRow {
    pub(crate) fn from_values(values: IndexMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(field, value)| (field.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(field, value)| (field.clone(), value.to_json()))
                .collect(),
        )
    }
}

/// Mutable draft of a model's row during a pass.
///
/// Every declared field starts unset; `finalize` refuses to copy a draft with
/// unset fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ScratchRecord {
    values: IndexMap<String, Option<Value>>,
}

impl ScratchRecord {
    pub fn new<'a>(fields: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            values: fields
                .into_iter()
                .map(|field| (field.to_string(), None))
                .collect(),
        }
    }

    /// Value of a set field; `None` when unset or undeclared.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field).and_then(Option::as_ref)
    }

    pub fn is_declared(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Assign a declared field. Returns `false` for undeclared fields.
    pub fn set(&mut self, field: &str, value: Value) -> bool {
        match self.values.get_mut(field) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        for slot in self.values.values_mut() {
            *slot = None;
        }
    }

    pub fn unset_fields(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| field.as_str())
    }

    /// Copy the draft into an immutable row.
    pub fn finalize(&self, model: &str) -> Result<GeneratedRow, GenerationError> {
        let mut values = IndexMap::with_capacity(self.values.len());
        for (field, value) in &self.values {
            let value = value
                .clone()
                .ok_or_else(|| GenerationError::unset_field(model, field))?;
            values.insert(field.clone(), value);
        }
        Ok(GeneratedRow::from_values(values))
    }
}

/// A row visible to the resolvers: finalized, or the live draft of this pass.
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    Finalized(&'a GeneratedRow),
    Draft(&'a ScratchRecord),
}

impl<'a> Candidate<'a> {
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        match *self {
            Candidate::Finalized(row) => row.get(field),
            Candidate::Draft(record) => record.get(field),
        }
    }

    /// Like `get`, but an unset field is an engine invariant violation.
    pub fn require(&self, model: &str, field: &str) -> Result<&'a Value, GenerationError> {
        self.get(field)
            .ok_or_else(|| GenerationError::unset_field(model, field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_copies_values_in_declaration_order() {
        let mut record = ScratchRecord::new(["id", "name"]);
        assert!(record.set("name", Value::from("Ada")));
        assert!(record.set("id", Value::Int(1)));

        let row = record.finalize("Customer").unwrap();
        assert_eq!(row.fields().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(row.get("id"), Some(&Value::Int(1)));

        record.clear();
        assert!(record.get("id").is_none());
        assert_eq!(row.get("name"), Some(&Value::from("Ada")));
    }

    #[test]
    fn finalize_rejects_unset_fields() {
        let mut record = ScratchRecord::new(["id", "name"]);
        record.set("id", Value::Int(1));
        let err = record.finalize("Customer").unwrap_err();
        assert!(matches!(
            err,
            GenerationError::UnsetField { ref field, .. } if field == "name"
        ));
    }

    #[test]
    fn undeclared_fields_are_not_assigned() {
        let mut record = ScratchRecord::new(["id"]);
        assert!(!record.set("email", Value::from("x")));
        assert!(!record.is_declared("email"));
    }
}
