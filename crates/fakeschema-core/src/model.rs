use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::operators::Operator;
use crate::value::Value;

/// Directive kind that copies a field from a row of another model.
pub const REFERENCE: &str = "reference";
/// Directive kind that aggregates fields over joined rows of another model.
pub const CALCULATE: &str = "calculate";
/// Directive kinds that read data produced for other models.
pub const GRAPH_CLOSING_KINDS: &[&str] = &[REFERENCE, CALCULATE];

/// Set of model definitions available for registration and auto-discovery.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ModelCatalog {
    /// Contract version for this catalog format.
    pub catalog_version: String,
    /// Models registered up front; everything else is pulled in on reference.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub register: Vec<String>,
    /// Model definitions keyed by their unique name.
    pub models: Vec<ModelDefinition>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelDefinition>) -> Self {
        Self {
            catalog_version: crate::CATALOG_VERSION.to_string(),
            register: Vec::new(),
            models,
        }
    }

    pub fn model(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.iter().find(|model| model.name == name)
    }

    /// Insert a definition, replacing any previous definition with the same name.
    pub fn insert(&mut self, definition: ModelDefinition) {
        match self
            .models
            .iter_mut()
            .find(|model| model.name == definition.name)
        {
            Some(existing) => *existing = definition,
            None => self.models.push(definition),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|model| model.name.as_str())
    }
}

/// A model ("entity type") and the directives for each of its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelDefinition {
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDefinition>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field; used to build definitions in code.
    pub fn field(mut self, name: impl Into<String>, directive: Directive) -> Self {
        self.fields.push(FieldDefinition {
            name: name.into(),
            directive,
        });
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }
}

/// A single declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldDefinition {
    pub name: String,
    pub directive: Directive,
}

/// Named generation instruction with keyword parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Directive {
    /// Producer id, or one of the graph-closing kinds.
    pub kind: String,
    /// Keyword parameters as a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<JsonValue>,
}

impl Directive {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: None,
        }
    }

    pub fn with_params(kind: impl Into<String>, params: JsonValue) -> Self {
        Self {
            kind: kind.into(),
            params: Some(params),
        }
    }

    pub fn is_graph_closing(&self) -> bool {
        GRAPH_CLOSING_KINDS.contains(&self.kind.as_str())
    }

    /// Parse the typed arguments of a graph-closing directive.
    ///
    /// Returns `Ok(None)` for leaf kinds, whatever their params.
    pub fn graph_closing(&self) -> Result<Option<GraphClosing>> {
        match self.kind.as_str() {
            REFERENCE => {
                let args: ReferenceArgs = self.parse_params()?;
                args.validate()?;
                Ok(Some(GraphClosing::Reference(args)))
            }
            CALCULATE => {
                let args: CalculateArgs = self.parse_params()?;
                args.validate()?;
                Ok(Some(GraphClosing::Calculate(args)))
            }
            _ => Ok(None),
        }
    }

    fn parse_params<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let params = self.params.clone().ok_or_else(|| {
            Error::InvalidArguments(format!("{} requires params", self.kind))
        })?;
        serde_json::from_value(params)
            .map_err(|err| Error::InvalidArguments(format!("{}: {}", self.kind, err)))
    }
}

/// Parsed arguments of a graph-closing directive.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphClosing {
    Reference(ReferenceArgs),
    Calculate(CalculateArgs),
}

impl GraphClosing {
    pub fn target_model(&self) -> &str {
        match self {
            GraphClosing::Reference(args) => &args.model,
            GraphClosing::Calculate(args) => &args.model,
        }
    }

    /// Fields of the target model this directive reads.
    pub fn target_fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        match self {
            GraphClosing::Reference(args) => {
                fields.push(args.field.as_str());
                for condition in &args.conditions {
                    if let Some(field) = condition.value.field() {
                        fields.push(field);
                    }
                }
            }
            GraphClosing::Calculate(args) => {
                fields.push(args.field.as_str());
                fields.extend(args.fields.iter().map(String::as_str));
            }
        }
        fields
    }

    /// Fields of the source (own) model this directive reads.
    pub fn source_fields(&self) -> Vec<&str> {
        match self {
            GraphClosing::Reference(args) => args
                .conditions
                .iter()
                .map(|condition| condition.field.as_str())
                .collect(),
            GraphClosing::Calculate(args) => args.value.field().into_iter().collect(),
        }
    }
}

/// Arguments of `reference`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ReferenceArgs {
    /// Target model name.
    pub model: String,
    /// Target field whose value is copied.
    pub field: String,
    /// All conditions must hold for a candidate row to be selected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl ReferenceArgs {
    pub fn new(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            field: field.into(),
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    fn validate(&self) -> Result<()> {
        require_name(REFERENCE, "model", &self.model)?;
        require_name(REFERENCE, "field", &self.field)?;
        for condition in &self.conditions {
            require_name(REFERENCE, "conditions.field", &condition.field)?;
        }
        Ok(())
    }
}

/// Comparison between a source field and a candidate operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    /// Field read from the source record (left side).
    pub field: String,
    #[serde(default)]
    pub op: Comparison,
    /// Right side: a candidate field or a literal.
    pub value: Operand,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: Comparison, value: Operand) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[default]
    #[serde(alias = "==")]
    Eq,
    #[serde(alias = "!=")]
    Ne,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Le,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Ge,
}

impl Comparison {
    pub fn evaluate(self, left: &Value, right: &Value) -> bool {
        use std::cmp::Ordering;

        match self {
            Comparison::Eq => left.loose_eq(right),
            Comparison::Ne => !left.loose_eq(right),
            Comparison::Lt => left.compare(right) == Some(Ordering::Less),
            Comparison::Le => matches!(
                left.compare(right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Comparison::Gt => left.compare(right) == Some(Ordering::Greater),
            Comparison::Ge => matches!(
                left.compare(right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

/// Either a field read (`{"value_of": "id"}`) or a JSON literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Operand {
    ValueOf { value_of: String },
    Literal(JsonValue),
}

impl Operand {
    pub fn value_of(field: impl Into<String>) -> Self {
        Operand::ValueOf {
            value_of: field.into(),
        }
    }

    pub fn literal(value: JsonValue) -> Self {
        Operand::Literal(value)
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Operand::ValueOf { value_of } => Some(value_of.as_str()),
            Operand::Literal(_) => None,
        }
    }
}

/// Arguments of `calculate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CalculateArgs {
    /// Target model whose rows are aggregated.
    pub model: String,
    /// Join field on the target model.
    pub field: String,
    /// Join value, usually `{"value_of": "<source field>"}`.
    pub value: Operand,
    /// Target fields combined per row by `row_op`.
    pub fields: Vec<String>,
    #[serde(default)]
    pub row_op: Operator,
    #[serde(default)]
    pub col_op: Operator,
}

impl CalculateArgs {
    fn validate(&self) -> Result<()> {
        require_name(CALCULATE, "model", &self.model)?;
        require_name(CALCULATE, "field", &self.field)?;
        if self.fields.is_empty() {
            return Err(Error::InvalidArguments(
                "calculate: at least one field is required".to_string(),
            ));
        }
        for field in &self.fields {
            require_name(CALCULATE, "fields", field)?;
        }
        if let Some(field) = self.value.field() {
            require_name(CALCULATE, "value.value_of", field)?;
        }
        Ok(())
    }
}

fn require_name(kind: &str, key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArguments(format!(
            "{kind}: '{key}' must not be empty"
        )));
    }
    Ok(())
}
