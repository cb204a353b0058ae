//! Core contracts and helpers for fakeschema.
//!
//! This crate defines the model catalog, directive arguments, row values,
//! aggregation operators and the field dependency graph shared by the
//! generator and the CLI.

pub mod error;
pub mod graph;
pub mod model;
pub mod operators;
pub mod validation;
pub mod value;

pub use error::{Error, Result};
pub use graph::{
    FieldDependencies, FieldGraphReport, FieldGraphSummary, FieldKey, ModelDependencies,
    build_field_graph_report, field_order, independent_models, prioritize_independent, toposort,
};
pub use model::{
    CALCULATE, CalculateArgs, Comparison, Condition, Directive, FieldDefinition,
    GRAPH_CLOSING_KINDS, GraphClosing, ModelCatalog, ModelDefinition, Operand, REFERENCE,
    ReferenceArgs,
};
pub use operators::Operator;
pub use validation::{catalog_json_schema, validate_catalog, validate_catalog_json};
pub use value::Value;

/// Current contract version for catalog documents.
pub const CATALOG_VERSION: &str = "0.1";
