//! Resolvers for the graph-closing directive kinds.
//!
//! Both read the candidate pool of a target model: its finalized rows followed
//! by the live scratch record of the running pass.

mod calculate;
mod reference;

pub use calculate::{Calculation, resolve_calculation};
pub use reference::resolve_reference;

use fakeschema_core::{Operand, Value};

use crate::errors::GenerationError;
use crate::registry::ModelDescriptor;
use crate::store::{Candidate, ScratchRecord};

fn require_declared(descriptor: &ModelDescriptor, field: &str) -> Result<(), GenerationError> {
    if descriptor.has_field(field) {
        Ok(())
    } else {
        Err(GenerationError::unknown_field(descriptor.name(), field))
    }
}

/// Read a source field from the model's live draft.
fn source_value<'a>(
    source: Option<&'a ScratchRecord>,
    model: &str,
    field: &str,
) -> Result<&'a Value, GenerationError> {
    source
        .and_then(|record| record.get(field))
        .ok_or_else(|| GenerationError::unset_field(model, field))
}

/// Evaluate an operand against a candidate row (`value_of`) or as a literal.
fn operand_value(
    operand: &Operand,
    candidate: Candidate<'_>,
    model: &str,
) -> Result<Value, GenerationError> {
    match operand {
        Operand::ValueOf { value_of } => candidate.require(model, value_of).cloned(),
        Operand::Literal(literal) => Ok(Value::from_json(literal)),
    }
}
