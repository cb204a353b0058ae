use fakeschema_core::{CalculateArgs, Operand, Value};

use super::{require_declared, source_value};
use crate::errors::GenerationError;
use crate::registry::ModelRegistry;

/// Outcome of a `calculate` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub value: Value,
    /// Candidates whose join field matched.
    pub matched: usize,
}

/// Aggregate `args.fields` over the rows of `args.model` joined on
/// `args.field`.
///
/// No matching row is not an error: the result is `Int(0)`.
pub fn resolve_calculation(
    registry: &mut ModelRegistry,
    source_model: &str,
    args: &CalculateArgs,
) -> Result<Calculation, GenerationError> {
    if args.fields.is_empty() {
        return Err(GenerationError::InvalidArguments(format!(
            "calculate on {} needs at least one field",
            args.model
        )));
    }

    let target = registry.resolve(&args.model)?;
    require_declared(target, &args.field)?;
    for field in &args.fields {
        require_declared(target, field)?;
    }

    let registry = &*registry;
    let join = match &args.value {
        Operand::ValueOf { value_of } => {
            source_value(registry.live_scratch(source_model), source_model, value_of)?.clone()
        }
        Operand::Literal(literal) => Value::from_json(literal),
    };

    let mut scalars = Vec::new();
    for candidate in registry.candidates(&args.model)? {
        let joined = candidate
            .get(&args.field)
            .is_some_and(|value| value.loose_eq(&join));
        if !joined {
            continue;
        }
        let mut values = Vec::with_capacity(args.fields.len());
        for field in &args.fields {
            values.push(candidate.require(&args.model, field)?.clone());
        }
        scalars.push(args.row_op.apply(&values)?);
    }

    let matched = scalars.len();
    let value = match scalars.len() {
        0 => Value::Int(0),
        1 => scalars.remove(0),
        _ => args.col_op.apply(&scalars)?,
    };
    Ok(Calculation { value, matched })
}
