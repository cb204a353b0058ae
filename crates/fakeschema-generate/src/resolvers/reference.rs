use fakeschema_core::{ReferenceArgs, Value};
use rand::{Rng, RngCore};

use super::{operand_value, require_declared, source_value};
use crate::errors::GenerationError;
use crate::registry::ModelRegistry;

/// Copy `args.field` from a row of `args.model`.
///
/// With conditions, the first candidate satisfying all of them wins; without
/// conditions a candidate is drawn uniformly from the pool.
pub fn resolve_reference(
    registry: &mut ModelRegistry,
    source_model: &str,
    args: &ReferenceArgs,
    rng: &mut dyn RngCore,
) -> Result<Value, GenerationError> {
    let target = registry.resolve(&args.model)?;
    require_declared(target, &args.field)?;
    for condition in &args.conditions {
        if let Some(field) = condition.value.field() {
            require_declared(target, field)?;
        }
    }

    let registry = &*registry;
    let candidates = registry.candidates(&args.model)?;
    if candidates.is_empty() {
        return Err(GenerationError::NoDataAvailable(args.model.clone()));
    }

    if args.conditions.is_empty() {
        let index = rng.random_range(0..candidates.len());
        return candidates[index]
            .require(&args.model, &args.field)
            .cloned();
    }

    let source = registry.live_scratch(source_model);
    let mut left = Vec::with_capacity(args.conditions.len());
    for condition in &args.conditions {
        left.push(source_value(source, source_model, &condition.field)?);
    }

    for candidate in candidates {
        let mut matched = true;
        for (condition, left) in args.conditions.iter().zip(&left) {
            let right = operand_value(&condition.value, candidate, &args.model)?;
            if !condition.op.evaluate(left, &right) {
                matched = false;
                break;
            }
        }
        if matched {
            return candidate.require(&args.model, &args.field).cloned();
        }
    }

    Err(GenerationError::NoMatchingRow {
        model: args.model.clone(),
        requested_by: source_model.to_string(),
    })
}
