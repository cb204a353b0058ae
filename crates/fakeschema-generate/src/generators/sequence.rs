use std::collections::BTreeMap;

use fakeschema_core::Value;
use rand::RngCore;
use serde_json::Value as JsonValue;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};
use crate::params::{ParamKind, ParamSpec, validate_params};

pub const DEFAULT_NAMESPACE: &str = "default";

const SEQUENCE_PARAMS: &[ParamSpec] = &[ParamSpec::new("namespace", ParamKind::String, false)];

/// Namespaced counters. Each namespace yields 1, 2, 3, ... until reset.
#[derive(Debug, Clone, Default)]
pub struct SequenceProvider {
    counters: BTreeMap<String, i64>,
}

impl SequenceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, namespace: &str) -> i64 {
        let counter = self.counters.entry(namespace.to_string()).or_insert(0);
        *counter = counter.saturating_add(1);
        *counter
    }

    /// Last value handed out, if any.
    pub fn current(&self, namespace: &str) -> Option<i64> {
        self.counters.get(namespace).copied()
    }

    /// Forget a namespace; its next value is 1 again.
    pub fn reset(&mut self, namespace: &str) {
        self.counters.remove(namespace);
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }
}

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(SequentialNumberGenerator));
}

struct SequentialNumberGenerator;

impl Generator for SequentialNumberGenerator {
    fn id(&self) -> &'static str {
        "sequential_number"
    }

    fn generate(
        &self,
        ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        _rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let params = validate_params(params, SEQUENCE_PARAMS, self.id())?;
        let namespace = params.get_str("namespace").unwrap_or(DEFAULT_NAMESPACE);
        Ok(Value::Int(ctx.sequences.next(namespace)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_count_independently() {
        let mut sequences = SequenceProvider::new();
        assert_eq!(sequences.next("customer"), 1);
        assert_eq!(sequences.next("customer"), 2);
        assert_eq!(sequences.next("order"), 1);
        assert_eq!(sequences.current("customer"), Some(2));
        assert_eq!(sequences.current("payment"), None);
    }

    #[test]
    fn reset_restarts_at_one() {
        let mut sequences = SequenceProvider::new();
        sequences.next(DEFAULT_NAMESPACE);
        sequences.next(DEFAULT_NAMESPACE);
        sequences.reset(DEFAULT_NAMESPACE);
        assert_eq!(sequences.next(DEFAULT_NAMESPACE), 1);

        sequences.reset("never-used");
        sequences.reset_all();
        assert_eq!(sequences.current(DEFAULT_NAMESPACE), None);
    }
}
