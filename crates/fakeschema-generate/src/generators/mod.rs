use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use fakeschema_core::{GRAPH_CLOSING_KINDS, Value};
use rand::RngCore;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::errors::GenerationError;

pub mod primitives;
pub mod semantic;
pub mod sequence;

use sequence::SequenceProvider;

/// Where a leaf value is being produced.
pub struct GeneratorContext<'a> {
    pub model: &'a str,
    pub field: &'a str,
    /// Zero-based index of the running pass.
    pub pass_index: u64,
    /// Anchor date for relative date producers.
    pub today: NaiveDate,
    pub sequences: &'a mut SequenceProvider,
}

/// Leaf value producer looked up by directive kind.
pub trait Generator: Send + Sync {
    fn id(&self) -> &'static str;

    fn pii_tags(&self) -> &'static [&'static str] {
        &[]
    }

    fn generate(
        &self,
        ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError>;
}

/// Directive kind -> producer table.
pub struct GeneratorRegistry {
    generators: BTreeMap<&'static str, Box<dyn Generator>>,
}

impl GeneratorRegistry {
    /// Registry with every built-in producer.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        primitives::register(&mut registry);
        semantic::register(&mut registry);
        sequence::register(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            generators: BTreeMap::new(),
        }
    }

    /// Add or replace a producer. Graph-closing kinds are reserved and ignored.
    pub fn register_generator(&mut self, generator: Box<dyn Generator>) {
        let id = generator.id();
        if GRAPH_CLOSING_KINDS.contains(&id) {
            warn!(generator_id = id, "ignoring producer for reserved directive kind");
            return;
        }
        self.generators.insert(id, generator);
    }

    pub fn generator(&self, id: &str) -> Option<&dyn Generator> {
        self.generators.get(id).map(|generator| generator.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.generators.contains_key(id)
    }

    pub fn generator_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.generators.keys().copied()
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl Generator for Fixed {
        fn id(&self) -> &'static str {
            "reference"
        }

        fn generate(
            &self,
            _ctx: &mut GeneratorContext<'_>,
            _params: Option<&JsonValue>,
            _rng: &mut dyn RngCore,
        ) -> Result<Value, GenerationError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = GeneratorRegistry::new();
        for id in ["sequential_number", "random_int", "first_name", "product_name"] {
            assert!(registry.contains(id), "missing {id}");
        }
        assert!(!registry.contains("reference"));
        assert!(!registry.contains("calculate"));
    }

    #[test]
    fn graph_closing_kinds_cannot_be_registered() {
        let mut registry = GeneratorRegistry::empty();
        registry.register_generator(Box::new(Fixed));
        assert!(registry.generator("reference").is_none());
        assert_eq!(registry.generator_ids().count(), 0);
    }
}
