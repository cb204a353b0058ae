//! Pass-based relational data generator for fakeschema.
//!
//! Models are registered from definitions or resolved from a catalog; the
//! engine derives a field dependency graph, orders it, and produces one
//! consistent row per model on every pass.

pub mod dependencies;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod model;
pub mod output;
pub mod params;
pub mod registry;
pub mod resolvers;
pub mod store;

pub use dependencies::DependencyGraph;
pub use engine::GenerationEngine;
pub use errors::GenerationError;
pub use generators::sequence::SequenceProvider;
pub use generators::{Generator, GeneratorContext, GeneratorRegistry};
pub use model::{GenerateOptions, GenerationReport, ModelReport};
pub use registry::{ModelDescriptor, ModelRegistry};
pub use store::{Candidate, GeneratedRow, ScratchRecord};
