use std::time::Instant;

use chrono::{NaiveDate, Utc};
use fakeschema_core::{
    CalculateArgs, FieldGraphReport, FieldKey, GraphClosing, ModelCatalog, ModelDefinition,
    ReferenceArgs, Value,
};
use indexmap::IndexMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::dependencies::DependencyGraph;
use crate::errors::GenerationError;
use crate::generators::sequence::SequenceProvider;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};
use crate::model::{GenerateOptions, GenerationReport, ModelReport};
use crate::registry::ModelRegistry;
use crate::resolvers::{resolve_calculation, resolve_reference};
use crate::store::GeneratedRow;

/// How one field is produced, decided when the plan is built.
#[derive(Debug, Clone)]
enum FieldAction {
    Leaf {
        kind: String,
        params: Option<JsonValue>,
    },
    Reference(ReferenceArgs),
    Calculate(CalculateArgs),
}

#[derive(Debug, Clone)]
struct PlanStep {
    key: FieldKey,
    action: FieldAction,
}

/// Dependency graph and field order for one registry revision.
#[derive(Debug, Clone)]
struct GenerationPlan {
    revision: u64,
    graph: DependencyGraph,
    order: Vec<FieldKey>,
    steps: Vec<PlanStep>,
}

/// Pass-based generator over a set of registered models.
///
/// Each pass appends exactly one row to every registered model that has at
/// least one field. The plan (graph + order) is built on first use and rebuilt
/// whenever a new model is registered.
#[derive(Debug)]
pub struct GenerationEngine {
    options: GenerateOptions,
    registry: ModelRegistry,
    generators: GeneratorRegistry,
    sequences: SequenceProvider,
    plan: Option<GenerationPlan>,
    rng: ChaCha8Rng,
    report: GenerationReport,
    today: NaiveDate,
    passes_started: u64,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self::with_registry(options, ModelRegistry::new())
    }

    /// Engine that can resolve unregistered models from `catalog`.
    pub fn with_catalog(options: GenerateOptions, catalog: ModelCatalog) -> Self {
        Self::with_registry(options, ModelRegistry::with_catalog(catalog))
    }

    /// Engine over `catalog` with its `register` list already registered.
    pub fn from_catalog(
        options: GenerateOptions,
        catalog: ModelCatalog,
    ) -> Result<Self, GenerationError> {
        let names = catalog.register.clone();
        let mut engine = Self::with_catalog(options, catalog);
        for name in &names {
            engine.register_model(name)?;
        }
        Ok(engine)
    }

    fn with_registry(options: GenerateOptions, registry: ModelRegistry) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let today = options.today.unwrap_or_else(|| Utc::now().date_naive());
        Self {
            rng: ChaCha8Rng::seed_from_u64(options.seed),
            report: GenerationReport::new(run_id, options.seed),
            options,
            registry,
            generators: GeneratorRegistry::new(),
            sequences: SequenceProvider::new(),
            plan: None,
            today,
            passes_started: 0,
        }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    /// Register a model definition; `false` if the name was already known.
    pub fn register(&mut self, definition: ModelDefinition) -> Result<bool, GenerationError> {
        self.registry.register(definition)
    }

    /// Register a model by name from the catalog.
    pub fn register_model(&mut self, name: &str) -> Result<(), GenerationError> {
        self.registry.resolve(name).map(|_| ())
    }

    /// Add or replace a leaf producer.
    pub fn register_generator(&mut self, generator: Box<dyn Generator>) {
        self.generators.register_generator(generator);
    }

    /// Restart a sequential number namespace at 1.
    pub fn reset_sequence(&mut self, namespace: &str) {
        self.sequences.reset(namespace);
    }

    /// Append fixture rows to a registered model.
    pub fn ingest_rows(
        &mut self,
        model: &str,
        rows: Vec<IndexMap<String, Value>>,
    ) -> Result<usize, GenerationError> {
        let count = self.registry.ingest(model, rows)?;
        debug!(model = %model, rows = count, "ingested rows");
        Ok(count)
    }

    /// Build the plan if it is missing or stale.
    ///
    /// Building may register models from the catalog. A cyclic graph leaves no
    /// plan behind, so the next call reports the cycle again.
    pub fn prepare(&mut self) -> Result<(), GenerationError> {
        if self
            .plan
            .as_ref()
            .is_some_and(|plan| plan.revision == self.registry.revision())
        {
            return Ok(());
        }

        let graph = DependencyGraph::build(&mut self.registry)?;
        for model in &graph.auto_registered {
            self.report.record_auto_registration(model);
        }
        let order = graph.field_order()?;

        let mut steps = Vec::with_capacity(order.len());
        for key in &order {
            let directive = self
                .registry
                .get(&key.model)
                .and_then(|descriptor| descriptor.directive(&key.field))
                .ok_or_else(|| GenerationError::unknown_field(&key.model, &key.field))?;
            let action = match directive.graph_closing()? {
                Some(GraphClosing::Reference(args)) => FieldAction::Reference(args),
                Some(GraphClosing::Calculate(args)) => FieldAction::Calculate(args),
                None => FieldAction::Leaf {
                    kind: directive.kind.clone(),
                    params: directive.params.clone(),
                },
            };
            steps.push(PlanStep {
                key: key.clone(),
                action,
            });
        }

        info!(
            models = self.registry.len(),
            fields = order.len(),
            auto_registered = graph.auto_registered.len(),
            independent = graph.independent_models().len(),
            "generation plan built"
        );

        self.plan = Some(GenerationPlan {
            revision: self.registry.revision(),
            graph,
            order,
            steps,
        });
        Ok(())
    }

    /// Run one pass: one new row for every registered model with fields.
    ///
    /// A failed pass leaves previously finalized rows untouched.
    pub fn generate_pass(&mut self) -> Result<(), GenerationError> {
        self.prepare()?;
        let Some(plan) = self.plan.take() else {
            return Ok(());
        };

        let start = Instant::now();
        let pass_index = self.passes_started;
        self.passes_started += 1;

        let outcome = self.run_steps(&plan.steps, pass_index);
        self.plan = Some(plan);

        match outcome {
            Ok(rows) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                self.report.record_pass(duration_ms);
                info!(pass = pass_index, rows, duration_ms, "pass completed");
                Ok(())
            }
            Err(err) => {
                self.registry.abandon_pass();
                self.report.record_failed_pass();
                warn!(pass = pass_index, error = %err, "pass failed");
                Err(err)
            }
        }
    }

    /// Run `passes` passes, stopping at the first failure.
    pub fn generate(&mut self, passes: u32) -> Result<(), GenerationError> {
        for _ in 0..passes {
            self.generate_pass()?;
        }
        Ok(())
    }

    /// Run the number of passes set in the options.
    pub fn run(&mut self) -> Result<(), GenerationError> {
        self.generate(self.options.passes)
    }

    fn run_steps(&mut self, steps: &[PlanStep], pass_index: u64) -> Result<usize, GenerationError> {
        self.registry.begin_pass();
        for step in steps {
            let FieldKey { model, field } = &step.key;
            self.registry.touch(model)?;
            let value = self.resolve_step(step, pass_index)?;
            self.registry.assign(model, field, value)?;
        }
        self.registry.finalize_pass()
    }

    fn resolve_step(&mut self, step: &PlanStep, pass_index: u64) -> Result<Value, GenerationError> {
        let FieldKey { model, field } = &step.key;
        match &step.action {
            FieldAction::Reference(args) => {
                let value = resolve_reference(&mut self.registry, model, args, &mut self.rng)?;
                self.report.record_reference();
                Ok(value)
            }
            FieldAction::Calculate(args) => {
                let calculation = resolve_calculation(&mut self.registry, model, args)?;
                self.report.record_calculation(calculation.matched == 0);
                Ok(calculation.value)
            }
            FieldAction::Leaf { kind, params } => {
                let generator = self.generators.generator(kind).ok_or_else(|| {
                    GenerationError::UnknownDirective {
                        kind: kind.clone(),
                        model: model.clone(),
                        field: field.clone(),
                    }
                })?;
                let mut ctx = GeneratorContext {
                    model,
                    field,
                    pass_index,
                    today: self.today,
                    sequences: &mut self.sequences,
                };
                let value = generator.generate(&mut ctx, params.as_ref(), &mut self.rng)?;
                self.report.record_generator_usage(generator.id());
                for tag in generator.pii_tags() {
                    self.report.record_pii(tag);
                }
                Ok(value)
            }
        }
    }

    /// Finalized rows of a model; `None` when it was never registered.
    pub fn rows(&self, model: &str) -> Option<&[GeneratedRow]> {
        self.registry.rows(model)
    }

    /// Cached dependency graph, if a plan was built.
    pub fn dependency_graph(&self) -> Option<&DependencyGraph> {
        self.plan.as_ref().map(|plan| &plan.graph)
    }

    /// Cached field order, if a plan was built.
    pub fn field_order(&self) -> Option<&[FieldKey]> {
        self.plan.as_ref().map(|plan| plan.order.as_slice())
    }

    /// Graph summary plus either the field order or the cycle.
    ///
    /// Unlike [`Self::prepare`], a cyclic graph is reported rather than an error.
    pub fn graph_report(&mut self) -> Result<FieldGraphReport, GenerationError> {
        let revision = self.registry.revision();
        if let Some(plan) = self.plan.as_ref().filter(|plan| plan.revision == revision) {
            return Ok(plan.graph.report());
        }
        let graph = DependencyGraph::build(&mut self.registry)?;
        Ok(graph.report())
    }

    /// Run report with per-model row counts filled in.
    pub fn report(&self) -> GenerationReport {
        let mut report = self.report.clone();
        report.models = self
            .registry
            .descriptors()
            .map(|descriptor| ModelReport {
                model: descriptor.name().to_string(),
                fields: descriptor.field_count(),
                rows: self
                    .registry
                    .rows(descriptor.name())
                    .map_or(0, |rows| rows.len() as u64),
            })
            .collect();
        report
    }
}
