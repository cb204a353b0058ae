use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Seed for the engine RNG; same seed and catalog give the same rows.
    pub seed: u64,
    /// Passes run by [`crate::GenerationEngine::run`].
    pub passes: u32,
    /// Anchor date for `*_this_year` style producers. Defaults to today (UTC).
    pub today: Option<NaiveDate>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            passes: 1,
            today: None,
        }
    }
}

/// Row count for one model at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReport {
    pub model: String,
    pub fields: usize,
    pub rows: u64,
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub passes_completed: u64,
    pub passes_failed: u64,
    pub models: Vec<ModelReport>,
    pub auto_registered: Vec<String>,
    pub generator_usage: BTreeMap<String, u64>,
    pub pii_fields_touched: BTreeMap<String, u64>,
    pub reference_lookups: u64,
    pub calculations: u64,
    pub empty_calculations: u64,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64) -> Self {
        Self {
            run_id,
            seed,
            passes_completed: 0,
            passes_failed: 0,
            models: Vec::new(),
            auto_registered: Vec::new(),
            generator_usage: BTreeMap::new(),
            pii_fields_touched: BTreeMap::new(),
            reference_lookups: 0,
            calculations: 0,
            empty_calculations: 0,
            duration_ms: 0,
        }
    }

    pub fn record_generator_usage(&mut self, id: &str) {
        *self.generator_usage.entry(id.to_string()).or_insert(0) += 1;
    }

    pub fn record_pii(&mut self, tag: &str) {
        *self.pii_fields_touched.entry(tag.to_string()).or_insert(0) += 1;
    }

    pub fn record_reference(&mut self) {
        self.reference_lookups += 1;
    }

    pub fn record_calculation(&mut self, empty: bool) {
        self.calculations += 1;
        if empty {
            self.empty_calculations += 1;
        }
    }

    pub fn record_auto_registration(&mut self, model: &str) {
        if !self.auto_registered.iter().any(|name| name == model) {
            self.auto_registered.push(model.to_string());
        }
    }

    pub fn record_pass(&mut self, duration_ms: u64) {
        self.passes_completed += 1;
        self.duration_ms = self.duration_ms.saturating_add(duration_ms);
    }

    pub fn record_failed_pass(&mut self) {
        self.passes_failed += 1;
    }
}
