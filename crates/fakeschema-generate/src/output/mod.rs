pub mod csv;

use std::path::{Path, PathBuf};

use serde_json::{Map, Value as JsonValue};

use crate::errors::GenerationError;
use crate::registry::ModelRegistry;

/// All finalized rows as `{ "<Model>": [ {field: value, ...}, ... ] }`,
/// models in registration order.
pub fn rows_json(registry: &ModelRegistry) -> JsonValue {
    let mut models = Map::new();
    for descriptor in registry.descriptors() {
        let rows = registry
            .rows(descriptor.name())
            .unwrap_or_default()
            .iter()
            .map(|row| row.to_json())
            .collect();
        models.insert(descriptor.name().to_string(), JsonValue::Array(rows));
    }
    JsonValue::Object(models)
}

pub fn write_rows_json(path: &Path, registry: &ModelRegistry) -> Result<u64, GenerationError> {
    let bytes = serde_json::to_vec_pretty(&rows_json(registry))?;
    std::fs::write(path, &bytes)?;
    Ok(bytes.len() as u64)
}

/// One `<Model>.csv` per registered model with at least one field.
///
/// Returns the written paths and the total byte count.
pub fn write_models_csv(
    dir: &Path,
    registry: &ModelRegistry,
) -> Result<(Vec<PathBuf>, u64), GenerationError> {
    let mut paths = Vec::new();
    let mut bytes = 0_u64;
    for descriptor in registry.descriptors() {
        if descriptor.field_count() == 0 {
            continue;
        }
        let path = dir.join(format!("{}.csv", descriptor.name()));
        let rows = registry.rows(descriptor.name()).unwrap_or_default();
        bytes += csv::write_model_csv(&path, descriptor, rows)?;
        paths.push(path);
    }
    Ok((paths, bytes))
}
