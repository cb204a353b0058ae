use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::RunResult;

/// JSON config written to each run directory.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub catalog: PathBuf,
    pub models: Vec<String>,
    pub seed: u64,
    pub passes: u32,
    pub format: String,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub logs_path: PathBuf,
    pub report_path: PathBuf,
    pub rows_path: PathBuf,
}

/// Create `<run_dir>/<timestamp>__run_<id>/` and write `config.json` into it.
pub fn start_run(run_dir: &Path, config: &RunConfig) -> RunResult<RunPaths> {
    let timestamp = config.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = run_dir.join(format!("{timestamp}__run_{}", config.run_id));
    create_dir_all(&root)?;

    let paths = RunPaths {
        config_path: root.join("config.json"),
        logs_path: root.join("logs.ndjson"),
        report_path: root.join("generation_report.json"),
        rows_path: root.join("rows.json"),
        root,
    };
    write_json(&paths.config_path, config)?;
    Ok(paths)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> RunResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_directory_is_named_by_time_and_id() {
        let run_dir = std::env::temp_dir().join(format!(
            "fakeschema_cli_{}",
            uuid::Uuid::new_v4().simple()
        ));
        let config = RunConfig {
            run_id: "abc".to_string(),
            started_at: DateTime::parse_from_rfc3339("2024-06-15T10:20:30Z")
                .unwrap()
                .with_timezone(&Utc),
            catalog: PathBuf::from("shop.models.json"),
            models: vec!["Customer".to_string()],
            seed: 1,
            passes: 2,
            format: "json".to_string(),
        };

        let paths = start_run(&run_dir, &config).unwrap();
        assert_eq!(
            paths.root,
            run_dir.join("2024-06-15T10-20-30Z__run_abc")
        );
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.config_path).unwrap()).unwrap();
        assert_eq!(written["passes"], 2);

        let _ = std::fs::remove_dir_all(&run_dir);
    }
}
