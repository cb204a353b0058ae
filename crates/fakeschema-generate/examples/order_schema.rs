use std::env;
use std::path::PathBuf;

use fakeschema_core::ModelCatalog;
use fakeschema_generate::output::rows_json;
use fakeschema_generate::{GenerateOptions, GenerationEngine};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut catalog_path: Option<PathBuf> = None;
    let mut passes: u32 = 3;
    let mut seed: u64 = 42;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--passes" => passes = args.next().ok_or("missing --passes value")?.parse()?,
            "--seed" => seed = args.next().ok_or("missing --seed value")?.parse()?,
            _ => {
                if catalog_path.is_none() {
                    catalog_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let catalog_path = catalog_path
        .unwrap_or_else(|| PathBuf::from("catalogs/examples/shop.models.json"));
    let catalog: ModelCatalog = serde_json::from_str(&std::fs::read_to_string(&catalog_path)?)?;

    let options = GenerateOptions {
        seed,
        passes,
        ..GenerateOptions::default()
    };
    let mut engine = GenerationEngine::from_catalog(options, catalog)?;
    engine.run()?;

    println!("{}", serde_json::to_string_pretty(&rows_json(engine.registry()))?);
    Ok(())
}
