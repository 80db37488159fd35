//! Export OpenAPI specification to JSON file
//!
//! Usage:
//!   cargo run --bin export_openapi > openapi.json
//!
//! Or with file output:
//!   cargo run --bin export_openapi -- --output docs/openapi.json

use anyhow::{Context, Result};
use balance_service::gateway::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<()> {
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .context("Failed to serialize OpenAPI spec")?;

    let args: Vec<String> = std::env::args().collect();
    match args.iter().position(|a| a == "--output") {
        Some(i) => {
            let path = args.get(i + 1).context("--output requires a path")?;
            std::fs::write(path, &json).with_context(|| format!("Failed to write {}", path))?;
            eprintln!("OpenAPI spec exported to: {}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
