//! Writes the OpenAPI document for the learning path API.
//!
//! Usage: `openapi [OUTPUT]` (defaults to `openapi.json`).

use learnpath_api::router::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"));

    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&output, spec_json)?;
    println!("OpenAPI document written to {}", output.display());
    Ok(())
}
