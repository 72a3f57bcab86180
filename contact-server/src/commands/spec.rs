//! Command to generate the OpenAPI document and write it to a file or stdout.

use crate::openapi::ApiDoc;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use utoipa::OpenApi;

/// Writes the OpenAPI document to `output_path` or streams it to stdout.
///
/// `"json"` and `"yaml"` stream that format to stdout; any other value is a
/// file path whose extension picks the format (YAML unless `.json`). With no
/// path, YAML goes to stdout.
///
/// # Errors
/// Returns an error if serialization fails or the file cannot be written.
pub fn generate_spec(output_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let openapi = ApiDoc::openapi();

    match output_path {
        Some("json") => {
            io::stdout().write_all(openapi.to_pretty_json()?.as_bytes())?;
        }
        Some("yaml") | None => {
            io::stdout().write_all(openapi.to_yaml()?.as_bytes())?;
        }
        Some(path) => {
            let path = Path::new(path);
            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

            let document = if is_json {
                openapi.to_pretty_json()?
            } else {
                openapi.to_yaml()?
            };
            fs::write(path, document)?;

            println!("OpenAPI document written to {}", path.display());
        }
    }

    Ok(())
}
