//! # formwork-cli: Command-Line Front-End
//!
//! Provides the `formwork` binary. The library half holds the subcommand
//! handlers so they can be tested without spawning a process.
//!
//! ## Subcommands
//!
//! - `formwork validate`: validate a document against a schema description.
//! - `formwork describe`: load a schema and print its description back.
//! - `formwork check`: run the examples embedded in a schema.
//! - `formwork validators`: list the registered validator types.
//!
//! ```bash
//! formwork validate --schema user.yaml input.json
//! formwork validate --schema user.yaml patch.json --update --scope internal
//! formwork describe --schema user.yaml --format json
//! ```
//!
//! ## Exit codes
//!
//! `0` on success, `2` when the input (or an example) is rejected, `1` on
//! any other failure (unreadable files, malformed schemas).

pub mod check;
pub mod describe;
pub mod validate;
pub mod validators;

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use formwork_core::{document::parse_document, ErrorScope, Value};
use formwork_forms::{Form, FormDescription, FormDescriptionContext};

/// Exit code for rejected input.
pub const EXIT_REJECTED: u8 = 2;

/// Error disclosure level for printed errors.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    External,
    Internal,
}

impl From<Scope> for ErrorScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::External => ErrorScope::External,
            Scope::Internal => ErrorScope::Internal,
        }
    }
}

/// Read and parse a JSON or YAML document. The extension picks the parser.
pub fn read_document(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_document(path, &text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Read a schema description without resolving its validators.
pub fn read_description(path: &Path) -> Result<FormDescription> {
    let document = read_document(path)?;
    let map = document
        .into_map()
        .with_context(|| format!("schema {} is not a map", path.display()))?;
    FormDescription::parse(&map).with_context(|| format!("invalid schema {}", path.display()))
}

/// Load a schema description and build the live form.
pub fn load_schema(path: &Path) -> Result<Form> {
    let description = read_description(path)?;
    let form = description
        .build(FormDescriptionContext::global())
        .with_context(|| format!("cannot build schema {}", path.display()))?;
    tracing::info!(schema = %path.display(), fields = form.fields.len(), "loaded schema");
    Ok(form)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("failed to render JSON")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn read_document_picks_parser_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = write_file(&dir, "a.json", r#"{"b": 1, "a": 2}"#);
        let yaml = write_file(&dir, "a.yaml", "b: 1\na: 2\n");
        assert_eq!(read_document(&json).unwrap(), read_document(&yaml).unwrap());
    }

    #[test]
    fn read_document_missing_file_fails() {
        let err = read_document(Path::new("/nonexistent/formwork.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"));
    }

    #[test]
    fn load_schema_rejects_non_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "schema.yaml", "- 1\n- 2\n");
        let err = load_schema(&path).unwrap_err();
        assert!(format!("{err:#}").contains("is not a map"));
    }

    #[test]
    fn load_schema_builds_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "schema.yaml",
            "fields:\n  - name: a\n    validators: [{type: IsString}]\n",
        );
        let form = load_schema(&path).unwrap();
        assert_eq!(form.fields.len(), 1);
    }

    #[test]
    fn scope_maps_to_error_scope() {
        assert_eq!(ErrorScope::from(Scope::External), ErrorScope::External);
        assert_eq!(ErrorScope::from(Scope::Internal), ErrorScope::Internal);
    }
}
