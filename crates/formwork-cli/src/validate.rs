//! # Validate Subcommand
//!
//! Validates one JSON or YAML document against a schema description.
//! Validated values are printed as JSON. A rejected input prints the
//! structured error (with traceback) and exits with code 2.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use formwork_core::{ChainableError, ErrorScope, Value};
use formwork_forms::{Form, FormError};

use crate::{load_schema, print_json, read_document, Scope, EXIT_REJECTED};

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema description (JSON or YAML).
    #[arg(long)]
    pub schema: PathBuf,

    /// Document to validate (JSON or YAML).
    pub input: PathBuf,

    /// Validate as a partial update: absent fields are not checked.
    #[arg(long)]
    pub update: bool,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs, scope: Scope) -> Result<u8> {
    let form = load_schema(&args.schema)?;
    let input = read_document(&args.input)?;
    match validate_document(&form, &input, args.update) {
        Ok(values) => {
            print_json(&values)?;
            Ok(0)
        }
        Err(err) => {
            tracing::debug!(input = %args.input.display(), "input rejected");
            let report = rejection(err, &args.schema).structured_with_traceback(scope.into());
            print_json(&report)?;
            Ok(EXIT_REJECTED)
        }
    }
}

/// Validate a parsed document, in update mode if asked.
pub fn validate_document(form: &Form, input: &Value, update: bool) -> Result<Value, FormError> {
    let values = match (input, update) {
        (Value::Map(map), true) => form.validate_update(map)?,
        (_, _) => form.validate_value(input)?,
    };
    Ok(Value::Map(values))
}

/// The form error, with the schema that rejected it attached as an
/// internal cause.
fn rejection(err: FormError, schema: &Path) -> ChainableError {
    let source = ChainableError::new(ErrorScope::Internal, "rejected by schema", "SCHEMA")
        .with_data(Value::from(schema.display().to_string()));
    err.to_chainable().caused_by(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formwork_core::Map;
    use formwork_forms::{Field, Validator};

    fn form() -> Form {
        Form::new(vec![Field::new("name", vec![Validator::IsRequired, Validator::string()])]).strict()
    }

    #[test]
    fn validate_document_accepts_valid_map() {
        let mut input = Map::new();
        input.insert("name".into(), Value::from("x"));
        let out = validate_document(&form(), &Value::Map(input), false).unwrap();
        assert_eq!(out.get("name"), Some(&Value::from("x")));
    }

    #[test]
    fn validate_document_update_mode_skips_missing() {
        let out = validate_document(&form(), &Value::Map(Map::new()), true).unwrap();
        assert_eq!(out, Value::Map(Map::new()));
        assert!(validate_document(&form(), &Value::Map(Map::new()), false).is_err());
    }

    #[test]
    fn validate_document_rejects_non_map() {
        let err = validate_document(&form(), &Value::Int(1), false).unwrap_err();
        assert_eq!(err.message(), "invalid input type: not a map");
    }

    #[test]
    fn rejection_hides_schema_at_external_scope() {
        let err = validate_document(&form(), &Value::Map(Map::new()), false).unwrap_err();
        let chained = rejection(err, Path::new("user.yaml"));

        let external = chained.structured_with_traceback(ErrorScope::External);
        assert_eq!(external.error.code, "FORM-ERROR");
        assert_eq!(external.traceback.len(), 1);
        assert_eq!(external.traceback[0].message, "undisclosed error");

        let internal = chained.structured_with_traceback(ErrorScope::Internal);
        assert_eq!(internal.traceback[0].message, "rejected by schema");
        assert_eq!(internal.traceback[0].data, Some(Value::from("user.yaml")));
    }
}
