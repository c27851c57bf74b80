//! # Check Subcommand
//!
//! Runs the examples embedded in a schema description, including those of
//! nested forms, and reports every example that does not behave as
//! declared.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::{load_schema, EXIT_REJECTED};

/// Arguments for the check subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema description (JSON or YAML).
    #[arg(long)]
    pub schema: PathBuf,
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let form = load_schema(&args.schema)?;
    let failures = form.check_examples();
    for failure in &failures {
        println!("FAIL {failure}");
    }
    if failures.is_empty() {
        println!("OK: all examples of {} behave as declared", args.schema.display());
        Ok(0)
    } else {
        println!("{} example(s) failed", failures.len());
        Ok(EXIT_REJECTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn check_passes_when_examples_hold() {
        let (_dir, path) = schema(
            "fields:\n  - name: a\n    validators: [{type: IsString}]\n    examples:\n      - value: x\n      - value: 1\n        invalid: true\n",
        );
        assert_eq!(run_check(&CheckArgs { schema: path }).unwrap(), 0);
    }

    #[test]
    fn check_fails_on_misbehaving_example() {
        let (_dir, path) = schema(
            "fields:\n  - name: a\n    validators: [{type: IsString}]\n    examples:\n      - value: 1\n",
        );
        assert_eq!(run_check(&CheckArgs { schema: path }).unwrap(), EXIT_REJECTED);
    }
}
