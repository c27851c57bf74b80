//! # Describe Subcommand
//!
//! Loads a schema, resolves every validator, and prints the description of
//! the live form. The output loads back into an equivalent form.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use formwork_core::Value;
use formwork_forms::{Form, FormDescriptionContext};

use crate::{load_schema, print_json};

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Arguments for the describe subcommand.
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Schema description (JSON or YAML).
    #[arg(long)]
    pub schema: PathBuf,

    /// Output encoding.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

/// Execute the describe subcommand.
pub fn run_describe(args: &DescribeArgs) -> Result<u8> {
    let form = load_schema(&args.schema)?;
    let description = describe_form(&form)?;
    match args.format {
        OutputFormat::Json => print_json(&description)?,
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&description).context("failed to render YAML")?)
        }
    }
    Ok(0)
}

/// The data description of a live form.
pub fn describe_form(form: &Form) -> Result<Value> {
    let description = form
        .describe(FormDescriptionContext::global())
        .context("schema cannot be described")?;
    Ok(description.to_value()?)
}
