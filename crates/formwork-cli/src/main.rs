//! # formwork CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use formwork_cli::check::{run_check, CheckArgs};
use formwork_cli::describe::{run_describe, DescribeArgs};
use formwork_cli::validate::{run_validate, ValidateArgs};
use formwork_cli::validators::run_validators;
use formwork_cli::Scope;

/// formwork: declarative validation of JSON and YAML documents.
#[derive(Parser, Debug)]
#[command(name = "formwork", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Error disclosure level for printed errors.
    #[arg(long, value_enum, default_value_t = Scope::External, global = true)]
    scope: Scope,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a document against a schema description.
    Validate(ValidateArgs),

    /// Load a schema and print its description.
    Describe(DescribeArgs),

    /// Run the examples embedded in a schema description.
    Check(CheckArgs),

    /// List registered validator types and their parameters.
    Validators,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args, cli.scope),
        Commands::Describe(args) => run_describe(&args),
        Commands::Check(args) => run_check(&args),
        Commands::Validators => run_validators(),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use formwork_cli::describe::OutputFormat;

    #[test]
    fn cli_parse_validate() {
        let cli = Cli::try_parse_from(["formwork", "validate", "--schema", "s.yaml", "in.json"]).unwrap();
        assert_eq!(cli.scope, Scope::External);
        if let Commands::Validate(args) = cli.command {
            assert_eq!(args.schema, PathBuf::from("s.yaml"));
            assert_eq!(args.input, PathBuf::from("in.json"));
            assert!(!args.update);
        } else {
            panic!("expected validate");
        }
    }

    #[test]
    fn cli_parse_validate_update_internal_scope() {
        let cli = Cli::try_parse_from([
            "formwork", "-vv", "validate", "--schema", "s.yaml", "in.json", "--update", "--scope",
            "internal",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.scope, Scope::Internal);
        if let Commands::Validate(args) = cli.command {
            assert!(args.update);
        }
    }

    #[test]
    fn cli_parse_validate_requires_schema() {
        assert!(Cli::try_parse_from(["formwork", "validate", "in.json"]).is_err());
    }

    #[test]
    fn cli_parse_describe_format() {
        let cli = Cli::try_parse_from(["formwork", "describe", "--schema", "s.yaml"]).unwrap();
        if let Commands::Describe(args) = cli.command {
            assert_eq!(args.format, OutputFormat::Json);
        }
        let cli = Cli::try_parse_from(["formwork", "describe", "--schema", "s.yaml", "--format", "yaml"])
            .unwrap();
        if let Commands::Describe(args) = cli.command {
            assert_eq!(args.format, OutputFormat::Yaml);
        }
    }

    #[test]
    fn cli_parse_check_and_validators() {
        let cli = Cli::try_parse_from(["formwork", "check", "--schema", "s.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Check(_)));
        let cli = Cli::try_parse_from(["formwork", "validators"]).unwrap();
        assert!(matches!(cli.command, Commands::Validators));
    }
}
