mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::control::ShouldColorize;

use commands::{
    schema::{SchemaCommands, handle_schema_commands},
    validate::{ValidateArgs, handle_validate},
};
use context::ProjectContext;
use output::{OutputFormat, ReportOptions, Reporter};

#[derive(Parser)]
#[command(name = "docschema", version)]
#[command(about = "Inspect schema definition files and validate JSON documents against them")]
#[command(after_help = "Environment:\n  RUST_LOG  log filter, e.g. docschema=debug\n  NO_COLOR  disable colored output")]
struct Cli {
    /// Report format (defaults to docschema.toml `output`, then table)
    #[arg(long, value_enum, global = true)]
    output: Option<OutputFormat>,

    /// Print reports only when something failed
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Log each definition and document file as it is read
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect document types declared in definition files
    #[command(subcommand)]
    Schema(SchemaCommands),

    /// Validate JSON documents against a declared document type
    #[command(after_help = "Example:\n  docschema validate --type User schemas/users.toml users.json")]
    Validate(ValidateArgs),
}

fn main() {
    env_logger::init();

    if let Err(err) = execute(Cli::parse()) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let ctx = ProjectContext::find()?;
    let options = ReportOptions {
        format: cli.output.or_else(|| ctx.output_format()).unwrap_or_default(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color || !ShouldColorize::from_env().should_colorize(),
    };
    if options.no_color {
        colored::control::set_override(false);
    }

    let reporter = Reporter::new(options);
    if let Some(config) = &ctx.config {
        reporter.trace(&format!(
            "using docschema.toml in {} ({} definition path(s))",
            ctx.project_root.display(),
            config.docschema.definitions.len()
        ));
    }

    match cli.command {
        Commands::Schema(command) => handle_schema_commands(command, &ctx, &reporter),
        Commands::Validate(args) => handle_validate(args, &reporter),
    }
}
