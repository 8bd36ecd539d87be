use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tagver::cli::orchestration::{self, FromWorkflowArgs};
use tagver::cli::VcsArg;
use tagver::{config, ui, Style, TagverError};

#[derive(Parser)]
#[command(
    name = "tagver",
    version,
    about = "Derive version strings from version control tags"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the version of a working copy and print it
    From(FromArgs),
    /// Check that a version conforms to a style
    Check(CheckArgs),
}

#[derive(Args)]
struct FromArgs {
    #[arg(value_enum, help = "Version control system to use [default: any]")]
    vcs: Option<VcsArg>,

    #[arg(long, value_enum, help = "Version style to render")]
    style: Option<Style>,

    #[arg(long, help = "Custom output template, e.g. 'v{base}+{distance}.{commit}'")]
    format: Option<String>,

    #[arg(long, help = "Tag pattern: 'default', 'default-unprefixed' or a regex with a 'base' group")]
    pattern: Option<String>,

    #[arg(long, help = "Always include commit metadata", conflicts_with = "no_metadata")]
    metadata: bool,

    #[arg(long, help = "Never include commit metadata")]
    no_metadata: bool,

    #[arg(long, help = "Mark the version when the working tree has changes")]
    dirty: bool,

    #[arg(long, help = "Bump the last base component when past the tag")]
    bump: bool,

    #[arg(long, help = "Use the full commit id")]
    full_commit: bool,

    #[arg(long, help = "Read tags and distance from this branch or ref instead of HEAD")]
    tag_branch: Option<String>,

    #[arg(long, help = "Fail when no tag matches the pattern")]
    strict: bool,

    #[arg(long, help = "Include metadata embedded in the tag")]
    tagged_metadata: bool,

    #[arg(long, help = "Directory to resolve from")]
    path: Option<PathBuf>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,
}

#[derive(Args)]
struct CheckArgs {
    #[arg(help = "Version to check; read from standard input when omitted")]
    version: Option<String>,

    #[arg(long, value_enum, default_value = "pep440", help = "Version style to check against")]
    style: Style,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TAGVER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::From(args) => run_from(args),
        Command::Check(args) => run_check(args),
    };

    if let Err(err) = outcome {
        let tagver_err = err.downcast_ref::<TagverError>();
        ui::display_error(&format!("{:#}", err));
        if let Some(hint) = tagver_err.and_then(ui::error_hint) {
            ui::display_hint(hint);
        }
        std::process::exit(tagver_err.map(TagverError::exit_code).unwrap_or(1));
    }

    Ok(())
}

fn run_from(args: FromArgs) -> Result<()> {
    let config = config::load_config(args.config.as_deref())?;

    let metadata = if args.metadata {
        Some(true)
    } else if args.no_metadata {
        Some(false)
    } else {
        None
    };

    let workflow_args = FromWorkflowArgs {
        path: args.path,
        vcs: args.vcs,
        style: args.style,
        format: args.format,
        pattern: args.pattern,
        metadata,
        dirty: args.dirty,
        bump: args.bump,
        full_commit: args.full_commit,
        strict: args.strict,
        tagged_metadata: args.tagged_metadata,
        tag_branch: args.tag_branch,
    };

    let outcome = orchestration::run_from_workflow(workflow_args, &config)?;
    for warning in &outcome.warnings {
        ui::display_boundary_warning(warning);
    }
    ui::display_version(&outcome.version);
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<()> {
    let version = match args.version {
        Some(version) => version,
        None => ui::read_version_from_stdin().context("Failed to read version from stdin")?,
    };
    orchestration::run_check_workflow(&version, args.style)?;
    Ok(())
}
