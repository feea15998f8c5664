mod common;
mod data;
mod migrate;
mod schema;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dumplift")]
#[command(version)]
#[command(
    about = "Migrate SQL dumps into a strongly-typed distributed relational store",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert schema only: build, finalize and report the target schema
    Schema {
        /// Input dump file (omit or "-" for stdin).
        /// Supports .gz, .bz2, .xz, .zst compression
        file: Option<PathBuf>,

        /// Source dialect: postgres or mysql (auto-detected if not specified)
        #[arg(short, long)]
        dialect: Option<String>,

        /// Output directory for generated files
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// File prefix for generated files (default: dump name + ".")
        #[arg(long)]
        prefix: Option<String>,

        /// Capacity of the bad-row sample buffer
        #[arg(long, default_value = "100")]
        bad_row_samples: usize,

        /// YAML config file for per-run settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show progress while reading the dump
        #[arg(short, long)]
        progress: bool,

        /// Print the report as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Convert data only, against a session file from a previous schema run
    Data {
        /// Input dump file (omit or "-" for stdin).
        /// Supports .gz, .bz2, .xz, .zst compression
        file: Option<PathBuf>,

        /// Session file with resolved schema decisions
        /// (regenerated from the dump when not given)
        #[arg(short, long)]
        session: Option<PathBuf>,

        /// Source dialect: postgres or mysql (auto-detected if not specified)
        #[arg(short, long)]
        dialect: Option<String>,

        /// Output directory for generated files
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// File prefix for generated files (default: dump name + ".")
        #[arg(long)]
        prefix: Option<String>,

        /// Capacity of the bad-row sample buffer
        #[arg(long, default_value = "100")]
        bad_row_samples: usize,

        /// YAML config file for per-run settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show progress while reading the dump
        #[arg(short, long)]
        progress: bool,

        /// Convert rows but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Convert schema and data in one run
    Migrate {
        /// Input dump file (omit or "-" for stdin).
        /// Supports .gz, .bz2, .xz, .zst compression
        file: Option<PathBuf>,

        /// Source dialect: postgres or mysql (auto-detected if not specified)
        #[arg(short, long)]
        dialect: Option<String>,

        /// Output directory for generated files
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// File prefix for generated files (default: dump name + ".")
        #[arg(long)]
        prefix: Option<String>,

        /// Capacity of the bad-row sample buffer
        #[arg(long, default_value = "100")]
        bad_row_samples: usize,

        /// YAML config file for per-run settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show progress while reading the dump
        #[arg(short, long)]
        progress: bool,

        /// Convert rows but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Schema {
            file,
            dialect,
            out,
            prefix,
            bad_row_samples,
            config,
            progress,
            json,
        } => schema::run(
            file,
            dialect,
            out,
            prefix,
            bad_row_samples,
            config,
            progress,
            json,
        ),
        Commands::Data {
            file,
            session,
            dialect,
            out,
            prefix,
            bad_row_samples,
            config,
            progress,
            dry_run,
            json,
        } => data::run(
            file,
            session,
            dialect,
            out,
            prefix,
            bad_row_samples,
            config,
            progress,
            dry_run,
            json,
        ),
        Commands::Migrate {
            file,
            dialect,
            out,
            prefix,
            bad_row_samples,
            config,
            progress,
            dry_run,
            json,
        } => migrate::run(
            file,
            dialect,
            out,
            prefix,
            bad_row_samples,
            config,
            progress,
            dry_run,
            json,
        ),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
