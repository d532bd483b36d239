use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{
    self, CommandReport, apply_mapping::ApplyMappingOptions, build_index::BuildIndexOptions,
    extract_links::ExtractLinksOptions, fetch::FetchOptions, manifest::ManifestOptions,
    migrate::MigrateOptions,
};
use crate::logging::{self, Verbosity};
use crate::shelf::manifest::BumpKind;

#[derive(Parser, Debug)]
#[command(
    name = "docshelf",
    about = "Document index and Drive-to-Releases migration tooling",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print the command report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show resolved paths and configuration
    Status,

    /// Build the document index from the documents directory
    BuildIndex {
        /// Index only parsed files instead of the full taxonomy
        #[arg(long)]
        discovered_only: bool,

        /// Write here instead of the configured index file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Build and report without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// List Drive links found in the index
    ExtractLinks {
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Download linked Drive files into the download directory
    Fetch {
        #[arg(long)]
        input: Option<PathBuf>,

        /// Process at most this many links
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Download linked Drive files and publish them to a GitHub release
    Migrate {
        #[arg(long)]
        input: Option<PathBuf>,

        /// Publish downloads and record the new URLs
        #[arg(long)]
        upload: bool,

        /// GitHub token (falls back to GITHUB_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// Target repository as owner/name
        #[arg(long)]
        repo: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Rewrite migrated URLs in the index, keeping a backup
    ApplyMapping {
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Write content and code manifests
    Manifest {
        /// Bump the code manifest version
        #[arg(long, value_enum)]
        bump: Option<BumpKind>,

        /// Code file relative to the code dir (repeatable)
        #[arg(long = "code-file")]
        code_files: Vec<String>,
    },
}

fn render_text(report: &CommandReport) -> String {
    let mut out = format!(
        "{}: {}\n",
        report.command,
        if report.ok { "ok" } else { "attention" }
    );
    for detail in &report.details {
        out.push_str(&format!("  {detail}\n"));
    }
    if !report.issues.is_empty() {
        out.push_str("issues:\n");
        for issue in &report.issues {
            out.push_str(&format!("  - {issue}\n"));
        }
    }
    out
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_text(report));
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(Verbosity::from_flags(cli.verbose, cli.quiet))?;

    let report = match &cli.command {
        Commands::Status => commands::status::run()?,
        Commands::BuildIndex {
            discovered_only,
            output,
            dry_run,
        } => commands::build_index::run(&BuildIndexOptions {
            discovered_only: *discovered_only,
            output: output.clone(),
            dry_run: *dry_run,
        })?,
        Commands::ExtractLinks { input } => {
            commands::extract_links::run(&ExtractLinksOptions {
                input: input.clone(),
            })?
        }
        Commands::Fetch { input, limit } => commands::fetch::run(&FetchOptions {
            input: input.clone(),
            limit: *limit,
        })?,
        Commands::Migrate {
            input,
            upload,
            token,
            repo,
            limit,
        } => commands::migrate::run(&MigrateOptions {
            input: input.clone(),
            upload: *upload,
            token: token.clone(),
            repo: repo.clone(),
            limit: *limit,
        })?,
        Commands::ApplyMapping { input } => {
            commands::apply_mapping::run(&ApplyMappingOptions {
                input: input.clone(),
            })?
        }
        Commands::Manifest { bump, code_files } => commands::manifest::run(&ManifestOptions {
            bump: *bump,
            code_files: code_files.clone(),
        })?,
    };

    print_report(&report, cli.json)
}
