use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::rank::config::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(
    name = "rankroll",
    version,
    about = "Consolidate rank tracker exports into one wide-format report per project"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Print the command report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import an upload (optional) and rebuild project reports.
    Consolidate {
        /// Zip archive of dated export folders; replaces previously imported exports.
        #[arg(long)]
        zip: Option<PathBuf>,
        /// Only consolidate these projects (repeatable).
        #[arg(long = "project")]
        projects: Vec<String>,
        /// Snapshots closer than this many days to the last kept one are dropped.
        #[arg(long, allow_negative_numbers = true)]
        min_gap_days: Option<i64>,
        /// Keep at most this many snapshots per project.
        #[arg(long, allow_negative_numbers = true)]
        max_count: Option<i64>,
        /// Ignore and do not populate the report cache.
        #[arg(long)]
        no_cache: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List projects found in the imported exports.
    Projects {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print a project's consolidated report.
    Show {
        project: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Drop cached reports, for one project or all of them.
    CacheClear {
        #[arg(long)]
        project: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show resolved paths and effective configuration.
    Status {
        #[command(flatten)]
        output: OutputArgs,
    },
}

fn render(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "{}: {}",
        report.command,
        if report.ok { "ok" } else { "issues found" }
    );
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  ! {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let (report, json) = match cli.command {
        Command::Consolidate {
            zip,
            projects,
            min_gap_days,
            max_count,
            no_cache,
            output,
        } => (
            commands::consolidate::run(&commands::consolidate::ConsolidateOptions {
                zip,
                projects,
                overrides: ConfigOverrides {
                    min_gap_days,
                    max_count,
                    no_cache,
                },
            })?,
            output.json,
        ),
        Command::Projects { output } => (commands::projects::run()?, output.json),
        Command::Show { project, output } => (
            commands::show::run(&commands::show::ShowOptions { project })?,
            output.json,
        ),
        Command::CacheClear { project, output } => (
            commands::cache_clear::run(&commands::cache_clear::CacheClearOptions { project })?,
            output.json,
        ),
        Command::Status { output } => (commands::status::run()?, output.json),
    };

    render(&report, json)?;
    if !report.ok {
        std::process::exit(2);
    }
    Ok(())
}
