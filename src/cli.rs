use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::commands::save::SaveOptions;
use crate::commands::summarize::SummarizeOptions;

#[derive(Debug, Parser)]
#[command(
    name = "silent-summarizer",
    version,
    about = "Summarize chat floor ranges with an LLM and file them as world-info entries"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize a floor range of a rendered-message snapshot.
    Summarize {
        #[arg(long)]
        transcript: PathBuf,
        #[arg(long)]
        start: Option<u64>,
        #[arg(long)]
        end: Option<u64>,
    },
    /// Summarize a floor range and save the result as a notebook entry.
    Run {
        #[arg(long)]
        transcript: PathBuf,
        #[arg(long)]
        start: Option<u64>,
        #[arg(long)]
        end: Option<u64>,
    },
    /// Turn an existing summary into a notebook entry.
    Save {
        #[arg(long, conflicts_with = "summary_file")]
        summary: Option<String>,
        #[arg(long)]
        summary_file: Option<PathBuf>,
        /// Override the configured notebook name.
        #[arg(long)]
        notebook: Option<String>,
    },
    /// List notebooks, or show one notebook's entries.
    Books {
        #[arg(long)]
        show: Option<String>,
    },
    /// Show resolved paths and configuration.
    Status,
    /// Read or change persisted settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    Set { field: String, value: String },
}

fn render_text(report: &CommandReport) {
    if let Some(output) = &report.output {
        println!("{output}");
        println!();
    }
    println!("{} {}", report.command, if report.ok { "ok" } else { "failed" });
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match &cli.command {
        Command::Summarize {
            transcript,
            start,
            end,
        } => commands::summarize::run(&SummarizeOptions {
            transcript: transcript.clone(),
            start: *start,
            end: *end,
            save: false,
        })?,
        Command::Run {
            transcript,
            start,
            end,
        } => commands::summarize::run(&SummarizeOptions {
            transcript: transcript.clone(),
            start: *start,
            end: *end,
            save: true,
        })?,
        Command::Save {
            summary,
            summary_file,
            notebook,
        } => commands::save::run(&SaveOptions {
            summary: summary.clone(),
            summary_file: summary_file.clone(),
            notebook: notebook.clone(),
        })?,
        Command::Books { show } => commands::books::run(show.as_deref())?,
        Command::Status => commands::status::run()?,
        Command::Settings { action } => match action {
            SettingsAction::Show => commands::settings::show()?,
            SettingsAction::Set { field, value } => commands::settings::set(field, value)?,
        },
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_text(&report);
    }

    if report.ok {
        Ok(())
    } else {
        Err(anyhow!("{} reported {} issue(s)", report.command, report.issues.len()))
    }
}
