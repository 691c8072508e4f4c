//! CLI entry point for the participation rater.
//!
//! Provides subcommands for grading a course straight from Canvas, grading an
//! offline export of activity records, and previewing the grading schemes.

mod infra;
mod services;

use crate::infra::canvas::client::CanvasClient;
use crate::services::activity_api::ActivityApi;
use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use participation_rater::activity::{ActivityRecord, load_records, start_of_day};
use participation_rater::analyzers::analyzer::{GradingReport, analyze};
use participation_rater::analyzers::summary::preview_schemes;
use participation_rater::config::AnalysisConfig;
use participation_rater::output::{print_json, print_preview, write_grades, write_participation};
use participation_rater::roster::{RosterEntry, load_roster};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "participation_rater")]
#[command(about = "Grade student participation in forums and messages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a course's activity from Canvas and grade it
    Analyze {
        /// Canvas course ID (overrides the config file)
        #[arg(long)]
        course_id: Option<u64>,

        #[command(flatten)]
        grading: GradingArgs,

        /// Optional: CSV file for the ungraded participation table
        #[arg(long)]
        raw_output: Option<PathBuf>,
    },
    /// Grade activity records from a CSV file (author_id,author_name,timestamp,channel)
    Grade {
        /// Records CSV to read
        #[arg(long)]
        records: PathBuf,

        #[command(flatten)]
        grading: GradingArgs,
    },
    /// Compare every grading scheme over a range of participation counts
    Preview {
        /// Highest participation count to show
        #[arg(short, long, default_value_t = 11)]
        max_count: u32,

        /// JSON config file supplying grading bounds
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct GradingArgs {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grading scheme: tiered, linear, logarithmic, sqrt, percentage
    #[arg(short, long)]
    scheme: Option<String>,

    /// Only count activity on or after this date (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<String>,

    /// Roster CSV with `Student` and `ID` columns
    #[arg(short, long)]
    roster: Option<PathBuf>,

    /// CSV file to write grades to
    #[arg(short, long, default_value = "participation_grades.csv")]
    output: PathBuf,

    /// Ignore forum activity
    #[arg(long, default_value_t = false)]
    no_forums: bool,

    /// Ignore internal messages
    #[arg(long, default_value_t = false)]
    no_messages: bool,

    /// Also log the full report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl GradingArgs {
    /// Loads the config file (if any) and applies command-line overrides.
    fn resolve_config(&self) -> Result<AnalysisConfig> {
        let mut config = AnalysisConfig::load_or_default(self.config.as_deref())?;
        if let Some(scheme) = &self.scheme {
            config.scheme = scheme.clone();
        }
        if let Some(start_date) = &self.start_date {
            config.start_date = Some(start_date.clone());
        }
        if self.no_forums {
            config.include_forums = false;
        }
        if self.no_messages {
            config.include_messages = false;
        }
        Ok(config)
    }

    fn roster(&self) -> Result<Option<Vec<RosterEntry>>> {
        self.roster
            .as_deref()
            .map(|path| {
                load_roster(path).with_context(|| format!("failed to load roster '{}'", path.display()))
            })
            .transpose()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/participation_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("participation_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            course_id,
            grading,
            raw_output,
        } => {
            let config = grading.resolve_config()?;
            let course_id = course_id
                .or(config.course_id)
                .ok_or_else(|| anyhow!("a course id is required (--course-id or config)"))?;
            let token = std::env::var("CANVAS_API_TOKEN")
                .context("CANVAS_API_TOKEN must be set")?;
            let roster = grading.roster()?;

            let client = CanvasClient::new(&config.canvas_base_url, &token)?;
            let records = tokio::select! {
                result = fetch_activity(&client, course_id, &config) => result?,
                _ = tokio::signal::ctrl_c() => bail!("interrupted while fetching course activity"),
            };

            let report = analyze(&records, &config, roster.as_deref())?;
            if let Some(path) = raw_output {
                write_participation(&path, &report.aggregation.details)?;
            }
            finish(&report, &grading)?;
        }
        Commands::Grade { records, grading } => {
            let config = grading.resolve_config()?;
            let roster = grading.roster()?;
            let records = load_records(&records)
                .with_context(|| format!("failed to load records '{}'", records.display()))?;

            let report = analyze(&records, &config, roster.as_deref())?;
            finish(&report, &grading)?;
        }
        Commands::Preview { max_count, config } => {
            let config = AnalysisConfig::load_or_default(config.as_deref())?;
            config.bounds.validate()?;
            let counts: Vec<u32> = (0..=max_count).collect();
            print_preview(&preview_schemes(&counts, &config.bounds));
        }
    }

    Ok(())
}

/// Pulls forum and message activity for the enabled channels.
#[tracing::instrument(skip(client, config))]
async fn fetch_activity(
    client: &impl ActivityApi,
    course_id: u64,
    config: &AnalysisConfig,
) -> Result<Vec<ActivityRecord>> {
    let since = config.aggregate_options()?.start_date.map(start_of_day);
    let mut records = Vec::new();

    if config.include_forums {
        records.extend(client.forum_activity(course_id).await?);
    }
    if config.include_messages {
        records.extend(client.message_activity(course_id, since).await?);
    }

    info!(records = records.len(), "Course activity fetched");
    Ok(records)
}

/// Writes the graded CSV and logs the run summary.
fn finish(report: &GradingReport, grading: &GradingArgs) -> Result<()> {
    if report.graded.is_empty() {
        warn!("No participation data found; writing an empty grade file");
    }

    write_grades(&grading.output, &report.graded)?;

    info!(
        students = report.summary.total_students,
        using_both_channels = report.summary.students_using_both,
        "Channel usage"
    );
    for (grade, count) in &report.summary.distribution {
        info!(grade = %grade, students = count, "Grade distribution");
    }
    if grading.json {
        print_json(report)?;
    }
    Ok(())
}
