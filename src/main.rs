// Entry point and high-level CLI flow.
//
// - `ingest` runs exports through the pipeline and regenerates reports.
// - `report` regenerates the reports from what is already on disk.
// - `show` prints one persisted table.
// - `serve` starts the browser dashboard.
mod charts;
mod config;
mod dashboard;
mod error;
mod loader;
mod output;
mod pdf;
mod pipeline;
mod render;
mod reports;
mod template;
mod types;
mod util;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::Settings;
use output::{load_status_table, load_work_hours, ArtifactStore};
use pipeline::{run_uploads, Notice, NoticeLevel, Upload};
use types::{DataType, EntitySummary};

#[derive(Parser, Debug)]
#[command(
    name = "ticket_report",
    version,
    about = "Per-person ticket summaries, charts and PDF reports from tracker exports"
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one or more exports, then regenerate every report
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Regenerate every report from the persisted artifacts
    Report {
        /// Print the batch result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a persisted table for one entity
    Show {
        entity: String,
        #[arg(long, value_enum, default_value = "assigned")]
        data_type: DataType,
    },
    /// Start the dashboard
    Serve,
}

fn print_notices(notices: &[Notice]) {
    for n in notices {
        match n.level {
            NoticeLevel::Success => println!("[ok] {}", n.message),
            NoticeLevel::Info => println!("[info] {}", n.message),
            NoticeLevel::Error => eprintln!("[error] {}", n.message),
        }
    }
}

fn print_summary(summary: &EntitySummary) {
    println!(
        "{}: {} assigned, {} reported, {} work hours\n",
        summary.entity,
        util::format_int(summary.assigned.total()),
        util::format_int(summary.reported.total()),
        util::format_number(summary.work_hours.total_hours, 1)
    );
    println!("Assigned Tickets Overview:");
    output::preview_table_rows(&summary.assigned.rows, summary.assigned.rows.len());
    println!("Reported Tickets Overview:");
    output::preview_table_rows(&summary.reported.rows, summary.reported.rows.len());
}

fn handle_ingest(settings: &Settings, files: &[PathBuf]) -> Result<()> {
    let uploads = files
        .iter()
        .map(|path| {
            Upload::from_path(path).with_context(|| format!("reading {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let outcome = run_uploads(settings, &uploads);
    for summary in &outcome.summaries {
        print_summary(summary);
    }
    print_notices(&outcome.notices);
    if outcome.summaries.len() < uploads.len() {
        bail!(
            "{} of {} files failed",
            uploads.len() - outcome.summaries.len(),
            uploads.len()
        );
    }
    Ok(())
}

fn handle_report(settings: &Settings, json: bool) -> Result<()> {
    let batch = render::generate_pdf_reports(settings)?;
    if json {
        println!("{}", output::render_json(&batch)?);
        return Ok(());
    }
    for path in &batch.generated {
        println!("[ok] {}", path.display());
    }
    for skipped in &batch.skipped {
        println!("[info] skipped {}: {}", skipped.entity, skipped.reason);
    }
    println!("PDF reports generated.");
    Ok(())
}

fn handle_show(settings: &Settings, entity: &str, data_type: DataType) -> Result<()> {
    loader::validate_entity_name(entity)?;
    let store = ArtifactStore::new(&settings.artifacts_root);
    let paths = store.paths(entity);
    if !paths.dir.is_dir() {
        bail!("no artifacts for {} under {}", entity, store.root().display());
    }

    println!("{} Overview:", data_type.label());
    let chart = match data_type {
        DataType::AssignedTickets => {
            let table = load_status_table(&paths.assigned_csv)?;
            output::preview_table_rows(&table.rows, table.rows.len());
            &paths.assigned_chart
        }
        DataType::ReportedTickets => {
            let table = load_status_table(&paths.reported_csv)?;
            output::preview_table_rows(&table.rows, table.rows.len());
            &paths.reported_chart
        }
        DataType::WorkHoursData => {
            let rows = load_work_hours(&paths.work_hours_csv)?;
            output::preview_table_rows(&rows, rows.len());
            &paths.work_hours_chart
        }
    };
    if chart.is_file() {
        println!("{} Chart: {}", data_type.label(), chart.display());
    }
    let pdf = render::pdf_report_path(&settings.reports_root, entity);
    if pdf.is_file() {
        println!("PDF report: {}", pdf.display());
    } else {
        println!("PDF report not found. Please generate the report.");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings;
    match cli.command {
        Command::Ingest { files } => {
            tokio::task::spawn_blocking(move || handle_ingest(&settings, &files)).await?
        }
        Command::Report { json } => {
            tokio::task::spawn_blocking(move || handle_report(&settings, json)).await?
        }
        Command::Show { entity, data_type } => handle_show(&settings, &entity, data_type),
        Command::Serve => dashboard::serve(settings).await,
    }
}
