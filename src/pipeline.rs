// Upload → summary → artifacts → reports, shared by the CLI and the
// dashboard.

use std::path::Path;

use serde::Serialize;
use tracing::{error, info};

use crate::charts::save_charts;
use crate::config::Settings;
use crate::error::PipelineError;
use crate::loader::parse_export;
use crate::output::ArtifactStore;
use crate::render::{generate_pdf_reports, BatchSummary};
use crate::reports::summarize;
use crate::types::EntitySummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// One user-facing outcome line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// An export file as received, before parsing.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

#[derive(Debug, Default)]
pub struct RunOutcome {
    pub notices: Vec<Notice>,
    pub summaries: Vec<EntitySummary>,
    pub batch: Option<BatchSummary>,
}

/// Parse, summarise and persist one export. Each save step adds a
/// success notice.
pub fn process_upload(
    settings: &Settings,
    upload: &Upload,
    notices: &mut Vec<Notice>,
) -> Result<EntitySummary, PipelineError> {
    let export = parse_export(&upload.name, upload.bytes.as_slice())?;
    info!(
        source = %export.source,
        entity = %export.entity,
        rows = export.rows.len(),
        "export parsed"
    );
    let summary = summarize(&export);
    let store = ArtifactStore::new(&settings.artifacts_root);

    store.save_status_tables(&summary.entity, &summary.assigned, &summary.reported)?;
    notices.push(Notice::success(
        "Data saved successfully for both assigned and reported tickets!",
    ));
    let paths = store.save_work_hours(&summary.entity, &summary.work_hours)?;
    notices.push(Notice::success("Work hours data saved successfully!"));
    save_charts(&paths, &summary)?;
    notices.push(Notice::success(format!("Processed {}", summary.entity)));
    Ok(summary)
}

/// Process every upload, continuing past failures, then regenerate all
/// reports once.
pub fn run_uploads(settings: &Settings, uploads: &[Upload]) -> RunOutcome {
    let mut outcome = RunOutcome::default();
    if uploads.is_empty() {
        return outcome;
    }
    for upload in uploads {
        match process_upload(settings, upload, &mut outcome.notices) {
            Ok(summary) => {
                info!(file = %upload.name, entity = %summary.entity, "export processed");
                outcome.summaries.push(summary);
            }
            Err(e) => {
                error!(file = %upload.name, "export failed: {}", e);
                outcome.notices.push(Notice::error(e.to_string()));
            }
        }
    }
    outcome
        .notices
        .push(Notice::success("All files have been processed."));

    match generate_pdf_reports(settings) {
        Ok(batch) => {
            for skipped in &batch.skipped {
                outcome.notices.push(Notice::info(format!(
                    "CSV file not found for {}: {}",
                    skipped.entity, skipped.reason
                )));
            }
            outcome.notices.push(Notice::success("PDF reports generated."));
            outcome.batch = Some(batch);
        }
        Err(e) => {
            error!("report batch failed: {}", e);
            outcome
                .notices
                .push(Notice::error(format!("Report generation failed: {}", e)));
        }
    }
    outcome
}
