// Batch report generation over every entity folder.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbImage;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::{ReportError, StorageError};
use crate::output::{ensure_dir, ArtifactPaths, ArtifactStore, CsvTable};
use crate::pdf::{render_pdf, PdfReport, PdfSection};
use crate::template::{html_table, png_data_uri, render, ReportContext};

#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntity {
    pub entity: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub generated: Vec<PathBuf>,
    pub skipped: Vec<SkippedEntity>,
}

pub fn pdf_report_path(reports_root: &Path, entity: &str) -> PathBuf {
    reports_root.join(format!("{}_report.pdf", entity))
}

pub fn html_report_path(reports_root: &Path, entity: &str) -> PathBuf {
    reports_root.join(format!("{}_report.html", entity))
}

struct EntityTables {
    assigned: CsvTable,
    reported: CsvTable,
    work_hours: CsvTable,
}

fn load_tables(paths: &ArtifactPaths) -> Result<EntityTables, StorageError> {
    Ok(EntityTables {
        assigned: CsvTable::read(&paths.assigned_csv)?,
        reported: CsvTable::read(&paths.reported_csv)?,
        work_hours: CsvTable::read(&paths.work_hours_csv)?,
    })
}

/// A chart as both a data URI for the HTML and pixels for the PDF.
/// Missing or unreadable files give an empty URI and no pixels.
fn load_chart(entity: &str, path: &Path) -> (String, Option<RgbImage>) {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(entity, path = %path.display(), "chart not readable: {}", e);
            return (String::new(), None);
        }
    };
    let uri = png_data_uri(&STANDARD.encode(&bytes));
    match image::load_from_memory(&bytes) {
        Ok(img) => (uri, Some(img.to_rgb8())),
        Err(e) => {
            warn!(entity, path = %path.display(), "chart not decodable: {}", e);
            (uri, None)
        }
    }
}

/// Render the HTML and PDF reports for every entity under the artifacts
/// root, overwriting earlier output. Entities whose CSVs cannot be read
/// are skipped.
pub fn generate_pdf_reports(settings: &Settings) -> Result<BatchSummary, ReportError> {
    ensure_dir(&settings.artifacts_root)?;
    ensure_dir(&settings.reports_root)?;
    let template = settings.load_template()?;
    let store = ArtifactStore::new(&settings.artifacts_root);

    let mut summary = BatchSummary::default();
    for entity in store.list_entities()? {
        let paths = store.paths(&entity);
        let tables = match load_tables(&paths) {
            Ok(tables) => tables,
            Err(e) => {
                if e.is_not_found() {
                    warn!(entity = %entity, "CSV file not found, skipping: {}", e);
                } else {
                    error!(entity = %entity, "CSV file unreadable, skipping: {}", e);
                }
                summary.skipped.push(SkippedEntity {
                    entity,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let pdf_path = render_entity(&entity, &paths, &tables, &template, &settings.reports_root)?;
        summary.generated.push(pdf_path);
    }
    info!(
        generated = summary.generated.len(),
        skipped = summary.skipped.len(),
        "report batch finished"
    );
    Ok(summary)
}

fn render_entity(
    entity: &str,
    paths: &ArtifactPaths,
    tables: &EntityTables,
    template: &str,
    reports_root: &Path,
) -> Result<PathBuf, ReportError> {
    let total_hours = tables.work_hours.cell(0, "Hours").unwrap_or("0").to_string();
    let total_days = tables.work_hours.cell(0, "Days").unwrap_or("0").to_string();

    let (assigned_uri, assigned_img) = load_chart(entity, &paths.assigned_chart);
    let (reported_uri, reported_img) = load_chart(entity, &paths.reported_chart);
    let (work_hours_uri, work_hours_img) = load_chart(entity, &paths.work_hours_chart);

    let ctx = ReportContext {
        entity_name: entity.to_string(),
        assigned_table: html_table(&tables.assigned),
        reported_table: html_table(&tables.reported),
        work_hours_table: html_table(&tables.work_hours),
        total_hours: total_hours.clone(),
        total_days: total_days.clone(),
        assigned_chart: assigned_uri,
        reported_chart: reported_uri,
        work_hours_chart: work_hours_uri,
    };
    let html = render(template, &ctx);
    let html_path = html_report_path(reports_root, entity);
    write_file(&html_path, html.as_bytes())?;

    let report = PdfReport {
        title: entity,
        subtitle: format!("Total work hours: {} ({} days)", total_hours, total_days),
        sections: vec![
            PdfSection {
                heading: "Assigned Tickets",
                table: &tables.assigned,
                chart: assigned_img,
            },
            PdfSection {
                heading: "Reported Tickets",
                table: &tables.reported,
                chart: reported_img,
            },
            PdfSection {
                heading: "Work Hours",
                table: &tables.work_hours,
                chart: work_hours_img,
            },
        ],
    };
    let pdf_path = pdf_report_path(reports_root, entity);
    write_file(&pdf_path, &render_pdf(&report)?)?;
    info!(entity, path = %pdf_path.display(), "report written");
    Ok(pdf_path)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    std::fs::write(path, bytes).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::save_charts;
    use crate::reports::status_table;
    use crate::types::{EntitySummary, WorkHours};

    fn seed(store: &ArtifactStore, entity: &str) -> ArtifactPaths {
        let summary = EntitySummary {
            entity: entity.to_string(),
            assigned: status_table(["resolved", "closed", "resolved"]),
            reported: status_table(["feedback", "resolved"]),
            work_hours: WorkHours {
                total_hours: 40.0,
                avg_hours_assigned: 20.0,
                avg_hours_reported: 40.0,
            },
        };
        store
            .save_status_tables(entity, &summary.assigned, &summary.reported)
            .unwrap();
        let paths = store.save_work_hours(entity, &summary.work_hours).unwrap();
        save_charts(&paths, &summary).unwrap();
        paths
    }

    fn settings(dir: &Path) -> Settings {
        Settings::new(dir.join("entities"), dir.join("reports"))
    }

    #[test]
    fn renders_html_and_pdf_for_each_entity() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let store = ArtifactStore::new(&settings.artifacts_root);
        seed(&store, "olga");
        seed(&store, "pat");

        let summary = generate_pdf_reports(&settings).unwrap();
        assert_eq!(summary.generated.len(), 2);
        assert!(summary.skipped.is_empty());

        let pdf = std::fs::read(pdf_report_path(&settings.reports_root, "olga")).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        let html =
            std::fs::read_to_string(html_report_path(&settings.reports_root, "olga")).unwrap();
        assert!(html.contains("<h1>olga</h1>"));
        assert!(html.contains("Total work hours: 40.0 (5.0 days)"));
        assert_eq!(html.matches("data:image/png;base64,").count(), 3);
        assert_eq!(html.matches("class=\"dataframe table\"").count(), 3);
    }

    #[test]
    fn entity_with_missing_csv_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let store = ArtifactStore::new(&settings.artifacts_root);
        seed(&store, "quinn");
        let paths = seed(&store, "ray");
        std::fs::remove_file(&paths.reported_csv).unwrap();

        let summary = generate_pdf_reports(&settings).unwrap();
        assert_eq!(summary.generated, vec![pdf_report_path(&settings.reports_root, "quinn")]);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].entity, "ray");
        assert!(!pdf_report_path(&settings.reports_root, "ray").exists());
    }

    #[test]
    fn missing_chart_still_produces_a_report() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let store = ArtifactStore::new(&settings.artifacts_root);
        let paths = seed(&store, "sam");
        std::fs::remove_file(&paths.work_hours_chart).unwrap();

        let summary = generate_pdf_reports(&settings).unwrap();
        assert_eq!(summary.generated.len(), 1);
        let html = std::fs::read_to_string(html_report_path(&settings.reports_root, "sam")).unwrap();
        assert_eq!(html.matches("data:image/png;base64,").count(), 2);
        assert!(html.contains("src=\"\""));
    }

    #[test]
    fn empty_roots_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let summary = generate_pdf_reports(&settings).unwrap();
        assert!(summary.generated.is_empty());
        assert!(settings.artifacts_root.is_dir());
        assert!(settings.reports_root.is_dir());
    }
}
