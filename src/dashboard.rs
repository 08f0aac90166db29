// Browser dashboard: browse persisted artifacts or upload new exports.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Multipart, Path as UrlPath, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Settings;
use crate::loader::validate_entity_name;
use crate::output::{ArtifactStore, CsvTable};
use crate::pipeline::{run_uploads, Notice, NoticeLevel, Upload};
use crate::render::pdf_report_path;
use crate::template::html_table;
use crate::types::DataType;
use crate::util::{html_escape, url_encode};

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
const PDF_NOT_FOUND: &str = "PDF report not found. Please generate the report.";

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.settings.artifacts_root)
    }
}

/// The two pages of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    AddData,
}

impl View {
    const ALL: [View; 2] = [View::Dashboard, View::AddData];

    pub fn title(self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::AddData => "Add Data",
        }
    }

    pub fn href(self) -> &'static str {
        match self {
            View::Dashboard => "/dashboard",
            View::AddData => "/add-data",
        }
    }

    /// The page the navigation switches to.
    pub fn toggle(self) -> View {
        match self {
            View::Dashboard => View::AddData,
            View::AddData => View::Dashboard,
        }
    }
}

/// What the dashboard can show for one entity and data type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub entity: String,
    pub data_type: DataType,
    pub table: Option<CsvTable>,
    pub chart: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
}

/// Look up the persisted artifacts of `entity`. `None` when the name is
/// not a valid entity or has no folder.
pub fn entity_view(settings: &Settings, entity: &str, data_type: DataType) -> Option<EntityView> {
    validate_entity_name(entity).ok()?;
    let paths = ArtifactStore::new(&settings.artifacts_root).paths(entity);
    if !paths.dir.is_dir() {
        return None;
    }
    let (csv, chart) = match data_type {
        DataType::AssignedTickets => (paths.assigned_csv, paths.assigned_chart),
        DataType::ReportedTickets => (paths.reported_csv, paths.reported_chart),
        DataType::WorkHoursData => (paths.work_hours_csv, paths.work_hours_chart),
    };
    let pdf = pdf_report_path(&settings.reports_root, entity);
    Some(EntityView {
        entity: entity.to_string(),
        data_type,
        table: CsvTable::read(&csv).ok(),
        chart: chart.is_file().then_some(chart),
        pdf: pdf.is_file().then_some(pdf),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to(View::Dashboard.href()) }))
        .route("/dashboard", get(dashboard))
        .route("/add-data", get(add_data_form).post(add_data))
        .route("/charts/:entity/:data_type", get(chart))
        .route("/reports/:entity", get(download_report))
        .route("/api/entities", get(list_entities))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(settings: Settings) -> Result<()> {
    let addr = settings.bind;
    let app = router(AppState::new(settings));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("dashboard listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    entity: Option<String>,
    data_type: Option<String>,
}

async fn dashboard(State(state): State<AppState>, Query(q): Query<DashboardQuery>) -> Html<String> {
    let entities = match state.store().list_entities() {
        Ok(entities) => entities,
        Err(e) => {
            error!("listing entities failed: {}", e);
            return Html(page(View::Dashboard, &[Notice::error(e.to_string())], ""));
        }
    };
    let data_type = q
        .data_type
        .as_deref()
        .and_then(DataType::from_slug)
        .unwrap_or(DataType::AssignedTickets);
    let selected = q
        .entity
        .filter(|e| entities.contains(e))
        .or_else(|| entities.first().cloned());

    let mut body = selector_form(&entities, selected.as_deref(), data_type);
    let mut notices = Vec::new();
    match selected {
        None => notices.push(Notice::info("No entities yet. Add data to get started.")),
        Some(entity) => match entity_view(&state.settings, &entity, data_type) {
            Some(view) => body.push_str(&render_entity_view(&view, &mut notices)),
            None => notices.push(Notice::error(format!("Unknown entity {}", entity))),
        },
    }
    Html(page(View::Dashboard, &notices, &body))
}

fn selector_form(entities: &[String], selected: Option<&str>, data_type: DataType) -> String {
    let entity_options: String = entities
        .iter()
        .map(|e| {
            let sel = if Some(e.as_str()) == selected { " selected" } else { "" };
            format!(
                "<option value=\"{v}\"{sel}>{v}</option>",
                v = html_escape(e),
                sel = sel
            )
        })
        .collect();
    let type_options: String = DataType::ALL
        .iter()
        .map(|d| {
            let sel = if *d == data_type { " selected" } else { "" };
            format!("<option value=\"{}\"{}>{}</option>", d.slug(), sel, d.label())
        })
        .collect();
    format!(
        r#"<form method="get" action="/dashboard" class="selectors">
    <label>Select Entity <select name="entity">{}</select></label>
    <label>Select Data Type <select name="data_type">{}</select></label>
    <button type="submit">Show</button>
</form>"#,
        entity_options, type_options
    )
}

fn render_entity_view(view: &EntityView, notices: &mut Vec<Notice>) -> String {
    let label = view.data_type.label();
    let entity_url = url_encode(&view.entity);
    let mut html = String::new();
    if let Some(table) = &view.table {
        html.push_str(&format!("<p>{} Overview:</p>\n{}\n", label, html_table(table)));
    }
    if view.chart.is_some() {
        html.push_str(&format!(
            "<figure><img src=\"/charts/{}/{}\" alt=\"{label} Chart\"><figcaption>{label} Chart</figcaption></figure>\n",
            entity_url,
            view.data_type.slug(),
            label = label
        ));
    }
    if view.pdf.is_some() {
        html.push_str(&format!(
            "<p><a class=\"button\" href=\"/reports/{}\">Download PDF Report</a></p>\n",
            entity_url
        ));
    } else {
        notices.push(Notice::error(PDF_NOT_FOUND));
    }
    html
}

async fn chart(
    State(state): State<AppState>,
    UrlPath((entity, data_type)): UrlPath<(String, String)>,
) -> Response {
    let view = DataType::from_slug(&data_type)
        .and_then(|d| entity_view(&state.settings, &entity, d));
    let Some(path) = view.and_then(|v| v.chart) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn download_report(
    State(state): State<AppState>,
    UrlPath(entity): UrlPath<String>,
) -> Response {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Html(page(View::Dashboard, &[Notice::error(PDF_NOT_FOUND)], "")),
        )
            .into_response()
    };
    if validate_entity_name(&entity).is_err() {
        return not_found();
    }
    let path = pdf_report_path(&state.settings.reports_root, &entity);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let disposition = format!(
                "attachment; filename=\"{}_report.pdf\"",
                entity.replace(['"', '\r', '\n'], "_")
            );
            (
                [
                    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Err(_) => not_found(),
    }
}

async fn list_entities(State(state): State<AppState>) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    state
        .store()
        .list_entities()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

const UPLOAD_FORM: &str = r#"<form method="post" action="/add-data" enctype="multipart/form-data" class="upload">
    <label><input type="checkbox" name="bulk" value="on" id="bulk"> Bulk Upload</label>
    <label>Upload your CSV files <input type="file" name="files" id="files" accept=".csv"></label>
    <button type="submit">Process</button>
</form>
<script>
document.getElementById('bulk').addEventListener('change', function (e) {
    document.getElementById('files').multiple = e.target.checked;
});
</script>"#;

async fn add_data_form() -> Html<String> {
    Html(page(View::AddData, &[], UPLOAD_FORM))
}

async fn add_data(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Html<String>, (StatusCode, String)> {
    let mut bulk = false;
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "bulk" => bulk = true,
            "files" => {
                let file_name = field.file_name().unwrap_or("upload.csv").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
                if !bytes.is_empty() {
                    uploads.push(Upload {
                        name: file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    let mut notices = Vec::new();
    if !bulk && uploads.len() > 1 {
        notices.push(Notice::info(format!(
            "Bulk Upload is off; only {} was processed.",
            uploads[0].name
        )));
        uploads.truncate(1);
    }
    if uploads.is_empty() {
        notices.push(Notice::error("No files uploaded."));
        return Ok(Html(page(View::AddData, &notices, UPLOAD_FORM)));
    }

    let settings = state.settings.clone();
    let outcome = tokio::task::spawn_blocking(move || run_uploads(&settings, &uploads))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    notices.extend(outcome.notices);
    Ok(Html(page(View::AddData, &notices, UPLOAD_FORM)))
}

fn render_notices(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|n| {
            let class = match n.level {
                NoticeLevel::Success => "success",
                NoticeLevel::Info => "info",
                NoticeLevel::Error => "error",
            };
            format!(
                "<div class=\"notice {}\">{}</div>\n",
                class,
                html_escape(&n.message)
            )
        })
        .collect()
}

fn page(view: View, notices: &[Notice], body: &str) -> String {
    let nav: String = View::ALL
        .iter()
        .map(|v| {
            let class = if *v == view { " class=\"active\"" } else { "" };
            format!("<a href=\"{}\"{}>{}</a>", v.href(), class, v.title())
        })
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Ticketer - {title}</title>
    <style>{css}</style>
</head>
<body>
    <aside><h2>Navigation</h2><nav>{nav}</nav><p class="hint">Next: <a href="{next_href}">{next}</a></p></aside>
    <main>
        <h1>{heading}</h1>
        {notices}
        {body}
    </main>
</body>
</html>"#,
        title = view.title(),
        css = CSS,
        nav = nav,
        next_href = view.toggle().href(),
        next = view.toggle().title(),
        heading = if view == View::AddData { "Add Data to CSV" } else { "Dashboard" },
        notices = render_notices(notices),
        body = body,
    )
}

const CSS: &str = r#"
body { display: flex; margin: 0; font-family: system-ui, sans-serif; background: #f0f2f6; color: #1f2937; }
aside { width: 14rem; padding: 1.5rem; background: #ffffff; border-right: 1px solid #e5e7eb; min-height: 100vh; }
aside nav a { display: block; padding: 0.4rem 0; color: #4f8bf9; text-decoration: none; }
aside nav a.active { font-weight: 700; }
.hint { color: #6b7280; font-size: 0.85rem; }
main { flex: 1; padding: 2rem; }
h1 { color: #4f8bf9; }
label { display: block; margin: 0.5rem 0; }
.notice { padding: 0.6rem 1rem; margin: 0.5rem 0; border-radius: 4px; }
.notice.success { background: #dcfce7; color: #166534; }
.notice.info { background: #dbeafe; color: #1e40af; }
.notice.error { background: #fee2e2; color: #991b1b; }
.table { border-collapse: collapse; background: #ffffff; }
.table th, .table td { border: 1px solid #d1d5db; padding: 4px 10px; text-align: right; }
figure img { max-width: 100%; }
a.button { display: inline-block; padding: 0.5rem 1rem; background: #4f8bf9; color: #ffffff; border-radius: 4px; text-decoration: none; }
"#;
