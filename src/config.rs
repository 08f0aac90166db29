use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use crate::error::ReportError;

const DEFAULT_TEMPLATE: &str = include_str!("../templates/report_template.html");

/// Locations every component works against. Built once from the command
/// line and handed down explicitly.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Folder holding one sub-folder of artifacts per entity
    #[arg(long = "entities", env = "TICKET_REPORT_ENTITIES", default_value = "./entities", global = true)]
    pub artifacts_root: PathBuf,

    /// Folder the PDF and HTML reports are written to
    #[arg(long = "reports", env = "TICKET_REPORT_REPORTS", default_value = "./reports", global = true)]
    pub reports_root: PathBuf,

    /// HTML report template, built-in when omitted. Only the .html report uses it; the PDF layout is fixed
    #[arg(long = "template", env = "TICKET_REPORT_TEMPLATE", global = true)]
    pub template_path: Option<PathBuf>,

    /// Address the dashboard listens on
    #[arg(long, env = "TICKET_REPORT_BIND", default_value = "127.0.0.1:8501", global = true)]
    pub bind: SocketAddr,
}

impl Settings {
    pub fn new(artifacts_root: impl Into<PathBuf>, reports_root: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_root: artifacts_root.into(),
            reports_root: reports_root.into(),
            template_path: None,
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
        }
    }

    /// Template source: the configured file, or the built-in template.
    pub fn load_template(&self) -> Result<String, ReportError> {
        match &self.template_path {
            Some(path) => std::fs::read_to_string(path).map_err(|source| {
                ReportError::ReadTemplate {
                    path: path.clone(),
                    source,
                }
            }),
            None => Ok(DEFAULT_TEMPLATE.to_string()),
        }
    }
}
