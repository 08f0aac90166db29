use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read '{source_name}': {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error("The uploaded file {0} does not contain the required columns.")]
    MissingRequiredColumns(String),

    #[error("{source_name} has no '{column}' column")]
    MissingColumn { source_name: String, column: String },

    #[error("{0} contains no ticket rows")]
    NoRows(String),

    #[error("Invalid entity name '{0}'")]
    InvalidEntity(String),

    #[error("{source_name}: invalid {which} date '{value}', expected YYYY-MM-DD")]
    InvalidDate {
        source_name: String,
        which: &'static str,
        value: String,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    WriteCsv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read '{path}': {source}")]
    ReadCsv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to list '{path}': {source}")]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// True when the underlying cause is a file that does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ReadCsv { source, .. } => matches!(
                source.kind(),
                csv::ErrorKind::Io(e) if e.kind() == std::io::ErrorKind::NotFound
            ),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to save chart '{path}': {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to read template '{path}': {source}")]
    ReadTemplate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build PDF: {0}")]
    Pdf(String),

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Anything that can stop one file from going through the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Chart(#[from] ChartError),
}
