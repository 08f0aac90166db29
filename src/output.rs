use crate::error::StorageError;
use crate::types::{StatusRow, StatusTable, WorkHours, WorkHoursRow};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

/// File names of every artifact kept for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub assigned_csv: PathBuf,
    pub reported_csv: PathBuf,
    pub work_hours_csv: PathBuf,
    pub assigned_chart: PathBuf,
    pub reported_chart: PathBuf,
    pub work_hours_chart: PathBuf,
}

impl ArtifactPaths {
    pub fn new(root: &Path, entity: &str) -> Self {
        let dir = root.join(entity);
        let file = |suffix: &str| dir.join(format!("{}_{}", entity, suffix));
        Self {
            assigned_csv: file("assigned_tickets.csv"),
            reported_csv: file("reported_tickets.csv"),
            work_hours_csv: file("work_hours.csv"),
            assigned_chart: file("assigned_pie_chart.png"),
            reported_chart: file("reported_pie_chart.png"),
            work_hours_chart: file("work_hours_bar_chart.png"),
            dir,
        }
    }
}

/// Per-entity artifact folders under one root.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self, entity: &str) -> ArtifactPaths {
        ArtifactPaths::new(&self.root, entity)
    }

    /// Create the root and the entity folder if needed.
    pub fn ensure_entity_dir(&self, entity: &str) -> Result<ArtifactPaths, StorageError> {
        let paths = self.paths(entity);
        ensure_dir(&paths.dir)?;
        Ok(paths)
    }

    pub fn save_status_tables(
        &self,
        entity: &str,
        assigned: &StatusTable,
        reported: &StatusTable,
    ) -> Result<ArtifactPaths, StorageError> {
        let paths = self.ensure_entity_dir(entity)?;
        write_csv(&paths.assigned_csv, &assigned.rows)?;
        write_csv(&paths.reported_csv, &reported.rows)?;
        info!(entity, "saved assigned and reported ticket tables");
        Ok(paths)
    }

    pub fn save_work_hours(
        &self,
        entity: &str,
        work_hours: &WorkHours,
    ) -> Result<ArtifactPaths, StorageError> {
        let paths = self.ensure_entity_dir(entity)?;
        write_csv(&paths.work_hours_csv, &work_hours.rows())?;
        info!(entity, total_hours = work_hours.total_hours, "saved work hours");
        Ok(paths)
    }

    /// Entity folder names, sorted. A missing root yields no entities.
    pub fn list_entities(&self) -> Result<Vec<String>, StorageError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::ListDirectory {
                    path: self.root.clone(),
                    source,
                })
            }
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        Ok(names)
    }
}

pub fn ensure_dir(path: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(path).map_err(|source| StorageError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StorageError> {
    let wrap = |source| StorageError::WriteCsv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(wrap)?;
    for r in rows {
        wtr.serialize(r).map_err(wrap)?;
    }
    wtr.flush().map_err(|e| wrap(e.into()))?;
    Ok(())
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let wrap = |source| StorageError::ReadCsv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::Reader::from_path(path).map_err(wrap)?;
    rdr.deserialize().map(|r| r.map_err(wrap)).collect()
}

pub fn load_status_table(path: &Path) -> Result<StatusTable, StorageError> {
    let rows: Vec<StatusRow> = read_csv(path)?;
    Ok(StatusTable { rows })
}

pub fn load_work_hours(path: &Path) -> Result<Vec<WorkHoursRow>, StorageError> {
    read_csv(path)
}

/// A persisted CSV kept as text, for display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn read(path: &Path) -> Result<Self, StorageError> {
        let wrap = |source| StorageError::ReadCsv {
            path: path.to_path_buf(),
            source,
        };
        let mut rdr = csv::Reader::from_path(path).map_err(wrap)?;
        let headers = rdr.headers().map_err(wrap)?.iter().map(str::to_string).collect();
        let rows = rdr
            .records()
            .map(|r| {
                r.map(|rec| rec.iter().map(str::to_string).collect::<Vec<String>>())
                    .map_err(wrap)
            })
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        Ok(Self { headers, rows })
    }

    /// Cell of `row` in the column named `column`.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.headers.iter().position(|h| h == column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

pub fn render_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
