use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

pub const HOURS_PER_DAY: f64 = 8.0;

pub const TOTAL_LABEL: &str = "Total";
pub const METRIC_TOTAL: &str = "Total work hours";
pub const METRIC_AVG_ASSIGNED: &str = "Average hours per assigned ticket";
pub const METRIC_AVG_REPORTED: &str = "Average hours per reported ticket";

/// Fixed ticket-status buckets. Anything the tracker reports outside the
/// first six lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCategory {
    Resolved,
    Closed,
    Assigned,
    Delayed,
    Feedback,
    InProgress,
    Other,
}

impl StatusCategory {
    pub const KNOWN: [StatusCategory; 6] = [
        StatusCategory::Resolved,
        StatusCategory::Closed,
        StatusCategory::Assigned,
        StatusCategory::Delayed,
        StatusCategory::Feedback,
        StatusCategory::InProgress,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCategory::Resolved => "resolved",
            StatusCategory::Closed => "closed",
            StatusCategory::Assigned => "assigned",
            StatusCategory::Delayed => "delayed",
            StatusCategory::Feedback => "feedback",
            StatusCategory::InProgress => "inprogress",
            StatusCategory::Other => "other",
        }
    }
}

/// One ticket from an export, reduced to the columns the summaries use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRow {
    pub assigned_to: String,
    pub reporter: String,
    /// `Status` column.
    pub reported_status: String,
    /// `Status.1` column, the second `Status` header in the raw file.
    pub assigned_status: String,
}

/// A parsed export: the subject entity, its tickets and the work period
/// taken from the trailing cells of the first row.
#[derive(Debug, Clone)]
pub struct TicketExport {
    pub source: String,
    pub entity: String,
    pub rows: Vec<TicketRow>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl TicketExport {
    pub fn assigned_rows(&self) -> impl Iterator<Item = &TicketRow> {
        self.rows.iter().filter(|r| r.assigned_to == self.entity)
    }

    pub fn reported_rows(&self) -> impl Iterator<Item = &TicketRow> {
        self.rows.iter().filter(|r| r.reporter == self.entity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct StatusRow {
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: u64,
    #[serde(rename = "Percentage")]
    #[tabled(rename = "Percentage")]
    pub percentage: String,
}

impl StatusRow {
    /// Numeric value of the percentage string, `0.0` if it does not parse.
    pub fn percentage_value(&self) -> f64 {
        self.percentage
            .trim_end_matches('%')
            .parse::<f64>()
            .unwrap_or(0.0)
    }
}

/// Category rows ordered by count, followed by the synthetic Total row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusTable {
    pub rows: Vec<StatusRow>,
}

impl StatusTable {
    /// Rows without the trailing Total row.
    pub fn categories(&self) -> &[StatusRow] {
        match self.rows.last() {
            Some(last) if last.status == TOTAL_LABEL => &self.rows[..self.rows.len() - 1],
            _ => &self.rows,
        }
    }

    pub fn total(&self) -> u64 {
        self.rows
            .iter()
            .find(|r| r.status == TOTAL_LABEL)
            .map(|r| r.count)
            .unwrap_or(0)
    }

    pub fn count_of(&self, category: StatusCategory) -> u64 {
        self.categories()
            .iter()
            .find(|r| r.status == category.as_str())
            .map(|r| r.count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct WorkHoursRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Hours")]
    #[tabled(rename = "Hours")]
    pub hours: f64,
    #[serde(rename = "Days")]
    #[tabled(rename = "Days")]
    pub days: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkHours {
    pub total_hours: f64,
    pub avg_hours_assigned: f64,
    pub avg_hours_reported: f64,
}

impl WorkHours {
    /// The three persisted rows, each with its hours converted to days.
    pub fn rows(&self) -> Vec<WorkHoursRow> {
        [
            (METRIC_TOTAL, self.total_hours),
            (METRIC_AVG_ASSIGNED, self.avg_hours_assigned),
            (METRIC_AVG_REPORTED, self.avg_hours_reported),
        ]
        .into_iter()
        .map(|(metric, hours)| WorkHoursRow {
            metric: metric.to_string(),
            hours,
            days: hours / HOURS_PER_DAY,
        })
        .collect()
    }
}

/// Everything derived from one export.
#[derive(Debug, Clone)]
pub struct EntitySummary {
    pub entity: String,
    pub assigned: StatusTable,
    pub reported: StatusTable,
    pub work_hours: WorkHours,
}

/// The three views of an entity the dashboard and CLI can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    #[value(name = "assigned")]
    AssignedTickets,
    #[value(name = "reported")]
    ReportedTickets,
    #[value(name = "work-hours")]
    WorkHoursData,
}

impl DataType {
    pub const ALL: [DataType; 3] = [
        DataType::AssignedTickets,
        DataType::ReportedTickets,
        DataType::WorkHoursData,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DataType::AssignedTickets => "Assigned Tickets",
            DataType::ReportedTickets => "Reported Tickets",
            DataType::WorkHoursData => "Work Hours Data",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            DataType::AssignedTickets => "assigned-tickets",
            DataType::ReportedTickets => "reported-tickets",
            DataType::WorkHoursData => "work-hours-data",
        }
    }

    pub fn from_slug(s: &str) -> Option<DataType> {
        DataType::ALL.into_iter().find(|d| d.slug() == s)
    }
}
