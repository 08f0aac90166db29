use crate::types::{
    EntitySummary, StatusCategory, StatusRow, StatusTable, TicketExport, WorkHours, TOTAL_LABEL,
};
use crate::util::{calculate_average_hours, calculate_work_hours, format_percentage};

/// Map a raw tracker status onto its bucket. Matching is exact: `Resolved`
/// or ` resolved` are `other`.
pub fn categorize_status(status: &str) -> StatusCategory {
    StatusCategory::KNOWN
        .into_iter()
        .find(|c| c.as_str() == status)
        .unwrap_or(StatusCategory::Other)
}

/// Count categories, most frequent first, and append the Total row.
///
/// Ties keep the order in which the categories were first seen.
pub fn status_table<'a, I>(statuses: I) -> StatusTable
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(StatusCategory, u64)> = Vec::new();
    for raw in statuses {
        let category = categorize_status(raw);
        match counts.iter_mut().find(|(c, _)| *c == category) {
            Some((_, n)) => *n += 1,
            None => counts.push((category, 1)),
        }
    }
    // `sort_by` is stable, which keeps first-seen order on ties.
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let total: u64 = counts.iter().map(|(_, n)| n).sum();
    let mut rows: Vec<StatusRow> = counts
        .into_iter()
        .map(|(category, count)| StatusRow {
            status: category.as_str().to_string(),
            count,
            percentage: format_percentage(count, total),
        })
        .collect();
    rows.push(StatusRow {
        status: TOTAL_LABEL.to_string(),
        count: total,
        percentage: format_percentage(total, total),
    });
    StatusTable { rows }
}

pub fn work_hours(export: &TicketExport, assigned: &StatusTable, reported: &StatusTable) -> WorkHours {
    let total_hours = calculate_work_hours(export.start_date, export.end_date);
    WorkHours {
        total_hours,
        avg_hours_assigned: calculate_average_hours(
            total_hours,
            assigned.count_of(StatusCategory::Resolved),
        ),
        avg_hours_reported: calculate_average_hours(
            total_hours,
            reported.count_of(StatusCategory::Resolved),
        ),
    }
}

/// Assigned tickets are bucketed by `Status.1`, reported tickets by `Status`.
pub fn summarize(export: &TicketExport) -> EntitySummary {
    let assigned = status_table(export.assigned_rows().map(|r| r.assigned_status.as_str()));
    let reported = status_table(export.reported_rows().map(|r| r.reported_status.as_str()));
    let work_hours = work_hours(export, &assigned, &reported);
    EntitySummary {
        entity: export.entity.clone(),
        assigned,
        reported,
        work_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TicketRow;
    use chrono::NaiveDate;

    #[test]
    fn known_categories_map_to_themselves() {
        for c in StatusCategory::KNOWN {
            assert_eq!(categorize_status(c.as_str()), c);
        }
        for raw in ["", "Resolved", "RESOLVED", "in progress", "other", "new"] {
            assert_eq!(categorize_status(raw), StatusCategory::Other, "{:?}", raw);
        }
    }

    #[test]
    fn table_is_ordered_by_count_with_total_last() {
        let table = status_table(["closed", "resolved", "new", "resolved", "closed", "resolved"]);
        let labels: Vec<&str> = table.rows.iter().map(|r| r.status.as_str()).collect();
        assert_eq!(labels, vec!["resolved", "closed", "other", "Total"]);
        assert_eq!(table.rows[0].percentage, "50.0%");
        assert_eq!(table.rows[1].percentage, "33.33%");
        assert_eq!(table.rows[2].percentage, "16.67%");
        assert_eq!(table.rows[3].count, 6);
        assert_eq!(table.rows[3].percentage, "100.0%");
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let table = status_table(["feedback", "delayed", "delayed", "feedback", "closed"]);
        let labels: Vec<&str> = table.categories().iter().map(|r| r.status.as_str()).collect();
        assert_eq!(labels, vec!["feedback", "delayed", "closed"]);
    }

    #[test]
    fn counts_sum_to_total_and_percentages_to_hundred() {
        let statuses = [
            "resolved", "closed", "assigned", "delayed", "feedback", "inprogress", "x", "y",
            "resolved", "z",
        ];
        let table = status_table(statuses);
        let sum: u64 = table.categories().iter().map(|r| r.count).sum();
        assert_eq!(sum, table.total());
        let pct: f64 = table.categories().iter().map(|r| r.percentage_value()).sum();
        assert!((pct - 100.0).abs() <= 0.5, "{}", pct);
        assert_eq!(table.rows.last().unwrap().percentage, "100.0%");
    }

    #[test]
    fn empty_subset_has_only_total() {
        let table = status_table(Vec::<&str>::new());
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.total(), 0);
        assert_eq!(table.rows[0].percentage, "0.0%");
    }

    fn ticket(assigned_to: &str, reporter: &str, status: &str, status1: &str) -> TicketRow {
        TicketRow {
            assigned_to: assigned_to.to_string(),
            reporter: reporter.to_string(),
            reported_status: status.to_string(),
            assigned_status: status1.to_string(),
        }
    }

    #[test]
    fn summarize_splits_subsets_and_averages_resolved() {
        let export = TicketExport {
            source: "dana.csv".to_string(),
            entity: "dana".to_string(),
            rows: vec![
                ticket("dana", "dana", "resolved", "resolved"),
                ticket("dana", "erin", "closed", "resolved"),
                ticket("erin", "dana", "resolved", "feedback"),
                ticket("dana", "dana", "feedback", "closed"),
                ticket("erin", "erin", "resolved", "resolved"),
            ],
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        };
        let summary = summarize(&export);
        assert_eq!(summary.entity, "dana");
        assert_eq!(summary.assigned.total(), 3);
        assert_eq!(summary.assigned.count_of(StatusCategory::Resolved), 2);
        assert_eq!(summary.reported.total(), 3);
        assert_eq!(summary.reported.count_of(StatusCategory::Resolved), 2);
        assert_eq!(summary.work_hours.total_hours, 40.0);
        assert_eq!(summary.work_hours.avg_hours_assigned, 20.0);
        assert_eq!(summary.work_hours.avg_hours_reported, 20.0);
    }

    #[test]
    fn no_resolved_tickets_means_zero_average() {
        let export = TicketExport {
            source: "f.csv".to_string(),
            entity: "fay".to_string(),
            rows: vec![ticket("fay", "fay", "closed", "delayed")],
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        let summary = summarize(&export);
        assert_eq!(summary.work_hours.total_hours, 8.0);
        assert_eq!(summary.work_hours.avg_hours_assigned, 0.0);
        assert_eq!(summary.work_hours.avg_hours_reported, 0.0);
    }
}
