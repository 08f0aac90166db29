use crate::error::IngestError;
use crate::types::{TicketExport, TicketRow};
use crate::util::parse_date_safe;
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;

pub const COL_ASSIGNED_TO: &str = "Assigned To";
pub const COL_REPORTER: &str = "Reporter";
pub const COL_REPORTED_STATUS: &str = "Status";
pub const COL_ASSIGNED_STATUS: &str = "Status.1";

/// Parse an export from any reader, e.g. the bytes of an upload.
pub fn parse_export<R: Read>(source_name: &str, reader: R) -> Result<TicketExport, IngestError> {
    let csv_err = |source| IngestError::Csv {
        source_name: source_name.to_string(),
        source,
    };
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = dedupe_headers(rdr.headers().map_err(csv_err)?);
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    let (Some(&assigned_to), Some(&reporter)) =
        (index.get(COL_ASSIGNED_TO), index.get(COL_REPORTER))
    else {
        return Err(IngestError::MissingRequiredColumns(source_name.to_string()));
    };
    let column = |name: &str| {
        index
            .get(name)
            .copied()
            .ok_or_else(|| IngestError::MissingColumn {
                source_name: source_name.to_string(),
                column: name.to_string(),
            })
    };
    let reported_status = column(COL_REPORTED_STATUS)?;
    let assigned_status = column(COL_ASSIGNED_STATUS)?;

    let mut first: Option<StringRecord> = None;
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        let cell = |i: usize| record.get(i).unwrap_or("").trim().to_string();
        rows.push(TicketRow {
            assigned_to: cell(assigned_to),
            reporter: cell(reporter),
            reported_status: cell(reported_status),
            assigned_status: cell(assigned_status),
        });
        if first.is_none() {
            first = Some(record);
        }
    }
    let Some(first) = first else {
        return Err(IngestError::NoRows(source_name.to_string()));
    };

    let entity = rows[0].reporter.clone();
    validate_entity_name(&entity)?;

    // The work period sits in the last two columns of the first row.
    let width = headers.len();
    let date_cell = |offset: usize, which: &'static str| {
        let raw = width
            .checked_sub(offset)
            .and_then(|i| first.get(i))
            .unwrap_or("");
        parse_date_safe(Some(raw)).ok_or_else(|| IngestError::InvalidDate {
            source_name: source_name.to_string(),
            which,
            value: raw.trim().to_string(),
        })
    };
    let start_date = date_cell(2, "start")?;
    let end_date = date_cell(1, "end")?;

    Ok(TicketExport {
        source: source_name.to_string(),
        entity,
        rows,
        start_date,
        end_date,
    })
}

/// Repeated headers get a numeric suffix: `Status, Status` becomes
/// `Status, Status.1`.
pub fn dedupe_headers(headers: &StringRecord) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for raw in headers.iter() {
        let name = raw.trim().to_string();
        let mut candidate = name.clone();
        while let Some(n) = seen.get(&candidate).copied() {
            seen.insert(candidate.clone(), n + 1);
            candidate = format!("{}.{}", name, n);
        }
        seen.insert(candidate.clone(), 1);
        out.push(candidate);
    }
    out
}

/// Entity names become folder names, so they must be a single plain
/// path component.
pub fn validate_entity_name(name: &str) -> Result<(), IngestError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(|c| c.is_control());
    if invalid {
        return Err(IngestError::InvalidEntity(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "Id,Assigned To,Reporter,Status,Status,Start,End\n";

    #[test]
    fn parses_rows_and_period() {
        let csv = format!(
            "{}1,alice,alice,resolved,closed,2024-01-01,2024-01-05\n2,bob,alice,feedback,assigned,,\n",
            HEADER
        );
        let export = parse_export("alice.csv", csv.as_bytes()).unwrap();
        assert_eq!(export.entity, "alice");
        assert_eq!(export.rows.len(), 2);
        assert_eq!(export.rows[0].reported_status, "resolved");
        assert_eq!(export.rows[0].assigned_status, "closed");
        assert_eq!(export.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(export.end_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(export.assigned_rows().count(), 1);
        assert_eq!(export.reported_rows().count(), 2);
    }

    #[test]
    fn missing_required_columns_is_reported() {
        let csv = "Id,Owner,Status,Status,Start,End\n1,x,resolved,closed,2024-01-01,2024-01-02\n";
        let err = parse_export("bad.csv", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::MissingRequiredColumns(ref n) if n == "bad.csv"));
        assert_eq!(
            err.to_string(),
            "The uploaded file bad.csv does not contain the required columns."
        );
    }

    #[test]
    fn oversized_years_are_invalid_dates() {
        for (start, end, which) in [
            ("+20240-01-01", "+20240-01-05", "start"),
            ("2024-01-01", "+262142-12-31", "end"),
        ] {
            let csv = format!("{}1,lou,lou,resolved,closed,{},{}\n", HEADER, start, end);
            let err = parse_export("lou.csv", csv.as_bytes()).unwrap_err();
            assert!(
                matches!(err, IngestError::InvalidDate { which: w, .. } if w == which),
                "{:?}",
                err
            );
        }
    }

    #[test]
    fn missing_second_status_column_fails() {
        let csv = "Assigned To,Reporter,Status,Start,End\na,a,resolved,2024-01-01,2024-01-02\n";
        let err = parse_export("one_status.csv", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { ref column, .. } if column == "Status.1"));
    }

    #[test]
    fn malformed_date_fails_the_file() {
        let csv = format!("{}1,alice,alice,resolved,closed,01/02/2024,2024-01-05\n", HEADER);
        let err = parse_export("alice.csv", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::InvalidDate { which: "start", .. }));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let err = parse_export("empty.csv", HEADER.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::NoRows(_)));
    }

    #[test]
    fn entity_names_must_be_plain_components() {
        assert!(validate_entity_name("Jane Doe").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b"] {
            assert!(validate_entity_name(bad).is_err(), "{:?}", bad);
        }
        let csv = format!("{}1,x,../etc,resolved,closed,2024-01-01,2024-01-05\n", HEADER);
        assert!(matches!(
            parse_export("evil.csv", csv.as_bytes()),
            Err(IngestError::InvalidEntity(_))
        ));
    }

    #[test]
    fn duplicate_headers_get_suffixes() {
        let headers = StringRecord::from(vec!["Status", "Status", "Status", "Status.1x"]);
        assert_eq!(
            dedupe_headers(&headers),
            vec!["Status", "Status.1", "Status.2", "Status.1x"]
        );
    }
}
