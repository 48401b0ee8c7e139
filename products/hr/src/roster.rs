//! Tabular roster uploads: header checks and per-row decoding.

use std::collections::HashSet;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use crate::employee::EmployeeInput;

/// Column names a roster must carry, in the same convention as the JSON API.
pub const REQUIRED_COLUMNS: [&str; 12] = [
    "E_ID",
    "E_Name",
    "email",
    "address1",
    "address2",
    "role",
    "mobile",
    "altMobile",
    "latitude",
    "longitude",
    "physicalAddress",
    "userStatus",
];

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Only CSV files are allowed.")]
    NotCsv,
    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("CSV file is not valid UTF-8")]
    Encoding,
    #[error("unreadable CSV: {0}")]
    Unreadable(#[from] csv::Error),
}

/// One data row; `row` is the 1-based position below the header.
#[derive(Debug)]
pub struct RosterRow {
    pub row: usize,
    pub entry: Result<EmployeeInput, String>,
}

/// Reject uploads whose file name does not end in `.csv`.
pub fn ensure_csv_filename(file_name: &str) -> Result<(), RosterError> {
    if file_name.to_ascii_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(RosterError::NotCsv)
    }
}

/// Decode a roster. Structural problems (encoding, header, missing
/// columns) fail the whole file; anything wrong inside a row is kept on that
/// row so the caller can carry on with the rest.
pub fn parse_roster(contents: &[u8]) -> Result<Vec<RosterRow>, RosterError> {
    let text = std::str::from_utf8(contents).map_err(|_| RosterError::Encoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let present: HashSet<&str> = headers.iter().collect();
    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !present.contains(*column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(RosterError::MissingColumns(missing));
    }

    let rows = reader
        .records()
        .enumerate()
        .map(|(index, record)| RosterRow {
            row: index + 1,
            entry: record
                .and_then(|record| record.deserialize::<EmployeeInput>(Some(&headers)))
                .map_err(|err| describe_row_error(&err, &headers)),
        })
        .collect();
    Ok(rows)
}

fn describe_row_error(err: &csv::Error, headers: &StringRecord) -> String {
    match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => {
            match err.field().and_then(|index| headers.get(index as usize)) {
                Some(column) => format!("{column}: {}", err.kind()),
                None => err.kind().to_string(),
            }
        }
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {expected_len} fields, found {len}"),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use entity::employees::UserStatus;

    use super::*;

    const HEADER: &str = "E_ID,E_Name,email,address1,address2,role,mobile,altMobile,latitude,longitude,physicalAddress,userStatus";

    #[test]
    fn filename_check_is_case_insensitive() {
        assert!(ensure_csv_filename("staff.CSV").is_ok());
        assert!(matches!(
            ensure_csv_filename("staff.xlsx"),
            Err(RosterError::NotCsv)
        ));
    }

    #[test]
    fn missing_columns_fail_the_whole_file() {
        let csv = "E_ID,E_Name,email\n1,Jane,jane@example.com\n";
        let err = parse_roster(csv.as_bytes()).unwrap_err();
        let missing = match err {
            RosterError::MissingColumns(missing) => missing,
            other => panic!("expected missing columns, got {other:?}"),
        };
        assert_eq!(missing.len(), 9);
        assert!(missing.contains(&"userStatus".to_string()));
        assert!(!missing.contains(&"email".to_string()));
    }

    #[test]
    fn rows_decode_independently() {
        let csv = format!(
            "\u{feff}{HEADER}\n\
             240705, Jane Doe ,jane@example.com,1 Main St,,engineer,5550100,,12.97,77.59,Block A,active\n\
             abc,John Roe,john@example.com,2 Main St,,engineer,5550101,,12.97,77.59,Block B,active\n\
             7,Ann Lee,ann@example.com,3 Main St,Flat 2,manager,5550102,5550103,1.5,2.5,Block C,Inactive\n"
        );
        let rows = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.iter().map(|r| r.row).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let first = rows[0].entry.as_ref().unwrap();
        assert_eq!(first.employee_id, 240705);
        assert_eq!(first.name, "Jane Doe");
        assert_eq!(first.address2, None);

        let second = rows[1].entry.as_ref().unwrap_err();
        assert!(second.starts_with("E_ID:"), "{second}");

        let third = rows[2].entry.as_ref().unwrap();
        assert_eq!(third.alt_mobile.as_deref(), Some("5550103"));
        assert_eq!(third.user_status, UserStatus::Inactive);
    }

    #[test]
    fn user_status_is_case_insensitive_and_errors_name_the_column() {
        let csv = format!(
            "{HEADER}\n\
             1,Ann Lee,ann@example.com,1 Main St,,engineer,5550101,,1.0,2.0,Block A,aCtive\n\
             2,Bob Ray,bob@example.com,2 Main St,,engineer,5550102,,1.0,2.0,Block B,pending"
        );
        let rows = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].entry.as_ref().unwrap().user_status, UserStatus::Active);
        let reason = rows[1].entry.as_ref().unwrap_err();
        assert!(reason.starts_with("userStatus: unknown variant `pending`"), "{reason}");
    }

    #[test]
    fn nan_coordinates_decode_and_are_left_to_validation() {
        let csv = format!(
            "{HEADER}\n1,Ann Lee,ann@example.com,1 Main St,,engineer,5550101,,NaN,2.0,Block A,active"
        );
        let rows = parse_roster(csv.as_bytes()).unwrap();
        assert!(rows[0].entry.as_ref().unwrap().latitude.is_nan());
    }

    #[test]
    fn ragged_rows_are_reported_per_row() {
        let csv = format!("{HEADER}\n1,Jane\n");
        let rows = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].entry.as_ref().unwrap_err(), "expected 12 fields, found 2");
    }

    #[test]
    fn invalid_utf8_is_structural() {
        let bytes = [0xff, 0xfe, 0x00];
        assert!(matches!(parse_roster(&bytes), Err(RosterError::Encoding)));
    }
}
