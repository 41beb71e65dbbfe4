use crate::error::{DashboardError, Result};
use crate::schema::AnalysisConfig;
use crate::table::{CellValue, Table};
use crate::utils::parse_number;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub fn load_csv_path<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        DashboardError::LoadError(format!("cannot open {}: {}", path.display(), e))
    })?;
    load_csv(file, config)
}

/// Parses delimited text into a [`Table`]. A column whose non-missing cells
/// all parse as numbers becomes numeric; any other column keeps its cells as
/// text. Headers are trimmed, text cells are kept verbatim.
pub fn load_csv<R: Read>(reader: R, config: &AnalysisConfig) -> Result<Table> {
    config.validate()?;

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(config.delimiter as u8)
        .trim(Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| DashboardError::LoadError(format!("failed to read header row: {}", e)))?
        .clone();

    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(DashboardError::LoadError(
            "source has no header row".to_string(),
        ));
    }

    let columns = dedupe_headers(&headers);
    let width = columns.len();

    let mut raw_rows: Vec<StringRecord> = Vec::new();
    for (idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| {
            DashboardError::LoadError(format!("failed to parse data row {}: {}", idx + 1, e))
        })?;

        if record.len() > width {
            return Err(DashboardError::LoadError(format!(
                "data row {} has {} fields, expected at most {}",
                idx + 1,
                record.len(),
                width
            )));
        }
        raw_rows.push(record);
    }

    let numeric_columns: Vec<bool> = (0..width)
        .map(|col| {
            raw_rows.iter().all(|record| match record.get(col) {
                Some(raw) if !config.is_missing_marker(raw) => parse_number(raw).is_some(),
                _ => true,
            })
        })
        .collect();

    let rows = raw_rows
        .iter()
        .map(|record| {
            (0..width)
                .map(|col| match record.get(col) {
                    Some(raw) if !config.is_missing_marker(raw) => {
                        to_cell(raw, numeric_columns[col])
                    }
                    _ => CellValue::Missing,
                })
                .collect()
        })
        .collect();

    let table = Table::from_rows(columns, rows);
    debug!(
        "Parsed {} rows across columns {:?}",
        table.row_count(),
        table.columns()
    );

    Ok(table)
}

fn to_cell(raw: &str, numeric_column: bool) -> CellValue {
    if numeric_column {
        match parse_number(raw) {
            Some(value) => CellValue::Number(value),
            None => CellValue::Missing,
        }
    } else {
        CellValue::Text(raw.to_string())
    }
}

/// Repeated header names get a `.N` suffix so every column stays addressable.
fn dedupe_headers(headers: &StringRecord) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut columns = Vec::with_capacity(headers.len());

    for header in headers.iter() {
        let mut name = header.to_string();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", header, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        columns.push(name);
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    fn load(content: &str) -> Result<Table> {
        load_csv(content.as_bytes(), &AnalysisConfig::default())
    }

    #[test]
    fn test_infers_numeric_and_text_columns() {
        let table = load("Date,Revenue,Category\n2024-01-01,100,Rent\n2024-01-02,250.5,Travel\n")
            .unwrap();

        assert_eq!(table.columns(), &["Date", "Revenue", "Category"]);
        assert_eq!(
            table.column_types(),
            &[ColumnType::Text, ColumnType::Numeric, ColumnType::Text]
        );
        assert_eq!(table.rows()[1][1], CellValue::Number(250.5));
    }

    #[test]
    fn test_missing_markers_become_missing() {
        let table = load("Revenue,Expense\n100,NA\n,40\nnull,n/a\n").unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.missing_count(0), 2);
        assert_eq!(table.missing_count(1), 2);
        assert_eq!(table.column_types(), &[ColumnType::Numeric, ColumnType::Numeric]);
    }

    #[test]
    fn test_mixed_column_is_text() {
        let table = load("Revenue\n100\nabc\n").unwrap();
        assert_eq!(table.column_type("Revenue"), Some(ColumnType::Text));
        assert_eq!(table.rows()[0][0], CellValue::Text("100".to_string()));
    }

    #[test]
    fn test_short_rows_padded_with_missing() {
        let table = load("Date,Revenue,Expense\n2024-01-01,100\n").unwrap();
        assert_eq!(table.rows()[0][2], CellValue::Missing);
    }

    #[test]
    fn test_long_row_is_load_error() {
        let err = load("A,B\n1,2,3\n").unwrap_err();
        assert!(matches!(err, DashboardError::LoadError(_)));
    }

    #[test]
    fn test_empty_source_is_load_error() {
        assert!(matches!(load("").unwrap_err(), DashboardError::LoadError(_)));
    }

    #[test]
    fn test_invalid_utf8_is_load_error() {
        let bytes: &[u8] = b"Revenue\n\xff\xfe\n";
        let err = load_csv(bytes, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, DashboardError::LoadError(_)));
    }

    #[test]
    fn test_duplicate_headers_are_suffixed() {
        let table = load("Revenue,Revenue,Revenue\n1,2,3\n").unwrap();
        assert_eq!(table.columns(), &["Revenue", "Revenue.1", "Revenue.2"]);
    }

    #[test]
    fn test_text_cells_keep_surrounding_whitespace() {
        let table = load(" Category , Expense\n Rent,10\nRent , 20\n  ,5\n").unwrap();
        assert_eq!(table.columns(), &["Category", "Expense"]);
        assert_eq!(table.column_type("Expense"), Some(ColumnType::Numeric));
        assert_eq!(table.rows()[0][0], CellValue::Text(" Rent".to_string()));
        assert_eq!(table.rows()[1][0], CellValue::Text("Rent ".to_string()));
        assert_eq!(table.rows()[1][1], CellValue::Number(20.0));
        assert_eq!(table.rows()[2][0], CellValue::Missing);
    }

    #[test]
    fn test_custom_delimiter() {
        let config = AnalysisConfig {
            delimiter: ';',
            ..AnalysisConfig::default()
        };
        let table = load_csv("Revenue;Expense\n1;2\n".as_bytes(), &config).unwrap();
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err =
            load_csv_path("/definitely/not/here.csv", &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, DashboardError::LoadError(_)));
    }
}
