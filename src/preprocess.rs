use crate::error::{DashboardError, Result};
use crate::ingestion::{load_csv, load_csv_path};
use crate::schema::{AnalysisConfig, Column, ColumnType};
use crate::table::{CellValue, Table};
use crate::utils::parse_timestamp;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Shape and missing-value summary of a raw table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProfile {
    pub rows: usize,
    pub columns: usize,
    /// Total cell count.
    pub size: usize,
    /// Missing cells per column, in column order.
    pub missing: Vec<(String, usize)>,
}

impl DataProfile {
    pub fn of(table: &Table) -> Self {
        let missing = table
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), table.missing_count(idx)))
            .collect();

        Self {
            rows: table.row_count(),
            columns: table.column_count(),
            size: table.size(),
            missing,
        }
    }

    pub fn total_missing(&self) -> usize {
        self.missing.iter().map(|(_, count)| count).sum()
    }

    pub fn log(&self) {
        info!(
            "Data shape: ({}, {}), size: {}, missing cells: {}",
            self.rows,
            self.columns,
            self.size,
            self.total_missing()
        );
        for (column, count) in &self.missing {
            debug!("Missing values in {}: {}", column, count);
        }
    }
}

/// Loads a CSV file and cleans it. See [`clean`].
pub fn preprocess<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> Result<Table> {
    info!("Preprocessing {}", path.as_ref().display());
    let table = load_csv_path(path, config)?;
    clean(table, config)
}

pub fn preprocess_reader<R: Read>(reader: R, config: &AnalysisConfig) -> Result<Table> {
    let table = load_csv(reader, config)?;
    clean(table, config)
}

/// Logs the table profile, drops every row holding a missing cell, re-types
/// text columns left holding only numbers, then coerces `Date` to timestamps
/// and stable-sorts the rows by it.
///
/// Any `Date` value that cannot be parsed fails the whole call. Running
/// `clean` on its own output returns an identical table.
pub fn clean(mut table: Table, config: &AnalysisConfig) -> Result<Table> {
    DataProfile::of(&table).log();

    let before = table.row_count();
    let kept_rows: Vec<usize> = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| !row.iter().any(CellValue::is_missing))
        .map(|(idx, _)| idx)
        .collect();
    table.retain_rows(|row| !row.iter().any(CellValue::is_missing));

    if table.row_count() < before {
        info!(
            "Dropped {} of {} rows containing missing values",
            before - table.row_count(),
            before
        );
    }

    for idx in table.promote_numeric_text() {
        debug!("Column {} is numeric once incomplete rows are dropped", table.columns()[idx]);
    }

    if let Some(date_idx) = table.column_index(Column::Date.name()) {
        let timestamps = table
            .rows()
            .iter()
            .zip(kept_rows.iter())
            .map(|(row, source_row)| coerce_timestamp(&row[date_idx], *source_row + 1, config))
            .collect::<Result<Vec<CellValue>>>()?;

        table.set_column(date_idx, ColumnType::Temporal, timestamps);
        table.sort_rows_by(|a, b| a[date_idx].as_timestamp().cmp(&b[date_idx].as_timestamp()));
        debug!("Sorted {} rows by {}", table.row_count(), Column::Date);
    }

    Ok(table)
}

fn coerce_timestamp(
    cell: &CellValue,
    source_row: usize,
    config: &AnalysisConfig,
) -> Result<CellValue> {
    if let CellValue::Timestamp(_) = cell {
        return Ok(cell.clone());
    }

    let raw = cell.render();
    parse_timestamp(&raw, &config.date_formats)
        .map(CellValue::Timestamp)
        .ok_or_else(|| DashboardError::DateParseError {
            row: source_row,
            value: raw.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_csv(content: &str) -> Result<Table> {
        preprocess_reader(content.as_bytes(), &AnalysisConfig::default())
    }

    #[test]
    fn test_profile_counts() {
        let table = load_csv(
            "Revenue,Expense,Note\n100,,x\n200,50,\n,,\n".as_bytes(),
            &AnalysisConfig::default(),
        )
        .unwrap();

        let profile = DataProfile::of(&table);
        assert_eq!(profile.rows, 3);
        assert_eq!(profile.columns, 3);
        assert_eq!(profile.size, 9);
        assert_eq!(
            profile.missing,
            vec![
                ("Revenue".to_string(), 1),
                ("Expense".to_string(), 2),
                ("Note".to_string(), 2)
            ]
        );
        assert_eq!(profile.total_missing(), 5);
    }

    #[test]
    fn test_rows_with_any_missing_value_are_dropped() {
        let table = clean_csv("Revenue,Expense,Note\n100,40,a\n200,,b\n300,60,\n400,70,d\n").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.numeric_values("Revenue").unwrap(), vec![100.0, 400.0]);
    }

    #[test]
    fn test_sorts_by_date_stably() {
        let table = clean_csv(
            "Date,Revenue\n2024-03-01,3\n2024-01-01,1\n2024-02-01,2\n2024-01-01,4\n",
        )
        .unwrap();

        assert_eq!(table.column_type("Date"), Some(ColumnType::Temporal));
        assert_eq!(
            table.numeric_values("Revenue").unwrap(),
            vec![1.0, 4.0, 2.0, 3.0]
        );
    }

    #[test]
    fn test_bad_date_fails_whole_call() {
        let err = clean_csv("Date,Revenue\n2024-01-01,1\nyesterday,2\n").unwrap_err();
        match err {
            DashboardError::DateParseError { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bad_date_in_dropped_row_is_ignored() {
        let table = clean_csv("Date,Revenue\n2024-01-01,1\nyesterday,\n").unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let config = AnalysisConfig::default();
        let once = clean_csv(
            "Date,Revenue,Category\n2024-02-01,5,Rent\n2024-01-01,,Food\n2024-01-15,7,Food\n",
        )
        .unwrap();
        let twice = clean(once.clone(), &config).unwrap();
        assert_eq!(once, twice);

        let reloaded = preprocess_reader(once.to_csv_string().unwrap().as_bytes(), &config).unwrap();
        assert_eq!(once, reloaded);
    }

    #[test]
    fn test_column_numeric_after_drop_survives_csv_round_trip() {
        let config = AnalysisConfig::default();
        let once = clean_csv("Note,Revenue\nabc,\n123,5\n").unwrap();

        assert_eq!(
            once.column_types(),
            &[ColumnType::Numeric, ColumnType::Numeric]
        );
        assert_eq!(once.rows()[0][0], CellValue::Number(123.0));

        let reloaded = preprocess_reader(once.to_csv_string().unwrap().as_bytes(), &config).unwrap();
        assert_eq!(once, reloaded);
        assert_eq!(clean(once.clone(), &config).unwrap(), once);
    }

    #[test]
    fn test_whitespace_text_survives_csv_round_trip() {
        let config = AnalysisConfig::default();
        let once = clean_csv("Category,Expense\n Rent,10\nRent,20\n").unwrap();

        let reloaded = preprocess_reader(once.to_csv_string().unwrap().as_bytes(), &config).unwrap();
        assert_eq!(once, reloaded);
    }

    #[test]
    fn test_table_without_date_keeps_order() {
        let table = clean_csv("Revenue\n3\n1\n2\n").unwrap();
        assert_eq!(table.numeric_values("Revenue").unwrap(), vec![3.0, 1.0, 2.0]);
    }
}
