use crate::error::{DashboardError, Result};
use crate::schema::{Column, ColumnType, SeriesPoint};
use crate::utils::{format_timestamp, parse_number};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum CellValue {
    Number(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Missing,
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    /// Text used when the cell is a grouping key or is written back to CSV.
    pub fn render(&self) -> String {
        match self {
            CellValue::Number(value) => value.to_string(),
            CellValue::Text(value) => value.clone(),
            CellValue::Timestamp(value) => format_timestamp(value),
            CellValue::Missing => String::new(),
        }
    }
}

/// Grouping key for category-like columns. Numbers order by value, so codes
/// `2` and `10` group as `2, 10`; numbers sort before text.
#[derive(Debug, Clone)]
pub enum GroupKey {
    Number(f64),
    Text(String),
}

impl GroupKey {
    fn of(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Missing => None,
            CellValue::Number(value) => Some(GroupKey::Number(*value)),
            other => Some(GroupKey::Text(other.render())),
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Number(a), GroupKey::Number(b)) => a.total_cmp(b),
            (GroupKey::Number(_), GroupKey::Text(_)) => Ordering::Less,
            (GroupKey::Text(_), GroupKey::Number(_)) => Ordering::Greater,
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Number(value) => write!(f, "{}", value),
            GroupKey::Text(value) => f.write_str(value),
        }
    }
}

/// Ordered rows of named cells. Every row has exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    column_types: Vec<ColumnType>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Builds a table and infers each column's type from its non-missing
    /// cells. Short rows are padded with [`CellValue::Missing`]; extra cells
    /// beyond the header are discarded.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows: Vec<Vec<CellValue>> = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Missing);
                row
            })
            .collect();

        let column_types = (0..width)
            .map(|idx| infer_column_type(rows.iter().map(|row| &row[idx])))
            .collect();

        Self {
            columns,
            column_types,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_types(&self) -> &[ColumnType] {
        &self.column_types
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Total number of cells (rows × columns).
    pub fn size(&self) -> usize {
        self.row_count() * self.column_count()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column_index(name).map(|idx| self.column_types[idx])
    }

    /// Whether a recognized column is present with a type its rules can read:
    /// numeric columns must be `Numeric`, `Date` must be `Temporal`, and
    /// `Category` may hold anything.
    pub fn supports(&self, column: Column) -> bool {
        match self.column_type(column.name()) {
            None => false,
            Some(kind) if column.is_numeric() => kind == ColumnType::Numeric,
            Some(kind) if column == Column::Date => kind == ColumnType::Temporal,
            Some(_) => true,
        }
    }

    /// Index of a recognized column, or `MissingColumn` when it cannot be read.
    pub fn require(&self, column: Column) -> Result<usize> {
        if !self.supports(column) {
            return Err(DashboardError::MissingColumn(column.name().to_string()));
        }
        self.column_index(column.name())
            .ok_or_else(|| DashboardError::MissingColumn(column.name().to_string()))
    }

    /// Names of all numeric columns, in source order.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .zip(self.column_types.iter())
            .filter(|(_, kind)| **kind == ColumnType::Numeric)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn missing_count(&self, idx: usize) -> usize {
        self.rows.iter().filter(|row| row[idx].is_missing()).count()
    }

    /// Non-missing values of a numeric column, in row order.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.numeric_index(name)?;
        Ok(self.rows.iter().filter_map(|row| row[idx].as_number()).collect())
    }

    /// Rows where both columns are present, as `(a, b)` pairs.
    pub fn paired_values(&self, a: &str, b: &str) -> Result<(Vec<f64>, Vec<f64>)> {
        let a_idx = self.numeric_index(a)?;
        let b_idx = self.numeric_index(b)?;

        Ok(self
            .rows
            .iter()
            .filter_map(|row| Some((row[a_idx].as_number()?, row[b_idx].as_number()?)))
            .unzip())
    }

    /// `(timestamp, value)` points of a numeric column against `Date`.
    pub fn time_series(&self, value: Column) -> Result<Vec<SeriesPoint>> {
        let date_idx = self.require(Column::Date)?;
        let value_idx = self.require(value)?;

        Ok(self
            .rows
            .iter()
            .filter_map(|row| {
                Some(SeriesPoint {
                    x: row[date_idx].as_timestamp()?,
                    y: row[value_idx].as_number()?,
                })
            })
            .collect())
    }

    /// `(label, value)` pairs of a numeric column against a grouping column.
    pub fn labeled_values(&self, label: Column, value: Column) -> Result<Vec<(GroupKey, f64)>> {
        let label_idx = self.require(label)?;
        let value_idx = self.require(value)?;

        Ok(self
            .rows
            .iter()
            .filter_map(|row| {
                Some((
                    GroupKey::of(&row[label_idx])?,
                    row[value_idx].as_number()?,
                ))
            })
            .collect())
    }

    pub fn write_csv<W: Write>(&self, writer: W, delimiter: u8) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);

        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(CellValue::render))?;
        }
        csv_writer.flush()?;

        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer, b',')?;
        String::from_utf8(buffer).map_err(|e| DashboardError::LoadError(e.to_string()))
    }

    fn numeric_index(&self, name: &str) -> Result<usize> {
        match self.column_index(name) {
            Some(idx) if self.column_types[idx] == ColumnType::Numeric => Ok(idx),
            _ => Err(DashboardError::MissingColumn(name.to_string())),
        }
    }

    pub(crate) fn retain_rows<F>(&mut self, keep: F)
    where
        F: FnMut(&Vec<CellValue>) -> bool,
    {
        self.rows.retain(keep);
    }

    /// Re-types text columns whose remaining cells all parse as numbers, so
    /// a table reads the same as one loaded from its own CSV output.
    pub(crate) fn promote_numeric_text(&mut self) -> Vec<usize> {
        let promoted: Vec<usize> = (0..self.column_count())
            .filter(|&idx| self.column_types[idx] == ColumnType::Text)
            .filter(|&idx| {
                self.rows.iter().all(|row| match &row[idx] {
                    CellValue::Text(raw) => parse_number(raw).is_some(),
                    CellValue::Missing => true,
                    _ => false,
                })
            })
            .collect();

        for &idx in &promoted {
            self.column_types[idx] = ColumnType::Numeric;
            for row in self.rows.iter_mut() {
                if let CellValue::Text(raw) = &row[idx] {
                    row[idx] = parse_number(raw).map_or(CellValue::Missing, CellValue::Number);
                }
            }
        }

        promoted
    }

    pub(crate) fn set_column(&mut self, idx: usize, kind: ColumnType, values: Vec<CellValue>) {
        self.column_types[idx] = kind;
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
    }

    pub(crate) fn sort_rows_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Vec<CellValue>, &Vec<CellValue>) -> std::cmp::Ordering,
    {
        // `sort_by` is stable, so equal keys keep their relative order.
        self.rows.sort_by(compare);
    }
}

fn infer_column_type<'a, I>(cells: I) -> ColumnType
where
    I: Iterator<Item = &'a CellValue>,
{
    let mut numeric = true;
    let mut temporal = true;
    let mut seen = false;

    for cell in cells {
        match cell {
            CellValue::Missing => continue,
            CellValue::Number(_) => temporal = false,
            CellValue::Timestamp(_) => numeric = false,
            CellValue::Text(_) => {
                numeric = false;
                temporal = false;
            }
        }
        seen = true;
    }

    match (seen, numeric, temporal) {
        (false, _, _) => ColumnType::Numeric,
        (true, true, _) => ColumnType::Numeric,
        (true, false, true) => ColumnType::Temporal,
        _ => ColumnType::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> CellValue {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        CellValue::Timestamp(date.and_hms_opt(0, 0, 0).unwrap())
    }

    fn sample() -> Table {
        Table::from_rows(
            vec![
                "Date".to_string(),
                "Revenue".to_string(),
                "Category".to_string(),
                "Note".to_string(),
            ],
            vec![
                vec![
                    ts(2024, 1, 1),
                    CellValue::Number(100.0),
                    CellValue::Text("Rent".to_string()),
                    CellValue::Missing,
                ],
                vec![
                    ts(2024, 1, 2),
                    CellValue::Number(200.0),
                    CellValue::Text("Travel".to_string()),
                    CellValue::Missing,
                ],
            ],
        )
    }

    #[test]
    fn test_type_inference() {
        let table = sample();
        assert_eq!(
            table.column_types(),
            &[
                ColumnType::Temporal,
                ColumnType::Numeric,
                ColumnType::Text,
                ColumnType::Numeric
            ]
        );
        assert_eq!(table.numeric_columns(), vec!["Revenue", "Note"]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = Table::from_rows(
            vec!["A".to_string(), "B".to_string()],
            vec![vec![CellValue::Number(1.0)]],
        );
        assert_eq!(table.rows()[0], vec![CellValue::Number(1.0), CellValue::Missing]);
        assert_eq!(table.missing_count(1), 1);
    }

    #[test]
    fn test_supports_and_require() {
        let table = sample();
        assert!(table.supports(Column::Date));
        assert!(table.supports(Column::Revenue));
        assert!(table.supports(Column::Category));
        assert!(!table.supports(Column::Expense));

        assert!(matches!(
            table.require(Column::Profit),
            Err(DashboardError::MissingColumn(name)) if name == "Profit"
        ));
    }

    #[test]
    fn test_text_revenue_is_not_supported() {
        let table = Table::from_rows(
            vec!["Revenue".to_string()],
            vec![vec![CellValue::Text("lots".to_string())]],
        );
        assert!(!table.supports(Column::Revenue));
        assert!(table.numeric_values("Revenue").is_err());
    }

    #[test]
    fn test_accessors() {
        let table = sample();
        assert_eq!(table.numeric_values("Revenue").unwrap(), vec![100.0, 200.0]);
        assert_eq!(table.size(), 8);

        let points = table.time_series(Column::Revenue).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].y, 200.0);

        let labeled = table
            .labeled_values(Column::Category, Column::Revenue)
            .unwrap();
        assert_eq!(labeled[0].0.to_string(), "Rent");
        assert_eq!(labeled[0].1, 100.0);
    }

    #[test]
    fn test_numeric_group_keys_order_by_value() {
        let mut keys = vec![
            GroupKey::Number(10.0),
            GroupKey::Text("b".to_string()),
            GroupKey::Number(2.0),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(rendered, vec!["2", "10", "b"]);
    }

    #[test]
    fn test_promote_numeric_text() {
        let mut table = Table::from_rows(
            vec!["Code".to_string(), "Label".to_string()],
            vec![
                vec![
                    CellValue::Text("123".to_string()),
                    CellValue::Text("x".to_string()),
                ],
                vec![
                    CellValue::Text(" 7".to_string()),
                    CellValue::Text("8".to_string()),
                ],
            ],
        );

        assert_eq!(table.promote_numeric_text(), vec![0]);
        assert_eq!(table.column_types(), &[ColumnType::Numeric, ColumnType::Text]);
        assert_eq!(table.rows()[1][0], CellValue::Number(7.0));
        assert_eq!(table.rows()[1][1], CellValue::Text("8".to_string()));
    }

    #[test]
    fn test_csv_output() {
        let csv = sample().to_csv_string().unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Date,Revenue,Category,Note"));
        assert_eq!(lines.next(), Some("2024-01-01,100,Rent,"));
        assert_eq!(lines.next(), Some("2024-01-02,200,Travel,"));
    }
}
