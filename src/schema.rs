use crate::error::{DashboardError, Result};
use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns the analyzer knows how to interpret. Any other column is carried
/// through cleaning untouched and only takes part in the correlation heatmap
/// when it happens to be numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Column {
    Date,
    Revenue,
    Expense,
    Profit,
    Category,
}

impl Column {
    pub const ALL: [Column; 5] = [
        Column::Date,
        Column::Revenue,
        Column::Expense,
        Column::Profit,
        Column::Category,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Revenue => "Revenue",
            Column::Expense => "Expense",
            Column::Profit => "Profit",
            Column::Category => "Category",
        }
    }

    /// Whether rules reading this column expect `f64` values.
    pub fn is_numeric(self) -> bool {
        matches!(self, Column::Revenue | Column::Expense | Column::Profit)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Text,
    Temporal,
}

/// Stable keys of the chart mapping handed to the renderer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    RevenueLine,
    RevenueArea,
    ProfitLine,
    RevVsExp,
    ExpensesPie,
    ExpensesBar,
    Heatmap,
    MonthlyRevenue,
}

impl ChartId {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartId::RevenueLine => "revenue_line",
            ChartId::RevenueArea => "revenue_area",
            ChartId::ProfitLine => "profit_line",
            ChartId::RevVsExp => "rev_vs_exp",
            ChartId::ExpensesPie => "expenses_pie",
            ChartId::ExpensesBar => "expenses_bar",
            ChartId::Heatmap => "heatmap",
            ChartId::MonthlyRevenue => "monthly_revenue",
        }
    }
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LineShape {
    Linear,
    #[schemars(description = "Renderer should draw a smoothed curve through the points")]
    Spline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ChartKind {
    Line { shape: LineShape },
    Area,
    Pie,
    Bar,
    Heatmap {
        #[schemars(description = "Whether each cell should display its value")]
        annotated: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SeriesPoint {
    pub x: NaiveDateTime,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Series {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ChartData {
    /// One or more series sharing a temporal x axis.
    TimeSeries { series: Vec<Series> },

    /// Label/value pairs, used by pie and bar charts.
    Categorical { labels: Vec<String>, values: Vec<f64> },

    /// Square matrix indexed by `labels` on both axes. `None` marks an
    /// undefined cell.
    Matrix {
        labels: Vec<String>,
        cells: Vec<Vec<Option<f64>>>,
    },
}

/// Renderer-agnostic description of a single chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

const DEFAULT_DATE_FORMATS: [&str; 11] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%Y-%m",
];

const DEFAULT_MISSING_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    #[schemars(description = "Symbol prefixed to every currency amount in the insights")]
    pub currency_symbol: String,

    #[schemars(
        description = "chrono format strings tried in order when coercing the Date column. RFC 3339 timestamps are always accepted. Date-only formats resolve to midnight."
    )]
    pub date_formats: Vec<String>,

    #[schemars(
        description = "Cell contents (after trimming) treated as missing values. Empty cells are always missing."
    )]
    pub missing_markers: Vec<String>,

    #[schemars(description = "Single ASCII field delimiter of the source file")]
    pub delimiter: char,

    #[schemars(description = "Number of samples produced when smoothing a spline-shaped series")]
    pub smoothing_resolution: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "₹".to_string(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            missing_markers: DEFAULT_MISSING_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            delimiter: ',',
            smoothing_resolution: 100,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.date_formats.is_empty() {
            return Err(DashboardError::InvalidConfig(
                "at least one date format is required".to_string(),
            ));
        }

        if !self.delimiter.is_ascii() {
            return Err(DashboardError::InvalidConfig(format!(
                "delimiter '{}' is not a single ASCII character",
                self.delimiter
            )));
        }

        if self.smoothing_resolution < 2 {
            return Err(DashboardError::InvalidConfig(format!(
                "smoothing resolution must be at least 2, got {}",
                self.smoothing_resolution
            )));
        }

        Ok(())
    }

    pub fn is_missing_marker(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        trimmed.is_empty() || self.missing_markers.iter().any(|m| m == trimmed)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalysisConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
