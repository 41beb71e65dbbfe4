//! # Financial Dashboard Core
//!
//! A library for turning a tabular financial dataset (CSV with `Date`,
//! `Revenue`, `Expense`, `Profit` and `Category` columns, any of which may be
//! absent) into dashboard charts and plain-text insights.
//!
//! ## Core Concepts
//!
//! - **Preprocessing**: rows with any missing value are dropped and the table is
//!   sorted by `Date` when that column exists
//! - **Charts**: renderer-agnostic [`ChartSpec`]s keyed by stable [`ChartId`]s,
//!   each produced only when the columns it needs are present
//! - **Insights**: formatted statistics in a fixed order (revenue, expense,
//!   profit, calendar)
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_dashboard_core::*;
//!
//! let processor = FinancialDashboardProcessor::new(AnalysisConfig::default())?;
//! let analysis = processor.process_file("uploads/report.csv")?;
//!
//! for line in &analysis.insights {
//!     println!("{}", line);
//! }
//! let payload = analysis.to_json()?;
//! ```

pub mod charts;
pub mod error;
pub mod ingestion;
pub mod insights;
pub mod preprocess;
pub mod schema;
pub mod table;
pub mod utils;

pub use charts::{derive_charts, ChartMap};
pub use error::{DashboardError, Result};
pub use ingestion::{load_csv, load_csv_path};
pub use insights::derive_insights;
pub use preprocess::{clean, preprocess, preprocess_reader, DataProfile};
pub use schema::*;
pub use table::{CellValue, GroupKey, Table};
pub use utils::*;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Everything the presentation layer needs for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub charts: ChartMap,
    pub insights: Vec<String>,
}

impl Analysis {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct FinancialDashboardProcessor {
    config: AnalysisConfig,
}

impl FinancialDashboardProcessor {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn process_file<P: AsRef<Path>>(&self, path: P) -> Result<Analysis> {
        let table = preprocess(path, &self.config)?;
        Ok(self.analyze(&table))
    }

    pub fn process_reader<R: Read>(&self, reader: R) -> Result<Analysis> {
        let table = preprocess_reader(reader, &self.config)?;
        Ok(self.analyze(&table))
    }

    /// Derives charts and insights from an already cleaned table.
    pub fn analyze(&self, table: &Table) -> Analysis {
        analyze(table, &self.config)
    }
}

pub fn analyze(table: &Table, config: &AnalysisConfig) -> Analysis {
    for column in Column::ALL {
        if table.has_column(column.name()) && !table.supports(column) {
            warn!(
                "Column {} has type {:?} and will be ignored",
                column,
                table.column_type(column.name())
            );
        }
    }

    let charts = derive_charts(table);
    let insights = derive_insights(table, config);

    info!(
        "Analysis produced {} charts and {} insights from {} rows",
        charts.len(),
        insights.len(),
        table.row_count()
    );

    Analysis { charts, insights }
}

pub fn analyze_file<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> Result<Analysis> {
    FinancialDashboardProcessor::new(config.clone())?.process_file(path)
}
