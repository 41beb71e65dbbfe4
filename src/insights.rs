use crate::error::Result;
use crate::schema::{AnalysisConfig, Column};
use crate::table::Table;
use crate::utils::{format_currency, format_percentage, grouped_sum, max_group, YearMonth};
use log::{debug, warn};
use statrs::statistics::Statistics;

/// An insight block gated on the columns it reads. Blocks run in the order of
/// [`INSIGHT_RULES`]: revenue, expense, profit, calendar.
struct InsightRule {
    name: &'static str,
    required: &'static [Column],
    derive: fn(&Table, &AnalysisConfig) -> Result<Vec<String>>,
}

const INSIGHT_RULES: &[InsightRule] = &[
    InsightRule {
        name: "revenue summary",
        required: &[Column::Revenue],
        derive: revenue_summary,
    },
    InsightRule {
        name: "expense summary",
        required: &[Column::Expense],
        derive: expense_summary,
    },
    InsightRule {
        name: "profit summary",
        required: &[Column::Profit],
        derive: profit_summary,
    },
    InsightRule {
        name: "peak revenue month",
        required: &[Column::Date, Column::Revenue],
        derive: peak_revenue_month,
    },
];

/// Ordered, human-readable statistics for the table. The order does not
/// depend on the column order of the source. Never fails: blocks whose
/// columns are unavailable are omitted, and an empty table yields nothing.
pub fn derive_insights(table: &Table, config: &AnalysisConfig) -> Vec<String> {
    if table.is_empty() {
        debug!("No rows to summarize; skipping insights");
        return Vec::new();
    }

    let mut insights = Vec::new();
    for rule in INSIGHT_RULES {
        if let Some(missing) = rule.required.iter().find(|c| !table.supports(**c)) {
            debug!("Skipping {} insights: column {} unavailable", rule.name, missing);
            continue;
        }

        match (rule.derive)(table, config) {
            Ok(lines) => insights.extend(lines),
            Err(e) => warn!("Skipping {} insights: {}", rule.name, e),
        }
    }

    insights
}

struct Summary {
    total: f64,
    mean: f64,
    max: f64,
    min: f64,
}

fn summarize(table: &Table, column: Column) -> Result<Summary> {
    let values = table.numeric_values(column.name())?;

    Ok(Summary {
        total: values.iter().sum(),
        mean: values.iter().mean(),
        max: Statistics::max(values.iter()),
        min: Statistics::min(values.iter()),
    })
}

fn total_of(table: &Table, column: Column) -> Result<f64> {
    Ok(table.numeric_values(column.name())?.iter().sum())
}

fn revenue_summary(table: &Table, config: &AnalysisConfig) -> Result<Vec<String>> {
    let symbol = config.currency_symbol.as_str();
    let revenue = summarize(table, Column::Revenue)?;

    let mut lines = vec![
        format!("Total Revenue: {}", format_currency(revenue.total, symbol)),
        format!("Average Revenue: {}", format_currency(revenue.mean, symbol)),
        format!("Max Revenue: {}", format_currency(revenue.max, symbol)),
        format!("Min Revenue: {}", format_currency(revenue.min, symbol)),
    ];

    if table.supports(Column::Date) {
        let mut points = table.time_series(Column::Revenue)?;
        points.sort_by_key(|p| p.x);
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            lines.push(format!(
                "Revenue Growth (Start to End): {}",
                format_currency(last.y - first.y, symbol)
            ));
        }
    }

    Ok(lines)
}

fn expense_summary(table: &Table, config: &AnalysisConfig) -> Result<Vec<String>> {
    let symbol = config.currency_symbol.as_str();
    let expense = summarize(table, Column::Expense)?;

    let mut lines = vec![
        format!("Total Expenses: {}", format_currency(expense.total, symbol)),
        format!("Average Expense: {}", format_currency(expense.mean, symbol)),
        format!("Max Expense: {}", format_currency(expense.max, symbol)),
        format!("Min Expense: {}", format_currency(expense.min, symbol)),
    ];

    if table.supports(Column::Category) {
        // Ties resolve to the first category in sorted order.
        let groups = grouped_sum(table.labeled_values(Column::Category, Column::Expense)?);
        if let Some(category) = max_group(&groups) {
            lines.push(format!("Top Expense Category: {}", category));
        }
    }

    Ok(lines)
}

fn profit_summary(table: &Table, config: &AnalysisConfig) -> Result<Vec<String>> {
    let symbol = config.currency_symbol.as_str();
    let profit = summarize(table, Column::Profit)?;

    let total_revenue = if table.supports(Column::Revenue) {
        total_of(table, Column::Revenue)?
    } else {
        0.0
    };
    let margin = if total_revenue != 0.0 {
        profit.total / total_revenue * 100.0
    } else {
        0.0
    };

    Ok(vec![
        format!("Total Profit: {}", format_currency(profit.total, symbol)),
        format!("Average Profit: {}", format_currency(profit.mean, symbol)),
        format!("Profit Margin: {}", format_percentage(margin)),
    ])
}

fn peak_revenue_month(table: &Table, _config: &AnalysisConfig) -> Result<Vec<String>> {
    let points = table.time_series(Column::Revenue)?;
    let months = grouped_sum(points.iter().map(|p| (YearMonth::of(&p.x), p.y)));

    Ok(max_group(&months)
        .map(|month| vec![format!("Month with Highest Revenue: {}", month)])
        .unwrap_or_default())
}
