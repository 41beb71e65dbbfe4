use crate::error::Result;
use crate::schema::{
    ChartData, ChartId, ChartKind, ChartSpec, Column, LineShape, Series, SeriesPoint,
};
use crate::table::Table;
use crate::utils::{grouped_sum, pearson, YearMonth};
use chrono::{DateTime, NaiveDateTime};
use log::{debug, warn};
use splines::{Interpolation, Key, Spline};
use std::collections::BTreeMap;

pub type ChartMap = BTreeMap<ChartId, ChartSpec>;

/// A chart derivation gated on the columns it reads. Rules whose columns are
/// not all usable are skipped.
struct ChartRule {
    name: &'static str,
    required: &'static [Column],
    derive: fn(&Table) -> Result<Vec<(ChartId, ChartSpec)>>,
}

const CHART_RULES: &[ChartRule] = &[
    ChartRule {
        name: "revenue trend",
        required: &[Column::Date, Column::Revenue],
        derive: revenue_trend,
    },
    ChartRule {
        name: "profit trend",
        required: &[Column::Date, Column::Profit],
        derive: profit_trend,
    },
    ChartRule {
        name: "revenue vs expense",
        required: &[Column::Date, Column::Revenue, Column::Expense],
        derive: revenue_vs_expense,
    },
    ChartRule {
        name: "expense breakdown",
        required: &[Column::Category, Column::Expense],
        derive: expense_breakdown,
    },
    ChartRule {
        name: "correlation heatmap",
        required: &[],
        derive: correlation_heatmap,
    },
    ChartRule {
        name: "monthly revenue",
        required: &[Column::Date, Column::Revenue],
        derive: monthly_revenue,
    },
];

/// Builds every chart the table's columns allow. Never fails: a rule that is
/// not applicable, or that cannot read its columns, contributes nothing.
pub fn derive_charts(table: &Table) -> ChartMap {
    let mut charts = ChartMap::new();

    for rule in CHART_RULES {
        if let Some(missing) = rule.required.iter().find(|c| !table.supports(**c)) {
            debug!("Skipping {} chart: column {} unavailable", rule.name, missing);
            continue;
        }

        match (rule.derive)(table) {
            Ok(derived) => charts.extend(derived),
            Err(e) => warn!("Skipping {} chart: {}", rule.name, e),
        }
    }

    charts
}

fn time_series_chart(
    kind: ChartKind,
    title: &str,
    y_label: &str,
    series: Vec<Series>,
) -> ChartSpec {
    ChartSpec {
        kind,
        title: title.to_string(),
        x_label: Column::Date.name().to_string(),
        y_label: y_label.to_string(),
        data: ChartData::TimeSeries { series },
    }
}

fn series_of(table: &Table, column: Column) -> Result<Series> {
    Ok(Series {
        name: column.name().to_string(),
        points: table.time_series(column)?,
    })
}

fn revenue_trend(table: &Table) -> Result<Vec<(ChartId, ChartSpec)>> {
    let revenue = series_of(table, Column::Revenue)?;

    Ok(vec![
        (
            ChartId::RevenueLine,
            time_series_chart(
                ChartKind::Line {
                    shape: LineShape::Linear,
                },
                "Revenue Over Time",
                Column::Revenue.name(),
                vec![revenue.clone()],
            ),
        ),
        (
            ChartId::RevenueArea,
            time_series_chart(
                ChartKind::Area,
                "Cumulative Revenue Growth",
                Column::Revenue.name(),
                vec![revenue],
            ),
        ),
    ])
}

fn profit_trend(table: &Table) -> Result<Vec<(ChartId, ChartSpec)>> {
    Ok(vec![(
        ChartId::ProfitLine,
        time_series_chart(
            ChartKind::Line {
                shape: LineShape::Spline,
            },
            "Profit Over Time",
            Column::Profit.name(),
            vec![series_of(table, Column::Profit)?],
        ),
    )])
}

fn revenue_vs_expense(table: &Table) -> Result<Vec<(ChartId, ChartSpec)>> {
    Ok(vec![(
        ChartId::RevVsExp,
        time_series_chart(
            ChartKind::Line {
                shape: LineShape::Linear,
            },
            "Revenue vs Expense Over Time",
            "Amount",
            vec![
                series_of(table, Column::Revenue)?,
                series_of(table, Column::Expense)?,
            ],
        ),
    )])
}

/// Pie and bar share one grouping so both show the same categories, in the
/// same order, with the same totals.
fn expense_breakdown(table: &Table) -> Result<Vec<(ChartId, ChartSpec)>> {
    let groups = grouped_sum(table.labeled_values(Column::Category, Column::Expense)?);
    let (labels, values): (Vec<String>, Vec<f64>) = groups
        .into_iter()
        .map(|(category, total)| (category.to_string(), total))
        .unzip();

    let data = ChartData::Categorical { labels, values };
    let chart = |kind: ChartKind, title: &str| ChartSpec {
        kind,
        title: title.to_string(),
        x_label: Column::Category.name().to_string(),
        y_label: Column::Expense.name().to_string(),
        data: data.clone(),
    };

    Ok(vec![
        (ChartId::ExpensesPie, chart(ChartKind::Pie, "Expenses by Category")),
        (ChartId::ExpensesBar, chart(ChartKind::Bar, "Top Expense Categories")),
    ])
}

fn correlation_heatmap(table: &Table) -> Result<Vec<(ChartId, ChartSpec)>> {
    let numeric = table.numeric_columns();
    if numeric.len() < 2 {
        debug!("Skipping correlation heatmap: {} numeric column(s)", numeric.len());
        return Ok(Vec::new());
    }

    let mut cells = Vec::with_capacity(numeric.len());
    for row in &numeric {
        let mut cell_row = Vec::with_capacity(numeric.len());
        for col in &numeric {
            let (x, y) = table.paired_values(row, col)?;
            cell_row.push(pearson(&x, &y));
        }
        cells.push(cell_row);
    }

    Ok(vec![(
        ChartId::Heatmap,
        ChartSpec {
            kind: ChartKind::Heatmap { annotated: true },
            title: "Correlation Heatmap".to_string(),
            x_label: String::new(),
            y_label: String::new(),
            data: ChartData::Matrix {
                labels: numeric.iter().map(|name| name.to_string()).collect(),
                cells,
            },
        },
    )])
}

fn monthly_revenue(table: &Table) -> Result<Vec<(ChartId, ChartSpec)>> {
    let points = table.time_series(Column::Revenue)?;
    let months = grouped_sum(points.iter().map(|p| (YearMonth::of(&p.x), p.y)));

    let (labels, values): (Vec<String>, Vec<f64>) = months
        .into_iter()
        .map(|(month, total)| (month.to_string(), total))
        .unzip();

    Ok(vec![(
        ChartId::MonthlyRevenue,
        ChartSpec {
            kind: ChartKind::Bar,
            title: "Monthly Revenue Trend".to_string(),
            x_label: "Month".to_string(),
            y_label: Column::Revenue.name().to_string(),
            data: ChartData::Categorical { labels, values },
        },
    )])
}

impl ChartSpec {
    /// Samples spline-shaped series along a Catmull-Rom curve, for renderers
    /// that draw straight segments only. Returns `None` for any other chart.
    pub fn smoothed(&self, resolution: usize) -> Option<Vec<Series>> {
        let series = match (&self.kind, &self.data) {
            (
                ChartKind::Line {
                    shape: LineShape::Spline,
                },
                ChartData::TimeSeries { series },
            ) => series,
            _ => return None,
        };

        Some(
            series
                .iter()
                .map(|s| Series {
                    name: s.name.clone(),
                    points: smooth_points(&s.points, resolution),
                })
                .collect(),
        )
    }
}

fn smooth_points(points: &[SeriesPoint], resolution: usize) -> Vec<SeriesPoint> {
    // Equal timestamps collapse to their mean so knots are strictly increasing.
    let mut knots: Vec<(f64, f64, usize)> = Vec::new();
    for point in points {
        let t = point.x.and_utc().timestamp() as f64;
        match knots.last_mut() {
            Some((last_t, sum, count)) if *last_t == t => {
                *sum += point.y;
                *count += 1;
            }
            _ => knots.push((t, point.y, 1)),
        }
    }
    let knots: Vec<(f64, f64)> = knots
        .into_iter()
        .map(|(t, sum, count)| (t, sum / count as f64))
        .collect();

    if knots.len() < 2 || resolution < 2 {
        return points.to_vec();
    }

    let (first_t, first_v) = knots[0];
    let (second_t, second_v) = knots[1];
    let (last_t, last_v) = knots[knots.len() - 1];
    let (before_last_t, before_last_v) = knots[knots.len() - 2];

    // Catmull-Rom needs a neighbour on each side of a segment, so the curve
    // is extended linearly by one phantom knot at each end.
    let mut keys = Vec::with_capacity(knots.len() + 2);
    keys.push(Key::new(
        first_t - (second_t - first_t),
        first_v - (second_v - first_v),
        Interpolation::CatmullRom,
    ));
    keys.extend(
        knots
            .iter()
            .map(|(t, v)| Key::new(*t, *v, Interpolation::CatmullRom)),
    );
    keys.push(Key::new(
        last_t + (last_t - before_last_t),
        last_v + (last_v - before_last_v),
        Interpolation::CatmullRom,
    ));
    let spline = Spline::from_vec(keys);

    (0..resolution)
        .filter_map(|step| {
            let t = first_t + (last_t - first_t) * step as f64 / (resolution - 1) as f64;
            let value = if step + 1 == resolution {
                last_v
            } else {
                spline.sample(t).unwrap_or(last_v)
            };
            Some(SeriesPoint {
                x: timestamp_from_secs(t)?,
                y: value,
            })
        })
        .collect()
}

fn timestamp_from_secs(secs: f64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs.round() as i64, 0).map(|dt| dt.naive_utc())
}
