use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt;

/// Calendar month bucket used for monthly aggregation. Orders chronologically
/// and renders as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(timestamp: &NaiveDateTime) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Parses a numeric cell, ignoring surrounding whitespace. NaN is treated as
/// missing rather than as a number.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parses a raw `Date` cell. RFC 3339 is tried first, then each format in
/// order. Date-only formats resolve to midnight and formats without a day
/// component (e.g. `%Y-%m`) resolve to the first of the month.
pub fn parse_timestamp(raw: &str, formats: &[String]) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }

    for format in formats {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }

        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }

        if !format.contains("%d") && !format.contains("%e") {
            let padded = format!("{} 01", raw);
            let padded_format = format!("{} %d", format);
            if let Ok(date) = NaiveDate::parse_from_str(&padded, &padded_format) {
                return Some(date.and_time(NaiveTime::MIN));
            }
        }
    }

    None
}

/// Inverse of [`parse_timestamp`] for the default formats: midnight values are
/// written as plain dates.
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    if timestamp.time() == NaiveTime::MIN {
        timestamp.format("%Y-%m-%d").to_string()
    } else {
        timestamp.format("%Y-%m-%d %H:%M:%S%.f").to_string()
    }
}

/// `₹1,234.50` style amount. The sign follows the symbol (`₹-50.00`).
pub fn format_currency(value: f64, symbol: &str) -> String {
    format!("{}{}", symbol, format_grouped(value, 2))
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Fixed-precision decimal with comma thousands separators.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (idx, digit) in digits.iter().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Sums values per key in a single pass. Keys come back in sorted order.
pub fn grouped_sum<K, I>(pairs: I) -> BTreeMap<K, f64>
where
    K: Ord,
    I: IntoIterator<Item = (K, f64)>,
{
    let mut groups = BTreeMap::new();
    for (key, value) in pairs {
        *groups.entry(key).or_insert(0.0) += value;
    }
    groups
}

/// Key with the largest total. Ties keep the first key in iteration order.
pub fn max_group<K>(groups: &BTreeMap<K, f64>) -> Option<&K> {
    let mut best: Option<(&K, f64)> = None;
    for (key, &total) in groups {
        match best {
            Some((_, best_total)) if total <= best_total => {}
            _ => best = Some((key, total)),
        }
    }
    best.map(|(key, _)| key)
}

/// Pearson correlation coefficient.
///
/// Formula: r = Σ[(xi - x̄)(yi - ȳ)] / sqrt(Σ(xi - x̄)² × Σ(yi - ȳ)²)
///
/// Returns `None` when the coefficient is undefined: mismatched lengths, fewer
/// than two observations, or a series with zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let mean_x = x.iter().mean();
    let mean_y = y.iter().mean();

    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_yy = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sum_xy += dx * dy;
        sum_xx += dx * dx;
        sum_yy += dy * dy;
    }

    let denominator = (sum_xx * sum_yy).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }

    Some((sum_xy / denominator).clamp(-1.0, 1.0))
}
