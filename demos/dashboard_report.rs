use financial_dashboard_core::*;
use std::env;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/data/sample_financials.csv".to_string());
    let config = AnalysisConfig::default();

    let raw = load_csv_path(&path, &config)?;
    let profile = DataProfile::of(&raw);

    println!("\n--- EDA Report ---");
    println!("Shape of data: ({}, {})", profile.rows, profile.columns);
    println!("Size of data: {}", profile.size);
    println!("Missing values:");
    for (column, count) in &profile.missing {
        println!("  {:<12} {}", column, count);
    }
    println!("--- End of EDA Report ---\n");

    let table = clean(raw, &config)?;
    let analysis = analyze(&table, &config);

    println!("Charts:");
    for (id, chart) in &analysis.charts {
        println!("  {:<16} {:?} \"{}\"", id.as_str(), chart.kind, chart.title);
    }

    println!("\nInsights:");
    for line in &analysis.insights {
        println!("  {}", line);
    }

    if let Some(profit) = analysis.charts.get(&ChartId::ProfitLine) {
        if let Some(smoothed) = profit.smoothed(config.smoothing_resolution) {
            let samples: usize = smoothed.iter().map(|s| s.points.len()).sum();
            println!("\nSmoothed profit curve: {} samples", samples);
        }
    }

    Ok(())
}
