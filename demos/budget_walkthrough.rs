// Walks through a budget forecast for three product groups
use sales_budget_workspace::forecast::error::Result;
use sales_budget_workspace::forecast::report::monthly_totals;
use sales_budget_workspace::forecast::{
    BudgetForecaster, BudgetScenario, DataLoader, ForecastConfig, ParameterBundle, SalesRow,
};

fn main() -> Result<()> {
    println!("Sales budget walkthrough\n");

    let config = ForecastConfig::from_toml_str(
        r#"
        organic_cap = 0.30
        decay_floor = 0.85
        "#,
    )?;

    let dataset = DataLoader::from_config(&config).from_rows(sample_rows())?;
    println!(
        "Loaded {} groups, history {:?}, forecasting {} (realized through {:?})",
        dataset.groups().len(),
        dataset.history_years(),
        dataset.forecast_year(),
        dataset.realized_through()
    );

    let params = ParameterBundle::builder()
        .config(&config)
        .all_months_rate(0.10)
        .parse_group_target("Garden", "0.18")
        .parse_lesson("Kitchen", 11, "8")
        .parse_lesson("Kitchen", 12, "-4")
        .parse_price_change("Tools", 9, "0,06")
        .parse_price_change("Garden", 12, "*")
        .margin_improvement(0.01)
        .stock_change(-0.05)
        .inflation(64.0, 42.0)
        .scenario(BudgetScenario::Normal)
        .build();

    let run = BudgetForecaster::new(&dataset)
        .with_config(config)?
        .compute(&params)?;

    println!("\n=== Yearly summary ===");
    for (year, stats) in run.summary() {
        println!(
            "{}: sales {:>12.0}  gross margin {:>5.1}%  avg stock {:>10.0}  coverage {:>4.1} weeks",
            year, stats.total_sales, stats.gross_margin_pct, stats.avg_stock, stats.stock_cogs_weeks
        );
    }

    println!("\n=== Forecast by month ===");
    for total in monthly_totals(run.records()) {
        println!(
            "{}-{:02}: sales {:>10.0}  margin {:>5.1}%",
            total.year, total.month, total.sales, total.gross_margin_pct
        );
    }

    println!("\n=== Group growth ===");
    for growth in run.group_growth(&dataset) {
        match growth.growth_pct {
            Some(pct) => println!("{:<8} {:>+6.1}%", growth.group, pct),
            None => println!("{:<8} n/a", growth.group),
        }
    }

    let quality = run.quality();
    println!("\n=== Forecast quality ===");
    println!("fit score:         {}", format_metric(quality.fit_score));
    println!("trend consistency: {}", format_metric(quality.trend_consistency));
    println!("MAPE:              {}", format_metric(quality.mape));
    println!("confidence:        {}", quality.confidence_level);

    let diagnostics = run.diagnostics();
    println!(
        "\n{} forecast cells, {} actual cells, {} reset, {} division guards",
        diagnostics.forecast_cells,
        diagnostics.actual_cells,
        diagnostics.reset_cells,
        diagnostics.division_guards
    );

    Ok(())
}

fn format_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{:.3}", v))
}

fn sample_rows() -> Vec<SalesRow> {
    let season = [0.6, 0.7, 0.9, 1.1, 1.3, 1.4, 1.4, 1.2, 1.0, 0.9, 0.8, 0.7];
    let mut rows = Vec::new();

    for (year, growth) in [(2024, 1.0), (2025, 1.15)] {
        for (i, factor) in season.iter().enumerate() {
            let month = i as u32 + 1;
            let garden = 90_000.0 * factor * growth;
            let kitchen = 60_000.0 * (1.0 + 0.02 * i as f64) * growth;
            let tools = 40_000.0 * (2.0 - factor) * growth * 0.95;
            rows.push(SalesRow::new(year, month, "Garden", garden / 45.0, garden, garden * 0.64, garden * 1.6));
            rows.push(SalesRow::new(year, month, "Kitchen", kitchen / 120.0, kitchen, kitchen * 0.58, kitchen * 2.2));
            rows.push(SalesRow::new(year, month, "Tools", tools / 80.0, tools, tools * 0.7, tools * 3.1));
        }
    }

    // The first quarter of 2026 is already booked
    for month in 1..=3u32 {
        let factor = season[(month - 1) as usize];
        let garden = 90_000.0 * factor * 1.22;
        rows.push(SalesRow::new(2026, month, "Garden", garden / 47.0, garden, garden * 0.63, garden * 1.5));
        rows.push(SalesRow::new(2026, month, "Kitchen", 600.0, 74_000.0, 43_000.0, 150_000.0));
        rows.push(SalesRow::new(2026, month, "Tools", 560.0, 47_000.0, 33_500.0, 140_000.0));
    }

    rows
}
