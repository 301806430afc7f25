use approx::assert_relative_eq;
use budget_forecast::data::{DataLoader, HistoricalDataset, HistoryYear, SalesFigures, SalesRow};
use budget_forecast::params::ParameterBundle;
use budget_forecast::report::{
    group_growth, historical_weekly_coverage, monthly_totals, quality_metrics, summarize,
    ConfidenceLevel,
};
use budget_forecast::BudgetForecaster;
use rstest::rstest;

fn dataset_from(monthly: &[(&str, [f64; 12], [f64; 12])]) -> HistoricalDataset {
    let mut rows = Vec::new();
    for (group, earlier, later) in monthly {
        for month in 1..=12u32 {
            let i = (month - 1) as usize;
            for (year, sales) in [(2024, earlier[i]), (2025, later[i])] {
                rows.push(SalesRow::new(year, month, group, sales / 10.0, sales, sales * 0.7, sales));
            }
        }
    }
    DataLoader::new().from_rows(rows).unwrap()
}

fn seasonal(base: f64, peak_month: usize, peak: f64) -> [f64; 12] {
    let mut months = [base; 12];
    months[peak_month] = peak;
    months
}

#[test]
fn test_consistent_growth_is_high_confidence() {
    let a = seasonal(100.0, 11, 300.0);
    let b = seasonal(50.0, 6, 90.0);
    let dataset = dataset_from(&[
        ("A", a, a.map(|v| v * 1.1)),
        ("B", b, b.map(|v| v * 1.1)),
    ]);

    let quality = quality_metrics(&dataset);
    assert!(quality.fit_score.unwrap() > 0.99);
    assert_relative_eq!(quality.trend_consistency.unwrap(), 1.0);
    assert!(quality.mape.unwrap() < 1e-6);
    assert_relative_eq!(quality.avg_historical_growth.unwrap(), 10.0, epsilon = 1e-9);
    assert_eq!(quality.confidence_level, ConfidenceLevel::High);
}

#[test]
fn test_erratic_history_is_low_confidence() {
    let earlier = [100.0, 10.0, 100.0, 10.0, 100.0, 10.0, 100.0, 10.0, 100.0, 10.0, 100.0, 10.0];
    let later = [10.0, 100.0, 10.0, 100.0, 10.0, 100.0, 10.0, 100.0, 10.0, 100.0, 10.0, 100.0];
    let dataset = dataset_from(&[("A", earlier, later)]);

    let quality = quality_metrics(&dataset);
    assert!(quality.fit_score.unwrap() < 0.6);
    assert!(quality.mape.unwrap() > 25.0);
    assert_eq!(quality.confidence_level, ConfidenceLevel::Low);
}

#[test]
fn test_opposite_half_year_trends() {
    let earlier = [100.0; 12];
    let mut later = [120.0; 12];
    for month in later.iter_mut().skip(6) {
        *month = 80.0;
    }
    let steady = [100.0; 12];
    let dataset = dataset_from(&[("A", earlier, later), ("B", steady, steady)]);

    let quality = quality_metrics(&dataset);
    assert_relative_eq!(quality.trend_consistency.unwrap(), 0.5);
}

#[test]
fn test_metrics_undefined_without_comparable_history() {
    // Only one month of history in each year, and no earlier-year sales
    let rows = vec![
        SalesRow::new(2024, 1, "A", 0.0, 0.0, 0.0, 0.0),
        SalesRow::new(2025, 1, "A", 5.0, 500.0, 300.0, 100.0),
    ];
    let dataset = DataLoader::new().from_rows(rows).unwrap();

    let quality = quality_metrics(&dataset);
    assert_eq!(quality.fit_score, None);
    assert_eq!(quality.trend_consistency, None);
    assert_eq!(quality.mape, None);
    assert_eq!(quality.avg_historical_growth, None);
    assert_eq!(quality.confidence_level, ConfidenceLevel::Low);

    let json = serde_json::to_value(&quality).unwrap();
    assert!(json["fit_score"].is_null());
    assert!(json["mape"].is_null());
    assert_eq!(json["confidence_level"], "Low");
}

#[test]
fn test_summary_covers_history_and_forecast() {
    let flat = [1000.0; 12];
    let dataset = dataset_from(&[("A", flat, flat), ("B", flat, flat)]);
    let params = ParameterBundle::builder().all_months_rate(0.1).build();
    let run = BudgetForecaster::new(&dataset).compute(&params).unwrap();

    let summary = run.summary();
    assert_eq!(summary.keys().copied().collect::<Vec<_>>(), vec![2024, 2025, 2026]);

    let last_year = &summary[&2025];
    assert_eq!(last_year.months, 12);
    assert_relative_eq!(last_year.total_sales, 24_000.0);
    assert_relative_eq!(last_year.gross_margin_pct, 30.0, epsilon = 1e-9);
    assert_relative_eq!(last_year.avg_stock, 2000.0);
    assert_relative_eq!(last_year.stock_cogs_ratio, 2000.0 / 1400.0, epsilon = 1e-12);

    let forecast = run.summary_for(2026).unwrap();
    assert!(forecast.total_sales > last_year.total_sales);
    assert_relative_eq!(forecast.gross_margin_pct, 30.0, epsilon = 1e-6);
    // Stock keeps each month's cover, so the ratio is unchanged
    assert_relative_eq!(forecast.stock_cogs_ratio, last_year.stock_cogs_ratio, max_relative = 1e-9);
}

#[test]
fn test_summarize_mixed_records() {
    let flat = [1000.0; 12];
    let dataset = dataset_from(&[("A", flat, flat)]);
    let run = BudgetForecaster::new(&dataset)
        .compute(&ParameterBundle::default())
        .unwrap();

    let mixed: Vec<&dyn SalesFigures> = dataset
        .records()
        .iter()
        .map(|r| r as &dyn SalesFigures)
        .chain(run.records().iter().map(|r| r as &dyn SalesFigures))
        .collect();
    let summary = summarize(mixed.iter().copied());

    assert_eq!(&summary, run.summary());
}

#[rstest]
#[case(2024, 2, 29)]
#[case(2025, 2, 28)]
#[case(2025, 1, 31)]
#[case(2025, 11, 30)]
fn test_weekly_coverage_uses_calendar_days(#[case] year: i32, #[case] month: u32, #[case] days: u32) {
    let rows = vec![SalesRow::new(year, month, "A", 1.0, 1000.0, 700.0, 1400.0)];
    let summary = summarize(&rows_as_records(rows));
    let weeks = summary[&year].stock_cogs_weeks;
    assert_relative_eq!(weeks, 1400.0 / (700.0 / days as f64 * 7.0), epsilon = 1e-9);
}

fn rows_as_records(rows: Vec<SalesRow>) -> Vec<budget_forecast::HistoricalRecord> {
    rows.into_iter()
        .map(|r| budget_forecast::HistoricalRecord {
            year: r.year,
            month: r.month,
            group: r.group,
            quantity: r.quantity,
            sales: r.sales,
            cogs: r.cogs,
            gross_profit: r.sales - r.cogs,
            stock: r.stock,
        })
        .collect()
}

#[test]
fn test_historical_weekly_coverage() {
    let flat = [700.0; 12];
    let dataset = dataset_from(&[("A", flat, flat)]);
    // Stock equals sales and COGS is 70% of sales
    let coverage = historical_weekly_coverage(&dataset, HistoryYear::Later).unwrap();
    let expected = (1..=12)
        .map(|m| 700.0 / (490.0 / budget_forecast::report::days_in_month(2025, m) as f64 * 7.0))
        .sum::<f64>()
        / 12.0;
    assert_relative_eq!(coverage, expected, epsilon = 1e-9);
}

#[test]
fn test_group_growth_and_monthly_totals() {
    let flat = [1000.0; 12];
    let dataset = dataset_from(&[("A", flat, flat), ("B", flat, flat)]);
    let params = ParameterBundle::builder()
        .group_rate("A", 0.2)
        .group_rate("B", -0.1)
        .build();
    let run = BudgetForecaster::new(&dataset).compute(&params).unwrap();

    let growth = group_growth(&dataset, run.records());
    assert_eq!(growth.len(), 2);
    assert_eq!(growth[0].group, "A");
    assert_relative_eq!(growth[0].last_year_sales, 12_000.0);
    assert!(growth[0].growth_pct.unwrap() > 15.0);
    assert!(growth[1].growth_pct.unwrap() < -5.0);
    assert_eq!(run.group_growth(&dataset), growth);

    let totals = monthly_totals(run.records());
    assert_eq!(totals.len(), 12);
    assert_eq!(totals[0].year, 2026);
    assert_relative_eq!(totals[0].sales, 1200.0 + 900.0, max_relative = 1e-9);
    assert_relative_eq!(totals[0].gross_margin_pct, 30.0, epsilon = 1e-6);
    assert_eq!(run.monthly_totals(), totals);
}
