//! Summary statistics and forecast quality indicators

use crate::data::{HistoricalDataset, HistoryYear, SalesFigures, MONTHS};
use crate::synthesizer::ForecastRecord;
use budget_math::{
    coefficient_of_variation, growth_rate, mean, mean_absolute_percentage_error, ratio_or_zero,
    shares,
};
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const DAYS_PER_WEEK: f64 = 7.0;

/// Yearly totals and averages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub year: i32,
    /// Distinct months contributing to the year
    pub months: usize,
    pub total_sales: f64,
    pub total_cogs: f64,
    pub total_gross_profit: f64,
    /// Total gross profit over total sales, in percent
    pub gross_margin_pct: f64,
    /// Average of the monthly stock totals
    pub avg_stock: f64,
    /// Average monthly stock over average monthly COGS
    pub stock_cogs_ratio: f64,
    /// Average stock coverage in weeks of COGS
    pub stock_cogs_weeks: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct MonthTotals {
    sales: f64,
    cogs: f64,
    gross_profit: f64,
    stock: f64,
}

/// Number of calendar days in a month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    match (first, next) {
        (Some(first), Some(next)) => next.signed_duration_since(first).num_days() as u32,
        _ => 30,
    }
}

/// Stock divided by one week of COGS; zero when there is no COGS
pub fn weekly_coverage(stock: f64, cogs: f64, days: u32) -> f64 {
    ratio_or_zero(stock, cogs / days as f64 * DAYS_PER_WEEK)
}

fn totals_by_month<'a, R, I>(records: I) -> BTreeMap<(i32, u32), MonthTotals>
where
    R: SalesFigures + ?Sized + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut totals: BTreeMap<(i32, u32), MonthTotals> = BTreeMap::new();
    for record in records {
        let entry = totals.entry((record.year(), record.month())).or_default();
        entry.sales += record.sales();
        entry.cogs += record.cogs();
        entry.gross_profit += record.gross_profit();
        entry.stock += record.stock();
    }
    totals
}

/// Aggregate any mix of historical and forecast rows into per-year statistics
///
/// Mixed inputs can be passed as `&dyn SalesFigures` references.
pub fn summarize<'a, R, I>(records: I) -> BTreeMap<i32, SummaryStats>
where
    R: SalesFigures + ?Sized + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut by_year: BTreeMap<i32, Vec<(u32, MonthTotals)>> = BTreeMap::new();
    for ((year, month), totals) in totals_by_month(records) {
        by_year.entry(year).or_default().push((month, totals));
    }

    by_year
        .into_iter()
        .map(|(year, months)| {
            let count = months.len() as f64;
            let total_sales: f64 = months.iter().map(|(_, t)| t.sales).sum();
            let total_cogs: f64 = months.iter().map(|(_, t)| t.cogs).sum();
            let total_gross_profit: f64 = months.iter().map(|(_, t)| t.gross_profit).sum();
            let avg_stock = months.iter().map(|(_, t)| t.stock).sum::<f64>() / count;
            let weeks: f64 = months
                .iter()
                .map(|(month, t)| weekly_coverage(t.stock, t.cogs, days_in_month(year, *month)))
                .sum();

            let stats = SummaryStats {
                year,
                months: months.len(),
                total_sales,
                total_cogs,
                total_gross_profit,
                gross_margin_pct: ratio_or_zero(total_gross_profit, total_sales) * 100.0,
                avg_stock,
                stock_cogs_ratio: ratio_or_zero(avg_stock, total_cogs / count),
                stock_cogs_weeks: weeks / count,
            };
            (year, stats)
        })
        .collect()
}

/// Sales and margin of one (year, month) across all groups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub sales: f64,
    pub gross_profit: f64,
    pub gross_margin_pct: f64,
}

/// Monthly sales and gross margin, ordered by year then month
pub fn monthly_totals<'a, R, I>(records: I) -> Vec<MonthlyTotal>
where
    R: SalesFigures + ?Sized + 'a,
    I: IntoIterator<Item = &'a R>,
{
    totals_by_month(records)
        .into_iter()
        .map(|((year, month), t)| MonthlyTotal {
            year,
            month,
            sales: t.sales,
            gross_profit: t.gross_profit,
            gross_margin_pct: ratio_or_zero(t.gross_profit, t.sales) * 100.0,
        })
        .collect()
}

/// Sales of a group in the last historical year against the forecast year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupGrowth {
    pub group: String,
    pub last_year_sales: f64,
    pub forecast_sales: f64,
    /// Undefined when the group sold nothing last year
    pub growth_pct: Option<f64>,
}

/// Per-group growth from the last historical year to the forecast year
pub fn group_growth(dataset: &HistoricalDataset, records: &[ForecastRecord]) -> Vec<GroupGrowth> {
    dataset
        .baselines()
        .map(|baseline| {
            let group = baseline.group();
            let last_year_sales = baseline.annual(HistoryYear::Later).sales;
            let forecast_sales: f64 = records
                .iter()
                .filter(|r| r.group == group)
                .map(|r| r.sales)
                .sum();
            GroupGrowth {
                group: group.to_string(),
                last_year_sales,
                forecast_sales,
                growth_pct: growth_rate(last_year_sales, forecast_sales).map(|g| g * 100.0),
            }
        })
        .collect()
}

/// Qualitative label for the forecast's reliability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Discretize fit score and MAPE; undefined inputs give `Low`
    pub fn from_scores(fit_score: Option<f64>, mape: Option<f64>) -> Self {
        match (fit_score, mape) {
            (Some(fit), Some(mape)) if fit > 0.8 && mape < 15.0 => ConfidenceLevel::High,
            (Some(fit), Some(mape)) if fit > 0.6 && mape < 25.0 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        };
        write!(f, "{}", label)
    }
}

/// How consistent the history is, and so how far the forecast can be trusted
///
/// `None` means undefined: there were too few comparable points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// 1 / (1 + cv^2) of the monthly year-over-year growth factors, in [0, 1]
    pub fit_score: Option<f64>,
    /// Share of groups whose first- and second-half growth agree in sign
    pub trend_consistency: Option<f64>,
    /// Seasonal-only backtest error of the later year, in percent
    pub mape: Option<f64>,
    pub confidence_level: ConfidenceLevel,
    /// Overall year-over-year sales growth, in percent
    pub avg_historical_growth: Option<f64>,
}

/// Score the historical years of a dataset
pub fn quality_metrics(dataset: &HistoricalDataset) -> QualityMetrics {
    let fit_score = fit_score(dataset);
    let trend_consistency = trend_consistency(dataset);
    let mape = seasonal_backtest_mape(dataset);

    let (earlier, later) = dataset.baselines().fold((0.0, 0.0), |(e, l), baseline| {
        (
            e + baseline.annual(HistoryYear::Earlier).sales,
            l + baseline.annual(HistoryYear::Later).sales,
        )
    });
    let avg_historical_growth = growth_rate(earlier, later).map(|g| g * 100.0);

    let metrics = QualityMetrics {
        fit_score,
        trend_consistency,
        mape,
        confidence_level: ConfidenceLevel::from_scores(fit_score, mape),
        avg_historical_growth,
    };
    debug!("Quality metrics: {:?}", metrics);
    metrics
}

fn fit_score(dataset: &HistoricalDataset) -> Option<f64> {
    let factors: Vec<f64> = dataset
        .baselines()
        .flat_map(|baseline| {
            (1..=MONTHS as u32).filter_map(move |month| {
                growth_rate(
                    baseline.month(HistoryYear::Earlier, month).sales,
                    baseline.month(HistoryYear::Later, month).sales,
                )
                .map(|g| 1.0 + g)
            })
        })
        .collect();

    if factors.len() < 2 {
        return None;
    }
    let cv = coefficient_of_variation(&factors).ok()?;
    Some(1.0 / (1.0 + cv * cv))
}

fn trend_consistency(dataset: &HistoricalDataset) -> Option<f64> {
    let half = MONTHS / 2;
    let mut comparable = 0usize;
    let mut agreeing = 0usize;

    for baseline in dataset.baselines() {
        let earlier = baseline.monthly_sales(HistoryYear::Earlier);
        let later = baseline.monthly_sales(HistoryYear::Later);
        let first = growth_rate(earlier[..half].iter().sum(), later[..half].iter().sum());
        let second = growth_rate(earlier[half..].iter().sum(), later[half..].iter().sum());

        if let (Some(first), Some(second)) = (first, second) {
            comparable += 1;
            if (first >= 0.0) == (second >= 0.0) {
                agreeing += 1;
            }
        }
    }

    if comparable == 0 {
        None
    } else {
        Some(agreeing as f64 / comparable as f64)
    }
}

/// Project the later year from the earlier year's seasonal shape and its own total
fn seasonal_backtest_mape(dataset: &HistoricalDataset) -> Option<f64> {
    let mut actual = Vec::new();
    let mut predicted = Vec::new();

    for baseline in dataset.baselines() {
        let later = baseline.monthly_sales(HistoryYear::Later);
        let Some(earlier_shares) = shares(&baseline.monthly_sales(HistoryYear::Earlier)) else {
            continue;
        };
        let later_total: f64 = later.iter().sum();
        for (share, sales) in earlier_shares.iter().zip(later.iter()) {
            actual.push(*sales);
            predicted.push(share * later_total);
        }
    }

    mean_absolute_percentage_error(&actual, &predicted, 2).ok()
}

/// Average of the groups' monthly stock coverage in weeks for one historical year
pub fn historical_weekly_coverage(dataset: &HistoricalDataset, year: HistoryYear) -> Option<f64> {
    let calendar_year = dataset.year_of(year);
    let coverage: Vec<f64> = dataset
        .baselines()
        .flat_map(|baseline| {
            baseline.months(year).iter().zip(1u32..).filter_map(move |(m, month)| {
                (m.cogs > 0.0)
                    .then(|| weekly_coverage(m.stock, m.cogs, days_in_month(calendar_year, month)))
            })
        })
        .collect();
    mean(&coverage).ok()
}
