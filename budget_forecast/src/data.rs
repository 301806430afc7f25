//! Historical sales data loading and normalization

use crate::config::ForecastConfig;
use crate::error::{DataValidationError, ForecastError, Result};
use log::{info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

/// Months in a budget year
pub const MONTHS: usize = 12;

const YEAR_COLUMN: &str = "Year";
const MONTH_COLUMN: &str = "Month";
const GROUP_COLUMN: &str = "Group";
const GROUP_ALIAS: &str = "MainGroup";
const QUANTITY_COLUMN: &str = "Quantity";
const SALES_COLUMN: &str = "Sales";
const COGS_COLUMN: &str = "COGS";
const STOCK_COLUMN: &str = "Stock";
const GROSS_PROFIT_COLUMN: &str = "GrossProfit";
const GROSS_MARGIN_COLUMN: &str = "GrossMargin%";
const SOURCE_COLUMN: &str = "Source";

/// A raw input row, before duplicates are merged and gross profit derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRow {
    pub year: i32,
    pub month: u32,
    pub group: String,
    pub quantity: f64,
    pub sales: f64,
    pub cogs: f64,
    pub stock: f64,
}

impl SalesRow {
    pub fn new(year: i32, month: u32, group: &str, quantity: f64, sales: f64, cogs: f64, stock: f64) -> Self {
        Self {
            year,
            month,
            group: group.to_string(),
            quantity,
            sales,
            cogs,
            stock,
        }
    }
}

/// Additive figures of one (year, month, group) cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonthMetrics {
    pub quantity: f64,
    pub sales: f64,
    pub cogs: f64,
    pub stock: f64,
}

impl MonthMetrics {
    pub fn gross_profit(&self) -> f64 {
        self.sales - self.cogs
    }

    /// True when every figure is zero, i.e. the cell is a placeholder
    pub fn is_zero(&self) -> bool {
        self.quantity == 0.0 && self.sales == 0.0 && self.cogs == 0.0 && self.stock == 0.0
    }

    fn accumulate(&mut self, other: &MonthMetrics) {
        self.quantity += other.quantity;
        self.sales += other.sales;
        self.cogs += other.cogs;
        self.stock += other.stock;
    }
}

/// Read access to the figures shared by historical and forecast rows
pub trait SalesFigures {
    fn year(&self) -> i32;
    fn month(&self) -> u32;
    fn group(&self) -> &str;
    fn quantity(&self) -> f64;
    fn sales(&self) -> f64;
    fn cogs(&self) -> f64;
    fn gross_profit(&self) -> f64;
    fn stock(&self) -> f64;

    /// Gross profit over sales as a fraction, zero when there are no sales
    fn gross_margin(&self) -> f64 {
        budget_math::ratio_or_zero(self.gross_profit(), self.sales())
    }
}

/// A normalized historical row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRecord {
    pub year: i32,
    pub month: u32,
    pub group: String,
    pub quantity: f64,
    pub sales: f64,
    pub cogs: f64,
    pub gross_profit: f64,
    pub stock: f64,
}

impl HistoricalRecord {
    fn from_metrics(year: i32, month: u32, group: String, metrics: &MonthMetrics) -> Self {
        Self {
            year,
            month,
            group,
            quantity: metrics.quantity,
            sales: metrics.sales,
            cogs: metrics.cogs,
            gross_profit: metrics.gross_profit(),
            stock: metrics.stock,
        }
    }

    pub fn metrics(&self) -> MonthMetrics {
        MonthMetrics {
            quantity: self.quantity,
            sales: self.sales,
            cogs: self.cogs,
            stock: self.stock,
        }
    }
}

impl SalesFigures for HistoricalRecord {
    fn year(&self) -> i32 {
        self.year
    }
    fn month(&self) -> u32 {
        self.month
    }
    fn group(&self) -> &str {
        &self.group
    }
    fn quantity(&self) -> f64 {
        self.quantity
    }
    fn sales(&self) -> f64 {
        self.sales
    }
    fn cogs(&self) -> f64 {
        self.cogs
    }
    fn gross_profit(&self) -> f64 {
        self.gross_profit
    }
    fn stock(&self) -> f64 {
        self.stock
    }
}

/// Which of the two historical years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryYear {
    /// Two years before the forecast year
    Earlier,
    /// The year immediately before the forecast year
    Later,
}

impl HistoryYear {
    fn index(self) -> usize {
        match self {
            HistoryYear::Earlier => 0,
            HistoryYear::Later => 1,
        }
    }
}

/// Monthly figures of one group across both historical years
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBaseline {
    group: String,
    years: [[MonthMetrics; MONTHS]; 2],
}

impl GroupBaseline {
    fn new(group: &str) -> Self {
        Self {
            group: group.to_string(),
            years: [[MonthMetrics::default(); MONTHS]; 2],
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Figures for a month (1..=12) of a historical year
    pub fn month(&self, year: HistoryYear, month: u32) -> &MonthMetrics {
        &self.years[year.index()][month_index(month)]
    }

    /// All twelve months of a historical year
    pub fn months(&self, year: HistoryYear) -> &[MonthMetrics; MONTHS] {
        &self.years[year.index()]
    }

    /// Sum of the year's monthly figures (stock included, average it yourself)
    pub fn annual(&self, year: HistoryYear) -> MonthMetrics {
        let mut total = MonthMetrics::default();
        for metrics in self.months(year) {
            total.accumulate(metrics);
        }
        total
    }

    /// Monthly sales of a historical year
    pub fn monthly_sales(&self, year: HistoryYear) -> [f64; MONTHS] {
        let mut sales = [0.0; MONTHS];
        for (slot, metrics) in sales.iter_mut().zip(self.months(year)) {
            *slot = metrics.sales;
        }
        sales
    }
}

fn month_index(month: u32) -> usize {
    (month.clamp(1, MONTHS as u32) - 1) as usize
}

/// A validated two-year history plus any realized rows of the forecast year
#[derive(Debug, Clone)]
pub struct HistoricalDataset {
    forecast_year: i32,
    records: Vec<HistoricalRecord>,
    realized: Vec<HistoricalRecord>,
    groups: Vec<String>,
    baselines: BTreeMap<String, GroupBaseline>,
    realized_through: Option<u32>,
    ignored_rows: usize,
}

impl HistoricalDataset {
    /// The year being forecast
    pub fn forecast_year(&self) -> i32 {
        self.forecast_year
    }

    /// The two historical years, earlier first
    pub fn history_years(&self) -> (i32, i32) {
        (self.forecast_year - 2, self.forecast_year - 1)
    }

    /// Calendar year of a historical year
    pub fn year_of(&self, year: HistoryYear) -> i32 {
        match year {
            HistoryYear::Earlier => self.forecast_year - 2,
            HistoryYear::Later => self.forecast_year - 1,
        }
    }

    /// Historical records sorted by year, month and group
    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    /// Forecast-year rows present in the input, placeholders included
    pub fn realized_records(&self) -> &[HistoricalRecord] {
        &self.realized
    }

    /// Realized forecast-year row for a group and month
    pub fn realized(&self, group: &str, month: u32) -> Option<&HistoricalRecord> {
        self.realized
            .iter()
            .find(|r| r.month == month && r.group == group)
    }

    /// Latest forecast-year month holding real (non-placeholder) data
    pub fn realized_through(&self) -> Option<u32> {
        self.realized_through
    }

    /// Distinct groups, sorted
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.baselines.contains_key(group)
    }

    pub fn baseline(&self, group: &str) -> Option<&GroupBaseline> {
        self.baselines.get(group)
    }

    /// Baselines in group order
    pub fn baselines(&self) -> impl Iterator<Item = &GroupBaseline> {
        self.baselines.values()
    }

    /// Input rows dropped because they belong to neither history nor the forecast year
    pub fn ignored_rows(&self) -> usize {
        self.ignored_rows
    }

    /// Historical records as a frame with the same columns as a forecast frame
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut frame = FrameBuilder::with_capacity(self.records.len());
        for record in &self.records {
            frame.push(record, "Actual");
        }
        frame.finish()
    }
}

/// Column-wise accumulator for record frames
pub(crate) struct FrameBuilder {
    years: Vec<i32>,
    months: Vec<u32>,
    groups: Vec<String>,
    quantities: Vec<f64>,
    sales: Vec<f64>,
    cogs: Vec<f64>,
    gross_profits: Vec<f64>,
    stocks: Vec<f64>,
    margins: Vec<f64>,
    sources: Vec<String>,
}

impl FrameBuilder {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            years: Vec::with_capacity(capacity),
            months: Vec::with_capacity(capacity),
            groups: Vec::with_capacity(capacity),
            quantities: Vec::with_capacity(capacity),
            sales: Vec::with_capacity(capacity),
            cogs: Vec::with_capacity(capacity),
            gross_profits: Vec::with_capacity(capacity),
            stocks: Vec::with_capacity(capacity),
            margins: Vec::with_capacity(capacity),
            sources: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push<R: SalesFigures + ?Sized>(&mut self, record: &R, source: &str) {
        self.years.push(record.year());
        self.months.push(record.month());
        self.groups.push(record.group().to_string());
        self.quantities.push(record.quantity());
        self.sales.push(record.sales());
        self.cogs.push(record.cogs());
        self.gross_profits.push(record.gross_profit());
        self.stocks.push(record.stock());
        self.margins.push(record.gross_margin());
        self.sources.push(source.to_string());
    }

    pub(crate) fn finish(self) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            Series::new(YEAR_COLUMN, self.years),
            Series::new(MONTH_COLUMN, self.months),
            Series::new(GROUP_COLUMN, self.groups),
            Series::new(QUANTITY_COLUMN, self.quantities),
            Series::new(SALES_COLUMN, self.sales),
            Series::new(COGS_COLUMN, self.cogs),
            Series::new(GROSS_PROFIT_COLUMN, self.gross_profits),
            Series::new(STOCK_COLUMN, self.stocks),
            Series::new(GROSS_MARGIN_COLUMN, self.margins),
            Series::new(SOURCE_COLUMN, self.sources),
        ])?;
        Ok(df)
    }
}

/// Data loader for historical sales data
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    forecast_year: Option<i32>,
}

impl DataLoader {
    /// Loader that infers the forecast year from the data
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader for an explicit forecast year
    pub fn with_forecast_year(forecast_year: i32) -> Self {
        Self {
            forecast_year: Some(forecast_year),
        }
    }

    /// Loader using the forecast year of a configuration, inferring it when unset
    pub fn from_config(config: &ForecastConfig) -> Self {
        Self {
            forecast_year: config.forecast_year,
        }
    }

    /// Load historical data from a CSV file
    pub fn from_csv<P: AsRef<Path>>(&self, path: P) -> Result<HistoricalDataset> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        self.from_dataframe(&df)
    }

    /// Load historical data from an existing DataFrame
    pub fn from_dataframe(&self, df: &DataFrame) -> Result<HistoricalDataset> {
        let year_col = Self::detect_column(df, &[YEAR_COLUMN])?;
        let month_col = Self::detect_column(df, &[MONTH_COLUMN])?;
        let group_col = Self::detect_column(df, &[GROUP_COLUMN, GROUP_ALIAS])?;
        let quantity_col = Self::detect_column(df, &[QUANTITY_COLUMN])?;
        let sales_col = Self::detect_column(df, &[SALES_COLUMN])?;
        let cogs_col = Self::detect_column(df, &[COGS_COLUMN])?;
        let stock_col = Self::detect_column(df, &[STOCK_COLUMN])?;

        let years = Self::column_as_i64(df, &year_col)?;
        let months = Self::column_as_i64(df, &month_col)?;
        let groups = Self::column_as_strings(df, &group_col)?;
        let quantities = Self::column_as_f64(df, &quantity_col)?;
        let sales = Self::column_as_f64(df, &sales_col)?;
        let cogs = Self::column_as_f64(df, &cogs_col)?;
        let stocks = Self::column_as_f64(df, &stock_col)?;

        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let year = i32::try_from(years[i]).map_err(|_| DataValidationError::InvalidYear {
                row: i,
                value: years[i],
            })?;
            let month = months[i];
            if !(1..=MONTHS as i64).contains(&month) {
                return Err(DataValidationError::InvalidMonth {
                    year,
                    group: groups[i].clone(),
                    month,
                }
                .into());
            }
            rows.push(SalesRow {
                year,
                month: month as u32,
                group: groups[i].clone(),
                quantity: quantities[i],
                sales: sales[i],
                cogs: cogs[i],
                stock: stocks[i],
            });
        }

        self.from_rows(rows)
    }

    /// Validate and normalize in-memory rows
    pub fn from_rows<I>(&self, rows: I) -> Result<HistoricalDataset>
    where
        I: IntoIterator<Item = SalesRow>,
    {
        let rows: Vec<SalesRow> = rows.into_iter().collect();
        if rows.is_empty() {
            return Err(DataValidationError::EmptyDataset.into());
        }

        let forecast_year = match self.forecast_year {
            Some(year) => year,
            None => Self::infer_forecast_year(&rows),
        };
        let (earlier, later) = (forecast_year - 2, forecast_year - 1);

        let mut cells: BTreeMap<(i32, u32, String), MonthMetrics> = BTreeMap::new();
        let mut ignored_rows = 0;
        for row in &rows {
            Self::validate_row(row)?;
            if row.year != earlier && row.year != later && row.year != forecast_year {
                ignored_rows += 1;
                continue;
            }
            let metrics = MonthMetrics {
                quantity: row.quantity,
                sales: row.sales,
                cogs: row.cogs,
                stock: row.stock,
            };
            cells
                .entry((row.year, row.month, row.group.clone()))
                .or_default()
                .accumulate(&metrics);
        }
        if ignored_rows > 0 {
            warn!(
                "Ignored {} rows outside {}-{}",
                ignored_rows, earlier, forecast_year
            );
        }

        for year in [earlier, later] {
            if !cells.keys().any(|(y, _, _)| *y == year) {
                return Err(DataValidationError::MissingYear { year }.into());
            }
        }

        let mut baselines: BTreeMap<String, GroupBaseline> = BTreeMap::new();
        let mut all_groups = BTreeSet::new();
        let mut records = Vec::new();
        let mut realized = Vec::new();
        for ((year, month, group), metrics) in &cells {
            all_groups.insert(group.clone());
            let record = HistoricalRecord::from_metrics(*year, *month, group.clone(), metrics);
            if *year == forecast_year {
                realized.push(record);
                continue;
            }
            let slot = if *year == earlier {
                HistoryYear::Earlier
            } else {
                HistoryYear::Later
            };
            baselines
                .entry(group.clone())
                .or_insert_with(|| GroupBaseline::new(group))
                .years[slot.index()][month_index(*month)] = *metrics;
            records.push(record);
        }

        if let Some(group) = all_groups.iter().find(|g| !baselines.contains_key(*g)) {
            return Err(DataValidationError::EmptyGroup {
                group: group.clone(),
                first_year: earlier,
                second_year: later,
            }
            .into());
        }

        let realized_through = realized
            .iter()
            .filter(|r| !r.metrics().is_zero())
            .map(|r| r.month)
            .max();

        info!(
            "Loaded {} historical records for {} groups; forecasting {} (realized through {:?})",
            records.len(),
            baselines.len(),
            forecast_year,
            realized_through
        );

        Ok(HistoricalDataset {
            forecast_year,
            records,
            realized,
            groups: baselines.keys().cloned().collect(),
            baselines,
            realized_through,
            ignored_rows,
        })
    }

    /// Three or more years mean the latest is partially realized
    fn infer_forecast_year(rows: &[SalesRow]) -> i32 {
        let years: BTreeSet<i32> = rows.iter().map(|r| r.year).collect();
        let latest = years.iter().next_back().copied().unwrap_or_default();
        if years.len() >= 3 {
            latest
        } else {
            latest + 1
        }
    }

    fn validate_row(row: &SalesRow) -> Result<()> {
        if !(1..=MONTHS as u32).contains(&row.month) {
            return Err(DataValidationError::InvalidMonth {
                year: row.year,
                group: row.group.clone(),
                month: row.month as i64,
            }
            .into());
        }

        let values = [
            (QUANTITY_COLUMN, row.quantity),
            (SALES_COLUMN, row.sales),
            (COGS_COLUMN, row.cogs),
            (STOCK_COLUMN, row.stock),
        ];
        for (column, value) in values {
            if !value.is_finite() {
                return Err(DataValidationError::InvalidValue {
                    column: column.to_string(),
                    year: row.year,
                    month: row.month,
                    group: row.group.clone(),
                    value,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Find a column by any of its accepted names, ignoring case
    fn detect_column(df: &DataFrame, names: &[&str]) -> Result<String> {
        let column_names = df.get_column_names();

        for wanted in names {
            for name in &column_names {
                if name.eq_ignore_ascii_case(wanted) {
                    return Ok(name.to_string());
                }
            }
        }

        Err(DataValidationError::MissingColumn {
            column: names[0].to_string(),
        }
        .into())
    }

    fn column_as_f64(df: &DataFrame, column_name: &str) -> Result<Vec<f64>> {
        let series = df.column(column_name)?.cast(&DataType::Float64)?;
        let values = series.f64()?;
        Self::require_all(values.into_iter(), column_name)
    }

    fn column_as_i64(df: &DataFrame, column_name: &str) -> Result<Vec<i64>> {
        let series = df.column(column_name)?.cast(&DataType::Int64)?;
        let values = series.i64()?;
        Self::require_all(values.into_iter(), column_name)
    }

    fn column_as_strings(df: &DataFrame, column_name: &str) -> Result<Vec<String>> {
        let series = df.column(column_name)?.cast(&DataType::Utf8)?;
        let values = series.utf8()?;
        Self::require_all(values.into_iter().map(|v| v.map(str::to_string)), column_name)
    }

    /// Reject null cells, reporting the first offending row
    fn require_all<T, I>(values: I, column_name: &str) -> Result<Vec<T>>
    where
        I: Iterator<Item = Option<T>>,
    {
        values
            .enumerate()
            .map(|(row, value)| {
                value.ok_or_else(|| {
                    ForecastError::from(DataValidationError::MissingValue {
                        column: column_name.to_string(),
                        row,
                    })
                })
            })
            .collect()
    }
}
