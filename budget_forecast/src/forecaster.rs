//! The budget forecasting engine
//!
//! [`BudgetForecaster`] borrows a loaded [`HistoricalDataset`] and turns a
//! [`ParameterBundle`] into a complete [`ForecastRun`]. Each call to
//! [`BudgetForecaster::compute`] is independent: nothing is cached between
//! runs and the dataset is never modified.

use crate::config::ForecastConfig;
use crate::data::{FrameBuilder, HistoricalDataset, SalesFigures};
use crate::diagnostics::{CellNote, ForecastDiagnostics};
use crate::error::{ForecastError, Result};
use crate::params::ParameterBundle;
use crate::report::{
    group_growth, monthly_totals, quality_metrics, summarize, GroupGrowth, MonthlyTotal,
    QualityMetrics, SummaryStats,
};
use crate::seasonality::Estimates;
use crate::synthesizer::{ForecastRecord, Synthesizer};
use log::{info, warn};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::collections::BTreeMap;

/// Budget forecasting engine over one historical dataset
#[derive(Debug, Clone)]
pub struct BudgetForecaster<'a> {
    dataset: &'a HistoricalDataset,
    config: ForecastConfig,
}

impl<'a> BudgetForecaster<'a> {
    /// Forecaster with the default configuration
    pub fn new(dataset: &'a HistoricalDataset) -> Self {
        Self {
            dataset,
            config: ForecastConfig::default(),
        }
    }

    /// Replace the configuration
    ///
    /// Fails when a value is out of range or the configured forecast year
    /// differs from the year the dataset was loaded for.
    pub fn with_config(mut self, config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        if let Some(year) = config.forecast_year {
            if year != self.dataset.forecast_year() {
                return Err(ForecastError::InvalidConfig(format!(
                    "forecast_year {} does not match the dataset's forecast year {}",
                    year,
                    self.dataset.forecast_year()
                )));
            }
        }
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn dataset(&self) -> &HistoricalDataset {
        self.dataset
    }

    /// Seasonal profiles and organic growth of every group
    pub fn estimates(&self) -> Estimates {
        Estimates::from_dataset(self.dataset)
    }

    /// Run the forecast for one parameter bundle
    pub fn compute(&self, params: &ParameterBundle) -> Result<ForecastRun> {
        let estimates = self.estimates();

        let ignored_groups: Vec<String> = params
            .referenced_groups()
            .into_iter()
            .filter(|group| !self.dataset.has_group(group))
            .map(|group| {
                warn!("Ignoring parameters for unknown group '{}'", group);
                group.to_string()
            })
            .collect();

        let records = Synthesizer::new(self.dataset, &estimates, params, &self.config).synthesize();

        let history = self
            .dataset
            .records()
            .iter()
            .map(|r| r as &dyn SalesFigures);
        let output = records.iter().map(|r| r as &dyn SalesFigures);
        let summary = summarize(history.chain(output));
        let quality = quality_metrics(self.dataset);

        let forecast_cells = records.iter().filter(|r| r.is_forecast()).count();
        let diagnostics = ForecastDiagnostics {
            realized_through: self.dataset.realized_through(),
            forecast_cells,
            actual_cells: records.len() - forecast_cells,
            division_guards: records.iter().map(|r| r.division_guards().count()).sum(),
            reset_cells: records
                .iter()
                .filter(|r| r.has_note(CellNote::Reset))
                .count(),
            parameter_issues: params.issues().to_vec(),
            ignored_groups,
            ignored_rows: self.dataset.ignored_rows(),
        };

        info!(
            "Forecast {} computed: {} forecast cells, {} actual cells, confidence {}",
            self.dataset.forecast_year(),
            diagnostics.forecast_cells,
            diagnostics.actual_cells,
            quality.confidence_level
        );

        Ok(ForecastRun {
            forecast_year: self.dataset.forecast_year(),
            records,
            summary,
            quality,
            diagnostics,
        })
    }
}

/// Everything one compute action produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRun {
    forecast_year: i32,
    records: Vec<ForecastRecord>,
    summary: BTreeMap<i32, SummaryStats>,
    quality: QualityMetrics,
    diagnostics: ForecastDiagnostics,
}

impl ForecastRun {
    pub fn forecast_year(&self) -> i32 {
        self.forecast_year
    }

    /// Every forecast-year record, actuals included, ordered by group then month
    pub fn records(&self) -> &[ForecastRecord] {
        &self.records
    }

    /// Only the computed records
    pub fn forecast_only(&self) -> impl Iterator<Item = &ForecastRecord> {
        self.records.iter().filter(|r| r.is_forecast())
    }

    /// Record for a group and month
    pub fn record(&self, group: &str, month: u32) -> Option<&ForecastRecord> {
        self.records
            .iter()
            .find(|r| r.month == month && r.group == group)
    }

    /// Summary statistics of history and forecast, keyed by year
    pub fn summary(&self) -> &BTreeMap<i32, SummaryStats> {
        &self.summary
    }

    pub fn summary_for(&self, year: i32) -> Option<&SummaryStats> {
        self.summary.get(&year)
    }

    pub fn quality(&self) -> &QualityMetrics {
        &self.quality
    }

    pub fn diagnostics(&self) -> &ForecastDiagnostics {
        &self.diagnostics
    }

    /// Forecast sales of each group against its last historical year
    pub fn group_growth(&self, dataset: &HistoricalDataset) -> Vec<GroupGrowth> {
        group_growth(dataset, &self.records)
    }

    /// Monthly totals of the forecast year
    pub fn monthly_totals(&self) -> Vec<MonthlyTotal> {
        monthly_totals(&self.records)
    }

    /// Forecast-year records as a frame
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut frame = FrameBuilder::with_capacity(self.records.len());
        for record in &self.records {
            frame.push(record, record.source.as_str());
        }
        frame.finish()
    }

    /// History followed by the forecast year, in one frame
    pub fn combined_dataframe(&self, dataset: &HistoricalDataset) -> Result<DataFrame> {
        let history = dataset.to_dataframe()?;
        let forecast = self.to_dataframe()?;
        Ok(history.vstack(&forecast)?)
    }
}
