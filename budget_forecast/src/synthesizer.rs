//! Forecast synthesis
//!
//! Turns the historical baselines, the seasonal estimates and a parameter
//! bundle into one record per (group, month) of the forecast year:
//!
//! 1. Months up to the realized boundary are copied from actual data.
//! 2. Baseline quantity is last year's annual quantity spread by the
//!    seasonal profile.
//! 3. Monthly target, group target (or general growth), lessons learned and
//!    the capped organic trend are multiplied into one growth multiplier.
//! 4. The growth premium decays with distance into the horizon.
//! 5. Sales, COGS, gross profit and stock follow from price, margin and
//!    stock-cover assumptions of the group.
//! 6. Reset markers zero the cell.

use crate::config::ForecastConfig;
use crate::data::{
    GroupBaseline, HistoricalDataset, HistoricalRecord, HistoryYear, MonthMetrics, SalesFigures,
    MONTHS,
};
use crate::diagnostics::{CellNote, GuardedRatio};
use crate::params::ParameterBundle;
use crate::seasonality::{Estimates, GroupEstimate};
use budget_math::checked_ratio;
use serde::Serialize;

/// Where an output row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordSource {
    /// Copied from realized data of the forecast year
    Actual,
    /// Computed by the engine
    Forecast,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSource::Actual => "Actual",
            RecordSource::Forecast => "Forecast",
        }
    }
}

/// One output row of the forecast year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRecord {
    pub year: i32,
    pub month: u32,
    pub group: String,
    pub quantity: f64,
    pub sales: f64,
    pub cogs: f64,
    pub gross_profit: f64,
    pub stock: f64,
    /// Gross profit over sales as a fraction
    pub gross_margin: f64,
    pub source: RecordSource,
    /// Decayed growth multiplier applied to the baseline; 1.0 for actuals
    pub growth_multiplier: f64,
    pub notes: Vec<CellNote>,
}

impl ForecastRecord {
    /// Copy a realized row unchanged
    pub fn actual(record: &HistoricalRecord) -> Self {
        Self {
            year: record.year,
            month: record.month,
            group: record.group.clone(),
            quantity: record.quantity,
            sales: record.sales,
            cogs: record.cogs,
            gross_profit: record.gross_profit,
            stock: record.stock,
            gross_margin: record.gross_margin(),
            source: RecordSource::Actual,
            growth_multiplier: 1.0,
            notes: Vec::new(),
        }
    }

    fn empty(year: i32, month: u32, group: &str, source: RecordSource) -> Self {
        Self {
            year,
            month,
            group: group.to_string(),
            quantity: 0.0,
            sales: 0.0,
            cogs: 0.0,
            gross_profit: 0.0,
            stock: 0.0,
            gross_margin: 0.0,
            source,
            growth_multiplier: 1.0,
            notes: Vec::new(),
        }
    }

    fn zero_figures(&mut self) {
        self.quantity = 0.0;
        self.sales = 0.0;
        self.cogs = 0.0;
        self.gross_profit = 0.0;
        self.stock = 0.0;
        self.gross_margin = 0.0;
    }

    pub fn is_forecast(&self) -> bool {
        self.source == RecordSource::Forecast
    }

    pub fn division_guards(&self) -> impl Iterator<Item = GuardedRatio> + '_ {
        self.notes.iter().filter_map(|note| match note {
            CellNote::DivisionGuard(ratio) => Some(*ratio),
            _ => None,
        })
    }

    pub fn has_note(&self, note: CellNote) -> bool {
        self.notes.contains(&note)
    }
}

impl SalesFigures for ForecastRecord {
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
    fn gross_margin(&self) -> f64 {
        self.gross_margin
    }
}

/// The individual factors behind one cell's growth multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeverBreakdown {
    pub monthly: f64,
    pub group: f64,
    /// General growth, applied only without monthly and group targets
    pub general: f64,
    pub lessons: f64,
    /// Capped, scaled and inflation-adjusted organic growth as a rate
    pub organic: f64,
    /// Product of all factors before decay, floored at zero
    pub undecayed: f64,
    /// Multiplier after the conservatism decay
    pub decayed: f64,
    pub reset: bool,
}

/// Scale the growth premium of a multiplier by the decay at a horizon index
///
/// Only a positive premium decays; a cut is applied in full at every horizon.
pub fn decayed_multiplier(multiplier: f64, horizon_index: u32, config: &ForecastConfig) -> f64 {
    let premium = multiplier - 1.0;
    if premium <= 0.0 {
        return multiplier;
    }
    1.0 + premium * config.decay_factor(horizon_index)
}

/// Price, margin and stock assumptions of one group
#[derive(Debug, Clone, PartialEq)]
struct GroupBasis {
    annual_quantity: f64,
    annual_sales: f64,
    unit_price: Option<f64>,
    margin: Option<f64>,
    monthly_cover: [Option<f64>; MONTHS],
    annual_cover: Option<f64>,
}

impl GroupBasis {
    fn from_baseline(baseline: &GroupBaseline) -> Self {
        let later = baseline.annual(HistoryYear::Later);
        let earlier = baseline.annual(HistoryYear::Earlier);
        let prefer_later = |f: fn(&MonthMetrics) -> Option<f64>| f(&later).or_else(|| f(&earlier));

        let mut monthly_cover = [None; MONTHS];
        for (slot, metrics) in monthly_cover
            .iter_mut()
            .zip(baseline.months(HistoryYear::Later))
        {
            *slot = checked_ratio(metrics.stock, metrics.cogs);
        }

        Self {
            annual_quantity: later.quantity,
            annual_sales: later.sales,
            unit_price: checked_ratio(later.sales, later.quantity),
            margin: prefer_later(|m| checked_ratio(m.gross_profit(), m.sales)),
            monthly_cover,
            annual_cover: prefer_later(|m| checked_ratio(m.stock, m.cogs)),
        }
    }

    fn stock_cover(&self, month: u32) -> Option<f64> {
        self.monthly_cover[(month - 1) as usize].or(self.annual_cover)
    }
}

/// Builds the forecast year from estimates and parameters
#[derive(Debug)]
pub struct Synthesizer<'a> {
    dataset: &'a HistoricalDataset,
    estimates: &'a Estimates,
    params: &'a ParameterBundle,
    config: &'a ForecastConfig,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        dataset: &'a HistoricalDataset,
        estimates: &'a Estimates,
        params: &'a ParameterBundle,
        config: &'a ForecastConfig,
    ) -> Self {
        Self {
            dataset,
            estimates,
            params,
            config,
        }
    }

    /// Every (group, month) record of the forecast year, ordered by group then month
    pub fn synthesize(&self) -> Vec<ForecastRecord> {
        let boundary = self.dataset.realized_through().unwrap_or(0);
        let mut records = Vec::with_capacity(self.dataset.groups().len() * MONTHS);

        for baseline in self.dataset.baselines() {
            let group = baseline.group();
            let basis = GroupBasis::from_baseline(baseline);
            let estimate = self.estimates.get(group);

            for month in 1..=MONTHS as u32 {
                let record = if month <= boundary {
                    self.actual_cell(group, month)
                } else {
                    self.forecast_cell(group, month, month - boundary - 1, &basis, estimate)
                };
                records.push(record);
            }
        }

        records
    }

    fn actual_cell(&self, group: &str, month: u32) -> ForecastRecord {
        match self.dataset.realized(group, month) {
            Some(record) => ForecastRecord::actual(record),
            None => ForecastRecord::empty(
                self.dataset.forecast_year(),
                month,
                group,
                RecordSource::Actual,
            ),
        }
    }

    /// Growth factors of a cell at a horizon index
    pub fn levers(&self, group: &str, month: u32, horizon_index: u32) -> LeverBreakdown {
        let params = self.params;
        let monthly_cell = params.monthly_target(month);
        let group_cell = params.group_target(group);

        let monthly = monthly_cell.map_or(1.0, |c| c.factor());
        let group_factor = group_cell.map_or(1.0, |c| c.factor());
        let general = if monthly_cell.is_none() && group_cell.is_none() {
            1.0 + params.general_growth()
        } else {
            1.0
        };
        let lessons = params.lesson(group, month).map_or(1.0, |c| c.factor());

        let raw_organic = params.organic_rate().unwrap_or_else(|| {
            self.estimates
                .get(group)
                .map_or(0.0, |estimate| estimate.organic_growth)
        });
        let organic = self.config.organic_cap
            * raw_organic
            * params.organic_multiplier()
            * params.inflation_ratio();

        // A combined cut beyond -100% sells nothing rather than a negative amount
        let undecayed = (monthly * group_factor * general * lessons * (1.0 + organic)).max(0.0);

        LeverBreakdown {
            monthly,
            group: group_factor,
            general,
            lessons,
            organic,
            undecayed,
            decayed: decayed_multiplier(undecayed, horizon_index, self.config),
            reset: params.is_reset(group, month),
        }
    }

    fn forecast_cell(
        &self,
        group: &str,
        month: u32,
        horizon_index: u32,
        basis: &GroupBasis,
        estimate: Option<&GroupEstimate>,
    ) -> ForecastRecord {
        let mut record = ForecastRecord::empty(
            self.dataset.forecast_year(),
            month,
            group,
            RecordSource::Forecast,
        );
        let mut guards: Vec<GuardedRatio> = estimate.map(|e| e.guards.clone()).unwrap_or_default();

        let share = estimate.map_or(1.0 / MONTHS as f64, |e| e.profile.share(month));
        let levers = self.levers(group, month, horizon_index);
        let growth = levers.decayed;

        let quantity = basis.annual_quantity * share * growth;
        let price_factor = self
            .params
            .price_change(group, month)
            .map_or(1.0, |c| c.factor())
            .max(0.0);
        let sales = match basis.unit_price {
            Some(price) if basis.annual_quantity > 0.0 => quantity * price * price_factor,
            _ => {
                guards.push(GuardedRatio::UnitPrice);
                basis.annual_sales * share * growth * price_factor
            }
        };

        let margin = basis.margin.unwrap_or_else(|| {
            guards.push(GuardedRatio::GrossMargin);
            0.0
        });
        let margin = (margin + self.params.margin_improvement()).min(1.0);
        let cogs = sales * (1.0 - margin);

        let cover = basis.stock_cover(month).unwrap_or_else(|| {
            guards.push(GuardedRatio::StockCover);
            0.0
        });
        let stock = cogs * cover * (1.0 + self.params.stock_change()).max(0.0);

        record.quantity = quantity;
        record.sales = sales;
        record.cogs = cogs;
        record.gross_profit = sales - cogs;
        record.stock = stock;
        record.gross_margin = budget_math::ratio_or_zero(record.gross_profit, sales);
        record.growth_multiplier = growth;

        guards.sort();
        guards.dedup();
        record
            .notes
            .extend(guards.into_iter().map(CellNote::DivisionGuard));
        if self.params.has_issue_at(group, month) {
            record.notes.push(CellNote::ParameterFallback);
        }

        // Resets override everything computed above.
        if levers.reset {
            record.zero_figures();
            record.notes.push(CellNote::Reset);
        }

        record
    }
}

