//! Budget adjustment parameters
//!
//! Every adjustable cell is resolved once into a [`RateCell`]: either a rate
//! (a fraction, 0.20 = 20%) or the reset marker. Values that cannot be parsed
//! are replaced by the configured default rate and recorded as
//! [`ParameterIssue`]s so the affected forecast cells can be flagged.

use crate::config::ForecastConfig;
use crate::data::MONTHS;
use crate::error::ParameterError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Raw value that forces a cell to zero
pub const RESET_MARKER: &str = "*";

/// A resolved parameter cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RateCell {
    /// Growth or change rate as a fraction
    Rate(f64),
    /// Do not compute; the covered forecast cells are zero
    Reset,
}

impl RateCell {
    /// Parse a raw table value, naming the table in any error
    pub fn parse(table: &str, raw: &str) -> Result<Self, ParameterError> {
        let trimmed = raw.trim();
        if trimmed == RESET_MARKER {
            return Ok(RateCell::Reset);
        }

        parse_number(trimmed)
            .map(RateCell::Rate)
            .ok_or_else(|| ParameterError {
                table: table.to_string(),
                raw: raw.to_string(),
            })
    }

    pub fn rate(&self) -> Option<f64> {
        match self {
            RateCell::Rate(rate) => Some(*rate),
            RateCell::Reset => None,
        }
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, RateCell::Reset)
    }

    /// Growth factor of the cell; a reset contributes nothing here
    pub fn factor(&self) -> f64 {
        1.0 + self.rate().unwrap_or(0.0)
    }
}

impl FromStr for RateCell {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RateCell::parse("rate", s)
    }
}

/// Accepts a decimal comma, as spreadsheets in many locales export
fn parse_number(raw: &str) -> Option<f64> {
    let normalized = if raw.contains('.') {
        raw.to_string()
    } else {
        raw.replace(',', ".")
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Where in the parameter tables a value lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParamLocation {
    Month(u32),
    Group(String),
    Cell { group: String, month: u32 },
    /// A single value applying to every cell
    Global(String),
}

impl ParamLocation {
    /// Whether a value here influences the given forecast cell
    pub fn covers(&self, group: &str, month: u32) -> bool {
        match self {
            ParamLocation::Month(m) => *m == month,
            ParamLocation::Group(g) => g == group,
            ParamLocation::Cell { group: g, month: m } => g == group && *m == month,
            ParamLocation::Global(_) => true,
        }
    }
}

/// A parameter value that was replaced by the default
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterIssue {
    pub location: ParamLocation,
    pub table: String,
    pub raw: String,
    /// Value used instead of the unparseable input
    pub substituted: f64,
}

/// Organic-growth presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetScenario {
    /// No momentum from the historical trend
    Conservative,
    /// Half of the capped momentum
    Normal,
    /// Full capped momentum
    Optimistic,
}

impl BudgetScenario {
    pub fn organic_multiplier(&self) -> f64 {
        match self {
            BudgetScenario::Conservative => 0.0,
            BudgetScenario::Normal => 0.5,
            BudgetScenario::Optimistic => 1.0,
        }
    }
}

/// Ratio of expected to past inflation, given both in percent
///
/// Falls back to 1.0 (no adjustment) when past inflation is not positive.
pub fn inflation_ratio_from(past_pct: f64, future_pct: f64) -> f64 {
    if past_pct > 0.0 && future_pct.is_finite() {
        future_pct / past_pct
    } else {
        1.0
    }
}

/// The full set of adjustment inputs for one compute action
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBundle {
    monthly_targets: BTreeMap<u32, RateCell>,
    group_targets: BTreeMap<String, RateCell>,
    lessons: BTreeMap<(String, u32), RateCell>,
    price_changes: BTreeMap<(String, u32), RateCell>,
    general_growth: f64,
    margin_improvement: f64,
    stock_change: f64,
    inflation_ratio: f64,
    organic_multiplier: f64,
    organic_rate: Option<f64>,
    issues: Vec<ParameterIssue>,
}

impl Default for ParameterBundle {
    fn default() -> Self {
        ParameterBundleBuilder::new().build()
    }
}

impl ParameterBundle {
    pub fn builder() -> ParameterBundleBuilder {
        ParameterBundleBuilder::new()
    }

    pub fn monthly_target(&self, month: u32) -> Option<RateCell> {
        self.monthly_targets.get(&month).copied()
    }

    pub fn group_target(&self, group: &str) -> Option<RateCell> {
        self.group_targets.get(group).copied()
    }

    /// Lessons-learned adjustment already converted to a rate
    pub fn lesson(&self, group: &str, month: u32) -> Option<RateCell> {
        self.lessons.get(&(group.to_string(), month)).copied()
    }

    pub fn price_change(&self, group: &str, month: u32) -> Option<RateCell> {
        self.price_changes.get(&(group.to_string(), month)).copied()
    }

    /// True when any table resets this cell
    pub fn is_reset(&self, group: &str, month: u32) -> bool {
        [
            self.monthly_target(month),
            self.group_target(group),
            self.lesson(group, month),
            self.price_change(group, month),
        ]
        .iter()
        .flatten()
        .any(RateCell::is_reset)
    }

    /// Fallback growth for cells with neither a monthly nor a group target
    pub fn general_growth(&self) -> f64 {
        self.general_growth
    }

    /// Added to each group's historical gross-margin ratio
    pub fn margin_improvement(&self) -> f64 {
        self.margin_improvement
    }

    pub fn stock_change(&self) -> f64 {
        self.stock_change
    }

    pub fn inflation_ratio(&self) -> f64 {
        self.inflation_ratio
    }

    /// Share of the capped organic momentum to apply, within [0, 1]
    pub fn organic_multiplier(&self) -> f64 {
        self.organic_multiplier
    }

    /// Organic rate replacing the historical estimate for every group
    pub fn organic_rate(&self) -> Option<f64> {
        self.organic_rate
    }

    pub fn issues(&self) -> &[ParameterIssue] {
        &self.issues
    }

    /// Whether an unparseable value was replaced for this cell
    pub fn has_issue_at(&self, group: &str, month: u32) -> bool {
        self.issues.iter().any(|i| i.location.covers(group, month))
    }

    /// Every group named anywhere in the tables
    pub fn referenced_groups(&self) -> BTreeSet<&str> {
        self.group_targets
            .keys()
            .map(String::as_str)
            .chain(self.lessons.keys().map(|(g, _)| g.as_str()))
            .chain(self.price_changes.keys().map(|(g, _)| g.as_str()))
            .collect()
    }
}

/// Builder for [`ParameterBundle`]
#[derive(Debug, Clone)]
pub struct ParameterBundleBuilder {
    bundle: ParameterBundle,
    config: ForecastConfig,
}

impl Default for ParameterBundleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterBundleBuilder {
    pub fn new() -> Self {
        Self {
            bundle: ParameterBundle {
                monthly_targets: BTreeMap::new(),
                group_targets: BTreeMap::new(),
                lessons: BTreeMap::new(),
                price_changes: BTreeMap::new(),
                general_growth: 0.0,
                margin_improvement: 0.0,
                stock_change: 0.0,
                inflation_ratio: 1.0,
                organic_multiplier: 0.0,
                organic_rate: None,
                issues: Vec::new(),
            },
            config: ForecastConfig::default(),
        }
    }

    /// Use the lesson conversion and default rate of a custom configuration
    pub fn config(mut self, config: &ForecastConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn monthly_target(mut self, month: u32, cell: RateCell) -> Self {
        if valid_month(month) {
            self.bundle.monthly_targets.insert(month, cell);
        }
        self
    }

    pub fn monthly_rate(self, month: u32, rate: f64) -> Self {
        self.monthly_target(month, RateCell::Rate(rate))
    }

    /// The same rate for all twelve months
    pub fn all_months_rate(mut self, rate: f64) -> Self {
        for month in 1..=MONTHS as u32 {
            self = self.monthly_rate(month, rate);
        }
        self
    }

    /// Parse a monthly target
    ///
    /// An unparseable value still becomes a target at the default rate, so
    /// general growth no longer applies to that month.
    pub fn parse_monthly_target(self, month: u32, raw: &str) -> Self {
        let (builder, cell) = self.resolve("monthly target", raw, ParamLocation::Month(month));
        builder.monthly_target(month, cell)
    }

    pub fn group_target(mut self, group: &str, cell: RateCell) -> Self {
        self.bundle.group_targets.insert(group.to_string(), cell);
        self
    }

    pub fn group_rate(self, group: &str, rate: f64) -> Self {
        self.group_target(group, RateCell::Rate(rate))
    }

    /// Parse a group target; like a monthly target, a fallback replaces general growth
    pub fn parse_group_target(self, group: &str, raw: &str) -> Self {
        let location = ParamLocation::Group(group.to_string());
        let (builder, cell) = self.resolve("group target", raw, location);
        builder.group_target(group, cell)
    }

    /// Lessons-learned score; points are clamped and converted to a rate
    pub fn lesson_points(mut self, group: &str, month: u32, points: f64) -> Self {
        if valid_month(month) {
            let rate = self.config.lesson_rate(points);
            self.bundle
                .lessons
                .insert((group.to_string(), month), RateCell::Rate(rate));
        }
        self
    }

    /// Reset a single group x month cell
    pub fn reset_cell(mut self, group: &str, month: u32) -> Self {
        if valid_month(month) {
            self.bundle
                .lessons
                .insert((group.to_string(), month), RateCell::Reset);
        }
        self
    }

    pub fn parse_lesson(self, group: &str, month: u32, raw: &str) -> Self {
        let location = ParamLocation::Cell {
            group: group.to_string(),
            month,
        };
        match RateCell::parse("lessons learned", raw) {
            Ok(RateCell::Reset) => self.reset_cell(group, month),
            Ok(RateCell::Rate(points)) => self.lesson_points(group, month, points),
            Err(err) => self.record_issue(location, err, 0.0).lesson_points(group, month, 0.0),
        }
    }

    pub fn price_change(mut self, group: &str, month: u32, cell: RateCell) -> Self {
        if valid_month(month) {
            self.bundle
                .price_changes
                .insert((group.to_string(), month), cell);
        }
        self
    }

    pub fn parse_price_change(self, group: &str, month: u32, raw: &str) -> Self {
        let location = ParamLocation::Cell {
            group: group.to_string(),
            month,
        };
        let (builder, cell) = self.resolve("price change", raw, location);
        builder.price_change(group, month, cell)
    }

    pub fn general_growth(self, rate: f64) -> Self {
        let fallback = self.config.default_rate;
        let (mut builder, rate) = self.finite_global("general growth", rate, fallback);
        builder.bundle.general_growth = rate;
        builder
    }

    pub fn margin_improvement(self, delta: f64) -> Self {
        let (mut builder, delta) = self.finite_global("margin improvement", delta, 0.0);
        builder.bundle.margin_improvement = delta;
        builder
    }

    pub fn stock_change(self, rate: f64) -> Self {
        let (mut builder, rate) = self.finite_global("stock change", rate, 0.0);
        builder.bundle.stock_change = rate;
        builder
    }

    pub fn inflation_ratio(self, ratio: f64) -> Self {
        let (mut builder, ratio) = self.finite_global("inflation ratio", ratio, 1.0);
        builder.bundle.inflation_ratio = ratio;
        builder
    }

    /// Set the inflation ratio from past and expected inflation in percent
    pub fn inflation(self, past_pct: f64, future_pct: f64) -> Self {
        self.inflation_ratio(inflation_ratio_from(past_pct, future_pct))
    }

    pub fn organic_multiplier(self, multiplier: f64) -> Self {
        let (mut builder, multiplier) = self.finite_global("organic multiplier", multiplier, 0.0);
        builder.bundle.organic_multiplier = multiplier.clamp(0.0, 1.0);
        builder
    }

    pub fn scenario(self, scenario: BudgetScenario) -> Self {
        self.organic_multiplier(scenario.organic_multiplier())
    }

    pub fn organic_rate(self, rate: f64) -> Self {
        if rate.is_finite() {
            let mut builder = self;
            builder.bundle.organic_rate = Some(rate);
            return builder;
        }
        let err = ParameterError {
            table: "organic rate".to_string(),
            raw: rate.to_string(),
        };
        self.record_issue(ParamLocation::Global("organic rate".to_string()), err, 0.0)
    }

    pub fn build(self) -> ParameterBundle {
        self.bundle
    }

    /// Parse a raw value, substituting the default rate on failure
    fn resolve(self, table: &str, raw: &str, location: ParamLocation) -> (Self, RateCell) {
        match RateCell::parse(table, raw) {
            Ok(cell) => (self, cell),
            Err(err) => {
                let rate = self.config.default_rate;
                (self.record_issue(location, err, rate), RateCell::Rate(rate))
            }
        }
    }

    /// Replace a non-finite global value with its fallback
    fn finite_global(self, name: &str, value: f64, fallback: f64) -> (Self, f64) {
        if value.is_finite() {
            return (self, value);
        }
        let err = ParameterError {
            table: name.to_string(),
            raw: value.to_string(),
        };
        (
            self.record_issue(ParamLocation::Global(name.to_string()), err, fallback),
            fallback,
        )
    }

    fn record_issue(mut self, location: ParamLocation, err: ParameterError, substituted: f64) -> Self {
        warn!("{}; using {}", err, substituted);
        self.bundle.issues.push(ParameterIssue {
            location,
            table: err.table,
            raw: err.raw,
            substituted,
        });
        self
    }
}

fn valid_month(month: u32) -> bool {
    if (1..=MONTHS as u32).contains(&month) {
        true
    } else {
        warn!("Ignoring parameter for invalid month {}", month);
        false
    }
}
