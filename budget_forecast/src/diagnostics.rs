//! Per-cell notes and per-run diagnostics

use crate::params::ParameterIssue;
use serde::Serialize;

/// Ratios that fall back to zero when their denominator is zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GuardedRatio {
    /// Monthly sales share; the profile fell back to uniform
    SeasonalShare,
    /// Year-over-year growth of a group with no sales in the earlier year
    OrganicGrowth,
    /// Sales over quantity; sales were projected without a unit price
    UnitPrice,
    /// Gross profit over sales
    GrossMargin,
    /// Stock over cost of goods sold
    StockCover,
}

/// Something a caller may want to know about one output cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellNote {
    /// A zero denominator was replaced by a defined zero
    DivisionGuard(GuardedRatio),
    /// An unparseable parameter covering this cell was replaced by its default
    ParameterFallback,
    /// A reset marker forced the cell to zero
    Reset,
}

/// What happened during one compute action, beyond the figures themselves
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastDiagnostics {
    /// Latest forecast-year month copied from actual data
    pub realized_through: Option<u32>,
    /// Number of forecast cells
    pub forecast_cells: usize,
    /// Number of cells copied from actual data
    pub actual_cells: usize,
    /// Division guards over all output cells
    pub division_guards: usize,
    /// Cells forced to zero by a reset marker
    pub reset_cells: usize,
    /// Parameter values replaced by their defaults
    pub parameter_issues: Vec<ParameterIssue>,
    /// Parameter groups absent from the historical data
    pub ignored_groups: Vec<String>,
    /// Input rows outside the historical and forecast years
    pub ignored_rows: usize,
}
