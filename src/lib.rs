//! # Sales Budget
//!
//! Workspace facade for the sales budget crates:
//!
//! - [`forecast`]: the budget forecasting engine (`budget_forecast`)
//! - [`math`]: guarded ratios and statistics (`budget_math`)
//!
//! ## Example
//!
//! ```
//! use sales_budget_workspace::forecast::{BudgetForecaster, DataLoader, ParameterBundle, SalesRow};
//!
//! let rows = (1..=12).flat_map(|month| {
//!     vec![
//!         SalesRow::new(2024, month, "Garden", 10.0, 1000.0, 600.0, 1200.0),
//!         SalesRow::new(2025, month, "Garden", 10.0, 1000.0, 600.0, 1200.0),
//!     ]
//! });
//! let dataset = DataLoader::new().from_rows(rows).unwrap();
//!
//! let params = ParameterBundle::builder().all_months_rate(0.20).build();
//! let run = BudgetForecaster::new(&dataset).compute(&params).unwrap();
//!
//! let january = run.record("Garden", 1).unwrap();
//! assert!((january.sales - 1200.0).abs() < 1e-6);
//! assert_eq!(january.gross_profit, january.sales - january.cogs);
//! ```

pub use budget_forecast as forecast;
pub use budget_math as math;

/// Names and versions of the workspace crates
pub fn crate_versions() -> Vec<(&'static str, &'static str)> {
    vec![
        (budget_forecast::NAME, budget_forecast::VERSION),
        ("sales_budget_workspace", env!("CARGO_PKG_VERSION")),
    ]
}
