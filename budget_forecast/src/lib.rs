//! # Budget Forecast
//!
//! A Rust library for projecting a sales budget year from two years of history.
//!
//! ## Features
//!
//! - Historical sales, margin and stock loading (CSV, DataFrame or in-memory rows)
//! - Per-group seasonality and organic trend estimation
//! - Monthly, group, lessons-learned and price levers with reset markers
//! - Organic growth capped at 30% of the historical trend
//! - Monthly conservatism decay of the growth premium, floored at 85%
//! - Realized months of the forecast year kept as actual data
//! - Yearly summaries and forecast quality indicators
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use budget_forecast::data::DataLoader;
//! use budget_forecast::params::{BudgetScenario, ParameterBundle};
//! use budget_forecast::BudgetForecaster;
//!
//! # fn main() -> budget_forecast::error::Result<()> {
//! // Load two years of history; the forecast year is inferred
//! let dataset = DataLoader::new().from_csv("sales.csv")?;
//!
//! // Describe the budget
//! let params = ParameterBundle::builder()
//!     .all_months_rate(0.10)
//!     .parse_group_target("Garden", "0.25")
//!     .parse_price_change("Garden", 7, "*") // no July sales for Garden
//!     .margin_improvement(0.01)
//!     .scenario(BudgetScenario::Normal)
//!     .build();
//!
//! // Run the forecast
//! let run = BudgetForecaster::new(&dataset).compute(&params)?;
//! println!("{:?}", run.summary_for(dataset.forecast_year()));
//! println!("confidence: {}", run.quality().confidence_level);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod forecaster;
pub mod params;
pub mod report;
pub mod seasonality;
pub mod synthesizer;

// Re-export commonly used types
pub use crate::config::ForecastConfig;
pub use crate::data::{DataLoader, HistoricalDataset, HistoricalRecord, SalesFigures, SalesRow};
pub use crate::diagnostics::{CellNote, ForecastDiagnostics, GuardedRatio};
pub use crate::error::{DataValidationError, ForecastError, ParameterError};
pub use crate::forecaster::{BudgetForecaster, ForecastRun};
pub use crate::params::{BudgetScenario, ParameterBundle, RateCell};
pub use crate::report::{ConfidenceLevel, QualityMetrics, SummaryStats};
pub use crate::synthesizer::{ForecastRecord, RecordSource};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
