//! Seasonality and organic trend estimation
//!
//! For each group the monthly share of annual sales is measured in both
//! historical years and averaged into a [`SeasonalProfile`]. The year-over-year
//! change of annual sales gives the group's raw organic growth.

use crate::data::{GroupBaseline, HistoricalDataset, HistoryYear, MONTHS};
use crate::diagnostics::GuardedRatio;
use budget_math::{growth_rate, shares};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

/// Monthly seasonal coefficients of one group
///
/// A coefficient is the month's share of annual sales relative to a uniform
/// 1/12 share, so the twelve coefficients sum to 12.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalProfile {
    coefficients: [f64; MONTHS],
}

impl SeasonalProfile {
    /// Every month carries the same weight
    pub fn uniform() -> Self {
        Self {
            coefficients: [1.0; MONTHS],
        }
    }

    /// Average the monthly shares of every year with non-zero sales
    ///
    /// Returns `None` when no year has any sales.
    pub fn from_monthly_sales(years: &[[f64; MONTHS]]) -> Option<Self> {
        let year_shares: Vec<Vec<f64>> = years.iter().filter_map(|year| shares(year)).collect();
        if year_shares.is_empty() {
            return None;
        }

        let mut coefficients = [0.0; MONTHS];
        for (month, coefficient) in coefficients.iter_mut().enumerate() {
            let average: f64 =
                year_shares.iter().map(|s| s[month]).sum::<f64>() / year_shares.len() as f64;
            *coefficient = average * MONTHS as f64;
        }

        Some(Self { coefficients })
    }

    /// Coefficient for a month (1..=12)
    pub fn coefficient(&self, month: u32) -> f64 {
        self.coefficients[(month.clamp(1, MONTHS as u32) - 1) as usize]
    }

    /// Share of the annual total falling in a month
    pub fn share(&self, month: u32) -> f64 {
        self.coefficient(month) / MONTHS as f64
    }

    pub fn coefficients(&self) -> &[f64; MONTHS] {
        &self.coefficients
    }

    /// Spread an annual total over the months
    pub fn distribute(&self, annual_total: f64) -> [f64; MONTHS] {
        let mut months = [0.0; MONTHS];
        for (slot, coefficient) in months.iter_mut().zip(self.coefficients.iter()) {
            *slot = annual_total * coefficient / MONTHS as f64;
        }
        months
    }
}

/// Seasonality and trend of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEstimate {
    pub group: String,
    pub profile: SeasonalProfile,
    /// Raw year-over-year growth of annual sales as a fraction
    pub organic_growth: f64,
    /// Ratios that fell back because of a zero denominator
    pub guards: Vec<GuardedRatio>,
}

impl GroupEstimate {
    /// Estimate seasonality and organic growth from a group's baseline
    pub fn from_baseline(baseline: &GroupBaseline) -> Self {
        let mut guards = Vec::new();

        let earlier = baseline.monthly_sales(HistoryYear::Earlier);
        let later = baseline.monthly_sales(HistoryYear::Later);
        let profile = SeasonalProfile::from_monthly_sales(&[earlier, later]).unwrap_or_else(|| {
            guards.push(GuardedRatio::SeasonalShare);
            SeasonalProfile::uniform()
        });

        let earlier_total: f64 = earlier.iter().sum();
        let later_total: f64 = later.iter().sum();
        let organic_growth = growth_rate(earlier_total, later_total).unwrap_or_else(|| {
            guards.push(GuardedRatio::OrganicGrowth);
            0.0
        });

        Self {
            group: baseline.group().to_string(),
            profile,
            organic_growth,
            guards,
        }
    }
}

/// Estimates for every group of a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Estimates {
    groups: BTreeMap<String, GroupEstimate>,
}

impl Estimates {
    /// Run the estimator over every group
    pub fn from_dataset(dataset: &HistoricalDataset) -> Self {
        let groups: BTreeMap<String, GroupEstimate> = dataset
            .baselines()
            .map(|baseline| {
                let estimate = GroupEstimate::from_baseline(baseline);
                debug!(
                    "Group '{}': organic growth {:.4}, guards {:?}",
                    estimate.group, estimate.organic_growth, estimate.guards
                );
                (estimate.group.clone(), estimate)
            })
            .collect();

        Self { groups }
    }

    pub fn get(&self, group: &str) -> Option<&GroupEstimate> {
        self.groups.get(group)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupEstimate> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_sales_give_unit_coefficients() {
        let profile = SeasonalProfile::from_monthly_sales(&[[100.0; MONTHS], [250.0; MONTHS]]).unwrap();
        for month in 1..=12 {
            assert_relative_eq!(profile.coefficient(month), 1.0, epsilon = 1e-12);
            assert_relative_eq!(profile.share(month), 1.0 / 12.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_coefficients_average_both_years() {
        let mut first = [0.0; MONTHS];
        first[0] = 120.0;
        let mut second = [0.0; MONTHS];
        second[1] = 60.0;

        let profile = SeasonalProfile::from_monthly_sales(&[first, second]).unwrap();
        assert_relative_eq!(profile.coefficient(1), 6.0);
        assert_relative_eq!(profile.coefficient(2), 6.0);
        assert_relative_eq!(profile.coefficient(3), 0.0);
        assert_relative_eq!(profile.coefficients().iter().sum::<f64>(), 12.0);
    }

    #[test]
    fn test_zero_year_is_left_out() {
        let mut busy = [10.0; MONTHS];
        busy[11] = 120.0;
        let profile = SeasonalProfile::from_monthly_sales(&[[0.0; MONTHS], busy]).unwrap();
        let expected = SeasonalProfile::from_monthly_sales(&[busy]).unwrap();
        assert_eq!(profile, expected);

        assert!(SeasonalProfile::from_monthly_sales(&[[0.0; MONTHS], [0.0; MONTHS]]).is_none());
    }

    #[test]
    fn test_distribute_preserves_total() {
        let mut sales = [0.0; MONTHS];
        for (i, s) in sales.iter_mut().enumerate() {
            *s = 1000.0 + 137.0 * i as f64;
        }
        let profile = SeasonalProfile::from_monthly_sales(&[sales]).unwrap();
        let total: f64 = sales.iter().sum();
        let rebuilt = profile.distribute(total);
        for (a, b) in rebuilt.iter().zip(sales.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-9);
        }
    }
}
