//! Shift billing optimizer
//!
//! Converts raw crew hours into billed shift-days. Crews are billed in fixed
//! increments (e.g. 4/6/8/10/12 hours); a small "hustle" overrun past an
//! increment is absorbed instead of moving to the next one. Multi-day scopes
//! are tried on both the standard and the maximum shift length and the
//! cheapest layout wins.

use serde::{Deserialize, Serialize};

use crate::entities::estimate::ShiftSettings;

const EPS: f64 = 1e-9;

/// How a plan's days were laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BillingStrategy {
    /// Nothing to bill
    #[default]
    None,
    /// Fits in one shift
    SingleDay,
    /// Full days at the standard shift length
    StandardBase,
    /// Full days at the maximum shift length
    MaximumBase,
    /// Hours spread evenly over a minimum-days floor
    MinimumDays,
}

/// Billed outcome for one raw-hours figure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ShiftPlan {
    pub raw_hours: f64,
    pub billed_hours: f64,
    pub billed_days: u32,
    /// Billed length of each day, in order
    pub day_hours: Vec<f64>,
    pub strategy: BillingStrategy,
}

impl ShiftPlan {
    fn from_days(raw_hours: f64, day_hours: Vec<f64>, strategy: BillingStrategy) -> Self {
        Self {
            raw_hours,
            billed_hours: day_hours.iter().sum(),
            billed_days: day_hours.len() as u32,
            day_hours,
            strategy,
        }
    }

    /// Raw hours as a fraction of billed hours
    pub fn utilization(&self) -> f64 {
        if self.billed_hours <= 0.0 {
            return 0.0;
        }
        self.raw_hours / self.billed_hours
    }

    /// Average billed hours per day
    pub fn average_day(&self) -> f64 {
        if self.billed_days == 0 {
            return 0.0;
        }
        self.billed_hours / self.billed_days as f64
    }

    /// Strictly fewer billed hours, or equal hours over fewer days
    fn beats(&self, other: &ShiftPlan) -> bool {
        if self.billed_hours < other.billed_hours - EPS {
            return true;
        }
        (self.billed_hours - other.billed_hours).abs() <= EPS && self.billed_days < other.billed_days
    }
}

/// Billing increments, hustle tolerance and shift-length bases
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftPolicy {
    increments: Vec<f64>,
    hustle: f64,
    standard_hours: f64,
    standard_base: f64,
    maximum_base: f64,
}

impl Default for ShiftPolicy {
    fn default() -> Self {
        Self::from_settings(&ShiftSettings::default())
    }
}

impl ShiftPolicy {
    pub fn from_settings(settings: &ShiftSettings) -> Self {
        let mut increments: Vec<f64> = settings
            .billing_increments
            .iter()
            .copied()
            .filter(|h| h.is_finite() && *h > 0.0)
            .collect();
        increments.sort_by(f64::total_cmp);
        increments.dedup_by(|a, b| (*a - *b).abs() < EPS);

        let standard_hours = if settings.standard_hours > 0.0 {
            settings.standard_hours
        } else {
            8.0
        };
        if increments.is_empty() {
            increments.push(standard_hours);
        }

        let mut policy = Self {
            increments,
            hustle: settings.hustle_hours.max(0.0),
            standard_hours,
            standard_base: 0.0,
            maximum_base: 0.0,
        };
        // Bases are billed as whole increments
        policy.standard_base = policy.round_up(standard_hours);
        policy.maximum_base = policy
            .round_up(settings.max_hours.max(standard_hours))
            .max(policy.standard_base);
        policy
    }

    pub fn standard_hours(&self) -> f64 {
        self.standard_hours
    }

    pub fn increments(&self) -> &[f64] {
        &self.increments
    }

    pub fn hustle(&self) -> f64 {
        self.hustle
    }

    fn largest(&self) -> f64 {
        self.increments.last().copied().unwrap_or(self.standard_hours)
    }

    /// Smallest increment >= hours (largest increment when none is)
    fn round_up(&self, hours: f64) -> f64 {
        self.increments
            .iter()
            .copied()
            .find(|inc| *inc >= hours - EPS)
            .unwrap_or_else(|| self.largest())
    }

    /// Billed length for a single day of `hours` work
    pub fn snap(&self, hours: f64) -> f64 {
        if hours <= 0.0 {
            return 0.0;
        }
        match self.increments.iter().position(|inc| *inc >= hours - EPS) {
            Some(0) => self.increments[0],
            Some(i) => {
                let lower = self.increments[i - 1];
                if hours - lower <= self.hustle + EPS {
                    lower
                } else {
                    self.increments[i]
                }
            }
            None => self.largest(),
        }
    }

    /// Bill `raw_hours` of crew time, honoring an optional minimum day count
    pub fn optimize(&self, raw_hours: f64, min_days: Option<u32>) -> ShiftPlan {
        if !raw_hours.is_finite() || raw_hours <= 0.0 {
            return ShiftPlan::default();
        }

        let plan = if raw_hours <= self.largest() + self.hustle + EPS {
            ShiftPlan::from_days(raw_hours, vec![self.snap(raw_hours)], BillingStrategy::SingleDay)
        } else {
            let standard = self.plan_on_base(raw_hours, self.standard_base, BillingStrategy::StandardBase);
            let maximum = self.plan_on_base(raw_hours, self.maximum_base, BillingStrategy::MaximumBase);
            if maximum.beats(&standard) {
                maximum
            } else {
                standard
            }
        };

        match min_days {
            Some(floor) if floor > plan.billed_days => {
                let per_day = raw_hours / floor as f64;
                let day = self.snap(per_day);
                ShiftPlan::from_days(raw_hours, vec![day; floor as usize], BillingStrategy::MinimumDays)
            }
            _ => plan,
        }
    }

    /// Whole days at `base`, with the remainder either folded into an
    /// extended last day or billed as a separate partial day
    fn plan_on_base(&self, raw_hours: f64, base: f64, strategy: BillingStrategy) -> ShiftPlan {
        let full = ((raw_hours + EPS) / base).floor().max(1.0) as usize;
        let remainder = raw_hours - full as f64 * base;

        if remainder <= EPS {
            return ShiftPlan::from_days(raw_hours, vec![base; full], strategy);
        }

        let mut separate = vec![base; full];
        separate.push(self.snap(remainder));
        let separate = ShiftPlan::from_days(raw_hours, separate, strategy);

        if base + remainder <= self.largest() + self.hustle + EPS {
            let mut extended = vec![base; full - 1];
            extended.push(self.snap(base + remainder));
            let extended = ShiftPlan::from_days(raw_hours, extended, strategy);
            if !separate.beats(&extended) {
                return extended;
            }
        }

        separate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> ShiftPolicy {
        ShiftPolicy::default()
    }

    #[test]
    fn test_snap_to_increment() {
        let p = policy();
        assert_eq!(p.snap(3.0), 4.0);
        assert_eq!(p.snap(7.0), 8.0);
        assert_eq!(p.snap(8.0), 8.0);
        assert_eq!(p.snap(12.3), 12.0);
    }

    #[test]
    fn test_hustle_absorbs_small_overrun() {
        let p = policy();
        assert_eq!(p.snap(8.4), 8.0);
        assert_eq!(p.snap(8.5), 8.0);
        assert_eq!(p.snap(8.6), 10.0);
    }

    #[test]
    fn test_single_day() {
        let plan = policy().optimize(7.0, None);
        assert_eq!(plan.billed_days, 1);
        assert_eq!(plan.billed_hours, 8.0);
        assert_eq!(plan.strategy, BillingStrategy::SingleDay);
    }

    #[test]
    fn test_zero_hours() {
        let plan = policy().optimize(0.0, Some(3));
        assert_eq!(plan.billed_days, 0);
        assert_eq!(plan.billed_hours, 0.0);
    }

    #[test]
    fn test_exact_standard_days() {
        let plan = policy().optimize(16.0, None);
        assert_eq!(plan.day_hours, vec![8.0, 8.0]);
        assert_eq!(plan.strategy, BillingStrategy::StandardBase);
    }

    #[test]
    fn test_remainder_folds_into_extended_day() {
        // 8 + 10 beats 8 + 8 + 4
        let plan = policy().optimize(18.0, None);
        assert_eq!(plan.billed_hours, 18.0);
        assert_eq!(plan.billed_days, 2);
        assert_eq!(plan.day_hours, vec![8.0, 10.0]);
    }

    #[test]
    fn test_maximum_base_wins_on_fewer_days() {
        // standard: 5 x 8 + 6 = 46 over 6 days; maximum: 4 x 10 + 6 = 46 over 5 days
        let plan = policy().optimize(45.0, None);
        assert_eq!(plan.billed_hours, 46.0);
        assert_eq!(plan.billed_days, 5);
        assert_eq!(plan.strategy, BillingStrategy::MaximumBase);
    }

    #[test]
    fn test_hustle_on_extended_day() {
        // 8 + snap(12.3) = 8 + 12
        let plan = policy().optimize(20.3, None);
        assert_eq!(plan.billed_hours, 20.0);
        assert_eq!(plan.billed_days, 2);
    }

    #[test]
    fn test_minimum_days_floor_redistributes() {
        let plan = policy().optimize(7.0, Some(2));
        assert_eq!(plan.day_hours, vec![4.0, 4.0]);
        assert_eq!(plan.strategy, BillingStrategy::MinimumDays);

        // floor already satisfied
        let plan = policy().optimize(30.0, Some(2));
        assert_ne!(plan.strategy, BillingStrategy::MinimumDays);
    }

    #[test]
    fn test_custom_increments_are_sanitized() {
        let settings = ShiftSettings {
            billing_increments: vec![10.0, 8.0, -1.0, 8.0],
            ..ShiftSettings::default()
        };
        let p = ShiftPolicy::from_settings(&settings);
        assert_eq!(p.increments(), &[8.0, 10.0]);
        assert_eq!(p.snap(2.0), 8.0);
    }

    #[test]
    fn test_utilization() {
        let plan = policy().optimize(6.0, None);
        assert!((plan.utilization() - 1.0).abs() < 1e-12);
        let plan = policy().optimize(4.5, None);
        // 4.5 of 4 billed is within hustle
        assert_eq!(plan.billed_hours, 4.0);
        let plan = policy().optimize(5.0, None);
        assert!((plan.utilization() - 5.0 / 6.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn billed_days_are_increments(raw in 0.1f64..400.0, floor in prop::option::of(1u32..30)) {
            let p = policy();
            let plan = p.optimize(raw, floor);
            prop_assert_eq!(plan.billed_days as usize, plan.day_hours.len());
            prop_assert!(plan.billed_days >= 1);
            for day in &plan.day_hours {
                prop_assert!(p.increments().iter().any(|inc| (inc - day).abs() < 1e-9));
            }
            let sum: f64 = plan.day_hours.iter().sum();
            prop_assert!((sum - plan.billed_hours).abs() < 1e-9);
        }

        #[test]
        fn billed_covers_raw_within_hustle(raw in 0.1f64..400.0, floor in prop::option::of(1u32..30)) {
            let p = policy();
            let plan = p.optimize(raw, floor);
            let allowance = p.hustle() * plan.billed_days as f64;
            prop_assert!(plan.billed_hours + allowance + 1e-9 >= raw);
        }
    }
}
