//! Three-tier production scenarios
//!
//! Each activity is evaluated at a conservative, standard and aggressive
//! production rate and billed through the shift optimizer.

use serde::{Deserialize, Serialize};

use crate::engine::shift::{ShiftPlan, ShiftPolicy};
use crate::entities::activity::Activity;

/// Production scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Conservative,
    Standard,
    Aggressive,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Conservative, Tier::Standard, Tier::Aggressive];

    /// Production rate multiplier
    pub fn multiplier(&self) -> f64 {
        match self {
            Tier::Conservative => 0.80,
            Tier::Standard => 1.00,
            Tier::Aggressive => 1.20,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Conservative => write!(f, "conservative"),
            Tier::Standard => write!(f, "standard"),
            Tier::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierResult {
    pub tier: Tier,
    /// Output per standard shift at this tier
    pub adjusted_rate: f64,
    pub raw_duration_days: f64,
    pub raw_hours: f64,
    pub plan: ShiftPlan,
}

impl TierResult {
    fn zero(tier: Tier) -> Self {
        Self {
            tier,
            adjusted_rate: 0.0,
            raw_duration_days: 0.0,
            raw_hours: 0.0,
            plan: ShiftPlan::default(),
        }
    }

    pub fn billed_hours(&self) -> f64 {
        self.plan.billed_hours
    }

    pub fn billed_days(&self) -> u32 {
        self.plan.billed_days
    }
}

/// All three scenarios for an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSet {
    pub conservative: TierResult,
    pub standard: TierResult,
    pub aggressive: TierResult,
}

impl TierSet {
    pub fn get(&self, tier: Tier) -> &TierResult {
        match tier {
            Tier::Conservative => &self.conservative,
            Tier::Standard => &self.standard,
            Tier::Aggressive => &self.aggressive,
        }
    }
}

/// Evaluate one tier for `gross_quantity` at `base_rate` x `productivity`
pub fn evaluate_tier(
    tier: Tier,
    gross_quantity: f64,
    base_rate: f64,
    productivity: f64,
    min_days: Option<u32>,
    policy: &ShiftPolicy,
) -> TierResult {
    let adjusted_rate = base_rate * productivity * tier.multiplier();
    if !(gross_quantity > 0.0) || !(adjusted_rate > 0.0) || !adjusted_rate.is_finite() {
        return TierResult::zero(tier);
    }

    let raw_duration_days = gross_quantity / adjusted_rate;
    let raw_hours = raw_duration_days * policy.standard_hours();

    TierResult {
        tier,
        adjusted_rate,
        raw_duration_days,
        raw_hours,
        plan: policy.optimize(raw_hours, min_days),
    }
}

/// Conservative, standard and aggressive scenarios for an activity
pub fn production_tiers(activity: &Activity, policy: &ShiftPolicy) -> TierSet {
    let eval = |tier| {
        evaluate_tier(
            tier,
            activity.gross_quantity(),
            activity.production_rate.per_shift(),
            activity.productivity(),
            activity.min_days,
            policy,
        )
    };

    TierSet {
        conservative: eval(Tier::Conservative),
        standard: eval(Tier::Standard),
        aggressive: eval(Tier::Aggressive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::activity::{ActivityType, Crew, Quantity, Unit};
    use proptest::prelude::*;

    fn activity(quantity: f64, rate: f64) -> Activity {
        Activity::new(
            "pave",
            ActivityType::AsphaltSurface,
            Quantity::new(quantity, Unit::Sy),
            rate,
            Crew {
                name: "Paving Crew".to_string(),
                headcount: 7,
                hourly_rate: 46.0,
            },
        )
    }

    #[test]
    fn test_standard_tier_matches_base_rate() {
        let tiers = production_tiers(&activity(2000.0, 1000.0), &ShiftPolicy::default());
        assert_eq!(tiers.standard.adjusted_rate, 1000.0);
        assert_eq!(tiers.standard.raw_duration_days, 2.0);
        assert_eq!(tiers.standard.raw_hours, 16.0);
        assert_eq!(tiers.standard.billed_hours(), 16.0);
        assert_eq!(tiers.standard.billed_days(), 2);
    }

    #[test]
    fn test_conservative_is_slower() {
        let tiers = production_tiers(&activity(2000.0, 1000.0), &ShiftPolicy::default());
        // 2000 / 800 = 2.5 days = 20 h
        assert!((tiers.conservative.raw_duration_days - 2.5).abs() < 1e-12);
        assert!((tiers.conservative.raw_hours - 20.0).abs() < 1e-9);
        assert!(tiers.get(Tier::Aggressive).raw_duration_days < 2.0);
    }

    #[test]
    fn test_zero_rate_yields_zero_tiers() {
        let tiers = production_tiers(&activity(2000.0, 0.0), &ShiftPolicy::default());
        for tier in Tier::ALL {
            let t = tiers.get(tier);
            assert_eq!(t.raw_hours, 0.0);
            assert_eq!(t.billed_hours(), 0.0);
            assert_eq!(t.billed_days(), 0);
        }

        let tiers = production_tiers(&activity(0.0, 1000.0), &ShiftPolicy::default());
        assert_eq!(tiers.standard.billed_days(), 0);
    }

    proptest! {
        #[test]
        fn tier_durations_are_ordered(quantity in 1.0f64..100_000.0, rate in 1.0f64..20_000.0) {
            let tiers = production_tiers(&activity(quantity, rate), &ShiftPolicy::default());
            prop_assert!(tiers.conservative.raw_duration_days >= tiers.standard.raw_duration_days);
            prop_assert!(tiers.standard.raw_duration_days >= tiers.aggressive.raw_duration_days);
            prop_assert!(tiers.conservative.raw_hours >= tiers.aggressive.raw_hours);
        }
    }
}
