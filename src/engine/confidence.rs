//! Estimate confidence
//!
//! Four sub-scores in [0, 1] are combined into a weighted composite:
//! production reliability, benchmark alignment, scope definition and
//! data quality.

use serde::{Deserialize, Serialize};

use crate::core::reference::ReferenceData;
use crate::engine::checks::{check_activity, BenchmarkStatus};
use crate::engine::results::{ActivityResult, RangeStatus};
use crate::entities::estimate::JobMode;

/// Relative weight of each sub-score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub production_reliability: f64,
    pub benchmark_alignment: f64,
    pub scope_definition: f64,
    pub data_quality: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            production_reliability: 0.35,
            benchmark_alignment: 0.30,
            scope_definition: 0.20,
            data_quality: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ConfidenceLevel {
    #[default]
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MODERATE")]
    Moderate,
    #[serde(rename = "MOD-HIGH")]
    ModHigh,
    #[serde(rename = "HIGH")]
    High,
}

impl ConfidenceLevel {
    pub fn from_composite(composite: f64) -> Self {
        if composite >= 0.80 {
            ConfidenceLevel::High
        } else if composite >= 0.65 {
            ConfidenceLevel::ModHigh
        } else if composite >= 0.50 {
            ConfidenceLevel::Moderate
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::Low => write!(f, "LOW"),
            ConfidenceLevel::Moderate => write!(f, "MODERATE"),
            ConfidenceLevel::ModHigh => write!(f, "MOD-HIGH"),
            ConfidenceLevel::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConfidenceScore {
    pub production_reliability: f64,
    pub benchmark_alignment: f64,
    pub scope_definition: f64,
    pub data_quality: f64,
    pub composite: f64,
    pub level: ConfidenceLevel,
    /// Mean benchmark sample size behind the data-quality score
    pub mean_sample_size: f64,
}

/// Score for a mean benchmark sample size
pub fn data_quality_score(mean_sample_size: f64) -> f64 {
    if mean_sample_size >= 30.0 {
        1.0
    } else if mean_sample_size >= 15.0 {
        0.8
    } else if mean_sample_size >= 5.0 {
        0.6
    } else if mean_sample_size > 0.0 {
        0.4
    } else {
        0.2
    }
}

fn fraction(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Score the activities of one estimate
pub fn score(
    activities: &[ActivityResult],
    reference: &ReferenceData,
    job_mode: JobMode,
    weights: &ConfidenceWeights,
) -> ConfidenceScore {
    let active: Vec<&ActivityResult> = activities.iter().filter(|a| a.is_active()).collect();
    if active.is_empty() {
        return ConfidenceScore::default();
    }

    // direct-cost weighted, plain mean when nothing is priced
    let rated: Vec<(f64, f64)> = active
        .iter()
        .filter_map(|a| reference.reliability(a.activity_type).map(|r| (a.direct_cost.max(0.0), r)))
        .collect();
    let cost_sum: f64 = rated.iter().map(|(w, _)| w).sum();
    let production_reliability = if rated.is_empty() {
        0.0
    } else if cost_sum > 0.0 {
        rated.iter().map(|(w, r)| w * r).sum::<f64>() / cost_sum
    } else {
        rated.iter().map(|(_, r)| r).sum::<f64>() / rated.len() as f64
    };

    let checks: Vec<_> = active
        .iter()
        .filter_map(|a| check_activity(a, reference, job_mode))
        .collect();
    let benchmark_alignment = fraction(
        checks.iter().filter(|c| c.status == BenchmarkStatus::InRange).count(),
        checks.len(),
    );

    let ranged: Vec<_> = active.iter().filter_map(|a| a.quantity_check.as_ref()).collect();
    let scope_definition = fraction(
        ranged.iter().filter(|c| c.status == RangeStatus::Within).count(),
        ranged.len(),
    );

    let samples: Vec<f64> = active
        .iter()
        .filter_map(|a| reference.benchmark(job_mode, a.activity_type))
        .map(|b| b.sample_size as f64)
        .collect();
    let mean_sample_size = if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    };
    let data_quality = data_quality_score(mean_sample_size);

    let weight_sum = weights.production_reliability
        + weights.benchmark_alignment
        + weights.scope_definition
        + weights.data_quality;
    let composite = if weight_sum > 0.0 {
        (weights.production_reliability * production_reliability
            + weights.benchmark_alignment * benchmark_alignment
            + weights.scope_definition * scope_definition
            + weights.data_quality * data_quality)
            / weight_sum
    } else {
        0.0
    }
    .clamp(0.0, 1.0);

    ConfidenceScore {
        production_reliability,
        benchmark_alignment,
        scope_definition,
        data_quality,
        composite,
        level: ConfidenceLevel::from_composite(composite),
        mean_sample_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::results::{ActivityDetail, QuantityCheck, UnitCost};
    use crate::engine::tiers::production_tiers;
    use crate::engine::shift::ShiftPolicy;
    use crate::entities::activity::{Activity, ActivityType, Crew, Quantity, Unit};
    use proptest::prelude::*;

    fn result(id: &str, activity_type: ActivityType, direct: f64, unit_cost: f64) -> ActivityResult {
        let activity = Activity::new(
            id,
            activity_type,
            Quantity::new(1000.0, Unit::Sy),
            1000.0,
            Crew {
                name: String::new(),
                headcount: 5,
                hourly_rate: 45.0,
            },
        );
        ActivityResult {
            id: id.to_string(),
            name: id.to_string(),
            activity_type,
            unit: Unit::Sy,
            gross_quantity: 1000.0,
            duration_days: 1.0,
            crew_headcount: 5,
            detail: ActivityDetail::General,
            tiers: production_tiers(&activity, &ShiftPolicy::default()),
            trucking: None,
            labor_cost: direct,
            equipment_cost: 0.0,
            material_cost: 0.0,
            trucking_cost: 0.0,
            mobilization_cost: 0.0,
            clustered: false,
            direct_cost: direct,
            unit_cost: Some(UnitCost {
                value: unit_cost,
                per: Unit::Sy,
                quantity: 1000.0,
            }),
            quantity_check: Some(QuantityCheck {
                quantity: 1000.0,
                min: 500.0,
                max: 40000.0,
                unit: Unit::Sy,
                status: RangeStatus::Within,
            }),
            schedule: None,
        }
    }

    #[test]
    fn test_empty_estimate_is_low() {
        let reference = ReferenceData::embedded().unwrap();
        let s = score(&[], &reference, JobMode::ParkingLot, &ConfidenceWeights::default());
        assert_eq!(s.composite, 0.0);
        assert_eq!(s.level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_well_aligned_estimate_scores_high() {
        let reference = ReferenceData::embedded().unwrap();
        // parking lot surface: P25 11.00, P75 16.50, n = 40; reliability 0.85
        let acts = vec![result("pave", ActivityType::AsphaltSurface, 13_500.0, 13.5)];
        let s = score(&acts, &reference, JobMode::ParkingLot, &ConfidenceWeights::default());
        assert!((s.production_reliability - 0.85).abs() < 1e-12);
        assert_eq!(s.benchmark_alignment, 1.0);
        assert_eq!(s.scope_definition, 1.0);
        assert_eq!(s.data_quality, 1.0);
        // 0.35 x 0.85 + 0.30 + 0.20 + 0.15
        assert!((s.composite - 0.9475).abs() < 1e-9);
        assert_eq!(s.level, ConfidenceLevel::High);
    }

    #[test]
    fn test_reliability_is_cost_weighted() {
        let reference = ReferenceData::embedded().unwrap();
        // excavation 0.60 at 3000, surface 0.85 at 1000
        let acts = vec![
            result("dig", ActivityType::Excavation, 3000.0, 15.0),
            result("pave", ActivityType::AsphaltSurface, 1000.0, 13.0),
        ];
        let s = score(&acts, &reference, JobMode::ParkingLot, &ConfidenceWeights::default());
        assert!((s.production_reliability - (0.6 * 3000.0 + 0.85 * 1000.0) / 4000.0).abs() < 1e-12);
        // n = (42 + 40) / 2
        assert_eq!(s.mean_sample_size, 41.0);
    }

    #[test]
    fn test_zero_weights_yield_zero() {
        let reference = ReferenceData::embedded().unwrap();
        let acts = vec![result("pave", ActivityType::AsphaltSurface, 100.0, 13.0)];
        let weights = ConfidenceWeights {
            production_reliability: 0.0,
            benchmark_alignment: 0.0,
            scope_definition: 0.0,
            data_quality: 0.0,
        };
        let s = score(&acts, &reference, JobMode::ParkingLot, &weights);
        assert_eq!(s.composite, 0.0);
    }

    #[test]
    fn test_data_quality_buckets() {
        assert_eq!(data_quality_score(30.0), 1.0);
        assert_eq!(data_quality_score(15.0), 0.8);
        assert_eq!(data_quality_score(5.0), 0.6);
        assert_eq!(data_quality_score(1.0), 0.4);
        assert_eq!(data_quality_score(0.0), 0.2);
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(ConfidenceLevel::from_composite(0.80), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_composite(0.65), ConfidenceLevel::ModHigh);
        assert_eq!(ConfidenceLevel::from_composite(0.50), ConfidenceLevel::Moderate);
        assert_eq!(ConfidenceLevel::from_composite(0.49), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::ModHigh.to_string(), "MOD-HIGH");
    }

    proptest! {
        #[test]
        fn composite_stays_in_unit_range(
            weights in prop::array::uniform4(0.0f64..5.0),
            costs in prop::collection::vec((0.0f64..1e6, 0.0f64..100.0), 0..6),
            roadway in any::<bool>(),
        ) {
            let reference = ReferenceData::embedded().unwrap();
            let types = [
                ActivityType::Excavation,
                ActivityType::Milling,
                ActivityType::AsphaltSurface,
            ];
            let acts: Vec<ActivityResult> = costs
                .iter()
                .enumerate()
                .map(|(i, (direct, unit_cost))| {
                    result(&format!("a{}", i), types[i % types.len()], *direct, *unit_cost)
                })
                .collect();
            let weights = ConfidenceWeights {
                production_reliability: weights[0],
                benchmark_alignment: weights[1],
                scope_definition: weights[2],
                data_quality: weights[3],
            };
            let mode = if roadway { JobMode::Roadway } else { JobMode::ParkingLot };

            let s = score(&acts, &reference, mode, &weights);
            prop_assert!((0.0..=1.0).contains(&s.composite));
            prop_assert_eq!(s.level, ConfidenceLevel::from_composite(s.composite));
        }
    }
}
