//! Unit-cost checks against historical benchmarks

use serde::{Deserialize, Serialize};

use crate::core::reference::{Benchmark, ReferenceData};
use crate::engine::results::ActivityResult;
use crate::entities::activity::ActivityType;
use crate::entities::estimate::JobMode;

/// Band a unit cost falls in relative to its benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BenchmarkStatus {
    VeryLow,
    Low,
    InRange,
    High,
    VeryHigh,
}

impl BenchmarkStatus {
    /// Classify `unit_cost` against the benchmark's P25/P75 band
    pub fn classify(unit_cost: f64, benchmark: &Benchmark) -> Self {
        if unit_cost < 0.5 * benchmark.p25 {
            BenchmarkStatus::VeryLow
        } else if unit_cost < benchmark.p25 {
            BenchmarkStatus::Low
        } else if unit_cost <= benchmark.p75 {
            BenchmarkStatus::InRange
        } else if unit_cost <= 1.5 * benchmark.p75 {
            BenchmarkStatus::High
        } else {
            BenchmarkStatus::VeryHigh
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, BenchmarkStatus::High | BenchmarkStatus::VeryHigh)
    }

    pub fn is_low(&self) -> bool {
        matches!(self, BenchmarkStatus::Low | BenchmarkStatus::VeryLow)
    }

    pub fn is_extreme(&self) -> bool {
        matches!(self, BenchmarkStatus::VeryLow | BenchmarkStatus::VeryHigh)
    }
}

impl std::fmt::Display for BenchmarkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchmarkStatus::VeryLow => write!(f, "VERY_LOW"),
            BenchmarkStatus::Low => write!(f, "LOW"),
            BenchmarkStatus::InRange => write!(f, "IN_RANGE"),
            BenchmarkStatus::High => write!(f, "HIGH"),
            BenchmarkStatus::VeryHigh => write!(f, "VERY_HIGH"),
        }
    }
}

/// Unit cost of one activity compared with its benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCostCheck {
    pub activity_id: String,
    pub activity_type: ActivityType,
    pub unit_cost: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub sample_size: u32,
    pub status: BenchmarkStatus,
}

/// Check one activity; `None` when inactive, unpriced or unbenchmarked
pub fn check_activity(
    activity: &ActivityResult,
    reference: &ReferenceData,
    job_mode: JobMode,
) -> Option<UnitCostCheck> {
    if !activity.is_active() {
        return None;
    }
    let unit_cost = activity.unit_cost?;
    let benchmark = reference.benchmark(job_mode, activity.activity_type)?;

    Some(UnitCostCheck {
        activity_id: activity.id.clone(),
        activity_type: activity.activity_type,
        unit_cost: unit_cost.value,
        p25: benchmark.p25,
        median: benchmark.median,
        p75: benchmark.p75,
        sample_size: benchmark.sample_size,
        status: BenchmarkStatus::classify(unit_cost.value, benchmark),
    })
}

/// Checks for every benchmarked active activity, in activity order
pub fn unit_cost_checks(
    activities: &[ActivityResult],
    reference: &ReferenceData,
    job_mode: JobMode,
) -> Vec<UnitCostCheck> {
    activities
        .iter()
        .filter_map(|a| check_activity(a, reference, job_mode))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::activity::Unit;

    fn benchmark() -> Benchmark {
        Benchmark {
            p25: 10.0,
            median: 12.0,
            p75: 14.0,
            sample_size: 20,
            unit: Unit::Sy,
        }
    }

    #[test]
    fn test_band_edges() {
        let b = benchmark();
        assert_eq!(BenchmarkStatus::classify(4.9, &b), BenchmarkStatus::VeryLow);
        assert_eq!(BenchmarkStatus::classify(5.0, &b), BenchmarkStatus::Low);
        assert_eq!(BenchmarkStatus::classify(10.0, &b), BenchmarkStatus::InRange);
        assert_eq!(BenchmarkStatus::classify(14.0, &b), BenchmarkStatus::InRange);
        assert_eq!(BenchmarkStatus::classify(14.01, &b), BenchmarkStatus::High);
        assert_eq!(BenchmarkStatus::classify(21.0, &b), BenchmarkStatus::High);
        assert_eq!(BenchmarkStatus::classify(21.0 + 1e-9, &b), BenchmarkStatus::VeryHigh);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(BenchmarkStatus::InRange.to_string(), "IN_RANGE");
        assert_eq!(
            serde_json::to_string(&BenchmarkStatus::VeryHigh).unwrap(),
            "\"VERY_HIGH\""
        );
    }
}
