//! Reference tables - benchmarks, crews, quantity ranges, clusters and
//! conversion constants supplied to the estimating engine
//!
//! Tables are keyed by [`ActivityType`] and [`JobMode`] rather than by
//! string, and are validated once when loaded. A built-in set is embedded
//! in the binary; a replacement can be loaded from any YAML file.

use miette::Diagnostic;
use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::entities::activity::{Activity, ActivityType, BenchmarkBasis, Unit};
use crate::entities::estimate::JobMode;
use crate::yaml::{YamlError, YamlSyntaxError};

#[derive(Embed)]
#[folder = "data/"]
struct EmbeddedTables;

const DEFAULT_TABLES: &str = "reference.yaml";

/// Historical unit-cost distribution for one activity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub sample_size: u32,
    pub unit: Unit,
}

/// Typical job-size band for one activity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityRange {
    pub min: f64,
    pub max: f64,
    pub unit: Unit,
}

impl QuantityRange {
    pub fn contains(&self, quantity: f64) -> bool {
        quantity >= self.min && quantity <= self.max
    }
}

/// Standard crew from the roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewSpec {
    pub name: String,
    pub headcount: u32,
    pub hourly_rate: f64,
    #[serde(default)]
    pub activity_types: Vec<ActivityType>,
}

/// One tier of size-based crew selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewThreshold {
    /// Upper quantity bound for this tier (unbounded when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_to: Option<f64>,
    pub crew: String,
    pub min_headcount: u32,
    pub max_headcount: u32,
}

/// Mobilization cluster kinds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ClusterKind {
    Earthwork,
    Milling,
    Paving,
    MillingPaving,
}

impl std::fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterKind::Earthwork => write!(f, "earthwork"),
            ClusterKind::Milling => write!(f, "milling"),
            ClusterKind::Paving => write!(f, "paving"),
            ClusterKind::MillingPaving => write!(f, "milling_paving"),
        }
    }
}

/// Activity types that travel together on one mobilization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDefinition {
    pub kind: ClusterKind,
    pub name: String,
    pub activity_types: Vec<ActivityType>,
    /// Hourly cost of the crew and haulers moving the spread
    pub mobilization_crew_rate: f64,
}

/// Unit conversion constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conversions {
    pub asphalt_tons_per_sy_inch: f64,
    pub milling_tons_per_sy_inch: f64,
    pub aggregate_tons_per_cy: f64,
    pub soil_tons_per_cy: f64,
    /// Loose volume / bank volume for excavated material
    pub swell_factor: f64,
}

impl Default for Conversions {
    fn default() -> Self {
        Self {
            asphalt_tons_per_sy_inch: 0.0555,
            milling_tons_per_sy_inch: 0.0555,
            aggregate_tons_per_cy: 1.5,
            soil_tons_per_cy: 1.4,
            swell_factor: 1.25,
        }
    }
}

const SF_PER_SY: f64 = 9.0;
const SY_INCHES_PER_CY: f64 = 36.0;

impl Conversions {
    fn thickness(activity: &Activity) -> Option<f64> {
        activity.thickness_inches.filter(|t| *t > 0.0)
    }

    fn tons_per_sy_inch(&self, activity_type: ActivityType) -> f64 {
        match activity_type {
            ActivityType::Milling => self.milling_tons_per_sy_inch,
            _ => self.asphalt_tons_per_sy_inch,
        }
    }

    fn tons_per_cy(&self, activity_type: ActivityType) -> f64 {
        match activity_type {
            ActivityType::AggregateBase => self.aggregate_tons_per_cy,
            _ => self.soil_tons_per_cy,
        }
    }

    /// Gross quantity expressed in square yards
    pub fn area_sy(&self, activity: &Activity) -> Option<f64> {
        let gross = activity.gross_quantity();
        match activity.quantity.unit {
            Unit::Sy => Some(gross),
            Unit::Sf => Some(gross / SF_PER_SY),
            Unit::Cy => Self::thickness(activity).map(|t| gross * SY_INCHES_PER_CY / t),
            Unit::Ton => {
                let per_sy = self.tons_per_sy_inch(activity.activity_type);
                Self::thickness(activity)
                    .filter(|_| per_sy > 0.0)
                    .map(|t| gross / (per_sy * t))
            }
            Unit::Lf => None,
        }
    }

    /// Gross quantity expressed in (bank) cubic yards
    pub fn volume_cy(&self, activity: &Activity) -> Option<f64> {
        let gross = activity.gross_quantity();
        match activity.quantity.unit {
            Unit::Cy => Some(gross),
            Unit::Sy | Unit::Sf => {
                let sy = self.area_sy(activity)?;
                Self::thickness(activity).map(|t| sy * t / SY_INCHES_PER_CY)
            }
            Unit::Ton => {
                let per_cy = self.tons_per_cy(activity.activity_type);
                (per_cy > 0.0).then(|| gross / per_cy)
            }
            Unit::Lf => None,
        }
    }

    /// Placed or removed tonnage for the activity's material
    pub fn tons(&self, activity: &Activity) -> Option<f64> {
        if activity.quantity.unit == Unit::Ton {
            return Some(activity.gross_quantity());
        }
        match activity.activity_type {
            ActivityType::AsphaltBase | ActivityType::AsphaltSurface | ActivityType::Milling => {
                let sy = self.area_sy(activity)?;
                let t = Self::thickness(activity)?;
                Some(sy * t * self.tons_per_sy_inch(activity.activity_type))
            }
            ActivityType::AggregateBase | ActivityType::Excavation => self
                .volume_cy(activity)
                .map(|cy| cy * self.tons_per_cy(activity.activity_type)),
            _ => None,
        }
    }

    /// Gross quantity expressed in `unit`, when a conversion exists
    pub fn quantity_in(&self, activity: &Activity, unit: Unit) -> Option<f64> {
        if activity.quantity.unit == unit {
            return Some(activity.gross_quantity());
        }
        match unit {
            Unit::Sy => self.area_sy(activity),
            Unit::Sf => self.area_sy(activity).map(|sy| sy * SF_PER_SY),
            Unit::Cy => self.volume_cy(activity),
            Unit::Ton => self.tons(activity),
            Unit::Lf => None,
        }
    }

    /// Denominator for unit-cost comparison against benchmarks
    pub fn benchmark_quantity(&self, activity: &Activity) -> Option<f64> {
        let q = match activity.activity_type.benchmark_basis() {
            BenchmarkBasis::Area => self.area_sy(activity),
            BenchmarkBasis::Volume => self.volume_cy(activity),
        }?;
        (q > 0.0).then_some(q)
    }
}

/// Reference table validation and loading failures
#[derive(Debug, Error, Diagnostic)]
pub enum ReferenceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Yaml(#[from] YamlError),

    #[error("Embedded reference tables are missing")]
    #[diagnostic(code(pave::reference::missing))]
    MissingEmbedded,

    #[error("Benchmark for {activity} ({mode}) is invalid: {reason}")]
    #[diagnostic(
        code(pave::reference::benchmark),
        help("Benchmarks need 0 <= p25 <= median <= p75 in the type's basis unit (SY or CY)")
    )]
    InvalidBenchmark {
        mode: JobMode,
        activity: ActivityType,
        reason: String,
    },

    #[error("Quantity range for {activity} ({mode}) has min {min} above max {max}")]
    #[diagnostic(code(pave::reference::range))]
    InvalidRange {
        mode: JobMode,
        activity: ActivityType,
        min: f64,
        max: f64,
    },

    #[error("Reliability for {activity} must be within 0..=1, got {value}")]
    #[diagnostic(code(pave::reference::reliability))]
    InvalidReliability { activity: ActivityType, value: f64 },

    #[error("Crew thresholds for {activity} are invalid: {reason}")]
    #[diagnostic(
        code(pave::reference::crew_threshold),
        help("Tiers must ascend by up_to and only the last tier may omit it")
    )]
    InvalidThresholds {
        activity: ActivityType,
        reason: String,
    },

    #[error("Crew threshold for {activity} names unknown crew '{crew}'")]
    #[diagnostic(code(pave::reference::unknown_crew))]
    UnknownCrew { activity: ActivityType, crew: String },

    #[error("Cluster '{0}' is defined more than once")]
    #[diagnostic(code(pave::reference::duplicate_cluster))]
    DuplicateCluster(ClusterKind),

    #[error("Negative rate in {0}")]
    #[diagnostic(code(pave::reference::negative_rate))]
    NegativeRate(String),
}

/// All reference tables consumed by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReferenceData {
    pub benchmarks: BTreeMap<JobMode, BTreeMap<ActivityType, Benchmark>>,
    pub reliability: BTreeMap<ActivityType, f64>,
    pub quantity_ranges: BTreeMap<JobMode, BTreeMap<ActivityType, QuantityRange>>,
    pub crews: Vec<CrewSpec>,
    pub crew_thresholds: BTreeMap<ActivityType, Vec<CrewThreshold>>,
    pub clusters: Vec<ClusterDefinition>,
    pub safety_crew_rate: f64,
    pub conversions: Conversions,
}

impl ReferenceData {
    /// Built-in tables shipped with the binary
    pub fn embedded() -> Result<Self, ReferenceError> {
        let file = EmbeddedTables::get(DEFAULT_TABLES).ok_or(ReferenceError::MissingEmbedded)?;
        let content = String::from_utf8_lossy(&file.data);
        Self::from_yaml(&content, DEFAULT_TABLES)
    }

    /// Load and validate tables from a YAML file
    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let content = std::fs::read_to_string(path).map_err(YamlError::from)?;
        Self::from_yaml(&content, &path.display().to_string())
    }

    pub fn from_yaml(content: &str, filename: &str) -> Result<Self, ReferenceError> {
        let data: ReferenceData = serde_yml::from_str(content)
            .map_err(|e| YamlError::from(YamlSyntaxError::from_serde_error(&e, content, filename)))?;
        data.validate()?;
        Ok(data)
    }

    /// Check table invariants the engine relies on
    pub fn validate(&self) -> Result<(), ReferenceError> {
        for (mode, table) in &self.benchmarks {
            for (activity, b) in table {
                let invalid = |reason: &str| ReferenceError::InvalidBenchmark {
                    mode: *mode,
                    activity: *activity,
                    reason: reason.to_string(),
                };
                if b.p25 < 0.0 || b.p25 > b.median || b.median > b.p75 {
                    return Err(invalid("percentiles out of order"));
                }
                let expected = match activity.benchmark_basis() {
                    BenchmarkBasis::Area => Unit::Sy,
                    BenchmarkBasis::Volume => Unit::Cy,
                };
                if b.unit != expected {
                    return Err(invalid(&format!("unit must be {}", expected)));
                }
            }
        }

        for (mode, table) in &self.quantity_ranges {
            for (activity, r) in table {
                if r.min > r.max {
                    return Err(ReferenceError::InvalidRange {
                        mode: *mode,
                        activity: *activity,
                        min: r.min,
                        max: r.max,
                    });
                }
            }
        }

        for (activity, value) in &self.reliability {
            if !(0.0..=1.0).contains(value) {
                return Err(ReferenceError::InvalidReliability {
                    activity: *activity,
                    value: *value,
                });
            }
        }

        for crew in &self.crews {
            if crew.hourly_rate < 0.0 {
                return Err(ReferenceError::NegativeRate(format!("crew '{}'", crew.name)));
            }
        }

        for (activity, tiers) in &self.crew_thresholds {
            let mut previous = f64::NEG_INFINITY;
            for (i, tier) in tiers.iter().enumerate() {
                if self.crew(&tier.crew).is_none() {
                    return Err(ReferenceError::UnknownCrew {
                        activity: *activity,
                        crew: tier.crew.clone(),
                    });
                }
                if tier.min_headcount > tier.max_headcount {
                    return Err(ReferenceError::InvalidThresholds {
                        activity: *activity,
                        reason: format!("tier {} has min_headcount above max_headcount", i + 1),
                    });
                }
                match tier.up_to {
                    Some(bound) if bound <= previous => {
                        return Err(ReferenceError::InvalidThresholds {
                            activity: *activity,
                            reason: format!("tier {} does not ascend", i + 1),
                        });
                    }
                    Some(bound) => previous = bound,
                    None if i + 1 != tiers.len() => {
                        return Err(ReferenceError::InvalidThresholds {
                            activity: *activity,
                            reason: format!("unbounded tier {} is not last", i + 1),
                        });
                    }
                    None => {}
                }
            }
        }

        let mut seen = Vec::new();
        for cluster in &self.clusters {
            if seen.contains(&cluster.kind) {
                return Err(ReferenceError::DuplicateCluster(cluster.kind));
            }
            seen.push(cluster.kind);
            if cluster.mobilization_crew_rate < 0.0 {
                return Err(ReferenceError::NegativeRate(format!("cluster '{}'", cluster.name)));
            }
        }

        if self.safety_crew_rate < 0.0 {
            return Err(ReferenceError::NegativeRate("safety_crew_rate".to_string()));
        }

        Ok(())
    }

    pub fn benchmark(&self, mode: JobMode, activity: ActivityType) -> Option<&Benchmark> {
        self.benchmarks.get(&mode)?.get(&activity)
    }

    pub fn quantity_range(&self, mode: JobMode, activity: ActivityType) -> Option<&QuantityRange> {
        self.quantity_ranges.get(&mode)?.get(&activity)
    }

    pub fn reliability(&self, activity: ActivityType) -> Option<f64> {
        self.reliability.get(&activity).copied()
    }

    pub fn crew(&self, name: &str) -> Option<&CrewSpec> {
        self.crews.iter().find(|c| c.name == name)
    }

    /// Crew tier that applies to a job of `quantity`
    pub fn crew_threshold(&self, activity: ActivityType, quantity: f64) -> Option<&CrewThreshold> {
        self.crew_thresholds
            .get(&activity)?
            .iter()
            .find(|t| t.up_to.map_or(true, |bound| quantity <= bound))
    }

    pub fn cluster(&self, kind: ClusterKind) -> Option<&ClusterDefinition> {
        self.clusters.iter().find(|c| c.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::activity::{Crew, Quantity};

    fn activity(activity_type: ActivityType, net: f64, unit: Unit, thickness: Option<f64>) -> Activity {
        let mut a = Activity::new(
            "a",
            activity_type,
            Quantity::new(net, unit),
            1000.0,
            Crew {
                name: String::new(),
                headcount: 4,
                hourly_rate: 50.0,
            },
        );
        a.thickness_inches = thickness;
        a
    }

    #[test]
    fn test_embedded_tables_load_and_validate() {
        let data = ReferenceData::embedded().unwrap();
        assert!(data
            .benchmark(JobMode::ParkingLot, ActivityType::AsphaltSurface)
            .is_some());
        assert!(data.cluster(ClusterKind::MillingPaving).is_some());
        assert!(data.safety_crew_rate > 0.0);
        // striping has no area benchmark
        assert!(data
            .benchmark(JobMode::ParkingLot, ActivityType::Striping)
            .is_none());
    }

    #[test]
    fn test_crew_threshold_selects_tier() {
        let data = ReferenceData::embedded().unwrap();
        let small = data
            .crew_threshold(ActivityType::AsphaltSurface, 1000.0)
            .unwrap();
        assert_eq!(small.crew, "Small Paving Crew");
        let large = data
            .crew_threshold(ActivityType::AsphaltSurface, 50_000.0)
            .unwrap();
        assert_eq!(large.crew, "Large Paving Crew");
        assert!(data.crew_threshold(ActivityType::Striping, 10.0).is_none());
    }

    #[test]
    fn test_rejects_out_of_order_benchmark() {
        let yaml = r#"
benchmarks:
  roadway:
    milling: { p25: 5.0, median: 3.0, p75: 4.0, sample_size: 10, unit: sy }
"#;
        let err = ReferenceData::from_yaml(yaml, "bad.yaml").unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidBenchmark { .. }));
    }

    #[test]
    fn test_rejects_wrong_benchmark_unit() {
        let yaml = r#"
benchmarks:
  roadway:
    excavation: { p25: 1.0, median: 2.0, p75: 3.0, sample_size: 10, unit: sy }
"#;
        let err = ReferenceData::from_yaml(yaml, "bad.yaml").unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidBenchmark { .. }));
    }

    #[test]
    fn test_rejects_unknown_crew_in_threshold() {
        let yaml = r#"
crew_thresholds:
  milling:
    - { crew: Ghost Crew, min_headcount: 1, max_headcount: 2 }
"#;
        let err = ReferenceData::from_yaml(yaml, "bad.yaml").unwrap_err();
        assert!(matches!(err, ReferenceError::UnknownCrew { .. }));
    }

    #[test]
    fn test_rejects_duplicate_cluster() {
        let yaml = r#"
clusters:
  - { kind: paving, name: A, activity_types: [asphalt_surface], mobilization_crew_rate: 1 }
  - { kind: paving, name: B, activity_types: [asphalt_base], mobilization_crew_rate: 1 }
"#;
        let err = ReferenceData::from_yaml(yaml, "bad.yaml").unwrap_err();
        assert!(matches!(err, ReferenceError::DuplicateCluster(ClusterKind::Paving)));
    }

    #[test]
    fn test_area_and_volume_conversions() {
        let conv = Conversions::default();

        let pave = activity(ActivityType::AsphaltSurface, 1000.0, Unit::Sy, Some(2.0));
        assert_eq!(conv.area_sy(&pave), Some(1000.0));
        // 1000 SY x 2 in / 36 = 55.55 CY
        assert!((conv.volume_cy(&pave).unwrap() - 1000.0 * 2.0 / 36.0).abs() < 1e-9);
        // 1000 SY x 2 in x 0.0555 = 111 tons
        assert!((conv.tons(&pave).unwrap() - 111.0).abs() < 1e-9);

        let tons = activity(ActivityType::AsphaltSurface, 111.0, Unit::Ton, Some(2.0));
        assert!((conv.area_sy(&tons).unwrap() - 1000.0).abs() < 1e-9);

        let base = activity(ActivityType::AggregateBase, 100.0, Unit::Cy, None);
        assert_eq!(conv.benchmark_quantity(&base), Some(100.0));
        assert!((conv.tons(&base).unwrap() - 150.0).abs() < 1e-9);

        let stripe = activity(ActivityType::Striping, 500.0, Unit::Lf, None);
        assert_eq!(conv.benchmark_quantity(&stripe), None);

        assert_eq!(conv.quantity_in(&pave, Unit::Sf), Some(9000.0));
        assert_eq!(conv.quantity_in(&stripe, Unit::Lf), Some(500.0));
        assert_eq!(conv.quantity_in(&pave, Unit::Lf), None);

        // SY without thickness has no volume
        let exc = activity(ActivityType::Excavation, 100.0, Unit::Sy, None);
        assert_eq!(conv.benchmark_quantity(&exc), None);
    }
}
