//! Estimate results - everything the calculator produces for one run

use serde::{Deserialize, Serialize};

use crate::engine::calendar::Timeline;
use crate::engine::checks::UnitCostCheck;
use crate::engine::cluster::ClusterSummary;
use crate::engine::confidence::ConfidenceScore;
use crate::engine::rules::Observation;
use crate::engine::scheduler::{Schedule, ScheduleEntry};
use crate::engine::tiers::TierSet;
use crate::engine::trucking::TruckingResult;
use crate::entities::activity::{ActivityType, Unit};
use crate::entities::estimate::{IndirectKind, JobMode};

/// Material quantities specific to the kind of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityDetail {
    Earthwork { bank_cy: f64, loose_cy: f64 },
    Paving { tons: f64 },
    Milling { reclaimed_tons: f64 },
    Aggregate { tons: f64 },
    #[default]
    General,
}

impl ActivityDetail {
    /// Asphalt placed, when this is paving work
    pub fn asphalt_tons(&self) -> Option<f64> {
        match self {
            ActivityDetail::Paving { tons } => Some(*tons),
            _ => None,
        }
    }
}

/// Where a quantity sits against the typical job size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeStatus {
    Below,
    Within,
    Above,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityCheck {
    /// Quantity in the range's unit
    pub quantity: f64,
    pub min: f64,
    pub max: f64,
    pub unit: Unit,
    pub status: RangeStatus,
}

/// Direct cost per benchmark unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitCost {
    pub value: f64,
    /// SY or CY
    pub per: Unit,
    pub quantity: f64,
}

/// Cost and schedule detail for one activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityResult {
    pub id: String,
    pub name: String,
    pub activity_type: ActivityType,
    pub unit: Unit,
    pub gross_quantity: f64,
    pub duration_days: f64,
    pub crew_headcount: u32,
    pub detail: ActivityDetail,
    pub tiers: TierSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trucking: Option<TruckingResult>,
    pub labor_cost: f64,
    pub equipment_cost: f64,
    pub material_cost: f64,
    pub trucking_cost: f64,
    pub mobilization_cost: f64,
    /// Mobilization is carried by a cluster
    pub clustered: bool,
    pub direct_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<UnitCost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_check: Option<QuantityCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleEntry>,
}

impl ActivityResult {
    pub fn is_active(&self) -> bool {
        self.gross_quantity > 0.0
    }

    /// Direct cost before mobilization
    pub fn work_cost(&self) -> f64 {
        self.labor_cost + self.equipment_cost + self.material_cost + self.trucking_cost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndirectLine {
    pub name: String,
    pub kind: IndirectKind,
    pub amount: f64,
    pub cost: f64,
}

/// Roll-up of every cost bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CostTotals {
    pub labor: f64,
    pub equipment: f64,
    pub material: f64,
    pub trucking: f64,
    /// Per-activity plus cluster mobilization
    pub mobilization: f64,
    pub safety: f64,
    pub direct: f64,
    pub indirect_lines: Vec<IndirectLine>,
    pub indirect: f64,
    pub overhead: f64,
    pub profit: f64,
    pub contingency: f64,
    pub total: f64,
}

impl CostTotals {
    /// Direct plus indirect, before markups
    pub fn subtotal(&self) -> f64 {
        self.direct + self.indirect
    }
}

/// Output of one calculator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResults {
    pub estimate: String,
    pub job_mode: JobMode,
    pub trucking_rate: f64,
    pub activities: Vec<ActivityResult>,
    pub schedule: Schedule,
    pub near_critical: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clusters: Option<ClusterSummary>,
    pub totals: CostTotals,
    pub confidence: ConfidenceScore,
    pub unit_cost_checks: Vec<UnitCostCheck>,
    pub observations: Vec<Observation>,
    pub timeline: Timeline,
}

impl EstimateResults {
    pub fn activity(&self, id: &str) -> Option<&ActivityResult> {
        self.activities.iter().find(|a| a.id == id)
    }

    pub fn active_activities(&self) -> impl Iterator<Item = &ActivityResult> {
        self.activities.iter().filter(|a| a.is_active())
    }
}
