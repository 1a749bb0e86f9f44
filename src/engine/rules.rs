//! Analysis rules
//!
//! Each rule looks at the finished estimate and reports zero or more
//! observations. Rules are independent; a rule whose reference data is
//! missing simply reports nothing.

use serde::{Deserialize, Serialize};

use crate::core::reference::ReferenceData;
use crate::engine::checks::{BenchmarkStatus, UnitCostCheck};
use crate::engine::results::{ActivityResult, CostTotals, RangeStatus};
use crate::engine::shift::ShiftPolicy;
use crate::entities::estimate::{Estimate, JobMode};

/// Tunable limits used by the rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisThresholds {
    /// Raw / billed hours below this is flagged
    pub min_shift_utilization: f64,
    /// Paving activities billed in this many days or fewer are "short"
    pub combo_crew_max_days: u32,
    /// Asphalt tonnage below which plants add a small-order fee
    pub plant_minimum_tons: f64,
    /// Mobilization share of direct cost, in percent
    pub mobilization_percent: f64,
    /// Minimum benchmarked activities before a systemic pattern is reported
    pub systemic_min_activities: usize,
    /// Share of benchmarked activities that must lean the same way
    pub systemic_share: f64,
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            min_shift_utilization: 0.60,
            combo_crew_max_days: 1,
            plant_minimum_tons: 300.0,
            mobilization_percent: 10.0,
            systemic_min_activities: 2,
            systemic_share: 0.60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    QuantityRange,
    UnitCostBenchmark,
    ShiftUtilization,
    CrewSize,
    ComboCrew,
    Overtime,
    RoadwaySafety,
    LowTonnage,
    Mobilization,
    SystemicCost,
    MissingTrucking,
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RuleId::QuantityRange => "quantity-range",
            RuleId::UnitCostBenchmark => "unit-cost-benchmark",
            RuleId::ShiftUtilization => "shift-utilization",
            RuleId::CrewSize => "crew-size",
            RuleId::ComboCrew => "combo-crew",
            RuleId::Overtime => "overtime",
            RuleId::RoadwaySafety => "roadway-safety",
            RuleId::LowTonnage => "low-tonnage",
            RuleId::Mobilization => "mobilization",
            RuleId::SystemicCost => "systemic-cost",
            RuleId::MissingTrucking => "missing-trucking",
        };
        write!(f, "{}", s)
    }
}

/// A finding reported by a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub rule: RuleId,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl Observation {
    fn new(rule: RuleId, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity,
            activity_id: None,
            message: message.into(),
            reasons: Vec::new(),
        }
    }

    fn for_activity(mut self, id: &str) -> Self {
        self.activity_id = Some(id.to_string());
        self
    }

    fn because(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }
}

/// Everything a rule may look at
pub struct AnalysisContext<'a> {
    pub estimate: &'a Estimate,
    pub activities: &'a [ActivityResult],
    pub checks: &'a [UnitCostCheck],
    pub totals: &'a CostTotals,
    pub reference: &'a ReferenceData,
    pub thresholds: &'a AnalysisThresholds,
}

impl AnalysisContext<'_> {
    fn active(&self) -> impl Iterator<Item = &ActivityResult> {
        self.activities.iter().filter(|a| a.is_active())
    }

    /// Shift length as billed, with unusable settings replaced
    fn standard_hours(&self) -> f64 {
        ShiftPolicy::from_settings(&self.estimate.shift).standard_hours()
    }
}

/// A single analysis rule
pub trait Rule: Send + Sync {
    fn id(&self) -> RuleId;

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation>;
}

/// Job size outside the typical range
pub struct QuantityRangeRule;

impl Rule for QuantityRangeRule {
    fn id(&self) -> RuleId {
        RuleId::QuantityRange
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation> {
        ctx.active()
            .filter_map(|a| {
                let check = a.quantity_check.as_ref()?;
                let range = format!("{:.0}-{:.0} {}", check.min, check.max, check.unit);
                let obs = match check.status {
                    RangeStatus::Within => return None,
                    RangeStatus::Below => Observation::new(
                        self.id(),
                        Severity::Warning,
                        format!(
                            "{}: {:.0} {} is below the typical {} job",
                            a.name, check.quantity, check.unit, range
                        ),
                    )
                    .because("Small jobs rarely reach benchmark production")
                    .because("Consider a minimum-days floor or a smaller crew"),
                    RangeStatus::Above => Observation::new(
                        self.id(),
                        Severity::Info,
                        format!(
                            "{}: {:.0} {} is above the typical {} job",
                            a.name, check.quantity, check.unit, range
                        ),
                    )
                    .because("Large scopes may support a bigger crew or a second spread"),
                };
                Some(obs.for_activity(&a.id))
            })
            .collect()
    }
}

/// Unit cost outside the benchmark's P25-P75 band
pub struct UnitCostBenchmarkRule;

impl Rule for UnitCostBenchmarkRule {
    fn id(&self) -> RuleId {
        RuleId::UnitCostBenchmark
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation> {
        ctx.checks
            .iter()
            .filter(|c| c.status != BenchmarkStatus::InRange)
            .map(|c| {
                let severity = if c.status.is_extreme() {
                    Severity::Warning
                } else {
                    Severity::Info
                };
                Observation::new(
                    self.id(),
                    severity,
                    format!(
                        "{}: unit cost {:.2} is {} (P25 {:.2}, median {:.2}, P75 {:.2})",
                        c.activity_id, c.unit_cost, c.status, c.p25, c.median, c.p75
                    ),
                )
                .for_activity(&c.activity_id)
                .because(format!("Benchmark drawn from {} jobs", c.sample_size))
            })
            .collect()
    }
}

/// Crew billed for far more hours than it works
pub struct ShiftUtilizationRule;

impl Rule for ShiftUtilizationRule {
    fn id(&self) -> RuleId {
        RuleId::ShiftUtilization
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation> {
        let floor = ctx.thresholds.min_shift_utilization;
        ctx.active()
            .filter_map(|a| {
                let plan = &a.tiers.standard.plan;
                if plan.billed_hours <= 0.0 || plan.utilization() >= floor {
                    return None;
                }
                Some(
                    Observation::new(
                        self.id(),
                        Severity::Info,
                        format!(
                            "{}: {:.0}% shift utilization ({:.1} h worked of {:.1} h billed)",
                            a.name,
                            plan.utilization() * 100.0,
                            plan.raw_hours,
                            plan.billed_hours
                        ),
                    )
                    .for_activity(&a.id)
                    .because("Pair with another activity on the same day to fill the shift"),
                )
            })
            .collect()
    }
}

/// Crew headcount outside the size tier for the job
pub struct CrewSizeRule;

impl Rule for CrewSizeRule {
    fn id(&self) -> RuleId {
        RuleId::CrewSize
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation> {
        ctx.active()
            .filter_map(|a| {
                let quantity = a.unit_cost.map(|u| u.quantity).unwrap_or(a.gross_quantity);
                let tier = ctx.reference.crew_threshold(a.activity_type, quantity)?;
                let (severity, verdict) = if a.crew_headcount < tier.min_headcount {
                    (Severity::Warning, "undersized")
                } else if a.crew_headcount > tier.max_headcount {
                    (Severity::Info, "oversized")
                } else {
                    return None;
                };
                let mut obs = Observation::new(
                    self.id(),
                    severity,
                    format!(
                        "{}: crew of {} looks {} (expected {}-{})",
                        a.name, a.crew_headcount, verdict, tier.min_headcount, tier.max_headcount
                    ),
                )
                .for_activity(&a.id);
                if let Some(crew) = ctx.reference.crew(&tier.crew) {
                    obs = obs.because(format!(
                        "Recommended: {} ({} workers at {:.2}/h)",
                        crew.name, crew.headcount, crew.hourly_rate
                    ));
                }
                Some(obs)
            })
            .collect()
    }
}

/// Several short paving activities that one crew could cover
pub struct ComboCrewRule;

impl Rule for ComboCrewRule {
    fn id(&self) -> RuleId {
        RuleId::ComboCrew
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation> {
        let short: Vec<&ActivityResult> = ctx
            .active()
            .filter(|a| a.activity_type.is_paving_family())
            .filter(|a| {
                let days = a.tiers.standard.billed_days();
                days > 0 && days <= ctx.thresholds.combo_crew_max_days
            })
            .collect();
        if short.len() < 2 {
            return Vec::new();
        }

        let names: Vec<&str> = short.iter().map(|a| a.name.as_str()).collect();
        let mut obs = Observation::new(
            self.id(),
            Severity::Info,
            format!("Combine {} under one paving crew", names.join(", ")),
        );
        for a in short {
            obs = obs.because(format!(
                "{}: {} billed day(s), {:.1} h",
                a.name,
                a.tiers.standard.billed_days(),
                a.tiers.standard.billed_hours()
            ));
        }
        vec![obs]
    }
}

/// Billed days longer than the standard shift
pub struct OvertimeRule;

impl Rule for OvertimeRule {
    fn id(&self) -> RuleId {
        RuleId::Overtime
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation> {
        let standard = ctx.standard_hours();
        ctx.active()
            .filter_map(|a| {
                let plan = &a.tiers.standard.plan;
                if plan.average_day() <= standard + 1e-9 {
                    return None;
                }
                Some(
                    Observation::new(
                        self.id(),
                        Severity::Warning,
                        format!(
                            "{}: average billed day of {:.1} h exceeds the {:.0} h shift",
                            a.name,
                            plan.average_day(),
                            standard
                        ),
                    )
                    .for_activity(&a.id)
                    .because("Overtime premiums are not included in the crew rate"),
                )
            })
            .collect()
    }
}

/// Roadway work without any traffic control priced
pub struct RoadwaySafetyRule;

impl Rule for RoadwaySafetyRule {
    fn id(&self) -> RuleId {
        RuleId::RoadwaySafety
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation> {
        if ctx.estimate.job_mode != JobMode::Roadway || ctx.active().next().is_none() {
            return Vec::new();
        }
        let itemized = ctx.estimate.indirect.items.iter().any(|i| i.traffic_control);
        if ctx.totals.safety > 0.0 || itemized {
            return Vec::new();
        }
        vec![Observation::new(
            self.id(),
            Severity::Warning,
            "Roadway job has no safety or traffic-control cost",
        )
        .because("Enable cluster mode to price a safety crew")
        .because("Or add an indirect item marked traffic_control")]
    }
}

/// Asphalt order small enough to draw a plant fee
pub struct LowTonnageRule;

impl Rule for LowTonnageRule {
    fn id(&self) -> RuleId {
        RuleId::LowTonnage
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation> {
        let tons: f64 = ctx.active().filter_map(|a| a.detail.asphalt_tons()).sum();
        let minimum = ctx.thresholds.plant_minimum_tons;
        if tons <= 0.0 || tons >= minimum {
            return Vec::new();
        }
        vec![Observation::new(
            self.id(),
            Severity::Warning,
            format!("{:.0} tons of asphalt is below the {:.0} ton plant minimum", tons, minimum),
        )
        .because("Plants typically add a small-order fee below their minimum")]
    }
}

/// Mobilization is a large share of direct cost
pub struct MobilizationRule;

impl Rule for MobilizationRule {
    fn id(&self) -> RuleId {
        RuleId::Mobilization
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation> {
        let direct = ctx.totals.direct;
        if direct <= 0.0 {
            return Vec::new();
        }
        let percent = ctx.totals.mobilization / direct * 100.0;
        if percent <= ctx.thresholds.mobilization_percent {
            return Vec::new();
        }
        let mut obs = Observation::new(
            self.id(),
            Severity::Warning,
            format!(
                "Mobilization is {:.1}% of direct cost (limit {:.0}%)",
                percent, ctx.thresholds.mobilization_percent
            ),
        );
        if !ctx.estimate.cluster_mode {
            obs = obs.because("Cluster mode would share trips between co-deployable crews");
        }
        vec![obs]
    }
}

/// Most benchmarked activities lean the same way
pub struct SystemicCostRule;

impl Rule for SystemicCostRule {
    fn id(&self) -> RuleId {
        RuleId::SystemicCost
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation> {
        let total = ctx.checks.len();
        let t = ctx.thresholds;
        if total < t.systemic_min_activities {
            return Vec::new();
        }

        let high = ctx.checks.iter().filter(|c| c.status.is_high()).count();
        let low = ctx.checks.iter().filter(|c| c.status.is_low()).count();
        let share = |n: usize| n as f64 / total as f64;

        let mut out = Vec::new();
        if high >= t.systemic_min_activities && share(high) >= t.systemic_share {
            out.push(
                Observation::new(
                    self.id(),
                    Severity::Warning,
                    format!("{} of {} activities price above the benchmark band", high, total),
                )
                .because("Check crew rates and production rates for a common bias"),
            );
        }
        if low >= t.systemic_min_activities && share(low) >= t.systemic_share {
            out.push(
                Observation::new(
                    self.id(),
                    Severity::Warning,
                    format!("{} of {} activities price below the benchmark band", low, total),
                )
                .because("Production rates may be optimistic or costs missing"),
            );
        }
        out
    }
}

/// Haul work with no trucking inputs
pub struct MissingTruckingRule;

impl Rule for MissingTruckingRule {
    fn id(&self) -> RuleId {
        RuleId::MissingTrucking
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> Vec<Observation> {
        ctx.active()
            .filter(|a| a.activity_type.requires_hauling() && a.trucking.is_none())
            .map(|a| {
                Observation::new(
                    self.id(),
                    Severity::Warning,
                    format!("{}: no trucking priced for hauled material", a.name),
                )
                .for_activity(&a.id)
                .because("Add cycle_minutes and truck_capacity_tons under trucking")
            })
            .collect()
    }
}

/// All rules in reporting order
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(QuantityRangeRule),
        Box::new(UnitCostBenchmarkRule),
        Box::new(ShiftUtilizationRule),
        Box::new(CrewSizeRule),
        Box::new(ComboCrewRule),
        Box::new(OvertimeRule),
        Box::new(RoadwaySafetyRule),
        Box::new(LowTonnageRule),
        Box::new(MobilizationRule),
        Box::new(SystemicCostRule),
        Box::new(MissingTruckingRule),
    ]
}

/// Run every rule and collect observations in rule order
pub fn analyze(ctx: &AnalysisContext<'_>) -> Vec<Observation> {
    all_rules()
        .iter()
        .flat_map(|rule| {
            let found = rule.evaluate(ctx);
            if !found.is_empty() {
                tracing::debug!(rule = %rule.id(), count = found.len(), "rule reported");
            }
            found
        })
        .collect()
}
