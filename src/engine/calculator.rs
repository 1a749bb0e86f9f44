//! Estimate calculator
//!
//! Runs the estimating pipeline in a fixed order, each phase consuming the
//! previous phase's output:
//!
//!  1. trucking derivation
//!  2. production tiers
//!  3. critical path schedule
//!  4. cost aggregation and unit costs
//!  5. mobilization clusters (opt-in)
//!  6. indirect costs
//!  7. confidence
//!  8. unit-cost checks
//!  9. analysis rules
//! 10. calendar timeline
//! 11. markups and final totals
//!
//! Trucking overrides are applied last and re-derive everything downstream
//! of cost.

use chrono::NaiveDate;

use crate::core::reference::ReferenceData;
use crate::engine::calendar::{self, Timeline};
use crate::engine::checks;
use crate::engine::cluster::{self, DeploymentContext};
use crate::engine::confidence::{self, ConfidenceScore, ConfidenceWeights};
use crate::engine::results::{
    ActivityDetail, ActivityResult, CostTotals, EstimateResults, IndirectLine, QuantityCheck,
    RangeStatus, UnitCost,
};
use crate::engine::rules::{self, AnalysisContext, AnalysisThresholds};
use crate::engine::scheduler::{self, Task, DEFAULT_NEAR_CRITICAL_DAYS};
use crate::engine::shift::ShiftPolicy;
use crate::engine::tiers::{self, TierSet};
use crate::engine::trucking::{self, TruckingResult};
use crate::entities::activity::{Activity, ActivityType, BenchmarkBasis, Unit};
use crate::entities::estimate::{Estimate, IndirectKind};

/// Estimate calculator bound to a set of reference tables
pub struct Calculator<'a> {
    reference: &'a ReferenceData,
    thresholds: AnalysisThresholds,
    weights: ConfidenceWeights,
    near_critical_days: f64,
    today: Option<NaiveDate>,
}

impl<'a> Calculator<'a> {
    pub fn new(reference: &'a ReferenceData) -> Self {
        Self {
            reference,
            thresholds: AnalysisThresholds::default(),
            weights: ConfidenceWeights::default(),
            near_critical_days: DEFAULT_NEAR_CRITICAL_DAYS,
            today: None,
        }
    }

    pub fn with_thresholds(mut self, thresholds: AnalysisThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_weights(mut self, weights: ConfidenceWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_near_critical_days(mut self, days: f64) -> Self {
        self.near_critical_days = days.max(0.0);
        self
    }

    /// Calendar start for estimates without a start date
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Run the full pipeline for `estimate` with trucks billed at `trucking_rate` per hour
    pub fn calculate(&self, estimate: &Estimate, trucking_rate: f64) -> EstimateResults {
        let policy = ShiftPolicy::from_settings(&estimate.shift);
        let shift_hours = policy.standard_hours();

        // 1. trucking
        let trucking: Vec<Option<TruckingResult>> = estimate
            .activities
            .iter()
            .map(|a| {
                trucking::trucking_for(a, &self.reference.conversions, shift_hours, trucking_rate)
            })
            .collect();
        tracing::debug!(
            hauled = trucking.iter().filter(|t| t.is_some()).count(),
            "trucking derived"
        );

        // 2. tiers
        let tier_sets: Vec<TierSet> = estimate
            .activities
            .iter()
            .map(|a| tiers::production_tiers(a, &policy))
            .collect();

        // 3. schedule
        let tasks: Vec<Task> = estimate.activities.iter().map(Task::from_activity).collect();
        let schedule = scheduler::schedule(&tasks);
        tracing::debug!(
            duration = schedule.project_duration,
            critical = schedule.critical_path.len(),
            "schedule computed"
        );

        // 4. per-activity costs
        let mut activities: Vec<ActivityResult> = estimate
            .activities
            .iter()
            .zip(tier_sets)
            .zip(trucking)
            .map(|((activity, tiers), trucking)| {
                let entry = schedule.entry(&activity.id).cloned();
                self.activity_result(estimate, activity, tiers, trucking, entry)
            })
            .collect();

        // 5. clusters
        let clusters = estimate.cluster_mode.then(|| {
            cluster::build_clusters(
                &estimate.activities,
                &schedule,
                self.reference,
                DeploymentContext {
                    job_mode: estimate.job_mode,
                    travel_hours: estimate.travel_hours,
                    standard_hours: shift_hours,
                },
            )
        });
        if let Some(summary) = &clusters {
            for a in activities.iter_mut().filter(|a| summary.covers(&a.id)) {
                a.mobilization_cost = 0.0;
                a.clustered = true;
            }
        }

        let near_critical = schedule
            .near_critical(self.near_critical_days)
            .into_iter()
            .map(|e| e.id.clone())
            .collect();

        let start = estimate
            .start_date
            .or(self.today)
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        let mut results = EstimateResults {
            estimate: estimate.name.clone(),
            job_mode: estimate.job_mode,
            trucking_rate,
            activities,
            near_critical,
            clusters,
            totals: CostTotals::default(),
            confidence: ConfidenceScore::default(),
            unit_cost_checks: Vec::new(),
            observations: Vec::new(),
            timeline: Timeline::empty(start),
            schedule,
        };

        // 4 (totals) and 6-9
        self.derive_costs(estimate, &mut results);

        // 10. calendar
        results.timeline = calendar::build_timeline(
            &results.schedule,
            start,
            estimate.weather_days,
            estimate.shift.work_weekends,
        );

        // 11. totals
        self.apply_markups(estimate, &mut results.totals);

        self.apply_trucking_overrides(estimate, &mut results);

        tracing::info!(
            estimate = %estimate.name,
            total = results.totals.total,
            duration = results.schedule.project_duration,
            confidence = %results.confidence.level,
            "estimate calculated"
        );
        results
    }

    /// Replace derived trucking with the override tonnage where one is given,
    /// then re-derive every cost-dependent output. Running it again yields
    /// the same results.
    pub fn apply_trucking_overrides(&self, estimate: &Estimate, results: &mut EstimateResults) {
        let shift_hours = ShiftPolicy::from_settings(&estimate.shift).standard_hours();
        let mut patched = 0;

        for (activity, result) in estimate.activities.iter().zip(results.activities.iter_mut()) {
            if activity.id != result.id {
                continue;
            }
            let Some(t) =
                trucking::overridden_trucking_for(activity, shift_hours, results.trucking_rate)
            else {
                continue;
            };
            result.trucking_cost = t.cost;
            if let ActivityDetail::Milling { reclaimed_tons } = &mut result.detail {
                *reclaimed_tons = t.haul_tons;
            }
            result.trucking = Some(t);
            patched += 1;
        }

        if patched == 0 {
            return;
        }
        tracing::debug!(patched, "trucking overrides applied");

        self.derive_costs(estimate, results);
        self.apply_markups(estimate, &mut results.totals);
    }

    fn activity_result(
        &self,
        estimate: &Estimate,
        activity: &Activity,
        tiers: TierSet,
        trucking: Option<TruckingResult>,
        schedule: Option<scheduler::ScheduleEntry>,
    ) -> ActivityResult {
        let conversions = &self.reference.conversions;
        let active = activity.is_active();
        let hours = tiers.standard.billed_hours();

        let unit_cost = conversions
            .benchmark_quantity(activity)
            .filter(|_| active)
            .map(|quantity| UnitCost {
                value: 0.0,
                per: match activity.activity_type.benchmark_basis() {
                    BenchmarkBasis::Area => Unit::Sy,
                    BenchmarkBasis::Volume => Unit::Cy,
                },
                quantity,
            });

        let quantity_check = self
            .reference
            .quantity_range(estimate.job_mode, activity.activity_type)
            .filter(|_| active)
            .and_then(|range| {
                let quantity = conversions.quantity_in(activity, range.unit)?;
                let status = if quantity < range.min {
                    RangeStatus::Below
                } else if quantity > range.max {
                    RangeStatus::Above
                } else {
                    RangeStatus::Within
                };
                Some(QuantityCheck {
                    quantity,
                    min: range.min,
                    max: range.max,
                    unit: range.unit,
                    status,
                })
            });

        ActivityResult {
            id: activity.id.clone(),
            name: activity.display_name().to_string(),
            activity_type: activity.activity_type,
            unit: activity.quantity.unit,
            gross_quantity: activity.gross_quantity(),
            duration_days: activity.duration_days(),
            crew_headcount: activity.crew.headcount,
            detail: self.detail(activity),
            labor_cost: activity.labor_cost(hours),
            equipment_cost: activity.equipment_cost(hours),
            material_cost: activity.material_cost(),
            trucking_cost: trucking.as_ref().map_or(0.0, |t| t.cost),
            mobilization_cost: if active {
                activity.mobilization_cost.unwrap_or(0.0).max(0.0)
            } else {
                0.0
            },
            clustered: false,
            direct_cost: 0.0,
            unit_cost,
            quantity_check,
            tiers,
            trucking,
            schedule,
        }
    }

    fn detail(&self, activity: &Activity) -> ActivityDetail {
        let conv = &self.reference.conversions;
        match activity.activity_type {
            ActivityType::Excavation => conv
                .volume_cy(activity)
                .map(|bank_cy| ActivityDetail::Earthwork {
                    bank_cy,
                    loose_cy: bank_cy * conv.swell_factor,
                })
                .unwrap_or_default(),
            ActivityType::AsphaltBase | ActivityType::AsphaltSurface => conv
                .tons(activity)
                .map(|tons| ActivityDetail::Paving { tons })
                .unwrap_or_default(),
            ActivityType::Milling => conv
                .tons(activity)
                .map(|reclaimed_tons| ActivityDetail::Milling { reclaimed_tons })
                .unwrap_or_default(),
            ActivityType::AggregateBase => conv
                .tons(activity)
                .map(|tons| ActivityDetail::Aggregate { tons })
                .unwrap_or_default(),
            _ => ActivityDetail::General,
        }
    }

    /// Per-activity direct and unit cost, cost roll-up, indirect costs,
    /// confidence, checks and analysis
    fn derive_costs(&self, estimate: &Estimate, results: &mut EstimateResults) {
        for a in results.activities.iter_mut() {
            let work = a.work_cost();
            a.direct_cost = work + a.mobilization_cost;
            if let Some(uc) = a.unit_cost.as_mut() {
                uc.value = work / uc.quantity;
            }
        }

        let mut totals = CostTotals::default();
        for a in &results.activities {
            totals.labor += a.labor_cost;
            totals.equipment += a.equipment_cost;
            totals.material += a.material_cost;
            totals.trucking += a.trucking_cost;
            totals.mobilization += a.mobilization_cost;
        }
        if let Some(c) = &results.clusters {
            totals.mobilization += c.mobilization_total;
            totals.safety = c.safety_cost;
        }
        totals.direct = totals.labor
            + totals.equipment
            + totals.material
            + totals.trucking
            + totals.mobilization
            + totals.safety;

        // 6. indirect
        let duration = results.schedule.project_duration;
        totals.indirect_lines = estimate
            .indirect
            .items
            .iter()
            .map(|item| IndirectLine {
                name: item.name.clone(),
                kind: item.kind,
                amount: item.amount,
                cost: match item.kind {
                    IndirectKind::PerDay => item.amount * duration,
                    IndirectKind::PercentOfDirect => totals.direct * item.amount / 100.0,
                    IndirectKind::LumpSum => item.amount,
                },
            })
            .collect();
        totals.indirect = totals.indirect_lines.iter().map(|l| l.cost).sum();
        results.totals = totals;

        // 7. confidence
        results.confidence = confidence::score(
            &results.activities,
            self.reference,
            estimate.job_mode,
            &self.weights,
        );

        // 8. checks
        results.unit_cost_checks =
            checks::unit_cost_checks(&results.activities, self.reference, estimate.job_mode);

        // 9. analysis
        let ctx = AnalysisContext {
            estimate,
            activities: &results.activities,
            checks: &results.unit_cost_checks,
            totals: &results.totals,
            reference: self.reference,
            thresholds: &self.thresholds,
        };
        results.observations = rules::analyze(&ctx);
    }

    fn apply_markups(&self, estimate: &Estimate, totals: &mut CostTotals) {
        let cfg = &estimate.indirect;
        let subtotal = totals.subtotal();
        totals.overhead = subtotal * cfg.overhead_percent / 100.0;
        totals.profit = (subtotal + totals.overhead) * cfg.profit_percent / 100.0;
        totals.contingency = subtotal * cfg.contingency_percent / 100.0;
        totals.total = subtotal + totals.overhead + totals.profit + totals.contingency;
    }
}

/// Calculate `estimate` against `reference` with default analysis settings
pub fn calculate(estimate: &Estimate, trucking_rate: f64, reference: &ReferenceData) -> EstimateResults {
    Calculator::new(reference).calculate(estimate, trucking_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::confidence::ConfidenceLevel;
    use crate::entities::estimate::JobMode;

    const SAMPLE: &str = r#"
name: Test lot
job_mode: parking_lot
start_date: 2026-04-06
travel_hours: 1.0
activities:
  - id: mill
    type: milling
    quantity: { net: 4000, unit: sy }
    thickness_inches: 2
    production_rate: 4000
    crew: { name: Milling Crew, headcount: 4, hourly_rate: 55 }
    equipment:
      - { name: Mill, hourly_rate: 250 }
    mobilization_cost: 1200
    trucking: { cycle_minutes: 60, truck_capacity_tons: 20, efficiency: 1.0, quantity_override_tons: 300 }
  - id: pave
    type: asphalt_surface
    quantity: { net: 4000, unit: sy }
    thickness_inches: 2
    production_rate: 2000
    crew: { name: Paving Crew, headcount: 7, hourly_rate: 46 }
    materials:
      - { name: HMA, per_unit: 0.111, unit_price: 80 }
    mobilization_cost: 1500
    trucking: { cycle_minutes: 90, truck_capacity_tons: 20, efficiency: 1.0 }
    depends_on:
      - predecessor: mill
indirect:
  items:
    - { name: Supervision, kind: per_day, amount: 500 }
    - { name: Bond, kind: percent_of_direct, amount: 1 }
    - { name: Permit, kind: lump_sum, amount: 250 }
  overhead_percent: 10
  profit_percent: 5
  contingency_percent: 3
"#;

    fn sample() -> Estimate {
        Estimate::from_yaml(SAMPLE, "sample.yaml").unwrap()
    }

    fn run(estimate: &Estimate) -> EstimateResults {
        let reference = ReferenceData::embedded().unwrap();
        Calculator::new(&reference).calculate(estimate, 100.0)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_activity_costs() {
        let r = run(&sample());
        let mill = r.activity("mill").unwrap();
        // 8 billed hours
        assert!(close(mill.labor_cost, 4.0 * 55.0 * 8.0));
        assert!(close(mill.equipment_cost, 250.0 * 8.0));
        assert_eq!(mill.mobilization_cost, 1200.0);

        let pave = r.activity("pave").unwrap();
        assert!(close(pave.material_cost, 4000.0 * 0.111 * 80.0));
        assert_eq!(pave.detail, ActivityDetail::Paving { tons: 4000.0 * 2.0 * 0.0555 });
        let uc = pave.unit_cost.unwrap();
        assert_eq!(uc.per, Unit::Sy);
        assert!(close(uc.value, pave.work_cost() / 4000.0));
    }

    #[test]
    fn test_schedule_and_per_day_indirect() {
        let r = run(&sample());
        // mill 1 day, then pave 2 days
        assert_eq!(r.schedule.project_duration, 3.0);
        assert_eq!(r.schedule.critical_path, vec!["mill", "pave"]);
        let supervision = &r.totals.indirect_lines[0];
        assert_eq!(supervision.cost, 1500.0);
        let bond = &r.totals.indirect_lines[1];
        assert!(close(bond.cost, r.totals.direct * 0.01));
        assert_eq!(r.timeline.work_days, 3);
    }

    #[test]
    fn test_totals_add_up() {
        let r = run(&sample());
        let t = &r.totals;
        assert!(close(
            t.direct,
            t.labor + t.equipment + t.material + t.trucking + t.mobilization + t.safety
        ));
        let direct: f64 = r.activities.iter().map(|a| a.direct_cost).sum();
        assert!(close(t.direct, direct));
        assert!(close(t.total, t.subtotal() * (1.0 + 0.10 + 0.055 + 0.03)));
    }

    #[test]
    fn test_trucking_override_applied() {
        let r = run(&sample());
        let mill = r.activity("mill").unwrap();
        let t = mill.trucking.as_ref().unwrap();
        assert!(t.overridden);
        // 300 t at 20 t/h over 8 h -> 2 trucks, 16 truck-hours
        assert_eq!(t.trucks, 2);
        assert_eq!(mill.trucking_cost, 1600.0);
        assert_eq!(mill.detail, ActivityDetail::Milling { reclaimed_tons: 300.0 });

        let pave = r.activity("pave").unwrap();
        assert!(!pave.trucking.as_ref().unwrap().overridden);
    }

    #[test]
    fn test_trucking_override_is_idempotent() {
        let estimate = sample();
        let reference = ReferenceData::embedded().unwrap();
        let calc = Calculator::new(&reference);
        let first = calc.calculate(&estimate, 100.0);

        let mut again = first.clone();
        calc.apply_trucking_overrides(&estimate, &mut again);
        assert_eq!(again, first);
        calc.apply_trucking_overrides(&estimate, &mut again);
        assert_eq!(again.totals, first.totals);
    }

    #[test]
    fn test_cluster_mode_shares_mobilization() {
        let mut estimate = sample();
        estimate.cluster_mode = true;
        let r = run(&estimate);

        let clusters = r.clusters.as_ref().unwrap();
        assert!(clusters.combined_deployment);
        for a in &r.activities {
            assert!(a.clustered);
            assert_eq!(a.mobilization_cost, 0.0);
        }
        // 2 x 1 h x 320
        assert_eq!(r.totals.mobilization, 640.0);
    }

    #[test]
    fn test_roadway_cluster_prices_safety() {
        let mut estimate = sample();
        estimate.job_mode = JobMode::Roadway;
        estimate.cluster_mode = true;
        let r = run(&estimate);
        assert_eq!(r.totals.safety, 3.0 * 8.0 * 95.0);
        assert!(r
            .observations
            .iter()
            .all(|o| o.rule != rules::RuleId::RoadwaySafety));
    }

    #[test]
    fn test_empty_estimate() {
        let estimate = Estimate::new("empty", JobMode::ParkingLot);
        let r = run(&estimate);
        assert_eq!(r.totals.total, 0.0);
        assert_eq!(r.confidence.composite, 0.0);
        assert_eq!(r.confidence.level, ConfidenceLevel::Low);
        assert!(r.observations.is_empty());
        assert!(r.timeline.days.is_empty());
    }

    #[test]
    fn test_inactive_activity_costs_nothing() {
        let mut estimate = sample();
        estimate.activities[1].quantity.net = 0.0;
        let r = run(&estimate);
        let pave = r.activity("pave").unwrap();
        assert_eq!(pave.direct_cost, 0.0);
        assert!(pave.unit_cost.is_none());
        assert_eq!(r.schedule.project_duration, 1.0);
    }
}
