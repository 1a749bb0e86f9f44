//! Mobilization clusters
//!
//! Activity types that can be deployed together share one mobilization trip.
//! A combined mill-and-pave spread replaces separate milling and paving
//! spreads when both are on the job; earthwork claims what is left.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::reference::{ClusterKind, ReferenceData};
use crate::engine::scheduler::Schedule;
use crate::entities::activity::{Activity, ActivityType};
use crate::entities::estimate::JobMode;

/// One shared mobilization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub kind: ClusterKind,
    pub name: String,
    pub activity_types: Vec<ActivityType>,
    pub activity_ids: Vec<String>,
    /// Round trip from yard to site at the spread's crew rate
    pub mobilization_cost: f64,
    /// Latest member finish minus earliest member start
    pub active_span_days: f64,
}

/// Clusters formed for an estimate plus the costs they carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClusterSummary {
    pub clusters: Vec<Cluster>,
    /// Milling and paving travel as one spread
    pub combined_deployment: bool,
    pub mobilization_total: f64,
    /// Work-zone safety crew (roadway jobs only)
    pub safety_cost: f64,
    pub work_days: u32,
}

impl ClusterSummary {
    /// The activity's mobilization is carried by a cluster
    pub fn covers(&self, activity_id: &str) -> bool {
        self.clusters
            .iter()
            .any(|c| c.activity_ids.iter().any(|id| id == activity_id))
    }
}

/// Inputs shared by the whole estimate
#[derive(Debug, Clone, Copy)]
pub struct DeploymentContext {
    pub job_mode: JobMode,
    /// One-way travel hours
    pub travel_hours: f64,
    pub standard_hours: f64,
}

/// Group the active activities into mobilization clusters
pub fn build_clusters(
    activities: &[Activity],
    schedule: &Schedule,
    reference: &ReferenceData,
    ctx: DeploymentContext,
) -> ClusterSummary {
    let active: Vec<&Activity> = activities.iter().filter(|a| a.is_active()).collect();
    let active_types: BTreeSet<ActivityType> = active.iter().map(|a| a.activity_type).collect();

    let milling = active_types.contains(&ActivityType::Milling);
    let paving = active_types.iter().any(|t| t.is_paving_family());
    let combined = milling && paving && reference.cluster(ClusterKind::MillingPaving).is_some();

    let order: &[ClusterKind] = if combined {
        &[ClusterKind::MillingPaving, ClusterKind::Earthwork]
    } else {
        &[ClusterKind::Milling, ClusterKind::Paving, ClusterKind::Earthwork]
    };

    let mut claimed: BTreeSet<ActivityType> = BTreeSet::new();
    let mut clusters = Vec::new();

    for kind in order {
        let Some(def) = reference.cluster(*kind) else {
            continue;
        };
        let members: Vec<ActivityType> = def
            .activity_types
            .iter()
            .copied()
            .filter(|t| active_types.contains(t) && !claimed.contains(t))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if members.is_empty() {
            continue;
        }
        claimed.extend(members.iter().copied());

        let ids: Vec<String> = active
            .iter()
            .filter(|a| members.contains(&a.activity_type))
            .map(|a| a.id.clone())
            .collect();

        let entries = ids.iter().filter_map(|id| schedule.entry(id));
        let (start, finish) = entries.fold((f64::INFINITY, f64::NEG_INFINITY), |(s, f), e| {
            (s.min(e.early_start), f.max(e.early_finish))
        });
        let active_span_days = if finish >= start { finish - start } else { 0.0 };

        let mobilization_cost =
            2.0 * ctx.travel_hours.max(0.0) * def.mobilization_crew_rate.max(0.0);

        tracing::debug!(
            cluster = %def.kind,
            activities = ids.len(),
            mobilization = mobilization_cost,
            "formed cluster"
        );

        clusters.push(Cluster {
            kind: def.kind,
            name: def.name.clone(),
            activity_types: members,
            activity_ids: ids,
            mobilization_cost,
            active_span_days,
        });
    }

    let work_days = schedule.work_days();
    let safety_cost = match ctx.job_mode {
        JobMode::Roadway => work_days as f64 * ctx.standard_hours * reference.safety_crew_rate,
        JobMode::ParkingLot => 0.0,
    };

    ClusterSummary {
        mobilization_total: clusters.iter().map(|c| c.mobilization_cost).sum(),
        clusters,
        combined_deployment: combined,
        safety_cost,
        work_days,
    }
}
