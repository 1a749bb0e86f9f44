//! Critical path scheduling
//!
//! Forward and backward passes over the activity dependency graph with all
//! four precedence types and signed lags. A cyclic graph is not an error:
//! the activities are scheduled in input order and the schedule is flagged.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::entities::activity::{Activity, Dependency, Precedence};

/// Total float below which an activity is critical
pub const CRITICAL_TOLERANCE: f64 = 0.001;

/// Default total-float limit for near-critical reporting, in days
pub const DEFAULT_NEAR_CRITICAL_DAYS: f64 = 1.0;

/// Scheduler input for one activity
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub duration: f64,
    pub depends_on: Vec<Dependency>,
}

impl Task {
    pub fn new(id: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            duration,
            depends_on: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, predecessor: &str, kind: Precedence, lag: f64) -> Self {
        self.depends_on.push(Dependency {
            predecessor: predecessor.to_string(),
            kind,
            lag,
        });
        self
    }

    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            id: activity.id.clone(),
            duration: activity.duration_days(),
            depends_on: activity.depends_on.clone(),
        }
    }
}

/// Computed timing for one activity, in working days from project start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: String,
    pub duration: f64,
    pub early_start: f64,
    pub early_finish: f64,
    pub late_start: f64,
    pub late_finish: f64,
    pub total_float: f64,
    pub free_float: f64,
    pub critical: bool,
}

/// Result of a scheduling run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schedule {
    /// Entries in input order
    pub entries: Vec<ScheduleEntry>,

    /// Latest early finish across all activities
    pub project_duration: f64,

    /// Critical activity ids in topological order
    pub critical_path: Vec<String>,

    /// The dependency graph contained a cycle; input order was used
    pub cycle_detected: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Schedule {
    pub fn entry(&self, id: &str) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Activities with 0 < total float <= `threshold`
    pub fn near_critical(&self, threshold: f64) -> Vec<&ScheduleEntry> {
        self.entries
            .iter()
            .filter(|e| e.total_float >= CRITICAL_TOLERANCE && e.total_float <= threshold)
            .collect()
    }

    /// Whole working days the project occupies
    pub fn work_days(&self) -> u32 {
        self.project_duration.max(0.0).ceil() as u32
    }
}

/// Resolved edge: (other activity index, precedence, lag)
type Edge = (usize, Precedence, f64);

/// Run the forward and backward passes over `tasks`
pub fn schedule(tasks: &[Task]) -> Schedule {
    let n = tasks.len();
    let mut warnings = Vec::new();

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(n);
    for (i, task) in tasks.iter().enumerate() {
        if index.insert(task.id.as_str(), i).is_some() {
            warnings.push(format!("Duplicate activity id '{}'; last definition wins", task.id));
        }
    }

    let mut preds: Vec<Vec<Edge>> = vec![Vec::new(); n];
    let mut succs: Vec<Vec<Edge>> = vec![Vec::new(); n];
    for (j, task) in tasks.iter().enumerate() {
        for dep in &task.depends_on {
            match index.get(dep.predecessor.as_str()) {
                Some(&i) => {
                    preds[j].push((i, dep.kind, dep.lag));
                    succs[i].push((j, dep.kind, dep.lag));
                }
                None => {
                    tracing::warn!(
                        activity = %task.id,
                        predecessor = %dep.predecessor,
                        "ignoring dependency on unknown activity"
                    );
                    warnings.push(format!(
                        "Activity '{}' depends on unknown activity '{}'",
                        task.id, dep.predecessor
                    ));
                }
            }
        }
    }

    let (order, cycle_detected) = match topological_order(&preds, &succs) {
        Some(order) => (order, false),
        None => {
            tracing::warn!("dependency cycle detected; scheduling in input order");
            warnings.push(
                "Dependency cycle detected; activities were scheduled in input order".to_string(),
            );
            ((0..n).collect(), true)
        }
    };

    let duration: Vec<f64> = tasks.iter().map(|t| t.duration.max(0.0)).collect();

    // Forward pass
    let mut es = vec![0.0_f64; n];
    let mut ef = duration.clone();
    for &j in &order {
        let start = preds[j]
            .iter()
            .map(|&(i, kind, lag)| match kind {
                Precedence::FinishStart => ef[i] + lag,
                Precedence::StartStart => es[i] + lag,
                Precedence::FinishFinish => ef[i] + lag - duration[j],
                Precedence::StartFinish => es[i] + lag - duration[j],
            })
            .fold(0.0_f64, f64::max);
        es[j] = start;
        ef[j] = start + duration[j];
    }

    let project_duration = ef.iter().copied().fold(0.0_f64, f64::max);

    // Backward pass
    let mut lf = vec![project_duration; n];
    let mut ls: Vec<f64> = duration.iter().map(|d| project_duration - d).collect();
    for &i in order.iter().rev() {
        let finish = succs[i]
            .iter()
            .map(|&(j, kind, lag)| match kind {
                Precedence::FinishStart => ls[j] - lag,
                Precedence::StartStart => ls[j] - lag + duration[i],
                Precedence::FinishFinish => lf[j] - lag,
                Precedence::StartFinish => lf[j] - lag + duration[i],
            })
            .fold(project_duration, f64::min);
        lf[i] = finish;
        ls[i] = finish - duration[i];
    }

    let entries: Vec<ScheduleEntry> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let total_float = ls[i] - es[i];
            let next_start = succs[i]
                .iter()
                .map(|&(j, _, _)| es[j])
                .fold(f64::INFINITY, f64::min);
            let free_float = if next_start.is_finite() {
                next_start - ef[i]
            } else {
                project_duration - ef[i]
            };
            ScheduleEntry {
                id: task.id.clone(),
                duration: duration[i],
                early_start: es[i],
                early_finish: ef[i],
                late_start: ls[i],
                late_finish: lf[i],
                total_float,
                free_float: free_float.max(0.0),
                critical: total_float.abs() < CRITICAL_TOLERANCE,
            }
        })
        .collect();

    let critical_path = order
        .iter()
        .filter(|&&i| entries[i].critical)
        .map(|&i| entries[i].id.clone())
        .collect();

    tracing::debug!(
        activities = n,
        project_duration,
        cycle_detected,
        "schedule computed"
    );

    Schedule {
        entries,
        project_duration,
        critical_path,
        cycle_detected,
        warnings,
    }
}

/// Kahn's algorithm; ties resolve in input order. `None` on a cycle.
fn topological_order(preds: &[Vec<Edge>], succs: &[Vec<Edge>]) -> Option<Vec<usize>> {
    let n = preds.len();
    let mut in_degree: Vec<usize> = preds.iter().map(Vec::len).collect();
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();

    let mut sorted = Vec::with_capacity(n);
    while let Some(node) = queue.pop_front() {
        sorted.push(node);
        for &(next, _, _) in &succs[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    (sorted.len() == n).then_some(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parallel_branch_does_not_add_duration() {
        let tasks = vec![
            Task::new("A", 2.0),
            Task::new("B", 3.0).with_dependency("A", Precedence::FinishStart, 0.0),
            Task::new("C", 4.0),
        ];
        let s = schedule(&tasks);

        assert!(approx(s.project_duration, 5.0));
        assert_eq!(s.critical_path, vec!["A".to_string(), "B".to_string()]);
        let c = s.entry("C").unwrap();
        assert!(approx(c.total_float, 1.0));
        assert!(approx(c.free_float, 1.0));
        assert!(!c.critical);
        assert!(!s.cycle_detected);
    }

    #[test]
    fn test_single_chain_sums_durations() {
        let tasks = vec![
            Task::new("exc", 2.5),
            Task::new("base", 1.5).with_dependency("exc", Precedence::FinishStart, 0.0),
            Task::new("pave", 2.0).with_dependency("base", Precedence::FinishStart, 0.0),
        ];
        let s = schedule(&tasks);
        let sum: f64 = s
            .critical_path
            .iter()
            .map(|id| {
                let e = s.entry(id).unwrap();
                e.early_finish - e.early_start
            })
            .sum();
        assert!(approx(sum, s.project_duration));
        assert!(approx(s.project_duration, 6.0));
    }

    #[test]
    fn test_start_start_with_lag() {
        let tasks = vec![
            Task::new("mill", 3.0),
            Task::new("pave", 3.0).with_dependency("mill", Precedence::StartStart, 1.0),
        ];
        let s = schedule(&tasks);
        let pave = s.entry("pave").unwrap();
        assert!(approx(pave.early_start, 1.0));
        assert!(approx(s.project_duration, 4.0));
        // mill can slip no further than pave's late start minus lag
        let mill = s.entry("mill").unwrap();
        assert!(approx(mill.late_start, 0.0));
        assert!(mill.critical);
    }

    #[test]
    fn test_finish_finish_and_start_finish() {
        let tasks = vec![
            Task::new("A", 5.0),
            // B must finish at least 1 day after A finishes
            Task::new("B", 2.0).with_dependency("A", Precedence::FinishFinish, 1.0),
            // C must finish no earlier than 3 days after A starts
            Task::new("C", 1.0).with_dependency("A", Precedence::StartFinish, 3.0),
        ];
        let s = schedule(&tasks);

        let b = s.entry("B").unwrap();
        assert!(approx(b.early_start, 4.0));
        assert!(approx(b.early_finish, 6.0));

        let c = s.entry("C").unwrap();
        assert!(approx(c.early_start, 2.0));
        assert!(approx(c.early_finish, 3.0));

        assert!(approx(s.project_duration, 6.0));
        assert!(s.entry("A").unwrap().critical);
        assert!(b.critical);
        assert!(approx(c.total_float, 3.0));
    }

    #[test]
    fn test_negative_lag_overlaps() {
        let tasks = vec![
            Task::new("A", 4.0),
            Task::new("B", 2.0).with_dependency("A", Precedence::FinishStart, -1.0),
        ];
        let s = schedule(&tasks);
        assert!(approx(s.entry("B").unwrap().early_start, 3.0));
        assert!(approx(s.project_duration, 5.0));
    }

    #[test]
    fn test_cycle_falls_back_to_input_order() {
        let tasks = vec![
            Task::new("A", 1.0).with_dependency("B", Precedence::FinishStart, 0.0),
            Task::new("B", 1.0).with_dependency("A", Precedence::FinishStart, 0.0),
        ];
        let s = schedule(&tasks);
        assert!(s.cycle_detected);
        assert_eq!(s.entries.len(), 2);
        assert!(s.warnings.iter().any(|w| w.contains("cycle")));
        assert!(s.project_duration >= 1.0);
    }

    #[test]
    fn test_unknown_predecessor_is_ignored() {
        let tasks = vec![Task::new("A", 2.0).with_dependency("ghost", Precedence::FinishStart, 0.0)];
        let s = schedule(&tasks);
        assert!(!s.cycle_detected);
        assert!(approx(s.project_duration, 2.0));
        assert_eq!(s.warnings.len(), 1);
    }

    #[test]
    fn test_near_critical() {
        let tasks = vec![
            Task::new("A", 5.0),
            Task::new("B", 4.5),
            Task::new("C", 2.0),
        ];
        let s = schedule(&tasks);
        let near: Vec<&str> = s.near_critical(1.0).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(near, vec!["B"]);
        assert_eq!(s.work_days(), 5);
    }

    #[test]
    fn test_empty_schedule() {
        let s = schedule(&[]);
        assert_eq!(s.project_duration, 0.0);
        assert!(s.critical_path.is_empty());
    }

    fn arb_tasks() -> impl Strategy<Value = Vec<Task>> {
        prop::collection::vec(
            (
                0u32..20,
                prop::collection::vec((any::<prop::sample::Index>(), 0u8..4, 0u32..4), 0..3),
            ),
            1..12,
        )
        .prop_map(|specs| {
            let mut tasks: Vec<Task> = Vec::new();
            for (i, (half_days, deps)) in specs.into_iter().enumerate() {
                let mut task = Task::new(format!("T{}", i), half_days as f64 / 2.0);
                if i > 0 {
                    for (pick, kind, lag) in deps {
                        let pred = pick.index(i);
                        let kind = match kind {
                            0 => Precedence::FinishStart,
                            1 => Precedence::StartStart,
                            2 => Precedence::FinishFinish,
                            _ => Precedence::StartFinish,
                        };
                        task = task.with_dependency(&format!("T{}", pred), kind, lag as f64 / 2.0);
                    }
                }
                tasks.push(task);
            }
            tasks
        })
    }

    proptest! {
        #[test]
        fn float_is_consistent(tasks in arb_tasks()) {
            let s = schedule(&tasks);
            prop_assert!(!s.cycle_detected);
            for e in &s.entries {
                let by_start = e.late_start - e.early_start;
                let by_finish = e.late_finish - e.early_finish;
                prop_assert!((e.total_float - by_start).abs() < 1e-9);
                prop_assert!((e.total_float - by_finish).abs() < 1e-9);
                prop_assert!(e.total_float > -1e-9);
            }
        }

        #[test]
        fn project_covers_every_critical_activity(tasks in arb_tasks()) {
            let s = schedule(&tasks);
            for id in &s.critical_path {
                let e = s.entry(id).unwrap();
                prop_assert!(s.project_duration + 1e-9 >= e.duration);
                prop_assert!(s.project_duration + 1e-9 >= e.early_finish);
            }
        }
    }
}
