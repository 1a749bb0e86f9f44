//! Estimating engine - scheduling, shift billing, production tiers,
//! clustering, confidence, analysis and risk simulation
//!
//! Everything in here is pure computation over an [`Estimate`] and
//! [`ReferenceData`]; problems are reported in the results rather than
//! returned as errors.
//!
//! [`Estimate`]: crate::entities::Estimate
//! [`ReferenceData`]: crate::core::ReferenceData

pub mod calculator;
pub mod calendar;
pub mod checks;
pub mod cluster;
pub mod confidence;
pub mod monte_carlo;
pub mod results;
pub mod rules;
pub mod scheduler;
pub mod shift;
pub mod tiers;
pub mod trucking;

pub use calculator::{calculate, Calculator};
pub use monte_carlo::{run_simulation, MonteCarloSimulator, SimulationResult, Variable};
pub use results::EstimateResults;
pub use scheduler::{schedule, Schedule, Task};
pub use shift::{ShiftPlan, ShiftPolicy};
