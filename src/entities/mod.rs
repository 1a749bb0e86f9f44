//! Entity type definitions
//!
//! - [`Activity`] - one unit of work with its quantity, production and cost inputs
//! - [`Estimate`] - activities plus job mode, shift policy and indirect costs

pub mod activity;
pub mod estimate;

pub use activity::{
    Activity, ActivityType, BenchmarkBasis, ConditionFactor, Crew, Dependency, EquipmentItem,
    MaterialUse, Precedence, ProductionRate, Productivity, Quantity, TruckingParams, Unit,
};
pub use estimate::{Estimate, IndirectConfig, IndirectItem, IndirectKind, JobMode, ShiftSettings};
