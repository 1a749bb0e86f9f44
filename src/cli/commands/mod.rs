//! Command implementations

pub mod completions;
pub mod estimate;
pub mod reference;
pub mod schedule;
pub mod shift;
pub mod simulate;
