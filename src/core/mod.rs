//! Core module - configuration and reference tables

pub mod config;
pub mod reference;

pub use config::Config;
pub use reference::{
    Benchmark, ClusterDefinition, ClusterKind, Conversions, CrewSpec, CrewThreshold,
    QuantityRange, ReferenceData, ReferenceError,
};
