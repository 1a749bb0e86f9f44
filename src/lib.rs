//! pave: paving cost and schedule estimator
//!
//! Turns an estimate (activities, quantities, production rates, crews and
//! dependencies) into a CPM schedule, billed shift hours, three production
//! tiers, trucking and mobilization costs, a confidence score, analysis
//! observations and a Monte Carlo cost distribution.
//!
//! ```no_run
//! use pave::core::ReferenceData;
//! use pave::engine::calculate;
//! use pave::entities::Estimate;
//!
//! let estimate = Estimate::load(std::path::Path::new("job.yaml"))?;
//! let reference = ReferenceData::embedded()?;
//! let results = calculate(&estimate, 95.0, &reference);
//! println!("{:.2}", results.totals.total);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod core;
pub mod engine;
pub mod entities;
pub mod yaml;
