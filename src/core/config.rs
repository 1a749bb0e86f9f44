//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::reference::{ReferenceData, ReferenceError};
use crate::engine::confidence::ConfidenceWeights;
use crate::engine::monte_carlo::{DEFAULT_BINS, DEFAULT_ITERATIONS};
use crate::engine::rules::AnalysisThresholds;
use crate::engine::scheduler::DEFAULT_NEAR_CRITICAL_DAYS;

/// Hourly rate for a haul truck and driver when nothing else is configured
pub const DEFAULT_TRUCKING_RATE: f64 = 95.0;

/// Project-local config file name
pub const LOCAL_CONFIG: &str = ".pave.yaml";

/// pave configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hourly trucking rate passed to the calculator
    pub trucking_rate: Option<f64>,

    /// Reference tables file replacing the built-in tables
    pub reference: Option<PathBuf>,

    /// Monte Carlo iterations
    pub iterations: Option<u32>,

    /// Histogram bins for simulation output
    pub bins: Option<usize>,

    /// Total-float threshold for near-critical activities
    pub near_critical_days: Option<f64>,

    /// Analysis rule thresholds
    pub analysis: Option<AnalysisThresholds>,

    /// Confidence sub-score weights
    pub confidence: Option<ConfidenceWeights>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/pave/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Working-directory config (./.pave.yaml)
        if let Some(local) = Self::read_file(Path::new(LOCAL_CONFIG)) {
            config.merge(local);
        }

        // 4. Environment variables
        if let Some(rate) = std::env::var("PAVE_TRUCKING_RATE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
        {
            config.trucking_rate = Some(rate);
        }
        if let Ok(path) = std::env::var("PAVE_REFERENCE") {
            config.reference = Some(PathBuf::from(path));
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "pave")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.trucking_rate.is_some() {
            self.trucking_rate = other.trucking_rate;
        }
        if other.reference.is_some() {
            self.reference = other.reference;
        }
        if other.iterations.is_some() {
            self.iterations = other.iterations;
        }
        if other.bins.is_some() {
            self.bins = other.bins;
        }
        if other.near_critical_days.is_some() {
            self.near_critical_days = other.near_critical_days;
        }
        if other.analysis.is_some() {
            self.analysis = other.analysis;
        }
        if other.confidence.is_some() {
            self.confidence = other.confidence;
        }
    }

    pub fn trucking_rate(&self) -> f64 {
        self.trucking_rate.unwrap_or(DEFAULT_TRUCKING_RATE)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations.unwrap_or(DEFAULT_ITERATIONS)
    }

    pub fn bins(&self) -> usize {
        self.bins.unwrap_or(DEFAULT_BINS)
    }

    pub fn near_critical_days(&self) -> f64 {
        self.near_critical_days.unwrap_or(DEFAULT_NEAR_CRITICAL_DAYS)
    }

    pub fn analysis_thresholds(&self) -> AnalysisThresholds {
        self.analysis.clone().unwrap_or_default()
    }

    pub fn confidence_weights(&self) -> ConfidenceWeights {
        self.confidence.clone().unwrap_or_default()
    }

    /// Reference tables from `override_path`, the configured file, or the
    /// built-in set, in that order
    pub fn reference_data(&self, override_path: Option<&Path>) -> Result<ReferenceData, ReferenceError> {
        match override_path.or(self.reference.as_deref()) {
            Some(path) => ReferenceData::load(path),
            None => ReferenceData::embedded(),
        }
    }
}
