//! Estimate entity - the full input bundle for one calculation run

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::entities::activity::Activity;
use crate::yaml::{YamlError, YamlSyntaxError};

/// Job mode selects benchmark and quantity-range tables
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    #[default]
    ParkingLot,
    Roadway,
}

impl std::fmt::Display for JobMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobMode::ParkingLot => write!(f, "parking_lot"),
            JobMode::Roadway => write!(f, "roadway"),
        }
    }
}

/// Shift length and billing policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftSettings {
    /// Nominal shift length in hours
    pub standard_hours: f64,

    /// Longest regular shift the crew will work
    pub max_hours: f64,

    /// Billable shift lengths, ascending
    pub billing_increments: Vec<f64>,

    /// Overrun absorbed without moving to the next increment
    pub hustle_hours: f64,

    /// Schedule Saturdays and Sundays as work days
    pub work_weekends: bool,
}

impl Default for ShiftSettings {
    fn default() -> Self {
        Self {
            standard_hours: 8.0,
            max_hours: 10.0,
            billing_increments: vec![4.0, 6.0, 8.0, 10.0, 12.0],
            hustle_hours: 0.5,
            work_weekends: false,
        }
    }
}

/// How an indirect line item is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndirectKind {
    /// Amount per project working day
    PerDay,
    /// Percentage of direct cost
    PercentOfDirect,
    /// Fixed amount
    LumpSum,
}

/// An indirect (general conditions) line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndirectItem {
    pub name: String,

    pub kind: IndirectKind,

    /// Rate, percentage or amount depending on `kind`
    pub amount: f64,

    /// Item covers traffic control / work-zone safety
    #[serde(default)]
    pub traffic_control: bool,
}

/// Indirect cost and markup configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IndirectConfig {
    pub items: Vec<IndirectItem>,

    pub overhead_percent: f64,

    pub profit_percent: f64,

    pub contingency_percent: f64,
}

/// A paving estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub name: String,

    #[serde(default)]
    pub job_mode: JobMode,

    /// First working day (today when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    pub shift: ShiftSettings,

    /// Share mobilization across co-deployable activities
    #[serde(default)]
    pub cluster_mode: bool,

    /// One-way travel time from yard to site
    #[serde(default)]
    pub travel_hours: f64,

    /// Weather contingency days appended to the calendar
    #[serde(default)]
    pub weather_days: u32,

    #[serde(default)]
    pub activities: Vec<Activity>,

    #[serde(default)]
    pub indirect: IndirectConfig,
}

impl Estimate {
    pub fn new(name: impl Into<String>, job_mode: JobMode) -> Self {
        Self {
            name: name.into(),
            job_mode,
            start_date: None,
            shift: ShiftSettings::default(),
            cluster_mode: false,
            travel_hours: 0.0,
            weather_days: 0,
            activities: Vec::new(),
            indirect: IndirectConfig::default(),
        }
    }

    /// Parse an estimate from YAML, reporting syntax errors against `filename`
    pub fn from_yaml(content: &str, filename: &str) -> Result<Self, YamlError> {
        serde_yml::from_str(content)
            .map_err(|e| YamlSyntaxError::from_serde_error(&e, content, filename).into())
    }

    /// Load an estimate file from disk
    pub fn load(path: &Path) -> Result<Self, YamlError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content, &path.display().to_string())
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    pub fn active_activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter().filter(|a| a.is_active())
    }
}
