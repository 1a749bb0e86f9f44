//! Shared helper functions for CLI commands

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::core::{Config, ReferenceData};
use crate::entities::Estimate;

/// Load an estimate file, keeping YAML diagnostics intact
pub fn load_estimate(path: &Path) -> Result<Estimate> {
    let estimate = Estimate::load(path)?;
    tracing::debug!(
        path = %path.display(),
        activities = estimate.activities.len(),
        "loaded estimate"
    );
    Ok(estimate)
}

/// Reference tables from `override_path`, then config, then built-ins
pub fn load_reference(config: &Config, override_path: Option<&Path>) -> Result<ReferenceData> {
    Ok(config.reference_data(override_path)?)
}

/// Print `value` as YAML or JSON; returns false for other formats
pub fn print_serialized<T: Serialize>(format: OutputFormat, value: &T) -> Result<bool> {
    match format {
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(value).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Dollar amount with thousands separators, e.g. `$12,345.67`
pub fn format_money(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, c) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}${}.{:02}", if negative { "-" } else { "" }, grouped, cents % 100)
}

/// Days to one decimal place, without a trailing `.0`
pub fn format_days(days: f64) -> String {
    if (days - days.round()).abs() < 1e-9 {
        format!("{}", days.round() as i64)
    } else {
        format!("{:.1}", days)
    }
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Horizontal bar of `width` cells scaled so `max` fills it
pub fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * width as f64).round() as usize;
    "█".repeat(cells.clamp(1, width))
}
