//! `pave schedule` - CPM schedule for an estimate file

use console::style;
use miette::{IntoDiagnostic, Result};
use std::io;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{bar, format_days, load_estimate, print_serialized};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;
use crate::engine::{schedule, Schedule, Task};

/// Width of the Gantt column in cells
const GANTT_WIDTH: usize = 30;

#[derive(clap::Args, Debug)]
pub struct ScheduleArgs {
    /// Estimate file (YAML)
    pub file: PathBuf,

    /// Total float (days) at or under which an activity is near-critical
    #[arg(long)]
    pub near_critical: Option<f64>,
}

pub fn run(args: ScheduleArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load();
    let estimate = load_estimate(&args.file)?;
    let threshold = args.near_critical.unwrap_or_else(|| config.near_critical_days());

    let tasks: Vec<Task> = estimate.activities.iter().map(Task::from_activity).collect();
    let result = schedule(&tasks);

    if print_serialized(global.format, &result)? {
        return Ok(());
    }
    if global.format == OutputFormat::Csv {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for entry in &result.entries {
            wtr.serialize(entry).into_diagnostic()?;
        }
        wtr.flush().into_diagnostic()?;
        return Ok(());
    }

    if global.quiet {
        println!("{}", format_days(result.project_duration));
        return Ok(());
    }

    print_gantt(&result, threshold);
    Ok(())
}

/// Offset bar for one entry, e.g. `   ████`
fn gantt_bar(start: f64, duration: f64, project: f64) -> String {
    if project <= 0.0 {
        return String::new();
    }
    let offset = ((start / project) * GANTT_WIDTH as f64).round() as usize;
    let offset = offset.min(GANTT_WIDTH.saturating_sub(1));
    let body: String = bar(duration, project, GANTT_WIDTH)
        .chars()
        .take(GANTT_WIDTH - offset)
        .collect();
    format!("{}{}", " ".repeat(offset), body)
}

fn print_gantt(result: &Schedule, threshold: f64) {
    let near: Vec<&str> = result
        .near_critical(threshold)
        .into_iter()
        .map(|e| e.id.as_str())
        .collect();

    let mut table = Builder::default();
    table.push_record(["ID", "Dur", "ES", "EF", "LS", "LF", "TF", "FF", "", "Timeline"]);
    for e in &result.entries {
        let flag = if e.critical {
            "●"
        } else if near.contains(&e.id.as_str()) {
            "◐"
        } else {
            ""
        };
        table.push_record([
            e.id.clone(),
            format_days(e.duration),
            format_days(e.early_start),
            format_days(e.early_finish),
            format_days(e.late_start),
            format_days(e.late_finish),
            format_days(e.total_float),
            format_days(e.free_float),
            flag.to_string(),
            gantt_bar(e.early_start, e.duration, result.project_duration),
        ]);
    }
    println!("{}", table.build().with(Style::markdown()));

    println!();
    println!(
        "   {}: {} working days ({} billed)",
        style("Duration").bold(),
        format_days(result.project_duration),
        result.work_days()
    );
    if !result.critical_path.is_empty() {
        println!(
            "   {}: {}",
            style("Critical path").bold(),
            style(result.critical_path.join(" → ")).red()
        );
    }
    if !near.is_empty() {
        println!(
            "   {} (float ≤ {}): {}",
            style("Near-critical").bold(),
            format_days(threshold),
            style(near.join(", ")).yellow()
        );
    }
    if result.cycle_detected {
        println!(
            "   {} Dependency cycle detected; activities kept in input order",
            style("!").yellow()
        );
    }
    for warning in &result.warnings {
        println!("   {} {}", style("!").yellow(), warning);
    }
}
