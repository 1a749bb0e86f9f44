//! `pave estimate` - run the full estimate pipeline

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_days, format_money, load_estimate, load_reference, print_serialized, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, ReferenceData};
use crate::engine::confidence::ConfidenceLevel;
use crate::engine::rules::Severity;
use crate::engine::{Calculator, EstimateResults};
use crate::entities::Estimate;

#[derive(clap::Args, Debug)]
pub struct EstimateArgs {
    /// Estimate file (YAML)
    pub file: PathBuf,

    /// Hourly trucking rate (default from config, then 95.00)
    #[arg(long, short = 'r')]
    pub trucking_rate: Option<f64>,

    /// Reference tables file replacing the built-in tables
    #[arg(long)]
    pub reference: Option<PathBuf>,
}

/// One CSV row per activity
#[derive(Serialize)]
struct ActivityRow<'a> {
    id: &'a str,
    name: &'a str,
    activity_type: String,
    unit: String,
    gross_quantity: f64,
    duration_days: f64,
    billed_hours: f64,
    labor_cost: f64,
    equipment_cost: f64,
    material_cost: f64,
    trucking_cost: f64,
    mobilization_cost: f64,
    direct_cost: f64,
    unit_cost: Option<f64>,
    critical: Option<bool>,
}

/// Run the calculator with configured thresholds and weights
pub fn estimate_results(
    config: &Config,
    reference: &ReferenceData,
    estimate: &Estimate,
    trucking_rate: Option<f64>,
) -> EstimateResults {
    let rate = trucking_rate.unwrap_or_else(|| config.trucking_rate());
    Calculator::new(reference)
        .with_thresholds(config.analysis_thresholds())
        .with_weights(config.confidence_weights())
        .with_near_critical_days(config.near_critical_days())
        .calculate(estimate, rate)
}

pub fn run(args: EstimateArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load();
    let reference = load_reference(&config, args.reference.as_deref())?;
    let estimate = load_estimate(&args.file)?;

    let show_progress = global.format == OutputFormat::Auto && !global.quiet;
    if show_progress {
        println!(
            "{} Estimating {} ({}, {} activities)...",
            style("⚙").cyan(),
            style(&estimate.name).cyan(),
            estimate.job_mode,
            estimate.activities.len()
        );
    }

    let results = estimate_results(&config, &reference, &estimate, args.trucking_rate);

    if print_serialized(global.format, &results)? {
        return Ok(());
    }
    if global.format == OutputFormat::Csv {
        return write_csv(&results);
    }

    if global.quiet {
        println!("{}", format_money(results.totals.total));
        return Ok(());
    }

    println!("{} Estimate complete", style("✓").green());
    print_summary(&results);
    Ok(())
}

fn write_csv(results: &EstimateResults) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(io::stdout());
    for a in &results.activities {
        wtr.serialize(ActivityRow {
            id: &a.id,
            name: &a.name,
            activity_type: a.activity_type.to_string(),
            unit: a.unit.to_string(),
            gross_quantity: a.gross_quantity,
            duration_days: a.duration_days,
            billed_hours: a.tiers.standard.billed_hours(),
            labor_cost: a.labor_cost,
            equipment_cost: a.equipment_cost,
            material_cost: a.material_cost,
            trucking_cost: a.trucking_cost,
            mobilization_cost: a.mobilization_cost,
            direct_cost: a.direct_cost,
            unit_cost: a.unit_cost.as_ref().map(|u| u.value),
            critical: a.schedule.as_ref().map(|s| s.critical),
        })
        .into_diagnostic()?;
    }
    wtr.flush().into_diagnostic()?;
    Ok(())
}

fn print_summary(results: &EstimateResults) {
    let mut table = Builder::default();
    table.push_record([
        "ID", "Name", "Type", "Qty", "Days", "Billed h", "Labor", "Equipment", "Material",
        "Trucking", "Direct", "Unit cost",
    ]);
    for a in &results.activities {
        if !a.is_active() {
            let mut row = vec![a.id.clone(), truncate_str(&a.name, 24), a.activity_type.to_string()];
            row.extend(std::iter::repeat("-".to_string()).take(9));
            table.push_record(row);
            continue;
        }
        table.push_record([
            a.id.clone(),
            truncate_str(&a.name, 24),
            a.activity_type.to_string(),
            format!("{:.0} {}", a.gross_quantity, a.unit),
            format_days(a.duration_days),
            format!("{:.1}", a.tiers.standard.billed_hours()),
            format_money(a.labor_cost),
            format_money(a.equipment_cost),
            format_money(a.material_cost),
            format_money(a.trucking_cost),
            format_money(a.direct_cost),
            a.unit_cost
                .as_ref()
                .map(|u| format!("{}/{}", format_money(u.value), u.per))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!();
    println!("{}", table.build().with(Style::markdown()));

    let t = &results.totals;
    let mut costs = Builder::default();
    costs.push_record(["Cost", "Amount"]);
    for (label, amount) in [
        ("Labor", t.labor),
        ("Equipment", t.equipment),
        ("Material", t.material),
        ("Trucking", t.trucking),
        ("Mobilization", t.mobilization),
        ("Roadway safety", t.safety),
        ("Direct", t.direct),
    ] {
        costs.push_record([label.to_string(), format_money(amount)]);
    }
    for line in &t.indirect_lines {
        costs.push_record([format!("  {}", line.name), format_money(line.cost)]);
    }
    for (label, amount) in [
        ("Indirect", t.indirect),
        ("Overhead", t.overhead),
        ("Profit", t.profit),
        ("Contingency", t.contingency),
        ("Total", t.total),
    ] {
        costs.push_record([label.to_string(), format_money(amount)]);
    }
    println!();
    println!("{}", costs.build().with(Style::markdown()));

    println!();
    println!(
        "   {}: {} working days",
        style("Schedule").bold(),
        format_days(results.schedule.project_duration)
    );
    if !results.schedule.critical_path.is_empty() {
        println!("     Critical path: {}", results.schedule.critical_path.join(" → "));
    }
    if !results.near_critical.is_empty() {
        println!("     Near-critical: {}", results.near_critical.join(", "));
    }
    if results.timeline.work_days > 0 {
        println!(
            "     Calendar: {} to {} ({} calendar days, {} weather)",
            results.timeline.start_date,
            results.timeline.end_date,
            results.timeline.calendar_days,
            results.timeline.weather_days
        );
    }
    for warning in &results.schedule.warnings {
        println!("     {} {}", style("!").yellow(), warning);
    }

    if let Some(ref clusters) = results.clusters {
        println!();
        println!(
            "   {}{}:",
            style("Mobilization clusters").bold(),
            if clusters.combined_deployment { " (combined milling/paving)" } else { "" }
        );
        for c in &clusters.clusters {
            println!(
                "     {}: {} [{}]",
                c.name,
                format_money(c.mobilization_cost),
                c.activity_ids.join(", ")
            );
        }
    }

    let c = &results.confidence;
    let level = match c.level {
        ConfidenceLevel::High => style(c.level.to_string()).green(),
        ConfidenceLevel::ModHigh => style(c.level.to_string()).cyan(),
        ConfidenceLevel::Moderate => style(c.level.to_string()).yellow(),
        ConfidenceLevel::Low => style(c.level.to_string()).red(),
    };
    println!();
    println!("   {}: {:.0}% {}", style("Confidence").bold(), c.composite * 100.0, level);
    println!("     Production reliability: {:.0}%", c.production_reliability * 100.0);
    println!("     Benchmark alignment: {:.0}%", c.benchmark_alignment * 100.0);
    println!("     Scope definition: {:.0}%", c.scope_definition * 100.0);
    println!("     Data quality: {:.0}%", c.data_quality * 100.0);

    if !results.observations.is_empty() {
        println!();
        println!("   {} ({}):", style("Observations").bold(), results.observations.len());
        for o in &results.observations {
            let marker = match o.severity {
                Severity::Warning => style("⚠").yellow(),
                Severity::Info => style("ℹ").cyan(),
            };
            let target = o
                .activity_id
                .as_deref()
                .map(|id| format!(" {}", style(id).cyan()))
                .unwrap_or_default();
            println!("     {} [{}]{} {}", marker, o.rule, target, o.message);
            for reason in &o.reasons {
                println!("         - {}", reason);
            }
        }
    }

    println!();
    println!(
        "   {}: {}",
        style("Total").bold(),
        style(format_money(results.totals.total)).green().bold()
    );
}
