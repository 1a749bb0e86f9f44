//! `pave reference` - validate and summarize reference tables

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_money, load_reference, print_serialized};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, ReferenceData};
use crate::entities::JobMode;

#[derive(clap::Args, Debug)]
pub struct ReferenceArgs {
    /// Reference tables file (default: configured file, then built-in tables)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Serialize)]
struct BenchmarkRow {
    job_mode: String,
    activity_type: String,
    unit: String,
    p25: f64,
    median: f64,
    p75: f64,
    sample_size: u32,
}

fn benchmark_rows(data: &ReferenceData) -> Vec<BenchmarkRow> {
    data.benchmarks
        .iter()
        .flat_map(|(mode, table)| {
            table.iter().map(move |(activity, b)| BenchmarkRow {
                job_mode: mode.to_string(),
                activity_type: activity.to_string(),
                unit: b.unit.to_string(),
                p25: b.p25,
                median: b.median,
                p75: b.p75,
                sample_size: b.sample_size,
            })
        })
        .collect()
}

pub fn run(args: ReferenceArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load();
    let data = load_reference(&config, args.file.as_deref())?;

    if print_serialized(global.format, &data)? {
        return Ok(());
    }
    if global.format == OutputFormat::Csv {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for row in benchmark_rows(&data) {
            wtr.serialize(row).into_diagnostic()?;
        }
        wtr.flush().into_diagnostic()?;
        return Ok(());
    }

    let source = args
        .file
        .as_ref()
        .or(config.reference.as_ref())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in tables".to_string());
    println!("{} Reference tables valid ({})", style("✓").green(), source);
    if global.quiet {
        return Ok(());
    }

    println!();
    for mode in [JobMode::ParkingLot, JobMode::Roadway] {
        let benchmarks = data.benchmarks.get(&mode).map_or(0, |t| t.len());
        let ranges = data.quantity_ranges.get(&mode).map_or(0, |t| t.len());
        println!(
            "   {}: {} benchmarks, {} quantity ranges",
            style(mode).bold(),
            benchmarks,
            ranges
        );
    }
    println!("   Reliability factors: {}", data.reliability.len());
    println!("   Crew thresholds: {} activity types", data.crew_thresholds.len());
    println!("   Roadway safety crew: {}/h", format_money(data.safety_crew_rate));

    let mut crews = Builder::default();
    crews.push_record(["Crew", "Headcount", "Rate/h"]);
    for c in &data.crews {
        crews.push_record([c.name.clone(), c.headcount.to_string(), format_money(c.hourly_rate)]);
    }
    println!();
    println!("{}", crews.build().with(Style::markdown()));

    let mut clusters = Builder::default();
    clusters.push_record(["Cluster", "Activity types", "Mobilization/h"]);
    for c in &data.clusters {
        let types: Vec<String> = c.activity_types.iter().map(|t| t.to_string()).collect();
        clusters.push_record([c.name.clone(), types.join(", "), format_money(c.mobilization_crew_rate)]);
    }
    println!();
    println!("{}", clusters.build().with(Style::markdown()));
    Ok(())
}
