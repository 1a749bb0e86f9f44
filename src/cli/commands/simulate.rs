//! `pave simulate` - Monte Carlo cost risk for an estimate file

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::estimate::estimate_results;
use crate::cli::helpers::{bar, format_money, load_estimate, load_reference, print_serialized};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;
use crate::engine::monte_carlo::cost_variables;
use crate::engine::{MonteCarloSimulator, SimulationResult, Variable};

const HISTOGRAM_WIDTH: usize = 40;

#[derive(clap::Args, Debug)]
pub struct SimulateArgs {
    /// Estimate file (YAML)
    pub file: PathBuf,

    /// Number of iterations (default from config, then 1000)
    #[arg(long, short = 'n')]
    pub iterations: Option<u32>,

    /// Histogram bins (default from config, then 20)
    #[arg(long)]
    pub bins: Option<usize>,

    /// Random seed for a repeatable run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Variables file (YAML list or CSV with name,min,most_likely,max[,weight])
    #[arg(long)]
    pub variables: Option<PathBuf>,

    /// Hourly trucking rate (default from config, then 95.00)
    #[arg(long, short = 'r')]
    pub trucking_rate: Option<f64>,

    /// Reference tables file replacing the built-in tables
    #[arg(long)]
    pub reference: Option<PathBuf>,
}

pub fn run(args: SimulateArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load();
    let reference = load_reference(&config, args.reference.as_deref())?;
    let estimate = load_estimate(&args.file)?;
    let results = estimate_results(&config, &reference, &estimate, args.trucking_rate);

    let variables = match args.variables {
        Some(ref path) => read_variables(path)?,
        None => cost_variables(&results),
    };

    let weight: f64 = variables.iter().map(|v| v.weight).sum();
    if !variables.is_empty() && (weight - 1.0).abs() > 0.01 {
        tracing::warn!(weight, "variable weights do not sum to 1; simulated mean will drift from the estimate");
    }

    let iterations = args.iterations.unwrap_or_else(|| config.iterations());
    let mut simulator = MonteCarloSimulator::new(iterations).with_bins(args.bins.unwrap_or_else(|| config.bins()));
    if let Some(seed) = args.seed {
        simulator = simulator.with_seed(seed);
    }

    let show_progress = global.format == OutputFormat::Auto && !global.quiet;
    if show_progress {
        println!(
            "{} Simulating {} over {} variables ({} iterations)...",
            style("⚙").cyan(),
            style(&estimate.name).cyan(),
            variables.len(),
            iterations
        );
    }

    let result = simulator.run(results.totals.total, &variables);

    if print_serialized(global.format, &result)? {
        return Ok(());
    }
    if global.format == OutputFormat::Csv {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for b in &result.histogram {
            wtr.serialize(b).into_diagnostic()?;
        }
        wtr.flush().into_diagnostic()?;
        return Ok(());
    }

    if global.quiet {
        println!("{}", format_money(result.p80));
        return Ok(());
    }

    println!("{} Simulation complete", style("✓").green());
    print_distribution(&result, &variables);
    Ok(())
}

/// Read variables from YAML, or CSV when the extension says so
fn read_variables(path: &Path) -> Result<Vec<Variable>> {
    let is_csv = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .into_diagnostic()?;
        let mut variables = Vec::new();
        for (i, row) in rdr.deserialize::<Variable>().enumerate() {
            let v = row.map_err(|e| miette::miette!("{}: row {}: {}", path.display(), i + 2, e))?;
            variables.push(v);
        }
        return Ok(variables);
    }

    let content = fs::read_to_string(path).into_diagnostic()?;
    serde_yml::from_str(&content).map_err(|e| miette::miette!("{}: {}", path.display(), e))
}

fn print_distribution(result: &SimulationResult, variables: &[Variable]) {
    println!();
    println!("   {}: {}", style("Base estimate").bold(), format_money(result.base_cost));
    println!("     Mean: {}", format_money(result.mean));
    println!("     Std Dev: {}", format_money(result.std_dev));
    println!("     Range: {} to {}", format_money(result.min), format_money(result.max));

    let mut pct = Builder::default();
    pct.push_record(["Percentile", "Total cost", "vs. base"]);
    for (label, value) in [
        ("P10", result.p10),
        ("P25", result.p25),
        ("P50", result.p50),
        ("P75", result.p75),
        ("P80", result.p80),
        ("P90", result.p90),
        ("P95", result.p95),
    ] {
        let delta = if result.base_cost > 0.0 {
            format!("{:+.1}%", (value / result.base_cost - 1.0) * 100.0)
        } else {
            "-".to_string()
        };
        pct.push_record([label.to_string(), format_money(value), delta]);
    }
    println!();
    println!("{}", pct.build().with(Style::markdown()));

    if !variables.is_empty() {
        let mut vars = Builder::default();
        vars.push_record(["Variable", "Min", "Most likely", "Max", "Weight"]);
        for v in variables {
            vars.push_record([
                v.name.clone(),
                format!("{:.1}", v.min),
                format!("{:.1}", v.most_likely),
                format!("{:.1}", v.max),
                format!("{:.1}%", v.weight * 100.0),
            ]);
        }
        println!();
        println!("{}", vars.build().with(Style::markdown()));
    }

    let peak = result.histogram.iter().map(|b| b.count).max().unwrap_or(0) as f64;
    if peak > 0.0 {
        println!();
        println!("   {}:", style("Distribution").bold());
        for b in &result.histogram {
            println!(
                "     {:>14} │{}",
                format_money(b.lower),
                bar(b.count as f64, peak, HISTOGRAM_WIDTH)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_variables_with_default_weight() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.csv");
        fs::write(
            &path,
            "name,min,most_likely,max,weight\nlabor, 90, 100, 130, 0.6\nmaterial,95,100,115,0.4\n",
        )
        .unwrap();

        let vars = read_variables(&path).unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].name, "labor");
        assert_eq!(vars[0].max, 130.0);
        assert_eq!(vars[1].weight, 0.4);
    }

    #[test]
    fn test_read_yaml_variables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.yaml");
        fs::write(&path, "- name: asphalt price\n  min: 95\n  most_likely: 100\n  max: 125\n").unwrap();

        let vars = read_variables(&path).unwrap();
        assert_eq!(vars, vec![Variable::new("asphalt price", 95.0, 100.0, 125.0, 1.0)]);
    }

    #[test]
    fn test_read_variables_reports_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.csv");
        fs::write(&path, "name,min,most_likely,max\nlabor,low,100,130\n").unwrap();
        let err = read_variables(&path).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }
}
