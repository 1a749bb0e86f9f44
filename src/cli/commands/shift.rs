//! `pave shift` - bill a raw-hours figure into shift-days

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::io;

use crate::cli::helpers::print_serialized;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::engine::shift::BillingStrategy;
use crate::engine::ShiftPolicy;
use crate::entities::ShiftSettings;

#[derive(clap::Args, Debug)]
pub struct ShiftArgs {
    /// Raw crew hours to bill
    pub hours: f64,

    /// Spread the hours over at least this many days
    #[arg(long)]
    pub min_days: Option<u32>,

    /// Nominal shift length in hours
    #[arg(long, default_value_t = 8.0)]
    pub standard: f64,

    /// Longest regular shift in hours
    #[arg(long, default_value_t = 10.0)]
    pub max: f64,

    /// Overrun absorbed without moving to the next increment
    #[arg(long, default_value_t = 0.5)]
    pub hustle: f64,

    /// Billable shift lengths
    #[arg(long, value_delimiter = ',', default_values_t = vec![4.0, 6.0, 8.0, 10.0, 12.0])]
    pub increments: Vec<f64>,
}

impl ShiftArgs {
    fn settings(&self) -> ShiftSettings {
        ShiftSettings {
            standard_hours: self.standard,
            max_hours: self.max,
            billing_increments: self.increments.clone(),
            hustle_hours: self.hustle,
            ..ShiftSettings::default()
        }
    }
}

#[derive(Serialize)]
struct DayRow {
    day: usize,
    billed_hours: f64,
}

pub fn run(args: ShiftArgs, global: &GlobalOpts) -> Result<()> {
    if !args.hours.is_finite() || args.hours < 0.0 {
        return Err(miette::miette!("Hours must be a non-negative number, got {}", args.hours));
    }

    let policy = ShiftPolicy::from_settings(&args.settings());
    let plan = policy.optimize(args.hours, args.min_days);

    if print_serialized(global.format, &plan)? {
        return Ok(());
    }
    if global.format == OutputFormat::Csv {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for (i, hours) in plan.day_hours.iter().enumerate() {
            wtr.serialize(DayRow {
                day: i + 1,
                billed_hours: *hours,
            })
            .into_diagnostic()?;
        }
        wtr.flush().into_diagnostic()?;
        return Ok(());
    }

    if global.quiet {
        println!("{} h / {} days", plan.billed_hours, plan.billed_days);
        return Ok(());
    }

    let strategy = match plan.strategy {
        BillingStrategy::None => "nothing to bill",
        BillingStrategy::SingleDay => "single shift",
        BillingStrategy::StandardBase => "standard-length days",
        BillingStrategy::MaximumBase => "maximum-length days",
        BillingStrategy::MinimumDays => "spread over minimum days",
    };

    println!(
        "{} {} raw hours → {} billed hours over {} days",
        style("✓").green(),
        args.hours,
        style(plan.billed_hours).cyan(),
        style(plan.billed_days).cyan()
    );
    println!();
    println!("   Layout: {}", strategy);
    if !plan.day_hours.is_empty() {
        let days: Vec<String> = plan.day_hours.iter().map(|h| format!("{}", h)).collect();
        println!("   Days: {}", days.join(" + "));
        println!("   Average day: {:.2} h", plan.average_day());
        println!("   Utilization: {:.1}%", plan.utilization() * 100.0);
    }
    println!(
        "   Increments: {:?} (hustle {} h)",
        policy.increments(),
        policy.hustle()
    );
    Ok(())
}
