//! Monte Carlo cost risk
//!
//! Each cost variable is sampled from a triangular (min, most likely, max)
//! distribution. An iteration's total is the base cost scaled by every
//! variable's sample/most-likely ratio, weighted by the variable's share.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::engine::results::{ActivityResult, EstimateResults};

pub const DEFAULT_ITERATIONS: u32 = 1000;
pub const DEFAULT_BINS: usize = 20;

/// One uncertain cost driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub min: f64,
    pub most_likely: f64,
    pub max: f64,
    /// Share of the base cost this variable drives
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Variable {
    pub fn new(name: impl Into<String>, min: f64, most_likely: f64, max: f64, weight: f64) -> Self {
        Self {
            name: name.into(),
            min,
            most_likely,
            max,
            weight,
        }
    }

    /// Triangular inverse CDF at `u` in [0, 1)
    pub fn sample(&self, u: f64) -> f64 {
        let (min, mode, max) = (self.min, self.most_likely, self.max);
        if min == max {
            return min;
        }
        // Inverted or non-finite bounds
        if !min.is_finite() || !max.is_finite() || min > max {
            return mode;
        }
        let mode = mode.clamp(min, max);
        let fc = (mode - min) / (max - min);
        if u < fc {
            min + (u * (max - min) * (mode - min)).sqrt()
        } else {
            max - ((1.0 - u) * (max - min) * (max - mode)).sqrt()
        }
    }

    /// Sample relative to the most likely value
    fn ratio(&self, u: f64) -> f64 {
        if self.most_likely == 0.0 {
            return 1.0;
        }
        self.sample(u) / self.most_likely
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Distribution of simulated total cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub iterations: u32,
    pub base_cost: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p80: f64,
    pub p90: f64,
    pub p95: f64,
    pub histogram: Vec<HistogramBin>,
    /// Sorted ascending
    #[serde(skip_serializing, default)]
    pub samples: Vec<f64>,
}

impl SimulationResult {
    /// Value at quantile `p` of the sorted samples
    pub fn percentile(&self, p: f64) -> f64 {
        percentile(&self.samples, p)
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64) * p.clamp(0.0, 1.0)) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn histogram(sorted: &[f64], bins: usize) -> Vec<HistogramBin> {
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    let bins = bins.max(1);
    let width = (max - min) / bins as f64;
    if width <= 0.0 {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: sorted.len(),
        }];
    }

    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for x in sorted {
        let i = (((x - min) / width) as usize).min(bins - 1);
        out[i].count += 1;
    }
    out
}

/// Monte Carlo runner
pub struct MonteCarloSimulator {
    iterations: u32,
    bins: usize,
    seed: Option<u64>,
}

impl Default for MonteCarloSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl MonteCarloSimulator {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
            bins: DEFAULT_BINS,
            seed: None,
        }
    }

    /// Fix the random seed for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins.max(1);
        self
    }

    pub fn run(&self, base_cost: f64, variables: &[Variable]) -> SimulationResult {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut samples: Vec<f64> = Vec::with_capacity(self.iterations as usize);
        for _ in 0..self.iterations {
            let total: f64 = variables
                .iter()
                .map(|v| {
                    let u: f64 = rng.random();
                    v.weight * base_cost * v.ratio(u)
                })
                .sum();
            samples.push(total);
        }
        samples.sort_by(f64::total_cmp);

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        tracing::debug!(
            iterations = self.iterations,
            variables = variables.len(),
            mean,
            "simulation complete"
        );

        SimulationResult {
            iterations: self.iterations,
            base_cost,
            min: samples.first().copied().unwrap_or(0.0),
            max: samples.last().copied().unwrap_or(0.0),
            mean,
            std_dev: variance.sqrt(),
            p10: percentile(&samples, 0.10),
            p25: percentile(&samples, 0.25),
            p50: percentile(&samples, 0.50),
            p75: percentile(&samples, 0.75),
            p80: percentile(&samples, 0.80),
            p90: percentile(&samples, 0.90),
            p95: percentile(&samples, 0.95),
            histogram: histogram(&samples, self.bins),
            samples,
        }
    }
}

/// Simulate `base_cost` with default settings
pub fn run_simulation(base_cost: f64, variables: &[Variable]) -> SimulationResult {
    MonteCarloSimulator::default().run(base_cost, variables)
}

/// Hour-driven spread from the aggressive and conservative tiers, as
/// (low, high) multipliers of the standard tier weighted by `cost`
fn tier_spread(
    results: &EstimateResults,
    cost: impl Fn(&ActivityResult) -> f64,
) -> Option<(f64, f64)> {
    let mut base = 0.0;
    let mut low = 0.0;
    let mut high = 0.0;
    for a in results.active_activities() {
        let standard = a.tiers.standard.billed_hours();
        let c = cost(a);
        if standard <= 0.0 || c <= 0.0 {
            continue;
        }
        base += c;
        low += c * a.tiers.aggressive.billed_hours() / standard;
        high += c * a.tiers.conservative.billed_hours() / standard;
    }
    (base > 0.0).then(|| (low / base, high / base))
}

/// Variables for each cost bucket of an estimate, weighted by share of the
/// total. Values are percentages of the estimated amount.
pub fn cost_variables(results: &EstimateResults) -> Vec<Variable> {
    let t = &results.totals;
    if t.total <= 0.0 {
        return Vec::new();
    }

    let (labor_lo, labor_hi) = tier_spread(results, |a| a.labor_cost).unwrap_or((0.90, 1.30));
    let (equip_lo, equip_hi) = tier_spread(results, |a| a.equipment_cost).unwrap_or((0.95, 1.20));

    let named = [
        ("labor", t.labor, labor_lo, labor_hi),
        ("equipment", t.equipment, equip_lo, equip_hi),
        ("material", t.material, 0.95, 1.15),
        ("trucking", t.trucking, 0.90, 1.35),
        ("mobilization", t.mobilization + t.safety, 1.00, 1.10),
    ];
    let covered: f64 = named.iter().map(|(_, amount, _, _)| amount).sum();
    let indirect = (t.total - covered).max(0.0);

    named
        .into_iter()
        .chain(std::iter::once(("indirect", indirect, 0.98, 1.10)))
        .filter(|(_, amount, _, _)| *amount > 0.0)
        .map(|(name, amount, lo, hi)| {
            Variable::new(name, 100.0 * lo.min(1.0), 100.0, 100.0 * hi.max(1.0), amount / t.total)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_variable_is_exact() {
        let vars = vec![Variable::new("fixed", 100.0, 100.0, 100.0, 1.0)];
        let result = MonteCarloSimulator::new(10_000).run(1000.0, &vars);
        assert_eq!(result.samples.len(), 10_000);
        assert!(result.samples.iter().all(|s| *s == 1000.0));
        assert_eq!(result.min, 1000.0);
        assert_eq!(result.max, 1000.0);
        assert_eq!(result.std_dev, 0.0);
        assert_eq!(result.histogram.len(), 1);
        assert_eq!(result.histogram[0].count, 10_000);
    }

    #[test]
    fn test_triangular_sample_bounds() {
        let v = Variable::new("x", 80.0, 100.0, 130.0, 1.0);
        assert_eq!(v.sample(0.0), 80.0);
        assert!((v.sample(0.999_999_999) - 130.0).abs() < 0.01);
        let fc = 20.0 / 50.0;
        assert!((v.sample(fc) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_bounds_fall_back_to_mode() {
        let v = Variable::new("x", 120.0, 100.0, 80.0, 1.0);
        assert_eq!(v.sample(0.3), 100.0);
        let zero = Variable::new("z", 0.0, 0.0, 10.0, 1.0);
        assert_eq!(zero.ratio(0.5), 1.0);
    }

    #[test]
    fn test_non_finite_bounds_fall_back_to_mode() {
        let v = Variable::new("x", f64::NAN, 100.0, 200.0, 1.0);
        assert_eq!(v.sample(0.5), 100.0);
        let v = Variable::new("x", 90.0, 100.0, f64::NAN, 1.0);
        assert_eq!(v.sample(0.5), 100.0);
        let v = Variable::new("x", 90.0, 100.0, f64::INFINITY, 1.0);
        assert_eq!(v.sample(0.5), 100.0);

        let vars = vec![Variable::new("labor", 90.0, 100.0, f64::NAN, 1.0)];
        let r = MonteCarloSimulator::new(10).with_seed(1).run(1000.0, &vars);
        assert!(r.samples.iter().all(|s| *s == 1000.0));
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let vars = vec![
            Variable::new("labor", 90.0, 100.0, 130.0, 0.6),
            Variable::new("material", 95.0, 100.0, 115.0, 0.4),
        ];
        let a = MonteCarloSimulator::new(500).with_seed(7).run(50_000.0, &vars);
        let b = MonteCarloSimulator::new(500).with_seed(7).run(50_000.0, &vars);
        assert_eq!(a.samples, b.samples);
        assert!(a.min >= 50_000.0 * 0.6 * 0.9 + 50_000.0 * 0.4 * 0.95 - 1e-6);
        assert!(a.p10 <= a.p50 && a.p50 <= a.p90 && a.p90 <= a.p95);
    }

    #[test]
    fn test_histogram_counts_every_sample() {
        let vars = vec![Variable::new("x", 50.0, 100.0, 200.0, 1.0)];
        let r = MonteCarloSimulator::new(2000).with_seed(1).with_bins(10).run(100.0, &vars);
        assert_eq!(r.histogram.len(), 10);
        assert_eq!(r.histogram.iter().map(|b| b.count).sum::<usize>(), 2000);
        assert_eq!(r.histogram[0].lower, r.min);
    }

    #[test]
    fn test_no_variables_gives_zero() {
        let r = MonteCarloSimulator::new(10).with_seed(3).run(1000.0, &[]);
        assert_eq!(r.mean, 0.0);
        assert_eq!(r.p50, 0.0);
    }
}
