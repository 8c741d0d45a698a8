//! Research harness for the ATSP solvers.
//!
//! Provides the timing sweeps over random instances, the max-size probe,
//! the metaheuristic parameter sweeps and the evaluation of saved tour files.
//! Tables go to CSV through serde; convergence traces go to plain text files.

use crate::error::{AtspError, Result};
use crate::exact::{BranchAndBound, BranchAndBoundConfig, BruteForce, HeldKarp};
use crate::heuristics::genetic::{CrossoverType, GAConfig, GeneticAlgorithm, MutationType};
use crate::heuristics::local_search::{AnnealingConfig, LocalSearch, SimulatedAnnealing, TabuConfig, TabuSearch};
use crate::matrix::CostMatrix;
use crate::solution::{ConvergencePoint, Solution};

use indicatif::{ProgressBar, ProgressStyle};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Exact algorithms covered by the timing sweeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExactAlgorithm {
    BruteForce,
    DynamicProgramming,
    BranchAndBound,
}

impl ExactAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            ExactAlgorithm::BruteForce => "Brute Force",
            ExactAlgorithm::DynamicProgramming => "Dynamic Programming",
            ExactAlgorithm::BranchAndBound => "Branch and Bound",
        }
    }

    /// Solve one instance to optimality.
    pub fn solve(&self, matrix: &CostMatrix) -> Result<Solution> {
        match self {
            ExactAlgorithm::BruteForce => BruteForce::default().solve(matrix),
            ExactAlgorithm::DynamicProgramming => HeldKarp::default().solve(matrix),
            ExactAlgorithm::BranchAndBound => BranchAndBound::new(BranchAndBoundConfig::default())
                .solve(matrix)
                .map(|result| result.solution),
        }
    }
}

/// One row of the exact timing table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingRecord {
    pub algorithm: String,
    pub size: usize,
    pub repetitions: usize,
    pub mean_time: f64,
    pub std_dev_time: f64,
    pub min_time: f64,
    pub max_time: f64,
    pub mean_cost: f64,
}

/// Exact timing sweep configuration
#[derive(Debug, Clone)]
pub struct ExactTimingConfig {
    /// Sizes per algorithm
    pub plan: Vec<(ExactAlgorithm, Vec<usize>)>,
    /// Random instances per size
    pub repetitions: usize,
    pub seed: u64,
    pub output_dir: PathBuf,
    pub show_progress: bool,
}

impl Default for ExactTimingConfig {
    fn default() -> Self {
        ExactTimingConfig {
            plan: vec![
                (ExactAlgorithm::BruteForce, (5..=11).collect()),
                (ExactAlgorithm::DynamicProgramming, vec![5, 10, 12, 15, 18, 20]),
                (ExactAlgorithm::BranchAndBound, vec![5, 10, 15, 20, 25, 28, 30]),
            ],
            repetitions: 50,
            seed: 42,
            output_dir: PathBuf::from("research"),
            show_progress: true,
        }
    }
}

fn progress_bar(len: u64, show: bool, message: &str) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("{msg:>24} [{bar:40}] {pos}/{len} ({elapsed})") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(message.to_string());
    bar
}

/// Summarise a set of run times. Standard deviation is 0 below two samples.
fn summarise_times(times: &[f64]) -> (f64, f64, f64, f64) {
    if times.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let mean = statrs::statistics::Statistics::mean(times.iter());
    let std_dev = if times.len() < 2 {
        0.0
    } else {
        statrs::statistics::Statistics::std_dev(times.iter())
    };
    let min = times.iter().copied().map(OrderedFloat).min().map_or(0.0, |t| t.0);
    let max = times.iter().copied().map(OrderedFloat).max().map_or(0.0, |t| t.0);
    (mean, std_dev, min, max)
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Time every algorithm over its sizes and write `exact_timings.csv`.
///
/// Instances with no tour are skipped; any other solver error aborts the sweep.
pub fn time_exact_algorithms(config: &ExactTimingConfig) -> Result<Vec<TimingRecord>> {
    let total: usize = config.plan.iter().map(|(_, sizes)| sizes.len()).sum();
    let bar = progress_bar((total * config.repetitions) as u64, config.show_progress, "exact timings");
    let mut records = Vec::new();

    for (algorithm, sizes) in &config.plan {
        for &size in sizes {
            let mut times = Vec::with_capacity(config.repetitions);
            let mut costs = Vec::with_capacity(config.repetitions);

            for rep in 0..config.repetitions {
                let seed = config.seed.wrapping_add((size * 1000 + rep) as u64);
                let matrix = CostMatrix::random(size, seed)?;
                let start = Instant::now();
                match algorithm.solve(&matrix) {
                    Ok(solution) => {
                        times.push(start.elapsed().as_secs_f64());
                        costs.push(solution.cost as f64);
                    }
                    Err(AtspError::NoFeasibleTour) => {}
                    Err(e) => {
                        bar.abandon();
                        return Err(e);
                    }
                }
                bar.inc(1);
            }

            let (mean_time, std_dev_time, min_time, max_time) = summarise_times(&times);
            log::info!(
                "{} n={}: mean {:.6}s, std {:.6}s over {} runs",
                algorithm.name(),
                size,
                mean_time,
                std_dev_time,
                times.len()
            );
            records.push(TimingRecord {
                algorithm: algorithm.name().to_string(),
                size,
                repetitions: times.len(),
                mean_time,
                std_dev_time,
                min_time,
                max_time,
                mean_cost: if costs.is_empty() {
                    0.0
                } else {
                    costs.iter().sum::<f64>() / costs.len() as f64
                },
            });
        }
    }
    bar.finish_and_clear();

    write_csv(&config.output_dir.join("exact_timings.csv"), &records)?;
    Ok(records)
}

/// Max-size probe configuration
#[derive(Debug, Clone)]
pub struct MaxSizeProbe {
    pub algorithm: ExactAlgorithm,
    /// Largest acceptable time for one solve
    pub budget: Duration,
    pub start_size: usize,
    /// Stop growing here even if still under budget
    pub max_size: usize,
    pub seed: u64,
}

impl Default for MaxSizeProbe {
    fn default() -> Self {
        MaxSizeProbe {
            algorithm: ExactAlgorithm::BranchAndBound,
            budget: Duration::from_secs(120),
            start_size: 4,
            max_size: 64,
            seed: 42,
        }
    }
}

/// Outcome of a max-size probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxSizeReport {
    pub algorithm: String,
    /// Largest size solved within budget, if any
    pub largest_size: Option<usize>,
    /// Solve time at that size
    pub time: Option<f64>,
}

impl MaxSizeProbe {
    /// Solve one instance, returning false when it did not finish within budget.
    ///
    /// Branch and bound receives the budget as its deadline so that a size
    /// beyond reach stops on time instead of running to completion.
    fn solve_within_budget(&self, matrix: &CostMatrix) -> Result<bool> {
        let start = Instant::now();
        match self.algorithm {
            ExactAlgorithm::BranchAndBound => {
                let config = BranchAndBoundConfig {
                    time_limit: Some(self.budget),
                    ..Default::default()
                };
                match BranchAndBound::new(config).solve(matrix) {
                    Ok(result) => Ok(result.proven_optimal && start.elapsed() <= self.budget),
                    Err(AtspError::TimeLimitReached) => Ok(false),
                    Err(e) => Err(e),
                }
            }
            _ => {
                self.algorithm.solve(matrix)?;
                Ok(start.elapsed() <= self.budget)
            }
        }
    }

    /// Grow the instance one city at a time until a solve exceeds the budget.
    pub fn run(&self) -> Result<MaxSizeReport> {
        let mut report = MaxSizeReport {
            algorithm: self.algorithm.name().to_string(),
            largest_size: None,
            time: None,
        };

        for size in self.start_size.max(1)..=self.max_size {
            let matrix = CostMatrix::random(size, self.seed.wrapping_add(size as u64))?;
            let start = Instant::now();
            let within_budget = match self.solve_within_budget(&matrix) {
                Ok(within) => within,
                Err(AtspError::TooLarge { .. }) => break,
                Err(e) => return Err(e),
            };
            let elapsed = start.elapsed();
            log::info!("{} n={}: {:.3}s", self.algorithm.name(), size, elapsed.as_secs_f64());

            if !within_budget {
                break;
            }
            report.largest_size = Some(size);
            report.time = Some(elapsed.as_secs_f64());
        }

        Ok(report)
    }
}

/// One metaheuristic run in a sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRecord {
    pub algorithm: String,
    pub parameter: String,
    pub run: usize,
    pub cost: i64,
    pub feasible: bool,
    pub time: f64,
    pub iterations: Option<usize>,
    pub convergence_file: String,
}

/// Metaheuristic sweep configuration
#[derive(Debug, Clone)]
pub struct MetaheuristicSweepConfig {
    /// Wall-clock limit for every single run
    pub time_limit: Duration,
    pub tabu_runs: usize,
    pub cooling_rates: Vec<f64>,
    pub population_sizes: Vec<usize>,
    pub mutation_rates: Vec<f64>,
    pub crossover_rates: Vec<f64>,
    pub seed: u64,
    pub output_dir: PathBuf,
    pub show_progress: bool,
}

impl Default for MetaheuristicSweepConfig {
    fn default() -> Self {
        MetaheuristicSweepConfig {
            time_limit: Duration::from_secs(60),
            tabu_runs: 10,
            cooling_rates: vec![0.99, 0.995, 0.999],
            population_sizes: vec![500, 1000, 2000],
            mutation_rates: vec![0.01, 0.05, 0.1],
            crossover_rates: vec![0.5, 0.7, 0.9],
            seed: 42,
            output_dir: PathBuf::from("research"),
            show_progress: true,
        }
    }
}

/// Write a convergence trace: label, city count, then `elapsed; cost` lines.
pub fn write_convergence<P: AsRef<Path>>(path: P, label: &str, size: usize, points: &[ConvergencePoint]) -> Result<()> {
    let mut out = format!("{}\n{}\n", label, size);
    for p in points {
        out.push_str(&format!("{:.3}; {}\n", p.elapsed, p.cost));
    }
    fs::write(path, out)?;
    Ok(())
}

const OPERATOR_COMBINATIONS: [(CrossoverType, MutationType); 4] = [
    (CrossoverType::OrderCrossover, MutationType::Swap),
    (CrossoverType::OrderCrossover, MutationType::Inversion),
    (CrossoverType::PMX, MutationType::Swap),
    (CrossoverType::PMX, MutationType::Inversion),
];

struct SweepRun {
    label: String,
    parameter: String,
    run: usize,
    kind: SweepKind,
}

enum SweepKind {
    Tabu(TabuConfig),
    Annealing(AnnealingConfig),
    Genetic(GAConfig),
}

impl MetaheuristicSweepConfig {
    fn runs(&self) -> Vec<SweepRun> {
        let mut runs = Vec::new();

        for run in 0..self.tabu_runs {
            runs.push(SweepRun {
                label: "TS".to_string(),
                parameter: "default".to_string(),
                run,
                kind: SweepKind::Tabu(TabuConfig {
                    time_limit: self.time_limit,
                    seed: self.seed + run as u64,
                    ..Default::default()
                }),
            });
        }

        for (run, &cooling_rate) in self.cooling_rates.iter().enumerate() {
            runs.push(SweepRun {
                label: "SA".to_string(),
                parameter: cooling_rate.to_string(),
                run,
                kind: SweepKind::Annealing(AnnealingConfig {
                    cooling_rate,
                    time_limit: self.time_limit,
                    seed: self.seed + run as u64,
                    ..Default::default()
                }),
            });
        }

        let base = GAConfig {
            time_limit: self.time_limit,
            seed: self.seed,
            ..Default::default()
        };
        let mut genetic = |parameter: String, run: usize, config: GAConfig| {
            runs.push(SweepRun {
                label: format!("GA_{}_{}", config.crossover_type, config.mutation_type),
                parameter,
                run,
                kind: SweepKind::Genetic(config),
            });
        };

        for (run, &population_size) in self.population_sizes.iter().enumerate() {
            for (crossover_type, mutation_type) in OPERATOR_COMBINATIONS {
                genetic(
                    format!("population={}", population_size),
                    run,
                    GAConfig {
                        population_size,
                        crossover_type,
                        mutation_type,
                        ..base.clone()
                    },
                );
            }
        }
        for (run, &mutation_rate) in self.mutation_rates.iter().enumerate() {
            genetic(
                format!("mutation={}", mutation_rate),
                run,
                GAConfig {
                    mutation_rate,
                    ..base.clone()
                },
            );
        }
        for (run, &crossover_rate) in self.crossover_rates.iter().enumerate() {
            genetic(
                format!("crossover={}", crossover_rate),
                run,
                GAConfig {
                    crossover_rate,
                    ..base.clone()
                },
            );
        }

        runs
    }

    /// Run every configured metaheuristic on `matrix`, writing one convergence
    /// file per run and `metaheuristic_sweep.csv`.
    pub fn run(&self, matrix: &CostMatrix) -> Result<Vec<SweepRecord>> {
        fs::create_dir_all(&self.output_dir)?;
        let runs = self.runs();
        let bar = progress_bar(runs.len() as u64, self.show_progress, "metaheuristics");
        let mut records = Vec::with_capacity(runs.len());

        for sweep in runs {
            let solution = match sweep.kind {
                SweepKind::Tabu(config) => TabuSearch::new(config).solve(matrix),
                SweepKind::Annealing(config) => SimulatedAnnealing::new(config).solve(matrix),
                SweepKind::Genetic(config) => GeneticAlgorithm::new(config).solve(matrix),
            };

            let file_name = format!(
                "{}_{}_{}.txt",
                sweep.label,
                sweep.parameter.replace(|c: char| !c.is_ascii_alphanumeric() && c != '.', "_"),
                sweep.run
            );
            write_convergence(
                self.output_dir.join(&file_name),
                &sweep.label,
                matrix.size(),
                &solution.convergence,
            )?;

            log::info!("{} [{}] run {}: cost {}", sweep.label, sweep.parameter, sweep.run, solution.cost);
            records.push(SweepRecord {
                algorithm: sweep.label,
                parameter: sweep.parameter,
                run: sweep.run,
                cost: solution.cost,
                feasible: solution.feasible,
                time: solution.computation_time,
                iterations: solution.iterations,
                convergence_file: file_name,
            });
            bar.inc(1);
        }
        bar.finish_and_clear();

        write_csv(&self.output_dir.join("metaheuristic_sweep.csv"), &records)?;
        Ok(records)
    }
}

/// Price of one saved tour file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourEvaluation {
    pub file: String,
    /// `None` when the tour is unreadable, invalid for this matrix, or uses an absent edge
    pub cost: Option<i64>,
}

/// Price every `.txt` tour file in `dir` on `matrix`, writing `file: cost`
/// lines to `output`. Files are visited in name order.
pub fn evaluate_tour_files<P: AsRef<Path>, Q: AsRef<Path>>(
    dir: P,
    matrix: &CostMatrix,
    output: Q,
) -> Result<Vec<TourEvaluation>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |e| e == "txt"))
        .collect();
    paths.sort();

    let mut results = Vec::with_capacity(paths.len());
    let mut out = String::new();
    for path in paths {
        let file = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();

        let cost = match Solution::load_tour(&path) {
            Ok(tour) if tour.len() == matrix.size() => matrix.tour_cost(&tour),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Skipping {}: {}", file, e);
                None
            }
        };

        match cost {
            Some(c) => out.push_str(&format!("{}: {}\n", file, c)),
            None => out.push_str(&format!("{}: invalid\n", file)),
        }
        results.push(TourEvaluation { file, cost });
    }

    fs::write(output, out)?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("atsp_{}_{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_summarise_times() {
        let (mean, std_dev, min, max) = summarise_times(&[1.0, 2.0, 3.0]);
        assert!((mean - 2.0).abs() < 1e-12);
        assert!((std_dev - 1.0).abs() < 1e-12);
        assert_eq!((min, max), (1.0, 3.0));
        assert_eq!(summarise_times(&[4.0]).1, 0.0);
    }

    #[test]
    fn test_exact_timings_csv() {
        let dir = temp_dir("timings");
        let config = ExactTimingConfig {
            plan: vec![
                (ExactAlgorithm::BruteForce, vec![4, 5]),
                (ExactAlgorithm::DynamicProgramming, vec![5]),
                (ExactAlgorithm::BranchAndBound, vec![5]),
            ],
            repetitions: 3,
            output_dir: dir.clone(),
            show_progress: false,
            ..Default::default()
        };

        let records = time_exact_algorithms(&config).unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.repetitions == 3));
        // same seeds for every algorithm at n = 5
        assert_eq!(records[1].mean_cost, records[2].mean_cost);
        assert_eq!(records[2].mean_cost, records[3].mean_cost);

        let text = fs::read_to_string(dir.join("exact_timings.csv")).unwrap();
        assert!(text.starts_with("algorithm,size,repetitions,mean_time"));
        assert_eq!(text.lines().count(), 5);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_max_size_probe_respects_cap() {
        let probe = MaxSizeProbe {
            algorithm: ExactAlgorithm::BranchAndBound,
            budget: Duration::from_secs(60),
            start_size: 4,
            max_size: 7,
            seed: 1,
        };
        let report = probe.run().unwrap();
        assert_eq!(report.largest_size, Some(7));
    }

    #[test]
    fn test_max_size_probe_stops_at_deadline() {
        let probe = MaxSizeProbe {
            algorithm: ExactAlgorithm::BranchAndBound,
            budget: Duration::ZERO,
            start_size: 4,
            max_size: 40,
            seed: 1,
        };
        let started = Instant::now();
        let report = probe.run().unwrap();
        assert_eq!(report.largest_size, None);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_metaheuristic_sweep() {
        let dir = temp_dir("sweep");
        let matrix = CostMatrix::random(8, 4).unwrap();
        let config = MetaheuristicSweepConfig {
            time_limit: Duration::from_millis(30),
            tabu_runs: 1,
            cooling_rates: vec![0.99],
            population_sizes: vec![20],
            mutation_rates: vec![0.1],
            crossover_rates: vec![0.9],
            output_dir: dir.clone(),
            show_progress: false,
            ..Default::default()
        };

        let records = config.run(&matrix).unwrap();
        assert_eq!(records.len(), 1 + 1 + 4 + 1 + 1);
        assert!(records.iter().all(|r| r.feasible));

        let trace = fs::read_to_string(dir.join(&records[0].convergence_file)).unwrap();
        let mut lines = trace.lines();
        assert_eq!(lines.next(), Some("TS"));
        assert_eq!(lines.next(), Some("8"));
        assert!(lines.next().unwrap().starts_with("0.000; "));
        assert!(dir.join("metaheuristic_sweep.csv").exists());

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_evaluate_tour_files() {
        let dir = temp_dir("evaluate");
        let matrix = CostMatrix::from_rows(vec![
            vec![-1, 10, 15, 20],
            vec![5, -1, 9, 10],
            vec![6, 13, -1, 12],
            vec![8, 8, 9, -1],
        ])
        .unwrap();

        Solution::from_tour(&matrix, vec![0, 1, 3, 2], "a")
            .write_tour(dir.join("a.txt"))
            .unwrap();
        fs::write(dir.join("b.txt"), "4\n0\n1\n1\n2\n0\n").unwrap();
        let output = dir.join("results.out");

        let results = evaluate_tour_files(&dir, &matrix, &output).unwrap();
        assert_eq!(
            results,
            vec![
                TourEvaluation { file: "a.txt".to_string(), cost: Some(35) },
                TourEvaluation { file: "b.txt".to_string(), cost: None },
            ]
        );
        assert_eq!(fs::read_to_string(output).unwrap(), "a.txt: 35\nb.txt: invalid\n");

        fs::remove_dir_all(dir).ok();
    }
}
