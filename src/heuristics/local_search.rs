//! Improvement metaheuristics for the ATSP.
//!
//! Both methods work on swap moves over positions `1..n` (city 0 stays
//! first), run until a wall-clock limit or an iteration cap, and sample the
//! best cost at a fixed interval for convergence plots.

use crate::heuristics::construction::{BestGreedyHeuristic, ConstructionHeuristic};
use crate::matrix::CostMatrix;
use crate::solution::{ConvergencePoint, Solution};
use log::{debug, info};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};

pub trait LocalSearch {
    fn improve(&self, matrix: &CostMatrix, solution: &mut Solution) -> bool;
    fn name(&self) -> &str;

    /// Start from the best greedy tour and improve it.
    fn solve(&self, matrix: &CostMatrix) -> Solution {
        let mut solution = BestGreedyHeuristic.construct(matrix);
        self.improve(matrix, &mut solution);
        solution.algorithm = self.name().to_string();
        solution
    }
}

/// Records the best cost every `interval` seconds.
pub(crate) struct ConvergenceSampler {
    start: Instant,
    interval: f64,
    last: f64,
    points: Vec<ConvergencePoint>,
}

impl ConvergenceSampler {
    pub(crate) fn new(interval: Duration, initial_cost: i64) -> Self {
        ConvergenceSampler {
            start: Instant::now(),
            interval: interval.as_secs_f64(),
            last: 0.0,
            points: vec![ConvergencePoint { elapsed: 0.0, cost: initial_cost }],
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub(crate) fn sample(&mut self, best_cost: i64) {
        let now = self.start.elapsed().as_secs_f64();
        if now - self.last >= self.interval {
            self.last = now;
            self.points.push(ConvergencePoint { elapsed: now, cost: best_cost });
        }
    }

    pub(crate) fn finish(mut self, best_cost: i64) -> Vec<ConvergencePoint> {
        let now = self.start.elapsed().as_secs_f64();
        self.points.push(ConvergencePoint { elapsed: now, cost: best_cost });
        self.points
    }
}

fn out_of_budget(elapsed: Duration, time_limit: Duration, iteration: usize, cap: Option<usize>) -> bool {
    elapsed >= time_limit || cap.map_or(false, |cap| iteration >= cap)
}

// ==================== Tabu Search ====================

/// Tabu search configuration
#[derive(Debug, Clone)]
pub struct TabuConfig {
    /// Iterations a performed move stays tabu
    pub tenure: usize,
    /// Penalty added to the reverse of a non-improving move
    pub penalty_step: i64,
    /// Penalties shrink by one step every this many iterations
    pub penalty_decay_interval: usize,
    /// Random swaps evaluated per iteration, as a multiple of the city count
    pub random_moves_factor: usize,
    pub time_limit: Duration,
    pub max_iterations: Option<usize>,
    /// Convergence sampling period
    pub log_interval: Duration,
    pub seed: u64,
}

impl Default for TabuConfig {
    fn default() -> Self {
        TabuConfig {
            tenure: 100,
            penalty_step: 1,
            penalty_decay_interval: 5,
            random_moves_factor: 3,
            time_limit: Duration::from_secs(10),
            max_iterations: None,
            log_interval: Duration::from_millis(500),
            seed: 42,
        }
    }
}

/// Tabu Search
///
/// Swap neighbourhood with a tenure matrix over city pairs, long-term
/// penalties on reverse moves, and aspiration by the best known cost.
pub struct TabuSearch {
    pub config: TabuConfig,
}

impl TabuSearch {
    pub fn new(config: TabuConfig) -> Self {
        TabuSearch { config }
    }
}

impl Default for TabuSearch {
    fn default() -> Self {
        Self::new(TabuConfig::default())
    }
}

struct Candidate {
    i: usize,
    j: usize,
    new_cost: i64,
    gain: i64,
}

impl LocalSearch for TabuSearch {
    fn improve(&self, matrix: &CostMatrix, solution: &mut Solution) -> bool {
        let n = solution.tour.len();
        if n < 4 {
            return false;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut tabu = vec![0usize; n * n];
        let mut penalty = vec![0i64; n * n];

        let initial_cost = solution.cost;
        let mut current = solution.clone();
        let mut best_tour = current.tour.clone();
        let mut best_cost = current.cost;
        let mut sampler = ConvergenceSampler::new(self.config.log_interval, best_cost);
        let mut iteration = 0;

        info!("Tabu search from cost {} ({} cities)", initial_cost, n);

        while !out_of_budget(sampler.elapsed(), self.config.time_limit, iteration, self.config.max_iterations) {
            let mut moves: Vec<(usize, usize)> = (1..n - 1)
                .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
                .collect();
            for _ in 0..self.config.random_moves_factor * n {
                let i = rng.gen_range(1..n);
                let j = rng.gen_range(1..n);
                if i != j {
                    moves.push((i.min(j), i.max(j)));
                }
            }

            let mut candidates: Vec<Candidate> = moves
                .into_iter()
                .map(|(i, j)| {
                    let new_cost = current.cost + current.swap_delta(matrix, i, j);
                    let (a, b) = (current.tour[i], current.tour[j]);
                    Candidate {
                        i,
                        j,
                        new_cost,
                        gain: current.cost - new_cost - penalty[b * n + a],
                    }
                })
                .collect();
            candidates.sort_by(|x, y| y.gain.cmp(&x.gain));

            let chosen = candidates
                .iter()
                .find(|c| {
                    let (a, b) = (current.tour[c.i], current.tour[c.j]);
                    tabu[a * n + b] == 0 || c.new_cost < best_cost
                })
                .or_else(|| candidates.first());

            let Some(mv) = chosen else {
                break;
            };
            let (a, b) = (current.tour[mv.i], current.tour[mv.j]);
            if mv.new_cost >= current.cost {
                penalty[b * n + a] += self.config.penalty_step;
            }
            current.apply_swap(mv.i, mv.j);
            current.cost = mv.new_cost;

            for t in tabu.iter_mut().filter(|t| **t > 0) {
                *t -= 1;
            }
            tabu[a * n + b] = self.config.tenure;
            tabu[b * n + a] = self.config.tenure;

            iteration += 1;
            if iteration % self.config.penalty_decay_interval.max(1) == 0 {
                for p in penalty.iter_mut() {
                    *p = (*p - self.config.penalty_step).max(0);
                }
            }

            if current.cost < best_cost {
                best_cost = current.cost;
                best_tour.clone_from(&current.tour);
                debug!("Tabu iteration {}: new best {}", iteration, best_cost);
            }
            sampler.sample(best_cost);
        }

        solution.tour = best_tour;
        solution.evaluate(matrix);
        solution.iterations = Some(iteration);
        solution.computation_time = sampler.elapsed().as_secs_f64();
        solution.convergence = sampler.finish(best_cost);

        info!("Tabu search finished: cost {} after {} iterations", solution.cost, iteration);
        solution.cost < initial_cost
    }

    fn name(&self) -> &str {
        "TabuSearch"
    }
}

// ==================== Simulated Annealing ====================

/// Simulated annealing configuration
#[derive(Debug, Clone)]
pub struct AnnealingConfig {
    /// Temperature factor applied after every epoch
    pub cooling_rate: f64,
    /// Moves per epoch, as a multiple of the city count
    pub epoch_factor: usize,
    /// Scale applied to the computed initial temperature
    pub temperature_multiplier: f64,
    /// Probability of accepting an average uphill move at the start
    pub initial_acceptance: f64,
    pub time_limit: Duration,
    pub max_epochs: Option<usize>,
    pub log_interval: Duration,
    pub seed: u64,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            cooling_rate: 0.999,
            epoch_factor: 10,
            temperature_multiplier: 10.0,
            initial_acceptance: 0.8,
            time_limit: Duration::from_secs(10),
            max_epochs: None,
            log_interval: Duration::from_millis(500),
            seed: 42,
        }
    }
}

/// Simulated Annealing
pub struct SimulatedAnnealing {
    pub config: AnnealingConfig,
}

impl SimulatedAnnealing {
    pub fn new(config: AnnealingConfig) -> Self {
        SimulatedAnnealing { config }
    }

    /// `T0 = -avg|c(a,b) - c(b,a)| / ln(p0) * multiplier`, falling back to an
    /// average difference of 1 on symmetric matrices.
    pub fn initial_temperature(&self, matrix: &CostMatrix) -> f64 {
        let avg = matrix.statistics().avg_asymmetry;
        let avg = if avg > 0.0 { avg } else { 1.0 };
        let p0 = self.config.initial_acceptance.clamp(1e-6, 1.0 - 1e-6);
        -avg / p0.ln() * self.config.temperature_multiplier
    }
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self::new(AnnealingConfig::default())
    }
}

impl LocalSearch for SimulatedAnnealing {
    fn improve(&self, matrix: &CostMatrix, solution: &mut Solution) -> bool {
        let n = solution.tour.len();
        if n < 4 {
            return false;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let initial_cost = solution.cost;
        let mut current = solution.clone();
        let mut best_tour = current.tour.clone();
        let mut best_cost = current.cost;
        let mut sampler = ConvergenceSampler::new(self.config.log_interval, best_cost);

        let mut temp = self.initial_temperature(matrix);
        let moves_per_epoch = (self.config.epoch_factor * n).max(1);
        let mut epoch = 0;

        info!("Simulated annealing from cost {} at T0 = {:.3}", initial_cost, temp);

        while !out_of_budget(sampler.elapsed(), self.config.time_limit, epoch, self.config.max_epochs) {
            for _ in 0..moves_per_epoch {
                let i = rng.gen_range(1..n);
                let j = rng.gen_range(1..n);
                if i == j {
                    continue;
                }

                let delta = current.swap_delta(matrix, i, j);
                let accept = delta < 0 || rng.gen::<f64>() < 1.0 / (1.0 + (delta as f64 / temp).exp());
                if accept {
                    current.apply_swap(i, j);
                    current.cost += delta;
                    if current.cost < best_cost {
                        best_cost = current.cost;
                        best_tour.clone_from(&current.tour);
                    }
                }
            }

            temp *= self.config.cooling_rate;
            epoch += 1;
            sampler.sample(best_cost);
        }

        debug!("Annealing stopped at T = {:.5} after {} epochs", temp, epoch);

        solution.tour = best_tour;
        solution.evaluate(matrix);
        solution.iterations = Some(epoch);
        solution.computation_time = sampler.elapsed().as_secs_f64();
        solution.convergence = sampler.finish(best_cost);

        info!("Simulated annealing finished: cost {}", solution.cost);
        solution.cost < initial_cost
    }

    fn name(&self) -> &str {
        "SimulatedAnnealing"
    }
}
