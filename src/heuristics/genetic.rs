//! Genetic Algorithm for the ATSP.
//!
//! Permutation encoding with city 0 fixed at position 0, tournament
//! selection, elitism, OX or PMX crossover and swap or inversion mutation.

use crate::heuristics::construction::{random_tour, BestGreedyHeuristic, ConstructionHeuristic};
use crate::heuristics::local_search::ConvergenceSampler;
use crate::matrix::CostMatrix;
use crate::solution::Solution;
use log::{debug, info};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Individual in the genetic algorithm population
#[derive(Debug, Clone)]
pub struct Individual {
    pub tour: Vec<usize>,
    /// Penalized tour cost, lower is better
    pub cost: i64,
}

impl Individual {
    pub fn new(tour: Vec<usize>, matrix: &CostMatrix) -> Self {
        let cost = matrix.penalized_tour_cost(&tour);
        Individual { tour, cost }
    }
}

/// Crossover operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverType {
    /// Order Crossover (OX)
    OrderCrossover,
    /// Partially Mapped Crossover (PMX)
    PMX,
}

/// Mutation operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    /// Swap two random cities
    Swap,
    /// Reverse a random segment
    Inversion,
}

impl std::fmt::Display for CrossoverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrossoverType::OrderCrossover => write!(f, "OX"),
            CrossoverType::PMX => write!(f, "PMX"),
        }
    }
}

impl std::fmt::Display for MutationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationType::Swap => write!(f, "SWAP"),
            MutationType::Inversion => write!(f, "INVERSION"),
        }
    }
}

/// Genetic Algorithm configuration
#[derive(Debug, Clone)]
pub struct GAConfig {
    /// Population size
    pub population_size: usize,
    /// Generation cap (unbounded by default, the time limit applies)
    pub max_generations: Option<usize>,
    /// Crossover probability
    pub crossover_rate: f64,
    /// Mutation probability per offspring
    pub mutation_rate: f64,
    /// Elite count (best individuals preserved)
    pub elite_count: usize,
    /// Tournament size for selection
    pub tournament_size: usize,
    /// Crossover operator
    pub crossover_type: CrossoverType,
    /// Mutation operator
    pub mutation_type: MutationType,
    /// Random seed
    pub seed: u64,
    pub time_limit: Duration,
    pub log_interval: Duration,
}

impl Default for GAConfig {
    fn default() -> Self {
        GAConfig {
            population_size: 500,
            max_generations: None,
            crossover_rate: 0.8,
            mutation_rate: 0.01,
            elite_count: 2,
            tournament_size: 3,
            crossover_type: CrossoverType::OrderCrossover,
            mutation_type: MutationType::Swap,
            seed: 42,
            time_limit: Duration::from_secs(10),
            log_interval: Duration::from_millis(500),
        }
    }
}

/// Genetic Algorithm implementation
pub struct GeneticAlgorithm {
    config: GAConfig,
    rng: ChaCha8Rng,
}

impl GeneticAlgorithm {
    pub fn new(config: GAConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        GeneticAlgorithm { config, rng }
    }

    pub fn name(&self) -> String {
        format!("GA-{}-{}", self.config.crossover_type, self.config.mutation_type)
    }

    /// Best greedy tour plus random permutations.
    fn initialize_population(&mut self, matrix: &CostMatrix) -> Vec<Individual> {
        let size = self.config.population_size.max(2);
        let mut population = Vec::with_capacity(size);
        population.push(Individual::new(BestGreedyHeuristic.construct(matrix).tour, matrix));

        while population.len() < size {
            let tour = random_tour(matrix.size(), &mut self.rng);
            population.push(Individual::new(tour, matrix));
        }

        population.sort_by_key(|ind| ind.cost);
        population
    }

    /// Tournament selection
    fn tournament_select<'a>(&mut self, population: &'a [Individual]) -> &'a Individual {
        let mut best_idx = self.rng.gen_range(0..population.len());

        for _ in 1..self.config.tournament_size {
            let idx = self.rng.gen_range(0..population.len());
            if population[idx].cost < population[best_idx].cost {
                best_idx = idx;
            }
        }

        &population[best_idx]
    }

    /// Two cut points `1 <= start < end < n`.
    fn cut_points(&mut self, n: usize) -> (usize, usize) {
        let start = self.rng.gen_range(1..n - 1);
        let end = self.rng.gen_range(start + 1..n);
        (start, end)
    }

    /// Order Crossover (OX)
    fn order_crossover(&mut self, parent1: &[usize], parent2: &[usize]) -> Vec<usize> {
        let n = parent1.len();
        if n < 4 {
            return parent1.to_vec();
        }

        let (start, end) = self.cut_points(n);
        let mut in_segment = vec![false; n];
        for &city in &parent1[start..=end] {
            in_segment[city] = true;
        }

        let mut fill = parent2
            .iter()
            .skip(1)
            .copied()
            .filter(|&c| !in_segment[c]);

        let mut child = Vec::with_capacity(n);
        child.push(0);
        for i in 1..n {
            if (start..=end).contains(&i) {
                child.push(parent1[i]);
            } else if let Some(city) = fill.next() {
                child.push(city);
            }
        }
        child
    }

    /// Partially Mapped Crossover (PMX)
    fn pmx_crossover(&mut self, parent1: &[usize], parent2: &[usize]) -> Vec<usize> {
        let n = parent1.len();
        if n < 4 {
            return parent1.to_vec();
        }

        let (start, end) = self.cut_points(n);
        let mut pos_in_p1 = vec![0; n];
        for (pos, &city) in parent1.iter().enumerate() {
            pos_in_p1[city] = pos;
        }
        let mut in_segment = vec![false; n];
        for &city in &parent1[start..=end] {
            in_segment[city] = true;
        }

        let mut child = parent2.to_vec();
        child[start..=end].copy_from_slice(&parent1[start..=end]);
        for i in (1..start).chain(end + 1..n) {
            let mut city = parent2[i];
            while in_segment[city] {
                city = parent2[pos_in_p1[city]];
            }
            child[i] = city;
        }
        child
    }

    fn mutate(&mut self, tour: &mut [usize]) {
        let n = tour.len();
        if n < 3 {
            return;
        }
        let i = self.rng.gen_range(1..n);
        let j = self.rng.gen_range(1..n);
        match self.config.mutation_type {
            MutationType::Swap => tour.swap(i, j),
            MutationType::Inversion => tour[i.min(j)..=i.max(j)].reverse(),
        }
    }

    /// Run the GA
    pub fn solve(&mut self, matrix: &CostMatrix) -> Solution {
        let n = matrix.size();
        let mut population = self.initialize_population(matrix);
        let mut best = population[0].clone();
        let mut sampler = ConvergenceSampler::new(self.config.log_interval, best.cost);
        let mut generation = 0;

        info!(
            "{} with population {} on {} cities",
            self.name(),
            population.len(),
            n
        );

        while sampler.elapsed() < self.config.time_limit
            && self.config.max_generations.map_or(true, |cap| generation < cap)
        {
            let elite = self.config.elite_count.min(population.len());
            let mut next: Vec<Individual> = population[..elite].to_vec();

            while next.len() < population.len() {
                let p1 = self.tournament_select(&population).tour.clone();
                let p2 = self.tournament_select(&population).tour.clone();

                let mut child = if self.rng.gen::<f64>() < self.config.crossover_rate {
                    match self.config.crossover_type {
                        CrossoverType::OrderCrossover => self.order_crossover(&p1, &p2),
                        CrossoverType::PMX => self.pmx_crossover(&p1, &p2),
                    }
                } else {
                    p1
                };
                if self.rng.gen::<f64>() < self.config.mutation_rate {
                    self.mutate(&mut child);
                }
                next.push(Individual::new(child, matrix));
            }

            next.sort_by_key(|ind| ind.cost);
            population = next;
            generation += 1;

            if population[0].cost < best.cost {
                best = population[0].clone();
                debug!("Generation {}: new best {}", generation, best.cost);
            }
            sampler.sample(best.cost);
        }

        let mut solution = Solution::from_tour(matrix, best.tour, &self.name());
        solution.iterations = Some(generation);
        solution.computation_time = sampler.elapsed().as_secs_f64();
        solution.convergence = sampler.finish(best.cost);

        info!("{} finished: cost {} after {} generations", self.name(), solution.cost, generation);
        solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_permutation(tour: &[usize], n: usize) -> bool {
        let mut sorted = tour.to_vec();
        sorted.sort_unstable();
        tour[0] == 0 && sorted == (0..n).collect::<Vec<_>>()
    }

    #[test]
    fn test_crossovers_produce_permutations() {
        let mut ga = GeneticAlgorithm::new(GAConfig::default());
        let p1: Vec<usize> = vec![0, 1, 2, 3, 4, 5, 6, 7];
        let p2: Vec<usize> = vec![0, 7, 5, 3, 1, 6, 4, 2];

        for _ in 0..50 {
            assert!(is_permutation(&ga.order_crossover(&p1, &p2), 8));
            assert!(is_permutation(&ga.pmx_crossover(&p1, &p2), 8));
        }
    }

    #[test]
    fn test_mutations_keep_start() {
        for mutation_type in [MutationType::Swap, MutationType::Inversion] {
            let mut ga = GeneticAlgorithm::new(GAConfig {
                mutation_type,
                ..Default::default()
            });
            let mut tour: Vec<usize> = (0..9).collect();
            for _ in 0..50 {
                ga.mutate(&mut tour);
                assert!(is_permutation(&tour, 9));
            }
        }
    }

    #[test]
    fn test_ga_solution() {
        let matrix = CostMatrix::random(12, 9).unwrap();
        let greedy = BestGreedyHeuristic.construct(&matrix);

        for crossover_type in [CrossoverType::OrderCrossover, CrossoverType::PMX] {
            let mut ga = GeneticAlgorithm::new(GAConfig {
                population_size: 40,
                max_generations: Some(30),
                mutation_rate: 0.2,
                crossover_type,
                ..Default::default()
            });
            let solution = ga.solve(&matrix);

            assert!(solution.is_complete(&matrix));
            assert!(solution.feasible);
            assert!(solution.cost <= greedy.cost);
            assert_eq!(solution.iterations, Some(30));
        }
    }

    #[test]
    fn test_ga_is_seeded() {
        let matrix = CostMatrix::random(10, 2).unwrap();
        let config = GAConfig {
            population_size: 30,
            max_generations: Some(20),
            ..Default::default()
        };
        let a = GeneticAlgorithm::new(config.clone()).solve(&matrix);
        let b = GeneticAlgorithm::new(config).solve(&matrix);
        assert_eq!(a.tour, b.tour);
    }
}
