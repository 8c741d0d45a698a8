//! ATSP Solver - Command Line Interface
//!
//! Exact and metaheuristic solvers for the Asymmetric Traveling Salesman Problem.

use atsp_solver::benchmark::{
    evaluate_tour_files, time_exact_algorithms, ExactAlgorithm, ExactTimingConfig, MaxSizeProbe,
    MetaheuristicSweepConfig,
};
use atsp_solver::error::{AtspError, Result};
use atsp_solver::exact::{BranchAndBound, BranchAndBoundConfig, BruteForce, HeldKarp};
use atsp_solver::heuristics::construction::*;
use atsp_solver::heuristics::genetic::{CrossoverType, GAConfig, GeneticAlgorithm, MutationType};
use atsp_solver::heuristics::local_search::*;
use atsp_solver::matrix::CostMatrix;
use atsp_solver::solution::Solution;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "atsp-solver")]
#[command(version = "1.0")]
#[command(about = "Exact and metaheuristic solvers for the Asymmetric TSP")]
struct Cli {
    /// Debug-level logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a matrix loaded from a file or generated at random
    Solve {
        /// Matrix file (plain text or TSPLIB ATSP)
        #[arg(short, long, required_unless_present = "random", conflicts_with = "random")]
        matrix: Option<PathBuf>,

        /// Generate a random matrix with this many cities
        #[arg(short, long)]
        random: Option<usize>,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "bnb")]
        algorithm: Algorithm,

        /// Time limit in seconds (metaheuristics; optional for branch and bound)
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Cooling rate for simulated annealing
        #[arg(long, default_value = "0.999")]
        cooling_rate: f64,

        /// Tabu tenure
        #[arg(long, default_value = "100")]
        tenure: usize,

        /// GA population size
        #[arg(long, default_value = "500")]
        population: usize,

        /// GA crossover operator
        #[arg(long, value_enum, default_value = "ox")]
        crossover: Crossover,

        /// GA mutation operator
        #[arg(long, value_enum, default_value = "swap")]
        mutation: Mutation,

        /// GA mutation probability
        #[arg(long, default_value = "0.01")]
        mutation_rate: f64,

        /// GA crossover probability
        #[arg(long, default_value = "0.8")]
        crossover_rate: f64,

        /// Write the solution as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save a timestamped tour file into this directory
        #[arg(long)]
        save_tour: Option<PathBuf>,
    },

    /// Generate a random matrix file
    Generate {
        /// Number of cities
        #[arg(short = 'n', long)]
        size: usize,

        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Destination file (plain text format)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print a matrix and its statistics
    Show {
        #[arg(short, long)]
        matrix: PathBuf,
    },

    /// Batch experiments writing CSV and convergence files
    Research {
        #[arg(value_enum)]
        mode: ResearchMode,

        /// Matrix for the metaheuristic sweeps
        #[arg(short, long)]
        matrix: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "research")]
        output: PathBuf,

        /// Random instances per size in the exact sweep
        #[arg(long, default_value = "50")]
        repetitions: usize,

        /// Per-run time limit in seconds for the metaheuristic sweeps
        #[arg(short, long, default_value = "60")]
        time_limit: f64,

        /// Time budget in seconds for the max-size probe
        #[arg(long, default_value = "120")]
        budget: f64,

        /// Algorithm for the max-size probe
        #[arg(long, value_enum, default_value = "bnb")]
        algorithm: ExactChoice,

        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Hide progress bars
        #[arg(long)]
        quiet: bool,
    },

    /// Price every saved tour file of a directory on a matrix
    Evaluate {
        #[arg(short, long)]
        matrix: PathBuf,

        /// Directory holding tour files
        #[arg(short, long, default_value = "solutions")]
        dir: PathBuf,

        /// Result file with `file: cost` lines
        #[arg(short, long, default_value = "results.txt")]
        output: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Branch and bound (exact)
    Bnb,
    /// Held-Karp dynamic programming (exact)
    Dp,
    /// Brute force (exact)
    BruteForce,
    /// Nearest neighbour from city 0
    Nn,
    /// Best nearest-neighbour tour over all start cities
    Greedy,
    /// Tabu search
    Tabu,
    /// Simulated annealing
    Sa,
    /// Genetic algorithm
    Ga,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum ExactChoice {
    Bnb,
    Dp,
    BruteForce,
}

impl From<ExactChoice> for ExactAlgorithm {
    fn from(choice: ExactChoice) -> Self {
        match choice {
            ExactChoice::Bnb => ExactAlgorithm::BranchAndBound,
            ExactChoice::Dp => ExactAlgorithm::DynamicProgramming,
            ExactChoice::BruteForce => ExactAlgorithm::BruteForce,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Crossover {
    Ox,
    Pmx,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Mutation {
    Swap,
    Inversion,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum ResearchMode {
    /// Timing sweep of the exact algorithms on random matrices
    Exact,
    /// Largest size one exact solve handles within the budget
    MaxSize,
    /// Tabu, annealing and GA parameter sweeps on one matrix
    Metaheuristics,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Solve {
            matrix,
            random,
            algorithm,
            time_limit,
            seed,
            cooling_rate,
            tenure,
            population,
            crossover,
            mutation,
            mutation_rate,
            crossover_rate,
            output,
            save_tour,
        } => {
            let matrix = match (matrix, random) {
                (Some(path), _) => CostMatrix::from_file(path)?,
                (None, Some(size)) => CostMatrix::random(size, seed)?,
                (None, None) => {
                    return Err(AtspError::InvalidArgument("pass --matrix or --random".to_string()))
                }
            };
            let options = SolveOptions {
                time_limit: time_limit.map(seconds).transpose()?,
                seed,
                cooling_rate,
                tenure,
                population,
                crossover: match crossover {
                    Crossover::Ox => CrossoverType::OrderCrossover,
                    Crossover::Pmx => CrossoverType::PMX,
                },
                mutation: match mutation {
                    Mutation::Swap => MutationType::Swap,
                    Mutation::Inversion => MutationType::Inversion,
                },
                mutation_rate,
                crossover_rate,
            };
            solve_matrix(&matrix, algorithm, &options, output, save_tour)
        }

        Commands::Generate { size, seed, output } => {
            let matrix = CostMatrix::random(size, seed)?;
            matrix.save(&output)?;
            println!("Random {}-city matrix saved to {:?}", size, output);
            Ok(())
        }

        Commands::Show { matrix } => {
            let matrix = CostMatrix::from_file(matrix)?;
            println!("{}", matrix);
            println!("{}", matrix.statistics());
            Ok(())
        }

        Commands::Research {
            mode,
            matrix,
            output,
            repetitions,
            time_limit,
            budget,
            algorithm,
            seed,
            quiet,
        } => match mode {
            ResearchMode::Exact => {
                let config = ExactTimingConfig {
                    repetitions,
                    seed,
                    output_dir: output.clone(),
                    show_progress: !quiet,
                    ..Default::default()
                };
                let records = time_exact_algorithms(&config)?;
                println!("{:<22} {:>5} {:>14} {:>14}", "Algorithm", "N", "Mean [s]", "Std [s]");
                for r in &records {
                    println!("{:<22} {:>5} {:>14.6} {:>14.6}", r.algorithm, r.size, r.mean_time, r.std_dev_time);
                }
                println!("Results written to {:?}", output.join("exact_timings.csv"));
                Ok(())
            }
            ResearchMode::MaxSize => {
                let probe = MaxSizeProbe {
                    algorithm: algorithm.into(),
                    budget: seconds(budget)?,
                    seed,
                    ..Default::default()
                };
                let report = probe.run()?;
                match (report.largest_size, report.time) {
                    (Some(size), Some(time)) => println!(
                        "{}: largest size within {}s is {} ({:.3}s)",
                        report.algorithm, budget, size, time
                    ),
                    _ => println!("{}: no size solved within {}s", report.algorithm, budget),
                }
                Ok(())
            }
            ResearchMode::Metaheuristics => {
                let path = matrix.ok_or_else(|| {
                    AtspError::InvalidArgument("metaheuristic research needs --matrix".to_string())
                })?;
                let matrix = CostMatrix::from_file(path)?;
                let config = MetaheuristicSweepConfig {
                    time_limit: seconds(time_limit)?,
                    seed,
                    output_dir: output.clone(),
                    show_progress: !quiet,
                    ..Default::default()
                };
                let records = config.run(&matrix)?;
                println!("{} runs written to {:?}", records.len(), output);
                Ok(())
            }
        },

        Commands::Evaluate { matrix, dir, output } => {
            let matrix = CostMatrix::from_file(matrix)?;
            let results = evaluate_tour_files(&dir, &matrix, &output)?;
            for r in &results {
                match r.cost {
                    Some(c) => println!("{}: {}", r.file, c),
                    None => println!("{}: invalid", r.file),
                }
            }
            println!("Results saved to {:?}", output);
            Ok(())
        }
    }
}

/// Parse a user-supplied number of seconds.
fn seconds(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| AtspError::InvalidArgument(format!("invalid duration {}s", value)))
}

struct SolveOptions {
    time_limit: Option<Duration>,
    seed: u64,
    cooling_rate: f64,
    tenure: usize,
    population: usize,
    crossover: CrossoverType,
    mutation: MutationType,
    mutation_rate: f64,
    crossover_rate: f64,
}

fn solve_matrix(
    matrix: &CostMatrix,
    algorithm: Algorithm,
    options: &SolveOptions,
    output: Option<PathBuf>,
    save_tour: Option<PathBuf>,
) -> Result<()> {
    println!("Solving {} ({} cities) with {:?}...", matrix.name, matrix.size(), algorithm);
    let metaheuristic_limit = options.time_limit.unwrap_or(Duration::from_secs(10));

    let solution = match algorithm {
        Algorithm::Bnb => {
            let config = BranchAndBoundConfig {
                time_limit: options.time_limit,
                ..Default::default()
            };
            let result = BranchAndBound::new(config).solve(matrix)?;
            println!(
                "Nodes: {} created, {} expanded, {} pruned, peak frontier {}",
                result.stats.nodes_created,
                result.stats.nodes_expanded,
                result.stats.pruned_at_pop + result.stats.pruned_at_creation,
                result.stats.peak_frontier
            );
            if !result.proven_optimal {
                println!("Time limit reached: best tour found so far, optimality not proven");
            }
            result.solution
        }
        Algorithm::Dp => HeldKarp::default().solve(matrix)?,
        Algorithm::BruteForce => BruteForce::default().solve(matrix)?,
        Algorithm::Nn => NearestNeighborHeuristic::new().construct(matrix),
        Algorithm::Greedy => BestGreedyHeuristic.construct(matrix),
        Algorithm::Tabu => TabuSearch::new(TabuConfig {
            tenure: options.tenure,
            time_limit: metaheuristic_limit,
            seed: options.seed,
            ..Default::default()
        })
        .solve(matrix),
        Algorithm::Sa => SimulatedAnnealing::new(AnnealingConfig {
            cooling_rate: options.cooling_rate,
            time_limit: metaheuristic_limit,
            seed: options.seed,
            ..Default::default()
        })
        .solve(matrix),
        Algorithm::Ga => GeneticAlgorithm::new(GAConfig {
            population_size: options.population,
            crossover_type: options.crossover,
            mutation_type: options.mutation,
            mutation_rate: options.mutation_rate,
            crossover_rate: options.crossover_rate,
            time_limit: metaheuristic_limit,
            seed: options.seed,
            ..Default::default()
        })
        .solve(matrix),
    };

    print_solution(&solution);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&solution)?;
        std::fs::write(&path, json)?;
        println!("\nSolution saved to {:?}", path);
    }
    if let Some(dir) = save_tour {
        let path = solution.save_tour(Path::new(&dir))?;
        println!("Tour saved to {:?}", path);
    }
    Ok(())
}

fn print_solution(solution: &Solution) {
    println!("\n========== Results ==========");
    print!("{}", solution);
    if !solution.feasible {
        println!("Warning: the tour uses at least one absent edge");
    }
}
