//! `evolve` CLI: run the genetic algorithm and persist the best genomes.

use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

use deckforge::evolution::records::{load_records, GenomeRecord, RunRecorder};
use deckforge::evolution::{EvolutionConfig, EvolutionEngine, FitnessStyle};
use deckforge::logging::setup_logging;

#[derive(Parser, Debug)]
#[command(
    name = "deckforge",
    about = "Evolve novel playable card-game rulesets with a genetic algorithm"
)]
struct Args {
    /// Population size
    #[arg(short = 'p', long, default_value_t = 100)]
    population: usize,

    /// Number of generations
    #[arg(short = 'g', long, default_value_t = 50)]
    generations: u32,

    /// Fitness style preset (balanced, bluffing, strategic, party, trick-taking)
    #[arg(long, default_value = "balanced")]
    style: String,

    /// Fraction of the population preserved verbatim each generation
    #[arg(long, default_value_t = 0.1)]
    elitism: f64,

    /// Crossover probability
    #[arg(long, default_value_t = 0.7)]
    crossover: f64,

    /// Tournament size for selection
    #[arg(long, default_value_t = 3)]
    tournament: usize,

    /// Stop after this many generations without improvement (0 = disabled)
    #[arg(long, default_value_t = 0)]
    plateau: u32,

    /// Fraction of the population seeded from known games
    #[arg(long, default_value_t = 0.3)]
    seed_ratio: f64,

    /// Simulated games per fitness evaluation
    #[arg(long, default_value_t = 100)]
    simulations: u32,

    /// Restrict evolution to games with this player count
    #[arg(long)]
    players: Option<u8>,

    /// Random seed for the whole run
    #[arg(short = 's', long, default_value_t = 42)]
    seed: u64,

    /// Output directory for run artifacts
    #[arg(short = 'o', long, default_value = "runs")]
    output: PathBuf,

    /// Seed the population from genome records in this directory
    #[arg(long)]
    seed_from: Option<PathBuf>,

    /// Seed the population from all previous runs in the output directory
    #[arg(long, default_value_t = false)]
    auto_seed: bool,

    /// Run skill evaluation every N generations (0 = disabled)
    #[arg(long, default_value_t = 10)]
    skill_eval_every: u32,

    /// Games per skill-evaluation tier
    #[arg(long, default_value_t = 10)]
    skill_eval_games: u32,

    /// MCTS iterations per move during skill evaluation
    #[arg(long, default_value_t = 100)]
    mcts_iterations: u32,

    /// Number of top genomes to persist
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Worker thread override (default: min(cores, 64), or DECKFORGE_WORKERS)
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    setup_logging()?;
    let args = Args::parse();

    let style = FitnessStyle::from_str(&args.style)?;
    let workers = args.workers.or_else(|| {
        std::env::var("DECKFORGE_WORKERS")
            .ok()
            .and_then(|raw| raw.parse().ok())
    });

    let seed_dir = args
        .seed_from
        .clone()
        .or_else(|| args.auto_seed.then(|| args.output.clone()));
    let seed_genomes = match &seed_dir {
        Some(dir) => {
            let records = load_records(dir);
            log::info!("loaded {} genome records from {}", records.len(), dir.display());
            records.into_iter().map(|r| r.genome).collect()
        }
        None => Vec::new(),
    };

    let config = EvolutionConfig {
        population_size: args.population,
        max_generations: args.generations,
        elitism_rate: args.elitism,
        crossover_rate: args.crossover,
        tournament_size: args.tournament,
        plateau_threshold: (args.plateau > 0).then_some(args.plateau),
        seed_ratio: args.seed_ratio,
        random_seed: args.seed,
        fitness_style: style,
        player_count: args.players,
        num_simulations: args.simulations,
        seed_genomes,
        skill_eval_frequency: args.skill_eval_every,
        skill_eval_games: args.skill_eval_games,
        skill_eval_mcts_iterations: args.mcts_iterations,
        workers,
        ..EvolutionConfig::default()
    };

    log::info!(
        "evolving {} genomes for {} generations (style {}, seed {})",
        config.population_size,
        config.max_generations,
        config.fitness_style,
        config.random_seed
    );

    let mut engine = EvolutionEngine::new(config);
    engine.evolve()?;

    let recorder = RunRecorder::create(&args.output)?;
    let best = engine.best_genomes(args.top);
    let records: Vec<GenomeRecord> = best
        .iter()
        .map(|individual| {
            let skill = engine.skill_result(&individual.genome.id).cloned();
            GenomeRecord::from_individual(individual, skill)
        })
        .collect();
    recorder.save_top(&records)?;
    recorder.save_stats(&engine.stats_history)?;

    log::info!(
        "saved {} genomes to {}",
        records.len(),
        recorder.run_dir.display()
    );
    Ok(())
}
