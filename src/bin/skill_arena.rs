//! Skill arena: AI-vs-AI matches over a saved genome record.
//!
//! Runs Greedy-vs-Random and MCTS-vs-Random in both seat orders on the same
//! seeds, prints the skill report, and optionally appends a CSV row for
//! comparison across genomes.

use clap::Parser;
use std::path::PathBuf;

use deckforge::evolution::records::load_records;
use deckforge::evolution::skill::{evaluate_skill, SkillEvalConfig};
use deckforge::logging::setup_logging;

#[derive(Parser, Debug)]
#[command(
    name = "skill-arena",
    about = "Measure the skill gap of saved genomes with head-to-head AI matches"
)]
struct Args {
    /// Directory of genome records (or a run directory)
    #[arg(short = 'd', long, default_value = "runs")]
    records: PathBuf,

    /// Only evaluate the genome with this id
    #[arg(long)]
    id: Option<String>,

    /// Games per tier (split between seat orders)
    #[arg(short = 'g', long, default_value_t = 50)]
    games: u32,

    /// MCTS iterations per move
    #[arg(long, default_value_t = 200)]
    iterations: u32,

    /// Per-genome timeout in seconds
    #[arg(long, default_value_t = 60.0)]
    timeout: f64,

    /// Random seed
    #[arg(short = 's', long, default_value_t = 42)]
    seed: u64,

    /// Output CSV file for results
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    setup_logging()?;
    let args = Args::parse();

    let mut records = load_records(&args.records);
    if let Some(id) = &args.id {
        records.retain(|r| &r.id == id);
    }
    if records.is_empty() {
        return Err(format!("no genome records under {}", args.records.display()).into());
    }
    log::info!("evaluating {} genomes, {} games per tier", records.len(), args.games);

    let config = SkillEvalConfig {
        num_games: args.games,
        mcts_iterations: args.iterations,
        timeout_secs: args.timeout,
        base_seed: args.seed,
    };

    let mut writer = match &args.output {
        Some(path) => Some(csv::Writer::from_path(path)?),
        None => None,
    };
    if let Some(w) = writer.as_mut() {
        w.write_record([
            "genome_id",
            "greedy_win_rate",
            "mcts_win_rate",
            "skill_score",
            "first_player_advantage",
            "timed_out",
        ])?;
    }

    for record in &records {
        let result = evaluate_skill(&record.genome, &config);
        log::info!(
            "{}: greedy {:.0}%, mcts {:.0}%, skill {:.2}, FPA {:+.2}{}",
            result.genome_id,
            result.greedy_win_rate * 100.0,
            result.mcts_win_rate * 100.0,
            result.skill_score,
            result.first_player_advantage,
            if result.timed_out { " (timed out)" } else { "" }
        );
        if let Some(w) = writer.as_mut() {
            w.write_record([
                result.genome_id.clone(),
                format!("{:.4}", result.greedy_win_rate),
                format!("{:.4}", result.mcts_win_rate),
                format!("{:.4}", result.skill_score),
                format!("{:+.4}", result.first_player_advantage),
                result.timed_out.to_string(),
            ])?;
        }
    }
    if let Some(w) = writer.as_mut() {
        w.flush()?;
    }
    Ok(())
}
