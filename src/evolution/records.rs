//! Persisted run artifacts: a UTC-timestamped run directory holding
//! per-genome JSON records, a `top5.md` digest, and a `generations.csv`
//! stats history.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::evolution::engine::GenerationStats;
use crate::evolution::fitness::FitnessMetrics;
use crate::evolution::population::Individual;
use crate::evolution::skill::SkillEvalResult;
use crate::genome::schema::SCHEMA_VERSION;
use crate::genome::Genome;

/// One saved genome: the full tree plus its evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeRecord {
    pub schema_version: String,
    pub id: String,
    pub generation: u32,
    pub genome: Genome,
    pub fitness: f64,
    pub metrics: Option<FitnessMetrics>,
    pub skill: Option<SkillEvalResult>,
}

impl GenomeRecord {
    pub fn from_individual(individual: &Individual, skill: Option<SkillEvalResult>) -> Self {
        GenomeRecord {
            schema_version: SCHEMA_VERSION.to_string(),
            id: individual.genome.id.clone(),
            generation: individual.genome.generation,
            genome: individual.genome.clone(),
            fitness: individual.fitness,
            metrics: individual.metrics.clone(),
            skill,
        }
    }
}

/// Writer for one run's artifacts.
pub struct RunRecorder {
    pub run_dir: PathBuf,
}

impl RunRecorder {
    /// Create `<out_dir>/<UTC timestamp>/`.
    pub fn create<P: AsRef<Path>>(out_dir: P) -> std::io::Result<Self> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let run_dir = out_dir.as_ref().join(stamp);
        fs::create_dir_all(&run_dir)?;
        Ok(RunRecorder { run_dir })
    }

    /// Reuse an existing directory (tests and resumed runs).
    pub fn at<P: AsRef<Path>>(run_dir: P) -> std::io::Result<Self> {
        fs::create_dir_all(run_dir.as_ref())?;
        Ok(RunRecorder {
            run_dir: run_dir.as_ref().to_path_buf(),
        })
    }

    /// Write one genome record as pretty JSON, named by its id.
    pub fn save_record(&self, record: &GenomeRecord) -> std::io::Result<PathBuf> {
        let path = self.run_dir.join(format!("{}.json", record.id));
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Write all top-N records plus the markdown digest.
    pub fn save_top(&self, records: &[GenomeRecord]) -> std::io::Result<()> {
        for record in records {
            self.save_record(record)?;
        }
        self.write_digest(records)
    }

    fn write_digest(&self, records: &[GenomeRecord]) -> std::io::Result<()> {
        let mut file = fs::File::create(self.run_dir.join("top5.md"))?;
        writeln!(file, "# Top evolved games")?;
        writeln!(file)?;
        for (i, record) in records.iter().take(5).enumerate() {
            writeln!(file, "## {}. {} (fitness {:.4})", i + 1, record.id, record.fitness)?;
            writeln!(file)?;
            let genome = &record.genome;
            writeln!(
                file,
                "- {} players, {} cards each, max {} turns",
                genome.player_count, genome.setup.cards_per_player, genome.max_turns
            )?;
            let phases: Vec<&str> = genome
                .turn_structure
                .phases
                .iter()
                .map(|p| p.name())
                .collect();
            writeln!(file, "- phases: {}", phases.join(" → "))?;
            let wins: Vec<String> = genome
                .win_conditions
                .iter()
                .map(|wc| format!("{:?}", wc.kind))
                .collect();
            writeln!(file, "- win conditions: {}", wins.join(", "))?;
            if let Some(metrics) = &record.metrics {
                writeln!(
                    file,
                    "- decisions {:.2}, comeback {:.2}, tension {:.2}, complexity {:.2}",
                    metrics.decision_density,
                    metrics.comeback_potential,
                    metrics.tension_curve,
                    metrics.rules_complexity
                )?;
            }
            if let Some(skill) = &record.skill {
                writeln!(
                    file,
                    "- skill: greedy {:.0}%, mcts {:.0}%, first-player advantage {:+.2}",
                    skill.greedy_win_rate * 100.0,
                    skill.mcts_win_rate * 100.0,
                    skill.first_player_advantage
                )?;
            }
            writeln!(file)?;
        }
        Ok(())
    }

    /// Append the full stats history as CSV.
    pub fn save_stats(&self, stats: &[GenerationStats]) -> Result<(), Box<dyn std::error::Error>> {
        let mut writer = csv::Writer::from_path(self.run_dir.join("generations.csv"))?;
        writer.write_record(["generation", "best_fitness", "avg_fitness", "diversity", "evaluations"])?;
        for row in stats {
            writer.write_record([
                row.generation.to_string(),
                format!("{:.6}", row.best_fitness),
                format!("{:.6}", row.avg_fitness),
                format!("{:.6}", row.diversity),
                row.evaluations.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Load every genome record found in a directory tree (one level deep),
/// ignoring files that fail to parse.
pub fn load_records<P: AsRef<Path>>(dir: P) -> Vec<GenomeRecord> {
    let mut records = Vec::new();
    let Ok(entries) = fs::read_dir(dir.as_ref()) else {
        return records;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            records.extend(load_records(&path));
        } else if path.extension().map_or(false, |ext| ext == "json") {
            if let Ok(raw) = fs::read_to_string(&path) {
                if let Ok(record) = serde_json::from_str::<GenomeRecord>(&raw) {
                    records.push(record);
                }
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::examples;
    use tempfile::tempdir;

    #[test]
    fn test_record_round_trips_through_json() {
        let individual = Individual::evaluated(examples::hearts(), 0.61, None);
        let record = GenomeRecord::from_individual(&individual, None);
        let json = serde_json::to_string(&record).unwrap();
        let parsed: GenomeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.genome, record.genome);
        assert_eq!(parsed.fitness, record.fitness);
    }

    #[test]
    fn test_save_and_load_records() {
        let dir = tempdir().unwrap();
        let recorder = RunRecorder::at(dir.path().join("run")).unwrap();
        let records: Vec<GenomeRecord> = examples::seed_genomes()
            .into_iter()
            .take(3)
            .map(|genome| {
                GenomeRecord::from_individual(&Individual::evaluated(genome, 0.5, None), None)
            })
            .collect();
        recorder.save_top(&records).unwrap();

        assert!(recorder.run_dir.join("top5.md").exists());
        let loaded = load_records(dir.path());
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn test_stats_csv_written() {
        let dir = tempdir().unwrap();
        let recorder = RunRecorder::at(dir.path()).unwrap();
        let stats = vec![GenerationStats {
            generation: 0,
            best_fitness: 0.5,
            avg_fitness: 0.3,
            diversity: 0.4,
            evaluations: 10,
        }];
        recorder.save_stats(&stats).unwrap();
        let raw = fs::read_to_string(recorder.run_dir.join("generations.csv")).unwrap();
        assert!(raw.starts_with("generation,"));
        assert!(raw.lines().count() >= 2);
    }
}
