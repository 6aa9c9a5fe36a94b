//! Attrition ML CLI Module
//!
//! Command-line interface for training, scoring and artifact inspection.
//! Progress goes to stderr; reports and predictions go to stdout.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifact::{ArtifactStore, RiskLevel};
use crate::config::PipelineConfig;
use crate::evaluation::Scoring;
use crate::pipeline::{score_employees, TrainingRun};
use crate::training::{describe, ModelFamily};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString   { s.truecolor(230, 190, 90) }

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    eprintln!("  {} {}", ok("✓"), msg);
}

fn step_warn(msg: &str) {
    eprintln!("  {} {}", warn("!"), msg);
}

fn step_run(msg: &str) {
    eprintln!("  {} {}...", accent("›"), msg);
}

fn section(title: &str) {
    eprintln!();
    eprintln!("  {}", title.white().bold());
    eprintln!("  {}", dim(&"─".repeat(56)));
}

fn risk_label(level: RiskLevel) -> ColoredString {
    match level {
        RiskLevel::High => "High".truecolor(240, 110, 100),
        RiskLevel::Medium => warn("Medium"),
        RiskLevel::Low => ok("Low"),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "attrition-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and score the employee attrition pipeline")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full training pipeline (the default without a subcommand)
    Train(TrainArgs),

    /// Score every employee in the store with a saved pipeline
    Predict {
        /// Pipeline artifact (defaults to the configured path)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Directory with the exported tables
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only print the N highest-risk employees
        #[arg(long)]
        top: Option<usize>,

        /// Emit predictions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the metadata of a saved pipeline
    Inspect {
        /// Pipeline artifact (defaults to the configured path)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Number of feature importances to list
        #[arg(long, default_value = "10")]
        top: usize,
    },
}

/// Overrides for a training run
#[derive(Args, Debug, Clone, Default)]
pub struct TrainArgs {
    /// JSON config file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory with the exported tables
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Where to write the pipeline artifact
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of cross-validation folds
    #[arg(long)]
    pub cv_folds: Option<usize>,

    /// Random seed for splits, folds and models
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads for the search
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Search metric (accuracy, f1, precision, recall, roc_auc)
    #[arg(long)]
    pub scoring: Option<String>,

    /// Model family (gradient_boosting, logistic_regression)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Shuffle rows within each class before dealing folds
    #[arg(long)]
    pub shuffle_folds: bool,

    /// Emit the evaluation report as JSON
    #[arg(long)]
    pub json: bool,
}

impl TrainArgs {
    /// Config file or environment defaults, then flag overrides
    pub fn resolve(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(path) = &self.output {
            config.artifact_path = path.clone();
        }
        if let Some(folds) = self.cv_folds {
            config.search.cv_folds = folds;
        }
        if let Some(seed) = self.seed {
            config.search.random_state = seed;
        }
        if let Some(jobs) = self.jobs {
            config.search.n_jobs = Some(jobs);
        }
        if let Some(scoring) = &self.scoring {
            config.search.scoring = scoring.parse::<Scoring>()?;
        }
        if let Some(model) = &self.model {
            let family: ModelFamily = model.parse()?;
            if family != config.search.family {
                // A grid for one family does not fit another
                config.search.grid = None;
            }
            config.search.family = family;
        }
        if self.shuffle_folds {
            config.search.shuffle_folds = true;
        }
        config.validate()?;
        Ok(config)
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    Ok(match path {
        Some(p) => PipelineConfig::load(p)?,
        None => PipelineConfig::default(),
    })
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(args: &TrainArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    section("Train");
    eprintln!("  {}", kv("data", &config.data_dir.display().to_string()));
    eprintln!("  {}", kv("model", &config.search.family.to_string()));
    eprintln!(
        "  {}",
        kv(
            "search",
            &format!(
                "{} configurations × {} folds, scoring {}",
                config.search.effective_grid().size(),
                config.search.cv_folds,
                config.search.scoring
            )
        )
    );

    step_run("Training");
    let start = Instant::now();
    let store = config.table_store();
    let outcome = TrainingRun::new(config).run(&store)?;

    for warning in &outcome.merge_warnings {
        step_warn(&warning.to_string());
    }
    step_ok(&format!(
        "{} employees ({} retained, {} departed)",
        outcome.n_rows, outcome.class_counts.0, outcome.class_counts.1
    ));
    let best = outcome.best();
    step_ok(&format!(
        "best {} → {:.4} ± {:.4}",
        describe(&best.params).cyan(),
        best.mean_score,
        best.std_score
    ));
    let ineligible = outcome.candidates.iter().filter(|c| !c.eligible).count();
    if ineligible > 0 {
        step_warn(&format!("{} configurations failed to fit", ineligible));
    }
    if let Some(path) = &outcome.artifact_path {
        step_ok(&format!("artifact → {}", path.display()));
    }
    step_ok(&format!("done in {:.1?}", start.elapsed()));
    eprintln!();

    if args.json {
        let payload = serde_json::json!({
            "report": outcome.report,
            "best_params": best.params,
            "cv_score": best.mean_score,
            "cv_std": best.std_score,
            "artifact_path": outcome.artifact_path,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", outcome.report);
    }
    Ok(())
}

pub fn cmd_predict(
    model: Option<&Path>,
    data_dir: Option<&Path>,
    config_path: Option<&Path>,
    top: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = data_dir {
        config.data_dir = dir.to_path_buf();
    }
    let artifacts = ArtifactStore::new(model.map(Path::to_path_buf).unwrap_or_else(|| config.artifact_path.clone()));

    section("Predict");
    let pipeline = match artifacts.load() {
        Ok(p) => p,
        Err(e) => anyhow::bail!("no model available: {}", e),
    };
    step_ok(&format!("loaded {}", artifacts.path().display()));

    let store = config.table_store();
    let mut scored = score_employees(&config, &store, &pipeline, chrono::Utc::now())?;
    scored.sort_by(|a, b| {
        b.assessment
            .probability
            .total_cmp(&a.assessment.probability)
            .then_with(|| a.employee_id.cmp(&b.employee_id))
    });
    if let Some(n) = top {
        scored.truncate(n);
    }
    eprintln!();

    if json {
        let rows: Vec<_> = scored
            .iter()
            .map(|r| {
                serde_json::json!({
                    "employee_id": r.employee_id,
                    "probability": r.assessment.probability,
                    "risk_level": r.assessment.level,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{:<16} {:>12} {:>8}", "employee", "probability", "risk");
        for r in &scored {
            println!(
                "{:<16} {:>12.4} {:>8}",
                r.employee_id,
                r.assessment.probability,
                risk_label(r.assessment.level)
            );
        }
    }
    Ok(())
}

pub fn cmd_inspect(model: Option<&Path>, top: usize) -> anyhow::Result<()> {
    let path = match model {
        Some(p) => p.to_path_buf(),
        None => PipelineConfig::default().artifact_path,
    };
    let pipeline = match ArtifactStore::new(&path).load() {
        Ok(p) => p,
        Err(e) => anyhow::bail!("no model available: {}", e),
    };
    let meta = pipeline.metadata();

    println!();
    println!("  {}", "Pipeline".white().bold());
    println!("  {}", dim(&"─".repeat(56)));
    println!("  {}", kv("path", &path.display().to_string()));
    println!("  {}", kv("created", &meta.created_at.to_rfc3339()));
    println!("  {}", kv("version", &meta.crate_version));
    println!("  {}", kv("family", &meta.family.to_string()));
    println!("  {}", kv("params", &describe(&meta.best_params)));
    println!(
        "  {}",
        kv("cv score", &format!("{:.4} ± {:.4} ({})", meta.cv_score, meta.cv_std, meta.scoring))
    );
    println!("  {}", kv("train rows", &meta.n_train.to_string()));
    println!("  {}", kv("seed", &meta.random_state.to_string()));
    println!(
        "  {}",
        kv(
            "features",
            &format!(
                "{} numerical, {} categorical → {} columns",
                pipeline.numerical().len(),
                pipeline.categorical().len(),
                pipeline.preprocessor().feature_names().len()
            )
        )
    );

    if let Some(importances) = pipeline.feature_importances() {
        println!();
        println!("  {}", "Top features".white().bold());
        println!("  {}", dim(&"─".repeat(56)));
        for (name, value) in importances.iter().take(top) {
            println!("  {:<40} {}", muted(name), format!("{:.4}", value).white());
        }
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_means_train() {
        let cli = Cli::try_parse_from(["attrition-train"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_train_overrides() {
        let cli = Cli::try_parse_from([
            "attrition-train",
            "train",
            "--cv-folds",
            "5",
            "--seed",
            "7",
            "--scoring",
            "roc_auc",
            "--model",
            "logistic",
            "--output",
            "out/model.bin",
        ])
        .unwrap();
        let Some(Commands::Train(args)) = cli.command else {
            panic!("expected train");
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.search.cv_folds, 5);
        assert_eq!(config.search.random_state, 7);
        assert_eq!(config.search.scoring, Scoring::RocAuc);
        assert_eq!(config.search.family, ModelFamily::LogisticRegression);
        assert_eq!(config.artifact_path, PathBuf::from("out/model.bin"));
    }

    #[test]
    fn test_bad_scoring_rejected() {
        let args = TrainArgs {
            scoring: Some("loss".to_string()),
            ..TrainArgs::default()
        };
        assert!(args.resolve().is_err());
    }
}
