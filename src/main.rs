mod config;
mod input;
mod model;
mod pipeline;
mod report;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{CenterMode, ResponseScale, ScoreConfig};
use crate::input::items::ItemSet;
use crate::input::weights::WeightTable;
use crate::input::{ResponseStore, load_averaged_sets};
use crate::model::response::AveragedResponse;
use crate::pipeline::stage1_average::{Stage1Inputs, Stage1Output, run_stage1};
use crate::pipeline::stage2_score::{Stage2Inputs, run_stage2};
use crate::pipeline::stage3_report::{Stage3Input, write_averaged, write_scores};

#[derive(Debug, Parser)]
#[command(
    name = "portrait-score",
    version,
    about = "Deterministic value-portrait scoring of language models from multi-run survey responses"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Average raw run files into one response per item per model label.
    Average {
        /// Directory of raw run files ({model}_{prompt}_v{N}[_reversed].json).
        #[arg(long)]
        input: PathBuf,
        /// Item dataset (JSON array of portrait options).
        #[arg(long)]
        items: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Minimum fraction of items with at least one successful run.
        #[arg(long, default_value_t = 0.5)]
        coverage_floor: f64,
        /// Emit averaged sets for models below the coverage floor instead
        /// of failing; low coverage is still reported in the metadata.
        #[arg(long)]
        allow_low_coverage: bool,
        #[arg(long, default_value_t = 1.0)]
        scale_min: f64,
        #[arg(long, default_value_t = 6.0)]
        scale_max: f64,
    },
    /// Score previously averaged responses along the weight-table dimensions.
    Score {
        /// Directory of *_averaged_results.json files.
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        items: PathBuf,
        /// Correlation weight table (JSON array).
        #[arg(long)]
        weights: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Items with |weight| at or below this threshold are excluded.
        #[arg(long, default_value_t = 0.3)]
        threshold: f64,
        #[arg(long, value_enum, default_value = "pos-centered")]
        center_mode: CenterMode,
        #[arg(long, default_value_t = 1.0)]
        scale_min: f64,
        #[arg(long, default_value_t = 6.0)]
        scale_max: f64,
    },
    /// Average and score in one pass.
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        items: PathBuf,
        #[arg(long)]
        weights: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 0.3)]
        threshold: f64,
        #[arg(long, value_enum, default_value = "pos-centered")]
        center_mode: CenterMode,
        #[arg(long, default_value_t = 1.0)]
        scale_min: f64,
        #[arg(long, default_value_t = 6.0)]
        scale_max: f64,
        #[arg(long, default_value_t = 0.5)]
        coverage_floor: f64,
        #[arg(long)]
        allow_low_coverage: bool,
    },
}

fn main() {
    init_tracing();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Average {
            input,
            items,
            out,
            coverage_floor,
            allow_low_coverage,
            scale_min,
            scale_max,
        } => {
            let config = ScoreConfig {
                scale: ResponseScale {
                    min: scale_min,
                    max: scale_max,
                },
                coverage_floor,
                ..ScoreConfig::default()
            };
            config.validate().map_err(|e| e.to_string())?;
            let items = ItemSet::load(&items).map_err(|e| e.to_string())?;
            cmd_average(&input, &items, &out, &config, allow_low_coverage).map(|_| ())
        }
        Command::Score {
            input,
            items,
            weights,
            out,
            threshold,
            center_mode,
            scale_min,
            scale_max,
        } => {
            let config = ScoreConfig {
                threshold,
                center_mode,
                scale: ResponseScale {
                    min: scale_min,
                    max: scale_max,
                },
                ..ScoreConfig::default()
            };
            config.validate().map_err(|e| e.to_string())?;
            let items = ItemSet::load(&items).map_err(|e| e.to_string())?;
            let weights = WeightTable::load(&weights, &items).map_err(|e| e.to_string())?;

            let averaged_sets = load_averaged_sets(&input).map_err(|e| e.to_string())?;
            if averaged_sets.is_empty() {
                return Err(format!(
                    "no *{} files under {}",
                    input::AVERAGED_SUFFIX,
                    input.display()
                ));
            }
            for (model, averaged) in &averaged_sets {
                score_model(model, averaged, &weights, &config, &out)?;
            }
            Ok(())
        }
        Command::Run {
            input,
            items,
            weights,
            out,
            threshold,
            center_mode,
            scale_min,
            scale_max,
            coverage_floor,
            allow_low_coverage,
        } => {
            let config = ScoreConfig {
                threshold,
                center_mode,
                scale: ResponseScale {
                    min: scale_min,
                    max: scale_max,
                },
                coverage_floor,
            };
            config.validate().map_err(|e| e.to_string())?;
            let items = ItemSet::load(&items).map_err(|e| e.to_string())?;
            let weights = WeightTable::load(&weights, &items).map_err(|e| e.to_string())?;

            let averaged_dir = out.join("averaged");
            let outputs = cmd_average(&input, &items, &averaged_dir, &config, allow_low_coverage)?;

            let scores_out = scores_dir(&out, &config);
            for (model, output) in &outputs {
                score_model(model, &output.averaged, &weights, &config, &scores_out)?;
            }
            Ok(())
        }
    }
}

fn cmd_average(
    input_dir: &Path,
    items: &ItemSet,
    out_dir: &Path,
    config: &ScoreConfig,
    allow_low_coverage: bool,
) -> Result<Vec<(String, Stage1Output)>, String> {
    let store = ResponseStore::discover(input_dir).map_err(|e| e.to_string())?;
    if store.is_empty() {
        return Err(format!(
            "no run files found under {}",
            input_dir.display()
        ));
    }

    let mut outputs = Vec::new();
    for (model, files) in &store.model_files {
        tracing::info!("averaging model {model} ({} run file(s))", files.len());
        let floor = if allow_low_coverage {
            0.0
        } else {
            config.coverage_floor
        };
        let inputs = Stage1Inputs {
            model,
            files,
            items,
            scale: config.scale,
            coverage_floor: floor,
        };
        let output = run_stage1(&inputs).map_err(|e| e.to_string())?;
        if output.coverage.coverage < config.coverage_floor {
            tracing::warn!(
                "model {model}: coverage {:.3} below floor {:.3}; \
                 continuing because --allow-low-coverage is set",
                output.coverage.coverage,
                config.coverage_floor
            );
        }
        write_averaged(
            &Stage3Input {
                model,
                averaged: &output.averaged,
                coverage: &output.coverage,
            },
            out_dir,
        )
        .map_err(|e| format!("model {model}: {e}"))?;
        outputs.push((model.clone(), output));
    }
    Ok(outputs)
}

fn score_model(
    model: &str,
    averaged: &[AveragedResponse],
    weights: &WeightTable,
    config: &ScoreConfig,
    out_dir: &Path,
) -> Result<(), String> {
    tracing::info!("scoring model {model} under config {}", config.label());
    let output = run_stage2(&Stage2Inputs {
        model,
        averaged,
        weights,
        config,
    });
    for (category, dimensions) in &output.scores {
        for (dimension, score) in dimensions {
            if !score.is_scored() {
                tracing::warn!(
                    "model {model}: {category}/{dimension} unscored \
                     (no item above threshold with an averaged response)"
                );
            }
        }
    }
    write_scores(model, &output, config, out_dir).map_err(|e| format!("model {model}: {e}"))?;
    Ok(())
}

fn scores_dir(base: &Path, config: &ScoreConfig) -> PathBuf {
    base.join(format!("scores_{}", config.label()))
}
