//! Retry policy and seed surveys.
//!
//! A run that fails is discarded and retried with a derived seed. Surveys
//! generate many derived seeds in parallel with rayon to measure how often a
//! configuration succeeds and which stage fails when it does not.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::error::{GenResult, GenerationFailure, Stage};
use crate::generation::seed::resolve_seed;
use crate::generation::{generate, GeneratedMap};

/// Seed used by attempt `n`; attempt 0 keeps the configured seed.
pub fn derived_seed(seed: &str, attempt: usize) -> String {
    if attempt == 0 {
        seed.to_string()
    } else {
        format!("{seed}#{attempt}")
    }
}

/// Generate with up to `attempts` seeds, returning the first success or the
/// last failure. An empty seed is resolved once, so every attempt derives
/// from the same time-based seed.
pub fn generate_with_retries(config: &GeneratorConfig, attempts: usize) -> GenResult<GeneratedMap> {
    let base = resolve_seed(&config.seed);
    let mut last = GenerationFailure::new(Stage::Seed, "no attempts were made");
    for attempt in 0..attempts {
        let attempt_config = config.clone().with_seed(derived_seed(&base, attempt));
        match generate(&attempt_config) {
            Ok(map) => {
                if attempt > 0 {
                    info!(attempt, seed = %map.seed, "generation succeeded after retry");
                }
                return Ok(map);
            }
            Err(err) => {
                debug!(attempt, stage = %err.stage, "attempt failed");
                last = err;
            }
        }
    }
    Err(last)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyReport {
    /// Base seed every run derived from; time-derived when the config left it empty.
    pub seed: String,
    pub runs: usize,
    pub successes: usize,
    pub success_rate: f64,
    pub failures_by_stage: BTreeMap<Stage, usize>,
    /// Mean cell counts over successful runs.
    pub mean_wood: f64,
    pub mean_iron: f64,
    pub mean_mountain: f64,
    pub mean_river: f64,
    pub mean_groups: f64,
}

/// Generate `seed_count` derived seeds in parallel and summarize the outcomes.
pub fn run_survey(config: &GeneratorConfig, seed_count: usize) -> SurveyReport {
    let base = resolve_seed(&config.seed);
    let outcomes: Vec<Result<[usize; 5], Stage>> = (0..seed_count)
        .into_par_iter()
        .map(|i| {
            let run_config = config.clone().with_seed(derived_seed(&base, i));
            generate(&run_config)
                .map(|map| {
                    let s = map.stats();
                    [s.wood, s.iron, s.mountain, s.river, s.groups]
                })
                .map_err(|e| e.stage)
        })
        .collect();

    let report = summarize(base, &outcomes);
    info!(
        runs = report.runs,
        successes = report.successes,
        rate = report.success_rate,
        "survey finished"
    );
    report
}

fn summarize(seed: String, outcomes: &[Result<[usize; 5], Stage>]) -> SurveyReport {
    let mut failures_by_stage = BTreeMap::new();
    let mut totals = [0usize; 5];
    let mut successes = 0;
    for outcome in outcomes {
        match outcome {
            Ok(stats) => {
                successes += 1;
                for (total, value) in totals.iter_mut().zip(stats) {
                    *total += value;
                }
            }
            Err(stage) => *failures_by_stage.entry(*stage).or_insert(0) += 1,
        }
    }
    let runs = outcomes.len();
    let mean = |i: usize| {
        if successes == 0 {
            0.0
        } else {
            totals[i] as f64 / successes as f64
        }
    };
    SurveyReport {
        seed,
        runs,
        successes,
        success_rate: if runs == 0 {
            0.0
        } else {
            successes as f64 / runs as f64
        },
        failures_by_stage,
        mean_wood: mean(0),
        mean_iron: mean(1),
        mean_mountain: mean(2),
        mean_river: mean(3),
        mean_groups: mean(4),
    }
}
