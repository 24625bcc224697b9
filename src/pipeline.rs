//! End-to-end run: numeric series in, rule density curve out.

use crate::config::PipelineConfig;
use crate::coverage::{build_coverage, CoverageArray};
use crate::error::Result;
use crate::extract::{extract, RuleTable};
use crate::intervals::{IntervalMapper, IntervalTable};
use crate::prune::RulePruner;
use crate::sax::discretize;
use crate::sequitur::{GrammarEngine, GrammarStats};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Tokens fed to the grammar after discretization
    pub token_count: usize,
    pub stats: GrammarStats,
    /// Every extracted rule
    pub rules: RuleTable,
    /// Rules retained by the pruner
    pub pruned: RuleTable,
    /// Intervals of the retained rules
    pub intervals: IntervalTable,
    /// Density curve over the retained non-top rules
    pub coverage: CoverageArray,
}

/// Discretizes `series`, induces its grammar and computes the rule density
/// curve of the rules that survive pruning.
pub fn run(series: &[f64], config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate(series.len())?;
    log::info!(
        "series of {} samples, window {}, PAA {}, alphabet {}",
        series.len(),
        config.window_size,
        config.paa_size,
        config.alphabet_size
    );

    let started = Instant::now();
    let tokens = discretize(series, &config.sax_params())?;
    let token_count = tokens.len();
    log::info!(
        "discretized into {} words in {:?}",
        token_count,
        started.elapsed()
    );

    let started = Instant::now();
    let mut engine = GrammarEngine::new();
    engine.extend(tokens)?;
    engine.finalize()?;
    let stats = engine.stats();
    log::info!(
        "inferred {} rules over {} grammar symbols in {:?}",
        stats.rules,
        stats.grammar_symbols,
        started.elapsed()
    );

    let started = Instant::now();
    let rules = extract(&engine)?;
    let all_intervals = IntervalMapper::new(config.window_size, series.len())?.map(&rules)?;
    log::info!(
        "mapped {} rules to intervals in {:?}",
        rules.len(),
        started.elapsed()
    );

    let started = Instant::now();
    let pruned = RulePruner::new(config.pruning).prune(&rules, &all_intervals, series.len())?;
    let intervals = all_intervals.restricted_to(&pruned);
    log::info!(
        "pruned to {} rules in {:?}",
        pruned.len(),
        started.elapsed()
    );

    let coverage = build_coverage(series.len(), intervals.motif_intervals())?;
    log::info!(
        "coverage: max {}, {} uncovered samples",
        coverage.max(),
        coverage.uncovered()
    );

    Ok(PipelineOutput {
        token_count,
        stats,
        rules,
        pruned,
        intervals,
        coverage,
    })
}
