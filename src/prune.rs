use crate::error::{Error, Result};
use crate::extract::{GrammarRuleRecord, RuleTable};
use crate::intervals::{IntervalTable, RuleIntervals};
use serde::{Deserialize, Serialize};

/// How the pruner decides which rules are worth keeping.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PruningPolicy {
    /// Keep rules that occur at least twice and expand to at least two tokens.
    #[default]
    MinimalMotif,

    /// Keep rules whose description-length saving exceeds `threshold`.
    ///
    /// See [`RulePruner::description_length_score`].
    DescriptionLength { threshold: i64 },

    /// Keep a small set of rules that together cover the series: rules are
    /// added greedily by new coverage per encoding size, then any rule whose
    /// intervals are fully covered by the others is dropped.
    GreedyCover,
}

/// Reduces a rule table to its structurally interesting rules.
///
/// The top rule is always kept; the input table is never modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulePruner {
    policy: PruningPolicy,
}

impl RulePruner {
    pub fn new(policy: PruningPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> PruningPolicy {
        self.policy
    }

    /// Symbols saved by factoring the rule out instead of leaving every
    /// occurrence inline, minus the cost of writing the rule down once:
    /// `(occurrences - 1) * expanded_len - (body_len + 1)`.
    pub fn description_length_score(record: &GrammarRuleRecord) -> i64 {
        let occurrences = record.occurrence_count() as i64;
        let expanded = record.expanded_len() as i64;
        let definition = record.body.len() as i64 + 1;
        (occurrences - 1) * expanded - definition
    }

    /// Returns a new table with the retained rules.
    ///
    /// `intervals` and `series_len` are only consulted by
    /// [`PruningPolicy::GreedyCover`].
    pub fn prune(
        &self,
        table: &RuleTable,
        intervals: &IntervalTable,
        series_len: usize,
    ) -> Result<RuleTable> {
        let pruned = match self.policy {
            PruningPolicy::MinimalMotif => table.filtered(|record| {
                record.is_top() || (record.occurrence_count() >= 2 && record.expanded_len() >= 2)
            }),
            PruningPolicy::DescriptionLength { threshold } => table.filtered(|record| {
                record.is_top() || Self::description_length_score(record) > threshold
            }),
            PruningPolicy::GreedyCover => {
                let keep = greedy_cover(table, intervals, series_len)?;
                table.filtered(|record| record.is_top() || keep.contains(&record.rule_id))
            }
        };

        log::debug!(
            "pruning ({:?}) kept {} of {} rules",
            self.policy,
            pruned.len(),
            table.len()
        );
        Ok(pruned)
    }
}

/// Selects rule ids for [`PruningPolicy::GreedyCover`].
fn greedy_cover(
    table: &RuleTable,
    intervals: &IntervalTable,
    series_len: usize,
) -> Result<Vec<usize>> {
    let mut candidates: Vec<(&GrammarRuleRecord, &RuleIntervals)> = Vec::new();
    for record in table.iter().filter(|record| !record.is_top()) {
        let Some(rule_intervals) = intervals.get(record.rule_id) else {
            continue;
        };
        if let Some(interval) = rule_intervals.intervals.iter().find(|i| i.end > series_len) {
            return Err(Error::input(
                interval.start,
                format!(
                    "interval of R{} ends at {} past the series of length {}",
                    record.rule_id, interval.end, series_len
                ),
            ));
        }
        candidates.push((record, rule_intervals));
    }

    let mut covered = vec![false; series_len];
    let mut selected: Vec<usize> = Vec::new();

    while covered.iter().any(|&c| !c) {
        let mut best: Option<(usize, f64)> = None;
        for (i, (record, rule_intervals)) in candidates.iter().enumerate() {
            if selected.contains(&i) {
                continue;
            }
            let delta = cover_delta(&covered, record, rule_intervals);
            if delta > 0.0 && best.map_or(true, |(_, b)| delta > b) {
                best = Some((i, delta));
            }
        }

        let Some((i, _)) = best else {
            break;
        };
        for interval in &candidates[i].1.intervals {
            covered[interval.start..interval.end].fill(true);
        }
        selected.push(i);
    }

    // Drop rules that add nothing once the others are in place
    let mut depth = vec![0u32; series_len];
    for &i in &selected {
        for interval in &candidates[i].1.intervals {
            for d in &mut depth[interval.start..interval.end] {
                *d += 1;
            }
        }
    }

    let mut keep = Vec::with_capacity(selected.len());
    for &i in selected.iter().rev() {
        let rule_intervals = candidates[i].1;
        let redundant = rule_intervals
            .intervals
            .iter()
            .all(|interval| depth[interval.start..interval.end].iter().all(|&d| d >= 2));
        if redundant {
            for interval in &rule_intervals.intervals {
                for d in &mut depth[interval.start..interval.end] {
                    *d -= 1;
                }
            }
        } else {
            keep.push(candidates[i].0.rule_id);
        }
    }

    Ok(keep)
}

/// Share of newly covered samples, weighted by the rule's encoding size.
fn cover_delta(covered: &[bool], record: &GrammarRuleRecord, intervals: &RuleIntervals) -> f64 {
    let mut new_cover = 0usize;
    let mut overlap = 0usize;
    for interval in &intervals.intervals {
        for &c in &covered[interval.start..interval.end] {
            if c {
                overlap += 1;
            } else {
                new_cover += 1;
            }
        }
    }

    if new_cover == 0 {
        return 0.0;
    }
    let encoding = (record.expanded_len() + record.body.len()) as f64;
    new_cover as f64 / (new_cover + overlap) as f64 / encoding
}
