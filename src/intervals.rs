use crate::error::{Error, Result};
use crate::extract::{GrammarRuleRecord, RuleTable};
use serde::{Deserialize, Serialize};

/// Half-open range `[start, end)` of original sample indices covered by one
/// rule occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleInterval {
    pub rule_id: usize,
    pub start: usize,
    pub end: usize,
}

impl RuleInterval {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// All intervals of one rule, one per occurrence, in occurrence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleIntervals {
    pub rule_id: usize,
    pub intervals: Vec<RuleInterval>,
}

impl RuleIntervals {
    pub fn min_length(&self) -> Option<usize> {
        self.intervals.iter().map(RuleInterval::len).min()
    }

    pub fn max_length(&self) -> Option<usize> {
        self.intervals.iter().map(RuleInterval::len).max()
    }

    pub fn mean_length(&self) -> Option<f64> {
        if self.intervals.is_empty() {
            return None;
        }
        let total: usize = self.intervals.iter().map(RuleInterval::len).sum();
        Some(total as f64 / self.intervals.len() as f64)
    }
}

/// Intervals for every rule of a table, sorted by rule id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalTable {
    rules: Vec<RuleIntervals>,
}

impl IntervalTable {
    pub fn iter(&self) -> std::slice::Iter<'_, RuleIntervals> {
        self.rules.iter()
    }

    pub fn get(&self, rule_id: usize) -> Option<&RuleIntervals> {
        self.rules
            .binary_search_by_key(&rule_id, |rule| rule.rule_id)
            .ok()
            .map(|i| &self.rules[i])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every interval of every rule except the top rule.
    pub fn motif_intervals(&self) -> impl Iterator<Item = &RuleInterval> {
        self.rules
            .iter()
            .filter(|rule| rule.rule_id != 0)
            .flat_map(|rule| rule.intervals.iter())
    }

    /// Keeps only the rules present in `table`.
    pub fn restricted_to(&self, table: &RuleTable) -> IntervalTable {
        IntervalTable {
            rules: self
                .rules
                .iter()
                .filter(|rule| table.get(rule.rule_id).is_some())
                .cloned()
                .collect(),
        }
    }
}

/// Projects rule occurrences from token positions onto the original series.
#[derive(Debug, Clone, Copy)]
pub struct IntervalMapper {
    window_size: usize,
    series_len: usize,
}

impl IntervalMapper {
    /// `window_size` is the number of samples behind each token.
    pub fn new(window_size: usize, series_len: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::config("window size must be positive"));
        }
        if series_len < window_size {
            return Err(Error::config(format!(
                "series of length {} is shorter than the window size {}",
                series_len, window_size
            )));
        }
        Ok(Self {
            window_size,
            series_len,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Maps every occurrence of every rule in `table`.
    pub fn map(&self, table: &RuleTable) -> Result<IntervalTable> {
        let rules = table
            .iter()
            .map(|record| self.map_rule(record, table.original_indices()))
            .collect::<Result<Vec<_>>>()?;
        Ok(IntervalTable { rules })
    }

    /// An occurrence spanning tokens `p..=q` covers
    /// `[index(p), index(q) + window_size)`.
    pub fn map_rule(
        &self,
        record: &GrammarRuleRecord,
        original_indices: &[usize],
    ) -> Result<RuleIntervals> {
        let span = record.expanded_len();
        let mut intervals = Vec::with_capacity(record.occurrences.len());

        for &position in &record.occurrences {
            if span == 0 {
                break;
            }
            let last = position + span - 1;
            let (Some(&start), Some(&last_index)) =
                (original_indices.get(position), original_indices.get(last))
            else {
                return Err(Error::internal(format!(
                    "occurrence of {} at token {} runs past the token stream",
                    record.rule_name(),
                    position
                )));
            };

            let end = last_index + self.window_size;
            if end > self.series_len {
                return Err(Error::input(
                    last,
                    format!(
                        "window at sample {} overruns the series of length {}",
                        last_index, self.series_len
                    ),
                ));
            }

            intervals.push(RuleInterval {
                rule_id: record.rule_id,
                start,
                end,
            });
        }

        Ok(RuleIntervals {
            rule_id: record.rule_id,
            intervals,
        })
    }
}
