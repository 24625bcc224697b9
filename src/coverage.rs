use crate::error::{Error, Result};
use crate::intervals::RuleInterval;
use serde::{Deserialize, Serialize};

/// Per-sample count of rule occurrences covering that sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageArray {
    counts: Vec<u32>,
}

impl CoverageArray {
    /// Counts by sample index.
    pub fn as_slice(&self) -> &[u32] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. total covered length of the input intervals.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Highest count; zero for an empty array.
    pub fn max(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Samples no retained rule touches.
    pub fn uncovered(&self) -> usize {
        self.counts.iter().filter(|&&c| c == 0).count()
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.counts
    }
}

/// Accumulates rule intervals into a [`CoverageArray`].
pub struct CoverageBuilder {
    // Difference array, one slot longer than the series
    deltas: Vec<i64>,
}

impl CoverageBuilder {
    pub fn new(series_len: usize) -> Self {
        Self {
            deltas: vec![0; series_len + 1],
        }
    }

    /// Adds one interval. Empty intervals are ignored.
    pub fn add(&mut self, interval: &RuleInterval) -> Result<()> {
        let series_len = self.deltas.len() - 1;
        if interval.start > interval.end || interval.end > series_len {
            return Err(Error::input(
                interval.start,
                format!(
                    "interval [{}, {}) of R{} does not fit a series of length {}",
                    interval.start, interval.end, interval.rule_id, series_len
                ),
            ));
        }
        self.deltas[interval.start] += 1;
        self.deltas[interval.end] -= 1;
        Ok(())
    }

    pub fn extend<'a, I>(&mut self, intervals: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a RuleInterval>,
    {
        for interval in intervals {
            self.add(interval)?;
        }
        Ok(())
    }

    pub fn build(self) -> CoverageArray {
        let series_len = self.deltas.len() - 1;
        let mut counts = Vec::with_capacity(series_len);
        let mut running = 0i64;
        for delta in &self.deltas[..series_len] {
            running += delta;
            counts.push(running as u32);
        }
        CoverageArray { counts }
    }
}

/// Builds the coverage of `intervals` over a series of `series_len` samples.
pub fn build_coverage<'a, I>(series_len: usize, intervals: I) -> Result<CoverageArray>
where
    I: IntoIterator<Item = &'a RuleInterval>,
{
    let mut builder = CoverageBuilder::new(series_len);
    builder.extend(intervals)?;
    Ok(builder.build())
}
