use crate::error::{Error, Result};
use crate::prune::PruningPolicy;
use crate::sax::{NumerosityReduction, SaxParams, MAX_ALPHABET, MIN_ALPHABET};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NORMALIZATION_THRESHOLD: f64 = 0.01;

/// Parameters of a full series → density-curve run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Samples behind each token
    pub window_size: usize,
    /// PAA segments per window
    pub paa_size: usize,
    pub alphabet_size: usize,
    /// Windows whose standard deviation is at or below this are not normalized
    pub normalization_threshold: f64,
    pub numerosity_reduction: NumerosityReduction,
    pub pruning: PruningPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            paa_size: 4,
            alphabet_size: 4,
            normalization_threshold: DEFAULT_NORMALIZATION_THRESHOLD,
            numerosity_reduction: NumerosityReduction::Exact,
            pruning: PruningPolicy::MinimalMotif,
        }
    }
}

impl PipelineConfig {
    pub fn new(window_size: usize, paa_size: usize, alphabet_size: usize) -> Self {
        Self {
            window_size,
            paa_size,
            alphabet_size,
            ..Self::default()
        }
    }

    pub fn with_pruning(mut self, pruning: PruningPolicy) -> Self {
        self.pruning = pruning;
        self
    }

    pub fn with_numerosity_reduction(mut self, strategy: NumerosityReduction) -> Self {
        self.numerosity_reduction = strategy;
        self
    }

    /// Rejects parameters that cannot work for a series of `series_len` samples.
    pub fn validate(&self, series_len: usize) -> Result<()> {
        if self.window_size == 0 {
            return Err(Error::config("window size must be positive"));
        }
        if series_len < self.window_size {
            return Err(Error::config(format!(
                "series of length {} is shorter than the window size {}",
                series_len, self.window_size
            )));
        }
        if self.paa_size == 0 || self.paa_size > self.window_size {
            return Err(Error::config(format!(
                "PAA size {} must be in 1..={}",
                self.paa_size, self.window_size
            )));
        }
        if !(MIN_ALPHABET..=MAX_ALPHABET).contains(&self.alphabet_size) {
            return Err(Error::config(format!(
                "alphabet size {} outside {}..={}",
                self.alphabet_size, MIN_ALPHABET, MAX_ALPHABET
            )));
        }
        if !(self.normalization_threshold >= 0.0) {
            return Err(Error::config(format!(
                "normalization threshold {} must be a non-negative number",
                self.normalization_threshold
            )));
        }
        Ok(())
    }

    pub fn sax_params(&self) -> SaxParams {
        SaxParams {
            window_size: self.window_size,
            paa_size: self.paa_size,
            alphabet_size: self.alphabet_size,
            normalization_threshold: self.normalization_threshold,
            numerosity_reduction: self.numerosity_reduction,
        }
    }
}
