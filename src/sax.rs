//! Symbolic aggregate approximation (SAX) of a numeric series.
//!
//! This is the symbol stream source feeding the grammar engine: a window
//! slides over the series, each window is z-normalized, reduced by piecewise
//! aggregate approximation (PAA) and spelled with letters cut from the
//! standard normal distribution. Consecutive identical or indistinguishable
//! words can be dropped (numerosity reduction).

use crate::error::{Error, Result};
use crate::symbol::Token;
use serde::{Deserialize, Serialize};

/// Standard-normal breakpoints for alphabets of size 2 through 10.
const NORMAL_CUTS: [&[f64]; 9] = [
    &[0.0],
    &[-0.4307273, 0.4307273],
    &[-0.6744898, 0.0, 0.6744898],
    &[-0.841621233572914, -0.2533471031358, 0.2533471031358, 0.841621233572914],
    &[
        -0.967421566101701,
        -0.430727299295457,
        0.0,
        0.430727299295457,
        0.967421566101701,
    ],
    &[
        -1.06757052387814,
        -0.565948821932863,
        -0.180012369792705,
        0.180012369792705,
        0.565948821932863,
        1.06757052387814,
    ],
    &[
        -1.15034938037601,
        -0.674489750196082,
        -0.318639363964375,
        0.0,
        0.318639363964375,
        0.674489750196082,
        1.15034938037601,
    ],
    &[
        -1.22064034884735,
        -0.764709673786387,
        -0.430727299295457,
        -0.139710298881862,
        0.139710298881862,
        0.430727299295457,
        0.764709673786387,
        1.22064034884735,
    ],
    &[
        -1.2815515655446,
        -0.841621233572914,
        -0.524400512708041,
        -0.2533471031358,
        0.0,
        0.2533471031358,
        0.524400512708041,
        0.841621233572914,
        1.2815515655446,
    ],
];

pub const MIN_ALPHABET: usize = 2;
pub const MAX_ALPHABET: usize = 10;

/// Policy for consecutive identical words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumerosityReduction {
    /// Emit every window.
    None,
    /// Skip a word equal to the previously emitted one.
    #[default]
    Exact,
    /// Skip a word whose [`min_dist`] to the previously emitted one is zero.
    Mindist,
}

/// Returns the breakpoints for an alphabet of `size` letters.
pub fn normal_cuts(size: usize) -> Result<&'static [f64]> {
    if !(MIN_ALPHABET..=MAX_ALPHABET).contains(&size) {
        return Err(Error::config(format!(
            "alphabet size {} outside {}..={}",
            size, MIN_ALPHABET, MAX_ALPHABET
        )));
    }
    Ok(NORMAL_CUTS[size - MIN_ALPHABET])
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; zero for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Z-normalizes `values` unless their deviation is at or below `threshold`,
/// in which case they are returned unchanged.
pub fn znorm(values: &[f64], threshold: f64) -> Vec<f64> {
    let sd = std_dev(values);
    if sd <= threshold {
        return values.to_vec();
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) / sd).collect()
}

/// Piecewise aggregate approximation with fractional segment boundaries.
pub fn paa(values: &[f64], segments: usize) -> Vec<f64> {
    let len = values.len();
    if segments == 0 || len == 0 {
        return Vec::new();
    }
    if len == segments {
        return values.to_vec();
    }

    let per_segment = len as f64 / segments as f64;
    (0..segments)
        .map(|i| {
            let seg_start = i as f64 * per_segment;
            let seg_end = (i + 1) as f64 * per_segment;

            let full_start = seg_start.floor() as usize;
            let full_end = (seg_end.ceil() as usize).min(len);
            let fraction_start = seg_start.ceil() - seg_start;
            let fraction_end = seg_end - seg_end.floor();

            let mut sum = 0.0;
            for (j, &v) in values[full_start..full_end].iter().enumerate() {
                let mut weight = 1.0;
                if j == 0 && fraction_start > 0.0 {
                    weight *= fraction_start;
                }
                if j + 1 == full_end - full_start && fraction_end > 0.0 {
                    weight *= fraction_end;
                }
                sum += v * weight;
            }
            sum / per_segment
        })
        .collect()
}

/// Maps a value to its letter: `'a'` plus the number of cuts at or below it.
pub fn letter(value: f64, cuts: &[f64]) -> char {
    let idx = cuts.iter().take_while(|&&cut| cut <= value).count();
    (b'a' + idx as u8) as char
}

/// Lower-bounding distance between two words over the same alphabet.
///
/// Letters at most one step apart contribute nothing; otherwise a letter pair
/// contributes the gap between the breakpoints separating them. Words of
/// different lengths are infinitely far apart.
pub fn min_dist(a: &str, b: &str, cuts: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    let sum: f64 = a
        .bytes()
        .zip(b.bytes())
        .map(|(x, y)| {
            let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
            let (lo, hi) = ((lo - b'a') as usize, (hi - b'a') as usize);
            if hi - lo <= 1 {
                0.0
            } else {
                let d = cuts[hi - 1] - cuts[lo];
                d * d
            }
        })
        .sum();
    sum.sqrt()
}

/// Discretization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaxParams {
    pub window_size: usize,
    pub paa_size: usize,
    pub alphabet_size: usize,
    pub normalization_threshold: f64,
    pub numerosity_reduction: NumerosityReduction,
}

/// Slides a window over `series` and emits one token per retained word.
///
/// Each token's `original_index` is the start of its window.
pub fn discretize(series: &[f64], params: &SaxParams) -> Result<Vec<Token>> {
    let cuts = normal_cuts(params.alphabet_size)?;
    if params.window_size == 0 || params.window_size > series.len() {
        return Err(Error::config(format!(
            "window size {} does not fit a series of length {}",
            params.window_size,
            series.len()
        )));
    }
    if params.paa_size == 0 || params.paa_size > params.window_size {
        return Err(Error::config(format!(
            "PAA size {} must be in 1..={}",
            params.paa_size, params.window_size
        )));
    }

    let mut tokens: Vec<Token> = Vec::new();
    for (start, window) in series.windows(params.window_size).enumerate() {
        let normalized = znorm(window, params.normalization_threshold);
        let word: String = paa(&normalized, params.paa_size)
            .into_iter()
            .map(|v| letter(v, cuts))
            .collect();

        let redundant = tokens.last().is_some_and(|last| match params.numerosity_reduction {
            NumerosityReduction::None => false,
            NumerosityReduction::Exact => last.label == word,
            NumerosityReduction::Mindist => min_dist(&last.label, &word, cuts) == 0.0,
        });
        if redundant {
            continue;
        }
        tokens.push(Token::new(word, start));
    }
    Ok(tokens)
}
