//! # Sequitur-TS - Grammar Induction over Time Series
//!
//! Incremental Sequitur grammar induction over a stream of discretized
//! time-series symbols, with the downstream stages needed to turn the grammar
//! into motif intervals and a rule density curve.
//!
//! The engine maintains a context-free grammar that compresses the token
//! stream while enforcing two constraints after every append:
//! 1. **Digram Uniqueness**: No digram (pair of consecutive symbols) appears more than once
//! 2. **Rule Utility**: Every rule is used at least twice
//!
//! Once finalized, the grammar is read out as a [`RuleTable`], projected onto
//! the original series with an [`IntervalMapper`], reduced with a
//! [`RulePruner`] and summed into a [`CoverageArray`].
//!
//! ## Example
//!
//! ```
//! use sequitur_ts::{extract, GrammarEngine, Token};
//!
//! let mut engine = GrammarEngine::new();
//! for (i, label) in ["a", "b", "a", "b", "a", "b"].into_iter().enumerate() {
//!     engine.append_token(Token::new(label, i)).unwrap();
//! }
//! engine.finalize().unwrap();
//!
//! let table = extract(&engine).unwrap();
//! assert_eq!(table.top().unwrap().rule_string(), "R1 R1 R1");
//! assert_eq!(table.get(1).unwrap().expanded_rule_string(), "a b");
//! ```
//!
//! For a numeric series, [`run`] chains discretization, induction, pruning
//! and coverage in one call.
//!
//! ## Performance
//!
//! - O(1) amortized time per token appended
//! - Grammar size grows sub-linearly with input size for repetitive data
//! - Memory-efficient using generational indices (SlotMap)

mod config;
mod coverage;
mod digram;
mod error;
mod extract;
mod intervals;
mod iter;
mod pipeline;
mod prune;
mod rule;
pub mod sax;
mod sequitur;
mod symbol;

#[cfg(test)]
mod tests;

pub use config::{PipelineConfig, DEFAULT_NORMALIZATION_THRESHOLD};
pub use coverage::{build_coverage, CoverageArray, CoverageBuilder};
pub use error::{Error, Result};
pub use extract::{extract, GrammarRuleRecord, RuleSymbol, RuleTable};
pub use intervals::{IntervalMapper, IntervalTable, RuleInterval, RuleIntervals};
pub use iter::GrammarIter;
pub use pipeline::{run, PipelineOutput};
pub use prune::{PruningPolicy, RulePruner};
pub use sequitur::{EngineState, GrammarEngine, GrammarStats};
pub use symbol::Token;
