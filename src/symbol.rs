use serde::{Deserialize, Serialize};
use slotmap::DefaultKey;

/// A labeled unit of the symbol stream.
///
/// `original_index` is the sample index in the source series where the
/// subsequence behind `label` begins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub label: String,
    pub original_index: usize,
}

impl Token {
    pub fn new(label: impl Into<String>, original_index: usize) -> Self {
        Self {
            label: label.into(),
            original_index,
        }
    }
}

/// Symbol types in the rule graph.
///
/// Each rule body is bracketed by a `RuleHead` and a `RuleTail` guard.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Symbol {
    /// A terminal, by interned label id.
    Terminal { label: u32 },

    /// A reference to a rule (non-terminal).
    RuleRef { rule_id: u32 },

    /// Marks the beginning of a rule body and carries its reference count.
    RuleHead {
        rule_id: u32,
        count: u32,
        tail: DefaultKey,
    },

    /// Marks the end of a rule body.
    RuleTail,
}

impl Symbol {
    #[inline]
    pub(crate) fn is_guard(&self) -> bool {
        matches!(self, Symbol::RuleHead { .. } | Symbol::RuleTail)
    }
}

/// A node in the doubly-linked list of symbols.
#[derive(Debug)]
pub(crate) struct SymbolNode {
    pub symbol: Symbol,
    pub prev: Option<DefaultKey>,
    pub next: Option<DefaultKey>,
}

impl SymbolNode {
    pub(crate) fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            prev: None,
            next: None,
        }
    }
}

/// The structural value of a symbol, used as half of a digram index key.
///
/// Terminals compare by label, non-terminals by rule id. The encoding is exact, so equal values always mean
/// equal symbols.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub(crate) struct SymbolValue(u64);

impl SymbolValue {
    const RULE_TAG: u64 = 1 << 32;
    const HEAD_TAG: u64 = 2 << 32;
    const TAIL_TAG: u64 = 3 << 32;

    pub(crate) fn of(symbol: &Symbol) -> Self {
        match *symbol {
            Symbol::Terminal { label, .. } => SymbolValue(label as u64),
            Symbol::RuleRef { rule_id } => SymbolValue(Self::RULE_TAG | rule_id as u64),
            Symbol::RuleHead { rule_id, .. } => SymbolValue(Self::HEAD_TAG | rule_id as u64),
            Symbol::RuleTail => SymbolValue(Self::TAIL_TAG),
        }
    }
}
