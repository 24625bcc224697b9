use crate::error::{Error, Result};
use crate::symbol::{Symbol, SymbolNode, SymbolValue, Token};
use ahash::AHashMap as HashMap;
use ahash::AHashSet as HashSet;
use serde::{Deserialize, Serialize};
use slotmap::{DefaultKey, SlotMap};

/// Lifecycle of a [`GrammarEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Building,
    Finalized,
}

/// A pending invariant check, processed by [`GrammarEngine::run_repairs`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum Repair {
    /// Re-check the digram that starts at this symbol.
    Link(DefaultKey),
    /// Inline the rule referenced by this symbol if it is used only once.
    Utility(DefaultKey),
}

/// Incremental grammar-induction engine.
///
/// Maintains a context-free grammar over the appended tokens while enforcing
/// two constraints after every append:
/// 1. Digram Uniqueness: no pair of adjacent symbols appears twice
/// 2. Rule Utility: every rule other than the top rule is used at least twice
///
/// Each engine owns its own digram index and rule numbering, so independent
/// instances never interfere.
pub struct GrammarEngine {
    /// Storage for all symbols using generational indices
    pub(crate) symbols: SlotMap<DefaultKey, SymbolNode>,

    /// Maps a digram value to the symbol that starts its registered occurrence
    pub(crate) digram_index: HashMap<(SymbolValue, SymbolValue), DefaultKey>,

    /// Maps rule IDs to their RuleHead keys
    pub(crate) rule_index: HashMap<u32, DefaultKey>,

    /// Key to the RuleTail of Rule 0 (main sequence)
    pub(crate) sequence_end: DefaultKey,

    /// Original series index of every appended token, by stream position
    pub(crate) original_indices: Vec<usize>,

    label_ids: HashMap<String, u32>,
    label_names: Vec<String>,

    next_rule_id: u32,
    freed_rule_ids: Vec<u32>,

    pub(crate) pending: Vec<Repair>,
    state: EngineState,
}

impl GrammarEngine {
    /// Creates an empty engine holding only Rule 0.
    pub fn new() -> Self {
        let mut symbols = SlotMap::new();

        let tail_key = symbols.insert(SymbolNode::new(Symbol::RuleTail));
        let head_key = symbols.insert(SymbolNode::new(Symbol::RuleHead {
            rule_id: 0,
            count: 0,
            tail: tail_key,
        }));

        symbols[head_key].next = Some(tail_key);
        symbols[tail_key].prev = Some(head_key);

        let mut rule_index = HashMap::default();
        rule_index.insert(0, head_key);

        Self {
            symbols,
            digram_index: HashMap::default(),
            rule_index,
            sequence_end: tail_key,
            original_indices: Vec::new(),
            label_ids: HashMap::default(),
            label_names: Vec::new(),
            next_rule_id: 1,
            freed_rule_ids: Vec::new(),
            pending: Vec::new(),
            state: EngineState::Building,
        }
    }

    /// Appends a token to the end of the top rule and repairs the grammar.
    ///
    /// Fails with [`Error::Finalized`] after [`finalize`](Self::finalize), and
    /// with [`Error::InputContractViolation`] if the token's original index
    /// does not strictly increase.
    pub fn append_token(&mut self, token: Token) -> Result<()> {
        if self.state == EngineState::Finalized {
            return Err(Error::Finalized);
        }

        let position = self.original_indices.len();
        if let Some(&last) = self.original_indices.last() {
            if token.original_index <= last {
                return Err(Error::input(
                    position,
                    format!(
                        "original index {} does not follow {}",
                        token.original_index, last
                    ),
                ));
            }
        }

        let label = self.intern(token.label);
        self.original_indices.push(token.original_index);

        let new_key = self
            .symbols
            .insert(SymbolNode::new(Symbol::Terminal { label }));

        // Insert before sequence_end (RuleTail of Rule 0)
        let tail_key = self.sequence_end;
        let prev_key = self.symbols[tail_key].prev;

        self.symbols[new_key].next = Some(tail_key);
        self.symbols[new_key].prev = prev_key;
        self.symbols[tail_key].prev = Some(new_key);

        if let Some(prev) = prev_key {
            self.symbols[prev].next = Some(new_key);
            self.pending.push(Repair::Link(prev));
        }

        self.run_repairs();
        Ok(())
    }

    /// Appends every token of `tokens`, stopping at the first failure.
    pub fn extend<I: IntoIterator<Item = Token>>(&mut self, tokens: I) -> Result<()> {
        for token in tokens {
            self.append_token(token)?;
        }
        Ok(())
    }

    /// Verifies the grammar invariants and freezes the engine.
    ///
    /// Calling it on an already finalized engine is a no-op. If verification
    /// fails the engine stays in [`EngineState::Building`] so the broken
    /// grammar is never handed to extraction.
    pub fn finalize(&mut self) -> Result<()> {
        if self.state == EngineState::Finalized {
            return Ok(());
        }

        self.check_invariants()?;
        self.state = EngineState::Finalized;

        log::debug!(
            "finalized grammar: {} tokens, {} rules, {} symbols",
            self.len(),
            self.rule_count(),
            self.stats().grammar_symbols
        );
        Ok(())
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Returns true once [`finalize`](Self::finalize) has succeeded.
    pub fn is_finalized(&self) -> bool {
        self.state == EngineState::Finalized
    }

    /// Returns the number of tokens appended.
    pub fn len(&self) -> usize {
        self.original_indices.len()
    }

    /// Returns true if no tokens have been appended.
    pub fn is_empty(&self) -> bool {
        self.original_indices.is_empty()
    }

    /// Number of live rules, including the top rule.
    pub fn rule_count(&self) -> usize {
        self.rule_index.len()
    }

    /// Original series index of each appended token, by stream position.
    pub fn original_indices(&self) -> &[usize] {
        &self.original_indices
    }

    pub(crate) fn label(&self, id: u32) -> &str {
        &self.label_names[id as usize]
    }

    fn intern(&mut self, label: String) -> u32 {
        if let Some(&id) = self.label_ids.get(label.as_str()) {
            return id;
        }
        let id = self.label_names.len() as u32;
        self.label_names.push(label.clone());
        self.label_ids.insert(label, id);
        id
    }

    pub(crate) fn allocate_rule_id(&mut self) -> u32 {
        if let Some(id) = self.freed_rule_ids.pop() {
            id
        } else {
            let id = self.next_rule_id;
            self.next_rule_id += 1;
            id
        }
    }

    pub(crate) fn release_rule_id(&mut self, id: u32) {
        debug_assert!(id != 0 && id < self.next_rule_id);
        self.freed_rule_ids.push(id);
    }

    /// Drains the repair worklist until the grammar is stable again.
    pub(crate) fn run_repairs(&mut self) {
        while let Some(repair) = self.pending.pop() {
            match repair {
                Repair::Link(key) => self.link_made(key),
                Repair::Utility(key) => self.expand_rule_if_necessary(key),
            }
        }
    }

    /// Returns the body of a rule, head and tail excluded.
    pub(crate) fn rule_body(&self, head_key: DefaultKey) -> Vec<DefaultKey> {
        let mut body = Vec::new();
        let mut current = self.symbols[head_key].next;
        while let Some(key) = current {
            if matches!(self.symbols[key].symbol, Symbol::RuleTail) {
                break;
            }
            body.push(key);
            current = self.symbols[key].next;
        }
        body
    }

    /// Reference count stored on a rule's head.
    pub(crate) fn rule_use_count(&self, rule_id: u32) -> Option<u32> {
        let head = *self.rule_index.get(&rule_id)?;
        match self.symbols[head].symbol {
            Symbol::RuleHead { count, .. } => Some(count),
            _ => None,
        }
    }

    /// Returns compression statistics.
    pub fn stats(&self) -> GrammarStats {
        let grammar_symbols = self
            .rule_index
            .values()
            .map(|&head| self.rule_body(head).len())
            .sum();

        GrammarStats {
            tokens: self.len(),
            grammar_symbols,
            rules: self.rule_index.len(),
        }
    }

    /// Checks digram uniqueness, rule utility, reference counts and
    /// reachability over the whole grammar.
    pub fn check_invariants(&self) -> Result<()> {
        let mut refs: HashMap<u32, u32> = HashMap::default();
        let mut digrams: HashMap<(SymbolValue, SymbolValue), Vec<DefaultKey>> =
            HashMap::default();

        for (&rule_id, &head) in &self.rule_index {
            let Symbol::RuleHead { rule_id: head_id, .. } = self.symbols[head].symbol else {
                return Err(Error::internal(format!("rule {} has no head", rule_id)));
            };
            if head_id != rule_id {
                return Err(Error::internal(format!(
                    "rule {} indexed under id {}",
                    head_id, rule_id
                )));
            }

            let body = self.rule_body(head);
            if rule_id != 0 && body.is_empty() {
                return Err(Error::internal(format!("rule {} is empty", rule_id)));
            }

            for (i, &key) in body.iter().enumerate() {
                if let Symbol::RuleRef { rule_id: target } = self.symbols[key].symbol {
                    if !self.rule_index.contains_key(&target) {
                        return Err(Error::internal(format!(
                            "rule {} references missing rule {}",
                            rule_id, target
                        )));
                    }
                    *refs.entry(target).or_default() += 1;
                }
                if let Some(&next) = body.get(i + 1) {
                    let pair = (
                        SymbolValue::of(&self.symbols[key].symbol),
                        SymbolValue::of(&self.symbols[next].symbol),
                    );
                    digrams.entry(pair).or_default().push(key);
                }
            }
        }

        for &rule_id in self.rule_index.keys() {
            if rule_id == 0 {
                continue;
            }
            let stored = self.rule_use_count(rule_id).unwrap_or(0);
            let actual = refs.get(&rule_id).copied().unwrap_or(0);
            if stored != actual {
                return Err(Error::internal(format!(
                    "rule {} records {} uses but is referenced {} times",
                    rule_id, stored, actual
                )));
            }
            if actual < 2 {
                return Err(Error::internal(format!(
                    "rule {} is used {} time(s)",
                    rule_id, actual
                )));
            }
        }

        for occurrences in digrams.values() {
            let overlapping_pair = occurrences.len() == 2 && {
                let (a, b) = (occurrences[0], occurrences[1]);
                self.symbols[a].next == Some(b) || self.symbols[b].next == Some(a)
            };
            if occurrences.len() > 1 && !overlapping_pair {
                return Err(Error::internal(format!(
                    "digram repeated {} times",
                    occurrences.len()
                )));
            }
        }

        // Every rule must be reachable from the top rule.
        let mut seen: HashSet<u32> = HashSet::default();
        let mut stack = vec![0u32];
        while let Some(rule_id) = stack.pop() {
            if !seen.insert(rule_id) {
                continue;
            }
            for key in self.rule_body(self.rule_index[&rule_id]) {
                if let Symbol::RuleRef { rule_id: target } = self.symbols[key].symbol {
                    stack.push(target);
                }
            }
        }
        if seen.len() != self.rule_index.len() {
            return Err(Error::internal(format!(
                "{} rule(s) unreachable from the top rule",
                self.rule_index.len() - seen.len()
            )));
        }

        let expanded = self.iter().count();
        if expanded != self.len() {
            return Err(Error::internal(format!(
                "grammar expands to {} tokens, {} were appended",
                expanded,
                self.len()
            )));
        }

        Ok(())
    }
}

/// Statistics about the induced grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarStats {
    /// Number of tokens appended
    pub tokens: usize,
    /// Total symbols across all rule bodies
    pub grammar_symbols: usize,
    /// Number of rules, including the top rule
    pub rules: usize,
}

impl GrammarStats {
    /// Returns grammar size relative to input size, as a percentage.
    pub fn compression_ratio(&self) -> f64 {
        if self.tokens == 0 {
            0.0
        } else {
            (self.grammar_symbols as f64 / self.tokens as f64) * 100.0
        }
    }
}

#[cfg(test)]
impl GrammarEngine {
    /// Freezes the engine without verifying it.
    pub(crate) fn force_finalized(&mut self) {
        self.state = EngineState::Finalized;
    }

    /// Adds a rule with body `labels` that nothing references.
    pub(crate) fn insert_orphan_rule(&mut self, rule_id: u32, labels: &[u32]) {
        let tail = self.symbols.insert(SymbolNode::new(Symbol::RuleTail));
        let head = self.symbols.insert(SymbolNode::new(Symbol::RuleHead {
            rule_id,
            count: 2,
            tail,
        }));

        let mut chain = vec![head];
        chain.extend(
            labels
                .iter()
                .map(|&label| self.symbols.insert(SymbolNode::new(Symbol::Terminal { label }))),
        );
        chain.push(tail);
        for pair in chain.windows(2) {
            self.symbols[pair[0]].next = Some(pair[1]);
            self.symbols[pair[1]].prev = Some(pair[0]);
        }
        self.rule_index.insert(rule_id, head);
    }
}

impl Default for GrammarEngine {
    fn default() -> Self {
        Self::new()
    }
}
