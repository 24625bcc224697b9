use crate::sequitur::GrammarEngine;
use crate::symbol::{Symbol, SymbolValue};
use slotmap::DefaultKey;

pub(crate) type DigramKey = (SymbolValue, SymbolValue);

impl GrammarEngine {
    /// Returns the value of the digram starting at `first`.
    ///
    /// None for stale keys and for pairs touching a rule guard.
    pub(crate) fn digram_at(&self, first: DefaultKey) -> Option<DigramKey> {
        let node = self.symbols.get(first)?;
        if node.symbol.is_guard() {
            return None;
        }
        let second = self.symbols.get(node.next?)?;
        if matches!(second.symbol, Symbol::RuleTail) {
            return None;
        }
        Some((SymbolValue::of(&node.symbol), SymbolValue::of(&second.symbol)))
    }

    /// Finds an existing digram or adds it to the index.
    ///
    /// Returns Some(key) if a non-overlapping occurrence is registered
    /// elsewhere, None otherwise.
    pub(crate) fn find_and_add_digram(&mut self, first: DefaultKey) -> Option<DefaultKey> {
        let digram = self.digram_at(first)?;

        let Some(&other) = self.digram_index.get(&digram) else {
            self.digram_index.insert(digram, first);
            return None;
        };

        if other == first {
            return None;
        }

        // The registered occurrence was destroyed or rewritten; take its place.
        if self.digram_at(other) != Some(digram) {
            self.digram_index.insert(digram, first);
            return None;
        }

        // Overlapping occurrences such as the two "aa" in "aaa" are left alone
        let second = self.symbols[first].next;
        let other_second = self.symbols[other].next;
        if other_second == Some(first) || second == Some(other) {
            return None;
        }

        Some(other)
    }

    /// Removes a digram from the index if it points to the given location.
    pub(crate) fn remove_digram_from_index(&mut self, first: DefaultKey) {
        let Some(digram) = self.digram_at(first) else {
            return;
        };

        if self.digram_index.get(&digram) == Some(&first) {
            self.digram_index.remove(&digram);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolNode;

    /// Links loose terminals into Rule 0 without running any repairs.
    fn engine_with(labels: &[u32]) -> (GrammarEngine, Vec<DefaultKey>) {
        let mut engine = GrammarEngine::new();
        let head = engine.rule_index[&0];
        let tail = engine.sequence_end;

        let keys: Vec<DefaultKey> = labels
            .iter()
            .map(|&label| engine.symbols.insert(SymbolNode::new(Symbol::Terminal { label })))
            .collect();

        let mut chain = vec![head];
        chain.extend(keys.iter().copied());
        chain.push(tail);
        for pair in chain.windows(2) {
            engine.symbols[pair[0]].next = Some(pair[1]);
            engine.symbols[pair[1]].prev = Some(pair[0]);
        }
        (engine, keys)
    }

    #[test]
    fn test_guards_are_not_digrams() {
        let (engine, keys) = engine_with(&[0, 1, 0]);
        let head = engine.rule_index[&0];
        assert!(engine.digram_at(head).is_none());
        assert!(engine.digram_at(keys[2]).is_none());
        assert!(engine.digram_at(keys[0]).is_some());
    }

    #[test]
    fn test_first_occurrence_is_registered() {
        let (mut engine, keys) = engine_with(&[0, 1, 0]);
        assert_eq!(engine.find_and_add_digram(keys[0]), None);
        assert_eq!(engine.digram_index.len(), 1);
        // Asking again for the same location is not a match
        assert_eq!(engine.find_and_add_digram(keys[0]), None);
    }

    #[test]
    fn test_repeated_digram_matches() {
        let (mut engine, keys) = engine_with(&[0, 1, 0, 1]);
        assert_eq!(engine.find_and_add_digram(keys[0]), None);
        assert_eq!(engine.find_and_add_digram(keys[2]), Some(keys[0]));
    }

    #[test]
    fn test_overlapping_digrams_do_not_match() {
        let (mut engine, keys) = engine_with(&[0, 0, 0]);
        assert_eq!(engine.find_and_add_digram(keys[0]), None);
        assert_eq!(engine.find_and_add_digram(keys[1]), None);
        assert_eq!(engine.digram_index.values().next(), Some(&keys[0]));
    }

    #[test]
    fn test_remove_only_exact_location() {
        let (mut engine, keys) = engine_with(&[0, 1, 0]);
        engine.find_and_add_digram(keys[0]);

        // (b, a) was never registered, removing it must not touch (a, b)
        engine.remove_digram_from_index(keys[1]);
        assert_eq!(engine.digram_index.len(), 1);

        engine.remove_digram_from_index(keys[0]);
        assert!(engine.digram_index.is_empty());
    }

    #[test]
    fn test_stale_entry_is_replaced() {
        let (mut engine, keys) = engine_with(&[0, 1, 0, 1]);
        engine.find_and_add_digram(keys[0]);

        // Rewrite the registered occurrence behind the index's back
        engine.symbols[keys[1]].symbol = Symbol::Terminal { label: 9 };

        assert_eq!(engine.find_and_add_digram(keys[2]), None);
        let digram = engine.digram_at(keys[2]).unwrap();
        assert_eq!(engine.digram_index[&digram], keys[2]);
    }
}
