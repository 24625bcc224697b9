use crate::sequitur::{GrammarEngine, Repair};
use crate::symbol::{Symbol, SymbolNode};
use slotmap::DefaultKey;

impl GrammarEngine {
    /// Checks the digram starting at `first_key` and repairs a duplicate.
    ///
    /// Follow-up checks are pushed on the worklist instead of recursing.
    pub(crate) fn link_made(&mut self, first_key: DefaultKey) {
        let Some(match_key) = self.find_and_add_digram(first_key) else {
            return;
        };

        if let Some(rule_head) = self.get_complete_rule(match_key) {
            // The other occurrence already is a whole rule body: reuse it
            self.swap_for_existing_rule(first_key, rule_head);
        } else if let Some(rule_head) = self.get_complete_rule(first_key) {
            // The new occurrence is a whole rule body; the registered one goes
            let digram = self.digram_at(first_key);
            self.swap_for_existing_rule(match_key, rule_head);
            if let Some(digram) = digram {
                self.digram_index.insert(digram, first_key);
            }
        } else {
            self.swap_for_new_rule(first_key, match_key);
        }
    }

    /// Checks if a digram is a complete rule body (between RuleHead and RuleTail).
    ///
    /// Returns Some(RuleHead key) if it is. Rule 0 never qualifies.
    pub(crate) fn get_complete_rule(&self, first: DefaultKey) -> Option<DefaultKey> {
        let prev = self.symbols[first].prev?;
        let Symbol::RuleHead { rule_id, tail, .. } = self.symbols[prev].symbol else {
            return None;
        };
        if rule_id == 0 {
            return None;
        }

        let second = self.symbols[first].next?;
        if self.symbols[second].next == Some(tail) {
            Some(prev)
        } else {
            None
        }
    }

    /// Creates a new rule from two occurrences of the same digram and
    /// replaces both with a reference to it.
    pub(crate) fn swap_for_new_rule(&mut self, match1: DefaultKey, match2: DefaultKey) {
        debug_assert_ne!(match1, match2, "match1 and match2 should be different");

        let Some(digram) = self.digram_at(match1) else {
            return;
        };
        let Some(match1_second) = self.symbols[match1].next else {
            return;
        };

        let first_symbol = self.symbols[match1].symbol;
        let second_symbol = self.symbols[match1_second].symbol;

        let rule_id = self.allocate_rule_id();

        let tail_key = self.symbols.insert(SymbolNode::new(Symbol::RuleTail));
        let head_key = self.symbols.insert(SymbolNode::new(Symbol::RuleHead {
            rule_id,
            count: 0,
            tail: tail_key,
        }));
        let rule_first = self.symbols.insert(SymbolNode::new(first_symbol));
        let rule_second = self.symbols.insert(SymbolNode::new(second_symbol));

        // head -> first -> second -> tail
        self.symbols[head_key].next = Some(rule_first);
        self.symbols[rule_first].prev = Some(head_key);
        self.symbols[rule_first].next = Some(rule_second);
        self.symbols[rule_second].prev = Some(rule_first);
        self.symbols[rule_second].next = Some(tail_key);
        self.symbols[tail_key].prev = Some(rule_second);

        self.rule_index.insert(rule_id, head_key);

        // The registered occurrence now lives in the rule body
        self.remove_digram_from_index(match1);
        self.remove_digram_from_index(match2);
        self.digram_index.insert(digram, rule_first);

        self.increment_if_rule(rule_first);
        self.increment_if_rule(rule_second);

        log::trace!("created rule R{} for a repeated digram", rule_id);

        self.swap_for_existing_rule(match2, head_key);
        self.swap_for_existing_rule(match1, head_key);
    }

    /// Replaces the digram starting at `first` with a reference to the rule
    /// headed by `rule_head`.
    ///
    /// Returns the key of the newly inserted RuleRef, or None if `first`
    /// does not start a digram.
    pub(crate) fn swap_for_existing_rule(
        &mut self,
        first: DefaultKey,
        rule_head: DefaultKey,
    ) -> Option<DefaultKey> {
        let second = self.symbols[first].next?;
        let Symbol::RuleHead { rule_id, .. } = self.symbols[rule_head].symbol else {
            return None;
        };

        let before_digram = self.symbols[first].prev;
        let after_digram = self.symbols[second].next;

        // Remove every digram touching the replaced span
        if let Some(prev) = before_digram {
            self.remove_digram_from_index(prev);
        }
        self.remove_digram_from_index(first);
        self.remove_digram_from_index(second);

        self.decrement_if_rule(first);
        self.decrement_if_rule(second);

        let new_rule_key = self
            .symbols
            .insert(SymbolNode::new(Symbol::RuleRef { rule_id }));

        self.symbols[new_rule_key].prev = before_digram;
        self.symbols[new_rule_key].next = after_digram;

        if let Some(prev) = before_digram {
            self.symbols[prev].next = Some(new_rule_key);
        }
        if let Some(next) = after_digram {
            self.symbols[next].prev = Some(new_rule_key);
        }

        self.increment_rule_count(rule_head);

        self.symbols.remove(first);
        self.symbols.remove(second);

        // Boundary digrams: the two new ones plus their outer neighbours,
        // which may have been hidden behind an overlapping occurrence.
        self.queue_boundary(before_digram, Some(new_rule_key), after_digram);

        // Uses of rules inside the body may have dropped to one
        for key in self.rule_body(rule_head) {
            self.pending.push(Repair::Utility(key));
        }

        Some(new_rule_key)
    }

    /// Expands a rule inline if it's only used once (rule utility constraint).
    pub(crate) fn expand_rule_if_necessary(&mut self, potential_rule: DefaultKey) {
        let Some(node) = self.symbols.get(potential_rule) else {
            return;
        };
        let Symbol::RuleRef { rule_id } = node.symbol else {
            return;
        };
        let Some(&rule_head) = self.rule_index.get(&rule_id) else {
            return;
        };
        let Symbol::RuleHead { count, tail, .. } = self.symbols[rule_head].symbol else {
            return;
        };

        debug_assert!(count > 0, "Rule count should never be 0");
        if count != 1 {
            return;
        }

        let (Some(rule_first), Some(rule_last)) =
            (self.symbols[rule_head].next, self.symbols[tail].prev)
        else {
            return;
        };

        let before_rule = self.symbols[potential_rule].prev;
        let after_rule = self.symbols[potential_rule].next;

        if let Some(prev) = before_rule {
            self.remove_digram_from_index(prev);
        }
        self.remove_digram_from_index(potential_rule);

        self.rule_index.remove(&rule_id);
        self.release_rule_id(rule_id);
        self.symbols.remove(rule_head);
        self.symbols.remove(tail);

        // Splice the body in place of the reference
        self.symbols[rule_first].prev = before_rule;
        self.symbols[rule_last].next = after_rule;
        if let Some(prev) = before_rule {
            self.symbols[prev].next = Some(rule_first);
        }
        if let Some(next) = after_rule {
            self.symbols[next].prev = Some(rule_last);
        }

        self.symbols.remove(potential_rule);

        log::trace!("inlined rule R{} used only once", rule_id);

        self.queue_boundary(before_rule, None, after_rule);
        self.pending.push(Repair::Link(rule_last));
    }

    /// Queues digram checks around a span that was just rewritten.
    fn queue_boundary(
        &mut self,
        before: Option<DefaultKey>,
        inserted: Option<DefaultKey>,
        after: Option<DefaultKey>,
    ) {
        if let Some(after) = after {
            self.pending.push(Repair::Link(after));
        }
        if let Some(inserted) = inserted {
            self.pending.push(Repair::Link(inserted));
        }
        if let Some(before) = before {
            if let Some(outer) = self.symbols[before].prev {
                self.pending.push(Repair::Link(outer));
            }
            self.pending.push(Repair::Link(before));
        }
    }

    /// Increments the count of a rule if the symbol is a RuleRef.
    fn increment_if_rule(&mut self, key: DefaultKey) {
        if let Symbol::RuleRef { rule_id } = self.symbols[key].symbol {
            if let Some(&head_key) = self.rule_index.get(&rule_id) {
                self.increment_rule_count(head_key);
            }
        }
    }

    /// Decrements the count of a rule if the symbol is a RuleRef.
    fn decrement_if_rule(&mut self, key: DefaultKey) {
        if let Symbol::RuleRef { rule_id } = self.symbols[key].symbol {
            if let Some(&head_key) = self.rule_index.get(&rule_id) {
                self.decrement_rule_count(head_key);
            }
        }
    }

    fn increment_rule_count(&mut self, head_key: DefaultKey) {
        if let Symbol::RuleHead { count, .. } = &mut self.symbols[head_key].symbol {
            *count += 1;
        }
    }

    fn decrement_rule_count(&mut self, head_key: DefaultKey) {
        if let Symbol::RuleHead { count, .. } = &mut self.symbols[head_key].symbol {
            debug_assert!(*count > 0, "Cannot decrement count below 0");
            *count -= 1;
        }
    }
}
