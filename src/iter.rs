use crate::sequitur::GrammarEngine;
use crate::symbol::{Symbol, Token};
use slotmap::DefaultKey;

/// Iterator that reconstructs the token labels by expanding rules.
///
/// Uses a stack of the RuleRefs currently being expanded.
pub struct GrammarIter<'a> {
    engine: &'a GrammarEngine,
    current: Option<DefaultKey>,
    stack: Vec<DefaultKey>,
}

impl<'a> GrammarIter<'a> {
    pub(crate) fn new(engine: &'a GrammarEngine) -> Self {
        let mut stack = Vec::new();
        let start = engine
            .rule_index
            .get(&0)
            .and_then(|&head| engine.symbols[head].next);
        let current = start.and_then(|key| Self::resolve_forward(engine, key, &mut stack));

        Self {
            engine,
            current,
            stack,
        }
    }

    /// Walks forward from `key` to the next Terminal, descending into rules
    /// and climbing out of finished ones.
    fn resolve_forward(
        engine: &GrammarEngine,
        mut key: DefaultKey,
        stack: &mut Vec<DefaultKey>,
    ) -> Option<DefaultKey> {
        loop {
            match engine.symbols[key].symbol {
                Symbol::Terminal { .. } => return Some(key),

                Symbol::RuleRef { rule_id } => {
                    stack.push(key);
                    let rule_head = *engine.rule_index.get(&rule_id)?;
                    key = engine.symbols[rule_head].next?;
                }

                Symbol::RuleHead { .. } => {
                    key = engine.symbols[key].next?;
                }

                Symbol::RuleTail => {
                    // End of rule: resume after the reference that entered it
                    let parent = stack.pop()?;
                    key = engine.symbols[parent].next?;
                }
            }
        }
    }
}

impl<'a> Iterator for GrammarIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current_key = self.current?;

        let Symbol::Terminal { label, .. } = self.engine.symbols[current_key].symbol else {
            unreachable!("resolve_forward should only stop at terminals");
        };

        self.current = self.engine.symbols[current_key]
            .next
            .and_then(|next| Self::resolve_forward(self.engine, next, &mut self.stack));

        Some(self.engine.label(label))
    }
}

impl GrammarEngine {
    /// Returns an iterator over the labels the grammar expands to.
    pub fn iter(&self) -> GrammarIter<'_> {
        GrammarIter::new(self)
    }

    /// Rebuilds the appended tokens from the grammar.
    pub fn tokens(&self) -> Vec<Token> {
        self.iter()
            .zip(&self.original_indices)
            .map(|(label, &index)| Token::new(label, index))
            .collect()
    }
}

impl<'a> IntoIterator for &'a GrammarEngine {
    type Item = &'a str;
    type IntoIter = GrammarIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::sequitur::GrammarEngine;
    use crate::symbol::Token;

    fn build(labels: &[&str]) -> GrammarEngine {
        let mut engine = GrammarEngine::new();
        for (i, label) in labels.iter().enumerate() {
            engine.append_token(Token::new(*label, i * 2)).unwrap();
        }
        engine
    }

    #[test]
    fn test_iter_empty() {
        let engine = GrammarEngine::new();
        assert_eq!(engine.iter().count(), 0);
    }

    #[test]
    fn test_iter_single() {
        let engine = build(&["abc"]);
        assert_eq!(engine.iter().collect::<Vec<_>>(), vec!["abc"]);
    }

    #[test]
    fn test_iter_with_repetition() {
        let words = ["ba", "cc", "ba", "cc", "ab", "ba", "cc"];
        let engine = build(&words);
        assert!(engine.rule_count() > 1);
        assert_eq!(engine.iter().collect::<Vec<_>>(), words);
    }

    #[test]
    fn test_tokens_roundtrip() {
        let engine = build(&["a", "b", "a", "b", "c"]);
        let tokens = engine.tokens();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[2], Token::new("a", 4));
        assert_eq!(tokens[4], Token::new("c", 8));
    }

    #[test]
    fn test_into_iterator() {
        let engine = build(&["x", "y", "x", "y"]);
        let collected: Vec<&str> = (&engine).into_iter().collect();
        assert_eq!(collected, vec!["x", "y", "x", "y"]);
    }
}
