use crate::coverage::build_coverage;
use crate::extract::{extract, RuleTable};
use crate::intervals::IntervalMapper;
use crate::prune::{PruningPolicy, RulePruner};
use crate::sequitur::GrammarEngine;
use crate::symbol::Token;
use proptest::prelude::*;

const LABELS: [&str; 4] = ["a", "b", "c", "d"];

/// Maps raw bytes onto a four-letter alphabet so repeats are common.
fn labels_of(input: &[u8]) -> Vec<&'static str> {
    input.iter().map(|&b| LABELS[(b % 4) as usize]).collect()
}

/// Builds and finalizes an engine; token `i` starts at sample `i * stride`.
fn build(labels: &[&str], stride: usize) -> GrammarEngine {
    let mut engine = GrammarEngine::new();
    for (i, label) in labels.iter().enumerate() {
        engine.append_token(Token::new(*label, i * stride)).unwrap();
    }
    engine.finalize().unwrap();
    engine
}

/// Every occurrence of every rule spells the rule's expansion in the input.
fn assert_occurrences_match(table: &RuleTable, labels: &[&str]) {
    for record in table {
        let k = record.expanded_len();
        for &p in &record.occurrences {
            let window: Vec<&str> = labels[p..p + k].to_vec();
            assert_eq!(
                window,
                record.expanded,
                "{} at {} does not match the input",
                record.rule_name(),
                p
            );
        }
    }
}

proptest! {
    /// Property 1: Roundtrip fidelity
    /// Expanding the top rule reproduces the token labels.
    #[test]
    fn prop_roundtrip(input in prop::collection::vec(0u8..4, 0..200)) {
        let labels = labels_of(&input);
        let engine = build(&labels, 1);
        let reconstructed: Vec<&str> = engine.iter().collect();
        prop_assert_eq!(reconstructed, labels);
    }

    /// Property 2: Invariants hold after every append, not just at the end
    #[test]
    fn prop_invariants_each_step(input in prop::collection::vec(0u8..3, 0..80)) {
        let mut engine = GrammarEngine::new();
        for (i, label) in labels_of(&input).into_iter().enumerate() {
            engine.append_token(Token::new(label, i)).unwrap();
            prop_assert!(engine.check_invariants().is_ok());
        }
    }

    /// Property 3: Rule utility as seen through the rule table
    #[test]
    fn prop_rule_utility(input in prop::collection::vec(0u8..4, 0..200)) {
        let table = extract(&build(&labels_of(&input), 1)).unwrap();
        for record in table.iter().filter(|r| !r.is_top()) {
            prop_assert!(record.use_frequency >= 2);
            prop_assert!(record.occurrence_count() >= 2);
            prop_assert!(record.expanded_len() >= 2);
        }
        let top = table.top().unwrap();
        prop_assert_eq!(top.use_frequency, 1);
        prop_assert_eq!(top.expanded_len(), input.len());
    }

    /// Property 4: Occurrences point at real copies of the expansion
    #[test]
    fn prop_occurrences_match_input(input in prop::collection::vec(0u8..4, 0..200)) {
        let labels = labels_of(&input);
        let table = extract(&build(&labels, 1)).unwrap();
        assert_occurrences_match(&table, &labels);
        for record in &table {
            prop_assert!(record.occurrences.windows(2).all(|w| w[0] < w[1]));
        }
    }

    /// Property 5: Extraction is a pure read
    #[test]
    fn prop_extract_idempotent(input in prop::collection::vec(0u8..4, 0..150)) {
        let engine = build(&labels_of(&input), 1);
        prop_assert_eq!(extract(&engine).unwrap(), extract(&engine).unwrap());
    }

    /// Property 6: Interval length follows from stride and window
    #[test]
    fn prop_interval_lengths(
        input in prop::collection::vec(0u8..3, 1..120),
        stride in 1usize..4,
        window in 1usize..6,
    ) {
        let labels = labels_of(&input);
        let engine = build(&labels, stride);
        let table = extract(&engine).unwrap();
        let series_len = (labels.len() - 1) * stride + window;
        let intervals = IntervalMapper::new(window, series_len)
            .unwrap()
            .map(&table)
            .unwrap();

        for record in &table {
            let k = record.expanded_len();
            for interval in &intervals.get(record.rule_id).unwrap().intervals {
                prop_assert_eq!(interval.len(), (k - 1) * stride + window);
                prop_assert!(interval.end <= series_len);
            }
        }
    }

    /// Property 7: Coverage mass equals total interval length
    #[test]
    fn prop_coverage_total(
        input in prop::collection::vec(0u8..3, 1..120),
        window in 1usize..6,
    ) {
        let labels = labels_of(&input);
        let table = extract(&build(&labels, 1)).unwrap();
        let series_len = labels.len() - 1 + window;
        let intervals = IntervalMapper::new(window, series_len)
            .unwrap()
            .map(&table)
            .unwrap();

        let coverage = build_coverage(series_len, intervals.motif_intervals()).unwrap();
        let expected: u64 = intervals.motif_intervals().map(|i| i.len() as u64).sum();
        prop_assert_eq!(coverage.len(), series_len);
        prop_assert_eq!(coverage.total(), expected);
    }

    /// Property 8: Pruning only ever removes whole records
    #[test]
    fn prop_pruning_is_subset(
        input in prop::collection::vec(0u8..3, 1..120),
        threshold in -2i64..6,
    ) {
        let labels = labels_of(&input);
        let table = extract(&build(&labels, 1)).unwrap();
        let intervals = IntervalMapper::new(1, labels.len())
            .unwrap()
            .map(&table)
            .unwrap();

        for policy in [
            PruningPolicy::MinimalMotif,
            PruningPolicy::DescriptionLength { threshold },
            PruningPolicy::GreedyCover,
        ] {
            let pruned = RulePruner::new(policy)
                .prune(&table, &intervals, labels.len())
                .unwrap();
            prop_assert!(pruned.top().is_some());
            for record in &pruned {
                prop_assert_eq!(Some(record), table.get(record.rule_id));
            }
        }
    }
}

/// Bolero fuzz test: Building never panics and always round-trips
#[cfg(test)]
#[test]
fn fuzz_no_panic() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let labels = labels_of(input);
        let mut engine = GrammarEngine::new();
        for (i, label) in labels.iter().enumerate() {
            engine.append_token(Token::new(*label, i)).unwrap();
        }

        let _ = engine.len();
        let _ = engine.is_empty();
        let reconstructed: Vec<&str> = engine.iter().collect();
        assert_eq!(reconstructed, labels);

        engine.finalize().unwrap();
        assert!(extract(&engine).is_ok());
    });
}

/// Bolero fuzz test: Rule utility is always maintained
#[cfg(test)]
#[test]
fn fuzz_rule_utility() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let labels = labels_of(input);
        let table = extract(&build(&labels, 1)).unwrap();
        for record in table.iter().filter(|r| !r.is_top()) {
            assert!(
                record.use_frequency >= 2,
                "{} has use frequency {}, violates rule utility constraint",
                record.rule_name(),
                record.use_frequency
            );
        }
        assert_occurrences_match(&table, &labels);
    });
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::extract::RuleSymbol;

    #[test]
    fn test_repeated_pair() {
        let labels = ["a", "b", "a", "b", "a", "b"];
        let table = extract(&build(&labels, 1)).unwrap();

        assert_eq!(table.len(), 2);
        let r1 = table.get(1).unwrap();
        assert_eq!(r1.expanded_rule_string(), "a b");
        assert_eq!(r1.use_frequency, 3);
        assert_eq!(r1.occurrences, vec![0, 2, 4]);

        let top = table.top().unwrap();
        assert_eq!(top.body, vec![RuleSymbol::Rule(1); 3]);
        assert_eq!(top.expanded_rule_string(), "a b a b a b");
    }

    #[test]
    fn test_no_repeats_no_rules() {
        let table = extract(&build(&["a", "b", "c", "d"], 1)).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.top().unwrap().rule_string(), "a b c d");
        assert_eq!(table.highest_frequency(), 0);
    }

    #[test]
    fn test_pruner_floor_matches_utility() {
        // Nothing survives induction below two occurrences, so the minimal
        // motif policy has nothing left to drop.
        let labels = ["a", "b", "c", "a", "b", "d", "a", "b", "c"];
        let table = extract(&build(&labels, 1)).unwrap();
        assert!(table
            .iter()
            .filter(|r| !r.is_top())
            .all(|r| r.occurrence_count() >= 2));

        let intervals = IntervalMapper::new(1, labels.len())
            .unwrap()
            .map(&table)
            .unwrap();
        let pruned = RulePruner::default()
            .prune(&table, &intervals, labels.len())
            .unwrap();
        assert_eq!(pruned, table);
    }

    #[test]
    fn test_nested_rules() {
        let labels = ["a", "b", "c", "d", "b", "c", "a", "b", "c", "d", "b", "c"];
        let engine = build(&labels, 1);
        let table = extract(&engine).unwrap();

        assert_occurrences_match(&table, &labels);
        assert!(table.iter().any(|r| r.level >= 2));
        assert_eq!(engine.iter().collect::<Vec<_>>(), labels.to_vec());
    }
}
