//! Rule extraction: turns a finalized [`GrammarEngine`] into an immutable
//! [`RuleTable`].
//!
//! Rules are renumbered in depth-first discovery order starting from the top
//! rule, so the same grammar always yields the same table no matter how the
//! engine recycled its internal ids.

use crate::error::{Error, Result};
use crate::sequitur::GrammarEngine;
use crate::symbol::Symbol;
use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use slotmap::DefaultKey;

/// One symbol of a rule body, as seen by downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleSymbol {
    Terminal(String),
    Rule(usize),
}

/// A single extracted rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarRuleRecord {
    /// Stable id; 0 is the top rule
    pub rule_id: usize,
    /// Symbols of the rule body
    pub body: Vec<RuleSymbol>,
    /// Terminal labels the rule expands to
    pub expanded: Vec<String>,
    /// Token-stream positions where the rule's expansion begins, ascending
    pub occurrences: Vec<usize>,
    /// Number of references to the rule across the grammar (1 for the top rule)
    pub use_frequency: usize,
    /// Deepest nesting level below the top rule
    pub level: usize,
}

impl GrammarRuleRecord {
    /// Display name, `R0` for the top rule.
    pub fn rule_name(&self) -> String {
        format!("R{}", self.rule_id)
    }

    /// Returns true for the top rule (id 0).
    pub fn is_top(&self) -> bool {
        self.rule_id == 0
    }

    /// The body with rules written as `R<id>`, e.g. `"R1 a R2"`.
    pub fn rule_string(&self) -> String {
        self.body
            .iter()
            .map(|symbol| match symbol {
                RuleSymbol::Terminal(label) => label.clone(),
                RuleSymbol::Rule(id) => format!("R{}", id),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The terminal expansion, labels separated by single spaces.
    pub fn expanded_rule_string(&self) -> String {
        self.expanded.join(" ")
    }

    /// Number of tokens the rule expands to.
    pub fn expanded_len(&self) -> usize {
        self.expanded.len()
    }

    /// Number of places the expansion occurs in the token stream.
    pub fn occurrence_count(&self) -> usize {
        self.occurrences.len()
    }
}

/// The read-only rule table of a finalized grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    records: Vec<GrammarRuleRecord>,
    original_indices: Vec<usize>,
}

impl RuleTable {
    /// Records sorted by rule id.
    pub fn records(&self) -> &[GrammarRuleRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GrammarRuleRecord> {
        self.records.iter()
    }

    pub fn get(&self, rule_id: usize) -> Option<&GrammarRuleRecord> {
        self.records
            .binary_search_by_key(&rule_id, |record| record.rule_id)
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn top(&self) -> Option<&GrammarRuleRecord> {
        self.get(0)
    }

    /// Number of rules, including the top rule.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Original series index of every token, by stream position.
    pub fn original_indices(&self) -> &[usize] {
        &self.original_indices
    }

    /// Largest occurrence count among the non-top rules.
    pub fn highest_frequency(&self) -> usize {
        self.records
            .iter()
            .filter(|record| !record.is_top())
            .map(GrammarRuleRecord::occurrence_count)
            .max()
            .unwrap_or(0)
    }

    /// A table holding only the records accepted by `keep`; the input is
    /// left untouched.
    pub(crate) fn filtered<F>(&self, mut keep: F) -> RuleTable
    where
        F: FnMut(&GrammarRuleRecord) -> bool,
    {
        RuleTable {
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
            original_indices: self.original_indices.clone(),
        }
    }
}

impl<'a> IntoIterator for &'a RuleTable {
    type Item = &'a GrammarRuleRecord;
    type IntoIter = std::slice::Iter<'a, GrammarRuleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Extracts the rule table from a finalized engine.
///
/// Fails with [`Error::NotFinalized`] while the engine is still building and
/// with [`Error::InternalConsistency`] if a rule is unreachable from the top.
pub fn extract(engine: &GrammarEngine) -> Result<RuleTable> {
    if !engine.is_finalized() {
        return Err(Error::NotFinalized);
    }

    let bodies: HashMap<u32, Vec<DefaultKey>> = engine
        .rule_index
        .iter()
        .map(|(&rule_id, &head)| (rule_id, engine.rule_body(head)))
        .collect();

    // Depth-first walk: number rules on first sight, record finish order
    let mut ids: HashMap<u32, usize> = HashMap::default();
    ids.insert(0, 0);
    let mut discovered = vec![0u32];
    let mut finished = Vec::with_capacity(bodies.len());
    let mut stack = vec![(0u32, 0usize)];

    while let Some((rule, pos)) = stack.pop() {
        let body = bodies
            .get(&rule)
            .ok_or_else(|| Error::internal(format!("reference to missing rule {}", rule)))?;

        if pos == body.len() {
            finished.push(rule);
            continue;
        }
        stack.push((rule, pos + 1));

        if let Symbol::RuleRef { rule_id: target } = engine.symbols[body[pos]].symbol {
            if !ids.contains_key(&target) {
                ids.insert(target, discovered.len());
                discovered.push(target);
                stack.push((target, 0));
            }
        }
    }

    if discovered.len() != bodies.len() {
        return Err(Error::internal(format!(
            "malformed grammar: {} rule(s) unreachable from the top rule",
            bodies.len() - discovered.len()
        )));
    }

    let n = discovered.len();
    let mut record_bodies: Vec<Vec<RuleSymbol>> = vec![Vec::new(); n];
    let mut expanded: Vec<Vec<String>> = vec![Vec::new(); n];

    // Children finish before their parents, so expansions are ready in time
    for &rule in &finished {
        let id = ids[&rule];
        for &key in &bodies[&rule] {
            match engine.symbols[key].symbol {
                Symbol::Terminal { label, .. } => {
                    let label = engine.label(label).to_string();
                    expanded[id].push(label.clone());
                    record_bodies[id].push(RuleSymbol::Terminal(label));
                }
                Symbol::RuleRef { rule_id } => {
                    let child = ids[&rule_id];
                    let child_expansion = expanded[child].clone();
                    expanded[id].extend(child_expansion);
                    record_bodies[id].push(RuleSymbol::Rule(child));
                }
                _ => return Err(Error::internal("guard symbol inside a rule body")),
            }
        }
    }

    // Parents before children: push every occurrence down one level
    let mut occurrences: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut levels = vec![0usize; n];
    if !engine.is_empty() {
        occurrences[0].push(0);
    }
    for &rule in finished.iter().rev() {
        let id = ids[&rule];
        let parent_starts = std::mem::take(&mut occurrences[id]);
        let mut offset = 0;
        for symbol in &record_bodies[id] {
            match symbol {
                RuleSymbol::Terminal(_) => offset += 1,
                RuleSymbol::Rule(child) => {
                    let child = *child;
                    occurrences[child].extend(parent_starts.iter().map(|start| start + offset));
                    levels[child] = levels[child].max(levels[id] + 1);
                    offset += expanded[child].len();
                }
            }
        }
        occurrences[id] = parent_starts;
    }

    let mut records = Vec::with_capacity(n);
    for (id, &rule) in discovered.iter().enumerate() {
        let use_frequency = if rule == 0 {
            1
        } else {
            engine.rule_use_count(rule).unwrap_or(0) as usize
        };
        let mut starts = std::mem::take(&mut occurrences[id]);
        starts.sort_unstable();

        records.push(GrammarRuleRecord {
            rule_id: id,
            body: std::mem::take(&mut record_bodies[id]),
            expanded: std::mem::take(&mut expanded[id]),
            occurrences: starts,
            use_frequency,
            level: levels[id],
        });
    }

    log::debug!("extracted {} rules", records.len());

    Ok(RuleTable {
        records,
        original_indices: engine.original_indices.clone(),
    })
}
