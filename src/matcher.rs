//! Key-based row correspondence between a target and its sources.
//!
//! Every target row receives exactly one [`MatchOutcome`] per source. The
//! engine never picks between candidates: a key carried by several target
//! rows, or resolving to several source rows, is reported as
//! [`MatchOutcome::Ambiguous`] for manual resolution.

use std::collections::BTreeSet;

use log::info;
use serde::Serialize;

use crate::{index::RowIndex, key::Key};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched {
        source_row: usize,
    },
    Unmatched,
    Ambiguous {
        target_rows: Vec<usize>,
        source_rows: Vec<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowMatch {
    pub target_row: usize,
    pub outcome: MatchOutcome,
}

/// Correspondence of one target against one source.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub source: String,
    /// One entry per target row, in target order.
    pub rows: Vec<RowMatch>,
    /// Source rows never paired with a target row.
    pub unmatched_source_rows: Vec<usize>,
    /// Target rows whose key is empty and therefore never matched.
    pub empty_key_rows: Vec<usize>,
    /// Keys reported as ambiguous on either side.
    pub ambiguous_keys: Vec<Key>,
}

impl MatchResult {
    pub fn outcome(&self, target_row: usize) -> Option<&MatchOutcome> {
        self.rows.get(target_row).map(|m| &m.outcome)
    }

    /// `(target_row, source_row)` pairs for every single-hit match.
    pub fn matched_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().filter_map(|m| match m.outcome {
            MatchOutcome::Matched { source_row } => Some((m.target_row, source_row)),
            _ => None,
        })
    }

    pub fn matched_count(&self) -> usize {
        self.count(|o| matches!(o, MatchOutcome::Matched { .. }))
    }

    pub fn unmatched_count(&self) -> usize {
        self.count(|o| matches!(o, MatchOutcome::Unmatched))
    }

    pub fn ambiguous_count(&self) -> usize {
        self.count(|o| matches!(o, MatchOutcome::Ambiguous { .. }))
    }

    fn count(&self, predicate: impl Fn(&MatchOutcome) -> bool) -> usize {
        self.rows.iter().filter(|m| predicate(&m.outcome)).count()
    }
}

/// Matches `target` against `source` by exact normalized key equality.
pub fn match_rows(target: &RowIndex, source: &RowIndex) -> MatchResult {
    let mut outcomes: Vec<Option<MatchOutcome>> = vec![None; target.row_count()];
    let mut paired_source_rows = BTreeSet::new();
    let mut ambiguous_keys = Vec::new();

    for (key, target_rows) in target.entries() {
        let source_rows = source.rows_for(key);
        let outcome = match (target_rows, source_rows) {
            ([_], []) => MatchOutcome::Unmatched,
            ([_], [source_row]) => {
                paired_source_rows.insert(*source_row);
                MatchOutcome::Matched {
                    source_row: *source_row,
                }
            }
            _ => {
                ambiguous_keys.push(key.clone());
                MatchOutcome::Ambiguous {
                    target_rows: target_rows.to_vec(),
                    source_rows: source_rows.to_vec(),
                }
            }
        };
        for row in target_rows {
            outcomes[*row] = Some(outcome.clone());
        }
    }

    for (key, source_rows) in source.entries() {
        if source_rows.len() > 1 && target.rows_for(key).is_empty() {
            ambiguous_keys.push(key.clone());
        }
    }
    ambiguous_keys.sort();
    ambiguous_keys.dedup();

    let rows = outcomes
        .into_iter()
        .enumerate()
        .map(|(target_row, outcome)| RowMatch {
            target_row,
            outcome: outcome.unwrap_or(MatchOutcome::Unmatched),
        })
        .collect::<Vec<_>>();

    let unmatched_source_rows = (0..source.row_count())
        .filter(|row| !paired_source_rows.contains(row))
        .collect::<Vec<_>>();

    let result = MatchResult {
        source: source.dataset().to_string(),
        rows,
        unmatched_source_rows,
        empty_key_rows: target.empty_rows().to_vec(),
        ambiguous_keys,
    };
    info!(
        "Matched '{}' against '{}': {} matched, {} unmatched, {} ambiguous, {} source row(s) unused",
        target.dataset(),
        result.source,
        result.matched_count(),
        result.unmatched_count(),
        result.ambiguous_count(),
        result.unmatched_source_rows.len()
    );
    result
}

/// Matches every source independently against the same target.
pub fn match_sources<'a>(
    target: &RowIndex,
    sources: impl IntoIterator<Item = &'a RowIndex>,
) -> Vec<MatchResult> {
    sources
        .into_iter()
        .map(|source| match_rows(target, source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dataset::Dataset, key::KeyOptions};

    fn index(name: &str, keys: &[&str]) -> RowIndex {
        let records = keys.iter().map(|k| vec![*k]).collect::<Vec<_>>();
        let dataset = Dataset::from_records(name, &["SKU"], &records).unwrap();
        RowIndex::build(&dataset, &["SKU".to_string()], &KeyOptions::default()).unwrap()
    }

    #[test]
    fn single_hits_match_and_misses_stay_unmatched() {
        let result = match_rows(&index("target", &["A1", "B2"]), &index("src", &["b2 ", "C3"]));
        assert_eq!(result.outcome(0), Some(&MatchOutcome::Unmatched));
        assert_eq!(
            result.outcome(1),
            Some(&MatchOutcome::Matched { source_row: 0 })
        );
        assert_eq!(result.unmatched_source_rows, vec![1]);
        assert_eq!(result.matched_pairs().collect::<Vec<_>>(), vec![(1, 0)]);
    }

    #[test]
    fn duplicate_target_keys_are_ambiguous() {
        let result = match_rows(&index("target", &["A1", "a1"]), &index("src", &["A1"]));
        let expected = MatchOutcome::Ambiguous {
            target_rows: vec![0, 1],
            source_rows: vec![0],
        };
        assert_eq!(result.outcome(0), Some(&expected));
        assert_eq!(result.outcome(1), Some(&expected));
        assert_eq!(result.matched_count(), 0);
        assert_eq!(result.unmatched_source_rows, vec![0]);
        assert_eq!(result.ambiguous_keys.len(), 1);
    }

    #[test]
    fn duplicate_source_keys_are_ambiguous() {
        let result = match_rows(&index("target", &["A1"]), &index("src", &["A1", "A1 "]));
        assert_eq!(
            result.outcome(0),
            Some(&MatchOutcome::Ambiguous {
                target_rows: vec![0],
                source_rows: vec![0, 1],
            })
        );
        assert_eq!(result.unmatched_source_rows, vec![0, 1]);
    }

    #[test]
    fn empty_keys_never_match_each_other() {
        let result = match_rows(&index("target", &["", "A1"]), &index("src", &["", "A1"]));
        assert_eq!(result.outcome(0), Some(&MatchOutcome::Unmatched));
        assert_eq!(result.empty_key_rows, vec![0]);
        assert_eq!(result.unmatched_source_rows, vec![0]);
        assert_eq!(result.matched_count(), 1);
    }

    #[test]
    fn sources_are_matched_independently() {
        let target = index("target", &["A1", "B2"]);
        let first = index("first", &["A1"]);
        let second = index("second", &["B2"]);
        let results = match_sources(&target, [&first, &second]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, "first");
        assert_eq!(results[0].outcome(0), Some(&MatchOutcome::Matched { source_row: 0 }));
        assert_eq!(results[0].outcome(1), Some(&MatchOutcome::Unmatched));
        assert_eq!(results[1].outcome(0), Some(&MatchOutcome::Unmatched));
        assert_eq!(results[1].outcome(1), Some(&MatchOutcome::Matched { source_row: 0 }));
    }
}
