use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    batch::RowSelection,
    data::CellValue,
    dataset::Dataset,
    error::MergeError,
    matcher::MatchResult,
    profile::{MappingProfile, MappingRule, WriteMode},
};

/// The rule behind a candidate write, as carried into change records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRule {
    pub index: usize,
    pub source_column: String,
    pub write_mode: WriteMode,
    pub append_separator: String,
}

impl AppliedRule {
    fn from_rule(index: usize, rule: &MappingRule) -> Self {
        AppliedRule {
            index,
            source_column: rule.source_column.clone(),
            write_mode: rule.write_mode,
            append_separator: rule.append_separator.clone(),
        }
    }
}

/// A value some rule would write into a target cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub row: usize,
    pub column: String,
    pub value: CellValue,
    pub source: String,
    pub source_row: usize,
    pub rule: AppliedRule,
}

/// A rule that could not be planned for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanIssue {
    pub source: String,
    pub rule_index: Option<usize>,
    pub message: String,
    #[serde(skip)]
    pub error: MergeError,
}

impl PlanIssue {
    fn new(source: &str, rule_index: Option<usize>, error: MergeError) -> Self {
        PlanIssue {
            source: source.to_string(),
            rule_index,
            message: error.to_string(),
            error,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    /// Ordered by target row, then by rule order in the profile.
    pub candidates: Vec<Candidate>,
    pub issues: Vec<PlanIssue>,
}

/// Computes candidate writes for every matched row pair without touching the
/// target. Unmatched and ambiguous rows produce nothing.
pub fn plan(
    profile: &MappingProfile,
    matches: &[MatchResult],
    target: &Dataset,
    sources: &[Dataset],
) -> Plan {
    plan_rows(
        profile,
        matches,
        target,
        sources,
        &RowSelection::all(target.row_count()),
    )
}

/// Like [`plan`], restricted to the target rows in `selection`.
///
/// Each match result is paired with the one source dataset of the same name.
/// A result whose name resolves to no dataset, or to several, is reported as
/// an issue and planned no further.
pub fn plan_rows(
    profile: &MappingProfile,
    matches: &[MatchResult],
    target: &Dataset,
    sources: &[Dataset],
    selection: &RowSelection,
) -> Plan {
    let mut result = Plan::default();

    for matched in matches {
        let named = sources
            .iter()
            .filter(|s| s.name() == matched.source)
            .collect::<Vec<_>>();
        let source = match named.as_slice() {
            [source] => *source,
            [] => {
                result.issues.push(PlanIssue::new(
                    &matched.source,
                    None,
                    MergeError::schema(&matched.source, "<dataset not supplied>"),
                ));
                continue;
            }
            _ => {
                warn!("Skipping source '{}': name is not unique", matched.source);
                result.issues.push(PlanIssue::new(
                    &matched.source,
                    None,
                    MergeError::duplicate_dataset(&matched.source),
                ));
                continue;
            }
        };

        for (rule_index, rule) in profile.rules_for_source(source.name()) {
            let source_column = match source.require_column(&rule.source_column) {
                Ok(idx) => idx,
                Err(err) => {
                    warn!("Skipping rule {} for '{}': {err}", rule_index + 1, source.name());
                    result
                        .issues
                        .push(PlanIssue::new(source.name(), Some(rule_index), err));
                    continue;
                }
            };
            if !rule.create_target {
                if let Err(err) = target.require_column(&rule.target_column) {
                    warn!("Skipping rule {} for '{}': {err}", rule_index + 1, source.name());
                    result
                        .issues
                        .push(PlanIssue::new(source.name(), Some(rule_index), err));
                    continue;
                }
            }

            let applied = AppliedRule::from_rule(rule_index, rule);
            let before = result.candidates.len();
            let pairs = matched
                .matched_pairs()
                .filter(|(target_row, _)| selection.contains(*target_row));
            for (target_row, source_row) in pairs {
                let Some(raw) = source.cell(source_row, source_column).cloned() else {
                    let error = MergeError::MissingRow {
                        dataset: source.name().to_string(),
                        row: source_row,
                    };
                    warn!("Rule {} cannot read from '{}': {error}", rule_index + 1, source.name());
                    result
                        .issues
                        .push(PlanIssue::new(source.name(), Some(rule_index), error));
                    continue;
                };
                let value = match rule.transform {
                    Some(transform) => transform.apply(&raw).unwrap_or_else(|err| {
                        warn!(
                            "Transform {:?} failed for '{}' row {}: {err}; keeping original value",
                            transform,
                            source.name(),
                            source_row
                        );
                        raw.clone()
                    }),
                    None => raw,
                };
                result.candidates.push(Candidate {
                    row: target_row,
                    column: rule.target_column.clone(),
                    value,
                    source: source.name().to_string(),
                    source_row,
                    rule: applied.clone(),
                });
            }
            debug!(
                "Rule {} ({} -> {}, {}) planned {} candidate(s) from '{}'",
                rule_index + 1,
                rule.source_column,
                rule.target_column,
                rule.write_mode,
                result.candidates.len() - before,
                source.name()
            );
        }
    }

    result
        .candidates
        .sort_by_key(|candidate| (candidate.row, candidate.rule.index));
    info!(
        "Planned {} candidate write(s) with {} issue(s)",
        result.candidates.len(),
        result.issues.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        index::RowIndex,
        matcher::{MatchOutcome, RowMatch, match_rows},
        profile::KeyColumn,
        transform::Transform,
    };

    fn profile(rules: Vec<MappingRule>) -> MappingProfile {
        let mut profile = MappingProfile::new("test", vec![KeyColumn::new("SKU", "SKU")]);
        profile.rules = rules;
        profile
    }

    fn run(profile: &MappingProfile, target: &Dataset, sources: &[Dataset]) -> Plan {
        let target_index =
            RowIndex::build(target, &profile.target_key_columns(), &profile.key_options).unwrap();
        let matches = sources
            .iter()
            .map(|source| {
                let index = RowIndex::build(
                    source,
                    &profile.source_key_columns(source.name()),
                    &profile.key_options,
                )
                .unwrap();
                match_rows(&target_index, &index)
            })
            .collect::<Vec<_>>();
        plan(profile, &matches, target, sources)
    }

    fn target() -> Dataset {
        Dataset::from_records(
            "target",
            &["SKU", "Price", "Name"],
            &[vec!["A1", "", "shirt"], vec!["B2", "5", "hat"], vec!["C3", "", "sock"]],
        )
        .unwrap()
    }

    fn supplier() -> Dataset {
        Dataset::from_records(
            "supplier",
            &["SKU", "Price", "Name"],
            &[vec!["a1", "10", " Shirt "], vec!["B2", "12", "Hat"]],
        )
        .unwrap()
    }

    #[test]
    fn matched_rows_produce_candidates_in_rule_order() {
        let profile = profile(vec![
            MappingRule::new("Name", "Name", WriteMode::Overwrite).with_transform(Transform::Trim),
            MappingRule::new("Price", "Price", WriteMode::FillIfEmpty),
        ]);
        let plan = run(&profile, &target(), &[supplier()]);
        assert!(plan.issues.is_empty());
        let summary = plan
            .candidates
            .iter()
            .map(|c| (c.row, c.column.as_str(), c.value.as_display(), c.rule.index))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (0, "Name", "Shirt".to_string(), 0),
                (0, "Price", "10".to_string(), 1),
                (1, "Name", "Hat".to_string(), 0),
                (1, "Price", "12".to_string(), 1),
            ]
        );
    }

    #[test]
    fn missing_columns_become_issues_without_stopping_other_rules() {
        let profile = profile(vec![
            MappingRule::new("Cost", "Price", WriteMode::Overwrite),
            MappingRule::new("Price", "Discount", WriteMode::Overwrite),
            MappingRule::new("Price", "Price", WriteMode::Overwrite),
        ]);
        let plan = run(&profile, &target(), &[supplier()]);
        assert_eq!(plan.issues.len(), 2);
        assert_eq!(plan.issues[0].error, MergeError::schema("supplier", "Cost"));
        assert_eq!(plan.issues[1].error, MergeError::schema("target", "Discount"));
        assert_eq!(plan.candidates.len(), 2);
        assert!(plan.candidates.iter().all(|c| c.rule.index == 2));
    }

    #[test]
    fn create_target_rules_plan_new_columns() {
        let profile = profile(vec![
            MappingRule::new("Price", "Supplier Price", WriteMode::FillIfEmpty).creating_target(),
        ]);
        let plan = run(&profile, &target(), &[supplier()]);
        assert!(plan.issues.is_empty());
        assert_eq!(plan.candidates.len(), 2);
    }

    #[test]
    fn ambiguous_rows_are_not_planned() {
        let target = Dataset::from_records(
            "target",
            &["SKU", "Price", "Name"],
            &[vec!["A1", "", "x"], vec!["a1", "", "y"]],
        )
        .unwrap();
        let profile = profile(vec![MappingRule::new("Price", "Price", WriteMode::Overwrite)]);
        let plan = run(&profile, &target, &[supplier()]);
        assert!(plan.candidates.is_empty());
    }

    #[test]
    fn rules_bound_to_another_source_are_ignored() {
        let profile = profile(vec![
            MappingRule::new("Price", "Price", WriteMode::Overwrite).from_source("catalog"),
        ]);
        let plan = run(&profile, &target(), &[supplier()]);
        assert!(plan.candidates.is_empty());
        assert!(plan.issues.is_empty());
    }

    #[test]
    fn failing_transform_keeps_the_source_value() {
        let profile = profile(vec![
            MappingRule::new("Name", "Name", WriteMode::Overwrite).with_transform(Transform::Round(2)),
        ]);
        let plan = run(&profile, &target(), &[supplier()]);
        assert_eq!(plan.candidates[0].value, CellValue::text(" Shirt "));
    }

    fn single_match(source: &str, source_row: usize) -> MatchResult {
        MatchResult {
            source: source.to_string(),
            rows: vec![RowMatch {
                target_row: 0,
                outcome: MatchOutcome::Matched { source_row },
            }],
            unmatched_source_rows: Vec::new(),
            empty_key_rows: Vec::new(),
            ambiguous_keys: Vec::new(),
        }
    }

    #[test]
    fn sources_sharing_a_name_are_not_planned() {
        let profile = profile(vec![MappingRule::new("Price", "Price", WriteMode::Overwrite)]);
        let target = target();
        let first = Dataset::from_records("supplier", &["SKU", "Price"], &[vec!["A1", "10"]]).unwrap();
        let second = Dataset::from_records(
            "supplier",
            &["SKU", "Price"],
            &[vec!["X", "0"], vec!["B2", "20"]],
        )
        .unwrap();
        let plan = plan(
            &profile,
            &[single_match("supplier", 1)],
            &target,
            &[first, second],
        );
        assert!(plan.candidates.is_empty());
        assert_eq!(plan.issues[0].error, MergeError::duplicate_dataset("supplier"));
    }

    #[test]
    fn rows_outside_the_source_become_issues() {
        let profile = profile(vec![MappingRule::new("Price", "Price", WriteMode::Overwrite)]);
        let plan = plan(&profile, &[single_match("supplier", 7)], &target(), &[supplier()]);
        assert!(plan.candidates.is_empty());
        assert_eq!(
            plan.issues[0].error,
            MergeError::MissingRow {
                dataset: "supplier".to_string(),
                row: 7,
            }
        );
        assert_eq!(plan.issues[0].rule_index, Some(0));
    }

    #[test]
    fn unselected_rows_get_no_candidates() {
        let profile = profile(vec![MappingRule::new("Price", "Price", WriteMode::Overwrite)]);
        let target = target();
        let target_index =
            RowIndex::build(&target, &profile.target_key_columns(), &profile.key_options).unwrap();
        let supplier = supplier();
        let source_index =
            RowIndex::build(&supplier, &["SKU".to_string()], &profile.key_options).unwrap();
        let matches = [match_rows(&target_index, &source_index)];
        let selection = crate::batch::BatchFilter::Limit { limit: 1 }
            .select(&target, &profile.target_key_columns(), &profile.key_options)
            .unwrap();

        let plan = plan_rows(&profile, &matches, &target, &[supplier], &selection);
        let rows = plan.candidates.iter().map(|c| c.row).collect::<Vec<_>>();
        assert_eq!(rows, vec![0]);
    }
}
