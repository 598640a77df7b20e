//! A merge session: one validated profile driving the whole pipeline from
//! key indexing to the diff shown for approval.

use std::sync::Arc;

use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::{
    batch::RowSelection,
    dataset::Dataset,
    diff::{Diff, diff},
    error::{MergeError, MergeResult},
    executor::{self, Approval, CommitReport},
    index::RowIndex,
    matcher::{MatchResult, match_rows},
    planner::{Plan, plan_rows},
    profile::MappingProfile,
    summary::MergeSummary,
};

/// A source dataset that could not be matched at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceError {
    pub source: String,
    pub message: String,
    #[serde(skip)]
    pub error: MergeError,
}

/// Everything the preview layer needs before approval.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub target_rows: usize,
    /// Target rows inside the profile's batch.
    pub selection: RowSelection,
    pub matches: Vec<MatchResult>,
    pub plan: Plan,
    pub diff: Diff,
    pub source_errors: Vec<SourceError>,
}

impl Preview {
    pub fn summary(&self) -> MergeSummary {
        MergeSummary::for_selection(&self.selection, &self.matches, &self.diff)
    }

    pub fn approve_all(&self) -> Approval {
        Approval::all(&self.diff.records)
    }
}

#[derive(Debug, Clone)]
pub struct MergeSession {
    profile: Arc<MappingProfile>,
}

impl MergeSession {
    pub fn new(profile: MappingProfile) -> MergeResult<Self> {
        profile.validate()?;
        Ok(MergeSession {
            profile: Arc::new(profile),
        })
    }

    pub fn profile(&self) -> &MappingProfile {
        &self.profile
    }

    pub fn shared_profile(&self) -> Arc<MappingProfile> {
        Arc::clone(&self.profile)
    }

    /// A detached copy of the active profile. Edits take effect only through
    /// [`MergeSession::replace_profile`].
    pub fn edit_profile(&self) -> MappingProfile {
        self.profile.as_ref().clone()
    }

    pub fn replace_profile(&mut self, profile: MappingProfile) -> MergeResult<()> {
        profile.validate()?;
        self.profile = Arc::new(profile);
        Ok(())
    }

    /// Matches, plans and diffs without mutating anything.
    ///
    /// A source missing one of its key columns, or whose name is shared with
    /// another source or with the target, is reported in `source_errors` and
    /// skipped. A target missing a key column fails the whole preview.
    pub fn preview(&self, target: &Dataset, sources: &[Dataset]) -> MergeResult<Preview> {
        let profile = self.profile.as_ref();
        let target_keys = profile.target_key_columns();
        let target_index = RowIndex::build(target, &target_keys, &profile.key_options)?;
        let selection = profile.batch.select(target, &target_keys, &profile.key_options)?;
        if !profile.batch.is_all() {
            info!(
                "Batch {} selects {} of {} row(s)",
                profile.batch,
                selection.count(),
                target.row_count()
            );
        }

        let name_counts = sources.iter().map(Dataset::name).counts();
        let mut matches = Vec::with_capacity(sources.len());
        let mut source_errors = Vec::new();
        for source in sources {
            let built = if source.name() == target.name() || name_counts[source.name()] > 1 {
                Err(MergeError::duplicate_dataset(source.name()))
            } else {
                let key_columns = profile.source_key_columns(source.name());
                RowIndex::build(source, &key_columns, &profile.key_options)
            };
            match built {
                Ok(index) => matches.push(match_rows(&target_index, &index)),
                Err(error) => {
                    warn!("Skipping source '{}': {error}", source.name());
                    source_errors.push(SourceError {
                        source: source.name().to_string(),
                        message: error.to_string(),
                        error,
                    });
                }
            }
        }

        let plan = plan_rows(profile, &matches, target, sources, &selection);
        let diff = diff(target, &plan.candidates);
        info!(
            "Preview of '{}' ready: {} change record(s) from {} source(s)",
            target.name(),
            diff.records.len(),
            matches.len()
        );
        Ok(Preview {
            target_rows: target.row_count(),
            selection,
            matches,
            plan,
            diff,
            source_errors,
        })
    }

    pub fn commit(&self, target: &mut Dataset, preview: &Preview, approval: &Approval) -> CommitReport {
        executor::commit(target, &preview.diff.records, approval)
    }
}
