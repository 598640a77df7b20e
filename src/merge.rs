use anyhow::{Context, Result};
use log::{info, warn};

use crate::{cli::MergeArgs, inputs, io_utils, report};

pub fn execute(args: &MergeArgs) -> Result<()> {
    let inputs::MergeInputs {
        session,
        mut target,
        sources,
        delimiter,
    } = inputs::load(&args.inputs)?;
    let output_delimiter =
        io_utils::resolve_output_delimiter(args.output.as_deref(), args.output_delimiter, delimiter);
    let output_encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;

    let preview = session.preview(&target, &sources)?;
    for issue in &preview.plan.issues {
        warn!("{}", issue.message);
    }
    let mut approval = preview.approve_all();
    for column in &args.skip_columns {
        let rejected = approval.reject_column(column);
        info!("Rejected {rejected} change(s) to column '{column}'");
    }

    // The change log and unmatched list describe the target as it was read.
    let key_columns = session.profile().target_key_columns();
    let original = target.clone();
    let commit_report = session.commit(&mut target, &preview, &approval);
    for error in &commit_report.errors {
        warn!("{}", error.message);
    }

    io_utils::write_dataset(&target, args.output.as_deref(), output_delimiter, output_encoding)
        .context("Writing merged output")?;

    if let Some(path) = &args.change_log {
        let rows = report::change_rows(&original, &key_columns, &commit_report.applied);
        io_utils::write_csv(
            Some(path.as_path()),
            &report::headers(report::CHANGE_HEADERS),
            &rows,
            io_utils::resolve_output_delimiter(Some(path.as_path()), None, output_delimiter),
            output_encoding,
        )
        .with_context(|| format!("Writing change log to {path:?}"))?;
        info!("Change log with {} change(s) written to {:?}", rows.len(), path);
    }

    if let Some(path) = &args.unmatched_log {
        let rows = report::unmatched_rows(
            &original,
            &key_columns,
            &preview.matches,
            &preview.selection,
        );
        io_utils::write_csv(
            Some(path.as_path()),
            &report::headers(report::UNMATCHED_HEADERS),
            &rows,
            io_utils::resolve_output_delimiter(Some(path.as_path()), None, output_delimiter),
            output_encoding,
        )
        .with_context(|| format!("Writing unmatched rows to {path:?}"))?;
        info!("{} unmatched row(s) written to {:?}", rows.len(), path);
    }

    let summary = preview.summary();
    info!(
        "Merge complete: {} cell(s) applied, {} row(s) changed, {:.1}% matched, {} error(s)",
        commit_report.applied.len(),
        summary.rows_with_changes,
        summary.match_percent,
        commit_report.errors.len()
    );
    Ok(())
}
