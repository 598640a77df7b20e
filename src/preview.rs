use anyhow::Result;
use log::info;

use crate::{
    cli::PreviewArgs,
    diff::{ChangeRecord, Classification},
    inputs, report, table,
};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let inputs = inputs::load(&args.inputs)?;
    let preview = inputs.session.preview(&inputs.target, &inputs.sources)?;
    let key_columns = inputs.session.profile().target_key_columns();

    let shown = |record: &&ChangeRecord| {
        args.all || record.classification != Classification::Unchanged
    };
    let selected = preview.diff.records.iter().filter(shown).collect::<Vec<_>>();
    let limit = if args.limit == 0 { selected.len() } else { args.limit };
    let rows = report::change_rows(
        &inputs.target,
        &key_columns,
        selected.iter().take(limit).copied(),
    );

    table::print_table(&report::headers(report::CHANGE_HEADERS), &rows);
    if selected.len() > rows.len() {
        println!("({} more change record(s) not shown)", selected.len() - rows.len());
    }
    println!();
    for issue in &preview.plan.issues {
        println!("Skipped: {}", issue.message);
    }
    for error in &preview.source_errors {
        println!("Source '{}' skipped: {}", error.source, error.message);
    }
    for result in &preview.matches {
        if !result.ambiguous_keys.is_empty() {
            println!(
                "Ambiguous keys in '{}': {}",
                result.source,
                result.ambiguous_keys.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
            );
        }
    }
    for line in report::summary_lines(&preview.summary()) {
        println!("{line}");
    }
    info!(
        "Previewed {} change record(s), displayed {}",
        preview.diff.records.len(),
        rows.len()
    );
    Ok(())
}
