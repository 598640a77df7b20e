use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    cli::MergeInputArgs, dataset::Dataset, io_utils, profile::MappingProfile,
    session::MergeSession,
};

/// Everything `preview` and `merge` read before the engine runs.
pub struct MergeInputs {
    pub session: MergeSession,
    pub target: Dataset,
    pub sources: Vec<Dataset>,
    pub delimiter: u8,
}

pub fn load(args: &MergeInputArgs) -> Result<MergeInputs> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let mut profile = MappingProfile::load(&args.profile)
        .with_context(|| format!("Loading profile from {:?}", args.profile))?;
    if let Some(batch) = args.batch() {
        info!("Restricting the merge to {batch}");
        profile.batch = batch;
    }
    let session = MergeSession::new(profile)?;

    if io_utils::is_dash(&args.target) && args.sources.iter().any(|s| io_utils::is_dash(&s.path)) {
        return Err(anyhow!("Only one input can be read from stdin"));
    }
    let delimiter = io_utils::resolve_input_delimiter(&args.target, args.delimiter);
    let mut target = io_utils::read_dataset(&args.target, "target", delimiter, encoding)?;
    for (column, column_type) in &args.column_types {
        target
            .set_column_type(column, *column_type)
            .with_context(|| format!("Declaring type of column '{column}'"))?;
    }

    let mut sources: Vec<Dataset> = Vec::with_capacity(args.sources.len());
    for spec in &args.sources {
        if spec.name == target.name() || sources.iter().any(|s| s.name() == spec.name) {
            return Err(anyhow!("Source name '{}' is used more than once", spec.name));
        }
        let source_delimiter = io_utils::resolve_input_delimiter(&spec.path, args.delimiter);
        sources.push(io_utils::read_dataset(
            &spec.path,
            &spec.name,
            source_delimiter,
            encoding,
        )?);
    }

    info!(
        "Loaded target {:?} ({} row(s)) and {} source(s) with profile '{}'",
        args.target,
        target.row_count(),
        sources.len(),
        session.profile().name
    );
    Ok(MergeInputs {
        session,
        target,
        sources,
        delimiter,
    })
}
