use anyhow::{Context, Result};
use log::info;

use crate::{cli::ProfileArgs, profile::MappingProfile, table};

pub fn execute(args: &ProfileArgs) -> Result<()> {
    let profile = MappingProfile::load(&args.profile)
        .with_context(|| format!("Loading profile from {:?}", args.profile))?;

    if args.print {
        print!("{}", profile.to_yaml_string()?);
        return Ok(());
    }

    let keys = profile
        .key_columns
        .iter()
        .map(|k| format!("{} <- {}", k.target, k.source))
        .collect::<Vec<_>>();
    println!("Profile:  {}", profile.name);
    println!("Keys:     {}", keys.join(", "));
    for (source, columns) in &profile.source_keys {
        println!("Keys for '{source}': {}", columns.join(", "));
    }

    let headers = ["#", "source", "source_column", "target_column", "write_mode", "transform", "enabled"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = profile
        .rules
        .iter()
        .enumerate()
        .map(|(idx, rule)| {
            vec![
                (idx + 1).to_string(),
                rule.source.clone().unwrap_or_else(|| "*".to_string()),
                rule.source_column.clone(),
                rule.target_column.clone(),
                rule.write_mode.to_string(),
                rule.transform.map(|t| format!("{t:?}")).unwrap_or_default(),
                if rule.enabled { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!(
        "Profile {:?} is valid: {} rule(s), {} enabled",
        args.profile,
        profile.rules.len(),
        profile.enabled_rules().count()
    );
    Ok(())
}
