use anyhow::{Result, anyhow};
use log::info;

use crate::{
    cli::KeysArgs,
    index::{RowIndex, detect_key_column},
    io_utils,
    key::KeyOptions,
};

pub fn execute(args: &KeysArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let dataset = io_utils::read_dataset(&args.input, "input", delimiter, encoding)?;

    let key_columns = if args.keys.is_empty() {
        let detected = detect_key_column(dataset.columns())
            .ok_or_else(|| anyhow!("No key column given and none could be detected; use --key"))?;
        info!("Detected key column '{detected}'");
        vec![detected.to_string()]
    } else {
        args.keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    };
    let options = KeyOptions {
        case_insensitive: !args.case_sensitive,
        strip_leading_zeros: args.strip_leading_zeros,
        ..KeyOptions::default()
    };

    let index = RowIndex::build(&dataset, &key_columns, &options)?;
    let stats = index.stats();
    println!("Key columns:     {}", key_columns.join(", "));
    println!("Rows:            {}", stats.total);
    println!("Unique keys:     {}", stats.unique);
    println!("Duplicate keys:  {}", stats.duplicates);
    println!("Empty keys:      {}", stats.empty);
    if !stats.duplicate_keys.is_empty() {
        println!("Duplicates:      {}", stats.duplicate_keys.join(", "));
    }
    if let Some(suggested) = detect_key_column(dataset.columns()) {
        println!("Suggested key:   {suggested}");
    }
    Ok(())
}
