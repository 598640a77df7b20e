use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{batch::BatchFilter, data::ColumnType};

#[derive(Debug, Parser)]
#[command(author, version, about = "Merge CSV sources into a target by shared keys", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the changes a mapping profile would make, without writing anything
    Preview(PreviewArgs),
    /// Apply a mapping profile and write the merged target
    Merge(MergeArgs),
    /// Report key statistics and duplicates for a CSV file
    Keys(KeysArgs),
    /// Validate a mapping profile and list its rules
    Profile(ProfileArgs),
}

/// Inputs shared by `preview` and `merge`.
#[derive(Debug, Args)]
pub struct MergeInputArgs {
    /// Target CSV file that receives the merged values
    #[arg(short = 't', long = "target")]
    pub target: PathBuf,
    /// Source CSV file as `name=path`; the file stem names it when `name=` is omitted
    #[arg(short = 's', long = "source", required = true, action = clap::ArgAction::Append, value_parser = parse_source)]
    pub sources: Vec<SourceSpec>,
    /// Mapping profile (YAML, or JSON with a .json extension)
    #[arg(short = 'p', long = "profile")]
    pub profile: PathBuf,
    /// CSV delimiter character for inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Declared type of a target column as `column=number|date|text`
    #[arg(long = "column-type", action = clap::ArgAction::Append, value_parser = parse_column_type)]
    pub column_types: Vec<(String, ColumnType)>,
    /// Process only target rows FIRST-LAST (1-based; `FIRST-` runs to the end)
    #[arg(long = "rows", group = "batch", value_parser = parse_row_range)]
    pub rows: Option<BatchFilter>,
    /// Process only the target row with this key; composite keys as `a|b`
    #[arg(long = "only-key", group = "batch", action = clap::ArgAction::Append)]
    pub only_keys: Vec<String>,
    /// Process only the first N target rows
    #[arg(long = "first", group = "batch")]
    pub first: Option<usize>,
    /// Process only target rows whose key matches this regular expression
    #[arg(long = "key-pattern", group = "batch")]
    pub key_pattern: Option<String>,
}

impl MergeInputArgs {
    /// The batch requested on the command line, replacing the profile's own.
    pub fn batch(&self) -> Option<BatchFilter> {
        if let Some(range) = &self.rows {
            Some(range.clone())
        } else if !self.only_keys.is_empty() {
            Some(BatchFilter::Keys {
                keys: self.only_keys.clone(),
            })
        } else if let Some(limit) = self.first {
            Some(BatchFilter::Limit { limit })
        } else {
            self.key_pattern.as_ref().map(|pattern| BatchFilter::Pattern {
                pattern: pattern.clone(),
            })
        }
    }
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub inputs: MergeInputArgs,
    /// Maximum number of change records to display (0 = all)
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
    /// Include unchanged records in the listing
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    #[command(flatten)]
    pub inputs: MergeInputArgs,
    /// Merged CSV output (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults to the target's delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding for the output files (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
    /// Write every applied change to this CSV file
    #[arg(long = "change-log")]
    pub change_log: Option<PathBuf>,
    /// Write target rows without a match to this CSV file
    #[arg(long = "unmatched-log")]
    pub unmatched_log: Option<PathBuf>,
    /// Reject all changes to this target column
    #[arg(long = "skip-column", action = clap::ArgAction::Append)]
    pub skip_columns: Vec<String>,
}

#[derive(Debug, Args)]
pub struct KeysArgs {
    /// CSV file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Key columns; detected from the header names when omitted
    #[arg(short = 'k', long = "key", value_delimiter = ',')]
    pub keys: Vec<String>,
    /// Compare keys case-sensitively
    #[arg(long = "case-sensitive")]
    pub case_sensitive: bool,
    /// Ignore leading zeros in keys
    #[arg(long = "strip-leading-zeros")]
    pub strip_leading_zeros: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Mapping profile to validate
    #[arg(short = 'p', long = "profile")]
    pub profile: PathBuf,
    /// Print the profile as normalized YAML
    #[arg(long)]
    pub print: bool,
}

/// A named source file given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: String,
    pub path: PathBuf,
}

pub fn parse_source(value: &str) -> Result<SourceSpec, String> {
    let (name, path) = match value.split_once('=') {
        Some((name, path)) => (name.trim().to_string(), PathBuf::from(path.trim())),
        None => {
            let path = PathBuf::from(value.trim());
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
                .to_string();
            (name, path)
        }
    };
    if name.is_empty() {
        return Err(format!("Source '{value}' needs a name, as in name=path"));
    }
    if path.as_os_str().is_empty() {
        return Err(format!("Source '{value}' is missing a file path"));
    }
    Ok(SourceSpec { name, path })
}

pub fn parse_column_type(value: &str) -> Result<(String, ColumnType), String> {
    let (column, ty) = value
        .split_once('=')
        .ok_or_else(|| format!("Expected column=type, got '{value}'"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("Column name missing in '{value}'"));
    }
    let ty = ty.parse::<ColumnType>().map_err(|err| err.to_string())?;
    Ok((column.to_string(), ty))
}

pub fn parse_row_range(value: &str) -> Result<BatchFilter, String> {
    let parse = |part: &str| {
        part.trim()
            .parse::<usize>()
            .map_err(|_| format!("Expected a row range like 10-20, got '{value}'"))
    };
    let (first, last) = match value.split_once('-') {
        Some((first, "")) => (parse(first)?, None),
        Some((first, last)) => (parse(first)?, Some(parse(last)?)),
        None => {
            let row = parse(value)?;
            (row, Some(row))
        }
    };
    let range = BatchFilter::Range { first, last };
    range.validate()?;
    Ok(range)
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
