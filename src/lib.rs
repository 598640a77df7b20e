//! Key-based matching and mapping engine for merging tabular records.
//!
//! The pipeline runs leaves first: [`key`] normalizes business keys,
//! [`index`] buckets rows by key, [`matcher`] pairs target rows with source
//! rows, [`planner`] turns mapping rules into candidate writes, [`diff`]
//! classifies them against the target and [`executor`] commits the approved
//! ones. [`session::MergeSession`] drives the whole sequence for one
//! [`profile::MappingProfile`].

pub mod batch;
pub mod cli;
pub mod data;
pub mod dataset;
pub mod diff;
pub mod error;
pub mod executor;
pub mod index;
mod inputs;
pub mod io_utils;
pub mod key;
mod keys;
pub mod matcher;
mod merge;
pub mod planner;
mod preview;
pub mod profile;
mod profile_cmd;
pub mod report;
pub mod session;
pub mod summary;
pub mod table;
pub mod transform;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    batch::{BatchFilter, RowSelection},
    data::{CellValue, ColumnType},
    dataset::Dataset,
    diff::{CellRef, ChangeRecord, Classification, Diff},
    error::{MergeError, MergeResult},
    executor::{Approval, CommitReport},
    key::{EMPTY_KEY, Key, KeyOptions},
    matcher::{MatchOutcome, MatchResult},
    profile::{KeyColumn, MappingProfile, MappingRule, WriteMode},
    session::{MergeSession, Preview},
    summary::MergeSummary,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_keymerge", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Preview(args) => preview::execute(&args),
        Commands::Merge(args) => merge::execute(&args),
        Commands::Keys(args) => keys::execute(&args),
        Commands::Profile(args) => profile_cmd::execute(&args),
    }
}
