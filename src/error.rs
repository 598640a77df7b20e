//! Error taxonomy for the merge engine.
//!
//! Ambiguous keys are deliberately absent: they are reported as data through
//! [`crate::matcher::MatchOutcome::Ambiguous`] and never raised.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    /// A declared key or mapping column does not exist in a dataset.
    #[error("Column '{column}' not found in dataset '{dataset}'")]
    Schema { dataset: String, column: String },

    /// A cell value could not be converted for comparison or storage.
    #[error("Row {row} column '{column}': cannot store '{value}' as {expected}")]
    TypeCoercion {
        row: usize,
        column: String,
        value: String,
        expected: String,
    },

    /// Two datasets of one merge share a name, so sources cannot be told apart.
    #[error("Dataset name '{name}' is used more than once")]
    DuplicateDataset { name: String },

    /// A matched row position does not exist in its dataset.
    #[error("Row {row} not found in dataset '{dataset}'")]
    MissingRow { dataset: String, row: usize },

    /// A persisted mapping profile could not be read back.
    #[error("Invalid mapping profile {origin}: {message}")]
    ProfileFormat { origin: String, message: String },
}

impl MergeError {
    pub fn schema(dataset: impl Into<String>, column: impl Into<String>) -> Self {
        MergeError::Schema {
            dataset: dataset.into(),
            column: column.into(),
        }
    }

    pub fn profile_format(origin: impl Into<String>, message: impl Into<String>) -> Self {
        MergeError::ProfileFormat {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn duplicate_dataset(name: impl Into<String>) -> Self {
        MergeError::DuplicateDataset { name: name.into() }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, MergeError::Schema { .. })
    }
}

pub type MergeResult<T> = std::result::Result<T, MergeError>;
