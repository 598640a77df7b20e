use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::{
    dataset::Dataset,
    error::MergeResult,
    key::{Key, KeyOptions, normalize},
};

const DUPLICATE_KEY_SAMPLE: usize = 100;

/// Column names commonly used as business keys, most specific first.
const KEY_COLUMN_HINTS: &[&str] = &[
    "mdm", "index", "indeks", "ean", "sku", "kod", "code", "id", "product_id", "productid",
    "item_id", "itemid", "barcode", "upc", "gtin", "asin",
];

/// Mapping from normalized key to the row positions carrying it.
#[derive(Debug, Clone)]
pub struct RowIndex {
    dataset: String,
    key_columns: Vec<String>,
    buckets: BTreeMap<Key, Vec<usize>>,
    empty_rows: Vec<usize>,
    row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyStats {
    pub total: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub empty: usize,
    pub duplicate_keys: Vec<String>,
}

impl RowIndex {
    /// Indexes every row of `dataset` by the normalized values of
    /// `key_columns`. Fails when a key column is not declared.
    pub fn build(
        dataset: &Dataset,
        key_columns: &[String],
        options: &KeyOptions,
    ) -> MergeResult<Self> {
        let positions = key_columns
            .iter()
            .map(|name| dataset.require_column(name))
            .collect::<MergeResult<Vec<_>>>()?;

        let mut buckets: BTreeMap<Key, Vec<usize>> = BTreeMap::new();
        let mut empty_rows = Vec::new();
        let mut parts = Vec::with_capacity(positions.len());
        for (row_idx, row) in dataset.rows().iter().enumerate() {
            parts.clear();
            parts.extend(positions.iter().map(|idx| row[*idx].clone()));
            let key = normalize(&parts, options);
            if key.is_empty() {
                empty_rows.push(row_idx);
            } else {
                buckets.entry(key).or_default().push(row_idx);
            }
        }

        let index = RowIndex {
            dataset: dataset.name().to_string(),
            key_columns: key_columns.to_vec(),
            buckets,
            empty_rows,
            row_count: dataset.row_count(),
        };
        debug!(
            "Indexed '{}' on {:?}: {} key(s), {} ambiguous, {} empty",
            index.dataset,
            index.key_columns,
            index.buckets.len(),
            index.ambiguous_keys().len(),
            index.empty_rows.len()
        );
        Ok(index)
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of distinct non-empty keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Rows carrying `key`. Empty keys never resolve to rows.
    pub fn rows_for(&self, key: &Key) -> &[usize] {
        if key.is_empty() {
            return &[];
        }
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Key, &[usize])> {
        self.buckets.iter().map(|(key, rows)| (key, rows.as_slice()))
    }

    /// Keys shared by more than one row.
    pub fn ambiguous_keys(&self) -> Vec<&Key> {
        self.buckets
            .iter()
            .filter(|(_, rows)| rows.len() > 1)
            .map(|(key, _)| key)
            .collect()
    }

    pub fn empty_rows(&self) -> &[usize] {
        &self.empty_rows
    }

    pub fn stats(&self) -> KeyStats {
        let ambiguous = self.ambiguous_keys();
        KeyStats {
            total: self.row_count,
            unique: self.buckets.len(),
            duplicates: ambiguous.len(),
            empty: self.empty_rows.len(),
            duplicate_keys: ambiguous
                .into_iter()
                .take(DUPLICATE_KEY_SAMPLE)
                .map(Key::to_string)
                .collect(),
        }
    }
}

/// Suggests a key column by name: exact hint matches first, then columns
/// containing a hint.
pub fn detect_key_column(columns: &[String]) -> Option<&str> {
    let lowered = columns
        .iter()
        .map(|c| (c.trim().to_lowercase(), c.as_str()))
        .collect::<Vec<_>>();
    for hint in KEY_COLUMN_HINTS {
        if let Some((_, original)) = lowered.iter().find(|(name, _)| name == hint) {
            return Some(*original);
        }
    }
    for hint in KEY_COLUMN_HINTS {
        if let Some((_, original)) = lowered.iter().find(|(name, _)| name.contains(hint)) {
            return Some(*original);
        }
    }
    None
}
