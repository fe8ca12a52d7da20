use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::SheetError;
use crate::value::TaggedValue;

/// One decoded row: header name → value, in header order.
///
/// When two headers are identical after trimming, the later column's value
/// replaces the earlier one (the key keeps its first position).
pub type Record = IndexMap<String, TaggedValue>;

/// Raw grid as read from or written to the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Split a ragged grid (first row = header) as returned by the Sheets API.
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }
        let rows = grid.split_off(1);
        let header = grid.pop().unwrap_or_default();
        Self { header, rows }
    }

    /// True when no header cell names a column. Rows under a blank header
    /// cannot be addressed, so they do not count.
    pub fn is_empty(&self) -> bool {
        self.header.iter().all(|h| h.trim().is_empty())
    }
}

/// Decode every data row into a `Record`.
///
/// Header names are trimmed (case preserved). Rows shorter than the header
/// get empty cells for the missing trailing columns; cells beyond the header
/// are ignored.
pub fn decode_table(table: &Table) -> Vec<Record> {
    let header: Vec<&str> = table.header.iter().map(|h| h.trim()).collect();

    table
        .rows
        .iter()
        .map(|row| {
            let mut record = Record::with_capacity(header.len());
            for (idx, name) in header.iter().enumerate() {
                let cell = row.get(idx).map(String::as_str).unwrap_or("");
                record.insert((*name).to_string(), TaggedValue::decode(cell));
            }
            record
        })
        .collect()
}

/// Encode records back into a grid.
///
/// The header is the key order of the first record. Later records are
/// projected onto it: missing keys become empty cells, extra keys are
/// dropped (records are assumed homogeneous).
pub fn encode_table(records: &[Record]) -> Result<Table, SheetError> {
    let first = records
        .first()
        .ok_or_else(|| SheetError::encoding("no data to encode"))?;
    let header: Vec<String> = first.keys().cloned().collect();

    let rows = records
        .iter()
        .map(|record| {
            header
                .iter()
                .map(|name| record.get(name).map(TaggedValue::encode).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(Table { header, rows })
}

/// Lookup form of a column name: trimmed and lower-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case-insensitive column position lookup over a header row.
///
/// Duplicate names (after normalization) resolve to the last column.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
    width: usize,
}

impl HeaderIndex {
    pub fn new(header: &[String]) -> Self {
        let positions = header
            .iter()
            .enumerate()
            .map(|(idx, name)| (normalize_name(name), idx))
            .collect();
        Self { positions, width: header.len() }
    }

    /// 0-based column position of `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&normalize_name(name)).copied()
    }

    /// Number of columns in the header.
    pub fn width(&self) -> usize {
        self.width
    }
}
