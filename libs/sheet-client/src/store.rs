use std::fmt;
use std::future::Future;
use std::pin::Pin;

use sheet_api::{CellAddress, SheetError, Table};

use crate::credentials::BearerToken;

/// One tab of a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl SheetRef {
    pub fn new(spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    /// `Sheet!A1`-style range inside this sheet.
    pub fn range(&self, a1: impl fmt::Display) -> String {
        format!("{}!{a1}", self.sheet_name)
    }
}

/// Where a dataset's table is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    /// Public TSV export of one tab (by gid). No credentials.
    Export {
        spreadsheet_id: String,
        gid: String,
        range: String,
    },
    /// "Publish to web" TSV output. No credentials.
    Published {
        spreadsheet_id: String,
        gid: String,
        range: String,
    },
    /// Sheets API values read. Needs a bearer token.
    Api { sheet: SheetRef, range: Option<String> },
}

impl TableSource {
    pub fn requires_token(&self) -> bool {
        matches!(self, TableSource::Api { .. })
    }
}

/// A single cell write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub address: CellAddress,
    pub value: String,
}

/// Remote tabular store.
///
/// Every call is independent; failures come back as `SheetError` and are
/// never retried here.
pub trait SheetStore: Send + Sync {
    /// Fetch a whole table: first row header, the rest data.
    fn read_table<'a>(
        &'a self,
        source: &'a TableSource,
        token: Option<&'a BearerToken>,
    ) -> Pin<Box<dyn Future<Output = Result<Table, SheetError>> + Send + 'a>>;

    /// Append one row after the last data row. Returns the store's reply.
    fn append_row<'a>(
        &'a self,
        sheet: &'a SheetRef,
        values: &'a [String],
        token: &'a BearerToken,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, SheetError>> + Send + 'a>>;

    /// Write several single cells in one request.
    fn batch_update_cells<'a>(
        &'a self,
        sheet: &'a SheetRef,
        updates: &'a [CellUpdate],
        token: &'a BearerToken,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, SheetError>> + Send + 'a>>;
}
