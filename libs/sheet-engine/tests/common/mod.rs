#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use sheet_api::{SheetError, Table};
use sheet_client::{BearerToken, CellUpdate, SheetRef, SheetStore, TableSource, TokenSource};
use sheet_engine::{Gateway, GatewayConfig};

pub const API_TOKEN: &str = "secret-123";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SheetError>> + Send + 'a>>;

/// In-memory store serving one table for every source.
#[derive(Default)]
pub struct FakeStore {
    pub table: Mutex<Table>,
    pub reads: Mutex<Vec<(TableSource, Option<String>)>>,
    pub appends: Mutex<Vec<(SheetRef, Vec<String>)>>,
    pub batches: Mutex<Vec<(SheetRef, Vec<CellUpdate>)>>,
}

impl FakeStore {
    pub fn with_rows(header: &[&str], rows: &[&[&str]]) -> Arc<Self> {
        let owned = |cells: &[&str]| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        let table = Table::new(owned(header), rows.iter().map(|r| owned(r)).collect());
        Arc::new(Self {
            table: Mutex::new(table),
            ..Default::default()
        })
    }

    pub fn reads(&self) -> Vec<(TableSource, Option<String>)> {
        self.reads.lock().unwrap().clone()
    }

    pub fn appends(&self) -> Vec<(SheetRef, Vec<String>)> {
        self.appends.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<(SheetRef, Vec<CellUpdate>)> {
        self.batches.lock().unwrap().clone()
    }
}

impl SheetStore for FakeStore {
    fn read_table<'a>(
        &'a self,
        source: &'a TableSource,
        token: Option<&'a BearerToken>,
    ) -> BoxFuture<'a, Table> {
        Box::pin(async move {
            if source.requires_token() && token.is_none() {
                return Err(SheetError::auth("token required"));
            }
            self.reads
                .lock()
                .unwrap()
                .push((source.clone(), token.map(|t| t.as_str().to_string())));
            Ok(self.table.lock().unwrap().clone())
        })
    }

    fn append_row<'a>(
        &'a self,
        sheet: &'a SheetRef,
        values: &'a [String],
        _token: &'a BearerToken,
    ) -> BoxFuture<'a, serde_json::Value> {
        Box::pin(async move {
            self.appends.lock().unwrap().push((sheet.clone(), values.to_vec()));
            Ok(json!({"updates": {"updatedRows": 1}}))
        })
    }

    fn batch_update_cells<'a>(
        &'a self,
        sheet: &'a SheetRef,
        updates: &'a [CellUpdate],
        _token: &'a BearerToken,
    ) -> BoxFuture<'a, serde_json::Value> {
        Box::pin(async move {
            self.batches.lock().unwrap().push((sheet.clone(), updates.to_vec()));
            Ok(json!({"totalUpdatedCells": updates.len()}))
        })
    }
}

/// Hands out numbered tokens and counts the calls.
#[derive(Default)]
pub struct FakeTokens {
    pub issued: AtomicUsize,
}

impl TokenSource for FakeTokens {
    fn fetch_token(&self) -> Pin<Box<dyn Future<Output = Result<BearerToken, SheetError>> + Send + '_>> {
        Box::pin(async move {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(BearerToken::new(format!("tok-{n}")))
        })
    }
}

pub const CONFIG: &str = r#"
[info]
contact = "ops@example.com"

[[datasets]]
name = "members"
spreadsheet_id = "sheet-members"

[[datasets]]
name = "stock"
spreadsheet_id = "sheet-stock"
source = "api"
sheet_name = "Stock"
output = "tsv"
allowed_params = ["sku"]

[[datasets]]
name = "private"
spreadsheet_id = "sheet-private"
enabled = false

[write]
spreadsheet_id = "sheet-write"
"#;

pub fn gateway(store: Arc<FakeStore>) -> (Gateway, Arc<FakeTokens>) {
    let config = GatewayConfig::parse(CONFIG).unwrap();
    let tokens = Arc::new(FakeTokens::default());
    let gateway = Gateway::new(config, store, Some(tokens.clone()), Some(API_TOKEN.to_string()));
    (gateway, tokens)
}

pub fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
