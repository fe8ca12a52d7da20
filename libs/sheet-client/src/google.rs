use std::future::Future;
use std::pin::Pin;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use serde::Deserialize;
use serde_json::json;
use sheet_api::tsv::parse_tsv;
use sheet_api::value::json_text;
use sheet_api::{SheetError, Table};
use url::Url;

use crate::credentials::BearerToken;
use crate::store::{CellUpdate, SheetRef, SheetStore, TableSource};

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_DOCS_BASE: &str = "https://docs.google.com";

/// Base URLs of the two Google surfaces the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsEndpoints {
    /// Sheets REST API (authenticated values read/append/batchUpdate).
    pub api_base: String,
    /// docs.google.com (public TSV export / publish-to-web).
    pub docs_base: String,
}

impl Default for SheetsEndpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_SHEETS_API_BASE.to_string(),
            docs_base: DEFAULT_DOCS_BASE.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// `SheetStore` backed by Google Sheets over HTTP.
#[derive(Debug, Clone)]
pub struct GoogleSheets {
    http: reqwest::Client,
    endpoints: SheetsEndpoints,
}

impl GoogleSheets {
    pub fn new(http: reqwest::Client, endpoints: SheetsEndpoints) -> Self {
        Self { http, endpoints }
    }

    async fn read_tsv(&self, url: Url, what: &'static str) -> Result<Table, SheetError> {
        let request = self
            .http
            .get(url)
            .header(ACCEPT, "text/tab-separated-values")
            .header(CACHE_CONTROL, "no-cache");
        let body = send(request, what).await?;
        let table = parse_tsv(&body);
        tracing::debug!(source = what, rows = table.rows.len(), "fetched tsv table");
        Ok(table)
    }

    async fn read(&self, source: &TableSource, token: Option<&BearerToken>) -> Result<Table, SheetError> {
        match source {
            TableSource::Export { spreadsheet_id, gid, range } => {
                let mut url = endpoint(
                    &self.endpoints.docs_base,
                    &["spreadsheets", "d", spreadsheet_id, "export"],
                )?;
                url.query_pairs_mut()
                    .append_pair("format", "tsv")
                    .append_pair("gid", gid)
                    .append_pair("range", range);
                self.read_tsv(url, "export").await
            }
            TableSource::Published { spreadsheet_id, gid, range } => {
                let mut url = endpoint(
                    &self.endpoints.docs_base,
                    &["spreadsheets", "d", "e", spreadsheet_id, "pub"],
                )?;
                url.query_pairs_mut()
                    .append_pair("gid", gid)
                    .append_pair("range", range)
                    .append_pair("single", "true")
                    .append_pair("output", "tsv");
                self.read_tsv(url, "published").await
            }
            TableSource::Api { sheet, range } => {
                let token = token.ok_or_else(|| SheetError::auth("sheets api read requires a bearer token"))?;
                let a1 = match range {
                    Some(range) => sheet.range(range),
                    None => sheet.sheet_name.clone(),
                };
                let url = endpoint(
                    &self.endpoints.api_base,
                    &["spreadsheets", &sheet.spreadsheet_id, "values", &a1],
                )?;
                let body = send(self.http.get(url).bearer_auth(token.as_str()), "values get").await?;
                let parsed: ValueRange = serde_json::from_str(&body)
                    .map_err(|e| SheetError::upstream(format!("values get: malformed reply: {e}")))?;
                let grid = parsed
                    .values
                    .iter()
                    .map(|row| row.iter().map(json_text).collect())
                    .collect();
                let table = Table::from_grid(grid);
                tracing::debug!(sheet = %sheet.sheet_name, rows = table.rows.len(), "fetched api table");
                Ok(table)
            }
        }
    }

    async fn append(
        &self,
        sheet: &SheetRef,
        values: &[String],
        token: &BearerToken,
    ) -> Result<serde_json::Value, SheetError> {
        let target = format!("{}:append", sheet.range("A2"));
        let mut url = endpoint(
            &self.endpoints.api_base,
            &["spreadsheets", &sheet.spreadsheet_id, "values", &target],
        )?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let body = json!({ "values": [values] });
        let request = self.http.post(url).bearer_auth(token.as_str()).json(&body);
        let reply = send(request, "values append").await?;
        tracing::info!(sheet = %sheet.sheet_name, columns = values.len(), "appended row");
        Ok(reply_json(reply))
    }

    async fn batch_update(
        &self,
        sheet: &SheetRef,
        updates: &[CellUpdate],
        token: &BearerToken,
    ) -> Result<serde_json::Value, SheetError> {
        let url = endpoint(
            &self.endpoints.api_base,
            &["spreadsheets", &sheet.spreadsheet_id, "values:batchUpdate"],
        )?;

        let data: Vec<serde_json::Value> = updates
            .iter()
            .map(|u| json!({ "range": sheet.range(u.address), "values": [[u.value]] }))
            .collect();
        let body = json!({ "valueInputOption": "RAW", "data": data });
        let request = self.http.post(url).bearer_auth(token.as_str()).json(&body);
        let reply = send(request, "values batchUpdate").await?;
        tracing::info!(sheet = %sheet.sheet_name, cells = updates.len(), "batch updated cells");
        Ok(reply_json(reply))
    }
}

impl SheetStore for GoogleSheets {
    fn read_table<'a>(
        &'a self,
        source: &'a TableSource,
        token: Option<&'a BearerToken>,
    ) -> Pin<Box<dyn Future<Output = Result<Table, SheetError>> + Send + 'a>> {
        Box::pin(self.read(source, token))
    }

    fn append_row<'a>(
        &'a self,
        sheet: &'a SheetRef,
        values: &'a [String],
        token: &'a BearerToken,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, SheetError>> + Send + 'a>> {
        Box::pin(self.append(sheet, values, token))
    }

    fn batch_update_cells<'a>(
        &'a self,
        sheet: &'a SheetRef,
        updates: &'a [CellUpdate],
        token: &'a BearerToken,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, SheetError>> + Send + 'a>> {
        Box::pin(self.batch_update(sheet, updates, token))
    }
}

// ═══════════════════════════════════════════════════════════════
//  HTTP helpers
// ═══════════════════════════════════════════════════════════════

/// Append path segments (percent-encoded) to a base URL.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, SheetError> {
    let mut url = Url::parse(base)
        .map_err(|e| SheetError::encoding(format!("invalid base url '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| SheetError::encoding(format!("base url '{base}' cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn send(request: reqwest::RequestBuilder, what: &str) -> Result<String, SheetError> {
    let resp = request
        .send()
        .await
        .map_err(|e| SheetError::upstream(format!("{what}: request failed: {e}")))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| SheetError::upstream(format!("{what}: read response body: {e}")))?;

    if status == StatusCode::NOT_FOUND {
        return Err(SheetError::not_found(format!("{what}: sheet not found")));
    }
    if !status.is_success() {
        tracing::warn!(status = %status, call = what, "sheet store returned an error");
        return Err(SheetError::upstream(format!("{what}: HTTP {status}: {body}")));
    }

    Ok(body)
}

fn reply_json(body: String) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => value,
        Err(_) => serde_json::Value::String(body),
    }
}
