use std::sync::Arc;

use sheet_api::{Constraints, MatchPolicy, Record, SheetError, decode_table, filter_records, normalize_name};
use sheet_api::tsv::render_tsv;
use sheet_client::{BearerToken, SheetStore, TokenSource};

use crate::config::{DatasetConfig, GatewayConfig, OutputFormat};

/// Read parameter selecting the output format.
pub const FORMAT_PARAM: &str = "format";
/// Read parameter overriding the TSV download name.
pub const FILENAME_PARAM: &str = "filename";

/// Result of a dataset read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutput {
    Json(Vec<Record>),
    Tsv { filename: String, body: String },
}

/// Executes read and write commands against the configured spreadsheets.
///
/// All collaborators are injected; the gateway keeps no state between calls.
pub struct Gateway {
    pub(crate) config: GatewayConfig,
    pub(crate) store: Arc<dyn SheetStore>,
    tokens: Option<Arc<dyn TokenSource>>,
    api_token: Option<String>,
}

impl Gateway {
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn SheetStore>,
        tokens: Option<Arc<dyn TokenSource>>,
        api_token: Option<String>,
    ) -> Self {
        let api_token = api_token.filter(|t| !t.is_empty());
        Self {
            config,
            store,
            tokens,
            api_token,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Body of `GET /`.
    pub fn info(&self) -> serde_json::Value {
        serde_json::Value::Array(vec![serde_json::Value::Object(self.config.info.clone())])
    }

    /// Read a dataset, optionally filtered by `params` (query pairs in
    /// request order).
    pub async fn read(&self, name: &str, params: &[(String, String)]) -> Result<ReadOutput, SheetError> {
        let dataset = self
            .config
            .dataset(name)
            .ok_or_else(|| SheetError::not_found(format!("dataset '{name}' not found")))?;

        let rejected: Vec<&str> = params
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(|k| !is_reserved_read_param(k) && !dataset.allows_param(k))
            .collect();
        if !rejected.is_empty() {
            return Err(SheetError::input(format!(
                "unsupported query parameters: {}",
                rejected.join(", ")
            )));
        }

        let mut format = dataset.output;
        let mut filename = None;
        let mut constraints = Constraints::new();
        for (key, value) in params {
            match normalize_name(key).as_str() {
                FORMAT_PARAM => {
                    format = OutputFormat::parse(value)
                        .ok_or_else(|| SheetError::input(format!("invalid output format '{value}'")))?;
                }
                FILENAME_PARAM => filename = Some(value.trim().to_string()).filter(|f| !f.is_empty()),
                _ => constraints.push(key.as_str(), value.as_str()),
            }
        }
        // Disabled datasets only answer filtered reads.
        if !dataset.enabled && constraints.is_empty() {
            return Err(SheetError::forbidden(format!("dataset '{name}' is disabled")));
        }

        let records = self.fetch(dataset).await?;
        let total = records.len();
        let records = filter_records(records, &constraints, MatchPolicy::Exact);
        if !constraints.is_empty() && records.is_empty() {
            return Err(SheetError::not_found("no data found"));
        }
        tracing::info!(dataset = %name, total, matched = records.len(), filters = constraints.len(), "dataset read");

        match format {
            OutputFormat::Json => Ok(ReadOutput::Json(records)),
            OutputFormat::Tsv => {
                let body = if records.is_empty() { String::new() } else { render_tsv(&records)? };
                let filename = format!("{}.tsv", filename.as_deref().unwrap_or(name));
                Ok(ReadOutput::Tsv { filename, body })
            }
        }
    }

    async fn fetch(&self, dataset: &DatasetConfig) -> Result<Vec<Record>, SheetError> {
        let source = dataset.table_source();
        let token = if source.requires_token() {
            Some(self.token().await?)
        } else {
            None
        };
        let table = self
            .store
            .read_table(&source, token.as_ref())
            .await
            .map_err(|e| e.with_context(format!("dataset '{}'", dataset.name)))?;
        Ok(decode_table(&table))
    }

    /// Check an `Authorization` header value against the configured API token.
    pub fn authorize(&self, header: Option<&str>) -> Result<(), SheetError> {
        let expected = self
            .api_token
            .as_deref()
            .ok_or_else(|| SheetError::auth("write access is not configured"))?;
        let header = header.ok_or_else(|| SheetError::auth("missing authorization header"))?;
        let presented = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| SheetError::auth("expected a bearer token"))?;
        if presented != expected {
            tracing::warn!("write rejected: api token mismatch");
            return Err(SheetError::auth("invalid api token"));
        }
        Ok(())
    }

    pub(crate) async fn token(&self) -> Result<BearerToken, SheetError> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or_else(|| SheetError::auth("no service account credentials configured"))?;
        tokens.fetch_token().await
    }
}

fn is_reserved_read_param(key: &str) -> bool {
    matches!(normalize_name(key).as_str(), FORMAT_PARAM | FILENAME_PARAM)
}
