use std::collections::HashSet;

use serde::Deserialize;
use sheet_api::normalize_name;
use sheet_client::credentials::SPREADSHEETS_SCOPE;
use sheet_client::google::{DEFAULT_DOCS_BASE, DEFAULT_SHEETS_API_BASE};
use sheet_client::{SheetRef, SheetsEndpoints, TableSource};

use crate::error::EngineError;

/// Root configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// HTTP API port.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Free-form document served by `GET /`.
    #[serde(default)]
    pub info: serde_json::Map<String, serde_json::Value>,

    /// Readable datasets, addressed by name.
    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,

    #[serde(default)]
    pub write: WriteConfig,

    #[serde(default)]
    pub google: GoogleConfig,
}

fn default_api_port() -> u16 {
    9200
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Public `export?format=tsv` link.
    #[default]
    Export,
    /// Publish-to-web TSV link.
    Published,
    /// Sheets API values read with service-account credentials.
    Api,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Tsv,
}

impl OutputFormat {
    /// Parse a `format` query value (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "tsv" => Some(OutputFormat::Tsv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub spreadsheet_id: String,
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default = "default_gid")]
    pub gid: String,
    #[serde(default = "default_range")]
    pub range: String,
    /// Tab name, required by the `api` source.
    #[serde(default)]
    pub sheet_name: Option<String>,
    #[serde(default)]
    pub output: OutputFormat,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Query keys accepted on reads. Empty accepts every key.
    #[serde(default)]
    pub allowed_params: Vec<String>,
}

fn default_gid() -> String {
    "0".to_string()
}

fn default_range() -> String {
    "A:Z".to_string()
}

fn default_true() -> bool {
    true
}

impl DatasetConfig {
    pub fn table_source(&self) -> TableSource {
        match self.source {
            SourceKind::Export => TableSource::Export {
                spreadsheet_id: self.spreadsheet_id.clone(),
                gid: self.gid.clone(),
                range: self.range.clone(),
            },
            SourceKind::Published => TableSource::Published {
                spreadsheet_id: self.spreadsheet_id.clone(),
                gid: self.gid.clone(),
                range: self.range.clone(),
            },
            SourceKind::Api => TableSource::Api {
                sheet: SheetRef::new(
                    self.spreadsheet_id.clone(),
                    self.sheet_name.clone().unwrap_or_default(),
                ),
                range: Some(self.range.clone()),
            },
        }
    }

    /// Whether `key` may appear in this dataset's query string.
    pub fn allows_param(&self, key: &str) -> bool {
        self.allowed_params.is_empty()
            || self
                .allowed_params
                .iter()
                .any(|allowed| normalize_name(allowed) == normalize_name(key))
    }
}

/// Default target of `/post` and `/update`.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteConfig {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default = "default_write_sheet")]
    pub sheet_name: String,
    /// Let the request body's `spreadsheetId` / `sheetName` redirect the write.
    #[serde(default = "default_true")]
    pub allow_target_override: bool,
}

fn default_write_sheet() -> String {
    "DATA".to_string()
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            sheet_name: default_write_sheet(),
            allow_target_override: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    /// Token endpoint. Unset: the key file's `token_uri`, then Google's.
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_sheets_api_base")]
    pub sheets_api_base: String,
    #[serde(default = "default_docs_base")]
    pub docs_base: String,
}

fn default_scope() -> String {
    SPREADSHEETS_SCOPE.to_string()
}

fn default_sheets_api_base() -> String {
    DEFAULT_SHEETS_API_BASE.to_string()
}

fn default_docs_base() -> String {
    DEFAULT_DOCS_BASE.to_string()
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            token_uri: None,
            scope: default_scope(),
            sheets_api_base: default_sheets_api_base(),
            docs_base: default_docs_base(),
        }
    }
}

impl GoogleConfig {
    pub fn endpoints(&self) -> SheetsEndpoints {
        SheetsEndpoints {
            api_base: self.sheets_api_base.clone(),
            docs_base: self.docs_base.clone(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }

    fn validate(&self) -> Result<(), EngineError> {
        let mut seen = HashSet::new();
        for dataset in &self.datasets {
            if dataset.name.trim().is_empty() {
                return Err(EngineError::Config("dataset with empty name".into()));
            }
            if !seen.insert(dataset.name.as_str()) {
                return Err(EngineError::Config(format!("duplicate dataset '{}'", dataset.name)));
            }
            if dataset.spreadsheet_id.trim().is_empty() {
                return Err(EngineError::Config(format!(
                    "dataset '{}': spreadsheet_id is empty",
                    dataset.name
                )));
            }
            let has_sheet = dataset.sheet_name.as_deref().is_some_and(|s| !s.trim().is_empty());
            if dataset.source == SourceKind::Api && !has_sheet {
                return Err(EngineError::Config(format!(
                    "dataset '{}': source 'api' requires sheet_name",
                    dataset.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let config = GatewayConfig::parse(
            r#"
            [[datasets]]
            name = "members"
            spreadsheet_id = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_port, 9200);
        assert_eq!(config.bind, "0.0.0.0");
        assert!(config.info.is_empty());
        assert_eq!(config.write.sheet_name, "DATA");
        assert!(config.write.allow_target_override);
        assert_eq!(config.google.scope, SPREADSHEETS_SCOPE);
        assert_eq!(config.google.token_uri, None);

        let dataset = config.dataset("members").unwrap();
        assert_eq!(dataset.source, SourceKind::Export);
        assert_eq!(dataset.output, OutputFormat::Json);
        assert!(dataset.enabled);
        assert_eq!(
            dataset.table_source(),
            TableSource::Export {
                spreadsheet_id: "abc".into(),
                gid: "0".into(),
                range: "A:Z".into(),
            }
        );
    }

    #[test]
    fn full_config() {
        let config = GatewayConfig::parse(
            r#"
            api_port = 8080
            bind = "127.0.0.1"

            [info]
            contact = "ops@example.com"
            version = 2

            [[datasets]]
            name = "stock"
            spreadsheet_id = "xyz"
            source = "api"
            sheet_name = "Stock"
            range = "A1:F"
            output = "tsv"
            enabled = false
            allowed_params = ["sku", "Color"]

            [write]
            spreadsheet_id = "w1"
            sheet_name = "Orders"
            allow_target_override = false

            [google]
            token_uri = "http://127.0.0.1:1/token"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.info["version"], 2);

        let stock = config.dataset("stock").unwrap();
        assert_eq!(stock.output, OutputFormat::Tsv);
        assert!(!stock.enabled);
        assert!(stock.allows_param("SKU"));
        assert!(stock.allows_param("color"));
        assert!(!stock.allows_param("size"));
        assert_eq!(
            stock.table_source(),
            TableSource::Api {
                sheet: SheetRef::new("xyz", "Stock"),
                range: Some("A1:F".into()),
            }
        );

        assert_eq!(config.write.spreadsheet_id.as_deref(), Some("w1"));
        assert!(!config.write.allow_target_override);
        assert_eq!(config.google.sheets_api_base, DEFAULT_SHEETS_API_BASE);
    }

    #[test]
    fn api_source_needs_sheet_name() {
        let err = GatewayConfig::parse(
            r#"
            [[datasets]]
            name = "x"
            spreadsheet_id = "abc"
            source = "api"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("requires sheet_name"));
    }

    #[test]
    fn rejects_duplicates_and_unknown_source() {
        let dup = r#"
            [[datasets]]
            name = "x"
            spreadsheet_id = "a"
            [[datasets]]
            name = "x"
            spreadsheet_id = "b"
        "#;
        assert!(GatewayConfig::parse(dup).is_err());

        let bad = r#"
            [[datasets]]
            name = "x"
            spreadsheet_id = "a"
            source = "gviz"
        "#;
        assert!(GatewayConfig::parse(bad).is_err());
    }

    #[test]
    fn output_format_parse() {
        assert_eq!(OutputFormat::parse("TSV"), Some(OutputFormat::Tsv));
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("csv"), None);
    }
}
