use std::fmt;

use clap::{Args, Parser, Subcommand};
use sheet_client::ServiceAccount;
use sheet_engine::{EngineError, GatewayConfig};

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "sheet-server", about = "JSON/TSV API over Google Sheets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml", env = "CONFIG_PATH")]
    pub config: String,

    /// Bearer token required by POST /post and POST /update
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Service account key file contents (JSON)
    #[arg(long, env = "GOOGLE_CREDENTIALS", hide_env_values = true, conflicts_with = "credentials_file")]
    pub google_credentials: Option<String>,

    /// Path to a service account key file
    #[arg(long)]
    pub credentials_file: Option<String>,
}

impl fmt::Debug for ServeArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeArgs")
            .field("config", &self.config)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("google_credentials", &self.google_credentials.as_ref().map(|_| "***"))
            .field("credentials_file", &self.credentials_file)
            .finish()
    }
}

impl ServeArgs {
    /// Service account from `--google-credentials` or `--credentials-file`.
    /// `None` when neither is given.
    pub fn service_account(&self) -> Result<Option<ServiceAccount>, ServerError> {
        let json = match (&self.google_credentials, &self.credentials_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .map_err(|e| ServerError::Credentials(format!("'{path}': {e}")))?,
            (None, None) => return Ok(None),
        };
        if json.trim().is_empty() {
            return Ok(None);
        }
        ServiceAccount::try_from_str(&json)
            .map(Some)
            .map_err(|e| ServerError::Credentials(e.to_string()))
    }
}

pub fn load_config(path: &str) -> Result<GatewayConfig, ServerError> {
    GatewayConfig::load(path).map_err(|e| match e {
        EngineError::Io(e) => ServerError::Config { context: "read", detail: format!("'{path}': {e}") },
        other => ServerError::Config { context: "parse", detail: other.to_string() },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServeArgs {
        ServeArgs {
            config: "config.toml".into(),
            api_token: Some("t".into()),
            google_credentials: None,
            credentials_file: None,
        }
    }

    #[test]
    fn parses_serve_command() {
        let cli = Cli::try_parse_from([
            "sheet-server",
            "serve",
            "--config",
            "/etc/sheets.toml",
            "--api-token",
            "abc",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command;
        assert_eq!(args.config, "/etc/sheets.toml");
        assert_eq!(args.api_token.as_deref(), Some("abc"));
    }

    #[test]
    fn no_credentials_is_none() {
        assert!(args().service_account().unwrap().is_none());
    }

    #[test]
    fn inline_credentials_are_parsed() {
        let mut args = args();
        args.google_credentials = Some(
            r#"{"client_email":"svc@demo.iam.gserviceaccount.com","private_key":"k"}"#.into(),
        );
        let account = args.service_account().unwrap().unwrap();
        assert_eq!(account.client_email, "svc@demo.iam.gserviceaccount.com");

        args.google_credentials = Some("{not json".into());
        assert!(matches!(args.service_account(), Err(ServerError::Credentials(_))));
    }

    #[test]
    fn missing_credentials_file_is_an_error() {
        let mut args = args();
        args.credentials_file = Some("/nonexistent/key.json".into());
        assert!(matches!(args.service_account(), Err(ServerError::Credentials(_))));
    }

    #[test]
    fn debug_hides_secrets() {
        let rendered = format!("{:?}", args());
        assert!(!rendered.contains("\"t\""));
    }

    #[test]
    fn example_config_loads() {
        let config = load_config(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.toml")).unwrap();
        assert_eq!(config.datasets.len(), 3);
        assert_eq!(config.write.sheet_name, "DATA");
    }

    #[test]
    fn missing_config_file_is_read_error() {
        let err = load_config("/nonexistent/config.toml").unwrap_err();
        assert!(matches!(err, ServerError::Config { context: "read", .. }));
    }
}
