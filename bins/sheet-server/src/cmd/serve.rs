use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use sheet_client::{GoogleSheets, ServiceAccountIssuer, SheetStore, TokenSource};
use sheet_engine::Gateway;

use crate::config::{ServeArgs, load_config};
use crate::error::ServerError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("sheet-server starting");

    // --- Load config ---
    let config = load_config(&args.config)?;
    tracing::info!(
        config = %args.config,
        datasets = config.datasets.len(),
        "loaded config"
    );

    // --- Outbound HTTP ---
    let http = reqwest::Client::builder()
        .user_agent(concat!("sheet-server/", env!("CARGO_PKG_VERSION")))
        .timeout(HTTP_TIMEOUT)
        .build()?;

    // --- Credentials ---
    let tokens: Option<Arc<dyn TokenSource>> = match args.service_account()? {
        Some(account) => {
            let client = account.client_email.clone();
            let issuer = ServiceAccountIssuer::new(
                http.clone(),
                account,
                config.google.scope.clone(),
                config.google.token_uri.clone(),
            );
            tracing::info!(%client, token_uri = %issuer.token_uri(), "service account configured");
            let issuer: Arc<dyn TokenSource> = Arc::new(issuer);
            Some(issuer)
        }
        None => {
            tracing::warn!("no service account: api-source datasets and writes are unavailable");
            None
        }
    };
    if args.api_token.as_deref().is_none_or(str::is_empty) {
        tracing::warn!("no API_TOKEN: POST /post and POST /update will reject every request");
    }

    let store: Arc<dyn SheetStore> = Arc::new(GoogleSheets::new(http, config.google.endpoints()));

    let bind = config.bind.clone();
    let port = config.api_port;
    let gateway = Arc::new(Gateway::new(config, store, tokens, args.api_token.clone()));

    // --- CancellationToken for graceful shutdown ---
    let shutdown = CancellationToken::new();

    // --- API server ---
    let api_shutdown = shutdown.clone();
    let mut api_handle = tokio::spawn(async move {
        sheet_api_server::run(&bind, port, gateway, api_shutdown).await
    });
    tracing::info!("server ready");

    // --- Wait for Ctrl+C or an early server exit ---
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("shutting down...");
        }
        result = &mut api_handle => {
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ServerError::Api(e)),
                Err(e) => Err(ServerError::Api(format!("api task: {e}"))),
            };
        }
    }

    shutdown.cancel();

    // Drain in-flight requests, then give up.
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut api_handle).await {
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "api server error"),
        Ok(_) => {}
        Err(_) => {
            tracing::warn!("api server did not stop in time, aborting");
            api_handle.abort();
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}
