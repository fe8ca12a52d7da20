#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("credentials: {0}")]
    Credentials(String),

    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api server: {0}")]
    Api(String),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
