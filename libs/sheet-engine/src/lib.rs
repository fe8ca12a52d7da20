pub mod config;
pub mod error;
pub mod gateway;
pub mod write;

pub use config::{DatasetConfig, GatewayConfig, GoogleConfig, OutputFormat, SourceKind, WriteConfig};
pub use error::EngineError;
pub use gateway::{Gateway, ReadOutput};
pub use write::UpdateReport;
