use std::path::PathBuf;

use rmcp::model::ErrorData;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum McpRedisError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot read TLS material '{}': {source}", path.display())]
    Tls {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Write operation rejected: {0}")]
    ReadOnly(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Other(String),
}

impl McpRedisError {
    pub fn to_mcp_error(&self) -> ErrorData {
        match self {
            McpRedisError::ReadOnly(_) | McpRedisError::InvalidArgument(_) => {
                ErrorData::invalid_params(self.to_string(), None)
            }
            McpRedisError::Redis(_)
            | McpRedisError::Config(_)
            | McpRedisError::Tls { .. }
            | McpRedisError::Other(_) => ErrorData::internal_error(self.to_string(), None),
        }
    }
}
