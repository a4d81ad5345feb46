use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_router};
use serde::Deserialize;

use super::Scalar;
use crate::server::{failure, positive_ttl, text, RedisMcpServer};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetParams {
    #[schemars(description = "Key to set")]
    pub key: String,

    #[schemars(description = "Value to store (string, number or boolean)")]
    pub value: Scalar,

    #[schemars(description = "Expiration in seconds. Omit or 0 for no expiration")]
    #[serde(default)]
    pub expiration: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct KeyParams {
    #[schemars(description = "Key name")]
    pub key: String,
}

impl RedisMcpServer {
    pub async fn do_set(&self, params: SetParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("set").map_err(|e| self.err(e))?;
        let mut conn = self.conn();
        let ttl = positive_ttl(params.expiration);

        let mut cmd = redis::cmd("SET");
        cmd.arg(&params.key).arg(params.value.to_string());
        if let Some(seconds) = ttl {
            cmd.arg("EX").arg(seconds);
        }

        let result: redis::RedisResult<()> = cmd.query_async(&mut conn).await;
        if let Err(e) = result {
            return Ok(failure(format!("Error setting key {}", params.key), e));
        }

        Ok(match ttl {
            Some(seconds) => text(format!(
                "Successfully set {} with expiration {} seconds",
                params.key, seconds
            )),
            None => text(format!("Successfully set {}", params.key)),
        })
    }

    pub async fn do_get(&self, params: KeyParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let value: Option<Vec<u8>> = match redis::cmd("GET")
            .arg(&params.key)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => return Ok(failure(format!("Error retrieving key {}", params.key), e)),
        };

        match value {
            Some(bytes) if !bytes.is_empty() => Ok(text(String::from_utf8_lossy(&bytes))),
            _ => Ok(text(format!("Key {} does not exist", params.key))),
        }
    }
}

#[tool_router(router = tool_router_string, vis = "pub")]
impl RedisMcpServer {
    #[tool(
        name = "set",
        description = "Set a Redis string value with an optional expiration time in seconds"
    )]
    async fn set(
        &self,
        Parameters(params): Parameters<SetParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_set(params).await
    }

    #[tool(name = "get", description = "Get a Redis string value")]
    async fn get(
        &self,
        Parameters(params): Parameters<KeyParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get(params).await
    }
}
