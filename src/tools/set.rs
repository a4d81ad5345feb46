use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_router};
use serde::Deserialize;

use super::Scalar;
use crate::server::{
    expiry_note, failure, json_result, positive_ttl, queue_expire, text, RedisMcpServer,
};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaddParams {
    #[schemars(description = "Set key")]
    pub name: String,

    #[schemars(description = "Member to add")]
    pub value: Scalar,

    #[schemars(description = "Optional expiration for the set, in seconds")]
    #[serde(default)]
    pub expire_seconds: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SremParams {
    #[schemars(description = "Set key")]
    pub name: String,

    #[schemars(description = "Member to remove")]
    pub value: Scalar,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetKeyParams {
    #[schemars(description = "Set key")]
    pub name: String,
}

impl RedisMcpServer {
    pub async fn do_sadd(&self, params: SaddParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("sadd").map_err(|e| self.err(e))?;
        let mut conn = self.conn();
        let ttl = positive_ttl(params.expire_seconds);
        let value = params.value.to_string();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SADD")
            .arg(&params.name)
            .arg(&value)
            .ignore();
        queue_expire(&mut pipe, &params.name, ttl);

        let result: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
        if let Err(e) = result {
            return Ok(failure(
                format!("Error adding value '{}' to set '{}'", value, params.name),
                e,
            ));
        }

        Ok(text(format!(
            "Value '{}' added successfully to set '{}'.{}",
            value,
            params.name,
            expiry_note(ttl)
        )))
    }

    pub async fn do_srem(&self, params: SremParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("srem").map_err(|e| self.err(e))?;
        let mut conn = self.conn();
        let value = params.value.to_string();

        let removed: i64 = match redis::cmd("SREM")
            .arg(&params.name)
            .arg(&value)
            .query_async(&mut conn)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                return Ok(failure(
                    format!("Error removing value '{}' from set '{}'", value, params.name),
                    e,
                ))
            }
        };

        if removed > 0 {
            Ok(text(format!(
                "Value '{}' removed from set '{}'.",
                value, params.name
            )))
        } else {
            Ok(text(format!(
                "Value '{}' not found in set '{}'.",
                value, params.name
            )))
        }
    }

    pub async fn do_smembers(&self, params: SetKeyParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let mut members: Vec<String> = match redis::cmd("SMEMBERS")
            .arg(&params.name)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error retrieving members of set '{}'", params.name),
                    e,
                ))
            }
        };

        if members.is_empty() {
            return Ok(text(format!(
                "Set '{}' is empty or does not exist.",
                params.name
            )));
        }
        // SMEMBERS order is unspecified.
        members.sort();
        Ok(json_result(&members))
    }
}

#[tool_router(router = tool_router_set, vis = "pub")]
impl RedisMcpServer {
    #[tool(
        name = "sadd",
        description = "Add a member to a set, optionally expiring the set after a number of seconds"
    )]
    async fn sadd(
        &self,
        Parameters(params): Parameters<SaddParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_sadd(params).await
    }

    #[tool(name = "srem", description = "Remove a member from a set")]
    async fn srem(
        &self,
        Parameters(params): Parameters<SremParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_srem(params).await
    }

    #[tool(name = "smembers", description = "Get all members of a set, sorted")]
    async fn smembers(
        &self,
        Parameters(params): Parameters<SetKeyParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_smembers(params).await
    }
}
