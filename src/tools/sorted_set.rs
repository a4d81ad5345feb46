use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_router};
use serde::Deserialize;
use serde_json::json;

use crate::server::{failure, json_result, positive_ttl, queue_expire, text, RedisMcpServer};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ZaddParams {
    #[schemars(description = "Sorted set key")]
    pub key: String,

    #[schemars(description = "Score of the member")]
    pub score: f64,

    #[schemars(description = "Member to add or update")]
    pub member: String,

    #[schemars(description = "Optional expiration for the sorted set, in seconds")]
    #[serde(default)]
    pub expiration: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ZrangeParams {
    #[schemars(description = "Sorted set key")]
    pub key: String,

    #[schemars(description = "Start rank (default: 0)")]
    #[serde(default)]
    pub start: Option<i64>,

    #[schemars(description = "End rank, inclusive (default: -1 for the last member)")]
    #[serde(default)]
    pub end: Option<i64>,

    #[schemars(description = "Include scores in the result (default: false)")]
    #[serde(default)]
    pub with_scores: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ZremParams {
    #[schemars(description = "Sorted set key")]
    pub key: String,

    #[schemars(description = "Member to remove")]
    pub member: String,
}

impl RedisMcpServer {
    pub async fn do_zadd(&self, params: ZaddParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("zadd").map_err(|e| self.err(e))?;
        let mut conn = self.conn();
        let ttl = positive_ttl(params.expiration);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("ZADD")
            .arg(&params.key)
            .arg(params.score)
            .arg(&params.member)
            .ignore();
        queue_expire(&mut pipe, &params.key, ttl);

        let result: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
        if let Err(e) = result {
            return Ok(failure(
                format!("Error adding to sorted set {}", params.key),
                e,
            ));
        }

        let mut message = format!(
            "Successfully added {} to {} with score {}",
            params.member, params.key, params.score
        );
        if let Some(seconds) = ttl {
            message.push_str(&format!(" and expiration {seconds} seconds"));
        }
        Ok(text(message))
    }

    pub async fn do_zrange(&self, params: ZrangeParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();
        let context = format!("Error retrieving sorted set {}", params.key);

        let mut cmd = redis::cmd("ZRANGE");
        cmd.arg(&params.key)
            .arg(params.start.unwrap_or(0))
            .arg(params.end.unwrap_or(-1));

        let members: Vec<serde_json::Value> = if params.with_scores {
            cmd.arg("WITHSCORES");
            let pairs: Vec<(String, f64)> = match cmd.query_async(&mut conn).await {
                Ok(v) => v,
                Err(e) => return Ok(failure(context, e)),
            };
            pairs
                .into_iter()
                .map(|(member, score)| json!({"member": member, "score": score}))
                .collect()
        } else {
            let names: Vec<String> = match cmd.query_async(&mut conn).await {
                Ok(v) => v,
                Err(e) => return Ok(failure(context, e)),
            };
            names.into_iter().map(serde_json::Value::String).collect()
        };

        if members.is_empty() {
            return Ok(text(format!(
                "Sorted set {} is empty or does not exist",
                params.key
            )));
        }
        Ok(json_result(&members))
    }

    pub async fn do_zrem(&self, params: ZremParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("zrem").map_err(|e| self.err(e))?;
        let mut conn = self.conn();

        let removed: i64 = match redis::cmd("ZREM")
            .arg(&params.key)
            .arg(&params.member)
            .query_async(&mut conn)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                return Ok(failure(
                    format!("Error removing from sorted set {}", params.key),
                    e,
                ))
            }
        };

        if removed > 0 {
            Ok(text(format!(
                "Successfully removed {} from {}",
                params.member, params.key
            )))
        } else {
            Ok(text(format!(
                "Member {} not found in {}",
                params.member, params.key
            )))
        }
    }
}

#[tool_router(router = tool_router_sorted_set, vis = "pub")]
impl RedisMcpServer {
    #[tool(
        name = "zadd",
        description = "Add a member with a score to a sorted set, optionally expiring the set after a number of seconds"
    )]
    async fn zadd(
        &self,
        Parameters(params): Parameters<ZaddParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_zadd(params).await
    }

    #[tool(
        name = "zrange",
        description = "Get members of a sorted set by rank, optionally with scores"
    )]
    async fn zrange(
        &self,
        Parameters(params): Parameters<ZrangeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_zrange(params).await
    }

    #[tool(name = "zrem", description = "Remove a member from a sorted set")]
    async fn zrem(
        &self,
        Parameters(params): Parameters<ZremParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_zrem(params).await
    }
}
