use std::collections::BTreeMap;

use redis::Value;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_router};
use serde::Deserialize;

use super::Scalar;
use crate::error::McpRedisError;
use crate::reply::stream_entries;
use crate::server::{failure, json_result, positive_ttl, queue_expire, text, RedisMcpServer};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct XaddParams {
    #[schemars(description = "Stream key")]
    pub key: String,

    #[schemars(description = "Field/value pairs of the entry")]
    pub fields: BTreeMap<String, Scalar>,

    #[schemars(description = "Optional expiration for the stream, in seconds")]
    #[serde(default)]
    pub expiration: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct XrangeParams {
    #[schemars(description = "Stream key")]
    pub key: String,

    #[schemars(description = "Maximum number of entries to return (default: 1)")]
    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct XdelParams {
    #[schemars(description = "Stream key")]
    pub key: String,

    #[schemars(description = "Entry ID to delete, e.g. 1700000000000-0")]
    pub entry_id: String,
}

impl RedisMcpServer {
    pub async fn do_xadd(&self, params: XaddParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("xadd").map_err(|e| self.err(e))?;
        if params.fields.is_empty() {
            return Err(self.err(McpRedisError::InvalidArgument(
                "fields must contain at least one field/value pair".to_string(),
            )));
        }
        let mut conn = self.conn();
        let ttl = positive_ttl(params.expiration);

        let mut pipe = redis::pipe();
        pipe.atomic().cmd("XADD").arg(&params.key).arg("*");
        for (field, value) in &params.fields {
            pipe.arg(field).arg(value.to_string());
        }
        queue_expire(&mut pipe, &params.key, ttl);

        let replies: Vec<Value> = match pipe.query_async(&mut conn).await {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error adding to stream {}", params.key),
                    e,
                ))
            }
        };

        let id = match replies.first() {
            Some(Value::BulkString(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
            Some(Value::SimpleString(s)) => s.clone(),
            _ => "unknown".to_string(),
        };

        let mut message = format!("Successfully added entry {} to {}", id, params.key);
        if let Some(seconds) = ttl {
            message.push_str(&format!(" with expiration {seconds} seconds"));
        }
        Ok(text(message))
    }

    pub async fn do_xrange(&self, params: XrangeParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let reply: Value = match redis::cmd("XRANGE")
            .arg(&params.key)
            .arg("-")
            .arg("+")
            .arg("COUNT")
            .arg(params.count.unwrap_or(1).max(1))
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error reading from stream {}", params.key),
                    e,
                ))
            }
        };

        let entries = stream_entries(&reply);
        if entries.is_empty() {
            return Ok(text(format!(
                "Stream {} is empty or does not exist",
                params.key
            )));
        }
        Ok(json_result(&entries))
    }

    pub async fn do_xdel(&self, params: XdelParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("xdel").map_err(|e| self.err(e))?;
        let mut conn = self.conn();

        let removed: i64 = match redis::cmd("XDEL")
            .arg(&params.key)
            .arg(&params.entry_id)
            .query_async(&mut conn)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                return Ok(failure(
                    format!("Error deleting from stream {}", params.key),
                    e,
                ))
            }
        };

        if removed > 0 {
            Ok(text(format!(
                "Successfully deleted entry {} from {}",
                params.entry_id, params.key
            )))
        } else {
            Ok(text(format!(
                "Entry {} not found in {}",
                params.entry_id, params.key
            )))
        }
    }
}

#[tool_router(router = tool_router_stream, vis = "pub")]
impl RedisMcpServer {
    #[tool(
        name = "xadd",
        description = "Append an entry with the given fields to a stream, optionally expiring the stream after a number of seconds"
    )]
    async fn xadd(
        &self,
        Parameters(params): Parameters<XaddParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_xadd(params).await
    }

    #[tool(name = "xrange", description = "Read the oldest entries of a stream")]
    async fn xrange(
        &self,
        Parameters(params): Parameters<XrangeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_xrange(params).await
    }

    #[tool(name = "xdel", description = "Delete an entry from a stream by ID")]
    async fn xdel(
        &self,
        Parameters(params): Parameters<XdelParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_xdel(params).await
    }
}
