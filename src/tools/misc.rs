use std::collections::BTreeMap;

use redis::Value;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_router};
use serde::Deserialize;
use serde_json::json;

use super::string::KeyParams;
use crate::error::McpRedisError;
use crate::reply::{stream_entries, value_to_json};
use crate::server::{failure, json_result, text, RedisMcpServer, MAX_SCAN_ITERATIONS};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExpireParams {
    #[schemars(description = "Key to expire")]
    pub name: String,

    #[schemars(description = "Time to live in seconds")]
    pub expire_seconds: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RenameParams {
    #[schemars(description = "Current key name")]
    pub old_key: String,

    #[schemars(description = "New key name")]
    pub new_key: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScanParams {
    #[schemars(description = "Key pattern to match (e.g. 'user:*'). Default: *")]
    #[serde(default)]
    pub pattern: Option<String>,

    #[schemars(description = "Hint for how many keys to examine in this step. Default: 100")]
    #[serde(default)]
    pub count: Option<u32>,

    #[schemars(description = "Cursor returned by the previous call. Default: 0 (start)")]
    #[serde(default)]
    pub cursor: Option<u64>,

    #[schemars(
        description = "Cluster only: the node returned by the previous call. Default: the first primary"
    )]
    #[serde(default)]
    pub node: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScanAllParams {
    #[schemars(description = "Key pattern to match (e.g. 'session:*'). Default: *")]
    #[serde(default)]
    pub pattern: Option<String>,

    #[schemars(description = "Keys examined per SCAN step. Default: 100")]
    #[serde(default)]
    pub batch_size: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RawCommandParams {
    #[schemars(description = "Redis command, e.g. 'GET', 'HGETALL' or 'CLIENT LIST'")]
    pub command: String,

    #[schemars(description = "Command arguments")]
    #[serde(default)]
    pub args: Vec<String>,
}

/// Rejects patterns Redis would treat as a truncated string.
fn validate_pattern(pattern: &str) -> Result<(), McpRedisError> {
    if pattern.contains('\0') {
        return Err(McpRedisError::InvalidArgument(
            "Pattern must not contain null bytes".to_string(),
        ));
    }
    Ok(())
}

/// Splits `CLIENT LIST` style commands into name and leading arguments.
pub fn split_command(command: &str, args: &[String]) -> Result<Vec<String>, McpRedisError> {
    let mut parts: Vec<String> = command.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() {
        return Err(McpRedisError::InvalidArgument(
            "command must not be empty".to_string(),
        ));
    }
    parts.extend(args.iter().cloned());
    Ok(parts)
}

fn scan_command(cursor: u64, pattern: &str, count: u32) -> redis::Cmd {
    let mut cmd = redis::cmd("SCAN");
    cmd.arg(cursor)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(count.max(1));
    cmd
}

/// Where a scan continues after a SCAN step on node `index` returned `cursor`.
/// A cluster is walked one primary after the other; a standalone server
/// (`node_count == 0`) only has its own cursor. `None` means the scan is done.
pub fn next_scan_position(node_count: usize, index: usize, cursor: u64) -> Option<(usize, u64)> {
    if cursor != 0 {
        Some((index, cursor))
    } else if index + 1 < node_count {
        Some((index + 1, 0))
    } else {
        None
    }
}

impl RedisMcpServer {
    pub async fn do_delete(&self, params: KeyParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("delete").map_err(|e| self.err(e))?;
        let mut conn = self.conn();

        let removed: i64 = match redis::cmd("DEL").arg(&params.key).query_async(&mut conn).await {
            Ok(n) => n,
            Err(e) => return Ok(failure(format!("Error deleting key {}", params.key), e)),
        };

        if removed > 0 {
            Ok(text(format!("Successfully deleted {}", params.key)))
        } else {
            Ok(text(format!("Key {} not found", params.key)))
        }
    }

    pub async fn do_type(&self, params: KeyParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let mut pipe = redis::pipe();
        pipe.cmd("TYPE").arg(&params.key).cmd("TTL").arg(&params.key);
        let (key_type, ttl): (String, i64) = match pipe.query_async(&mut conn).await {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error retrieving type for key {}", params.key),
                    e,
                ))
            }
        };

        Ok(json_result(&json!({
            "key": params.key,
            "type": key_type,
            "ttl": ttl,
        })))
    }

    pub async fn do_expire(&self, params: ExpireParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("expire").map_err(|e| self.err(e))?;
        let mut conn = self.conn();

        let applied: bool = match redis::cmd("EXPIRE")
            .arg(&params.name)
            .arg(params.expire_seconds)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error setting expiration for key '{}'", params.name),
                    e,
                ))
            }
        };

        if applied {
            Ok(text(format!(
                "Expiration set to {} seconds for '{}'.",
                params.expire_seconds, params.name
            )))
        } else {
            Ok(text(format!("Key '{}' does not exist.", params.name)))
        }
    }

    pub async fn do_rename(&self, params: RenameParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("rename").map_err(|e| self.err(e))?;
        let mut conn = self.conn();
        let context = format!("Error renaming key '{}'", params.old_key);

        let exists: bool = match redis::cmd("EXISTS")
            .arg(&params.old_key)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => return Ok(failure(context, e)),
        };
        if !exists {
            return Ok(text(format!("Key '{}' does not exist.", params.old_key)));
        }

        let result: redis::RedisResult<()> = redis::cmd("RENAME")
            .arg(&params.old_key)
            .arg(&params.new_key)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            return Ok(failure(context, e));
        }

        Ok(text(format!(
            "Renamed key '{}' to '{}'",
            params.old_key, params.new_key
        )))
    }

    pub async fn do_scan_keys(&self, params: ScanParams) -> Result<CallToolResult, ErrorData> {
        let pattern = params.pattern.as_deref().unwrap_or("*");
        validate_pattern(pattern).map_err(|e| self.err(e))?;
        let mut conn = self.conn();

        let primaries = match conn.primaries().await {
            Ok(p) => p,
            Err(e) => return Ok(failure("Error listing cluster primaries", e)),
        };
        let index = match (params.node.as_deref(), primaries.is_empty()) {
            (Some(node), false) => primaries.iter().position(|p| p == node).ok_or_else(|| {
                self.err(McpRedisError::InvalidArgument(format!(
                    "'{node}' is not a primary of this cluster"
                )))
            })?,
            _ => 0,
        };
        let node = primaries.get(index).map(String::as_str);

        let cmd = scan_command(params.cursor.unwrap_or(0), pattern, params.count.unwrap_or(100));
        let (cursor, keys): (u64, Vec<String>) = match conn.query_node(node, &cmd).await {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error scanning keys with pattern '{pattern}'"),
                    e,
                ))
            }
        };

        let next = next_scan_position(primaries.len(), index, cursor);
        let mut result = json!({
            "cursor": next.map_or(0, |(_, c)| c),
            "keys": keys,
            "total_scanned": keys.len(),
            "scan_complete": next.is_none(),
        });
        if let Some(node) = next.and_then(|(i, _)| primaries.get(i)) {
            result["node"] = json!(node);
        }
        Ok(json_result(&result))
    }

    pub async fn do_scan_all_keys(&self, params: ScanAllParams) -> Result<CallToolResult, ErrorData> {
        let pattern = params.pattern.as_deref().unwrap_or("*");
        validate_pattern(pattern).map_err(|e| self.err(e))?;
        let batch_size = params.batch_size.unwrap_or(100);
        let max_keys = self.options().max_keys;
        let mut conn = self.conn();

        let primaries = match conn.primaries().await {
            Ok(p) => p,
            Err(e) => return Ok(failure("Error listing cluster primaries", e)),
        };

        let mut keys: Vec<String> = Vec::new();
        let mut position = Some((0, 0));
        let mut iterations = 0;

        while let Some((index, cursor)) = position {
            let node = primaries.get(index).map(String::as_str);
            let cmd = scan_command(cursor, pattern, batch_size);
            let (next_cursor, batch): (u64, Vec<String>) = match conn.query_node(node, &cmd).await {
                Ok(v) => v,
                Err(e) => {
                    return Ok(failure(
                        format!("Error scanning all keys with pattern '{pattern}'"),
                        e,
                    ))
                }
            };

            keys.extend(batch);
            position = next_scan_position(primaries.len(), index, next_cursor);
            iterations += 1;

            if keys.len() >= max_keys || iterations >= MAX_SCAN_ITERATIONS {
                break;
            }
        }

        if position.is_some() {
            tracing::debug!(pattern, collected = keys.len(), "Stopped full scan early");
        }
        keys.truncate(max_keys);

        Ok(json_result(&keys))
    }

    pub async fn do_get_key_info(&self, params: KeyParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();
        let context = format!("Error retrieving info for key {}", params.key);

        let mut pipe = redis::pipe();
        pipe.cmd("TYPE").arg(&params.key).cmd("TTL").arg(&params.key);
        let (key_type, ttl): (String, i64) = match pipe.query_async(&mut conn).await {
            Ok(v) => v,
            Err(e) => return Ok(failure(context, e)),
        };

        let value = match key_type.as_str() {
            "none" => {
                return Ok(json_result(&json!({
                    "error": "Key does not exist",
                    "key": params.key,
                })));
            }
            "string" => redis::cmd("GET")
                .arg(&params.key)
                .query_async(&mut conn)
                .await
                .map(|v: Value| value_to_json(&v)),
            "list" => redis::cmd("LRANGE")
                .arg(&params.key)
                .arg(0)
                .arg(-1)
                .query_async(&mut conn)
                .await
                .map(|v: Value| value_to_json(&v)),
            "set" => redis::cmd("SMEMBERS")
                .arg(&params.key)
                .query_async(&mut conn)
                .await
                .map(|mut members: Vec<String>| {
                    members.sort();
                    json!(members)
                }),
            "hash" => redis::cmd("HGETALL")
                .arg(&params.key)
                .query_async(&mut conn)
                .await
                .map(|fields: BTreeMap<String, Vec<u8>>| {
                    let map: serde_json::Map<String, serde_json::Value> = fields
                        .into_iter()
                        .map(|(k, v)| (k, json!(String::from_utf8_lossy(&v))))
                        .collect();
                    serde_json::Value::Object(map)
                }),
            "zset" => redis::cmd("ZRANGE")
                .arg(&params.key)
                .arg(0)
                .arg(-1)
                .arg("WITHSCORES")
                .query_async(&mut conn)
                .await
                .map(|members: Vec<(String, f64)>| {
                    json!(members
                        .iter()
                        .map(|(m, s)| json!({"member": m, "score": s}))
                        .collect::<Vec<_>>())
                }),
            "stream" => redis::cmd("XRANGE")
                .arg(&params.key)
                .arg("-")
                .arg("+")
                .query_async(&mut conn)
                .await
                .map(|v: Value| json!(stream_entries(&v))),
            "ReJSON-RL" => redis::cmd("JSON.GET")
                .arg(&params.key)
                .arg("$")
                .query_async(&mut conn)
                .await
                .map(|raw: String| {
                    serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
                }),
            other => Ok(json!({"type": other, "note": "Unsupported type"})),
        };

        let value = match value {
            Ok(v) => v,
            Err(e) => return Ok(failure(context, e)),
        };

        Ok(json_result(&json!({
            "key": params.key,
            "type": key_type,
            "ttl": ttl,
            "value": value,
        })))
    }

    pub async fn do_execute_raw_command(
        &self,
        params: RawCommandParams,
    ) -> Result<CallToolResult, ErrorData> {
        let parts = split_command(&params.command, &params.args).map_err(|e| self.err(e))?;
        self.check_raw_command(&parts[0]).map_err(|e| self.err(e))?;
        let mut conn = self.conn();

        let mut cmd = redis::cmd(&parts[0]);
        for arg in &parts[1..] {
            cmd.arg(arg);
        }

        let reply: Value = match cmd.query_async(&mut conn).await {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error executing command {}", params.command),
                    e,
                ))
            }
        };

        Ok(json_result(&value_to_json(&reply)))
    }
}

#[tool_router(router = tool_router_misc, vis = "pub")]
impl RedisMcpServer {
    #[tool(name = "delete", description = "Delete a Redis key")]
    async fn delete(
        &self,
        Parameters(params): Parameters<KeyParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_delete(params).await
    }

    #[tool(
        name = "type",
        description = "Return the type of a key (string, list, set, zset, hash, stream, ReJSON-RL) and its TTL in seconds (-1 no expiry, -2 missing)"
    )]
    async fn key_type(
        &self,
        Parameters(params): Parameters<KeyParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_type(params).await
    }

    #[tool(name = "expire", description = "Set an expiration time in seconds on a key")]
    async fn expire(
        &self,
        Parameters(params): Parameters<ExpireParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_expire(params).await
    }

    #[tool(
        name = "rename",
        description = "Rename a key. Overwrites the destination if it already exists"
    )]
    async fn rename(
        &self,
        Parameters(params): Parameters<RenameParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_rename(params).await
    }

    #[tool(
        name = "scan_keys",
        description = "Run one SCAN step for keys matching a pattern. Pass the returned cursor (and node, on a cluster) back to continue until scan_complete is true"
    )]
    async fn scan_keys(
        &self,
        Parameters(params): Parameters<ScanParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_scan_keys(params).await
    }

    #[tool(
        name = "scan_all_keys",
        description = "Iterate SCAN to completion and return every key matching a pattern, up to the server's key limit"
    )]
    async fn scan_all_keys(
        &self,
        Parameters(params): Parameters<ScanAllParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_scan_all_keys(params).await
    }

    #[tool(
        name = "get_key_info",
        description = "Get the type, TTL and full value of a key of any type"
    )]
    async fn get_key_info(
        &self,
        Parameters(params): Parameters<KeyParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get_key_info(params).await
    }

    #[tool(
        name = "execute_raw_command",
        description = "Execute any Redis command (e.g. JSON.GET, FT.SEARCH, CLIENT LIST) and return the reply as JSON"
    )]
    async fn execute_raw_command(
        &self,
        Parameters(params): Parameters<RawCommandParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_execute_raw_command(params).await
    }
}
