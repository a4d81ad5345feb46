use std::fmt::Display;
use std::sync::Arc;

use redis::RedisError;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::model::*;
use rmcp::{tool_handler, ServerHandler};
use serde::Serialize;

use crate::connection::{RedisConnection, RedisHandle};
use crate::error::McpRedisError;
use crate::pubsub::Subscriber;

/// Maximum number of SCAN iterations as a safety valve
pub const MAX_SCAN_ITERATIONS: usize = 1000;

/// Default cap on keys returned by a full keyspace scan.
pub const DEFAULT_MAX_KEYS: usize = 10_000;

/// Commands `execute_raw_command` may run in read-only mode.
pub const READ_ONLY_COMMANDS: &[&str] = &[
    "DBSIZE", "ECHO", "EXISTS", "FT.AGGREGATE", "FT.EXPLAIN", "FT.INFO", "FT.SEARCH", "FT._LIST",
    "GET", "GETRANGE", "HEXISTS", "HGET", "HGETALL", "HKEYS", "HLEN", "HMGET", "HSCAN", "HVALS",
    "INFO", "JSON.ARRLEN", "JSON.GET", "JSON.MGET", "JSON.OBJKEYS", "JSON.STRLEN", "JSON.TYPE",
    "LINDEX", "LLEN", "LRANGE", "MGET", "PING", "PTTL", "SCAN", "SCARD", "SISMEMBER", "SMEMBERS",
    "SSCAN", "STRLEN", "TIME", "TTL", "TYPE", "XINFO", "XLEN", "XRANGE", "XREVRANGE", "ZCARD",
    "ZCOUNT", "ZRANGE", "ZRANGEBYSCORE", "ZRANK", "ZREVRANGE", "ZSCAN", "ZSCORE",
];

const SERVER_INSTRUCTIONS: &str = "Redis server. Tools by data type: \
     strings (set, get), keys (delete, type, expire, rename, scan_keys, scan_all_keys, \
     get_key_info, execute_raw_command), hashes (hset, hget, hdel, hgetall, hexists, \
     set_vector_in_hash, get_vector_from_hash), lists (lpush, rpush, lpop, rpop, lrange, llen), \
     sets (sadd, srem, smembers), sorted sets (zadd, zrange, zrem), streams (xadd, xrange, xdel), \
     pub/sub (publish, subscribe, unsubscribe, read_messages), JSON documents (json_set, \
     json_get, json_del), vector search (get_indexes, get_index_info, create_vector_index_hash, \
     vector_search_hash) and server state (dbsize, info, client_list). \
     Prefer scan_keys over scan_all_keys on large databases.";

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Reject every tool that would modify Redis.
    pub read_only: bool,
    /// Upper bound on keys collected by `scan_all_keys`.
    pub max_keys: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            max_keys: DEFAULT_MAX_KEYS,
        }
    }
}

#[derive(Clone)]
pub struct RedisMcpServer {
    connection: Arc<RedisConnection>,
    subscriber: Subscriber,
    options: ServerOptions,
    tool_router: ToolRouter<Self>,
}

impl RedisMcpServer {
    pub fn new(connection: RedisConnection, options: ServerOptions) -> Self {
        let subscriber = Subscriber::new(connection.pubsub_client.clone());
        let tool_router = Self::tool_router_string()
            + Self::tool_router_misc()
            + Self::tool_router_hash()
            + Self::tool_router_list()
            + Self::tool_router_set()
            + Self::tool_router_sorted_set()
            + Self::tool_router_stream()
            + Self::tool_router_pub_sub()
            + Self::tool_router_json()
            + Self::tool_router_query_engine()
            + Self::tool_router_server_management();
        Self {
            connection: Arc::new(connection),
            subscriber,
            options,
            tool_router,
        }
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub(crate) fn conn(&self) -> RedisHandle {
        self.connection.conn.clone()
    }

    pub(crate) fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }

    pub(crate) fn check_read_only(&self, operation: &str) -> Result<(), McpRedisError> {
        if self.options.read_only {
            return Err(McpRedisError::ReadOnly(format!(
                "'{}' is not allowed while the server runs in read-only mode",
                operation
            )));
        }
        Ok(())
    }

    /// Guards `execute_raw_command` against commands outside the read-only
    /// allow list.
    pub(crate) fn check_raw_command(&self, command: &str) -> Result<(), McpRedisError> {
        if !self.options.read_only {
            return Ok(());
        }
        let upper = command.to_ascii_uppercase();
        if READ_ONLY_COMMANDS.contains(&upper.as_str()) {
            Ok(())
        } else {
            Err(McpRedisError::ReadOnly(format!(
                "command '{}' is not allowed while the server runs in read-only mode",
                upper
            )))
        }
    }

    pub(crate) fn err(&self, e: McpRedisError) -> ErrorData {
        e.to_mcp_error()
    }
}

/// Plain text tool output.
pub(crate) fn text(message: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(message.into())])
}

/// Pretty-printed JSON tool output.
pub(crate) fn json_result<T: Serialize>(value: &T) -> CallToolResult {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    CallToolResult::success(vec![Content::text(text)])
}

/// A Redis failure reported back to the agent as a tool error.
pub(crate) fn failure(context: impl Display, error: RedisError) -> CallToolResult {
    tracing::warn!(error = %error, "{context}");
    CallToolResult::error(vec![Content::text(format!("{context}: {error}"))])
}

/// Appends ` Expires in {n} seconds.` style suffixes used by the write tools.
pub(crate) fn expiry_note(seconds: Option<i64>) -> String {
    match seconds {
        Some(s) => format!(" Expires in {s} seconds."),
        None => String::new(),
    }
}

/// Only positive TTLs are applied; zero or negative means no expiration.
pub(crate) fn positive_ttl(seconds: Option<i64>) -> Option<i64> {
    seconds.filter(|s| *s > 0)
}

/// Queues `EXPIRE key seconds` on an atomic pipeline when a TTL is given.
pub(crate) fn queue_expire(pipe: &mut redis::Pipeline, key: &str, seconds: Option<i64>) {
    if let Some(s) = seconds {
        pipe.cmd("EXPIRE").arg(key).arg(s).ignore();
    }
}

#[tool_handler]
impl ServerHandler for RedisMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "redis-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_allow_list_is_uppercase_and_sorted() {
        let mut sorted = READ_ONLY_COMMANDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, READ_ONLY_COMMANDS);
        assert!(READ_ONLY_COMMANDS
            .iter()
            .all(|c| c.chars().all(|ch| !ch.is_ascii_lowercase())));
        assert!(!READ_ONLY_COMMANDS.contains(&"SET"));
        assert!(!READ_ONLY_COMMANDS.contains(&"FLUSHDB"));
    }

    #[test]
    fn ttl_filtering() {
        assert_eq!(positive_ttl(Some(30)), Some(30));
        assert_eq!(positive_ttl(Some(0)), None);
        assert_eq!(positive_ttl(Some(-5)), None);
        assert_eq!(expiry_note(Some(30)), " Expires in 30 seconds.");
        assert_eq!(expiry_note(None), "");
    }
}
