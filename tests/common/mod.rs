#![allow(dead_code)]

use redis::Value;
use redis_mcp_server::config::RedisConfig;
use redis_mcp_server::connection::{connect, RedisConnection};
use redis_mcp_server::server::{RedisMcpServer, ServerOptions};
use rmcp::model::CallToolResult;

/// Try to connect to Redis with a short timeout. Skip tests if not available.
pub async fn try_connect() -> Option<RedisConnection> {
    let url =
        std::env::var("REDIS_TEST_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
    let config = RedisConfig::from_url(&url).ok()?;

    // Use a timeout so tests skip quickly when Redis is not running
    let connection =
        match tokio::time::timeout(std::time::Duration::from_secs(2), connect(&config)).await {
            Ok(Ok(c)) => c,
            _ => return None,
        };

    let mut conn = connection.conn.clone();
    let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
    if pong.is_err() {
        return None;
    }

    Some(connection)
}

/// Connect or skip the test gracefully.
macro_rules! require_redis {
    () => {
        match $crate::common::try_connect().await {
            Some(c) => c,
            None => {
                eprintln!("Skipping: Redis not available");
                return;
            }
        }
    };
}

pub fn make_server(connection: RedisConnection) -> RedisMcpServer {
    RedisMcpServer::new(connection, ServerOptions::default())
}

pub fn make_read_only_server(connection: RedisConnection) -> RedisMcpServer {
    RedisMcpServer::new(
        connection,
        ServerOptions {
            read_only: true,
            ..ServerOptions::default()
        },
    )
}

/// Deletes the keys a test is about to use. Tests run concurrently against
/// one database, so each test owns its own key names instead of flushing.
pub async fn reset_keys(connection: &RedisConnection, keys: &[&str]) {
    let mut conn = connection.conn.clone();
    for key in keys {
        let _: Result<i64, _> = redis::cmd("DEL").arg(*key).query_async(&mut conn).await;
    }
}

/// Whether the server knows `command` (module commands such as JSON.SET or FT.SEARCH).
pub async fn supports(connection: &RedisConnection, command: &str) -> bool {
    let mut conn = connection.conn.clone();
    let reply: Result<Value, _> = redis::cmd("COMMAND")
        .arg("INFO")
        .arg(command)
        .query_async(&mut conn)
        .await;
    match reply {
        Ok(Value::Array(items)) => items.first().is_some_and(|v| !matches!(v, Value::Nil)),
        _ => false,
    }
}

pub fn text_of(result: &CallToolResult) -> String {
    result
        .content
        .first()
        .and_then(|c| c.as_text())
        .map(|t| t.text.clone())
        .unwrap_or_default()
}

pub fn extract_json(result: CallToolResult) -> serde_json::Value {
    serde_json::from_str(&text_of(&result)).unwrap_or(serde_json::Value::Null)
}

pub fn is_error(result: &CallToolResult) -> bool {
    result.is_error == Some(true)
}
