use std::path::Path;

use anyhow::{Context, Result};
use clap::{builder::BoolishValueParser, Parser};
use redis_mcp_server::config::{load_env_file, RedisArgs};
use redis_mcp_server::connection::connect;
use redis_mcp_server::server::{RedisMcpServer, ServerOptions, DEFAULT_MAX_KEYS};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

/// MCP server for Redis: strings, hashes, lists, sets, streams, pub/sub, JSON and vector search
#[derive(Parser)]
#[command(name = "redis-mcp-server", version, about)]
struct Cli {
    #[command(flatten)]
    redis: RedisArgs,

    /// Reject every tool that modifies Redis.
    #[arg(
        long,
        env = "REDIS_MCP_READ_ONLY",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    read_only: bool,

    /// Maximum number of keys returned by scan_all_keys.
    #[arg(long, env = "REDIS_MCP_MAX_KEYS", default_value_t = DEFAULT_MAX_KEYS)]
    max_keys: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so `.env` values reach the environment fallbacks.
    let env_file = load_env_file(Path::new(".env"));
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match env_file {
        Ok(true) => tracing::debug!("Loaded environment from .env"),
        Ok(false) => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    let config = cli
        .redis
        .into_config()
        .context("Invalid Redis configuration")?;

    let connection = connect(&config)
        .await
        .with_context(|| format!("Cannot connect to Redis at {}:{}", config.host, config.port))?;

    let mut conn = connection.conn.clone();
    let _: String = redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .with_context(|| format!("Redis at {} did not answer PING", connection.url_redacted))?;

    tracing::info!(
        url = %connection.url_redacted,
        cluster = config.cluster_mode,
        read_only = cli.read_only,
        max_keys = cli.max_keys,
        "Starting the Redis MCP Server"
    );

    let options = ServerOptions {
        read_only: cli.read_only,
        max_keys: cli.max_keys.max(1),
    };
    let service = RedisMcpServer::new(connection, options);
    let running = service.serve(stdio()).await?;
    running.waiting().await?;

    Ok(())
}
