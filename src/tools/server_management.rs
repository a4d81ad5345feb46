use redis::Value;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_router};
use serde::Deserialize;
use serde_json::json;

use crate::reply::{client_list_to_json, info_to_json};
use crate::server::{failure, json_result, text, RedisMcpServer};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct InfoParams {
    #[schemars(
        description = "Info section to retrieve (e.g. 'memory', 'stats', 'keyspace', 'server', 'all'). Default: default"
    )]
    #[serde(default)]
    pub section: Option<String>,
}

fn unexpected_reply(command: &str, reply: &Value) -> CallToolResult {
    tracing::warn!(command, ?reply, "Unexpected reply type");
    CallToolResult::error(vec![Content::text(format!(
        "Unexpected reply to {command}: {reply:?}"
    ))])
}

impl RedisMcpServer {
    pub async fn do_dbsize(&self) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let size: i64 = match redis::cmd("DBSIZE").query_async(&mut conn).await {
            Ok(n) => n,
            Err(e) => return Ok(failure("Error getting database size", e)),
        };

        Ok(text(size.to_string()))
    }

    pub async fn do_info(&self, params: InfoParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();
        let section = params.section.as_deref().unwrap_or("default");

        let reply: Value = match redis::cmd("INFO").arg(section).query_async(&mut conn).await {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error retrieving Redis info for section '{section}'"),
                    e,
                ))
            }
        };

        match info_to_json(&reply) {
            Some(info) => Ok(json_result(&info)),
            None => Ok(unexpected_reply("INFO", &reply)),
        }
    }

    pub async fn do_client_list(&self) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let reply: Value = match redis::cmd("CLIENT").arg("LIST").query_async(&mut conn).await {
            Ok(v) => v,
            Err(e) => return Ok(failure("Error retrieving client list", e)),
        };

        let Some(clients) = client_list_to_json(&reply) else {
            return Ok(unexpected_reply("CLIENT LIST", &reply));
        };
        Ok(json_result(&json!({
            "clients": clients,
            "count": clients.len(),
        })))
    }
}

#[tool_router(router = tool_router_server_management, vis = "pub")]
impl RedisMcpServer {
    #[tool(name = "dbsize", description = "Get the number of keys in the current database")]
    async fn dbsize(&self) -> Result<CallToolResult, ErrorData> {
        self.do_dbsize().await
    }

    #[tool(
        name = "info",
        description = "Get Redis server information and statistics as JSON. Optionally specify a section: memory, stats, keyspace, server, clients, etc."
    )]
    async fn info(
        &self,
        Parameters(params): Parameters<InfoParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_info(params).await
    }

    #[tool(
        name = "client_list",
        description = "List connected Redis clients with address, name, idle time, and current command"
    )]
    async fn client_list(&self) -> Result<CallToolResult, ErrorData> {
        self.do_client_list().await
    }
}
