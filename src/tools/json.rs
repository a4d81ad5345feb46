use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_router};
use serde::Deserialize;

use crate::server::{
    expiry_note, failure, json_result, positive_ttl, queue_expire, text, RedisMcpServer,
};

const ROOT_PATH: &str = "$";

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct JsonSetParams {
    #[schemars(description = "Key of the JSON document")]
    pub name: String,

    #[schemars(description = "JSONPath to set (default: $, the whole document)")]
    #[serde(default)]
    pub path: Option<String>,

    #[schemars(description = "JSON value to store at the path")]
    pub value: serde_json::Value,

    #[schemars(description = "Optional expiration for the document, in seconds")]
    #[serde(default)]
    pub expire_seconds: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct JsonPathParams {
    #[schemars(description = "Key of the JSON document")]
    pub name: String,

    #[schemars(description = "JSONPath (default: $, the whole document)")]
    #[serde(default)]
    pub path: Option<String>,
}

impl RedisMcpServer {
    pub async fn do_json_set(&self, params: JsonSetParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("json_set").map_err(|e| self.err(e))?;
        let path = params.path.as_deref().unwrap_or(ROOT_PATH);
        let mut conn = self.conn();
        let ttl = positive_ttl(params.expire_seconds);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("JSON.SET")
            .arg(&params.name)
            .arg(path)
            .arg(params.value.to_string())
            .ignore();
        queue_expire(&mut pipe, &params.name, ttl);

        let result: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
        if let Err(e) = result {
            return Ok(failure(
                format!("Error setting JSON value at path '{}' in '{}'", path, params.name),
                e,
            ));
        }

        Ok(text(format!(
            "JSON value set at path '{}' in '{}'.{}",
            path,
            params.name,
            expiry_note(ttl)
        )))
    }

    pub async fn do_json_get(&self, params: JsonPathParams) -> Result<CallToolResult, ErrorData> {
        let path = params.path.as_deref().unwrap_or(ROOT_PATH);
        let mut conn = self.conn();

        let raw: Option<String> = match redis::cmd("JSON.GET")
            .arg(&params.name)
            .arg(path)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error retrieving JSON value at path '{}' in '{}'", path, params.name),
                    e,
                ))
            }
        };

        let Some(raw) = raw else {
            return Ok(text(format!(
                "No data found at path '{}' in '{}'.",
                path, params.name
            )));
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            // JSONPath queries answer with an array of matches.
            Ok(serde_json::Value::Array(matches)) if matches.is_empty() => Ok(text(format!(
                "No data found at path '{}' in '{}'.",
                path, params.name
            ))),
            Ok(value) => Ok(json_result(&value)),
            Err(_) => Ok(text(raw)),
        }
    }

    pub async fn do_json_del(&self, params: JsonPathParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("json_del").map_err(|e| self.err(e))?;
        let path = params.path.as_deref().unwrap_or(ROOT_PATH);
        let mut conn = self.conn();

        let removed: i64 = match redis::cmd("JSON.DEL")
            .arg(&params.name)
            .arg(path)
            .query_async(&mut conn)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                return Ok(failure(
                    format!("Error deleting JSON value at path '{}' in '{}'", path, params.name),
                    e,
                ))
            }
        };

        if removed > 0 {
            Ok(text(format!(
                "Deleted JSON value at path '{}' in '{}'.",
                path, params.name
            )))
        } else {
            Ok(text(format!(
                "No JSON value found at path '{}' in '{}'.",
                path, params.name
            )))
        }
    }
}

#[tool_router(router = tool_router_json, vis = "pub")]
impl RedisMcpServer {
    #[tool(
        name = "json_set",
        description = "Set a JSON value at a path in a JSON document, optionally expiring the document after a number of seconds"
    )]
    async fn json_set(
        &self,
        Parameters(params): Parameters<JsonSetParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_json_set(params).await
    }

    #[tool(
        name = "json_get",
        description = "Get the JSON value at a path in a JSON document. JSONPath results are returned as an array of matches"
    )]
    async fn json_get(
        &self,
        Parameters(params): Parameters<JsonPathParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_json_get(params).await
    }

    #[tool(name = "json_del", description = "Delete the JSON value at a path in a JSON document")]
    async fn json_del(
        &self,
        Parameters(params): Parameters<JsonPathParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_json_del(params).await
    }
}
