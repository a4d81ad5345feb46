use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_router};
use serde::Deserialize;

use super::Scalar;
use crate::server::{
    expiry_note, failure, json_result, positive_ttl, queue_expire, text, RedisMcpServer,
};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PushParams {
    #[schemars(description = "List key")]
    pub name: String,

    #[schemars(description = "Value to push (string, number or boolean)")]
    pub value: Scalar,

    #[schemars(description = "Optional expiration for the list, in seconds")]
    #[serde(default)]
    pub expire: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListParams {
    #[schemars(description = "List key")]
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LrangeParams {
    #[schemars(description = "List key")]
    pub name: String,

    #[schemars(description = "Start index (default: 0)")]
    #[serde(default)]
    pub start: Option<i64>,

    #[schemars(description = "Stop index, inclusive (default: -1 for end of list)")]
    #[serde(default)]
    pub stop: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
enum End {
    Left,
    Right,
}

impl End {
    fn push(self) -> &'static str {
        match self {
            End::Left => "LPUSH",
            End::Right => "RPUSH",
        }
    }

    fn pop(self) -> &'static str {
        match self {
            End::Left => "LPOP",
            End::Right => "RPOP",
        }
    }

    fn side(self) -> &'static str {
        match self {
            End::Left => "left",
            End::Right => "right",
        }
    }
}

impl RedisMcpServer {
    async fn push(&self, end: End, params: PushParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only(&end.push().to_ascii_lowercase())
            .map_err(|e| self.err(e))?;
        let mut conn = self.conn();
        let ttl = positive_ttl(params.expire);
        let value = params.value.to_string();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd(end.push())
            .arg(&params.name)
            .arg(&value)
            .ignore();
        queue_expire(&mut pipe, &params.name, ttl);

        let result: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
        if let Err(e) = result {
            return Ok(failure(
                format!("Error pushing value to list '{}'", params.name),
                e,
            ));
        }

        Ok(text(format!(
            "Value '{}' pushed to the {} of list '{}'.{}",
            value,
            end.side(),
            params.name,
            expiry_note(ttl)
        )))
    }

    async fn pop(&self, end: End, params: ListParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only(&end.pop().to_ascii_lowercase())
            .map_err(|e| self.err(e))?;
        let mut conn = self.conn();

        let value: Option<Vec<u8>> = match redis::cmd(end.pop())
            .arg(&params.name)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error popping value from list '{}'", params.name),
                    e,
                ))
            }
        };

        match value {
            Some(bytes) => Ok(text(String::from_utf8_lossy(&bytes))),
            None => Ok(text(format!(
                "List '{}' is empty or does not exist.",
                params.name
            ))),
        }
    }

    pub async fn do_lpush(&self, params: PushParams) -> Result<CallToolResult, ErrorData> {
        self.push(End::Left, params).await
    }

    pub async fn do_rpush(&self, params: PushParams) -> Result<CallToolResult, ErrorData> {
        self.push(End::Right, params).await
    }

    pub async fn do_lpop(&self, params: ListParams) -> Result<CallToolResult, ErrorData> {
        self.pop(End::Left, params).await
    }

    pub async fn do_rpop(&self, params: ListParams) -> Result<CallToolResult, ErrorData> {
        self.pop(End::Right, params).await
    }

    pub async fn do_lrange(&self, params: LrangeParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();
        let start = params.start.unwrap_or(0);
        let stop = params.stop.unwrap_or(-1);

        let elements: Vec<String> = match redis::cmd("LRANGE")
            .arg(&params.name)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error retrieving values from list '{}'", params.name),
                    e,
                ))
            }
        };

        if elements.is_empty() {
            return Ok(text(format!(
                "List '{}' is empty or does not exist.",
                params.name
            )));
        }
        Ok(json_result(&elements))
    }

    pub async fn do_llen(&self, params: ListParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let len: i64 = match redis::cmd("LLEN").arg(&params.name).query_async(&mut conn).await {
            Ok(n) => n,
            Err(e) => {
                return Ok(failure(
                    format!("Error retrieving length of list '{}'", params.name),
                    e,
                ))
            }
        };

        Ok(text(len.to_string()))
    }
}

#[tool_router(router = tool_router_list, vis = "pub")]
impl RedisMcpServer {
    #[tool(name = "lpush", description = "Push a value onto the left (head) of a list")]
    async fn lpush(
        &self,
        Parameters(params): Parameters<PushParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_lpush(params).await
    }

    #[tool(name = "rpush", description = "Push a value onto the right (tail) of a list")]
    async fn rpush(
        &self,
        Parameters(params): Parameters<PushParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_rpush(params).await
    }

    #[tool(name = "lpop", description = "Remove and return the first element of a list")]
    async fn lpop(
        &self,
        Parameters(params): Parameters<ListParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_lpop(params).await
    }

    #[tool(name = "rpop", description = "Remove and return the last element of a list")]
    async fn rpop(
        &self,
        Parameters(params): Parameters<ListParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_rpop(params).await
    }

    #[tool(
        name = "lrange",
        description = "Get a range of elements from a list (inclusive indexes, negative counts from the end)"
    )]
    async fn lrange(
        &self,
        Parameters(params): Parameters<LrangeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_lrange(params).await
    }

    #[tool(name = "llen", description = "Get the length of a list")]
    async fn llen(
        &self,
        Parameters(params): Parameters<ListParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_llen(params).await
    }
}
