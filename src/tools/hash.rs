use std::collections::BTreeMap;

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_router};
use serde::Deserialize;
use serde_json::json;

use super::Scalar;
use crate::error::McpRedisError;
use crate::server::{
    expiry_note, failure, json_result, positive_ttl, queue_expire, text, RedisMcpServer,
};
use crate::vector::{decode_f32, encode_f32};

const DEFAULT_VECTOR_FIELD: &str = "vector";

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct HsetParams {
    #[schemars(description = "Hash key")]
    pub name: String,

    #[schemars(description = "Field name inside the hash")]
    pub key: String,

    #[schemars(description = "Value to store (string, number or boolean)")]
    pub value: Scalar,

    #[schemars(description = "Optional expiration for the whole hash, in seconds")]
    #[serde(default)]
    pub expire_seconds: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct HashFieldParams {
    #[schemars(description = "Hash key")]
    pub name: String,

    #[schemars(description = "Field name inside the hash")]
    pub key: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct HashParams {
    #[schemars(description = "Hash key")]
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetVectorParams {
    #[schemars(description = "Hash key")]
    pub name: String,

    #[schemars(description = "Vector components, stored as FLOAT32")]
    pub vector: Vec<f32>,

    #[schemars(description = "Field holding the vector. Default: vector")]
    #[serde(default)]
    pub vector_field: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetVectorParams {
    #[schemars(description = "Hash key")]
    pub name: String,

    #[schemars(description = "Field holding the vector. Default: vector")]
    #[serde(default)]
    pub vector_field: Option<String>,
}

impl RedisMcpServer {
    pub async fn do_hset(&self, params: HsetParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("hset").map_err(|e| self.err(e))?;
        let mut conn = self.conn();
        let ttl = positive_ttl(params.expire_seconds);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("HSET")
            .arg(&params.name)
            .arg(&params.key)
            .arg(params.value.to_string())
            .ignore();
        queue_expire(&mut pipe, &params.name, ttl);

        let result: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
        if let Err(e) = result {
            return Ok(failure(
                format!("Error setting field '{}' in hash '{}'", params.key, params.name),
                e,
            ));
        }

        Ok(text(format!(
            "Field '{}' set successfully in hash '{}'.{}",
            params.key,
            params.name,
            expiry_note(ttl)
        )))
    }

    pub async fn do_hget(&self, params: HashFieldParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let value: Option<Vec<u8>> = match redis::cmd("HGET")
            .arg(&params.name)
            .arg(&params.key)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error getting field '{}' from hash '{}'", params.key, params.name),
                    e,
                ))
            }
        };

        match value {
            Some(bytes) => Ok(text(String::from_utf8_lossy(&bytes))),
            None => Ok(text(format!(
                "Field '{}' not found in hash '{}'.",
                params.key, params.name
            ))),
        }
    }

    pub async fn do_hdel(&self, params: HashFieldParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("hdel").map_err(|e| self.err(e))?;
        let mut conn = self.conn();

        let removed: i64 = match redis::cmd("HDEL")
            .arg(&params.name)
            .arg(&params.key)
            .query_async(&mut conn)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                return Ok(failure(
                    format!("Error deleting field '{}' from hash '{}'", params.key, params.name),
                    e,
                ))
            }
        };

        if removed > 0 {
            Ok(text(format!(
                "Field '{}' deleted from hash '{}'.",
                params.key, params.name
            )))
        } else {
            Ok(text(format!(
                "Field '{}' not found in hash '{}'.",
                params.key, params.name
            )))
        }
    }

    pub async fn do_hgetall(&self, params: HashParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let fields: BTreeMap<String, Vec<u8>> = match redis::cmd("HGETALL")
            .arg(&params.name)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error getting all fields from hash '{}'", params.name),
                    e,
                ))
            }
        };

        if fields.is_empty() {
            return Ok(text(format!(
                "Hash '{}' is empty or does not exist.",
                params.name
            )));
        }

        let map: serde_json::Map<String, serde_json::Value> = fields
            .into_iter()
            .map(|(k, v)| (k, json!(String::from_utf8_lossy(&v))))
            .collect();
        Ok(json_result(&map))
    }

    pub async fn do_hexists(&self, params: HashFieldParams) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let exists: bool = match redis::cmd("HEXISTS")
            .arg(&params.name)
            .arg(&params.key)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!(
                        "Error checking existence of field '{}' in hash '{}'",
                        params.key, params.name
                    ),
                    e,
                ))
            }
        };

        Ok(text(exists.to_string()))
    }

    pub async fn do_set_vector_in_hash(
        &self,
        params: SetVectorParams,
    ) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("set_vector_in_hash")
            .map_err(|e| self.err(e))?;
        if params.vector.is_empty() {
            return Err(self.err(McpRedisError::InvalidArgument(
                "vector must not be empty".to_string(),
            )));
        }
        let field = params.vector_field.as_deref().unwrap_or(DEFAULT_VECTOR_FIELD);
        let mut conn = self.conn();

        let result: redis::RedisResult<()> = redis::cmd("HSET")
            .arg(&params.name)
            .arg(field)
            .arg(encode_f32(&params.vector))
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            return Ok(failure(
                format!("Error storing vector in hash '{}'", params.name),
                e,
            ));
        }

        Ok(text(format!(
            "Vector of dimension {} stored in field '{}' of hash '{}'.",
            params.vector.len(),
            field,
            params.name
        )))
    }

    pub async fn do_get_vector_from_hash(
        &self,
        params: GetVectorParams,
    ) -> Result<CallToolResult, ErrorData> {
        let field = params.vector_field.as_deref().unwrap_or(DEFAULT_VECTOR_FIELD);
        let mut conn = self.conn();

        let blob: Option<Vec<u8>> = match redis::cmd("HGET")
            .arg(&params.name)
            .arg(field)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error retrieving vector from hash '{}'", params.name),
                    e,
                ))
            }
        };

        let Some(blob) = blob else {
            return Ok(text(format!(
                "Field '{}' not found in hash '{}'.",
                field, params.name
            )));
        };

        match decode_f32(&blob) {
            Some(vector) => Ok(json_result(&vector)),
            None => Ok(CallToolResult::error(vec![Content::text(format!(
                "Field '{}' in hash '{}' does not hold a FLOAT32 vector ({} bytes)",
                field,
                params.name,
                blob.len()
            ))])),
        }
    }
}

#[tool_router(router = tool_router_hash, vis = "pub")]
impl RedisMcpServer {
    #[tool(
        name = "hset",
        description = "Set a field in a hash, optionally expiring the whole hash after a number of seconds"
    )]
    async fn hset(
        &self,
        Parameters(params): Parameters<HsetParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_hset(params).await
    }

    #[tool(name = "hget", description = "Get the value of a field in a hash")]
    async fn hget(
        &self,
        Parameters(params): Parameters<HashFieldParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_hget(params).await
    }

    #[tool(name = "hdel", description = "Delete a field from a hash")]
    async fn hdel(
        &self,
        Parameters(params): Parameters<HashFieldParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_hdel(params).await
    }

    #[tool(name = "hgetall", description = "Get all fields and values of a hash")]
    async fn hgetall(
        &self,
        Parameters(params): Parameters<HashParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_hgetall(params).await
    }

    #[tool(name = "hexists", description = "Check whether a field exists in a hash")]
    async fn hexists(
        &self,
        Parameters(params): Parameters<HashFieldParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_hexists(params).await
    }

    #[tool(
        name = "set_vector_in_hash",
        description = "Store a vector as a FLOAT32 blob in a hash field so it can be indexed for vector search"
    )]
    async fn set_vector_in_hash(
        &self,
        Parameters(params): Parameters<SetVectorParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_set_vector_in_hash(params).await
    }

    #[tool(
        name = "get_vector_from_hash",
        description = "Read a FLOAT32 vector stored in a hash field back as a list of numbers"
    )]
    async fn get_vector_from_hash(
        &self,
        Parameters(params): Parameters<GetVectorParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get_vector_from_hash(params).await
    }
}
