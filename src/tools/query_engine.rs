//! Vector index management and KNN search through the Redis query engine.

use std::fmt;
use std::str::FromStr;

use redis::Value;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_router};
use serde::Deserialize;

use crate::error::McpRedisError;
use crate::reply::{index_info_to_json, search_documents};
use crate::server::{failure, json_result, text, RedisMcpServer};
use crate::vector::encode_f32;

const DEFAULT_INDEX: &str = "vector_index";
const DEFAULT_PREFIX: &str = "doc:";
const DEFAULT_VECTOR_FIELD: &str = "vector";
const DEFAULT_DIM: u32 = 1536;
const DEFAULT_K: u32 = 5;

/// Name of the query parameter carrying the query vector.
const VECTOR_PARAM: &str = "vec_param";
/// Alias the KNN distance is returned under.
const SCORE_FIELD: &str = "score";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    L2,
    Ip,
    Cosine,
}

impl DistanceMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceMetric::L2 => "L2",
            DistanceMetric::Ip => "IP",
            DistanceMetric::Cosine => "COSINE",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = McpRedisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L2" => Ok(DistanceMetric::L2),
            "IP" => Ok(DistanceMetric::Ip),
            "COSINE" => Ok(DistanceMetric::Cosine),
            _ => Err(McpRedisError::InvalidArgument(format!(
                "distance_metric must be one of L2, IP or COSINE, got '{s}'"
            ))),
        }
    }
}

/// `FT.CREATE` for an HNSW FLOAT32 vector field over hashes under `prefix`.
pub fn create_index_command(
    index_name: &str,
    prefix: &str,
    vector_field: &str,
    dim: u32,
    metric: DistanceMetric,
) -> redis::Cmd {
    let mut cmd = redis::cmd("FT.CREATE");
    cmd.arg(index_name)
        .arg("ON")
        .arg("HASH")
        .arg("PREFIX")
        .arg(1)
        .arg(prefix)
        .arg("SCHEMA")
        .arg(vector_field)
        .arg("VECTOR")
        .arg("HNSW")
        .arg(6)
        .arg("TYPE")
        .arg("FLOAT32")
        .arg("DIM")
        .arg(dim)
        .arg("DISTANCE_METRIC")
        .arg(metric.as_str());
    cmd
}

pub fn knn_query(vector_field: &str, k: u32) -> String {
    format!("*=>[KNN {k} @{vector_field} ${VECTOR_PARAM} AS {SCORE_FIELD}]")
}

/// `FT.SEARCH` for the `k` nearest neighbours of `query_vector`, closest first.
pub fn search_command(
    index_name: &str,
    vector_field: &str,
    query_vector: &[f32],
    k: u32,
    return_fields: Option<&[String]>,
) -> redis::Cmd {
    let mut cmd = redis::cmd("FT.SEARCH");
    cmd.arg(index_name).arg(knn_query(vector_field, k));

    if let Some(fields) = return_fields {
        let mut fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        if !fields.contains(&SCORE_FIELD) {
            fields.push(SCORE_FIELD);
        }
        cmd.arg("RETURN").arg(fields.len()).arg(fields);
    }

    cmd.arg("SORTBY")
        .arg(SCORE_FIELD)
        .arg("LIMIT")
        .arg(0)
        .arg(k)
        .arg("PARAMS")
        .arg(2)
        .arg(VECTOR_PARAM)
        .arg(encode_f32(query_vector))
        .arg("DIALECT")
        .arg(2);
    cmd
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IndexInfoParams {
    #[schemars(description = "Name of the index")]
    pub index_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateIndexParams {
    #[schemars(description = "Name of the index (default: vector_index)")]
    #[serde(default)]
    pub index_name: Option<String>,

    #[schemars(description = "Key prefix of the hashes to index (default: doc:)")]
    #[serde(default)]
    pub prefix: Option<String>,

    #[schemars(description = "Hash field holding the vector (default: vector)")]
    #[serde(default)]
    pub vector_field: Option<String>,

    #[schemars(description = "Vector dimension (default: 1536)")]
    #[serde(default)]
    pub dim: Option<u32>,

    #[schemars(description = "Distance metric: L2, IP or COSINE (default: COSINE)")]
    #[serde(default)]
    pub distance_metric: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct VectorSearchParams {
    #[schemars(description = "Query vector")]
    pub query_vector: Vec<f32>,

    #[schemars(description = "Name of the index (default: vector_index)")]
    #[serde(default)]
    pub index_name: Option<String>,

    #[schemars(description = "Indexed vector field (default: vector)")]
    #[serde(default)]
    pub vector_field: Option<String>,

    #[schemars(description = "Number of nearest neighbours to return (default: 5)")]
    #[serde(default)]
    pub k: Option<u32>,

    #[schemars(description = "Fields to return for each document (default: all but the vector)")]
    #[serde(default)]
    pub return_fields: Option<Vec<String>>,
}

impl RedisMcpServer {
    pub async fn do_get_indexes(&self) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let indexes: Vec<String> = match redis::cmd("FT._LIST").query_async(&mut conn).await {
            Ok(v) => v,
            Err(e) => return Ok(failure("Error listing indexes", e)),
        };

        Ok(json_result(&indexes))
    }

    pub async fn do_get_index_info(
        &self,
        params: IndexInfoParams,
    ) -> Result<CallToolResult, ErrorData> {
        let mut conn = self.conn();

        let reply: Value = match redis::cmd("FT.INFO")
            .arg(&params.index_name)
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error retrieving info for index '{}'", params.index_name),
                    e,
                ))
            }
        };

        Ok(json_result(&index_info_to_json(&reply)))
    }

    pub async fn do_create_vector_index_hash(
        &self,
        params: CreateIndexParams,
    ) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("create_vector_index_hash")
            .map_err(|e| self.err(e))?;

        let metric: DistanceMetric = params
            .distance_metric
            .as_deref()
            .unwrap_or("COSINE")
            .parse()
            .map_err(|e| self.err(e))?;
        let dim = params.dim.unwrap_or(DEFAULT_DIM);
        if dim == 0 {
            return Err(self.err(McpRedisError::InvalidArgument(
                "dim must be greater than 0".to_string(),
            )));
        }
        let index_name = params.index_name.as_deref().unwrap_or(DEFAULT_INDEX);
        let prefix = params.prefix.as_deref().unwrap_or(DEFAULT_PREFIX);
        let vector_field = params.vector_field.as_deref().unwrap_or(DEFAULT_VECTOR_FIELD);

        let mut conn = self.conn();
        let cmd = create_index_command(index_name, prefix, vector_field, dim, metric);
        let result: redis::RedisResult<()> = cmd.query_async(&mut conn).await;
        if let Err(e) = result {
            return Ok(failure(
                format!("Error creating index '{index_name}'"),
                e,
            ));
        }

        tracing::info!(index = index_name, dim, metric = %metric, "Created vector index");
        Ok(text(format!(
            "Index '{index_name}' created successfully on prefix '{prefix}' \
             ({vector_field}: FLOAT32, dim {dim}, {metric})."
        )))
    }

    pub async fn do_vector_search_hash(
        &self,
        params: VectorSearchParams,
    ) -> Result<CallToolResult, ErrorData> {
        if params.query_vector.is_empty() {
            return Err(self.err(McpRedisError::InvalidArgument(
                "query_vector must not be empty".to_string(),
            )));
        }
        let k = params.k.unwrap_or(DEFAULT_K);
        if k == 0 {
            return Err(self.err(McpRedisError::InvalidArgument(
                "k must be greater than 0".to_string(),
            )));
        }
        let index_name = params.index_name.as_deref().unwrap_or(DEFAULT_INDEX);
        let vector_field = params.vector_field.as_deref().unwrap_or(DEFAULT_VECTOR_FIELD);

        let mut conn = self.conn();
        let cmd = search_command(
            index_name,
            vector_field,
            &params.query_vector,
            k,
            params.return_fields.as_deref(),
        );
        let reply: Value = match cmd.query_async(&mut conn).await {
            Ok(v) => v,
            Err(e) => {
                return Ok(failure(
                    format!("Error performing vector search on index '{index_name}'"),
                    e,
                ))
            }
        };

        Ok(json_result(&search_documents(&reply, vector_field)))
    }
}

#[tool_router(router = tool_router_query_engine, vis = "pub")]
impl RedisMcpServer {
    #[tool(name = "get_indexes", description = "List the names of all search indexes")]
    async fn get_indexes(&self) -> Result<CallToolResult, ErrorData> {
        self.do_get_indexes().await
    }

    #[tool(
        name = "get_index_info",
        description = "Get the definition, schema and statistics of a search index"
    )]
    async fn get_index_info(
        &self,
        Parameters(params): Parameters<IndexInfoParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get_index_info(params).await
    }

    #[tool(
        name = "create_vector_index_hash",
        description = "Create an HNSW vector index over hashes with a given key prefix, for FLOAT32 vectors stored with set_vector_in_hash"
    )]
    async fn create_vector_index_hash(
        &self,
        Parameters(params): Parameters<CreateIndexParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_create_vector_index_hash(params).await
    }

    #[tool(
        name = "vector_search_hash",
        description = "Find the k hashes whose vectors are nearest to a query vector. Results are ordered by score (distance)"
    )]
    async fn vector_search_hash(
        &self,
        Parameters(params): Parameters<VectorSearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_vector_search_hash(params).await
    }
}
