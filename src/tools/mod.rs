//! MCP tools grouped by Redis data type. Each module adds its own router to
//! [`RedisMcpServer`](crate::server::RedisMcpServer).

pub mod hash;
pub mod json;
pub mod list;
pub mod misc;
pub mod pub_sub;
pub mod query_engine;
pub mod server_management;
pub mod set;
pub mod sorted_set;
pub mod stream;
pub mod string;

use std::fmt;

use rmcp::schemars;
use serde::Deserialize;

/// A string, number or boolean argument. Redis stores all of them as strings.
#[derive(Debug, Clone, PartialEq, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}
