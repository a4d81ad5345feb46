//! MCP server that exposes Redis data structures as tools.
//!
//! Provides tools for strings, hashes, lists, sets, sorted sets, streams,
//! pub/sub, JSON documents and vector search, plus key management and
//! server statistics. Connects to a standalone server or a cluster, with
//! optional TLS.

pub mod config;
pub mod connection;
pub mod error;
pub mod pubsub;
pub mod reply;
pub mod server;
pub mod tools;
pub mod vector;
