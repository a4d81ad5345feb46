use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_router};
use serde::Deserialize;
use serde_json::json;

use crate::error::McpRedisError;
use crate::server::{failure, json_result, text, RedisMcpServer};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PublishParams {
    #[schemars(description = "Channel to publish to")]
    pub channel: String,

    #[schemars(description = "Message payload")]
    pub message: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ChannelParams {
    #[schemars(description = "Channel name")]
    pub channel: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReadMessagesParams {
    #[schemars(description = "Only return messages from this channel. Default: all channels")]
    #[serde(default)]
    pub channel: Option<String>,

    #[schemars(description = "Maximum number of messages to return (default: 100)")]
    #[serde(default)]
    pub max: Option<usize>,
}

fn validate_channel(channel: &str) -> Result<(), McpRedisError> {
    if channel.is_empty() {
        return Err(McpRedisError::InvalidArgument(
            "channel must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl RedisMcpServer {
    pub async fn do_publish(&self, params: PublishParams) -> Result<CallToolResult, ErrorData> {
        self.check_read_only("publish").map_err(|e| self.err(e))?;
        validate_channel(&params.channel).map_err(|e| self.err(e))?;
        let mut conn = self.conn();

        let receivers: i64 = match redis::cmd("PUBLISH")
            .arg(&params.channel)
            .arg(&params.message)
            .query_async(&mut conn)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                return Ok(failure(
                    format!("Error publishing message to channel '{}'", params.channel),
                    e,
                ))
            }
        };

        Ok(text(format!(
            "Message published to channel '{}' ({} subscriber(s) received it).",
            params.channel, receivers
        )))
    }

    pub async fn do_subscribe(&self, params: ChannelParams) -> Result<CallToolResult, ErrorData> {
        validate_channel(&params.channel).map_err(|e| self.err(e))?;

        if let Err(e) = self.subscriber().subscribe(&params.channel).await {
            return Ok(failure(
                format!("Error subscribing to channel '{}'", params.channel),
                e,
            ));
        }

        Ok(text(format!(
            "Subscribed to channel '{}'. Use read_messages to fetch what arrives.",
            params.channel
        )))
    }

    pub async fn do_unsubscribe(&self, params: ChannelParams) -> Result<CallToolResult, ErrorData> {
        validate_channel(&params.channel).map_err(|e| self.err(e))?;

        if let Err(e) = self.subscriber().unsubscribe(&params.channel).await {
            return Ok(failure(
                format!("Error unsubscribing from channel '{}'", params.channel),
                e,
            ));
        }

        Ok(text(format!(
            "Unsubscribed from channel '{}'.",
            params.channel
        )))
    }

    pub async fn do_read_messages(
        &self,
        params: ReadMessagesParams,
    ) -> Result<CallToolResult, ErrorData> {
        let subscriber = self.subscriber();
        let messages = subscriber
            .drain(params.channel.as_deref(), params.max.unwrap_or(100))
            .await;
        let (remaining, dropped) = subscriber.backlog().await;

        Ok(json_result(&json!({
            "messages": messages,
            "count": messages.len(),
            "remaining": remaining,
            "dropped": dropped,
            "subscribed": subscriber.channels().await,
        })))
    }
}

#[tool_router(router = tool_router_pub_sub, vis = "pub")]
impl RedisMcpServer {
    #[tool(
        name = "publish",
        description = "Publish a message to a channel and report how many subscribers received it"
    )]
    async fn publish(
        &self,
        Parameters(params): Parameters<PublishParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_publish(params).await
    }

    #[tool(
        name = "subscribe",
        description = "Subscribe to a channel. Received messages are buffered until read with read_messages"
    )]
    async fn subscribe_channel(
        &self,
        Parameters(params): Parameters<ChannelParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_subscribe(params).await
    }

    #[tool(name = "unsubscribe", description = "Unsubscribe from a channel")]
    async fn unsubscribe_channel(
        &self,
        Parameters(params): Parameters<ChannelParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_unsubscribe(params).await
    }

    #[tool(
        name = "read_messages",
        description = "Return and remove buffered messages from subscribed channels, oldest first"
    )]
    async fn read_messages(
        &self,
        Parameters(params): Parameters<ReadMessagesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_read_messages(params).await
    }
}
