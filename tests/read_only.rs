#[macro_use]
mod common;

use common::{extract_json, make_read_only_server, make_server, reset_keys, text_of};
use redis_mcp_server::tools::misc::RawCommandParams;
use redis_mcp_server::tools::pub_sub::{ChannelParams, PublishParams};
use redis_mcp_server::tools::string::{KeyParams, SetParams};
use redis_mcp_server::tools::Scalar;
use rmcp::model::ErrorCode;

#[tokio::test]
async fn test_writes_are_rejected() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:ro:key"]).await;
    let server = make_read_only_server(conn.clone());

    let err = server
        .do_set(SetParams {
            key: "test:ro:key".to_string(),
            value: Scalar::from("nope"),
            expiration: None,
        })
        .await
        .expect_err("set must be rejected in read-only mode");
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    assert!(err.message.contains("read-only"));

    let err = server
        .do_publish(PublishParams {
            channel: "test:ro:channel".to_string(),
            message: "nope".to_string(),
        })
        .await
        .expect_err("publish must be rejected in read-only mode");
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

    // Nothing reached Redis.
    let writer = make_server(conn);
    let result = writer
        .do_get(KeyParams {
            key: "test:ro:key".to_string(),
        })
        .await
        .expect("get failed");
    assert_eq!(text_of(&result), "Key test:ro:key does not exist");
}

#[tokio::test]
async fn test_reads_are_allowed() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:ro:existing"]).await;
    let writer = make_server(conn.clone());
    writer
        .do_set(SetParams {
            key: "test:ro:existing".to_string(),
            value: Scalar::from("visible"),
            expiration: None,
        })
        .await
        .expect("set failed");

    let server = make_read_only_server(conn);
    let result = server
        .do_get(KeyParams {
            key: "test:ro:existing".to_string(),
        })
        .await
        .expect("get failed");
    assert_eq!(text_of(&result), "visible");

    server
        .do_subscribe(ChannelParams {
            channel: "test:ro:listen".to_string(),
        })
        .await
        .expect("subscribing does not modify data");
}

#[tokio::test]
async fn test_raw_commands_follow_allow_list() {
    let conn = require_redis!();
    let server = make_read_only_server(conn);

    let json = extract_json(
        server
            .do_execute_raw_command(RawCommandParams {
                command: "ping".to_string(),
                args: vec![],
            })
            .await
            .expect("PING is read-only"),
    );
    assert_eq!(json, "PONG");

    for command in ["SET", "FLUSHDB", "CONFIG SET"] {
        let err = server
            .do_execute_raw_command(RawCommandParams {
                command: command.to_string(),
                args: vec!["a".to_string(), "b".to_string()],
            })
            .await
            .expect_err("write command must be rejected");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }
}
