#[macro_use]
mod common;

use std::collections::BTreeMap;

use common::{extract_json, is_error, make_server, reset_keys, text_of};
use redis_mcp_server::tools::hash::{
    GetVectorParams, HashFieldParams, HashParams, HsetParams, SetVectorParams,
};
use redis_mcp_server::tools::list::{ListParams, LrangeParams, PushParams};
use redis_mcp_server::tools::set::{SaddParams, SetKeyParams, SremParams};
use redis_mcp_server::tools::sorted_set::{ZaddParams, ZrangeParams, ZremParams};
use redis_mcp_server::tools::stream::{XaddParams, XdelParams, XrangeParams};
use redis_mcp_server::tools::string::{KeyParams, SetParams};
use redis_mcp_server::tools::Scalar;
use rmcp::model::ErrorCode;

#[tokio::test]
async fn test_string_set_and_get() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:string:greeting", "test:string:count"]).await;
    let server = make_server(conn);

    let result = server
        .do_set(SetParams {
            key: "test:string:greeting".to_string(),
            value: Scalar::from("hello world"),
            expiration: None,
        })
        .await
        .expect("set failed");
    assert_eq!(text_of(&result), "Successfully set test:string:greeting");

    let result = server
        .do_get(KeyParams {
            key: "test:string:greeting".to_string(),
        })
        .await
        .expect("get failed");
    assert_eq!(text_of(&result), "hello world");

    // Numbers are stored in their text form.
    server
        .do_set(SetParams {
            key: "test:string:count".to_string(),
            value: Scalar::Int(42),
            expiration: Some(0),
        })
        .await
        .expect("set failed");
    let result = server
        .do_get(KeyParams {
            key: "test:string:count".to_string(),
        })
        .await
        .expect("get failed");
    assert_eq!(text_of(&result), "42");
}

#[tokio::test]
async fn test_string_set_with_expiration() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:string:ttl"]).await;
    let mut raw = conn.conn.clone();
    let server = make_server(conn);

    let result = server
        .do_set(SetParams {
            key: "test:string:ttl".to_string(),
            value: Scalar::from("v"),
            expiration: Some(120),
        })
        .await
        .expect("set failed");
    assert_eq!(
        text_of(&result),
        "Successfully set test:string:ttl with expiration 120 seconds"
    );

    let ttl: i64 = redis::cmd("TTL")
        .arg("test:string:ttl")
        .query_async(&mut raw)
        .await
        .unwrap();
    assert!(ttl > 0 && ttl <= 120);
}

#[tokio::test]
async fn test_get_missing_key() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:string:missing"]).await;
    let server = make_server(conn);

    let result = server
        .do_get(KeyParams {
            key: "test:string:missing".to_string(),
        })
        .await
        .expect("get failed");
    assert!(!is_error(&result));
    assert_eq!(text_of(&result), "Key test:string:missing does not exist");
}

#[tokio::test]
async fn test_wrong_type_is_a_tool_error() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:string:wrongtype"]).await;
    let server = make_server(conn);

    server
        .do_sadd(SaddParams {
            name: "test:string:wrongtype".to_string(),
            value: Scalar::from("a"),
            expire_seconds: None,
        })
        .await
        .expect("sadd failed");

    let result = server
        .do_get(KeyParams {
            key: "test:string:wrongtype".to_string(),
        })
        .await
        .expect("get should report the failure as a tool result");
    assert!(is_error(&result));
    assert!(text_of(&result).starts_with("Error retrieving key test:string:wrongtype: "));
}

#[tokio::test]
async fn test_hash_operations() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:hash:user"]).await;
    let server = make_server(conn);

    for (field, value) in [("name", Scalar::from("Alice")), ("age", Scalar::Int(30))] {
        let result = server
            .do_hset(HsetParams {
                name: "test:hash:user".to_string(),
                key: field.to_string(),
                value,
                expire_seconds: None,
            })
            .await
            .expect("hset failed");
        assert_eq!(
            text_of(&result),
            format!("Field '{field}' set successfully in hash 'test:hash:user'.")
        );
    }

    let field = |key: &str| HashFieldParams {
        name: "test:hash:user".to_string(),
        key: key.to_string(),
    };

    let result = server.do_hget(field("age")).await.expect("hget failed");
    assert_eq!(text_of(&result), "30");

    let result = server.do_hexists(field("name")).await.expect("hexists failed");
    assert_eq!(text_of(&result), "true");
    let result = server.do_hexists(field("email")).await.expect("hexists failed");
    assert_eq!(text_of(&result), "false");

    let json = extract_json(
        server
            .do_hgetall(HashParams {
                name: "test:hash:user".to_string(),
            })
            .await
            .expect("hgetall failed"),
    );
    assert_eq!(json["name"], "Alice");
    assert_eq!(json["age"], "30");

    let result = server.do_hdel(field("age")).await.expect("hdel failed");
    assert_eq!(text_of(&result), "Field 'age' deleted from hash 'test:hash:user'.");
    let result = server.do_hdel(field("age")).await.expect("hdel failed");
    assert_eq!(text_of(&result), "Field 'age' not found in hash 'test:hash:user'.");
    let result = server.do_hget(field("age")).await.expect("hget failed");
    assert_eq!(text_of(&result), "Field 'age' not found in hash 'test:hash:user'.");
}

#[tokio::test]
async fn test_hset_expiration_is_applied() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:hash:session"]).await;
    let mut raw = conn.conn.clone();
    let server = make_server(conn);

    let result = server
        .do_hset(HsetParams {
            name: "test:hash:session".to_string(),
            key: "token".to_string(),
            value: Scalar::from("abc"),
            expire_seconds: Some(60),
        })
        .await
        .expect("hset failed");
    assert_eq!(
        text_of(&result),
        "Field 'token' set successfully in hash 'test:hash:session'. Expires in 60 seconds."
    );

    let ttl: i64 = redis::cmd("TTL")
        .arg("test:hash:session")
        .query_async(&mut raw)
        .await
        .unwrap();
    assert!(ttl > 0 && ttl <= 60);
}

#[tokio::test]
async fn test_hgetall_missing_hash() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:hash:none"]).await;
    let server = make_server(conn);

    let result = server
        .do_hgetall(HashParams {
            name: "test:hash:none".to_string(),
        })
        .await
        .expect("hgetall failed");
    assert_eq!(
        text_of(&result),
        "Hash 'test:hash:none' is empty or does not exist."
    );
}

#[tokio::test]
async fn test_vector_in_hash() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:hash:embedding"]).await;
    let server = make_server(conn);

    server
        .do_set_vector_in_hash(SetVectorParams {
            name: "test:hash:embedding".to_string(),
            vector: vec![0.25, -1.5, 3.0],
            vector_field: None,
        })
        .await
        .expect("set_vector_in_hash failed");

    let json = extract_json(
        server
            .do_get_vector_from_hash(GetVectorParams {
                name: "test:hash:embedding".to_string(),
                vector_field: None,
            })
            .await
            .expect("get_vector_from_hash failed"),
    );
    assert_eq!(json, serde_json::json!([0.25, -1.5, 3.0]));

    // A field that is not a FLOAT32 blob cannot be decoded.
    server
        .do_hset(HsetParams {
            name: "test:hash:embedding".to_string(),
            key: "label".to_string(),
            value: Scalar::from("abc"),
            expire_seconds: None,
        })
        .await
        .expect("hset failed");
    let result = server
        .do_get_vector_from_hash(GetVectorParams {
            name: "test:hash:embedding".to_string(),
            vector_field: Some("label".to_string()),
        })
        .await
        .expect("get_vector_from_hash failed");
    assert!(is_error(&result));
}

#[tokio::test]
async fn test_empty_vector_is_rejected() {
    let conn = require_redis!();
    let server = make_server(conn);

    let err = server
        .do_set_vector_in_hash(SetVectorParams {
            name: "test:hash:empty-vector".to_string(),
            vector: vec![],
            vector_field: None,
        })
        .await
        .expect_err("empty vector should be rejected");
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
}

#[tokio::test]
async fn test_list_operations() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:list:queue"]).await;
    let server = make_server(conn);

    let push = |value: &str| PushParams {
        name: "test:list:queue".to_string(),
        value: Scalar::from(value),
        expire: None,
    };
    let list = || ListParams {
        name: "test:list:queue".to_string(),
    };

    let result = server.do_rpush(push("b")).await.expect("rpush failed");
    assert_eq!(
        text_of(&result),
        "Value 'b' pushed to the right of list 'test:list:queue'."
    );
    server.do_rpush(push("c")).await.expect("rpush failed");
    let result = server.do_lpush(push("a")).await.expect("lpush failed");
    assert_eq!(
        text_of(&result),
        "Value 'a' pushed to the left of list 'test:list:queue'."
    );

    let json = extract_json(
        server
            .do_lrange(LrangeParams {
                name: "test:list:queue".to_string(),
                start: None,
                stop: None,
            })
            .await
            .expect("lrange failed"),
    );
    assert_eq!(json, serde_json::json!(["a", "b", "c"]));

    let result = server.do_llen(list()).await.expect("llen failed");
    assert_eq!(text_of(&result), "3");

    let result = server.do_lpop(list()).await.expect("lpop failed");
    assert_eq!(text_of(&result), "a");
    let result = server.do_rpop(list()).await.expect("rpop failed");
    assert_eq!(text_of(&result), "c");
    server.do_rpop(list()).await.expect("rpop failed");

    let result = server.do_lpop(list()).await.expect("lpop failed");
    assert_eq!(
        text_of(&result),
        "List 'test:list:queue' is empty or does not exist."
    );
    let result = server
        .do_lrange(LrangeParams {
            name: "test:list:queue".to_string(),
            start: Some(0),
            stop: Some(-1),
        })
        .await
        .expect("lrange failed");
    assert_eq!(
        text_of(&result),
        "List 'test:list:queue' is empty or does not exist."
    );
}

#[tokio::test]
async fn test_set_operations() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:set:tags"]).await;
    let server = make_server(conn);

    for tag in ["rust", "async", "redis"] {
        server
            .do_sadd(SaddParams {
                name: "test:set:tags".to_string(),
                value: Scalar::from(tag),
                expire_seconds: None,
            })
            .await
            .expect("sadd failed");
    }

    let json = extract_json(
        server
            .do_smembers(SetKeyParams {
                name: "test:set:tags".to_string(),
            })
            .await
            .expect("smembers failed"),
    );
    assert_eq!(json, serde_json::json!(["async", "redis", "rust"]));

    let remove = |value: &str| SremParams {
        name: "test:set:tags".to_string(),
        value: Scalar::from(value),
    };
    let result = server.do_srem(remove("async")).await.expect("srem failed");
    assert_eq!(text_of(&result), "Value 'async' removed from set 'test:set:tags'.");
    let result = server.do_srem(remove("async")).await.expect("srem failed");
    assert_eq!(text_of(&result), "Value 'async' not found in set 'test:set:tags'.");
}

#[tokio::test]
async fn test_sorted_set_operations() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:zset:scores"]).await;
    let server = make_server(conn);

    for (member, score) in [("bob", 2.5), ("alice", 1.0), ("carol", 10.0)] {
        server
            .do_zadd(ZaddParams {
                key: "test:zset:scores".to_string(),
                score,
                member: member.to_string(),
                expiration: None,
            })
            .await
            .expect("zadd failed");
    }

    let json = extract_json(
        server
            .do_zrange(ZrangeParams {
                key: "test:zset:scores".to_string(),
                start: None,
                end: None,
                with_scores: false,
            })
            .await
            .expect("zrange failed"),
    );
    assert_eq!(json, serde_json::json!(["alice", "bob", "carol"]));

    let json = extract_json(
        server
            .do_zrange(ZrangeParams {
                key: "test:zset:scores".to_string(),
                start: Some(0),
                end: Some(1),
                with_scores: true,
            })
            .await
            .expect("zrange failed"),
    );
    let members = json.as_array().expect("should be array");
    assert_eq!(members.len(), 2);
    assert_eq!(members[1]["member"], "bob");
    assert_eq!(members[1]["score"], 2.5);

    let result = server
        .do_zrem(ZremParams {
            key: "test:zset:scores".to_string(),
            member: "bob".to_string(),
        })
        .await
        .expect("zrem failed");
    assert_eq!(text_of(&result), "Successfully removed bob from test:zset:scores");
}

#[tokio::test]
async fn test_stream_operations() {
    let conn = require_redis!();
    reset_keys(&conn, &["test:stream:events"]).await;
    let server = make_server(conn);

    let mut fields = BTreeMap::new();
    fields.insert("sensor".to_string(), Scalar::from("a1"));
    fields.insert("temp".to_string(), Scalar::Float(21.5));

    let result = server
        .do_xadd(XaddParams {
            key: "test:stream:events".to_string(),
            fields,
            expiration: None,
        })
        .await
        .expect("xadd failed");
    let message = text_of(&result);
    assert!(message.starts_with("Successfully added entry "));
    let id = message
        .trim_start_matches("Successfully added entry ")
        .trim_end_matches(" to test:stream:events")
        .to_string();

    let json = extract_json(
        server
            .do_xrange(XrangeParams {
                key: "test:stream:events".to_string(),
                count: Some(10),
            })
            .await
            .expect("xrange failed"),
    );
    let entries = json.as_array().expect("should be array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], id.as_str());
    assert_eq!(entries[0]["fields"]["sensor"], "a1");
    assert_eq!(entries[0]["fields"]["temp"], "21.5");

    let result = server
        .do_xdel(XdelParams {
            key: "test:stream:events".to_string(),
            entry_id: id.clone(),
        })
        .await
        .expect("xdel failed");
    assert_eq!(
        text_of(&result),
        format!("Successfully deleted entry {id} from test:stream:events")
    );

    let result = server
        .do_xdel(XdelParams {
            key: "test:stream:events".to_string(),
            entry_id: id.clone(),
        })
        .await
        .expect("xdel failed");
    assert_eq!(
        text_of(&result),
        format!("Entry {id} not found in test:stream:events")
    );

    let result = server
        .do_xrange(XrangeParams {
            key: "test:stream:events".to_string(),
            count: None,
        })
        .await
        .expect("xrange failed");
    assert_eq!(
        text_of(&result),
        "Stream test:stream:events is empty or does not exist"
    );
}

#[tokio::test]
async fn test_xadd_requires_fields() {
    let conn = require_redis!();
    let server = make_server(conn);

    let err = server
        .do_xadd(XaddParams {
            key: "test:stream:empty".to_string(),
            fields: BTreeMap::new(),
            expiration: None,
        })
        .await
        .expect_err("empty fields should be rejected");
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
}
