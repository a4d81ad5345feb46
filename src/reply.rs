//! Conversion of raw Redis replies into JSON for tool output.

use redis::Value;
use serde_json::{json, Map, Value as Json};

/// Converts any RESP value into JSON. Binary strings are decoded lossily.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Nil => Json::Null,
        Value::Int(i) => json!(i),
        Value::BulkString(bytes) => Json::String(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Json::String(s.clone()),
        Value::Okay => Json::String("OK".to_string()),
        Value::Array(items) | Value::Set(items) => {
            Json::Array(items.iter().map(value_to_json).collect())
        }
        Value::Map(pairs) => Json::Object(
            pairs
                .iter()
                .map(|(k, v)| (key_string(k), value_to_json(v)))
                .collect(),
        ),
        Value::Double(d) => json!(d),
        Value::Boolean(b) => Json::Bool(*b),
        Value::VerbatimString { text, .. } => Json::String(text.clone()),
        Value::Attribute { data, .. } => value_to_json(data),
        Value::Push { data, .. } => Json::Array(data.iter().map(value_to_json).collect()),
        other => Json::String(format!("{other:?}")),
    }
}

fn key_string(value: &Value) -> String {
    match value {
        Value::BulkString(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::SimpleString(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        other => format!("{other:?}"),
    }
}

fn is_string(value: &Value) -> bool {
    matches!(value, Value::BulkString(_) | Value::SimpleString(_))
}

/// Reads a flat `[key, value, key, value, ...]` array as an object.
fn flat_pairs(value: &Value) -> Option<Map<String, Json>> {
    let Value::Array(items) = value else {
        return None;
    };
    if items.len() % 2 != 0 || !items.iter().step_by(2).all(is_string) {
        return None;
    }
    Some(
        items
            .chunks_exact(2)
            .map(|pair| (key_string(&pair[0]), value_to_json(&pair[1])))
            .collect(),
    )
}

/// Flattens an `FT.INFO` reply. Definition and statistics blocks and each
/// attribute descriptor become nested objects.
pub fn index_info_to_json(value: &Value) -> Json {
    if let Value::Map(_) = value {
        return value_to_json(value);
    }
    let Value::Array(items) = value else {
        return value_to_json(value);
    };

    let mut info = Map::new();
    for pair in items.chunks_exact(2) {
        let key = key_string(&pair[0]);
        let nested = if key == "attributes" || key == "fields" {
            match &pair[1] {
                Value::Array(attrs) => Some(Json::Array(
                    attrs
                        .iter()
                        .map(|a| flat_pairs(a).map_or_else(|| value_to_json(a), Json::Object))
                        .collect(),
                )),
                _ => None,
            }
        } else if key.ends_with("_definition") || key.ends_with("_stats") {
            flat_pairs(&pair[1]).map(Json::Object)
        } else {
            None
        };
        info.insert(key, nested.unwrap_or_else(|| value_to_json(&pair[1])));
    }
    Json::Object(info)
}

/// Reads an `FT.SEARCH` reply (`[total, id, [field, value, ...], ...]`) into
/// documents. `hidden_field` is left out of every document.
pub fn search_documents(value: &Value, hidden_field: &str) -> Vec<Json> {
    let Value::Array(items) = value else {
        return Vec::new();
    };

    let mut documents = Vec::new();
    let mut rest = items.iter().skip(1);
    while let Some(id) = rest.next() {
        let mut doc = Map::new();
        doc.insert("id".to_string(), Json::String(key_string(id)));
        if let Some(Value::Array(fields)) = rest.next() {
            for pair in fields.chunks_exact(2) {
                let name = key_string(&pair[0]);
                if name != hidden_field {
                    doc.insert(name, value_to_json(&pair[1]));
                }
            }
        }
        documents.push(Json::Object(doc));
    }
    documents
}

/// Reads an `XRANGE` reply into `{id, fields}` entries.
pub fn stream_entries(value: &Value) -> Vec<Json> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Array(parts) if parts.len() == 2 => {
                let fields = flat_pairs(&parts[1]).unwrap_or_default();
                Some(json!({
                    "id": key_string(&parts[0]),
                    "fields": fields,
                }))
            }
            _ => None,
        })
        .collect()
}

/// Parses `INFO` text. Numbers become JSON numbers and `k=v,k=v` values
/// (keyspace lines, for instance) become nested objects. The repeated
/// `module:` lines are gathered into a `modules` list.
pub fn parse_info(raw: &str) -> Map<String, Json> {
    let mut info = Map::new();
    let mut modules = Vec::new();
    for (key, value) in raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
    {
        if key == "module" {
            modules.push(info_value(value));
        } else {
            info.insert(key.to_string(), info_value(value));
        }
    }
    if !modules.is_empty() {
        info.insert("modules".to_string(), Json::Array(modules));
    }
    info
}

/// Text replies per node. A cluster answers commands it fans out to every
/// primary with a map of node address to reply; a standalone server answers
/// with the text alone, returned without an address.
pub fn node_texts(value: &Value) -> Option<Vec<(Option<String>, String)>> {
    match value {
        Value::Map(entries) => entries
            .iter()
            .map(|(node, reply)| Some((Some(key_string(node)), reply_text(reply)?)))
            .collect(),
        other => Some(vec![(None, reply_text(other)?)]),
    }
}

fn reply_text(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::VerbatimString { text, .. } => Some(text.clone()),
        _ => None,
    }
}

/// `INFO` reply as JSON: one object for a standalone server, or an object
/// keyed by node address for a cluster.
pub fn info_to_json(value: &Value) -> Option<Json> {
    let texts = node_texts(value)?;
    if let [(None, raw)] = texts.as_slice() {
        return Some(Json::Object(parse_info(raw)));
    }
    let nodes: Map<String, Json> = texts
        .into_iter()
        .map(|(node, raw)| (node.unwrap_or_default(), Json::Object(parse_info(&raw))))
        .collect();
    Some(Json::Object(nodes))
}

/// `CLIENT LIST` reply as one object per client. Clients of a cluster reply
/// carry the address of the node they are connected to under `node`.
pub fn client_list_to_json(value: &Value) -> Option<Vec<Json>> {
    let mut clients = Vec::new();
    for (node, raw) in node_texts(value)? {
        for mut client in parse_client_list(&raw) {
            if let (Some(node), Json::Object(map)) = (&node, &mut client) {
                map.insert("node".to_string(), Json::String(node.clone()));
            }
            clients.push(client);
        }
    }
    Some(clients)
}

fn info_value(value: &str) -> Json {
    if !value.contains('=') {
        return scalar(value);
    }
    let nested: Map<String, Json> = value
        .split(',')
        .filter_map(|item| item.rsplit_once('='))
        .map(|(k, v)| (k.to_string(), scalar(v)))
        .collect();
    Json::Object(nested)
}

fn scalar(value: &str) -> Json {
    if let Ok(i) = value.parse::<i64>() {
        return json!(i);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() => json!(f),
        _ => Json::String(value.to_string()),
    }
}

/// Parses `CLIENT LIST` output into one object per connected client.
pub fn parse_client_list(raw: &str) -> Vec<Json> {
    raw.lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut map = Map::new();
            for part in line.split(' ') {
                if let Some((key, value)) = part.split_once('=') {
                    map.insert(key.to_string(), Json::String(value.to_string()));
                }
            }
            Json::Object(map)
        })
        .collect()
}
