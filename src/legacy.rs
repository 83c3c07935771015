//! Compatibility shim for older producers that send actions as flat objects:
//!
//! ```json
//! {"action_type": "BuildRoad", "edge_id": "e3_9"}
//! {"action_type": "MoveRobber", "coordinate": [0, 1, -1], "target_color": "BLUE"}
//! ```
//!
//! Flat actions are rewritten into the `{"Tag": {params}}` union shape and then
//! go through the same decoder as everything else. Nothing outside
//! [`crate::actions::decode_action`] should call into this module.

use serde_json::{json, Map, Value};

use crate::actions::{EdgeKey, NodeId};
use crate::errors::{ProtocolError, ProtocolResult};

const TYPE_FIELD: &str = "action_type";

pub(crate) fn is_flat(map: &Map<String, Value>) -> bool {
    map.get(TYPE_FIELD).is_some_and(Value::is_string)
}

/// Rewrite a flat action into `(tag, params)`
pub(crate) fn to_union(map: &Map<String, Value>) -> ProtocolResult<(String, Value)> {
    let tag = map
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .map(normalize_tag)
        .ok_or_else(|| ProtocolError::malformed("flat action without action_type"))?;

    let field = |name: &str| map.get(name).filter(|v| !v.is_null()).cloned();
    let required = |name: &str| {
        field(name).ok_or_else(|| ProtocolError::invalid_parameters(&tag, format!("missing {name}")))
    };

    let params = match tag.as_str() {
        "BuildRoad" => {
            let (a, b) = flat_edge(&required("edge_id")?, &tag)?;
            json!({ "edge_id": [a, b] })
        }
        "BuildSettlement" | "BuildCity" => {
            json!({ "node_id": flat_node(&required("node_id")?, &tag)? })
        }
        "MoveRobber" => {
            let victim = field("victim").or_else(|| field("target_color"));
            json!({ "coordinate": required("coordinate")?, "victim": victim })
        }
        "PlayMonopoly" => json!({ "resource": required("resource")? }),
        "PlayYearOfPlenty" => {
            let resources = required("resources")?;
            let list = resources.as_array().ok_or_else(|| {
                ProtocolError::invalid_parameters(&tag, "resources is not a list")
            })?;
            json!({ "resources": [list.first().cloned(), list.get(1).cloned()] })
        }
        "Discard" => json!({ "resources": field("resources").unwrap_or_else(|| json!([])) }),
        "MaritimeTrade" => json!({
            "give": required("give")?,
            "take": required("take")?,
            "ratio": required("ratio")?,
        }),
        "OfferTrade" => json!({ "give": required("give")?, "take": required("take")? }),
        "AcceptTrade" | "RejectTrade" => json!({ "trade_id": required("trade_id")? }),
        _ => Value::Null,
    };

    Ok((tag, params))
}

/// Flat producers spell tags `end_turn`, `END_TURN` or `roll_dice` as well as
/// `EndTurn`
fn normalize_tag(raw: &str) -> String {
    let raw = raw.trim();
    let single_case = !raw.chars().any(|c| c.is_ascii_lowercase())
        || !raw.chars().any(|c| c.is_ascii_uppercase());
    let tag = if raw.contains('_') || single_case {
        raw.split('_').map(capitalize).collect()
    } else {
        raw.to_string()
    };
    match tag.as_str() {
        "RollDice" => "Roll".to_string(),
        _ => tag,
    }
}

fn capitalize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Node ids arrive as `7`, `"7"` or `"n7"`
fn flat_node(value: &Value, tag: &str) -> ProtocolResult<NodeId> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| NodeId::try_from(n).ok()),
        Value::String(s) => s.trim().trim_start_matches('n').parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ProtocolError::invalid_parameters(tag, format!("bad node_id {value}")))
}

/// Edge ids arrive as `[3, 9]` or as a string such as `"e3_9"`
fn flat_edge(value: &Value, tag: &str) -> ProtocolResult<(NodeId, NodeId)> {
    let bad = || ProtocolError::invalid_parameters(tag, format!("bad edge_id {value}"));
    match value {
        Value::Array(pair) if pair.len() == 2 => {
            Ok((flat_node(&pair[0], tag)?, flat_node(&pair[1], tag)?))
        }
        Value::String(s) => s.parse::<EdgeKey>().map(|key| key.nodes()).map_err(|_| bad()),
        _ => Err(bad()),
    }
}
