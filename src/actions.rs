use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::enums::Resource;
use crate::errors::{ProtocolError, ProtocolResult};
use crate::geometry::CubeCoordinate;
use crate::legacy;

/// Server-assigned vertex identity
pub type NodeId = u16;

/// Unique identifier for players
pub type PlayerId = String;

/// Order-independent identity of an edge: the node pair, sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(NodeId, NodeId);

impl EdgeKey {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            EdgeKey(a, b)
        } else {
            EdgeKey(b, a)
        }
    }

    pub fn nodes(&self) -> (NodeId, NodeId) {
        (self.0, self.1)
    }
}

pub fn edge_key(a: NodeId, b: NodeId) -> EdgeKey {
    EdgeKey::new(a, b)
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}_{}", self.0, self.1)
    }
}

/// Serialized as its `e{min}_{max}` board key so it can key JSON maps
impl Serialize for EdgeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts `e3_9`, `3_9` and `3,9`
impl FromStr for EdgeKey {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.trim().trim_start_matches('e');
        let (a, b) = body
            .split_once(|c: char| c == '_' || c == ',')
            .ok_or_else(|| ProtocolError::malformed(format!("edge id '{s}'")))?;
        match (a.trim().parse(), b.trim().parse()) {
            (Ok(a), Ok(b)) => Ok(EdgeKey::new(a, b)),
            _ => Err(ProtocolError::malformed(format!("edge id '{s}'"))),
        }
    }
}

/// Core player actions, in the server's wire shape: unit variants travel as
/// bare strings, the rest as `{"Tag": {params}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PlayerAction {
    // Basic actions
    Roll,
    EndTurn,

    // Building actions
    BuildRoad {
        edge_id: (NodeId, NodeId),
    },
    BuildSettlement {
        node_id: NodeId,
    },
    BuildCity {
        node_id: NodeId,
    },

    // Development cards
    BuyDevelopmentCard,
    PlayKnight,
    PlayYearOfPlenty {
        resources: (Resource, Option<Resource>),
    },
    PlayMonopoly {
        resource: Resource,
    },
    PlayRoadBuilding,

    // Trading
    MaritimeTrade {
        give: Resource,
        take: Resource,
        ratio: u8,
    },
    OfferTrade {
        give: Vec<Resource>,
        take: Vec<Resource>,
    },
    AcceptTrade {
        trade_id: String,
    },
    RejectTrade {
        trade_id: String,
    },

    // Special actions
    MoveRobber {
        coordinate: CubeCoordinate,
        #[serde(default, alias = "victim_opt")]
        victim: Option<PlayerId>,
    },
    Discard {
        #[serde(default)]
        resources: Vec<Resource>,
    },
}

const UNIT_TAGS: [&str; 5] = [
    "Roll",
    "EndTurn",
    "BuyDevelopmentCard",
    "PlayKnight",
    "PlayRoadBuilding",
];

const PARAMETERIZED_TAGS: [&str; 11] = [
    "BuildRoad",
    "BuildSettlement",
    "BuildCity",
    "PlayYearOfPlenty",
    "PlayMonopoly",
    "MaritimeTrade",
    "OfferTrade",
    "AcceptTrade",
    "RejectTrade",
    "MoveRobber",
    "Discard",
];

/// What a legal action points at on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Target {
    Node(NodeId),
    Edge(EdgeKey),
    Hex(CubeCoordinate),
    /// Not tied to a board location
    Global,
}

/// Grouping used by the action bar for non-spatial actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ActionCategory {
    Roll,
    EndTurn,
    Build,
    BuyDevelopmentCard,
    PlayDevelopmentCard,
    Trade,
    MoveRobber,
    Discard,
}

impl PlayerAction {
    pub fn tag(&self) -> &'static str {
        match self {
            PlayerAction::Roll => "Roll",
            PlayerAction::EndTurn => "EndTurn",
            PlayerAction::BuildRoad { .. } => "BuildRoad",
            PlayerAction::BuildSettlement { .. } => "BuildSettlement",
            PlayerAction::BuildCity { .. } => "BuildCity",
            PlayerAction::BuyDevelopmentCard => "BuyDevelopmentCard",
            PlayerAction::PlayKnight => "PlayKnight",
            PlayerAction::PlayYearOfPlenty { .. } => "PlayYearOfPlenty",
            PlayerAction::PlayMonopoly { .. } => "PlayMonopoly",
            PlayerAction::PlayRoadBuilding => "PlayRoadBuilding",
            PlayerAction::MaritimeTrade { .. } => "MaritimeTrade",
            PlayerAction::OfferTrade { .. } => "OfferTrade",
            PlayerAction::AcceptTrade { .. } => "AcceptTrade",
            PlayerAction::RejectTrade { .. } => "RejectTrade",
            PlayerAction::MoveRobber { .. } => "MoveRobber",
            PlayerAction::Discard { .. } => "Discard",
        }
    }

    pub fn target(&self) -> Target {
        match self {
            PlayerAction::BuildSettlement { node_id } | PlayerAction::BuildCity { node_id } => {
                Target::Node(*node_id)
            }
            PlayerAction::BuildRoad { edge_id: (a, b) } => Target::Edge(EdgeKey::new(*a, *b)),
            PlayerAction::MoveRobber { coordinate, .. } => Target::Hex(*coordinate),
            _ => Target::Global,
        }
    }

    pub fn category(&self) -> ActionCategory {
        match self {
            PlayerAction::Roll => ActionCategory::Roll,
            PlayerAction::EndTurn => ActionCategory::EndTurn,
            PlayerAction::BuildRoad { .. }
            | PlayerAction::BuildSettlement { .. }
            | PlayerAction::BuildCity { .. } => ActionCategory::Build,
            PlayerAction::BuyDevelopmentCard => ActionCategory::BuyDevelopmentCard,
            PlayerAction::PlayKnight
            | PlayerAction::PlayYearOfPlenty { .. }
            | PlayerAction::PlayMonopoly { .. }
            | PlayerAction::PlayRoadBuilding => ActionCategory::PlayDevelopmentCard,
            PlayerAction::MaritimeTrade { .. }
            | PlayerAction::OfferTrade { .. }
            | PlayerAction::AcceptTrade { .. }
            | PlayerAction::RejectTrade { .. } => ActionCategory::Trade,
            PlayerAction::MoveRobber { .. } => ActionCategory::MoveRobber,
            PlayerAction::Discard { .. } => ActionCategory::Discard,
        }
    }
}

/// Decode one item of a legal-action list, whatever representation it uses.
pub fn decode_action(value: &Value) -> ProtocolResult<PlayerAction> {
    match value {
        Value::String(tag) => decode_tagged(tag, None),
        Value::Object(map) if legacy::is_flat(map) => {
            let (tag, params) = legacy::to_union(map)?;
            decode_tagged(&tag, Some(&params))
        }
        Value::Object(map) => match single_entry(map) {
            Some((tag, params)) => decode_tagged(tag, Some(params)),
            None => Err(ProtocolError::malformed(format!(
                "expected a single-key object, got {} keys",
                map.len()
            ))),
        },
        other => Err(ProtocolError::malformed(format!(
            "expected a string or object, got {other}"
        ))),
    }
}

fn single_entry(map: &Map<String, Value>) -> Option<(&String, &Value)> {
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Some(entry),
        _ => None,
    }
}

pub(crate) fn decode_tagged(tag: &str, params: Option<&Value>) -> ProtocolResult<PlayerAction> {
    if UNIT_TAGS.contains(&tag) {
        // `{"Roll": {}}` and `{"Roll": null}` are accepted alongside `"Roll"`.
        return serde_json::from_value(Value::String(tag.to_string()))
            .map_err(|e| ProtocolError::invalid_parameters(tag, e.to_string()));
    }
    if !PARAMETERIZED_TAGS.contains(&tag) {
        return Err(ProtocolError::UnknownTag {
            tag: tag.to_string(),
        });
    }

    let params = match params {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(params) => params.clone(),
    };
    let mut wrapper = Map::new();
    wrapper.insert(tag.to_string(), params);
    serde_json::from_value(Value::Object(wrapper))
        .map_err(|e| ProtocolError::invalid_parameters(tag, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;
    use serde_json::json;

    #[test]
    fn test_unit_variants_in_every_shape() {
        for wire in [json!("Roll"), json!({"Roll": {}}), json!({"Roll": null})] {
            assert_eq!(decode_action(&wire), Ok(PlayerAction::Roll));
        }
    }

    #[test]
    fn test_parameterized_variants() {
        assert_eq!(
            decode_action(&json!({"BuildSettlement": {"node_id": 7}})),
            Ok(PlayerAction::BuildSettlement { node_id: 7 })
        );
        assert_eq!(
            decode_action(&json!({"BuildRoad": {"edge_id": [9, 3]}})),
            Ok(PlayerAction::BuildRoad { edge_id: (9, 3) })
        );
        assert_eq!(
            decode_action(&json!({"MaritimeTrade": {"give": "Wood", "take": "Ore", "ratio": 4}})),
            Ok(PlayerAction::MaritimeTrade {
                give: Resource::Wood,
                take: Resource::Ore,
                ratio: 4
            })
        );
        assert_eq!(
            decode_action(&json!({"PlayYearOfPlenty": {"resources": ["Brick", null]}})),
            Ok(PlayerAction::PlayYearOfPlenty {
                resources: (Resource::Brick, None)
            })
        );
    }

    #[test]
    fn test_move_robber_coordinate_shapes() {
        let expected = PlayerAction::MoveRobber {
            coordinate: CubeCoordinate::new(1, -1, 0).unwrap(),
            victim: Some("player_1".to_string()),
        };
        assert_eq!(
            decode_action(&json!({"MoveRobber": {"coordinate": [1, -1, 0], "victim": "player_1"}})),
            Ok(expected.clone())
        );
        assert_eq!(
            decode_action(&json!({"MoveRobber": {"coordinate": {"x": 1, "y": -1, "z": 0}, "victim_opt": "player_1"}})),
            Ok(expected)
        );
    }

    #[test]
    fn test_discard_without_parameters() {
        assert_eq!(
            decode_action(&json!("Discard")),
            Ok(PlayerAction::Discard { resources: vec![] })
        );
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            decode_action(&json!("Teleport")),
            Err(ProtocolError::UnknownTag {
                tag: "Teleport".to_string()
            })
        );
        assert!(matches!(
            decode_action(&json!({"MoveRobber": {"coordinate": [1, 1, 1]}})),
            Err(ProtocolError::InvalidParameters { .. })
        ));
        assert!(matches!(
            decode_action(&json!({"BuildCity": {}})),
            Err(ProtocolError::InvalidParameters { .. })
        ));
        assert!(matches!(
            decode_action(&json!({"Roll": {}, "EndTurn": {}})),
            Err(ProtocolError::MalformedAction { .. })
        ));
        assert!(decode_action(&json!(42)).is_err());
    }

    #[test]
    fn test_targets() {
        assert_eq!(PlayerAction::BuildCity { node_id: 2 }.target(), Target::Node(2));
        assert_eq!(
            PlayerAction::BuildRoad { edge_id: (9, 3) }.target(),
            Target::Edge(EdgeKey::new(3, 9))
        );
        assert_eq!(PlayerAction::EndTurn.target(), Target::Global);
        assert_eq!(
            PlayerAction::PlayMonopoly {
                resource: Resource::Sheep
            }
            .category(),
            ActionCategory::PlayDevelopmentCard
        );
    }

    #[test]
    fn test_edge_key_symmetry() {
        let mut rng = XorShiftRng::seed_from_u64(11);
        for _ in 0..500 {
            let a: NodeId = rng.gen_range(0..72);
            let b: NodeId = rng.gen_range(0..72);
            assert_eq!(edge_key(a, b), edge_key(b, a));
        }
    }

    #[test]
    fn test_edge_key_parsing() {
        assert_eq!("e3_9".parse::<EdgeKey>(), Ok(EdgeKey::new(3, 9)));
        assert_eq!("9_3".parse::<EdgeKey>(), Ok(EdgeKey::new(3, 9)));
        assert_eq!("9, 3".parse::<EdgeKey>(), Ok(EdgeKey::new(3, 9)));
        assert!("e3".parse::<EdgeKey>().is_err());
        assert_eq!(EdgeKey::new(9, 3).to_string(), "e3_9");
    }
}
