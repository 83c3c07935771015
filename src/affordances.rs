//! Cross-references the server's legal-action list with board identities.
//!
//! The tables drive highlighting and clicks: a click on a node, edge or hex
//! resolves to the exact wire value the server listed, which is what gets
//! sent back.

use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::actions::{decode_action, ActionCategory, EdgeKey, NodeId, PlayerAction, Target};
use crate::errors::ProtocolError;
use crate::game::SeatControl;
use crate::geometry::CubeCoordinate;

/// A legal action together with the wire value it was decoded from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionEntry {
    /// Position in the server's list
    pub index: usize,
    /// Original list item, relayed verbatim when chosen
    pub wire: Value,
    pub action: PlayerAction,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedAction {
    pub index: usize,
    pub wire: Value,
    pub error: ProtocolError,
}

/// A user gesture on the board or the action bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickTarget {
    Node(NodeId),
    Edge(EdgeKey),
    /// Several robber actions may share a hex, one per victim
    Hex {
        coordinate: CubeCoordinate,
        choice: usize,
    },
    /// Index into [`Affordances::global`]
    Global(usize),
}

impl fmt::Display for ClickTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClickTarget::Node(id) => write!(f, "node {id}"),
            ClickTarget::Edge(key) => write!(f, "edge {key}"),
            ClickTarget::Hex { coordinate, choice } => write!(f, "hex {coordinate} (#{choice})"),
            ClickTarget::Global(index) => write!(f, "global action #{index}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Affordances {
    pub nodes: BTreeMap<NodeId, ActionEntry>,
    pub edges: BTreeMap<EdgeKey, ActionEntry>,
    pub hexes: BTreeMap<CubeCoordinate, Vec<ActionEntry>>,
    pub global: Vec<ActionEntry>,
    pub rejected: Vec<RejectedAction>,
}

impl Affordances {
    /// True when nothing on the board is clickable
    pub fn is_spatially_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.hexes.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.is_spatially_empty() && self.global.is_empty()
    }

    /// Distinct categories of the non-spatial actions, in list order
    pub fn categories(&self) -> Vec<ActionCategory> {
        self.global
            .iter()
            .map(|entry| entry.action.category())
            .unique()
            .collect()
    }

    pub fn global_in(&self, category: ActionCategory) -> impl Iterator<Item = &ActionEntry> {
        self.global
            .iter()
            .filter(move |entry| entry.action.category() == category)
    }

    pub fn resolve(&self, target: &ClickTarget) -> Option<&ActionEntry> {
        match target {
            ClickTarget::Node(id) => self.nodes.get(id),
            ClickTarget::Edge(key) => self.edges.get(key),
            ClickTarget::Hex { coordinate, choice } => {
                self.hexes.get(coordinate).and_then(|entries| entries.get(*choice))
            }
            ClickTarget::Global(index) => self.global.get(*index),
        }
    }
}

/// Build the affordance tables for one snapshot.
///
/// A bot-controlled seat gets no affordances at all, whatever the list says.
pub fn build_affordances(actions: &[Value], seat: SeatControl) -> Affordances {
    if seat == SeatControl::Bot {
        log::debug!("Bot seat is acting, offering no affordances");
        return Affordances::default();
    }

    let mut affordances = Affordances::default();
    for (index, wire) in actions.iter().enumerate() {
        let action = match decode_action(wire) {
            Ok(action) => action,
            Err(error) => {
                log::warn!("Skipping legal action #{} {}: {}", index, wire, error);
                affordances.rejected.push(RejectedAction {
                    index,
                    wire: wire.clone(),
                    error,
                });
                continue;
            }
        };

        let target = action.target();
        let entry = ActionEntry {
            index,
            wire: wire.clone(),
            action,
            target,
        };
        let duplicate = match target {
            Target::Node(id) => insert_unique(&mut affordances.nodes, id, entry),
            Target::Edge(key) => insert_unique(&mut affordances.edges, key, entry),
            Target::Hex(coordinate) => {
                affordances.hexes.entry(coordinate).or_default().push(entry);
                None
            }
            Target::Global => {
                affordances.global.push(entry);
                None
            }
        };
        if let Some(rejected) = duplicate {
            affordances.rejected.push(rejected);
        }
    }
    affordances
}

/// First action on a key wins. A later one comes back as rejected so the
/// caller can see it was not offered.
fn insert_unique<K>(
    table: &mut BTreeMap<K, ActionEntry>,
    key: K,
    entry: ActionEntry,
) -> Option<RejectedAction>
where
    K: Ord + fmt::Display,
{
    if let Some(existing) = table.get(&key) {
        log::warn!(
            "Ignoring {} at {}, already offering {}",
            entry.action.tag(),
            key,
            existing.action.tag()
        );
        return Some(RejectedAction {
            index: entry.index,
            error: ProtocolError::DuplicateTarget {
                tag: entry.action.tag().to_string(),
                target: key.to_string(),
            },
            wire: entry.wire,
        });
    }
    table.insert(key, entry);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coord(x: i32, y: i32, z: i32) -> CubeCoordinate {
        CubeCoordinate::new(x, y, z).unwrap()
    }

    #[test]
    fn test_single_settlement_populates_only_the_node_table() {
        let settlement = json!({"BuildSettlement": {"node_id": 7}});
        let affordances = build_affordances(&[settlement.clone()], SeatControl::Human);

        assert_eq!(affordances.nodes.keys().copied().collect::<Vec<_>>(), vec![7]);
        assert_eq!(affordances.nodes[&7].wire, settlement);
        assert!(affordances.edges.is_empty());
        assert!(affordances.hexes.is_empty());
        assert!(affordances.global.is_empty());
    }

    #[test]
    fn test_road_is_reachable_from_either_node_order() {
        for wire in [
            json!({"BuildRoad": {"edge_id": [3, 9]}}),
            json!({"BuildRoad": {"edge_id": [9, 3]}}),
        ] {
            let affordances = build_affordances(&[wire.clone()], SeatControl::Human);
            assert_eq!(affordances.edges.len(), 1);
            assert_eq!(affordances.edges[&EdgeKey::new(3, 9)].wire, wire);
            assert_eq!(
                affordances
                    .resolve(&ClickTarget::Edge(EdgeKey::new(9, 3)))
                    .map(|e| &e.wire),
                Some(&wire)
            );
            assert!(affordances.nodes.is_empty());
            assert!(affordances.hexes.is_empty());
        }
    }

    #[test]
    fn test_bot_turn_offers_nothing() {
        let actions = vec![
            json!({"BuildCity": {"node_id": 2}}),
            json!({"BuildRoad": {"edge_id": [1, 2]}}),
            json!({"MoveRobber": {"coordinate": [0, 0, 0]}}),
            json!("EndTurn"),
        ];
        let affordances = build_affordances(&actions, SeatControl::Bot);
        assert!(affordances.nodes.is_empty());
        assert!(affordances.edges.is_empty());
        assert!(affordances.hexes.is_empty());
        assert!(affordances.is_empty());
    }

    #[test]
    fn test_spatial_entries_keep_the_original_item() {
        let actions = vec![
            json!("Roll"),
            json!({"BuildSettlement": {"node_id": 4}}),
            json!({"BuildCity": {"node_id": 12}}),
            json!({"BuildRoad": {"edge_id": [4, 5]}}),
            json!({"MoveRobber": {"coordinate": [1, -1, 0], "victim": "player_1"}}),
            json!({"MoveRobber": {"coordinate": [1, -1, 0], "victim": null}}),
            json!({"MoveRobber": {"coordinate": [0, 1, -1]}}),
        ];
        let affordances = build_affordances(&actions, SeatControl::Human);

        let mut stored: Vec<&ActionEntry> = affordances
            .nodes
            .values()
            .chain(affordances.edges.values())
            .chain(affordances.hexes.values().flatten())
            .collect();
        stored.sort_by_key(|entry| entry.index);

        assert_eq!(stored.len(), 6);
        for entry in stored {
            assert_eq!(entry.wire, actions[entry.index]);
            assert_eq!(Ok(entry.action.clone()), decode_action(&actions[entry.index]));
        }
        assert_eq!(affordances.hexes[&coord(1, -1, 0)].len(), 2);
        assert_eq!(affordances.global.len(), 1);
    }

    #[test]
    fn test_flat_actions_fill_the_same_tables() {
        let union = build_affordances(
            &[
                json!({"BuildSettlement": {"node_id": 7}}),
                json!({"BuildRoad": {"edge_id": [9, 3]}}),
                json!({"MoveRobber": {"coordinate": [0, 1, -1]}}),
            ],
            SeatControl::Human,
        );
        let flat = build_affordances(
            &[
                json!({"action_type": "BuildSettlement", "node_id": "7"}),
                json!({"action_type": "BuildRoad", "edge_id": "e3_9"}),
                json!({"action_type": "MoveRobber", "coordinate": [0, 1, -1]}),
            ],
            SeatControl::Human,
        );

        assert_eq!(
            union.nodes.keys().collect::<Vec<_>>(),
            flat.nodes.keys().collect::<Vec<_>>()
        );
        assert_eq!(union.nodes[&7].action, flat.nodes[&7].action);
        let key = EdgeKey::new(3, 9);
        assert_eq!(union.edges[&key].target, flat.edges[&key].target);
        assert_eq!(
            union.hexes[&coord(0, 1, -1)][0].action,
            flat.hexes[&coord(0, 1, -1)][0].action
        );
    }

    #[test]
    fn test_undecodable_items_are_skipped() {
        let actions = vec![
            json!({"Teleport": {"node_id": 3}}),
            json!({"MoveRobber": {"coordinate": [2, 2, 2]}}),
            json!({"BuildSettlement": {"node_id": 3}}),
        ];
        let affordances = build_affordances(&actions, SeatControl::Human);
        assert_eq!(affordances.rejected.len(), 2);
        assert_eq!(affordances.rejected[0].index, 0);
        assert!(affordances.hexes.is_empty());
        assert_eq!(affordances.nodes.len(), 1);
    }

    #[test]
    fn test_global_categories() {
        let actions = vec![
            json!("BuyDevelopmentCard"),
            json!("PlayKnight"),
            json!({"MaritimeTrade": {"give": "Wood", "take": "Ore", "ratio": 4}}),
            json!({"MaritimeTrade": {"give": "Brick", "take": "Ore", "ratio": 4}}),
            json!("EndTurn"),
        ];
        let affordances = build_affordances(&actions, SeatControl::Human);
        assert_eq!(
            affordances.categories(),
            vec![
                ActionCategory::BuyDevelopmentCard,
                ActionCategory::PlayDevelopmentCard,
                ActionCategory::Trade,
                ActionCategory::EndTurn,
            ]
        );
        assert_eq!(affordances.global_in(ActionCategory::Trade).count(), 2);
        assert_eq!(
            affordances.resolve(&ClickTarget::Global(4)).map(|e| &e.action),
            Some(&PlayerAction::EndTurn)
        );
    }

    #[test]
    fn test_duplicate_node_keeps_first_entry() {
        let actions = vec![
            json!({"BuildSettlement": {"node_id": 5}}),
            json!({"BuildCity": {"node_id": 5}}),
        ];
        let affordances = build_affordances(&actions, SeatControl::Human);
        assert_eq!(affordances.nodes.len(), 1);
        assert_eq!(affordances.nodes[&5].index, 0);
        assert_eq!(affordances.rejected.len(), 1);
        assert_eq!(affordances.rejected[0].index, 1);
        assert_eq!(affordances.rejected[0].wire, actions[1]);
        assert_eq!(
            affordances.rejected[0].error,
            ProtocolError::DuplicateTarget {
                tag: "BuildCity".to_string(),
                target: "5".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_edge_in_either_order_is_rejected() {
        let actions = vec![
            json!({"BuildRoad": {"edge_id": [3, 9]}}),
            json!({"BuildRoad": {"edge_id": [9, 3]}}),
        ];
        let affordances = build_affordances(&actions, SeatControl::Human);
        assert_eq!(affordances.edges.len(), 1);
        assert_eq!(affordances.rejected.len(), 1);
        assert!(matches!(
            &affordances.rejected[0].error,
            ProtocolError::DuplicateTarget { target, .. } if target == "e3_9"
        ));
    }

    #[test]
    fn test_overflowing_robber_coordinate_is_skipped() {
        let actions = vec![
            json!({"MoveRobber": {"coordinate": [2147483647, 2147483647, 2]}}),
            json!({"MoveRobber": {"coordinate": [0, 0, 0]}}),
        ];
        let affordances = build_affordances(&actions, SeatControl::Human);
        assert_eq!(affordances.rejected.len(), 1);
        assert_eq!(affordances.rejected[0].index, 0);
        assert!(matches!(
            affordances.rejected[0].error,
            ProtocolError::InvalidParameters { .. }
        ));
        assert_eq!(affordances.hexes.len(), 1);
        assert!(affordances.hexes.contains_key(&CubeCoordinate::ORIGIN));
    }
}
