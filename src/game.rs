//! Client-side mirror of the server's `Game` payload.
//!
//! Every field defaults when absent and unknown fields are ignored, so older
//! and newer servers both decode. Board entities are decoded one by one; a
//! malformed tile, node or edge is dropped with a warning instead of failing
//! the whole snapshot.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::actions::NodeId;
use crate::enums::{ActionPrompt, BuildingType, Color, DevCard, Resource, TileKind};
use crate::geometry::CubeCoordinate;

// Game state enum to track the current state of the game
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    Setup,
    Active,
    Finished { winner: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TileData {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub number: Option<u8>,
}

impl TileData {
    /// A missing resource is the desert. Unknown resources are treated the same
    /// way so a newer server cannot break the board.
    pub fn kind(&self) -> TileKind {
        match self.resource.as_deref().map(str::parse::<Resource>) {
            Some(Ok(resource)) => TileKind::Produces(resource),
            Some(Err(e)) => {
                log::warn!("Tile with {}, drawing it as desert", e);
                TileKind::Desert
            }
            None => TileKind::Desert,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilePosition {
    pub coordinate: CubeCoordinate,
    pub tile: TileData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default = "default_port_ratio")]
    pub ratio: u8,
    #[serde(default)]
    pub direction: String,
}

fn default_port_ratio() -> u8 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortPosition {
    pub coordinate: CubeCoordinate,
    pub port: Port,
}

// A node (intersection) on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub color: Option<Color>,
    pub tile_coordinate: CubeCoordinate,
    pub direction: String,
}

impl Node {
    pub fn building_type(&self) -> Option<BuildingType> {
        let building = self.building.as_deref()?;
        match building.parse() {
            Ok(kind) => Some(kind),
            Err(e) => {
                log::warn!("Ignoring node building: {}", e);
                None
            }
        }
    }
}

// An edge (path) on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub color: Option<Color>,
    pub node1_id: NodeId,
    pub node2_id: NodeId,
    pub tile_coordinate: CubeCoordinate,
    #[serde(default)]
    pub direction: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameBoard {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub tiles: Vec<TilePosition>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub ports: Vec<PortPosition>,
    /// Keyed `n{id}`, or `n{id}_{direction}` on boards built from a map template
    #[serde(default, deserialize_with = "lenient_map")]
    pub nodes: HashMap<String, Node>,
    /// Keyed `e{min}_{max}`
    #[serde(default, deserialize_with = "lenient_map")]
    pub edges: HashMap<String, Edge>,
    #[serde(default)]
    pub robber_coordinate: Option<CubeCoordinate>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub color: Option<Color>,
    pub resources: HashMap<Resource, u32>,
    pub dev_cards: Vec<DevCard>,
    pub knights_played: u32,
    pub victory_points: u32,
    pub longest_road: bool,
    pub largest_army: bool,
}

/// Who is acting for the current seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeatControl {
    Human,
    Bot,
}

/// A complete game snapshot as pushed by the server
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSnapshot {
    pub id: String,
    pub players: Vec<Player>,
    pub game_state: GameState,
    pub board: GameBoard,
    pub current_player_index: usize,
    pub dice_rolled: bool,
    pub turns: u32,
    pub current_dice_roll: Option<[u8; 2]>,
    /// Game log entries, `[color, action_type, action_data]`
    pub actions: Vec<serde_json::Value>,
    /// Kept as raw wire values so the chosen one can be echoed verbatim
    pub current_playable_actions: Vec<serde_json::Value>,
    pub is_initial_build_phase: bool,
    pub current_color: Option<Color>,
    pub current_prompt: Option<String>,
    pub bot_colors: Vec<Color>,
}

impl GameSnapshot {
    /// Colour of the acting seat, falling back to the player index
    pub fn acting_color(&self) -> Option<Color> {
        self.current_color.clone().or_else(|| {
            self.players
                .get(self.current_player_index)
                .and_then(|p| p.color.clone())
        })
    }

    pub fn seat_control(&self) -> SeatControl {
        match self.acting_color() {
            Some(color) if self.bot_colors.contains(&color) => SeatControl::Bot,
            _ => SeatControl::Human,
        }
    }

    pub fn prompt(&self) -> Option<ActionPrompt> {
        let raw = self.current_prompt.as_deref()?;
        match raw.parse() {
            Ok(prompt) => Some(prompt),
            Err(e) => {
                log::debug!("Unrecognized prompt: {}", e);
                None
            }
        }
    }

    pub fn winner(&self) -> Option<&str> {
        match &self.game_state {
            GameState::Finished { winner } => Some(winner.as_str()),
            _ => None,
        }
    }
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                log::warn!("Dropping malformed board entity: {}", e);
                None
            }
        })
        .collect())
}

fn lenient_map<'de, D, T>(deserializer: D) -> Result<HashMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = HashMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value(value) {
            Ok(item) => Some((key, item)),
            Err(e) => {
                log::warn!("Dropping malformed board entity {}: {}", key, e);
                None
            }
        })
        .collect())
}
