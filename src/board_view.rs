//! Turns a snapshot's board into renderable records with pixel geometry.
//!
//! The builder is a pure transform of (snapshot, viewport, layout config). A
//! tile, node or edge that cannot be placed degrades on its own; the rest of
//! the board is always built.

use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::actions::{EdgeKey, NodeId};
use crate::config::LayoutConfig;
use crate::enums::{BuildingType, Color, TileKind};
use crate::errors::{GeometryError, GeometryResult};
use crate::game::{Edge, GameBoard, GameSnapshot};
use crate::geometry::{
    edge_segment, node_position, tile_center, tile_side_segment, CubeCoordinate, EdgeDirection,
    EdgeSegment, NodeDirection, Point,
};

const SQRT3: f64 = 1.732_050_807_568_877_2;
const POSITION_TOLERANCE: f64 = 1e-6;

/// Drawing area supplied by the embedding UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub mobile: bool,
    pub hex_size_override: Option<f64>,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            mobile: false,
            hex_size_override: None,
        }
    }

    fn is_measurable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Largest hex size that fits `levels` half-rows of tiles in the viewport.
///
/// The board is `levels` tiles wide and `levels` rows of three-quarter height
/// tall, plus a quarter tile. The height constraint is tried first and the
/// width constraint only when the height-fitted board would be too wide.
pub fn compute_hex_size(width: f64, height: f64, levels: u32) -> f64 {
    let levels = f64::from(levels.max(1));
    let size_for_height = (4.0 * height) / (3.0 * levels + 1.0) / 2.0;
    let corresponding_width = levels * SQRT3 * size_for_height;
    if corresponding_width < width {
        size_for_height
    } else {
        width / levels / SQRT3
    }
}

/// Rings of tiles around the centre tile, counting the outer port ring
pub fn board_rings(board: &GameBoard) -> u32 {
    board
        .tiles
        .iter()
        .map(|t| t.coordinate)
        .chain(board.ports.iter().map(|p| p.coordinate))
        .map(|c| c.distance_from_origin())
        .max()
        .unwrap_or(0)
        .max(1)
}

/// Hex size for a viewport: an explicit override, else the fitted size
pub fn resolve_hex_size(viewport: &Viewport, rings: u32, config: &LayoutConfig) -> f64 {
    if let Some(size) = viewport.hex_size_override.or(config.hex_size_override) {
        if size.is_finite() && size > 0.0 {
            return size;
        }
        log::warn!("Ignoring invalid hex size override {}", size);
    }
    if !viewport.is_measurable() {
        log::warn!(
            "Viewport {}x{} cannot be measured, using default hex size",
            viewport.width,
            viewport.height
        );
        return config.default_hex_size;
    }

    let size = compute_hex_size(viewport.width, viewport.height, 2 * rings);
    if viewport.mobile {
        size * config.mobile_scale
    } else {
        size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Placement {
    /// Drawn between its two resolved endpoints
    Exact,
    /// Drawn on its canonical tile's side, shortened
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileView {
    pub coordinate: CubeCoordinate,
    pub kind: TileKind,
    pub number: Option<u8>,
    pub center: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortView {
    pub coordinate: CubeCoordinate,
    pub resource: Option<String>,
    pub ratio: u8,
    pub direction: String,
    pub center: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub tile: CubeCoordinate,
    pub direction: NodeDirection,
    pub position: Point,
    pub building: Option<BuildingType>,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeView {
    pub key: EdgeKey,
    pub tile: CubeCoordinate,
    pub direction: String,
    pub color: Option<Color>,
    pub segment: EdgeSegment,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardView {
    pub hex_size: f64,
    pub origin: Point,
    pub tiles: Vec<TileView>,
    pub ports: Vec<PortView>,
    pub nodes: BTreeMap<NodeId, NodeView>,
    pub edges: BTreeMap<EdgeKey, EdgeView>,
    pub robber: Option<Point>,
}

/// Node ids come from board keys: `n7`, `n7_N` (one entry per owning tile on
/// template-built boards) or a bare `7`.
pub fn parse_node_key(key: &str) -> GeometryResult<NodeId> {
    let body = key.trim().trim_start_matches('n');
    let digits = body.split('_').next().unwrap_or_default();
    digits.parse().map_err(|_| GeometryError::MalformedNodeKey {
        key: key.to_string(),
    })
}

pub fn build_board_view(
    snapshot: &GameSnapshot,
    viewport: &Viewport,
    config: &LayoutConfig,
) -> BoardView {
    let board = &snapshot.board;
    let hex_size = resolve_hex_size(viewport, board_rings(board), config);
    let origin = if viewport.is_measurable() {
        Point::new(viewport.width / 2.0, viewport.height / 2.0)
    } else {
        Point::new(0.0, 0.0)
    };
    let at = |coordinate: CubeCoordinate| origin.offset(tile_center(coordinate, hex_size));

    let tiles = board
        .tiles
        .iter()
        .map(|t| TileView {
            coordinate: t.coordinate,
            kind: t.tile.kind(),
            number: t.tile.number,
            center: at(t.coordinate),
        })
        .collect();

    let ports = board
        .ports
        .iter()
        .map(|p| PortView {
            coordinate: p.coordinate,
            resource: p.port.resource.clone(),
            ratio: p.port.ratio,
            direction: p.port.direction.clone(),
            center: at(p.coordinate),
        })
        .collect();

    let nodes = build_nodes(board, hex_size, origin);

    let mut edges = BTreeMap::new();
    for (key, edge) in board.edges.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        let edge_key = EdgeKey::new(edge.node1_id, edge.node2_id);
        if edges.contains_key(&edge_key) {
            log::debug!("Edge {} listed twice, keeping the first", key);
            continue;
        }
        let endpoints = nodes
            .get(&edge.node1_id)
            .zip(nodes.get(&edge.node2_id))
            .map(|(a, b)| (a.position, b.position));
        let (segment, placement) = place_edge(edge, endpoints, hex_size, origin, config);
        edges.insert(
            edge_key,
            EdgeView {
                key: edge_key,
                tile: edge.tile_coordinate,
                direction: edge.direction.clone(),
                color: edge.color.clone(),
                segment,
                placement,
            },
        );
    }

    BoardView {
        hex_size,
        origin,
        tiles,
        ports,
        nodes,
        edges,
        robber: board.robber_coordinate.map(at),
    }
}

fn build_nodes(board: &GameBoard, hex_size: f64, origin: Point) -> BTreeMap<NodeId, NodeView> {
    let mut nodes: BTreeMap<NodeId, NodeView> = BTreeMap::new();
    for (key, node) in board.nodes.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        let placed = parse_node_key(key).and_then(|id| {
            let direction: NodeDirection = node.direction.parse()?;
            Ok((id, direction))
        });
        let (id, direction) = match placed {
            Ok(placed) => placed,
            Err(e) => {
                log::warn!("Skipping node {}: {}", key, e);
                continue;
            }
        };

        let position = origin.offset(node_position(node.tile_coordinate, direction, hex_size));
        if let Some(existing) = nodes.get(&id) {
            if existing.position.distance_to(position) > POSITION_TOLERANCE {
                log::warn!(
                    "Node {} resolves to {:?} from {} but {:?} from {}",
                    id,
                    position,
                    key,
                    existing.position,
                    existing.tile
                );
            }
            continue;
        }

        nodes.insert(
            id,
            NodeView {
                id,
                tile: node.tile_coordinate,
                direction,
                position,
                building: node.building_type(),
                color: node.color.clone(),
            },
        );
    }
    nodes
}

/// Place a road between its resolved endpoints, or on its tile's side when
/// the endpoints are missing or unusable.
pub fn place_edge(
    edge: &Edge,
    endpoints: Option<(Point, Point)>,
    hex_size: f64,
    origin: Point,
    config: &LayoutConfig,
) -> (EdgeSegment, Placement) {
    let exact = endpoints
        .ok_or_else(|| GeometryError::degenerate("endpoint node not on the board"))
        .and_then(|(a, b)| edge_segment(a, b));
    match exact {
        Ok(segment) => (segment, Placement::Exact),
        Err(e) => {
            log::warn!(
                "Edge {}-{} falls back to tile placement: {}",
                edge.node1_id,
                edge.node2_id,
                e
            );
            (fallback_segment(edge, hex_size, origin, config), Placement::Fallback)
        }
    }
}

fn fallback_segment(edge: &Edge, hex_size: f64, origin: Point, config: &LayoutConfig) -> EdgeSegment {
    let length = hex_size * config.fallback_edge_ratio;
    let mut segment = match edge.direction.parse::<EdgeDirection>() {
        Ok(side) => tile_side_segment(edge.tile_coordinate, side, hex_size, length),
        Err(e) => {
            log::debug!("{}, anchoring at the tile centre", e);
            EdgeSegment {
                center: tile_center(edge.tile_coordinate, hex_size),
                length,
                angle_degrees: 0.0,
            }
        }
    };
    segment.center = origin.offset(segment.center);
    segment
}
