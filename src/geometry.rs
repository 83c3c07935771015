//! Hex geometry: pointy-top tiles addressed by cube coordinates.
//!
//! Every pixel position in the client derives from [`tile_center`]. Nodes sit
//! at [`vertex_offset`] from a tile centre and roads are drawn between two
//! resolved node positions with [`edge_segment`].

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::errors::{GeometryError, GeometryResult, ProtocolError};

const SQRT3: f64 = 1.732_050_807_568_877_2;

/// Largest component magnitude accepted off the wire
pub const MAX_COMPONENT: i32 = 1 << 16;

/// Cube address of a tile. Always satisfies `x + y + z == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "CoordinateRepr")]
pub struct CubeCoordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// The server sends coordinates as `{x, y, z}` on the board and as `[x, y, z]`
/// inside robber actions.
#[derive(Deserialize)]
#[serde(untagged)]
enum CoordinateRepr {
    Triple(i32, i32, i32),
    Object { x: i32, y: i32, z: i32 },
}

impl TryFrom<CoordinateRepr> for CubeCoordinate {
    type Error = ProtocolError;

    fn try_from(repr: CoordinateRepr) -> Result<Self, Self::Error> {
        let (x, y, z) = match repr {
            CoordinateRepr::Triple(x, y, z) => (x, y, z),
            CoordinateRepr::Object { x, y, z } => (x, y, z),
        };
        CubeCoordinate::new(x, y, z)
    }
}

impl CubeCoordinate {
    pub const ORIGIN: CubeCoordinate = CubeCoordinate { x: 0, y: 0, z: 0 };

    pub fn new(x: i32, y: i32, z: i32) -> Result<Self, ProtocolError> {
        if [x, y, z].iter().any(|c| c.unsigned_abs() > MAX_COMPONENT as u32) {
            return Err(ProtocolError::MalformedCoordinate {
                details: format!("({x}, {y}, {z}) is outside the board range"),
            });
        }
        if i64::from(x) + i64::from(y) + i64::from(z) != 0 {
            return Err(ProtocolError::MalformedCoordinate {
                details: format!("({x}, {y}, {z}) does not sum to zero"),
            });
        }
        Ok(Self { x, y, z })
    }

    /// Tile rings between this tile and the centre tile
    pub fn distance_from_origin(&self) -> u32 {
        self.x
            .unsigned_abs()
            .max(self.y.unsigned_abs())
            .max(self.z.unsigned_abs())
    }

    /// The tile sharing the given side with this one. Components saturate, which
    /// only matters for values built by hand outside [`MAX_COMPONENT`].
    pub fn neighbor(&self, side: EdgeDirection) -> CubeCoordinate {
        let (dx, dy, dz) = match side {
            EdgeDirection::East => (1, -1, 0),
            EdgeDirection::NorthEast => (1, 0, -1),
            EdgeDirection::NorthWest => (0, 1, -1),
            EdgeDirection::West => (-1, 1, 0),
            EdgeDirection::SouthWest => (-1, 0, 1),
            EdgeDirection::SouthEast => (0, -1, 1),
        };
        CubeCoordinate {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }
}

impl fmt::Display for CubeCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

impl FromStr for CubeCoordinate {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ProtocolError::MalformedCoordinate {
            details: format!("cannot parse '{s}'"),
        };
        let parts: Vec<i32> = s
            .split(',')
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|_| malformed())?;
        match parts.as_slice() {
            [x, y, z] => CubeCoordinate::new(*x, *y, *z),
            _ => Err(malformed()),
        }
    }
}

/// A position in pixel space (y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn offset(self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Vertex of a pointy-top hexagon, named from the tile centre
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeDirection {
    North,
    NorthEast,
    SouthEast,
    South,
    SouthWest,
    NorthWest,
}

impl NodeDirection {
    /// Convert to the short wire label
    pub fn to_str(self) -> &'static str {
        match self {
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::NorthWest => "NW",
        }
    }

    /// Angle from the tile centre, counter-clockwise from east
    pub fn angle_degrees(self) -> f64 {
        match self {
            Self::North => 90.0,
            Self::NorthEast => 30.0,
            Self::SouthEast => -30.0,
            Self::South => -90.0,
            Self::SouthWest => -150.0,
            Self::NorthWest => 150.0,
        }
    }

    /// Get all directions in clockwise order starting from North
    pub fn all_clockwise() -> [Self; 6] {
        [
            Self::North,
            Self::NorthEast,
            Self::SouthEast,
            Self::South,
            Self::SouthWest,
            Self::NorthWest,
        ]
    }

    /// The other two (tile, vertex) pairs that name the same corner
    pub fn shared_corners(self, tile: CubeCoordinate) -> [(CubeCoordinate, NodeDirection); 2] {
        use EdgeDirection as E;
        use NodeDirection as N;
        match self {
            N::North => [
                (tile.neighbor(E::NorthWest), N::SouthEast),
                (tile.neighbor(E::NorthEast), N::SouthWest),
            ],
            N::NorthEast => [
                (tile.neighbor(E::NorthEast), N::South),
                (tile.neighbor(E::East), N::NorthWest),
            ],
            N::SouthEast => [
                (tile.neighbor(E::East), N::SouthWest),
                (tile.neighbor(E::SouthEast), N::North),
            ],
            N::South => [
                (tile.neighbor(E::SouthEast), N::NorthWest),
                (tile.neighbor(E::SouthWest), N::NorthEast),
            ],
            N::SouthWest => [
                (tile.neighbor(E::SouthWest), N::North),
                (tile.neighbor(E::West), N::SouthEast),
            ],
            N::NorthWest => [
                (tile.neighbor(E::West), N::NorthEast),
                (tile.neighbor(E::NorthWest), N::South),
            ],
        }
    }
}

impl FromStr for NodeDirection {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('_', "").as_str() {
            "N" | "NORTH" => Ok(Self::North),
            "NE" | "NORTHEAST" => Ok(Self::NorthEast),
            "SE" | "SOUTHEAST" => Ok(Self::SouthEast),
            "S" | "SOUTH" => Ok(Self::South),
            "SW" | "SOUTHWEST" => Ok(Self::SouthWest),
            "NW" | "NORTHWEST" => Ok(Self::NorthWest),
            _ => Err(GeometryError::UnknownDirection {
                label: s.to_string(),
            }),
        }
    }
}

/// Side of a pointy-top hexagon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeDirection {
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
    NorthEast,
}

impl EdgeDirection {
    pub fn to_str(self) -> &'static str {
        match self {
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
            Self::NorthEast => "NE",
        }
    }

    /// Angle of the side's midpoint from the tile centre
    pub fn angle_degrees(self) -> f64 {
        match self {
            Self::East => 0.0,
            Self::NorthEast => 60.0,
            Self::NorthWest => 120.0,
            Self::West => 180.0,
            Self::SouthWest => -120.0,
            Self::SouthEast => -60.0,
        }
    }
}

/// Besides the six side names, accepts the server's edge labels, which call
/// the east side `N` and the west side `S`. A pointy-top tile has no north or
/// south side, so the short labels are unambiguous.
impl FromStr for EdgeDirection {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('_', "").as_str() {
            "E" | "EAST" | "N" => Ok(Self::East),
            "W" | "WEST" | "S" => Ok(Self::West),
            "SE" | "SOUTHEAST" => Ok(Self::SouthEast),
            "SW" | "SOUTHWEST" => Ok(Self::SouthWest),
            "NW" | "NORTHWEST" => Ok(Self::NorthWest),
            "NE" | "NORTHEAST" => Ok(Self::NorthEast),
            _ => Err(GeometryError::UnknownDirection {
                label: s.to_string(),
            }),
        }
    }
}

/// Pixel centre of a tile relative to the board origin (axial q = x, r = z)
pub fn tile_center(coord: CubeCoordinate, size: f64) -> Point {
    let q = coord.x as f64;
    let r = coord.z as f64;
    Point::new(size * (SQRT3 * q + SQRT3 / 2.0 * r), size * (1.5 * r))
}

/// Offset from a tile centre to one of its vertices
pub fn vertex_offset(direction: NodeDirection, size: f64) -> Point {
    polar(direction.angle_degrees(), size)
}

/// Offset from a tile centre to the midpoint of one of its sides
pub fn edge_midpoint_offset(direction: EdgeDirection, size: f64) -> Point {
    polar(direction.angle_degrees(), size * SQRT3 / 2.0)
}

/// Pixel position of a vertex relative to the board origin
pub fn node_position(tile: CubeCoordinate, direction: NodeDirection, size: f64) -> Point {
    tile_center(tile, size).offset(vertex_offset(direction, size))
}

fn polar(angle_degrees: f64, radius: f64) -> Point {
    let theta = angle_degrees * PI / 180.0;
    // Pixel y grows downwards.
    Point::new(radius * theta.cos(), -radius * theta.sin())
}

/// Placement of a road between two vertices
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeSegment {
    pub center: Point,
    pub length: f64,
    /// `atan2(dy, dx)` in degrees, pixel space
    pub angle_degrees: f64,
}

impl EdgeSegment {
    pub fn is_finite(&self) -> bool {
        self.center.is_finite() && self.length.is_finite() && self.angle_degrees.is_finite()
    }
}

pub fn edge_segment(a: Point, b: Point) -> GeometryResult<EdgeSegment> {
    if !a.is_finite() || !b.is_finite() {
        return Err(GeometryError::degenerate(format!(
            "non-finite endpoint ({a:?}, {b:?})"
        )));
    }
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length = dx.hypot(dy);
    if !length.is_finite() || length <= f64::EPSILON {
        return Err(GeometryError::degenerate(format!("zero length at {a:?}")));
    }
    Ok(EdgeSegment {
        center: Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0),
        length,
        angle_degrees: dy.atan2(dx).to_degrees(),
    })
}

/// Road drawn on one side of a single tile, used when its endpoints cannot be
/// resolved. The segment runs along the side, shortened to `length`.
pub fn tile_side_segment(
    tile: CubeCoordinate,
    side: EdgeDirection,
    size: f64,
    length: f64,
) -> EdgeSegment {
    let center = tile_center(tile, size).offset(edge_midpoint_offset(side, size));
    EdgeSegment {
        center,
        length,
        angle_degrees: normalize_degrees(90.0 - side.angle_degrees()),
    }
}

fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    const TOLERANCE: f64 = 1e-9;

    fn coord(x: i32, y: i32, z: i32) -> CubeCoordinate {
        CubeCoordinate::new(x, y, z).unwrap()
    }

    fn assert_close(a: Point, b: Point) {
        assert!(
            a.distance_to(b) < TOLERANCE,
            "expected {a:?} to equal {b:?}"
        );
    }

    #[test]
    fn test_tile_center_of_origin_and_east_neighbor() {
        assert_close(tile_center(CubeCoordinate::ORIGIN, 60.0), Point::new(0.0, 0.0));
        assert_close(
            tile_center(coord(1, -1, 0), 60.0),
            Point::new(60.0 * 3f64.sqrt(), 0.0),
        );
    }

    #[test]
    fn test_neighbors_are_one_tile_width_apart() {
        let size = 40.0;
        let center = coord(1, 0, -1);
        for side in [
            EdgeDirection::East,
            EdgeDirection::SouthEast,
            EdgeDirection::SouthWest,
            EdgeDirection::West,
            EdgeDirection::NorthWest,
            EdgeDirection::NorthEast,
        ] {
            let distance = tile_center(center, size).distance_to(tile_center(center.neighbor(side), size));
            assert!((distance - SQRT3 * size).abs() < TOLERANCE, "{side:?}");
        }
    }

    #[test]
    fn test_vertex_offsets() {
        assert_close(vertex_offset(NodeDirection::North, 10.0), Point::new(0.0, -10.0));
        assert_close(vertex_offset(NodeDirection::South, 10.0), Point::new(0.0, 10.0));
        assert_close(
            vertex_offset(NodeDirection::NorthEast, 10.0),
            Point::new(5.0 * SQRT3, -5.0),
        );
        assert_close(
            vertex_offset(NodeDirection::SouthWest, 10.0),
            Point::new(-5.0 * SQRT3, 5.0),
        );
    }

    #[test]
    fn test_node_direction_conversion() {
        assert_eq!("N".parse::<NodeDirection>(), Ok(NodeDirection::North));
        assert_eq!("NORTH".parse::<NodeDirection>(), Ok(NodeDirection::North));
        assert_eq!("ne".parse::<NodeDirection>(), Ok(NodeDirection::NorthEast));
        assert_eq!("SouthWest".parse::<NodeDirection>(), Ok(NodeDirection::SouthWest));
        assert_eq!("NORTH_WEST".parse::<NodeDirection>(), Ok(NodeDirection::NorthWest));
        assert!("up".parse::<NodeDirection>().is_err());

        assert_eq!(NodeDirection::North.to_str(), "N");
        assert_eq!(NodeDirection::SouthWest.to_str(), "SW");
        assert_eq!("EAST".parse::<EdgeDirection>(), Ok(EdgeDirection::East));
        assert!("NORTH".parse::<EdgeDirection>().is_err());
        assert!("up".parse::<EdgeDirection>().is_err());
    }

    #[test]
    fn test_shared_corners_resolve_to_same_pixel() {
        let mut rng = XorShiftRng::seed_from_u64(7);
        for _ in 0..200 {
            let x = rng.gen_range(-4..=4);
            let z = rng.gen_range(-4..=4);
            let tile = coord(x, -x - z, z);
            let size = rng.gen_range(10.0..90.0);
            for direction in NodeDirection::all_clockwise() {
                let here = node_position(tile, direction, size);
                for (other_tile, other_direction) in direction.shared_corners(tile) {
                    assert_close(here, node_position(other_tile, other_direction, size));
                }
            }
        }
    }

    #[test]
    fn test_overflowing_coordinates_are_malformed() {
        assert!(matches!(
            CubeCoordinate::new(i32::MAX, i32::MAX, 2),
            Err(ProtocolError::MalformedCoordinate { .. })
        ));
        assert!(matches!(
            serde_json::from_str::<CubeCoordinate>("[2147483647, 2147483647, 2]"),
            Err(_)
        ));
        assert!(matches!(
            "-2147483648,-2147483648,0".parse::<CubeCoordinate>(),
            Err(ProtocolError::MalformedCoordinate { .. })
        ));

        let edge = CubeCoordinate {
            x: i32::MAX,
            y: i32::MIN + 1,
            z: 0,
        };
        assert_eq!(edge.neighbor(EdgeDirection::East).x, i32::MAX);
    }

    #[test]
    fn test_edge_segment() {
        let segment = edge_segment(Point::new(0.0, 0.0), Point::new(0.0, 10.0)).unwrap();
        assert_close(segment.center, Point::new(0.0, 5.0));
        assert!((segment.length - 10.0).abs() < TOLERANCE);
        assert!((segment.angle_degrees - 90.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_edge_segment_rejects_degenerate_input() {
        let p = Point::new(3.0, 4.0);
        assert!(edge_segment(p, p).is_err());
        assert!(edge_segment(Point::new(f64::NAN, 0.0), p).is_err());
        assert!(edge_segment(p, Point::new(f64::INFINITY, 0.0)).is_err());
    }

    #[test]
    fn test_tile_side_segment_lies_on_the_side() {
        let size = 50.0;
        let tile = coord(0, 1, -1);
        let fallback = tile_side_segment(tile, EdgeDirection::East, size, 20.0);
        let ne = node_position(tile, NodeDirection::NorthEast, size);
        let se = node_position(tile, NodeDirection::SouthEast, size);
        let exact = edge_segment(ne, se).unwrap();
        assert_close(fallback.center, exact.center);
        assert!((fallback.angle_degrees - exact.angle_degrees).abs() < TOLERANCE);
        assert_eq!(fallback.length, 20.0);
    }

    #[test]
    fn test_server_edge_labels() {
        assert_eq!("N".parse::<EdgeDirection>(), Ok(EdgeDirection::East));
        assert_eq!("S".parse::<EdgeDirection>(), Ok(EdgeDirection::West));

        // Each server label names the side between the two vertices it joins.
        let size = 30.0;
        let tile = coord(1, 0, -1);
        for (label, from, to) in [
            ("N", NodeDirection::NorthEast, NodeDirection::SouthEast),
            ("SE", NodeDirection::SouthEast, NodeDirection::South),
            ("SW", NodeDirection::South, NodeDirection::SouthWest),
            ("S", NodeDirection::SouthWest, NodeDirection::NorthWest),
            ("NW", NodeDirection::NorthWest, NodeDirection::North),
            ("NE", NodeDirection::North, NodeDirection::NorthEast),
        ] {
            let side: EdgeDirection = label.parse().unwrap();
            let fallback = tile_side_segment(tile, side, size, 10.0);
            let exact = edge_segment(
                node_position(tile, from, size),
                node_position(tile, to, size),
            )
            .unwrap();
            assert_close(fallback.center, exact.center);
        }
    }

    #[test]
    fn test_coordinate_parsing() {
        let parsed: CubeCoordinate = serde_json::from_str("[1, -1, 0]").unwrap();
        assert_eq!(parsed, coord(1, -1, 0));
        let parsed: CubeCoordinate = serde_json::from_str(r#"{"x": 0, "y": 2, "z": -2}"#).unwrap();
        assert_eq!(parsed, coord(0, 2, -2));
        assert!(serde_json::from_str::<CubeCoordinate>("[1, 1, 1]").is_err());
        assert!(serde_json::from_str::<CubeCoordinate>("[70000, -70000, 0]").is_err());

        assert_eq!("2,-1,-1".parse::<CubeCoordinate>(), Ok(coord(2, -1, -1)));
        assert_eq!(coord(2, -1, -1).to_string(), "2,-1,-1");
        assert!("1,2".parse::<CubeCoordinate>().is_err());
        assert_eq!(coord(-2, 3, -1).distance_from_origin(), 3);
    }
}
