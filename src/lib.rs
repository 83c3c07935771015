// Catan Client Library - Core Module Organization
//
// Presentation core for a Catan web client: hex geometry, the board view
// model, action affordances and the session synchronizer. The embedding UI
// supplies the socket and the drawing area.

// Wire data and shared enums
pub mod actions;
pub mod enums;
pub mod game;
mod legacy;

// Board geometry and view models
pub mod affordances;
pub mod board_view;
pub mod geometry;

// Session and transport
pub mod session;
pub mod websocket;

pub mod config;
pub mod errors;

// Re-export common types for convenient access
pub use crate::actions::{decode_action, EdgeKey, NodeId, PlayerAction, Target};
pub use crate::affordances::{build_affordances, Affordances, ClickTarget};
pub use crate::board_view::{build_board_view, BoardView, Viewport};
pub use crate::config::{ClientConfig, LayoutConfig};
pub use crate::errors::{ClientError, ClientResult};
pub use crate::game::GameSnapshot;
pub use crate::geometry::{CubeCoordinate, Point};
pub use crate::session::{ClientView, SessionClient, SessionState, SyncEvent, Synchronizer};
pub use crate::websocket::{FramedTransport, Transport, WsMessage};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
