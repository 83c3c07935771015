use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::errors::{ProtocolError, ProtocolResult, TransportError};
use crate::game::GameSnapshot;

/// WebSocket message types for client-server communication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "game_state")]
    GameState { game: Box<GameSnapshot> },

    #[serde(rename = "game_updated")]
    GameUpdated { game: Box<GameSnapshot> },

    #[serde(rename = "game_created")]
    GameCreated {
        game_id: String,
        game: Box<GameSnapshot>,
    },

    /// `action` is a legal-action list item, exactly as the server sent it
    #[serde(rename = "player_action")]
    PlayerAction { action: Value },

    #[serde(rename = "get_game_state")]
    GetGameState,

    #[serde(rename = "action_result")]
    ActionResult {
        success: bool,
        #[serde(default)]
        message: String,
        #[serde(default)]
        events: Vec<Value>,
    },

    #[serde(rename = "error")]
    Error { message: String },

    #[serde(rename = "greeting")]
    Greeting { message: String },

    #[serde(rename = "bot_thinking")]
    BotThinking { player_id: String },
}

impl WsMessage {
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::DeserializationFailed {
            details: e.to_string(),
        })
    }

    pub fn to_frame(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::SerializationFailed {
            details: e.to_string(),
        })
    }

    /// Why the server turned an action down, if it did. The server may report
    /// success at the message level while an `ActionExecuted` event carries
    /// the failure.
    pub fn rejection_reason(&self) -> Option<String> {
        let WsMessage::ActionResult {
            success,
            message,
            events,
        } = self
        else {
            return None;
        };
        if !success {
            return Some(message.clone());
        }
        events.iter().find_map(|event| {
            let executed = event.get("ActionExecuted")?;
            if executed.get("success")?.as_bool()? {
                return None;
            }
            Some(
                executed
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("action failed")
                    .to_string(),
            )
        })
    }
}

/// A reliable text-frame channel to the server, supplied by the embedding UI
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Next inbound frame; `None` once the connection is closed
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
}

/// Adapts any split socket (a `Sink` of outgoing frames and a `Stream` of
/// incoming ones) to [`Transport`]
pub struct FramedTransport<Si, St> {
    sink: Si,
    stream: St,
}

impl<Si, St> FramedTransport<Si, St> {
    pub fn new(sink: Si, stream: St) -> Self {
        Self { sink, stream }
    }
}

#[async_trait]
impl<Si, St, E> Transport for FramedTransport<Si, St>
where
    Si: Sink<String> + Unpin + Send,
    Si::Error: Display,
    St: Stream<Item = Result<String, E>> + Unpin + Send,
    E: Display + Send,
{
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.sink
            .send(frame)
            .await
            .map_err(|e| TransportError::send_failed(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        let next = self.stream.next().await?;
        Some(next.map_err(|e| TransportError::ReceiveFailed {
            details: e.to_string(),
        }))
    }
}

/// In-process transport, one half of [`memory_transport`]
pub struct MemoryTransport {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<String>,
}

/// The server's end of an in-process transport
pub struct MemoryPeer {
    pub to_client: mpsc::UnboundedSender<String>,
    pub from_client: mpsc::UnboundedReceiver<String>,
}

pub fn memory_transport() -> (MemoryTransport, MemoryPeer) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();
    (
        MemoryTransport { outbound, inbound },
        MemoryPeer {
            to_client,
            from_client,
        },
    )
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await.map(Ok)
    }
}

impl MemoryPeer {
    pub fn push(&self, message: &WsMessage) -> ProtocolResult<()> {
        let frame = message.to_frame()?;
        // A closed client end is the same as the client having hung up.
        let _ = self.to_client.send(frame);
        Ok(())
    }

    /// Next frame the client sent, parsed as JSON
    pub async fn next_frame(&mut self) -> Option<Value> {
        let text = self.from_client.recv().await?;
        serde_json::from_str(&text).ok()
    }
}
