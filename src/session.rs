//! Client state synchronizer.
//!
//! [`Synchronizer`] is a pure state machine fed with server frames and user
//! clicks. [`SessionClient`] drives it over a [`Transport`], arming one
//! deadline per dispatched action.
//!
//! The server is authoritative: the local view only ever changes when a
//! snapshot arrives, and a failed action is never retried.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use uuid::Uuid;

use crate::affordances::{build_affordances, Affordances, ClickTarget};
use crate::board_view::{build_board_view, BoardView, Viewport};
use crate::config::{ClientConfig, LayoutConfig};
use crate::enums::{ActionPrompt, Color};
use crate::errors::{ClientResult, ProtocolError, SessionError, TransportError};
use crate::game::{GameSnapshot, SeatControl};
use crate::websocket::{Transport, WsMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Disconnected,
    /// Waiting for the first snapshot of this connection
    Connecting,
    Synced,
    /// One action is in flight
    AwaitingAck,
}

/// Per-seat UI flags derived from a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnView {
    pub acting_color: Option<Color>,
    pub is_bot_turn: bool,
    pub is_my_turn: bool,
    pub prompt: Option<ActionPrompt>,
    pub is_initial_build_phase: bool,
    pub dice_rolled: bool,
    pub dice: Option<[u8; 2]>,
    pub awaiting_discard: bool,
    pub awaiting_robber: bool,
    pub winner: Option<String>,
}

impl TurnView {
    pub fn from_snapshot(snapshot: &GameSnapshot) -> Self {
        let is_bot_turn = snapshot.seat_control() == SeatControl::Bot;
        let winner = snapshot.winner().map(str::to_string);
        let prompt = snapshot.prompt();
        Self {
            acting_color: snapshot.acting_color(),
            is_bot_turn,
            is_my_turn: !is_bot_turn && winner.is_none(),
            prompt,
            is_initial_build_phase: snapshot.is_initial_build_phase,
            dice_rolled: snapshot.dice_rolled,
            dice: snapshot.current_dice_roll,
            awaiting_discard: prompt == Some(ActionPrompt::Discard),
            awaiting_robber: prompt == Some(ActionPrompt::MoveRobber),
            winner,
        }
    }
}

/// Everything the UI renders, rebuilt as a whole from one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ClientView {
    /// Increments with every applied snapshot
    pub seq: u64,
    pub snapshot: Arc<GameSnapshot>,
    pub board: BoardView,
    pub affordances: Affordances,
    pub turn: TurnView,
}

impl ClientView {
    pub fn build(
        seq: u64,
        snapshot: Arc<GameSnapshot>,
        viewport: &Viewport,
        layout: &LayoutConfig,
    ) -> Self {
        let turn = TurnView::from_snapshot(&snapshot);
        let seat = if turn.is_bot_turn {
            SeatControl::Bot
        } else {
            SeatControl::Human
        };
        Self {
            seq,
            board: build_board_view(&snapshot, viewport, layout),
            affordances: build_affordances(&snapshot.current_playable_actions, seat),
            turn,
            snapshot,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeKind {
    Protocol,
    Server,
    Transport,
    Timeout,
}

/// A transient message for the user; cleared by [`Synchronizer::dismiss_notice`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub request_id: Uuid,
    pub epoch: u64,
    pub target: ClickTarget,
    pub wire: Value,
    /// The server accepted it and the snapshot is still on its way
    pub acknowledged: bool,
}

/// Outcome of feeding one input to the synchronizer
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    SnapshotApplied { seq: u64 },
    ActionAcknowledged { request_id: Uuid },
    ActionFailed { request_id: Uuid, error: SessionError },
    ServerError { message: String },
    Greeting { message: String },
    BotThinking { player_id: String },
    ProtocolError(ProtocolError),
    Disconnected,
    Ignored,
}

pub struct Synchronizer {
    state: SessionState,
    epoch: u64,
    seq: u64,
    viewport: Viewport,
    layout: LayoutConfig,
    view: Option<Arc<ClientView>>,
    pending: Option<PendingAction>,
    notice: Option<Notice>,
}

impl Synchronizer {
    pub fn new(viewport: Viewport, layout: LayoutConfig) -> Self {
        Self {
            state: SessionState::Disconnected,
            epoch: 0,
            seq: 0,
            viewport,
            layout,
            view: None,
            pending: None,
            notice: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Latest view; survives reconnects until a new snapshot replaces it
    pub fn view(&self) -> Option<Arc<ClientView>> {
        self.view.clone()
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Start a new session epoch. Returns the request for a fresh snapshot.
    pub fn connect(&mut self) -> WsMessage {
        self.epoch += 1;
        if let Some(pending) = self.pending.take() {
            log::info!("Dropping action {} from the previous connection", pending.request_id);
        }
        self.state = SessionState::Connecting;
        log::info!("🔌 Connecting (epoch {})", self.epoch);
        WsMessage::GetGameState
    }

    pub fn disconnected(&mut self) -> SyncEvent {
        if self.state == SessionState::Disconnected {
            return SyncEvent::Ignored;
        }
        self.pending = None;
        self.state = SessionState::Disconnected;
        self.set_notice(NoticeKind::Transport, "Connection lost");
        log::info!("Disconnected (epoch {})", self.epoch);
        SyncEvent::Disconnected
    }

    pub fn handle_frame(&mut self, text: &str) -> SyncEvent {
        match WsMessage::parse(text) {
            Ok(message) => self.handle_message(message),
            Err(e) => {
                log::warn!("Dropping unreadable frame: {}", e);
                self.set_notice(NoticeKind::Protocol, e.to_string());
                SyncEvent::ProtocolError(e)
            }
        }
    }

    pub fn handle_message(&mut self, message: WsMessage) -> SyncEvent {
        if let Some(reason) = message.rejection_reason() {
            return self.fail_pending(SessionError::Rejected { reason }, NoticeKind::Server);
        }

        match message {
            WsMessage::GameState { game }
            | WsMessage::GameUpdated { game }
            | WsMessage::GameCreated { game, .. } => self.apply_snapshot(*game),
            WsMessage::ActionResult { .. } => match self.pending.as_mut() {
                Some(pending) => {
                    pending.acknowledged = true;
                    log::debug!("Action {} accepted", pending.request_id);
                    SyncEvent::ActionAcknowledged {
                        request_id: pending.request_id,
                    }
                }
                None => SyncEvent::Ignored,
            },
            WsMessage::Error { message } => {
                if self.pending.is_some() {
                    self.fail_pending(SessionError::Rejected { reason: message }, NoticeKind::Server)
                } else {
                    log::warn!("Server error: {}", message);
                    self.set_notice(NoticeKind::Server, message.clone());
                    SyncEvent::ServerError { message }
                }
            }
            WsMessage::Greeting { message } => SyncEvent::Greeting { message },
            WsMessage::BotThinking { player_id } => {
                log::debug!("🤖 {} is thinking", player_id);
                SyncEvent::BotThinking { player_id }
            }
            WsMessage::PlayerAction { .. } | WsMessage::GetGameState => {
                log::debug!("Ignoring client-bound copy of an outgoing message");
                SyncEvent::Ignored
            }
        }
    }

    /// Replace the current view with one built from `snapshot`. Resolves any
    /// pending action.
    pub fn apply_snapshot(&mut self, snapshot: GameSnapshot) -> SyncEvent {
        if self.state == SessionState::Disconnected {
            log::debug!("Ignoring snapshot while disconnected");
            return SyncEvent::Ignored;
        }
        if let Some(pending) = self.pending.take() {
            log::debug!("Action {} resolved by snapshot", pending.request_id);
        }
        self.seq += 1;
        self.view = Some(Arc::new(ClientView::build(
            self.seq,
            Arc::new(snapshot),
            &self.viewport,
            &self.layout,
        )));
        if self.state == SessionState::Connecting {
            log::info!("Synced (epoch {})", self.epoch);
        }
        self.state = SessionState::Synced;
        SyncEvent::SnapshotApplied { seq: self.seq }
    }

    /// Rebuild the view for a new drawing area. The snapshot is unchanged.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some(view) = &self.view {
            self.view = Some(Arc::new(ClientView::build(
                view.seq,
                Arc::clone(&view.snapshot),
                &self.viewport,
                &self.layout,
            )));
        }
    }

    /// Resolve a click to its legal action and lock further dispatches until
    /// the server answers. Returns the frame to send.
    pub fn dispatch(&mut self, target: &ClickTarget) -> Result<(Uuid, WsMessage), SessionError> {
        match self.state {
            SessionState::Disconnected => return Err(SessionError::Disconnected),
            SessionState::Connecting => return Err(SessionError::NotSynced),
            SessionState::AwaitingAck => {
                if let Some(pending) = &self.pending {
                    return Err(SessionError::ActionInFlight {
                        request_id: pending.request_id,
                    });
                }
            }
            SessionState::Synced => {}
        }

        let view = self.view.as_ref().ok_or(SessionError::NotSynced)?;
        let entry = view
            .affordances
            .resolve(target)
            .ok_or(SessionError::NoAffordance { target: *target })?;

        let request_id = Uuid::new_v4();
        let wire = entry.wire.clone();
        log::info!("Dispatching {} at {} ({})", entry.action.tag(), target, request_id);
        self.pending = Some(PendingAction {
            request_id,
            epoch: self.epoch,
            target: *target,
            wire: wire.clone(),
            acknowledged: false,
        });
        self.state = SessionState::AwaitingAck;
        Ok((request_id, WsMessage::PlayerAction { action: wire }))
    }

    /// Deadline expiry for a dispatched action. `None` when the action has
    /// already been resolved or belongs to an earlier connection.
    pub fn on_timeout(&mut self, request_id: Uuid, epoch: u64) -> Option<SyncEvent> {
        match &self.pending {
            Some(pending) if pending.request_id == request_id && pending.epoch == epoch => {
                Some(self.fail_pending(SessionError::Timeout { request_id }, NoticeKind::Timeout))
            }
            _ => {
                log::debug!("Stale timeout for {} (epoch {})", request_id, epoch);
                None
            }
        }
    }

    pub fn on_send_failed(&mut self, request_id: Uuid, error: TransportError) -> SyncEvent {
        match &self.pending {
            Some(pending) if pending.request_id == request_id => {
                log::error!("Failed to send action {}: {}", request_id, error);
                self.fail_pending(SessionError::Disconnected, NoticeKind::Transport)
            }
            _ => SyncEvent::Ignored,
        }
    }

    /// Release the in-flight action without retrying it
    fn fail_pending(&mut self, error: SessionError, kind: NoticeKind) -> SyncEvent {
        self.set_notice(kind, error.to_string());
        let Some(pending) = self.pending.take() else {
            log::warn!("{}", error);
            return match error {
                SessionError::Rejected { reason } => SyncEvent::ServerError { message: reason },
                _ => SyncEvent::Ignored,
            };
        };
        log::warn!("Action {} failed: {}", pending.request_id, error);
        if self.state == SessionState::AwaitingAck {
            self.state = SessionState::Synced;
        }
        SyncEvent::ActionFailed {
            request_id: pending.request_id,
            error,
        }
    }

    fn set_notice(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notice = Some(Notice {
            kind,
            message: message.into(),
        });
    }
}

/// Drives a [`Synchronizer`] over a transport
pub struct SessionClient<T> {
    transport: T,
    sync: Synchronizer,
    action_timeout: Duration,
    deadline: Option<(Uuid, u64, Instant)>,
}

impl<T: Transport> SessionClient<T> {
    pub fn new(transport: T, config: &ClientConfig, viewport: Viewport) -> Self {
        Self {
            transport,
            sync: Synchronizer::new(viewport, config.layout.clone()),
            action_timeout: config.action_timeout,
            deadline: None,
        }
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    pub fn view(&self) -> Option<Arc<ClientView>> {
        self.sync.view()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.sync.set_viewport(viewport);
    }

    pub fn dismiss_notice(&mut self) {
        self.sync.dismiss_notice();
    }

    pub async fn connect(&mut self) -> ClientResult<()> {
        let request = self.sync.connect();
        self.deadline = None;
        let frame = request.to_frame()?;
        if let Err(e) = self.transport.send(frame).await {
            log::error!("Failed to request game state: {}", e);
            self.sync.disconnected();
            return Err(e.into());
        }
        Ok(())
    }

    /// Send the legal action under `target` and arm its deadline
    pub async fn dispatch(&mut self, target: &ClickTarget) -> ClientResult<Uuid> {
        let (request_id, message) = self.sync.dispatch(target)?;
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.sync.on_send_failed(request_id, TransportError::send_failed(e.to_string()));
                return Err(e.into());
            }
        };
        if let Err(e) = self.transport.send(frame).await {
            self.sync.on_send_failed(request_id, e.clone());
            return Err(e.into());
        }
        self.deadline = Some((
            request_id,
            self.sync.epoch(),
            Instant::now() + self.action_timeout,
        ));
        Ok(request_id)
    }

    /// Wait for the next frame or the pending deadline, whichever comes first
    pub async fn next_event(&mut self) -> SyncEvent {
        let deadline = self.deadline;
        let wake_at = deadline.map_or_else(Instant::now, |(_, _, at)| at);

        let event = tokio::select! {
            frame = self.transport.recv() => match frame {
                Some(Ok(text)) => self.sync.handle_frame(&text),
                Some(Err(e)) => {
                    log::error!("Transport failure: {}", e);
                    self.sync.disconnected()
                }
                None => self.sync.disconnected(),
            },
            _ = sleep_until(wake_at), if deadline.is_some() => {
                self.deadline = None;
                match deadline {
                    Some((request_id, epoch, _)) => self
                        .sync
                        .on_timeout(request_id, epoch)
                        .unwrap_or(SyncEvent::Ignored),
                    None => SyncEvent::Ignored,
                }
            }
        };

        if self.sync.pending().is_none() {
            self.deadline = None;
        }
        event
    }
}
