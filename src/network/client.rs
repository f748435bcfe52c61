use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::common::{ClientCommand, ClientEvent, ConnectionStatus, MessageType, OnlineUser};
use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError};
use crate::state::{PresenceTracker, TypingTracker};

use super::protocol::{
    self, DISCONNECT_FRAME, Handshake, InboundEvent, OutboundEvent, PONG_FRAME, Packet,
};
use super::transport::{Connector, Transport};

const TYPING_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
const MAX_KEEPALIVE: Duration = Duration::from_secs(24 * 60 * 60);

/// Cheap, cloneable front door to a running realtime session.
///
/// Every method is a no-op once the session has ended, and outbound events
/// are dropped by the session while it is not connected.
#[derive(Debug, Clone)]
pub struct RealtimeHandle {
    command_sender: mpsc::Sender<ClientCommand>,
    status: watch::Receiver<ConnectionStatus>,
    presence: watch::Receiver<Vec<OnlineUser>>,
}

impl RealtimeHandle {
    pub async fn send_message(
        &self,
        receiver_id: impl Into<String>,
        message: impl Into<String>,
        message_type: MessageType,
    ) {
        self.send(ClientCommand::SendMessage {
            receiver_id: receiver_id.into(),
            message: message.into(),
            message_type,
        })
        .await;
    }

    pub async fn join_conversation(&self, conversation_id: impl Into<String>) {
        self.send(ClientCommand::JoinConversation(conversation_id.into()))
            .await;
    }

    pub async fn leave_conversation(&self, conversation_id: impl Into<String>) {
        self.send(ClientCommand::LeaveConversation(conversation_id.into()))
            .await;
    }

    pub async fn mark_messages_read(&self, conversation_id: impl Into<String>) {
        self.send(ClientCommand::MarkMessagesRead(conversation_id.into()))
            .await;
    }

    pub async fn start_typing(&self, conversation_id: impl Into<String>) {
        self.send(ClientCommand::TypingStart(conversation_id.into()))
            .await;
    }

    pub async fn stop_typing(&self, conversation_id: impl Into<String>) {
        self.send(ClientCommand::TypingStop(conversation_id.into()))
            .await;
    }

    pub async fn request_online_users(&self) {
        self.send(ClientCommand::GetOnlineUsers).await;
    }

    /// Client-initiated disconnect; cancels any pending reconnect.
    pub async fn disconnect(&self) {
        self.send(ClientCommand::Disconnect).await;
    }

    /// Non-blocking variant for callers outside an async context.
    pub fn try_command(&self, command: ClientCommand) {
        if let Err(err) = self.command_sender.try_send(command) {
            log::debug!("Realtime command not queued: {err}");
        }
    }

    async fn send(&self, command: ClientCommand) {
        if let Err(err) = self.command_sender.send(command).await {
            log::debug!("Realtime session ended; dropping {:?}", err.0);
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Resolves once the status satisfies `predicate`, or `None` if the
    /// session ended first without ever matching.
    pub async fn wait_for_status(
        &self,
        mut predicate: impl FnMut(ConnectionStatus) -> bool,
    ) -> Option<ConnectionStatus> {
        let mut status = self.status.clone();
        status
            .wait_for(|current| predicate(*current))
            .await
            .ok()
            .map(|current| *current)
    }

    pub fn online_users(&self) -> Vec<OnlineUser> {
        self.presence.borrow().clone()
    }
}

enum SessionEnd {
    ClientClosed,
    Lost(String),
}

struct Established<T> {
    transport: T,
    handshake: Handshake,
}

/// One logical realtime session: owns the transport, the reconnect budget,
/// presence and typing state for its whole lifetime.
pub struct RealtimeClient<C: Connector> {
    config: ClientConfig,
    connector: C,
    session_id: Uuid,
    event_sender: mpsc::UnboundedSender<ClientEvent>,
    command_receiver: mpsc::Receiver<ClientCommand>,
    status: watch::Sender<ConnectionStatus>,
    presence_updates: watch::Sender<Vec<OnlineUser>>,
    presence: PresenceTracker,
    typing: TypingTracker,
    joined: BTreeSet<String>,
    reconnect_attempts: u32,
}

impl<C: Connector> RealtimeClient<C> {
    /// Starts the session task. Must be called inside a tokio runtime.
    pub fn spawn(config: ClientConfig, connector: C) -> (RealtimeHandle, mpsc::Receiver<ClientEvent>) {
        let capacity = config.channel_capacity.max(1);
        let (command_sender, command_receiver) = mpsc::channel(capacity);
        let (event_sender, event_receiver) = mpsc::channel(capacity);
        let (forward_sender, forward_receiver) = mpsc::unbounded_channel();
        let (status, status_receiver) = watch::channel(ConnectionStatus::Disconnected);
        let (presence_updates, presence_receiver) = watch::channel(Vec::new());

        let client = Self {
            typing: TypingTracker::new(config.typing_timeout),
            config,
            connector,
            session_id: Uuid::new_v4(),
            event_sender: forward_sender,
            command_receiver,
            status,
            presence_updates,
            presence: PresenceTracker::new(),
            joined: BTreeSet::new(),
            reconnect_attempts: 0,
        };
        tokio::spawn(forward_events(forward_receiver, event_sender));
        tokio::spawn(client.run());

        let handle = RealtimeHandle {
            command_sender,
            status: status_receiver,
            presence: presence_receiver,
        };
        (handle, event_receiver)
    }

    async fn run(mut self) {
        let Some(token) = self.config.token.clone() else {
            log::warn!("{}; realtime connection not attempted", ClientError::MissingToken);
            self.set_status(ConnectionStatus::Disconnected);
            return;
        };
        let url = match protocol::engine_io_url(&self.config.server_url) {
            Ok(url) => url.to_string(),
            Err(err) => {
                log::error!("Realtime connection not attempted: {err}");
                self.set_status(ConnectionStatus::Disconnected);
                return;
            }
        };
        log::info!("Realtime session {} starting against {url}", self.session_id);

        loop {
            self.set_status(ConnectionStatus::Connecting);
            let attempt = establish(
                &self.connector,
                &url,
                &token,
                self.config.connect_timeout,
            );
            let Some(result) = unless_closed(&mut self.command_receiver, attempt).await else {
                break;
            };

            match result {
                Ok(Established {
                    transport,
                    handshake,
                }) => {
                    self.set_status(ConnectionStatus::Connected);
                    let connected_at = Instant::now();
                    let end = self.serve(transport, handshake).await;
                    self.typing.clear();
                    if connected_at.elapsed() >= self.config.stable_connection {
                        self.reconnect_attempts = 0;
                    }
                    match end {
                        SessionEnd::ClientClosed => break,
                        SessionEnd::Lost(reason) => {
                            log::warn!("Realtime connection lost: {reason}");
                        }
                    }
                }
                Err(err) => log::warn!("Realtime connection failed: {err}"),
            }

            self.set_status(ConnectionStatus::Disconnected);

            self.reconnect_attempts += 1;
            if self.reconnect_attempts > self.config.max_reconnect_attempts {
                log::error!(
                    "Giving up after {} reconnect attempts",
                    self.config.max_reconnect_attempts
                );
                self.set_status(ConnectionStatus::GaveUp);
                return;
            }

            let delay = self.config.reconnect_delay(self.reconnect_attempts);
            log::info!(
                "Reconnect attempt {}/{} in {delay:?}",
                self.reconnect_attempts,
                self.config.max_reconnect_attempts
            );
            self.emit(ClientEvent::ReconnectScheduled {
                attempt: self.reconnect_attempts,
                delay,
            });

            let wait = tokio::time::sleep(delay);
            if unless_closed(&mut self.command_receiver, wait).await.is_none() {
                log::info!("Pending reconnect cancelled by client");
                break;
            }
        }

        self.set_status(ConnectionStatus::Disconnected);
        log::info!("Realtime session {} closed", self.session_id);
    }

    async fn serve(&mut self, mut transport: C::Transport, handshake: Handshake) -> SessionEnd {
        log::info!(
            "Realtime session {} connected (sid {})",
            self.session_id,
            handshake.sid
        );
        let keepalive = handshake.keepalive().min(MAX_KEEPALIVE);
        let mut last_heard = Instant::now();
        let mut typing_sweep = tokio::time::interval(TYPING_SWEEP_INTERVAL);
        typing_sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let rejoin = self.joined.iter().cloned().map(OutboundEvent::JoinConversation);
        let greeting: Vec<OutboundEvent> = std::iter::once(OutboundEvent::GetOnlineUsers)
            .chain(rejoin)
            .collect();
        for event in greeting {
            if let Err(err) = transport.send_text(event.encode()).await {
                return SessionEnd::Lost(format!("failed to send {}: {err}", event.name()));
            }
        }

        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(ClientCommand::Disconnect) | None => {
                            if let Err(err) = transport.send_text(DISCONNECT_FRAME.to_string()).await {
                                log::debug!("Disconnect frame not delivered: {err}");
                            }
                            transport.close().await;
                            return SessionEnd::ClientClosed;
                        }
                        Some(command) => {
                            if let Err(err) = self.handle_command(command, &mut transport).await {
                                return SessionEnd::Lost(format!("send failed: {err}"));
                            }
                        }
                    }
                }
                frame = transport.next_text() => {
                    last_heard = Instant::now();
                    match frame {
                        Some(Ok(frame)) => match protocol::decode(&frame) {
                            Ok(packet) => {
                                if let Some(end) = self.handle_packet(packet, &mut transport).await {
                                    transport.close().await;
                                    return end;
                                }
                            }
                            Err(err) => log::warn!("Dropping undecodable frame: {err}"),
                        },
                        Some(Err(err)) => return SessionEnd::Lost(format!("transport error: {err}")),
                        None => return SessionEnd::Lost("transport closed".to_string()),
                    }
                }
                _ = tokio::time::sleep_until(last_heard + keepalive) => {
                    transport.close().await;
                    return SessionEnd::Lost("ping timeout".to_string());
                }
                now = typing_sweep.tick() => self.expire_typing(now),
            }
        }
    }

    async fn handle_command(
        &mut self,
        command: ClientCommand,
        transport: &mut C::Transport,
    ) -> Result<(), TransportError> {
        match &command {
            ClientCommand::JoinConversation(id) => {
                self.joined.insert(id.clone());
            }
            ClientCommand::LeaveConversation(id) => {
                self.joined.remove(id);
            }
            _ => {}
        }

        let Some(event) = OutboundEvent::from_command(command) else {
            return Ok(());
        };
        log::debug!("Emitting {}", event.name());
        transport.send_text(event.encode()).await
    }

    async fn handle_packet(
        &mut self,
        packet: Packet,
        transport: &mut C::Transport,
    ) -> Option<SessionEnd> {
        match packet {
            Packet::Ping => {
                if let Err(err) = transport.send_text(PONG_FRAME.to_string()).await {
                    return Some(SessionEnd::Lost(format!("pong failed: {err}")));
                }
            }
            Packet::Pong | Packet::Noop | Packet::Connect(_) => {}
            Packet::Open(_) => log::debug!("Ignoring repeated open packet"),
            Packet::Close => {
                return Some(SessionEnd::Lost("server closed the session".to_string()));
            }
            Packet::Disconnect => return Some(SessionEnd::Lost("io server disconnect".to_string())),
            Packet::ConnectError(reason) => {
                return Some(SessionEnd::Lost(format!("server rejected session: {reason}")));
            }
            Packet::Event(event) => self.handle_event(event),
        }
        None
    }

    fn handle_event(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::OnlineUsers(users) => {
                self.presence.replace_all(users);
                self.publish_presence();
                self.emit(ClientEvent::OnlineUsers(self.presence.users().to_vec()));
            }
            InboundEvent::UserOnline(user) => {
                log::debug!("User {} online", user.user_id);
                self.presence.upsert(user.clone());
                self.publish_presence();
                self.emit(ClientEvent::UserOnline(user));
            }
            InboundEvent::UserOffline(user) => {
                log::debug!("User {} offline", user.user_id);
                self.presence.remove(&user.user_id);
                self.publish_presence();
                self.emit(ClientEvent::UserOffline(user));
            }
            InboundEvent::NewMessage(message) => {
                // a delivered message ends the sender's typing run
                if self.typing.stop(&message.conversation_id, &message.sender_id) {
                    self.emit(ClientEvent::TypingStopped {
                        conversation_id: message.conversation_id.clone(),
                        user_id: message.sender_id.clone(),
                    });
                }
                self.emit(ClientEvent::MessageReceived(message));
            }
            InboundEvent::MessageNotification(payload) => {
                self.emit(ClientEvent::Notification(payload));
            }
            InboundEvent::UserTyping(notice) => {
                if self.typing.start(&notice.conversation_id, &notice.user_id) {
                    self.emit(ClientEvent::TypingStarted {
                        conversation_id: notice.conversation_id,
                        user_id: notice.user_id,
                        username: notice.username,
                    });
                }
            }
            InboundEvent::UserStoppedTyping(notice) => {
                if self.typing.stop(&notice.conversation_id, &notice.user_id) {
                    self.emit(ClientEvent::TypingStopped {
                        conversation_id: notice.conversation_id,
                        user_id: notice.user_id,
                    });
                }
            }
            InboundEvent::MessagesRead(receipt) => {
                self.emit(ClientEvent::MessagesRead(receipt));
            }
            InboundEvent::Error(payload) => {
                log::warn!("Server reported error: {payload}");
                self.emit(ClientEvent::ServerError(payload));
            }
            InboundEvent::Unknown { name } => log::debug!("Ignoring unknown event `{name}`"),
        }
    }

    fn expire_typing(&mut self, now: Instant) {
        for (conversation_id, user_id) in self.typing.expire(now) {
            self.emit(ClientEvent::TypingStopped {
                conversation_id,
                user_id,
            });
        }
    }

    fn publish_presence(&self) {
        self.presence_updates
            .send_replace(self.presence.users().to_vec());
    }

    fn set_status(&self, status: ConnectionStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            log::info!("Realtime status: {previous} -> {status}");
            self.emit(ClientEvent::StatusChanged(status));
        }
    }

    fn emit(&self, event: ClientEvent) {
        if self.event_sender.send(event).is_err() {
            log::debug!("Event receiver dropped; realtime event discarded");
        }
    }
}

/// Moves session events to the caller's bounded channel so a slow reader
/// never stalls the session loop.
async fn forward_events(
    mut events: mpsc::UnboundedReceiver<ClientEvent>,
    caller: mpsc::Sender<ClientEvent>,
) {
    while let Some(event) = events.recv().await {
        if caller.send(event).await.is_err() {
            log::debug!("Event receiver dropped; stopping event forwarding");
            return;
        }
    }
}

/// Drives `future` while draining commands that arrive in the meantime.
///
/// Returns `None` if the caller asked to disconnect (or dropped every handle)
/// before `future` finished.
async fn unless_closed<F: Future>(
    commands: &mut mpsc::Receiver<ClientCommand>,
    future: F,
) -> Option<F::Output> {
    tokio::pin!(future);
    loop {
        tokio::select! {
            output = &mut future => return Some(output),
            command = commands.recv() => match command {
                Some(ClientCommand::Disconnect) | None => return None,
                Some(command) => log::debug!("Not connected; dropping {command:?}"),
            },
        }
    }
}

async fn establish<C: Connector>(
    connector: &C,
    url: &str,
    token: &str,
    connect_timeout: Duration,
) -> Result<Established<C::Transport>, ClientError> {
    match tokio::time::timeout(connect_timeout, handshake(connector, url, token)).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout("connection handshake")),
    }
}

async fn handshake<C: Connector>(
    connector: &C,
    url: &str,
    token: &str,
) -> Result<Established<C::Transport>, ClientError> {
    let mut transport = connector.connect(url).await?;

    let handshake = loop {
        match next_packet(&mut transport).await? {
            Packet::Open(handshake) => break handshake,
            Packet::Noop => continue,
            other => {
                transport.close().await;
                return Err(ClientError::Handshake(format!(
                    "expected open packet, got {other:?}"
                )));
            }
        }
    };

    transport.send_text(protocol::encode_connect(token)).await?;

    loop {
        match next_packet(&mut transport).await? {
            Packet::Connect(_) => {
                return Ok(Established {
                    transport,
                    handshake,
                });
            }
            Packet::ConnectError(reason) => {
                transport.close().await;
                return Err(ClientError::Rejected(reason));
            }
            Packet::Ping => transport.send_text(PONG_FRAME.to_string()).await?,
            Packet::Close | Packet::Disconnect => {
                return Err(ClientError::Handshake(
                    "server closed before acknowledging connect".to_string(),
                ));
            }
            other => log::debug!("Ignoring {other:?} before connect ack"),
        }
    }
}

async fn next_packet<T: Transport>(transport: &mut T) -> Result<Packet, ClientError> {
    match transport.next_text().await {
        Some(Ok(frame)) => Ok(protocol::decode(&frame)?),
        Some(Err(err)) => Err(err.into()),
        None => Err(TransportError::Closed.into()),
    }
}
