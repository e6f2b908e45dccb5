//! Authenticated LanBox session over a byte channel.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};
use tracing::{error, info, warn};

use super::frame::{Frame, ResponseBuffer};
use super::io::{read_frame, write_frame};
use super::protocol::{encode, encode_password, hex};
use super::types::{AckMode, Command, ReplyKind, SessionState, TransportKind};
use crate::config::{ControllerConfig, SessionConfig};
use crate::error::{AppError, Result};

/// One logical connection to a controller.
///
/// Owns the channel exclusively. Writes are serialized by `&mut self`;
/// replies are only read in `WaitForAck` mode or through `receive`.
pub struct Session<C> {
    channel: C,
    transport: TransportKind,
    state: SessionState,
    ack_mode: AckMode,
    response_timeout: Duration,
    rx: ResponseBuffer,
}

impl<C> Session<C>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an open, connected channel. The session starts unauthenticated.
    pub fn new(channel: C, transport: TransportKind, config: &SessionConfig) -> Self {
        Self {
            channel,
            transport,
            state: SessionState::Unauthenticated,
            ack_mode: config.ack_mode,
            response_timeout: config.response_timeout(),
            rx: ResponseBuffer::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn ack_mode(&self) -> AckMode {
        self.ack_mode
    }

    /// Send the password frame.
    ///
    /// In fire-and-forget mode the session is Ready as soon as the write
    /// succeeds; the controller's verdict is never read. In wait-for-ack mode
    /// an acknowledgement frame must arrive first, and any failure closes
    /// the session.
    pub async fn authenticate(&mut self, password: &str) -> Result<()> {
        if self.state != SessionState::Unauthenticated {
            return Err(AppError::InvalidState(self.state));
        }
        let frame = encode_password(password)?;

        self.set_state(SessionState::Authenticating);
        if let Err(e) = write_frame(&mut self.channel, &frame).await {
            self.set_state(SessionState::Closed);
            return Err(e);
        }

        if self.ack_mode == AckMode::WaitForAck {
            if let Err(e) = read_frame(&mut self.channel, &mut self.rx, ReplyKind::Ack, self.response_timeout).await {
                error!("Authentication not acknowledged: {e}");
                self.set_state(SessionState::Closed);
                return Err(e);
            }
        }

        self.set_state(SessionState::Ready);
        Ok(())
    }

    /// Encode and send one command.
    ///
    /// Returns `None` in fire-and-forget mode, or the reply frame in
    /// wait-for-ack mode. Invalid parameters are rejected before any I/O.
    pub async fn send(&mut self, command: &Command) -> Result<Option<Frame>> {
        if self.state != SessionState::Ready {
            return Err(AppError::InvalidState(self.state));
        }
        let frame = encode(command)?;

        info!("Sending {}", command.name());
        if let Err(e) = write_frame(&mut self.channel, &frame).await {
            self.set_state(SessionState::Closed);
            return Err(e);
        }

        match self.ack_mode {
            AckMode::FireAndForget => Ok(None),
            AckMode::WaitForAck => self.receive_reply(command).await.map(Some),
        }
    }

    /// Read the reply to `command`, skipping late replies that echo another
    /// opcode. Bare acks carry no echo and are accepted as-is.
    async fn receive_reply(&mut self, command: &Command) -> Result<Frame> {
        let expected = &command.opcode()[1..];
        let deadline = Instant::now() + self.response_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let frame = self.receive_within(command.reply_kind(), remaining).await?;
            match frame.opcode() {
                Some(echo) if echo != expected => {
                    warn!(
                        "Dropping stale reply {} while waiting for {}",
                        hex(frame.as_bytes()),
                        command.name()
                    );
                }
                _ => return Ok(frame),
            }
        }
    }

    /// Read the next reply frame of the given shape.
    ///
    /// A frame error leaves the session Ready with the bad bytes dropped;
    /// a timeout leaves it Ready as well. Channel failures close it.
    pub async fn receive(&mut self, kind: ReplyKind) -> Result<Frame> {
        self.receive_within(kind, self.response_timeout).await
    }

    async fn receive_within(&mut self, kind: ReplyKind, limit: Duration) -> Result<Frame> {
        if self.state != SessionState::Ready {
            return Err(AppError::InvalidState(self.state));
        }
        match read_frame(&mut self.channel, &mut self.rx, kind, limit).await {
            Ok(frame) => Ok(frame),
            Err(e @ AppError::Io(_)) => {
                self.set_state(SessionState::Closed);
                Err(e)
            }
            Err(e) => {
                warn!("Reply not usable: {e}");
                Err(e)
            }
        }
    }

    /// Shut the channel down. Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.set_state(SessionState::Closed);
        self.rx.clear();
        self.channel.shutdown().await?;
        Ok(())
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            info!("{} session: {} -> {}", self.transport, self.state, state);
            self.state = state;
        }
    }
}

impl Session<TcpStream> {
    /// Open a TCP channel to the controller, bounded by the connect timeout.
    ///
    /// Other transport kinds need a caller-supplied channel passed to `Session::new`.
    pub async fn connect_tcp(controller: &ControllerConfig, config: &SessionConfig) -> Result<Self> {
        if controller.transport != TransportKind::Tcp {
            return Err(AppError::UnsupportedTransport(controller.transport));
        }
        let addr = controller.tcp_addr();
        let connect_timeout = config.connect_timeout();

        info!(
            "Connecting '{}' to {} (timeout={:?})",
            controller.connection_name, addr, connect_timeout
        );

        let stream = timeout(connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                error!("Connection timeout to {addr}");
                AppError::ConnectionFailed(format!("Connection timeout to {addr}"))
            })?
            .map_err(|e| {
                error!("Failed to connect to {addr}: {e}");
                AppError::ConnectionFailed(format!("Failed to connect to {addr}: {e}"))
            })?;

        Ok(Session::new(stream, TransportKind::Tcp, config))
    }
}
