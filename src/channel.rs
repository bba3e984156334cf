// src/channel.rs - Request/reply command channel over a byte stream
use crate::protocol::{Command, Protocol};
use crate::trajectory::Position;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;

/// Failures on the controller link. None of these are retried here: after
/// any of them the byte stream may be out of step and the caller decides
/// whether to re-handshake.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("expected reply token '{expected}', got '{reply}'")]
    ProtocolMismatch { expected: String, reply: String },
    #[error("expected {expected} items in reply, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("reply payload is not a list of integers: '{reply}'")]
    MalformedReply { reply: String },
    #[error("no reply within {0:?}")]
    TransportTimeout(Duration),
    #[error("connection closed by controller")]
    Closed,
    #[error("no greeting after {attempts} handshake attempts")]
    HandshakeFailed { attempts: u32 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters for traffic on one channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandStats {
    pub commands_sent: u64,
    pub replies_accepted: u64,
    pub replies_rejected: u64,
    pub timeouts: u64,
    pub handshake_attempts: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Sends one command at a time and waits for its single-line reply.
pub struct CommandChannel<S> {
    stream: BufReader<S>,
    protocol: Protocol,
    reply_timeout: Option<Duration>,
    stats: CommandStats,
}

impl<S> CommandChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// `reply_timeout` of `None` waits for replies indefinitely.
    pub fn new(stream: S, protocol: Protocol, reply_timeout: Option<Duration>) -> Self {
        Self {
            stream: BufReader::new(stream),
            protocol,
            reply_timeout,
            stats: CommandStats::default(),
        }
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn stats(&self) -> &CommandStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CommandStats::default();
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    /// Handshake with the controller. Repeats HELLO until the greeting is
    /// echoed back exactly; silence and unexpected replies count as failed
    /// attempts. Returns the number of failed attempts.
    pub async fn hello(&mut self) -> Result<u32, ChannelError> {
        let limit = self.protocol.handshake_attempts;
        let mut failed = 0u32;
        loop {
            if limit > 0 && failed >= limit {
                tracing::error!("Controller did not answer {} handshake attempts", failed);
                return Err(ChannelError::HandshakeFailed { attempts: failed });
            }
            self.stats.handshake_attempts += 1;
            self.write_command(Command::Hello, None).await?;
            match self.read_reply().await {
                Ok(reply) if self.protocol.is_greeting(&reply) => {
                    tracing::info!("Controller handshake complete after {} failed attempts", failed);
                    return Ok(failed);
                }
                Ok(reply) => {
                    tracing::debug!("Unexpected handshake reply: {:?}", reply);
                }
                Err(ChannelError::TransportTimeout(waited)) => {
                    tracing::debug!("No handshake reply within {:?}", waited);
                }
                Err(e) => return Err(e),
            }
            failed += 1;
        }
    }

    /// Read current servo positions.
    pub async fn query(&mut self, servo_count: usize) -> Result<Position, ChannelError> {
        self.request(Command::Query, None, servo_count).await
    }

    /// Send goal positions and return the state the controller echoes.
    pub async fn position(&mut self, goal: &[i32]) -> Result<Position, ChannelError> {
        self.request(Command::Position, Some(goal), goal.len()).await
    }

    async fn request(
        &mut self,
        command: Command,
        args: Option<&[i32]>,
        expected: usize,
    ) -> Result<Position, ChannelError> {
        self.write_command(command, args).await?;
        let reply = self.read_reply().await?;
        match self.protocol.decode(command, &reply, expected) {
            Ok(items) => {
                self.stats.replies_accepted += 1;
                Ok(items)
            }
            Err(e) => {
                self.stats.replies_rejected += 1;
                tracing::error!("Rejected reply to {:?}: {}", command, e);
                Err(e)
            }
        }
    }

    async fn write_command(&mut self, command: Command, args: Option<&[i32]>) -> Result<(), ChannelError> {
        let frame = self.protocol.encode(command, args);
        tracing::trace!("Serial TX: {}", frame.trim_end());
        self.stream.write_all(frame.as_bytes()).await?;
        self.stream.flush().await?;
        self.stats.commands_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;
        Ok(())
    }

    // A timed-out read may leave a partial line behind; the stream counts
    // as desynchronized after any error.
    async fn read_reply(&mut self) -> Result<String, ChannelError> {
        let mut line = String::new();
        let read = match self.reply_timeout {
            Some(limit) => match timeout(limit, self.stream.read_line(&mut line)).await {
                Ok(read) => read?,
                Err(_) => {
                    self.stats.timeouts += 1;
                    tracing::warn!("Timeout after {:?} waiting for reply", limit);
                    return Err(ChannelError::TransportTimeout(limit));
                }
            },
            None => self.stream.read_line(&mut line).await?,
        };
        if read == 0 {
            tracing::info!("Serial connection closed by remote");
            return Err(ChannelError::Closed);
        }
        self.stats.bytes_received += read as u64;
        tracing::trace!("Serial RX: {}", line.trim_end());
        Ok(line)
    }
}

impl<S> std::fmt::Debug for CommandChannel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandChannel")
            .field("protocol", &self.protocol)
            .field("reply_timeout", &self.reply_timeout)
            .field("stats", &self.stats)
            .finish()
    }
}
