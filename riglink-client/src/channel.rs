//! Gateway WebSocket channels
//!
//! One task per channel (control, audio RX, audio TX), each owning its
//! socket and reconnecting independently with jittered exponential backoff.
//! Inbound traffic and connectivity changes flow to the session as
//! `ChannelEvent`s; outbound frames are queued through a `ChannelHandle`.
//!
//! Anything queued while a channel is down is discarded when it reconnects,
//! so a fresh connection never starts by replaying stale audio or commands.

use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use rand::RngExt;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use riglink_common::telemetry::{ChannelKind, ChannelState};

use crate::config::SessionConfig;
use crate::error::SessionError;

// =============================================================================
// Events and Frames
// =============================================================================

/// Traffic and connectivity notifications from a channel task
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Connectivity changed
    State { kind: ChannelKind, state: ChannelState },
    /// A text frame arrived (meaningful on the control channel)
    Line { kind: ChannelKind, text: String },
    /// A binary frame arrived (meaningful on the audio RX channel)
    Audio { kind: ChannelKind, payload: Vec<u8> },
    /// The channel gave up or was interrupted
    Failed { kind: ChannelKind, error: SessionError },
}

/// A frame queued for transmission on a channel
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

// =============================================================================
// Backoff
// =============================================================================

/// Reconnect timing policy
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first reconnect attempt
    pub initial: Duration,
    /// Ceiling the delay grows toward
    pub max: Duration,
    /// Growth factor per attempt
    pub multiplier: f64,
    /// Consecutive failures tolerated before giving up
    pub max_attempts: u32,
}

impl BackoffConfig {
    pub fn from_session(config: &SessionConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.reconnect_initial_ms),
            max: Duration::from_millis(config.reconnect_max_ms),
            multiplier: config.reconnect_multiplier,
            max_attempts: config.reconnect_max_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (1-based), without jitter
    fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let ms = self.initial.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(ms.min(self.max.as_millis() as f64) as u64)
    }

    /// Delay with +/-50% jitter so restarting fleets don't thunder in step
    fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt).as_millis() as f64;
        let factor = 0.5 + rand::rng().random::<f64>();
        Duration::from_millis((base * factor) as u64)
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Sender half of a channel task
///
/// Queued frames go out in order while the socket is open; frames queued
/// while it is down are dropped on reconnect.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    kind: ChannelKind,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl ChannelHandle {
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Queue a text frame
    pub fn send_text(&self, text: String) {
        let _ = self.outbound.send(OutboundFrame::Text(text));
    }

    /// Queue a binary frame
    pub fn send_binary(&self, payload: Vec<u8>) {
        let _ = self.outbound.send(OutboundFrame::Binary(payload));
    }
}

// Test-only methods
#[cfg(test)]
impl ChannelHandle {
    /// Build a handle around a bare queue, without a task (test-only)
    pub fn detached(kind: ChannelKind) -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        (Self { kind, outbound }, outbound_rx)
    }
}

/// Build the endpoint URL for one channel from the gateway base URL
fn endpoint_url(base_url: &str, kind: ChannelKind) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), kind.path())
}

/// Spawn a channel task and return its handle
///
/// The task runs until shutdown is signalled, the handle (and session) is
/// dropped, or reconnection is exhausted.
pub fn spawn_channel(
    kind: ChannelKind,
    base_url: &str,
    backoff: BackoffConfig,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
    shutdown_rx: watch::Receiver<bool>,
) -> ChannelHandle {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let url = endpoint_url(base_url, kind);

    tokio::spawn(run_channel(
        kind,
        url,
        backoff,
        event_tx,
        outbound_rx,
        shutdown_rx,
    ));

    ChannelHandle {
        kind,
        outbound: outbound_tx,
    }
}

// =============================================================================
// Channel Task
// =============================================================================

/// Why the inner connection loop ended
enum LoopExit {
    /// Socket dropped or errored; reconnect
    Interrupted(String),
    /// Shutdown signalled or handle dropped; stop for good
    Finished,
}

async fn run_channel(
    kind: ChannelKind,
    url: String,
    backoff: BackoffConfig,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            if attempt > backoff.max_attempts {
                warn!(channel = %kind, attempts = backoff.max_attempts, "reconnection exhausted");
                let _ = event_tx.send(ChannelEvent::Failed {
                    kind,
                    error: SessionError::ReconnectExhausted {
                        kind,
                        attempts: backoff.max_attempts,
                    },
                });
                return;
            }

            let delay = backoff.delay(attempt);
            debug!(channel = %kind, attempt, delay_ms = delay.as_millis() as u64, "reconnecting");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.changed() => {
                    let _ = event_tx.send(ChannelEvent::State { kind, state: ChannelState::Closed });
                    return;
                }
            }
        }

        let _ = event_tx.send(ChannelEvent::State {
            kind,
            state: ChannelState::Connecting,
        });

        let connect = tokio::select! {
            result = connect_async(&url) => result,
            _ = shutdown_rx.changed() => {
                let _ = event_tx.send(ChannelEvent::State { kind, state: ChannelState::Closed });
                return;
            }
        };

        let ws_stream = match connect {
            Ok((stream, _)) => stream,
            Err(e) => {
                warn!(channel = %kind, error = %e, "connection failed");
                let _ = event_tx.send(ChannelEvent::State {
                    kind,
                    state: ChannelState::Closed,
                });
                attempt += 1;
                continue;
            }
        };

        // Drop frames queued while disconnected; they are stale now
        let mut discarded = 0usize;
        while outbound_rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(channel = %kind, discarded, "dropped frames queued while disconnected");
        }

        attempt = 0;
        info!(channel = %kind, url = %url, "channel open");
        let _ = event_tx.send(ChannelEvent::State {
            kind,
            state: ChannelState::Open,
        });

        let exit = drive_connection(
            kind,
            ws_stream,
            &event_tx,
            &mut outbound_rx,
            &mut shutdown_rx,
        )
        .await;

        match exit {
            LoopExit::Finished => {
                let _ = event_tx.send(ChannelEvent::State {
                    kind,
                    state: ChannelState::Closed,
                });
                return;
            }
            LoopExit::Interrupted(reason) => {
                warn!(channel = %kind, reason = %reason, "channel interrupted");
                let _ = event_tx.send(ChannelEvent::State {
                    kind,
                    state: ChannelState::Closed,
                });
                let _ = event_tx.send(ChannelEvent::Failed {
                    kind,
                    error: SessionError::ChannelInterrupted { kind, reason },
                });
                attempt += 1;
            }
        }
    }
}

/// Pump one open socket until it drops, shutdown is signalled, or the
/// handle is gone
async fn drive_connection<S>(
    kind: ChannelKind,
    ws_stream: S,
    event_tx: &mpsc::UnboundedSender<ChannelEvent>,
    outbound_rx: &mut mpsc::UnboundedReceiver<OutboundFrame>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> LoopExit
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            message = read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let _ = event_tx.send(ChannelEvent::Line {
                            kind,
                            text: text.to_string(),
                        });
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let _ = event_tx.send(ChannelEvent::Audio {
                            kind,
                            payload: data.to_vec(),
                        });
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if write.send(Message::Pong(payload)).await.is_err() {
                            return LoopExit::Interrupted("failed to answer ping".to_string());
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return LoopExit::Interrupted("closed by gateway".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return LoopExit::Interrupted(format!("websocket error: {}", e));
                    }
                }
            }
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else {
                    // Handle dropped; close the socket and stop
                    let _ = write.send(Message::Close(None)).await;
                    return LoopExit::Finished;
                };
                let message = match frame {
                    OutboundFrame::Text(text) => Message::Text(text.into()),
                    OutboundFrame::Binary(payload) => Message::Binary(payload.into()),
                };
                if let Err(e) = write.send(message).await {
                    return LoopExit::Interrupted(format!("send failed: {}", e));
                }
            }
            _ = shutdown_rx.changed() => {
                let _ = event_tx.send(ChannelEvent::State {
                    kind,
                    state: ChannelState::Closing,
                });
                let _ = write.send(Message::Close(None)).await;
                return LoopExit::Finished;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
