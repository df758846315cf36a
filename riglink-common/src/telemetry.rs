//! Telemetry export types
//!
//! Shared read-only types the engine publishes to observability and UI
//! collaborators: PTT phase, channel identity/connectivity, and the
//! once-per-second telemetry snapshot. Everything here serializes to JSON
//! so an embedding application can forward it unchanged.

use serde::{Deserialize, Serialize};

// =============================================================================
// PTT Phase
// =============================================================================

/// Externally visible PTT phase, derived from intent and confirmation.
///
/// `Requested` phases mean local intent has changed but the device has not
/// yet confirmed; a UI should show these as pending rather than failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PttPhase {
    /// No transmission yet this session and none requested
    Idle,
    /// Operator holds transmit; device confirmation pending
    TransmitRequested,
    /// Device confirmed the transmitter is keyed
    TransmitConfirmed,
    /// Operator released transmit; device confirmation pending
    ReceiveRequested,
    /// Device confirmed the transmitter is unkeyed
    ReceiveConfirmed,
}

impl PttPhase {
    /// Whether the local operator currently intends to transmit
    pub fn is_transmit(self) -> bool {
        matches!(self, PttPhase::TransmitRequested | PttPhase::TransmitConfirmed)
    }

    /// Whether the device has confirmed the current intent
    pub fn is_confirmed(self) -> bool {
        matches!(
            self,
            PttPhase::Idle | PttPhase::TransmitConfirmed | PttPhase::ReceiveConfirmed
        )
    }
}

// =============================================================================
// Channels
// =============================================================================

/// The three logical channels between engine and gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Text command/status channel
    Control,
    /// Binary PCM frames, gateway to engine
    AudioRx,
    /// Binary PCM frames, engine to gateway
    AudioTx,
}

impl ChannelKind {
    /// All channel kinds, in open order
    pub const ALL: [ChannelKind; 3] =
        [ChannelKind::Control, ChannelKind::AudioRx, ChannelKind::AudioTx];

    /// Gateway WebSocket path for this channel
    pub fn path(self) -> &'static str {
        match self {
            ChannelKind::Control => crate::CONTROL_PATH,
            ChannelKind::AudioRx => crate::AUDIO_RX_PATH,
            ChannelKind::AudioTx => crate::AUDIO_TX_PATH,
        }
    }

    /// Short name for logs
    pub fn label(self) -> &'static str {
        match self {
            ChannelKind::Control => "control",
            ChannelKind::AudioRx => "audio-rx",
            ChannelKind::AudioTx => "audio-tx",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Connectivity state of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelState {
    /// Dial or reconnect in progress
    Connecting,
    /// Connected and passing traffic
    Open,
    /// Orderly shutdown in progress
    Closing,
    /// Not connected
    #[default]
    Closed,
}

impl ChannelState {
    /// Whether the channel can carry traffic right now
    pub fn is_open(self) -> bool {
        matches!(self, ChannelState::Open)
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time view of the engine, published once per second.
///
/// Bitrates cover the last completed one-second window. `ping_rtt_ms` is
/// the most recent control-channel round trip, absent until the first pong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Receive bitrate in bits per second
    pub rx_bps: u64,
    /// Transmit bitrate in bits per second
    pub tx_bps: u64,
    /// Frames currently queued for playback
    pub buffer_depth: usize,
    /// Playback frames evicted by overflow since session start
    pub frames_dropped: u64,
    /// Current PTT phase
    pub ptt_phase: PttPhase,
    /// Control channel connectivity
    pub control: ChannelState,
    /// Audio RX channel connectivity
    pub audio_rx: ChannelState,
    /// Audio TX channel connectivity
    pub audio_tx: ChannelState,
    /// Last measured control round trip in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_rtt_ms: Option<u64>,
}

// =============================================================================
// Tests
// =============================================================================
