//! Session orchestration
//!
//! Drives one operator session end to end: opens the three gateway
//! channels, announces the sample rate, moves audio between the devices
//! and the wire, keeps PTT intent and device state converged, and
//! publishes a telemetry snapshot once per second.
//!
//! The session runs on a dedicated thread with its own runtime because
//! cpal streams are not Send. Callers interact through [`SessionHandle`]
//! and the event receiver it returns.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use riglink_common::control::{ControlCommand, ControlStatus};
use riglink_common::frame::{AudioFrame, BYTES_PER_SAMPLE, samples_per_frame};
use riglink_common::telemetry::{ChannelKind, ChannelState, PttPhase, TelemetrySnapshot};
use riglink_common::validators::{
    FrequencyError, ModeError, validate_frequency, validate_mode,
};

use crate::audio::{AudioCapture, AudioPlayback};
use crate::channel::{BackoffConfig, ChannelEvent, ChannelHandle, spawn_channel};
use crate::codec::{FrameCodec, PcmCodec};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::jitter::JitterBuffer;
use crate::ptt::PttSync;
use crate::telemetry::BitrateCounter;

// =============================================================================
// Constants
// =============================================================================

/// Interval for moving audio between devices and channels (one frame time)
const PIPELINE_INTERVAL_MS: u64 = 10;

/// Interval between telemetry snapshots
const TELEMETRY_INTERVAL_SECS: u64 = 1;

// =============================================================================
// Session Events
// =============================================================================

/// Events emitted by a running session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// PTT phase changed
    Ptt(PttPhase),
    /// Gateway reported the dial frequency in hertz
    FrequencyReported(u64),
    /// Gateway reported the operating mode
    ModeReported(String),
    /// Gateway reported received signal strength
    SignalReported(f32),
    /// Gateway confirmed the negotiated sample rate
    RateConfirmed(u32),
    /// A channel changed connectivity
    Channel { kind: ChannelKind, state: ChannelState },
    /// Once-per-second status snapshot
    Telemetry(TelemetrySnapshot),
    /// The session ended with an unrecoverable error
    Fatal(SessionError),
}

/// Commands to control a running session
#[derive(Debug)]
pub enum SessionCommand {
    /// Key or unkey the transmitter
    SetPtt(bool),
    /// Tune to the given frequency in hertz
    SetFrequency(u64),
    /// Ask the gateway to report the current frequency
    GetFrequency,
    /// Switch the operating mode
    SetMode(String),
    /// End the session
    Shutdown,
}

// =============================================================================
// Channel State Tracking
// =============================================================================

/// Last known connectivity of each gateway channel
#[derive(Debug, Clone, Copy, Default)]
struct ChannelStates {
    control: ChannelState,
    audio_rx: ChannelState,
    audio_tx: ChannelState,
}

impl ChannelStates {
    fn get(&self, kind: ChannelKind) -> ChannelState {
        match kind {
            ChannelKind::Control => self.control,
            ChannelKind::AudioRx => self.audio_rx,
            ChannelKind::AudioTx => self.audio_tx,
        }
    }

    fn set(&mut self, kind: ChannelKind, state: ChannelState) {
        match kind {
            ChannelKind::Control => self.control = state,
            ChannelKind::AudioRx => self.audio_rx = state,
            ChannelKind::AudioTx => self.audio_tx = state,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Send a control command if the control channel is up, else drop it
///
/// Dropped PTT commands are retried by the sync machine on its response
/// timeout, so losing one here is not a stuck key.
fn send_control(control: &ChannelHandle, states: &ChannelStates, command: ControlCommand) {
    let wire = command.to_wire();
    if states.get(ChannelKind::Control).is_open() {
        control.send_text(wire);
    } else {
        debug!(command = %wire, "control channel down, dropping command");
    }
}

/// Encode and send one audio frame if the channel is up
fn send_frame(
    channel: &ChannelHandle,
    states: &ChannelStates,
    codec: &mut dyn FrameCodec,
    frame: &AudioFrame,
) {
    if states.get(channel.kind()).is_open() {
        channel.send_binary(codec.encode(frame));
    }
}

/// Send the transmit warm-up: silence frames that keep the gateway's
/// decode path fed while the capture device spins up
///
/// # Returns
///
/// The sequence number for the next transmit frame.
fn send_warmup(
    channel: &ChannelHandle,
    states: &ChannelStates,
    codec: &mut dyn FrameCodec,
    frame_samples: usize,
    warmup_frames: usize,
    mut tx_sequence: u32,
) -> u32 {
    for _ in 0..warmup_frames {
        let frame = AudioFrame::silence(frame_samples, tx_sequence);
        tx_sequence = tx_sequence.wrapping_add(1);
        send_frame(channel, states, codec, &frame);
    }
    tx_sequence
}

/// Emit a PTT phase event when the phase actually changed
fn emit_phase(
    event_tx: &mpsc::UnboundedSender<SessionEvent>,
    last_phase: &mut PttPhase,
    ptt: &PttSync,
) {
    let phase = ptt.phase();
    if phase != *last_phase {
        *last_phase = phase;
        let _ = event_tx.send(SessionEvent::Ptt(phase));
    }
}

// =============================================================================
// Session Runner
// =============================================================================

/// Run one session to completion
///
/// Returns when shutdown is commanded, the command sender is dropped, or
/// an unrecoverable error is hit (which is reported as `Fatal` first).
async fn run_session(
    config: SessionConfig,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
) {
    let sample_rate = config.sample_rate;
    let frame_samples = samples_per_frame(sample_rate);

    // Playback path: jitter buffer shared with the device callback
    let playback_buffer = Arc::new(Mutex::new(JitterBuffer::new(
        config.min_frames,
        config.max_frames,
    )));

    let playback = match AudioPlayback::new(
        &config.output_device,
        sample_rate,
        playback_buffer.clone(),
    ) {
        Ok(p) => p,
        Err(e) => {
            let _ = event_tx.send(SessionEvent::Fatal(SessionError::AudioDevice(e)));
            return;
        }
    };
    if let Err(e) = playback.start() {
        let _ = event_tx.send(SessionEvent::Fatal(SessionError::AudioDevice(e)));
        return;
    }

    let capture = match AudioCapture::new(&config.input_device, sample_rate) {
        Ok(c) => c,
        Err(e) => {
            playback.stop();
            let _ = event_tx.send(SessionEvent::Fatal(SessionError::AudioDevice(e)));
            return;
        }
    };

    // Wire accounting and codecs, one per direction
    let rx_bitrate = Arc::new(BitrateCounter::new());
    let tx_bitrate = Arc::new(BitrateCounter::new());
    let mut rx_codec: Box<dyn FrameCodec> = Box::new(PcmCodec::new(rx_bitrate.clone()));
    let mut tx_codec: Box<dyn FrameCodec> = Box::new(PcmCodec::new(tx_bitrate.clone()));
    let mut tx_sequence: u32 = 0;

    let mut ptt = PttSync::new(
        Duration::from_millis(config.ptt_debounce_ms),
        Duration::from_millis(config.ptt_response_timeout_ms),
    );
    let mut last_phase = ptt.phase();

    // Gateway channels, one task each
    let (channel_tx, mut channel_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let backoff = BackoffConfig::from_session(&config);

    let control = spawn_channel(
        ChannelKind::Control,
        &config.gateway_url,
        backoff.clone(),
        channel_tx.clone(),
        shutdown_rx.clone(),
    );
    // RX is receive-only; the handle is held so its task outlives the loop
    let _audio_rx_channel = spawn_channel(
        ChannelKind::AudioRx,
        &config.gateway_url,
        backoff.clone(),
        channel_tx.clone(),
        shutdown_rx.clone(),
    );
    let audio_tx_channel = spawn_channel(
        ChannelKind::AudioTx,
        &config.gateway_url,
        backoff,
        channel_tx,
        shutdown_rx,
    );

    let mut states = ChannelStates::default();
    let mut ping_sent_at: Option<Instant> = None;
    let mut last_rtt_ms: Option<u64> = None;
    let mut window_started = Instant::now();

    let mut pipeline_tick =
        tokio::time::interval(Duration::from_millis(PIPELINE_INTERVAL_MS));
    pipeline_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut telemetry_tick =
        tokio::time::interval(Duration::from_secs(TELEMETRY_INTERVAL_SECS));
    telemetry_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ping_tick = tokio::time::interval(Duration::from_secs(config.ping_interval_secs));
    ping_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // Handle commands
            cmd = command_rx.recv() => {
                match cmd {
                    Some(SessionCommand::SetPtt(transmit)) => {
                        let now = Instant::now();
                        let was_transmitting = ptt.user_intent();
                        if let Some(key) = ptt.on_user(transmit, now) {
                            send_control(&control, &states, ControlCommand::SetPtt(key));
                        }

                        if transmit && !was_transmitting {
                            if let Err(e) = capture.start() {
                                let _ = event_tx.send(SessionEvent::Fatal(SessionError::AudioDevice(e)));
                                break;
                            }
                            tx_sequence = send_warmup(
                                &audio_tx_channel,
                                &states,
                                tx_codec.as_mut(),
                                frame_samples,
                                config.warmup_frames,
                                tx_sequence,
                            );
                        } else if !transmit && was_transmitting {
                            capture.stop();
                        }

                        emit_phase(&event_tx, &mut last_phase, &ptt);
                    }
                    Some(SessionCommand::SetFrequency(hz)) => {
                        match validate_frequency(hz) {
                            Ok(()) => send_control(&control, &states, ControlCommand::SetFrequency(hz)),
                            Err(FrequencyError::TooLow) => {
                                warn!(hz, "rejecting tune request below the supported range");
                            }
                            Err(FrequencyError::TooHigh) => {
                                warn!(hz, "rejecting tune request above the supported range");
                            }
                        }
                    }
                    Some(SessionCommand::GetFrequency) => {
                        send_control(&control, &states, ControlCommand::GetFrequency);
                    }
                    Some(SessionCommand::SetMode(mode)) => {
                        match validate_mode(&mode) {
                            Ok(()) => send_control(&control, &states, ControlCommand::SetMode(mode)),
                            Err(ModeError::Empty) => warn!("rejecting empty mode request"),
                            Err(ModeError::Unsupported) => {
                                warn!(mode = %mode, "rejecting unsupported mode request");
                            }
                        }
                    }
                    Some(SessionCommand::Shutdown) | None => {
                        info!("session shutdown requested");
                        break;
                    }
                }
            }

            // Handle channel traffic and connectivity
            event = channel_rx.recv() => {
                match event {
                    Some(ChannelEvent::State { kind, state }) => {
                        let was_open = states.get(kind).is_open();
                        states.set(kind, state);
                        let _ = event_tx.send(SessionEvent::Channel { kind, state });

                        if state.is_open() && !was_open {
                            match kind {
                                ChannelKind::Control => {
                                    // Announce our rate, then ask where the
                                    // dial is
                                    send_control(&control, &states, ControlCommand::SetRate(sample_rate));
                                    send_control(&control, &states, ControlCommand::GetFrequency);
                                }
                                ChannelKind::AudioRx => {
                                    // Fresh connection, fresh pre-roll
                                    if let Ok(mut jitter) = playback_buffer.lock() {
                                        jitter.flush();
                                    }
                                }
                                ChannelKind::AudioTx => {}
                            }
                        }
                    }
                    Some(ChannelEvent::Line { kind: ChannelKind::Control, text }) => {
                        match ControlStatus::parse(&text) {
                            Some(ControlStatus::Ptt(on)) => {
                                if ptt.on_confirm(on, Instant::now()) {
                                    // Transmit confirmed: queued receive
                                    // audio is from before the changeover
                                    if let Ok(mut jitter) = playback_buffer.lock() {
                                        jitter.flush();
                                    }
                                }
                                emit_phase(&event_tx, &mut last_phase, &ptt);
                            }
                            Some(ControlStatus::Frequency(hz)) => {
                                let _ = event_tx.send(SessionEvent::FrequencyReported(hz));
                            }
                            Some(ControlStatus::Mode(mode)) => {
                                let _ = event_tx.send(SessionEvent::ModeReported(mode));
                            }
                            Some(ControlStatus::Signal(level)) => {
                                let _ = event_tx.send(SessionEvent::SignalReported(level));
                            }
                            Some(ControlStatus::Rate(hz)) => {
                                if hz == sample_rate {
                                    info!(rate = hz, "gateway confirmed sample rate");
                                    let _ = event_tx.send(SessionEvent::RateConfirmed(hz));
                                } else {
                                    error!(
                                        negotiated = sample_rate,
                                        reported = hz,
                                        "gateway disagrees on sample rate"
                                    );
                                    let _ = event_tx.send(SessionEvent::Fatal(
                                        SessionError::RateMismatch {
                                            negotiated: sample_rate,
                                            reported: hz,
                                        },
                                    ));
                                    break;
                                }
                            }
                            Some(ControlStatus::Pong) => {
                                if let Some(sent) = ping_sent_at.take() {
                                    last_rtt_ms = Some(sent.elapsed().as_millis() as u64);
                                }
                            }
                            None => {
                                debug!(line = %text, "ignoring unrecognized control line");
                            }
                        }
                    }
                    Some(ChannelEvent::Line { kind, .. }) => {
                        debug!(channel = %kind, "ignoring text frame on audio channel");
                    }
                    Some(ChannelEvent::Audio { kind: ChannelKind::AudioRx, payload }) => {
                        if let Some(frame) = rx_codec.decode(&payload)
                            && let Ok(mut jitter) = playback_buffer.lock()
                        {
                            jitter.push(frame);
                        }
                    }
                    Some(ChannelEvent::Audio { kind, .. }) => {
                        debug!(channel = %kind, "ignoring binary frame");
                    }
                    Some(ChannelEvent::Failed { kind, error }) => {
                        if error.is_recoverable() {
                            debug!(channel = %kind, error = %error, "channel interrupted, reconnecting");
                        } else {
                            let _ = event_tx.send(SessionEvent::Fatal(error));
                            break;
                        }
                    }
                    None => {
                        // All channel tasks gone without a fatal notice
                        break;
                    }
                }
            }

            // Move captured audio to the wire and drive PTT timing
            _ = pipeline_tick.tick() => {
                if let Some(err) = capture.check_error() {
                    let _ = event_tx.send(SessionEvent::Fatal(SessionError::AudioDevice(err)));
                    break;
                }
                if let Some(err) = playback.check_error() {
                    let _ = event_tx.send(SessionEvent::Fatal(SessionError::AudioDevice(err)));
                    break;
                }

                while let Some(samples) = capture.take_frame() {
                    let wire_bytes = samples.len() * BYTES_PER_SAMPLE;
                    let frame = AudioFrame::new(samples, tx_sequence, wire_bytes);
                    tx_sequence = tx_sequence.wrapping_add(1);
                    send_frame(&audio_tx_channel, &states, tx_codec.as_mut(), &frame);
                }

                if let Some(key) = ptt.poll(Instant::now()) {
                    send_control(&control, &states, ControlCommand::SetPtt(key));
                }
            }

            // Publish telemetry
            _ = telemetry_tick.tick() => {
                let elapsed = window_started.elapsed();
                window_started = Instant::now();
                rx_bitrate.roll_window(elapsed);
                tx_bitrate.roll_window(elapsed);

                let (buffer_depth, frames_dropped) = match playback_buffer.lock() {
                    Ok(jitter) => (jitter.depth(), jitter.frames_dropped()),
                    Err(_) => (0, 0),
                };

                let _ = event_tx.send(SessionEvent::Telemetry(TelemetrySnapshot {
                    rx_bps: rx_bitrate.rate_bps(),
                    tx_bps: tx_bitrate.rate_bps(),
                    buffer_depth,
                    frames_dropped,
                    ptt_phase: ptt.phase(),
                    control: states.get(ChannelKind::Control),
                    audio_rx: states.get(ChannelKind::AudioRx),
                    audio_tx: states.get(ChannelKind::AudioTx),
                    ping_rtt_ms: last_rtt_ms,
                }));
            }

            // Keepalive for RTT measurement
            _ = ping_tick.tick() => {
                if states.get(ChannelKind::Control).is_open() {
                    ping_sent_at = Some(Instant::now());
                    send_control(&control, &states, ControlCommand::Ping);
                }
            }
        }
    }

    // Cleanup
    let _ = shutdown_tx.send(true);
    capture.stop();
    playback.stop();
    info!("session ended");
}

// =============================================================================
// Session Handle
// =============================================================================

/// Handle for controlling an active session
pub struct SessionHandle {
    /// Command sender
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    /// Join handle for the session thread
    /// Using std::thread instead of tokio::spawn because cpal's Stream is not Send
    handle: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Start a new session
    ///
    /// Validates the configuration, then spawns the session thread.
    /// Returns a handle for controlling the session and a receiver for
    /// events.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` without starting anything if the
    /// configuration fails validation.
    pub fn start(
        config: SessionConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), SessionError> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let session_id = Uuid::new_v4();
        info!(
            %session_id,
            gateway = %config.gateway_url,
            rate = config.sample_rate,
            "starting session"
        );

        // Spawn on a dedicated thread because cpal's Stream is not Send
        // The thread runs its own tokio runtime for async operations
        let handle = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime for session thread");

            rt.block_on(run_session(config, event_tx, command_rx));
        });

        Ok((
            Self {
                command_tx,
                handle: Some(handle),
            },
            event_rx,
        ))
    }

    /// Key or unkey the transmitter
    pub fn set_ptt(&self, transmit: bool) {
        let _ = self.command_tx.send(SessionCommand::SetPtt(transmit));
    }

    /// Tune to a frequency in hertz
    pub fn set_frequency(&self, hz: u64) {
        let _ = self.command_tx.send(SessionCommand::SetFrequency(hz));
    }

    /// Ask the gateway to report the current frequency
    pub fn get_frequency(&self) {
        let _ = self.command_tx.send(SessionCommand::GetFrequency);
    }

    /// Switch the operating mode
    pub fn set_mode(&self, mode: &str) {
        let _ = self
            .command_tx
            .send(SessionCommand::SetMode(mode.to_string()));
    }

    /// End the session
    ///
    /// Sends the shutdown command to the session thread. The thread closes
    /// channels and audio devices on its own. We don't wait for it to
    /// avoid blocking the caller if audio drivers are unresponsive.
    pub fn shutdown(&mut self) {
        let _ = self.command_tx.send(SessionCommand::Shutdown);
        self.handle.take(); // Release handle without blocking
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        // Ensure the session thread is stopped when the handle is dropped
        // This prevents orphaned threads if shutdown() wasn't called explicitly
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::channel::OutboundFrame;

    #[test]
    fn test_channel_states_track_by_kind() {
        let mut states = ChannelStates::default();
        for kind in ChannelKind::ALL {
            assert_eq!(states.get(kind), ChannelState::Closed);
        }

        states.set(ChannelKind::AudioRx, ChannelState::Open);
        assert_eq!(states.get(ChannelKind::AudioRx), ChannelState::Open);
        assert_eq!(states.get(ChannelKind::Control), ChannelState::Closed);
        assert_eq!(states.get(ChannelKind::AudioTx), ChannelState::Closed);

        states.set(ChannelKind::AudioRx, ChannelState::Closed);
        assert_eq!(states.get(ChannelKind::AudioRx), ChannelState::Closed);
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let config = SessionConfig {
            gateway_url: "http://not-a-websocket".to_string(),
            ..SessionConfig::default()
        };

        match SessionHandle::start(config) {
            Err(SessionError::InvalidConfig(_)) => {}
            other => panic!("expected InvalidConfig, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_emit_phase_only_on_change() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut last_phase = PttPhase::Idle;

        let ptt = PttSync::new(Duration::from_millis(0), Duration::from_millis(500));
        emit_phase(&tx, &mut last_phase, &ptt);
        assert!(rx.try_recv().is_err(), "no event while phase is unchanged");

        let mut ptt = PttSync::new(Duration::from_millis(0), Duration::from_millis(500));
        let _ = ptt.on_user(true, Instant::now());
        emit_phase(&tx, &mut last_phase, &ptt);
        assert!(matches!(
            rx.try_recv(),
            Ok(SessionEvent::Ptt(PttPhase::TransmitRequested))
        ));

        emit_phase(&tx, &mut last_phase, &ptt);
        assert!(rx.try_recv().is_err(), "repeat phase is not re-emitted");
    }

    #[test]
    fn test_warmup_precedes_captured_audio_in_order() {
        let (channel, mut outbound_rx) = ChannelHandle::detached(ChannelKind::AudioTx);
        let mut states = ChannelStates::default();
        states.set(ChannelKind::AudioTx, ChannelState::Open);

        let bitrate = Arc::new(BitrateCounter::new());
        let mut codec = PcmCodec::new(bitrate);

        let next = send_warmup(&channel, &states, &mut codec, 160, 5, 0);
        assert_eq!(next, 5);

        // The first captured frame follows the warm-up
        let captured = AudioFrame::new(vec![0.5; 160], next, 320);
        send_frame(&channel, &states, &mut codec, &captured);

        for i in 0..5 {
            match outbound_rx.try_recv() {
                Ok(OutboundFrame::Binary(payload)) => {
                    assert_eq!(payload.len(), 320);
                    assert!(
                        payload.iter().all(|&b| b == 0),
                        "warm-up frame {} is not silence",
                        i
                    );
                }
                other => panic!("expected binary frame, got {:?}", other),
            }
        }
        match outbound_rx.try_recv() {
            Ok(OutboundFrame::Binary(payload)) => {
                assert!(payload.iter().any(|&b| b != 0), "captured frame lost");
            }
            other => panic!("expected captured frame, got {:?}", other),
        }
        assert!(outbound_rx.try_recv().is_err());
    }

    #[test]
    fn test_warmup_suppressed_while_channel_down() {
        let (channel, mut outbound_rx) = ChannelHandle::detached(ChannelKind::AudioTx);
        let states = ChannelStates::default();

        let bitrate = Arc::new(BitrateCounter::new());
        let mut codec = PcmCodec::new(bitrate);

        // Sequence numbers still advance, but nothing reaches the wire
        let next = send_warmup(&channel, &states, &mut codec, 160, 5, 0);
        assert_eq!(next, 5);
        assert!(outbound_rx.try_recv().is_err());
    }

    #[test]
    fn test_session_command_variants() {
        // Verify enum variants compile
        let _ = SessionCommand::SetPtt(true);
        let _ = SessionCommand::SetFrequency(14_074_000);
        let _ = SessionCommand::GetFrequency;
        let _ = SessionCommand::SetMode("USB".to_string());
        let _ = SessionCommand::Shutdown;
    }
}
