//! PTT intent/confirmation synchronization
//!
//! Tracks two views of push-to-talk: what the operator wants and what the
//! radio has confirmed over the control channel. The two drift apart while
//! a command is in flight, when commands are lost, or when the radio keys
//! or unkeys on its own. This state machine reconciles them: it debounces
//! operator toggles, resends unanswered commands on a fixed timeout, and
//! treats the radio's confirmation as the authoritative state.
//!
//! The machine is pure; it never touches the network. Callers feed it
//! operator toggles, device confirmations, and periodic polls, and act on
//! the commands it returns.

use std::time::{Duration, Instant};

use riglink_common::telemetry::PttPhase;

// =============================================================================
// PTT Synchronizer
// =============================================================================

/// Reconciles operator PTT intent with device confirmation
///
/// All methods take `now` explicitly so timing behavior is testable.
pub struct PttSync {
    /// What the operator wants the transmitter to do
    user_intent: bool,
    /// What the radio last confirmed the transmitter is doing
    device_confirmed: bool,
    /// A command has been sent and not yet answered
    command_in_flight: bool,
    /// When the last command was sent
    last_command: Option<Instant>,
    /// When the last confirmation arrived
    last_confirm: Option<Instant>,
    /// Minimum gap between outgoing commands
    debounce: Duration,
    /// How long to wait for a confirmation before resending
    response_timeout: Duration,
}

impl PttSync {
    /// Create a synchronizer in the unkeyed, unconfirmed state
    pub fn new(debounce: Duration, response_timeout: Duration) -> Self {
        Self {
            user_intent: false,
            device_confirmed: false,
            command_in_flight: false,
            last_command: None,
            last_confirm: None,
            debounce,
            response_timeout,
        }
    }

    /// Record an operator toggle
    ///
    /// # Returns
    /// * `Some(transmit)` - Send a PTT command for this target state
    /// * `None` - Nothing to send right now (debounced, in flight, or converged)
    pub fn on_user(&mut self, transmit: bool, now: Instant) -> Option<bool> {
        self.user_intent = transmit;
        self.decide(now)
    }

    /// Re-evaluate on the pipeline tick
    ///
    /// Drives resends after a lost command and corrective commands after the
    /// device changed state on its own.
    ///
    /// # Returns
    /// * `Some(transmit)` - Send a PTT command for this target state
    /// * `None` - Nothing to send right now
    pub fn poll(&mut self, now: Instant) -> Option<bool> {
        self.decide(now)
    }

    /// Record a PTT confirmation from the device
    ///
    /// The confirmation always wins: it overwrites the confirmed state and
    /// clears any in-flight command, whether or not one was expected.
    ///
    /// # Returns
    /// * `true` - The device just keyed up; buffered receive audio is stale
    ///   and the caller must flush playback
    /// * `false` - No playback action needed
    pub fn on_confirm(&mut self, transmit: bool, now: Instant) -> bool {
        let entered_transmit = transmit && !self.device_confirmed;
        self.device_confirmed = transmit;
        self.command_in_flight = false;
        self.last_confirm = Some(now);
        entered_transmit
    }

    /// Decide whether a command should go out now
    fn decide(&mut self, now: Instant) -> Option<bool> {
        if let Some(last) = self.last_command
            && now.duration_since(last) < self.debounce
        {
            return None;
        }

        if self.user_intent == self.device_confirmed {
            self.command_in_flight = false;
            return None;
        }

        if self.command_in_flight
            && let Some(last) = self.last_command
            && now.duration_since(last) < self.response_timeout
        {
            return None;
        }

        self.command_in_flight = true;
        self.last_command = Some(now);
        Some(self.user_intent)
    }

    /// Externally visible phase, derived from intent and confirmation
    ///
    /// `Idle` only before the first confirmation ever; after that an
    /// unkeyed, converged machine reads `ReceiveConfirmed`.
    pub fn phase(&self) -> PttPhase {
        match (self.user_intent, self.device_confirmed) {
            (true, true) => PttPhase::TransmitConfirmed,
            (true, false) => PttPhase::TransmitRequested,
            (false, true) => PttPhase::ReceiveRequested,
            (false, false) => {
                if self.last_confirm.is_some() {
                    PttPhase::ReceiveConfirmed
                } else {
                    PttPhase::Idle
                }
            }
        }
    }

    /// What the operator currently wants
    pub fn user_intent(&self) -> bool {
        self.user_intent
    }

    /// What the radio last confirmed
    pub fn device_confirmed(&self) -> bool {
        self.device_confirmed
    }

    /// Whether a command is awaiting confirmation
    pub fn command_in_flight(&self) -> bool {
        self.command_in_flight
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(120);
    const TIMEOUT: Duration = Duration::from_millis(500);

    fn make_sync() -> (PttSync, Instant) {
        (PttSync::new(DEBOUNCE, TIMEOUT), Instant::now())
    }

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_press_sends_single_command() {
        let (mut sync, t0) = make_sync();

        assert_eq!(sync.on_user(true, t0), Some(true));
        assert!(sync.command_in_flight());
        assert_eq!(sync.phase(), PttPhase::TransmitRequested);
    }

    #[test]
    fn test_quiet_until_operator_acts() {
        let (mut sync, t0) = make_sync();

        assert_eq!(sync.poll(t0), None);
        assert_eq!(sync.poll(at(t0, 1000)), None);
        assert_eq!(sync.phase(), PttPhase::Idle);
    }

    #[test]
    fn test_debounce_suppresses_rapid_release() {
        let (mut sync, t0) = make_sync();

        assert_eq!(sync.on_user(true, t0), Some(true));
        // Release 50ms later: inside the debounce window, nothing goes out
        assert_eq!(sync.on_user(false, at(t0, 50)), None);
        // Device never confirmed, so intent and confirmation have converged
        assert_eq!(sync.poll(at(t0, 130)), None);
        assert!(!sync.command_in_flight());

        // The first command still keyed the radio; once it confirms, a
        // corrective unkey goes out
        assert!(sync.on_confirm(true, at(t0, 200)));
        assert_eq!(sync.poll(at(t0, 200)), Some(false));
    }

    #[test]
    fn test_one_resend_per_timeout_window() {
        let (mut sync, t0) = make_sync();

        assert_eq!(sync.on_user(true, t0), Some(true));

        // No confirmation arrives; polls inside the window stay quiet
        for ms in [100, 200, 300, 400, 499] {
            assert_eq!(sync.poll(at(t0, ms)), None, "poll at +{ms}ms");
        }

        // Timeout elapsed: exactly one resend, then quiet again
        assert_eq!(sync.poll(at(t0, 500)), Some(true));
        for ms in [600, 700, 800, 900, 999] {
            assert_eq!(sync.poll(at(t0, ms)), None, "poll at +{ms}ms");
        }
        assert_eq!(sync.poll(at(t0, 1000)), Some(true));
    }

    #[test]
    fn test_confirmation_clears_in_flight() {
        let (mut sync, t0) = make_sync();

        sync.on_user(true, t0);
        assert!(sync.on_confirm(true, at(t0, 80)));
        assert!(!sync.command_in_flight());
        assert_eq!(sync.phase(), PttPhase::TransmitConfirmed);

        // Converged: no resend after the timeout window
        assert_eq!(sync.poll(at(t0, 600)), None);
    }

    #[test]
    fn test_flush_only_when_entering_transmit() {
        let (mut sync, t0) = make_sync();

        sync.on_user(true, t0);
        assert!(sync.on_confirm(true, at(t0, 80)));
        // Repeated keyed confirmation is not a transition
        assert!(!sync.on_confirm(true, at(t0, 160)));

        sync.on_user(false, at(t0, 300));
        assert!(!sync.on_confirm(false, at(t0, 380)));
        assert_eq!(sync.phase(), PttPhase::ReceiveConfirmed);
    }

    #[test]
    fn test_device_unkey_triggers_correction() {
        let (mut sync, t0) = make_sync();

        sync.on_user(true, t0);
        sync.on_confirm(true, at(t0, 80));

        // Radio unkeys on its own while the operator still holds transmit
        assert!(!sync.on_confirm(false, at(t0, 2000)));
        assert_eq!(sync.phase(), PttPhase::TransmitRequested);
        assert_eq!(sync.poll(at(t0, 2000)), Some(true));
    }

    #[test]
    fn test_release_after_confirmed_transmit() {
        let (mut sync, t0) = make_sync();

        sync.on_user(true, t0);
        sync.on_confirm(true, at(t0, 80));

        assert_eq!(sync.on_user(false, at(t0, 300)), Some(false));
        assert_eq!(sync.phase(), PttPhase::ReceiveRequested);

        assert!(!sync.on_confirm(false, at(t0, 380)));
        assert_eq!(sync.phase(), PttPhase::ReceiveConfirmed);
        assert!(!sync.user_intent());
        assert!(!sync.device_confirmed());
    }

    #[test]
    fn test_phase_sequence_over_full_exchange() {
        let (mut sync, t0) = make_sync();
        assert_eq!(sync.phase(), PttPhase::Idle);

        sync.on_user(true, t0);
        assert_eq!(sync.phase(), PttPhase::TransmitRequested);

        sync.on_confirm(true, at(t0, 90));
        assert_eq!(sync.phase(), PttPhase::TransmitConfirmed);

        sync.on_user(false, at(t0, 400));
        assert_eq!(sync.phase(), PttPhase::ReceiveRequested);

        sync.on_confirm(false, at(t0, 480));
        assert_eq!(sync.phase(), PttPhase::ReceiveConfirmed);
    }
}
