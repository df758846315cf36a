//! Session error taxonomy
//!
//! Classifies the ways a session can degrade or die. Channel interruptions
//! are recoverable and drive the reconnect path; everything else tears the
//! session down.

use thiserror::Error;

use riglink_common::telemetry::ChannelKind;

// =============================================================================
// Session Error
// =============================================================================

/// Errors raised by the session engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Configuration rejected before the session started
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Gateway reported a sample rate different from the negotiated one
    ///
    /// Continuing would play audio at the wrong pitch, so this is fatal.
    #[error("sample rate mismatch: negotiated {negotiated} Hz, gateway reports {reported} Hz")]
    RateMismatch { negotiated: u32, reported: u32 },

    /// A channel dropped or errored and is being retried
    #[error("{kind} channel interrupted: {reason}")]
    ChannelInterrupted { kind: ChannelKind, reason: String },

    /// A channel used up its reconnect budget
    #[error("{kind} channel gave up after {attempts} reconnect attempts")]
    ReconnectExhausted { kind: ChannelKind, attempts: u32 },

    /// An audio device failed to open or errored mid-session
    #[error("audio device error: {0}")]
    AudioDevice(String),
}

impl SessionError {
    /// Whether the session keeps running after this error
    ///
    /// Recoverable errors are handled by the channel reconnect loop; the
    /// session only surfaces them as state changes. Unrecoverable errors
    /// end the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::ChannelInterrupted { .. })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_interruption_is_recoverable() {
        let err = SessionError::ChannelInterrupted {
            kind: ChannelKind::AudioRx,
            reason: "connection reset".to_string(),
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_fatal_errors_are_not_recoverable() {
        let errors = [
            SessionError::InvalidConfig("bad rate".to_string()),
            SessionError::RateMismatch {
                negotiated: 16_000,
                reported: 8_000,
            },
            SessionError::ReconnectExhausted {
                kind: ChannelKind::Control,
                attempts: 10,
            },
            SessionError::AudioDevice("no output device".to_string()),
        ];
        for err in errors {
            assert!(!err.is_recoverable(), "{err} should be fatal");
        }
    }

    #[test]
    fn test_error_messages_name_the_channel() {
        let err = SessionError::ReconnectExhausted {
            kind: ChannelKind::AudioTx,
            attempts: 10,
        };
        assert!(err.to_string().contains("audio-tx"));

        let err = SessionError::ChannelInterrupted {
            kind: ChannelKind::Control,
            reason: "eof".to_string(),
        };
        assert!(err.to_string().contains("control"));
    }

    #[test]
    fn test_rate_mismatch_message() {
        let err = SessionError::RateMismatch {
            negotiated: 16_000,
            reported: 48_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("16000"));
        assert!(msg.contains("48000"));
    }
}
