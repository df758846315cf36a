//! RigLink Common Library
//!
//! Shared types for the RigLink remote transceiver system: the audio frame
//! wire format, the control-channel message grammar, telemetry export types,
//! and input validators. Used by the operator-side engine and available to
//! gateway implementations speaking the same protocol.

pub mod control;
pub mod frame;
pub mod telemetry;
pub mod validators;

/// Version information for the RigLink protocol
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Default port for the radio-side gateway
pub const DEFAULT_PORT: u16 = 8888;

/// WebSocket path for the control channel (text messages)
pub const CONTROL_PATH: &str = "/ctl";

/// WebSocket path for the audio receive channel (binary frames)
pub const AUDIO_RX_PATH: &str = "/rx";

/// WebSocket path for the audio transmit channel (binary frames)
pub const AUDIO_TX_PATH: &str = "/tx";

/// Default gateway URL for local testing.
///
/// The scheme selects the transport: `ws://` for plaintext, `wss://` for
/// TLS. Channel paths are appended to this base.
pub const DEFAULT_GATEWAY_URL: &str = "ws://127.0.0.1:8888";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port() {
        // Verify default port is the expected value
        assert_eq!(DEFAULT_PORT, 8888);
    }

    #[test]
    fn test_default_gateway_url_matches_port() {
        // Verify the default URL embeds DEFAULT_PORT
        assert!(DEFAULT_GATEWAY_URL.ends_with(&DEFAULT_PORT.to_string()));
    }

    #[test]
    fn test_channel_paths_distinct() {
        // The three channels must map to distinct gateway paths
        assert_ne!(CONTROL_PATH, AUDIO_RX_PATH);
        assert_ne!(CONTROL_PATH, AUDIO_TX_PATH);
        assert_ne!(AUDIO_RX_PATH, AUDIO_TX_PATH);
    }

    #[test]
    fn test_channel_paths_absolute() {
        // Paths are appended to a base URL, so they must be absolute
        assert!(CONTROL_PATH.starts_with('/'));
        assert!(AUDIO_RX_PATH.starts_with('/'));
        assert!(AUDIO_TX_PATH.starts_with('/'));
    }
}
