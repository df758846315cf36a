//! Session configuration
//!
//! Everything a session needs to start: gateway endpoint, negotiated sample
//! rate, playback buffer watermarks, PTT timing, reconnect policy, and audio
//! device selection. All fields have working defaults so an embedding
//! application can start from `SessionConfig::default()` and override only
//! what it cares about.

use serde::{Deserialize, Serialize};

use riglink_common::DEFAULT_GATEWAY_URL;
use riglink_common::frame::DEFAULT_SAMPLE_RATE;
use riglink_common::validators::{SUPPORTED_SAMPLE_RATES, SampleRateError, validate_sample_rate};

use crate::error::SessionError;

// =============================================================================
// Constants
// =============================================================================

/// System default device identifier
pub const SYSTEM_DEFAULT_DEVICE: &str = "";

/// Default playback pre-roll watermark in frames
pub const DEFAULT_MIN_FRAMES: usize = 2; // 20ms

/// Default playback buffer capacity in frames
pub const DEFAULT_MAX_FRAMES: usize = 4; // 40ms

/// Default number of silence frames sent before captured audio
pub const DEFAULT_WARMUP_FRAMES: usize = 5;

/// Upper bound on warm-up silence frames
pub const MAX_WARMUP_FRAMES: usize = 10;

/// Default PTT debounce window in milliseconds
pub const DEFAULT_PTT_DEBOUNCE_MS: u64 = 120;

/// Default PTT confirmation timeout in milliseconds
pub const DEFAULT_PTT_RESPONSE_TIMEOUT_MS: u64 = 500;

/// Default initial reconnect delay in milliseconds
pub const DEFAULT_RECONNECT_INITIAL_MS: u64 = 500;

/// Default reconnect delay multiplier
pub const DEFAULT_RECONNECT_MULTIPLIER: f64 = 2.0;

/// Default reconnect delay ceiling in milliseconds
pub const DEFAULT_RECONNECT_MAX_MS: u64 = 15_000;

/// Default reconnect attempt budget per outage
pub const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 10;

/// Default control-channel keepalive interval in seconds
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 5;

// =============================================================================
// Session Configuration
// =============================================================================

/// Configuration for starting a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Gateway base URL (ws:// or wss://), without a channel path
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Negotiated sample rate in Hz (announced to the gateway at connect)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Playback frames buffered before output starts
    #[serde(default = "default_min_frames")]
    pub min_frames: usize,

    /// Playback buffer capacity; older frames are dropped beyond this
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,

    /// Silence frames sent at transmit start to absorb device spin-up
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: usize,

    /// Minimum gap between PTT commands in milliseconds
    #[serde(default = "default_ptt_debounce_ms")]
    pub ptt_debounce_ms: u64,

    /// How long to wait for PTT confirmation before resending, in milliseconds
    #[serde(default = "default_ptt_response_timeout_ms")]
    pub ptt_response_timeout_ms: u64,

    /// First reconnect delay in milliseconds
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,

    /// Growth factor applied to the reconnect delay after each failure
    #[serde(default = "default_reconnect_multiplier")]
    pub reconnect_multiplier: f64,

    /// Reconnect delay ceiling in milliseconds
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    /// Reconnect attempts per outage before the channel gives up
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,

    /// Control-channel keepalive interval in seconds
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Input device name (empty string = system default)
    #[serde(default)]
    pub input_device: String,

    /// Output device name (empty string = system default)
    #[serde(default)]
    pub output_device: String,
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_min_frames() -> usize {
    DEFAULT_MIN_FRAMES
}

fn default_max_frames() -> usize {
    DEFAULT_MAX_FRAMES
}

fn default_warmup_frames() -> usize {
    DEFAULT_WARMUP_FRAMES
}

fn default_ptt_debounce_ms() -> u64 {
    DEFAULT_PTT_DEBOUNCE_MS
}

fn default_ptt_response_timeout_ms() -> u64 {
    DEFAULT_PTT_RESPONSE_TIMEOUT_MS
}

fn default_reconnect_initial_ms() -> u64 {
    DEFAULT_RECONNECT_INITIAL_MS
}

fn default_reconnect_multiplier() -> f64 {
    DEFAULT_RECONNECT_MULTIPLIER
}

fn default_reconnect_max_ms() -> u64 {
    DEFAULT_RECONNECT_MAX_MS
}

fn default_reconnect_max_attempts() -> u32 {
    DEFAULT_RECONNECT_MAX_ATTEMPTS
}

fn default_ping_interval_secs() -> u64 {
    DEFAULT_PING_INTERVAL_SECS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            sample_rate: default_sample_rate(),
            min_frames: default_min_frames(),
            max_frames: default_max_frames(),
            warmup_frames: default_warmup_frames(),
            ptt_debounce_ms: default_ptt_debounce_ms(),
            ptt_response_timeout_ms: default_ptt_response_timeout_ms(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_multiplier: default_reconnect_multiplier(),
            reconnect_max_ms: default_reconnect_max_ms(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
            ping_interval_secs: default_ping_interval_secs(),
            input_device: SYSTEM_DEFAULT_DEVICE.to_string(),
            output_device: SYSTEM_DEFAULT_DEVICE.to_string(),
        }
    }
}

impl SessionConfig {
    /// Validate the configuration before starting a session
    ///
    /// # Returns
    /// * `Ok(())` - Configuration is usable
    /// * `Err(SessionError::InvalidConfig)` - First problem found
    pub fn validate(&self) -> Result<(), SessionError> {
        if !self.gateway_url.starts_with("ws://") && !self.gateway_url.starts_with("wss://") {
            return Err(SessionError::InvalidConfig(format!(
                "gateway URL must start with ws:// or wss://, got '{}'",
                self.gateway_url
            )));
        }

        validate_sample_rate(self.sample_rate).map_err(|e| {
            SessionError::InvalidConfig(match e {
                SampleRateError::Zero => "sample_rate must be non-zero".to_string(),
                SampleRateError::Unsupported => format!(
                    "sample_rate {} Hz is not supported (supported: {:?})",
                    self.sample_rate, SUPPORTED_SAMPLE_RATES
                ),
            })
        })?;

        if self.min_frames == 0 {
            return Err(SessionError::InvalidConfig(
                "min_frames must be at least 1".to_string(),
            ));
        }

        if self.max_frames < self.min_frames {
            return Err(SessionError::InvalidConfig(format!(
                "max_frames ({}) must be >= min_frames ({})",
                self.max_frames, self.min_frames
            )));
        }

        if self.warmup_frames > MAX_WARMUP_FRAMES {
            return Err(SessionError::InvalidConfig(format!(
                "warmup_frames ({}) must be <= {}",
                self.warmup_frames, MAX_WARMUP_FRAMES
            )));
        }

        if self.reconnect_multiplier < 1.0 {
            return Err(SessionError::InvalidConfig(format!(
                "reconnect_multiplier ({}) must be >= 1.0",
                self.reconnect_multiplier
            )));
        }

        if self.reconnect_initial_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "reconnect_initial_ms must be non-zero".to_string(),
            ));
        }

        if self.ping_interval_secs == 0 {
            return Err(SessionError::InvalidConfig(
                "ping_interval_secs must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if using the system default input device
    pub fn is_default_input(&self) -> bool {
        self.input_device.is_empty()
    }

    /// Check if using the system default output device
    pub fn is_default_output(&self) -> bool {
        self.output_device.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.min_frames, DEFAULT_MIN_FRAMES);
        assert_eq!(config.max_frames, DEFAULT_MAX_FRAMES);
        assert_eq!(config.warmup_frames, DEFAULT_WARMUP_FRAMES);
        assert!(config.is_default_input());
        assert!(config.is_default_output());
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        let config = SessionConfig {
            gateway_url: "http://example.com:8888".to_string(),
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_accepts_secure_websocket_url() {
        let config = SessionConfig {
            gateway_url: "wss://remote.example.org:8888".to_string(),
            ..SessionConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unsupported_sample_rate() {
        let config = SessionConfig {
            sample_rate: 44_100,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_watermarks() {
        let config = SessionConfig {
            min_frames: 6,
            max_frames: 4,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_min_frames() {
        let config = SessionConfig {
            min_frames: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_excessive_warmup() {
        let config = SessionConfig {
            warmup_frames: MAX_WARMUP_FRAMES + 1,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_warmup_is_allowed() {
        let config = SessionConfig {
            warmup_frames: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_shrinking_backoff() {
        let config = SessionConfig {
            reconnect_multiplier: 0.5,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = SessionConfig {
            gateway_url: "ws://rig.local:8888".to_string(),
            sample_rate: 24_000,
            min_frames: 3,
            max_frames: 8,
            warmup_frames: 2,
            input_device: "USB Audio CODEC".to_string(),
            ..SessionConfig::default()
        };

        let json = serde_json::to_string(&config).expect("serialize");
        let back: SessionConfig = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(config.gateway_url, back.gateway_url);
        assert_eq!(config.sample_rate, back.sample_rate);
        assert_eq!(config.min_frames, back.min_frames);
        assert_eq!(config.max_frames, back.max_frames);
        assert_eq!(config.warmup_frames, back.warmup_frames);
        assert_eq!(config.input_device, back.input_device);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"gateway_url": "ws://10.0.0.7:8888"}"#).expect("deserialize");
        assert_eq!(config.gateway_url, "ws://10.0.0.7:8888");
        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.ptt_debounce_ms, DEFAULT_PTT_DEBOUNCE_MS);
        assert_eq!(config.reconnect_max_attempts, DEFAULT_RECONNECT_MAX_ATTEMPTS);
    }
}
