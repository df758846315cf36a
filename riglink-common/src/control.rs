//! Control channel message grammar
//!
//! The control channel carries small text messages of the form
//! `verb:value`, or a bare verb when no value is needed. The engine sends
//! [`ControlCommand`]s and receives [`ControlStatus`] reports:
//!
//! ```text
//! engine -> gateway:  setPTT:true   getFreq   setFreq:14074000
//!                     setMode:USB   setRate:16000   ping
//! gateway -> engine:  ptt:true   freq:14074000   mode:USB
//!                     signal:-73.5   rate:16000   pong
//! ```
//!
//! Booleans are the exact strings `true`/`false`, frequencies are integer
//! hertz, signal levels are decimal numbers in the gateway's meter units.
//! Unknown or malformed lines parse to `None`; the stream continues.

// =============================================================================
// Outbound Commands
// =============================================================================

/// A command sent from the engine to the gateway
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// Key or unkey the transmitter
    SetPtt(bool),
    /// Ask the gateway to report the current dial frequency
    GetFrequency,
    /// Tune to the given frequency in hertz
    SetFrequency(u64),
    /// Switch the operating mode (USB, LSB, CW, ...)
    SetMode(String),
    /// Announce the negotiated audio sample rate in hertz
    SetRate(u32),
    /// Keepalive; the gateway answers with `pong`
    Ping,
}

impl ControlCommand {
    /// Render this command in wire form
    pub fn to_wire(&self) -> String {
        match self {
            ControlCommand::SetPtt(on) => format!("setPTT:{}", on),
            ControlCommand::GetFrequency => "getFreq".to_string(),
            ControlCommand::SetFrequency(hz) => format!("setFreq:{}", hz),
            ControlCommand::SetMode(mode) => format!("setMode:{}", mode),
            ControlCommand::SetRate(hz) => format!("setRate:{}", hz),
            ControlCommand::Ping => "ping".to_string(),
        }
    }
}

// =============================================================================
// Inbound Status Reports
// =============================================================================

/// A status report received from the gateway
#[derive(Debug, Clone, PartialEq)]
pub enum ControlStatus {
    /// Transmitter keying state as confirmed by the device
    Ptt(bool),
    /// Current dial frequency in hertz
    Frequency(u64),
    /// Current operating mode name
    Mode(String),
    /// Received signal strength in the gateway's meter units
    Signal(f32),
    /// Audio sample rate the gateway is using, in hertz
    Rate(u32),
    /// Keepalive reply
    Pong,
}

impl ControlStatus {
    /// Parse one wire line into a status report.
    ///
    /// # Returns
    ///
    /// * `Some(status)` - A recognized, well-formed report
    /// * `None` - Unknown verb or malformed value; caller logs and continues
    pub fn parse(line: &str) -> Option<ControlStatus> {
        let line = line.trim();

        if line == "pong" {
            return Some(ControlStatus::Pong);
        }

        let (verb, value) = line.split_once(':')?;
        match verb {
            "ptt" => parse_bool(value).map(ControlStatus::Ptt),
            "freq" => value.parse::<u64>().ok().map(ControlStatus::Frequency),
            "mode" if !value.is_empty() => Some(ControlStatus::Mode(value.to_string())),
            "signal" => value.parse::<f32>().ok().map(ControlStatus::Signal),
            "rate" => value.parse::<u32>().ok().map(ControlStatus::Rate),
            _ => None,
        }
    }
}

/// Parse the exact wire booleans `true`/`false`
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
