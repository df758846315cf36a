//! Command-line argument parsing

use clap::Parser;
use riglink_common::DEFAULT_GATEWAY_URL;
use riglink_common::frame::DEFAULT_SAMPLE_RATE;

use crate::config::{
    DEFAULT_MAX_FRAMES, DEFAULT_MIN_FRAMES, DEFAULT_WARMUP_FRAMES, SessionConfig,
};

/// RigLink remote operator console
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Gateway base URL (ws:// or wss://)
    #[arg(short, long, default_value = DEFAULT_GATEWAY_URL)]
    pub gateway: String,

    /// Audio sample rate in Hz (8000, 12000, 16000, or 24000)
    #[arg(short = 'r', long, default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Playback frames buffered before audio starts
    #[arg(long, default_value_t = DEFAULT_MIN_FRAMES)]
    pub min_frames: usize,

    /// Playback frames held before the oldest is dropped
    #[arg(long, default_value_t = DEFAULT_MAX_FRAMES)]
    pub max_frames: usize,

    /// Silence frames sent when transmit starts
    #[arg(long, default_value_t = DEFAULT_WARMUP_FRAMES)]
    pub warmup_frames: usize,

    /// Input device name (default: system default)
    #[arg(short, long)]
    pub input_device: Option<String>,

    /// Output device name (default: system default)
    #[arg(short, long)]
    pub output_device: Option<String>,

    /// Enable debug logging (shows channel and PTT state transitions)
    #[arg(long, default_value = "false")]
    pub debug: bool,
}

impl Args {
    /// Build a session configuration from the parsed arguments
    ///
    /// Timing and reconnect policy keep their defaults; only what the
    /// command line exposes is overridden.
    pub fn into_config(self) -> SessionConfig {
        SessionConfig {
            gateway_url: self.gateway,
            sample_rate: self.sample_rate,
            min_frames: self.min_frames,
            max_frames: self.max_frames,
            warmup_frames: self.warmup_frames,
            input_device: self.input_device.unwrap_or_default(),
            output_device: self.output_device.unwrap_or_default(),
            ..SessionConfig::default()
        }
    }
}
