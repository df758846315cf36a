//! Input validation functions
//!
//! Reusable validators for session parameters. The engine validates its
//! configuration before opening channels; a gateway can use the same rules
//! for enforcement.

mod frequency;
mod mode;
mod sample_rate;

pub use frequency::{FrequencyError, MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ, validate_frequency};
pub use mode::{ModeError, SUPPORTED_MODES, validate_mode};
pub use sample_rate::{SUPPORTED_SAMPLE_RATES, SampleRateError, validate_sample_rate};
