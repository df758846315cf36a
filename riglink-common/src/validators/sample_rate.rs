//! Sample rate validation
//!
//! The audio sample rate is a negotiated session parameter, not a constant:
//! encoder and decoder must agree on a single value or playback silently
//! shifts pitch and speed. Only rates from the supported set are accepted,
//! and the engine announces the value at channel open so a disagreement is
//! caught instead of heard.

/// Sample rates the wire format supports, in Hz.
///
/// All values divide evenly into 10ms frames and cover the range observed
/// in deployed gateways. Kept in ascending order.
pub const SUPPORTED_SAMPLE_RATES: &[u32] = &[8000, 12000, 16000, 24000];

/// Validation error for sample rates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleRateError {
    /// Rate is zero
    Zero,
    /// Rate is not in the supported set
    Unsupported,
}

/// Validate a session sample rate
///
/// Checks:
/// - Not zero
/// - Present in [`SUPPORTED_SAMPLE_RATES`]
///
/// # Errors
///
/// Returns a `SampleRateError` variant describing the validation failure.
pub fn validate_sample_rate(rate: u32) -> Result<(), SampleRateError> {
    if rate == 0 {
        return Err(SampleRateError::Zero);
    }
    if !SUPPORTED_SAMPLE_RATES.contains(&rate) {
        return Err(SampleRateError::Unsupported);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_rates() {
        for &rate in SUPPORTED_SAMPLE_RATES {
            assert!(validate_sample_rate(rate).is_ok(), "{} should be valid", rate);
        }
    }

    #[test]
    fn test_zero() {
        assert_eq!(validate_sample_rate(0), Err(SampleRateError::Zero));
    }

    #[test]
    fn test_unsupported() {
        assert_eq!(validate_sample_rate(11025), Err(SampleRateError::Unsupported));
        assert_eq!(validate_sample_rate(22050), Err(SampleRateError::Unsupported));
        assert_eq!(validate_sample_rate(44100), Err(SampleRateError::Unsupported));
        assert_eq!(validate_sample_rate(48000), Err(SampleRateError::Unsupported));
    }

    #[test]
    fn test_supported_rates_sorted() {
        let mut sorted = SUPPORTED_SAMPLE_RATES.to_vec();
        sorted.sort_unstable();
        assert_eq!(SUPPORTED_SAMPLE_RATES, sorted.as_slice());
    }

    #[test]
    fn test_supported_rates_frame_aligned() {
        // Every supported rate must produce whole 10ms frames
        for &rate in SUPPORTED_SAMPLE_RATES {
            assert_eq!(rate % 100, 0, "{} does not divide into 10ms frames", rate);
        }
    }
}
