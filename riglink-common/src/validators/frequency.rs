//! Frequency validation
//!
//! Bounds tuning requests before they reach the gateway. The range covers
//! longwave through 23cm; anything outside is a typo or a unit mistake
//! (kHz where Hz was meant), not a real tuning request.

/// Minimum tunable frequency in Hz (100 kHz)
pub const MIN_FREQUENCY_HZ: u64 = 100_000;

/// Maximum tunable frequency in Hz (1.3 GHz)
pub const MAX_FREQUENCY_HZ: u64 = 1_300_000_000;

/// Validation error for frequencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrequencyError {
    /// Frequency is below the minimum
    TooLow,
    /// Frequency is above the maximum
    TooHigh,
}

/// Validate a tuning frequency in hertz
///
/// Checks:
/// - At least [`MIN_FREQUENCY_HZ`]
/// - At most [`MAX_FREQUENCY_HZ`]
///
/// # Errors
///
/// Returns a `FrequencyError` variant describing the validation failure.
pub fn validate_frequency(hz: u64) -> Result<(), FrequencyError> {
    if hz < MIN_FREQUENCY_HZ {
        return Err(FrequencyError::TooLow);
    }
    if hz > MAX_FREQUENCY_HZ {
        return Err(FrequencyError::TooHigh);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_frequencies() {
        assert!(validate_frequency(MIN_FREQUENCY_HZ).is_ok());
        assert!(validate_frequency(MAX_FREQUENCY_HZ).is_ok());
        // 40m FT8
        assert!(validate_frequency(7_074_000).is_ok());
        // 20m FT8
        assert!(validate_frequency(14_074_000).is_ok());
        // 2m calling
        assert!(validate_frequency(145_500_000).is_ok());
        // 70cm
        assert!(validate_frequency(433_500_000).is_ok());
    }

    #[test]
    fn test_too_low() {
        assert_eq!(validate_frequency(0), Err(FrequencyError::TooLow));
        assert_eq!(
            validate_frequency(MIN_FREQUENCY_HZ - 1),
            Err(FrequencyError::TooLow)
        );
        // A kHz value passed where Hz was meant
        assert_eq!(validate_frequency(14_074), Err(FrequencyError::TooLow));
    }

    #[test]
    fn test_too_high() {
        assert_eq!(
            validate_frequency(MAX_FREQUENCY_HZ + 1),
            Err(FrequencyError::TooHigh)
        );
        assert_eq!(validate_frequency(u64::MAX), Err(FrequencyError::TooHigh));
    }
}
