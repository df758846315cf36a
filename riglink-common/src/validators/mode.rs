//! Operating mode validation
//!
//! Mode names travel as bare uppercase strings on the control channel.
//! Validation happens engine-side so a bad request never reaches the
//! transceiver's CAT interface.

/// Operating modes the control grammar accepts, in alphabetical order
pub const SUPPORTED_MODES: &[&str] = &[
    "AM", "CW", "CWR", "DIG", "FM", "LSB", "RTTY", "USB", "WFM",
];

/// Validation error for operating modes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeError {
    /// Mode name is empty
    Empty,
    /// Mode name is not in the supported set
    Unsupported,
}

/// Validate an operating mode name
///
/// Checks:
/// - Not empty
/// - Present in [`SUPPORTED_MODES`] (exact uppercase match)
///
/// # Errors
///
/// Returns a `ModeError` variant describing the validation failure.
pub fn validate_mode(mode: &str) -> Result<(), ModeError> {
    if mode.is_empty() {
        return Err(ModeError::Empty);
    }
    if !SUPPORTED_MODES.contains(&mode) {
        return Err(ModeError::Unsupported);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_modes() {
        for &mode in SUPPORTED_MODES {
            assert!(validate_mode(mode).is_ok(), "{} should be valid", mode);
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(validate_mode(""), Err(ModeError::Empty));
    }

    #[test]
    fn test_unsupported() {
        assert_eq!(validate_mode("SSB"), Err(ModeError::Unsupported));
        assert_eq!(validate_mode("PSK31"), Err(ModeError::Unsupported));
    }

    #[test]
    fn test_case_sensitive() {
        // The grammar is uppercase-only; lowercase is rejected, not coerced
        assert_eq!(validate_mode("usb"), Err(ModeError::Unsupported));
        assert_eq!(validate_mode("Usb"), Err(ModeError::Unsupported));
    }

    #[test]
    fn test_supported_modes_sorted() {
        let mut sorted = SUPPORTED_MODES.to_vec();
        sorted.sort_unstable();
        assert_eq!(SUPPORTED_MODES, sorted.as_slice());
    }
}
