//! Audio frame wire format
//!
//! RX and TX audio travel as raw 16-bit signed little-endian PCM, one frame
//! per channel message. There is no header: the negotiated sample rate and
//! the fixed frame duration fully determine the layout.
//!
//! Frame layout on the wire (N = samples per frame):
//! ```text
//! +----------+----------+-----+------------+
//! | Sample 0 | Sample 1 | ... | Sample N-1 |
//! | 2 bytes  | 2 bytes  |     | 2 bytes    |
//! +----------+----------+-----+------------+
//! ```
//!
//! In memory, samples are normalized `f32` in the nominal range [-1.0, 1.0].
//! Conversion divides by [`PCM_SCALE`] on decode and multiplies with
//! clamping on encode, so a full-scale wire sample survives a round trip
//! within one quantization step.

// =============================================================================
// Constants
// =============================================================================

/// Default negotiated sample rate in Hz.
///
/// Deployments negotiate the actual rate at channel open; this is the value
/// used when nothing else is configured. See
/// [`validators::validate_sample_rate`](crate::validators::validate_sample_rate)
/// for the full supported set.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Duration of one audio frame in milliseconds
pub const FRAME_DURATION_MS: u32 = 10;

/// Bytes per wire sample (16-bit PCM)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Scale factor between normalized float samples and 16-bit wire samples
pub const PCM_SCALE: f32 = 32767.0;

/// Number of samples in one frame at the given sample rate
///
/// All supported rates are multiples of 1000, so a 10ms frame is always a
/// whole number of samples (160 at 16kHz).
pub fn samples_per_frame(sample_rate: u32) -> usize {
    (sample_rate * FRAME_DURATION_MS / 1000) as usize
}

/// Number of bytes in one encoded frame at the given sample rate
pub fn frame_wire_len(sample_rate: u32) -> usize {
    samples_per_frame(sample_rate) * BYTES_PER_SAMPLE
}

// =============================================================================
// AudioFrame
// =============================================================================

/// A block of mono audio samples with arrival bookkeeping.
///
/// Created when a channel message is decoded or when capture produces a
/// frame; consumed exactly once by the render path or the transmit path.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Normalized mono samples at the negotiated sample rate
    pub samples: Vec<f32>,
    /// Arrival order within the owning channel (wrapping)
    pub sequence: u32,
    /// Raw byte length this frame occupied on the wire
    pub wire_bytes: usize,
}

impl AudioFrame {
    /// Create a frame from decoded samples
    pub fn new(samples: Vec<f32>, sequence: u32, wire_bytes: usize) -> Self {
        Self {
            samples,
            sequence,
            wire_bytes,
        }
    }

    /// Create a silence frame of the given length.
    ///
    /// Used by the transmit warm-up injector. `wire_bytes` reflects the
    /// encoded size so bitrate accounting stays accurate.
    pub fn silence(sample_count: usize, sequence: u32) -> Self {
        Self {
            samples: vec![0.0; sample_count],
            sequence,
            wire_bytes: sample_count * BYTES_PER_SAMPLE,
        }
    }

    /// Number of samples in this frame
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the frame contains no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// =============================================================================
// Wire Conversion
// =============================================================================

/// Encode normalized float samples to 16-bit little-endian PCM.
///
/// Each sample is scaled by [`PCM_SCALE`], clamped to the 16-bit range, and
/// truncated to integer. Out-of-range input therefore saturates instead of
/// wrapping.
pub fn encode_samples(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        let value = (sample * PCM_SCALE).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode 16-bit little-endian PCM to normalized float samples.
///
/// # Returns
///
/// * `Some(samples)` - Decoded mono samples
/// * `None` - Payload was empty or not a whole number of samples
pub fn decode_samples(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.is_empty() || bytes.len() % BYTES_PER_SAMPLE != 0 {
        return None;
    }

    let samples = bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM_SCALE)
        .collect();
    Some(samples)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// One quantization step in the normalized float domain
    const LSB: f32 = 1.0 / PCM_SCALE;

    #[test]
    fn test_samples_per_frame() {
        assert_eq!(samples_per_frame(8000), 80);
        assert_eq!(samples_per_frame(12000), 120);
        assert_eq!(samples_per_frame(16000), 160);
        assert_eq!(samples_per_frame(24000), 240);
    }

    #[test]
    fn test_frame_wire_len() {
        assert_eq!(frame_wire_len(16000), 320);
        assert_eq!(frame_wire_len(8000), 160);
    }

    #[test]
    fn test_encode_known_values() {
        let bytes = encode_samples(&[0.0, 1.0, -1.0]);
        assert_eq!(bytes.len(), 6);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 0);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), 32767);
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), -32767);
    }

    #[test]
    fn test_encode_clamps_out_of_range() {
        let bytes = encode_samples(&[2.0, -2.0]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), i16::MIN);
    }

    #[test]
    fn test_decode_known_values() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0i16.to_le_bytes());
        bytes.extend_from_slice(&32767i16.to_le_bytes());
        bytes.extend_from_slice(&(-32767i16).to_le_bytes());

        let samples = decode_samples(&bytes).expect("valid payload");
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], 1.0);
        assert_eq!(samples[2], -1.0);
    }

    #[test]
    fn test_decode_rejects_empty() {
        assert_eq!(decode_samples(&[]), None);
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert_eq!(decode_samples(&[0x00]), None);
        assert_eq!(decode_samples(&[0x00, 0x01, 0x02]), None);
    }

    #[test]
    fn test_round_trip_within_one_lsb() {
        // Sweep the normalized range; truncation may lose up to one step
        let samples: Vec<f32> = (-100..=100).map(|i| i as f32 / 100.0).collect();
        let decoded = decode_samples(&encode_samples(&samples)).expect("valid payload");

        assert_eq!(decoded.len(), samples.len());
        for (original, recovered) in samples.iter().zip(decoded.iter()) {
            assert!(
                (original - recovered).abs() <= LSB * 1.001,
                "sample {} round-tripped to {} (error {})",
                original,
                recovered,
                (original - recovered).abs()
            );
        }
    }

    #[test]
    fn test_wire_round_trip_exact_for_full_scale() {
        // Full-scale negative wire value must survive decode/encode exactly
        let bytes = i16::MIN.to_le_bytes().to_vec();
        let samples = decode_samples(&bytes).expect("valid payload");
        assert!(samples[0] < -1.0, "i16::MIN decodes slightly below -1.0");
        assert_eq!(encode_samples(&samples), bytes);
    }

    #[test]
    fn test_silence_frame() {
        let frame = AudioFrame::silence(160, 7);
        assert_eq!(frame.len(), 160);
        assert_eq!(frame.sequence, 7);
        assert_eq!(frame.wire_bytes, 320);
        assert!(frame.samples.iter().all(|&s| s == 0.0));
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_frame_accessors() {
        let frame = AudioFrame::new(vec![0.5, -0.5], 42, 4);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.sequence, 42);
        assert_eq!(frame.wire_bytes, 4);
    }
}
