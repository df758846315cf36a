//! Frame codec adapters
//!
//! Converts between wire payloads and in-memory audio frames at the channel
//! boundary. The codec is the only stage that touches the wire sample format;
//! the rest of the pipeline works in f32. Each direction gets its own adapter
//! so sequence numbering and bitrate accounting stay per-channel.

use std::sync::Arc;

use tracing::warn;

use riglink_common::frame::{AudioFrame, decode_samples, encode_samples};

use crate::telemetry::BitrateCounter;

// =============================================================================
// Frame Codec
// =============================================================================

/// Conversion between wire payloads and audio frames for one direction
///
/// Implementations are free to change the wire format (compression, a
/// different sample width) as long as both sides of the link agree. The
/// session holds codecs as trait objects so a format change never touches
/// the pipeline around them.
pub trait FrameCodec: Send {
    /// Decode one wire payload into an audio frame
    ///
    /// # Returns
    /// * `Some(frame)` - Decoded frame, stamped with the next sequence number
    /// * `None` - Payload was malformed and has been discarded
    fn decode(&mut self, payload: &[u8]) -> Option<AudioFrame>;

    /// Encode one audio frame into a wire payload
    fn encode(&mut self, frame: &AudioFrame) -> Vec<u8>;
}

// =============================================================================
// PCM Codec
// =============================================================================

/// Little-endian 16-bit PCM codec
///
/// The native wire format: each sample is an i16, two bytes, least
/// significant byte first. Decoding normalizes to f32, encoding clamps and
/// truncates back. All traffic through the adapter is recorded against its
/// bitrate counter.
pub struct PcmCodec {
    /// Counter for the direction this adapter serves
    bitrate: Arc<BitrateCounter>,
    /// Sequence number for the next decoded frame
    next_sequence: u32,
}

impl PcmCodec {
    /// Create a codec that records traffic against the given counter
    pub fn new(bitrate: Arc<BitrateCounter>) -> Self {
        Self {
            bitrate,
            next_sequence: 0,
        }
    }
}

impl FrameCodec for PcmCodec {
    fn decode(&mut self, payload: &[u8]) -> Option<AudioFrame> {
        // Count what arrived on the wire, well-formed or not
        self.bitrate.record(payload.len());

        let Some(samples) = decode_samples(payload) else {
            warn!(bytes = payload.len(), "discarding malformed audio payload");
            return None;
        };

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        Some(AudioFrame::new(samples, sequence, payload.len()))
    }

    fn encode(&mut self, frame: &AudioFrame) -> Vec<u8> {
        let payload = encode_samples(&frame.samples);
        self.bitrate.record(payload.len());
        payload
    }
}

// Test-only methods
#[cfg(test)]
impl PcmCodec {
    /// Create a codec with a preset sequence number (test-only)
    pub fn with_sequence(bitrate: Arc<BitrateCounter>, next_sequence: u32) -> Self {
        Self {
            bitrate,
            next_sequence,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
