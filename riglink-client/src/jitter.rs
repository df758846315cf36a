//! Playback jitter buffer
//!
//! Decouples bursty frame arrival from the audio device's steady sample
//! demand. The buffer holds decoded frames between a pre-roll watermark and
//! a hard capacity: output stays silent until the watermark is first
//! reached, and the oldest frames are dropped once capacity is exceeded.
//! Render requests are always filled completely, padding with silence when
//! the buffer runs dry, so the device callback never waits.

use std::collections::VecDeque;

use riglink_common::frame::AudioFrame;

// =============================================================================
// Jitter Buffer
// =============================================================================

/// Bounded playback buffer for a single receive stream
///
/// Frames are consumed sample-by-sample: a render request may stop partway
/// through a frame, and the next request continues from that position.
/// Once the pre-roll watermark has been reached the buffer stays primed for
/// the rest of its life; only [`flush`](JitterBuffer::flush) re-arms it.
pub struct JitterBuffer {
    /// Queued frames, oldest at the front
    queue: VecDeque<AudioFrame>,
    /// Samples of the front frame already rendered
    cursor: usize,
    /// Frames required before playback starts
    min_frames: usize,
    /// Frame capacity; overflow evicts from the front
    max_frames: usize,
    /// Whether the pre-roll watermark has been reached this session
    primed: bool,
    /// Frames evicted by overflow since creation
    frames_dropped: u64,
    /// Render calls that ran out of samples since creation
    underruns: u64,
}

impl JitterBuffer {
    /// Create a buffer with the given watermarks
    ///
    /// `min_frames` is raised to at least 1 and `max_frames` to at least
    /// `min_frames`, so a degenerate configuration still yields a working
    /// buffer.
    pub fn new(min_frames: usize, max_frames: usize) -> Self {
        let min_frames = min_frames.max(1);
        let max_frames = max_frames.max(min_frames);
        Self {
            queue: VecDeque::with_capacity(max_frames + 1),
            cursor: 0,
            min_frames,
            max_frames,
            primed: false,
            frames_dropped: 0,
            underruns: 0,
        }
    }

    /// Append a frame, evicting the oldest frames beyond capacity
    ///
    /// Eviction can remove a partially rendered front frame; its remaining
    /// samples are lost and playback continues at the next frame's start.
    pub fn push(&mut self, frame: AudioFrame) {
        self.queue.push_back(frame);
        while self.queue.len() > self.max_frames {
            self.queue.pop_front();
            self.cursor = 0;
            self.frames_dropped += 1;
        }
    }

    /// Fill `out` completely with the next samples to play
    ///
    /// Before the pre-roll watermark is reached the output is all silence
    /// and no frames are consumed. Afterwards the buffer drains in arrival
    /// order, zero-filling whatever it cannot cover.
    pub fn render(&mut self, out: &mut [f32]) {
        if !self.primed {
            if self.queue.len() < self.min_frames {
                out.fill(0.0);
                return;
            }
            self.primed = true;
        }

        let mut written = 0;
        while written < out.len() {
            let Some(front) = self.queue.front() else {
                break;
            };
            let available = front.len() - self.cursor;
            if available == 0 {
                self.queue.pop_front();
                self.cursor = 0;
                continue;
            }

            let take = available.min(out.len() - written);
            out[written..written + take]
                .copy_from_slice(&front.samples[self.cursor..self.cursor + take]);
            self.cursor += take;
            written += take;

            if self.cursor == front.len() {
                self.queue.pop_front();
                self.cursor = 0;
            }
        }

        if written < out.len() {
            out[written..].fill(0.0);
            self.underruns += 1;
        }
    }

    /// Discard all queued audio and re-arm the pre-roll watermark
    ///
    /// Lifetime counters are preserved; a flush is deliberate, not a drop.
    pub fn flush(&mut self) {
        self.queue.clear();
        self.cursor = 0;
        self.primed = false;
    }

    /// Number of queued frames, counting a partially rendered front frame
    pub fn depth(&self) -> usize {
        self.queue.len()
    }

    /// Whether the pre-roll watermark has been reached
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Frames evicted by overflow since creation
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Render calls that ran out of samples since creation
    pub fn underruns(&self) -> u64 {
        self.underruns
    }
}

// =============================================================================
// Tests
// =============================================================================
