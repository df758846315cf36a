//! Audio device management and streaming
//!
//! Microphone capture and speaker playback through cpal, opened at the
//! session's negotiated sample rate. Mono is preferred on both sides;
//! stereo devices are downmixed on capture and duplicated on playback.
//! Samples are f32 throughout, matching the rest of the pipeline.
//!
//! Device callbacks run on real-time audio threads. The playback callback
//! pulls from the shared jitter buffer with `try_lock` and falls back to
//! silence rather than blocking; the capture callback appends to a bounded
//! buffer the session drains on its pipeline tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, FromSample, Host, Sample, SampleFormat, Stream, StreamConfig,
    SupportedStreamConfigRange,
};

use riglink_common::frame::samples_per_frame;

use crate::jitter::JitterBuffer;

// =============================================================================
// Constants
// =============================================================================

/// Maximum capture backlog in frames (prevents unbounded growth if the
/// session stalls between pipeline ticks)
const MAX_CAPTURE_BUFFER_FRAMES: usize = 10;

/// Sample formats the stream builders can convert from and to
const SUPPORTED_FORMATS: [SampleFormat; 3] =
    [SampleFormat::F32, SampleFormat::I16, SampleFormat::U16];

// =============================================================================
// Device Selection
// =============================================================================

/// Get the default audio host for the platform
fn get_host() -> Host {
    cpal::default_host()
}

/// Find an input device by name, or return the default
fn find_input_device(name: &str) -> Option<Device> {
    let host = get_host();

    if name.is_empty() {
        return host.default_input_device();
    }

    host.input_devices()
        .ok()?
        .find(|d| d.description().is_ok_and(|desc| desc.name() == name))
        .or_else(|| host.default_input_device())
}

/// Find an output device by name, or return the default
fn find_output_device(name: &str) -> Option<Device> {
    let host = get_host();

    if name.is_empty() {
        return host.default_output_device();
    }

    host.output_devices()
        .ok()?
        .find(|d| d.description().is_ok_and(|desc| desc.name() == name))
        .or_else(|| host.default_output_device())
}

/// Pick channel count and sample format for the requested rate
///
/// Prefers mono; falls back to stereo. Returns `None` if the device cannot
/// run at `sample_rate` in any format the stream builders handle.
fn pick_channel_format(
    configs: &[SupportedStreamConfigRange],
    sample_rate: u32,
) -> Option<(u16, SampleFormat)> {
    for channels in [1u16, 2] {
        let found = configs.iter().find(|c| {
            c.channels() == channels
                && c.min_sample_rate() <= sample_rate
                && c.max_sample_rate() >= sample_rate
                && SUPPORTED_FORMATS.contains(&c.sample_format())
        });
        if let Some(cfg) = found {
            return Some((channels, cfg.sample_format()));
        }
    }
    None
}

/// Describe a device's supported rate ranges for error messages
fn describe_supported_rates(configs: &[SupportedStreamConfigRange]) -> String {
    let rates: Vec<String> = configs
        .iter()
        .map(|c| {
            if c.min_sample_rate() == c.max_sample_rate() {
                format!("{}Hz", c.min_sample_rate())
            } else {
                format!("{}-{}Hz", c.min_sample_rate(), c.max_sample_rate())
            }
        })
        .collect();

    if rates.is_empty() {
        "unknown".to_string()
    } else {
        rates.join(", ")
    }
}

// =============================================================================
// Audio Capture
// =============================================================================

/// Microphone capture at the negotiated sample rate
///
/// Capture is gated by an active flag: the stream exists for the whole
/// session, but samples are only collected while transmitting. Stopping
/// clears the backlog so a later transmit never starts with stale audio.
pub struct AudioCapture {
    /// The cpal input stream
    _stream: Stream,
    /// Captured samples awaiting the session's pipeline tick
    buffer: Arc<Mutex<Vec<f32>>>,
    /// Whether samples are currently being collected
    active: Arc<AtomicBool>,
    /// Receiver for audio stream errors
    error_rx: std_mpsc::Receiver<String>,
    /// Samples per 10ms frame at the negotiated rate
    frame_samples: usize,
}

impl AudioCapture {
    /// Open a capture stream on the named device
    ///
    /// # Arguments
    /// * `device_name` - Device name, or empty string for system default
    /// * `sample_rate` - Negotiated session rate in Hz
    ///
    /// # Returns
    /// * `Ok(AudioCapture)` - Stream open, not yet collecting
    /// * `Err(String)` - Device missing or unusable at this rate
    pub fn new(device_name: &str, sample_rate: u32) -> Result<Self, String> {
        let device =
            find_input_device(device_name).ok_or_else(|| "Input device not found".to_string())?;

        let configs: Vec<_> = device
            .supported_input_configs()
            .map_err(|e| format!("Failed to get supported configs: {}", e))?
            .collect();

        let (channels, sample_format) =
            pick_channel_format(&configs, sample_rate).ok_or_else(|| {
                format!(
                    "Input device doesn't support {}Hz. Device supports: {}",
                    sample_rate,
                    describe_supported_rates(&configs)
                )
            })?;

        let frame_samples = samples_per_frame(sample_rate);
        let buffer = Arc::new(Mutex::new(Vec::with_capacity(
            frame_samples * MAX_CAPTURE_BUFFER_FRAMES,
        )));
        let buffer_clone = buffer.clone();
        let active = Arc::new(AtomicBool::new(false));
        let active_clone = active.clone();

        let (error_tx, error_rx) = std_mpsc::channel();

        let config = StreamConfig {
            channels,
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        let max_backlog = frame_samples * MAX_CAPTURE_BUFFER_FRAMES;

        let stream = match sample_format {
            SampleFormat::F32 => build_capture_stream::<f32>(
                &device,
                &config,
                buffer_clone,
                active_clone,
                error_tx,
                max_backlog,
            ),
            SampleFormat::I16 => build_capture_stream::<i16>(
                &device,
                &config,
                buffer_clone,
                active_clone,
                error_tx,
                max_backlog,
            ),
            SampleFormat::U16 => build_capture_stream::<u16>(
                &device,
                &config,
                buffer_clone,
                active_clone,
                error_tx,
                max_backlog,
            ),
            _ => return Err(format!("Unsupported sample format: {:?}", sample_format)),
        }?;

        Ok(Self {
            _stream: stream,
            buffer,
            active,
            error_rx,
            frame_samples,
        })
    }

    /// Start collecting samples
    pub fn start(&self) -> Result<(), String> {
        self.active.store(true, Ordering::SeqCst);
        self._stream
            .play()
            .map_err(|e| format!("Failed to start capture: {}", e))
    }

    /// Stop collecting and clear the backlog
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    /// Whether samples are currently being collected
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Take one frame of captured samples, if a full frame is ready
    pub fn take_frame(&self) -> Option<Vec<f32>> {
        let mut buffer = self.buffer.lock().ok()?;
        if buffer.len() >= self.frame_samples {
            Some(buffer.drain(..self.frame_samples).collect())
        } else {
            None
        }
    }

    /// Check for audio stream errors (non-blocking)
    ///
    /// Only the first error matters; the session tears down on any of them.
    pub fn check_error(&self) -> Option<String> {
        self.error_rx.try_recv().ok()
    }
}

/// Build a capture stream, downmixing stereo input to mono
fn build_capture_stream<T>(
    device: &Device,
    config: &StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    active: Arc<AtomicBool>,
    error_tx: std_mpsc::Sender<String>,
    max_backlog: usize,
) -> Result<Stream, String>
where
    T: Sample + cpal::SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if active.load(Ordering::SeqCst)
                    && let Ok(mut buf) = buffer.lock()
                {
                    if channels == 1 {
                        for sample in data {
                            buf.push(f32::from_sample(*sample));
                        }
                    } else {
                        // Average each interleaved pair down to one sample
                        for chunk in data.chunks_exact(channels) {
                            let left = f32::from_sample(chunk[0]);
                            let right = f32::from_sample(chunk[1]);
                            buf.push((left + right) * 0.5);
                        }
                    }
                    if buf.len() > max_backlog {
                        let drain_count = buf.len() - max_backlog;
                        buf.drain(..drain_count);
                    }
                }
            },
            {
                let error_tx = error_tx.clone();
                move |err| {
                    let _ = error_tx.send(format!("Audio capture error: {}", err));
                }
            },
            None,
        )
        .map_err(|e| format!("Failed to build capture stream: {}", e))
}

// =============================================================================
// Audio Playback
// =============================================================================

/// Speaker playback fed from the shared jitter buffer
///
/// The device callback renders directly from the buffer, so playback
/// latency is the buffer depth plus the device period. There is no
/// per-session mixing; one receive stream feeds one output.
pub struct AudioPlayback {
    /// The cpal output stream
    _stream: Stream,
    /// Whether the callback is rendering (false outputs silence)
    active: Arc<AtomicBool>,
    /// Receiver for audio stream errors
    error_rx: std_mpsc::Receiver<String>,
}

impl AudioPlayback {
    /// Open a playback stream on the named device
    ///
    /// # Arguments
    /// * `device_name` - Device name, or empty string for system default
    /// * `sample_rate` - Negotiated session rate in Hz
    /// * `buffer` - Jitter buffer the callback renders from
    ///
    /// # Returns
    /// * `Ok(AudioPlayback)` - Stream open, not yet playing
    /// * `Err(String)` - Device missing or unusable at this rate
    pub fn new(
        device_name: &str,
        sample_rate: u32,
        buffer: Arc<Mutex<JitterBuffer>>,
    ) -> Result<Self, String> {
        let device =
            find_output_device(device_name).ok_or_else(|| "Output device not found".to_string())?;

        let configs: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| format!("Failed to get supported configs: {}", e))?
            .collect();

        let (channels, sample_format) =
            pick_channel_format(&configs, sample_rate).ok_or_else(|| {
                format!(
                    "Output device doesn't support {}Hz. Device supports: {}",
                    sample_rate,
                    describe_supported_rates(&configs)
                )
            })?;

        let active = Arc::new(AtomicBool::new(false));
        let active_clone = active.clone();

        let (error_tx, error_rx) = std_mpsc::channel();

        let config = StreamConfig {
            channels,
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match sample_format {
            SampleFormat::F32 => {
                build_playback_stream::<f32>(&device, &config, buffer, active_clone, error_tx)
            }
            SampleFormat::I16 => {
                build_playback_stream::<i16>(&device, &config, buffer, active_clone, error_tx)
            }
            SampleFormat::U16 => {
                build_playback_stream::<u16>(&device, &config, buffer, active_clone, error_tx)
            }
            _ => return Err(format!("Unsupported sample format: {:?}", sample_format)),
        }?;

        Ok(Self {
            _stream: stream,
            active,
            error_rx,
        })
    }

    /// Start playback
    pub fn start(&self) -> Result<(), String> {
        self.active.store(true, Ordering::SeqCst);
        self._stream
            .play()
            .map_err(|e| format!("Failed to start playback: {}", e))
    }

    /// Stop playback
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        let _ = self._stream.pause();
    }

    /// Check for audio stream errors (non-blocking)
    pub fn check_error(&self) -> Option<String> {
        self.error_rx.try_recv().ok()
    }
}

/// Build a playback stream, duplicating mono renders across stereo output
fn build_playback_stream<T>(
    device: &Device,
    config: &StreamConfig,
    buffer: Arc<Mutex<JitterBuffer>>,
    active: Arc<AtomicBool>,
    error_tx: std_mpsc::Sender<String>,
) -> Result<Stream, String>
where
    T: Sample + cpal::SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    // Mono scratch the callback renders into before fan-out; reaches the
    // device period size after the first callbacks and stops allocating
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let needed = data.len() / channels;
                scratch.resize(needed, 0.0);

                let mut rendered = false;
                if active.load(Ordering::SeqCst)
                    && let Ok(mut jitter) = buffer.try_lock()
                {
                    jitter.render(&mut scratch);
                    rendered = true;
                }
                if !rendered {
                    // Inactive or the session thread holds the lock: silence
                    scratch.fill(0.0);
                }

                if channels == 1 {
                    for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                        *dst = T::from_sample(src);
                    }
                } else {
                    for (chunk, &src) in data.chunks_exact_mut(channels).zip(scratch.iter()) {
                        let sample = T::from_sample(src);
                        for dst in chunk {
                            *dst = sample;
                        }
                    }
                }
            },
            {
                let error_tx = error_tx.clone();
                move |err| {
                    let _ = error_tx.send(format!("Audio playback error: {}", err));
                }
            },
            None,
        )
        .map_err(|e| format!("Failed to build playback stream: {}", e))
}

// =============================================================================
// Tests
// =============================================================================
