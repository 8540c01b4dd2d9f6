//! Microphone capture behind a capability seam.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It **must not**:
//! - Allocate heap memory
//! - Block on a mutex or condvar
//! - Perform I/O
//!
//! The callback therefore writes into a lock-free SPSC ring buffer; a
//! dedicated session thread drains the ring into an accumulator at its own
//! pace.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). The stream is created and dropped on the session thread, never
//! crossing a thread boundary. `acquire` blocks until that thread confirms
//! the device opened (or reports why it did not), so a card can move straight
//! to its error state without ever having "recorded".

pub mod clip;
pub mod device;

use crate::error::{Result, RoundupError};

pub use clip::AudioClip;

/// Capability seam over the platform audio API.
///
/// One backend serves the whole board; every recording gets its own session.
pub trait CaptureBackend: Send + Sync + 'static {
    /// Open an input device and start accumulating audio immediately.
    ///
    /// # Errors
    /// `RoundupError::MicAccessDenied` when the OS refuses the device,
    /// `RoundupError::NoDefaultInputDevice` when none exists, otherwise
    /// `RoundupError::CaptureDevice` / `CaptureStream`.
    fn acquire(&self, preferred_device: Option<&str>) -> Result<Box<dyn CaptureSession>>;
}

/// A live recording. Exactly one of these exists per recording card.
///
/// `finish` consumes the session, so the underlying device is released
/// exactly once. Dropping an unfinished session releases the device too
/// (abrupt-teardown path) — the clip is simply discarded.
pub trait CaptureSession: Send {
    /// Stop capturing, release the device, and return the encoded clip.
    fn finish(self: Box<Self>) -> Result<AudioClip>;
}

/// Case-insensitive device-name match used to resolve a preferred input.
pub(crate) fn matches_preference(device_name: &str, preferred: &str) -> bool {
    device_name.trim().eq_ignore_ascii_case(preferred.trim())
}

#[cfg(feature = "audio-cpal")]
pub use cpal_backend::CpalBackend;

#[cfg(feature = "audio-cpal")]
mod cpal_backend {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };
    use std::time::Duration;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleFormat, SampleRate, StreamConfig};
    use crossbeam_channel::{bounded, Receiver, Sender};
    use ringbuf::{
        traits::{Consumer, Producer, Split},
        HeapProd, HeapRb,
    };
    use tracing::{error, info, warn};

    use super::{matches_preference, AudioClip, CaptureBackend, CaptureSession};
    use crate::error::{Result, RoundupError};

    /// Ring capacity: 2^21 f32 samples ≈ 43 s at 48 kHz. The session thread
    /// drains every 20 ms, so this is pure headroom against scheduling stalls.
    const RING_CAPACITY: usize = 1 << 21;

    /// Session-thread drain interval.
    const DRAIN_INTERVAL: Duration = Duration::from_millis(20);

    /// How long `finish` waits for the session thread to hand over samples.
    const FINISH_TIMEOUT: Duration = Duration::from_secs(5);

    /// cpal-backed capture. Stateless; one instance serves all cards.
    pub struct CpalBackend;

    impl CaptureBackend for CpalBackend {
        fn acquire(&self, preferred_device: Option<&str>) -> Result<Box<dyn CaptureSession>> {
            let running = Arc::new(AtomicBool::new(true));
            let (open_tx, open_rx) = bounded::<Result<u32>>(1);
            let (clip_tx, clip_rx) = bounded::<(Vec<f32>, u32)>(1);

            let thread_running = Arc::clone(&running);
            let preferred = preferred_device.map(str::to_string);
            std::thread::Builder::new()
                .name("roundup-capture".into())
                .spawn(move || {
                    session_thread(thread_running, preferred.as_deref(), open_tx, clip_tx)
                })
                .map_err(|e| RoundupError::CaptureStream(e.to_string()))?;

            // Block until the device is confirmed open (or fails). The thread
            // sends exactly one message here before entering its drain loop.
            match open_rx.recv() {
                Ok(Ok(sample_rate)) => {
                    info!(sample_rate, "capture session opened");
                    Ok(Box::new(CpalSession { running, clip_rx }))
                }
                Ok(Err(e)) => Err(e),
                Err(_) => Err(RoundupError::CaptureStream(
                    "capture thread died before opening the device".into(),
                )),
            }
        }
    }

    struct CpalSession {
        running: Arc<AtomicBool>,
        clip_rx: Receiver<(Vec<f32>, u32)>,
    }

    impl CaptureSession for CpalSession {
        fn finish(self: Box<Self>) -> Result<AudioClip> {
            self.running.store(false, Ordering::Release);
            let (samples, sample_rate) = self
                .clip_rx
                .recv_timeout(FINISH_TIMEOUT)
                .map_err(|_| RoundupError::CaptureStream("capture thread did not finalize".into()))?;
            AudioClip::from_samples(&samples, sample_rate)
        }
    }

    impl Drop for CpalSession {
        fn drop(&mut self) {
            // Abrupt teardown (card deleted, board dropped): stop the thread,
            // which drops the stream on its own thread and exits.
            self.running.store(false, Ordering::Release);
        }
    }

    /// Owns the cpal stream for the whole recording. Runs until `running`
    /// flips to false, then hands the accumulated samples back and drops the
    /// stream, releasing the device on this thread.
    fn session_thread(
        running: Arc<AtomicBool>,
        preferred_device: Option<&str>,
        open_tx: Sender<Result<u32>>,
        clip_tx: Sender<(Vec<f32>, u32)>,
    ) {
        let (producer, mut consumer) = HeapRb::<f32>::new(RING_CAPACITY).split();

        let (stream, sample_rate) =
            match open_stream(producer, Arc::clone(&running), preferred_device) {
                Ok(pair) => {
                    let _ = open_tx.send(Ok(pair.1));
                    pair
                }
                Err(e) => {
                    let _ = open_tx.send(Err(e));
                    return;
                }
            };

        let mut accumulated: Vec<f32> = Vec::with_capacity(sample_rate as usize * 30);
        let mut scratch = vec![0f32; 4096];

        loop {
            let n = consumer.pop_slice(&mut scratch);
            accumulated.extend_from_slice(&scratch[..n]);
            if !running.load(Ordering::Acquire) {
                break;
            }
            if n == 0 {
                std::thread::sleep(DRAIN_INTERVAL);
            }
        }

        // Final drain after stop so the clip keeps the tail of the utterance.
        loop {
            let n = consumer.pop_slice(&mut scratch);
            if n == 0 {
                break;
            }
            accumulated.extend_from_slice(&scratch[..n]);
        }

        let _ = clip_tx.send((accumulated, sample_rate));
        drop(stream);
    }

    fn open_stream(
        mut producer: HeapProd<f32>,
        running: Arc<AtomicBool>,
        preferred_device: Option<&str>,
    ) -> Result<(cpal::Stream, u32)> {
        let host = cpal::default_host();

        let mut selected = None;
        if let Some(preferred) = preferred_device {
            match host.input_devices() {
                Ok(mut devices) => {
                    selected = devices.find(|d| {
                        d.name()
                            .map(|name| matches_preference(&name, preferred))
                            .unwrap_or(false)
                    });
                    if selected.is_none() {
                        warn!("preferred input device '{preferred}' not found, falling back");
                    }
                }
                Err(e) => warn!("failed to list input devices while resolving preference: {e}"),
            }
        }

        let device = match selected.or_else(|| host.default_input_device()) {
            Some(d) => d,
            None => return Err(RoundupError::NoDefaultInputDevice),
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| map_device_error(e.to_string()))?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let running_f32 = Arc::clone(&running);
        let running_i16 = Arc::clone(&running);

        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                let ch = channels as usize;
                let mut mix_buf: Vec<f32> = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _info| {
                        if !running_f32.load(Ordering::Relaxed) {
                            return;
                        }
                        push_mono(&mut producer, &mut mix_buf, data, ch, |s| s);
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                )
            }
            SampleFormat::I16 => {
                let ch = channels as usize;
                let mut mix_buf: Vec<f32> = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _info| {
                        if !running_i16.load(Ordering::Relaxed) {
                            return;
                        }
                        push_mono(&mut producer, &mut mix_buf, data, ch, |s| {
                            s as f32 / 32768.0
                        });
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                )
            }
            fmt => {
                return Err(RoundupError::CaptureStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| map_capture_error(e.to_string()))?;

        stream
            .play()
            .map_err(|e| map_capture_error(e.to_string()))?;

        Ok((stream, sample_rate))
    }

    /// Mix interleaved frames down to mono and push into the ring.
    ///
    /// `mix_buf` is owned by the callback closure and reused, so the only
    /// allocation happens on the first (largest) callback.
    fn push_mono<S: Copy>(
        producer: &mut HeapProd<f32>,
        mix_buf: &mut Vec<f32>,
        data: &[S],
        channels: usize,
        convert: impl Fn(S) -> f32,
    ) {
        let frames = data.len() / channels;
        mix_buf.resize(frames, 0.0);
        for f in 0..frames {
            let base = f * channels;
            let mut sum = 0f32;
            for c in 0..channels {
                sum += convert(data[base + c]);
            }
            mix_buf[f] = sum / channels as f32;
        }
        let written = producer.push_slice(mix_buf);
        if written < mix_buf.len() {
            warn!("ring buffer full: dropped {} frames", mix_buf.len() - written);
        }
    }

    /// Permission refusals surface as the user-facing mic-access error; other
    /// stream failures keep their platform message.
    fn map_capture_error(message: String) -> RoundupError {
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("denied") || lowered.contains("permission") {
            RoundupError::MicAccessDenied
        } else {
            RoundupError::CaptureStream(message)
        }
    }

    /// Same permission check for failures while querying the device itself
    /// (before any stream exists).
    fn map_device_error(message: String) -> RoundupError {
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("denied") || lowered.contains("permission") {
            RoundupError::MicAccessDenied
        } else {
            RoundupError::CaptureDevice(message)
        }
    }

}

#[cfg(test)]
mod tests {
    use super::matches_preference;

    #[test]
    fn preference_match_ignores_case_and_padding() {
        assert!(matches_preference("USB Microphone", " usb microphone "));
        assert!(!matches_preference("USB Microphone", "Built-in"));
    }
}
