//! The TTS-DSP adapter: splits text, drives synthesis through a caller-
//! supplied synthesizer, applies the effects chain, and exposes monotonic
//! char-position progress.

use std::time::{Duration, Instant};

use crate::config::{SynthMode, VoiceModConfig};
use crate::error::Result;
use crate::events::TtsEvent;

use super::chunker::{chunk_text, cumulative_offsets};
use super::dsp::apply_chain;

/// The upstream synthesizer's contract, deliberately out of scope here:
/// given one chunk of text, produce mono PCM at 24 kHz. Implementations
/// live in `show-runtime`.
pub trait Synthesizer {
    fn synthesize(&mut self, text: &str) -> Result<Vec<f32>>;
}

/// The audio sink the adapter drains finished chunks into. Implementations
/// own the cpal output stream exclusively — the audio device belongs to the
/// TTS thread alone.
pub trait AudioSink {
    /// Blocks until the device has accepted (not necessarily finished
    /// playing) the buffer.
    fn play_blocking(&mut self, pcm: &[f32]) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct TtsAdapterConfig {
    pub min_chunk_length: usize,
    /// Once a chunk's estimated playback reaches this fraction of its
    /// duration, progress jumps to the chunk's end immediately (the
    /// fast-finish rule; default 0.75).
    pub fast_finish_fraction: f32,
}

impl Default for TtsAdapterConfig {
    fn default() -> Self {
        Self { min_chunk_length: 3, fast_finish_fraction: 0.75 }
    }
}

/// Tracks one enqueued chunk's progress-reporting state.
struct ActiveChunk {
    offset: usize,
    len: usize,
    started_at: Instant,
    estimated_duration: Duration,
}

pub struct TtsAdapter {
    config: TtsAdapterConfig,
    voice_mod: VoiceModConfig,
    mode: SynthMode,
    pending: Vec<String>,
    active: Option<ActiveChunk>,
    total_chars: usize,
    cleared: bool,
}

/// ~50 Hz, the cadence used for realtime progress polling.
const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(20);

impl TtsAdapter {
    pub fn new(config: TtsAdapterConfig, voice_mod: VoiceModConfig, mode: SynthMode) -> Self {
        Self {
            config,
            voice_mod,
            mode,
            pending: Vec::new(),
            active: None,
            total_chars: 0,
            cleared: false,
        }
    }

    /// Append text to the speech queue; enqueuing while already speaking
    /// just appends to the pending list.
    pub fn enqueue(&mut self, text: &str) {
        let chunks = chunk_text(text, self.config.min_chunk_length);
        self.total_chars += chunks.iter().map(|c| c.chars().count()).sum::<usize>();
        self.pending.extend(chunks);
        self.cleared = false;
    }

    /// Drop pending chunks and stop at the next safe boundary; entering
    /// `Reset` cancels any in-flight TTS.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.active = None;
        self.cleared = true;
    }

    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    /// Drain and play chunks serially, one at a time; the caller invokes
    /// this in a loop on the TTS worker thread, posting the returned events
    /// onto its channel.
    pub fn run_to_completion(
        &mut self,
        synth: &mut impl Synthesizer,
        sink: &mut impl AudioSink,
        mut on_event: impl FnMut(TtsEvent),
    ) {
        if self.pending.is_empty() {
            return;
        }
        on_event(TtsEvent::Started);

        let chunks = std::mem::take(&mut self.pending);
        let offsets = cumulative_offsets(&chunks);

        for (chunk, offset) in chunks.into_iter().zip(offsets) {
            if self.cleared {
                break;
            }
            on_event(TtsEvent::Chunk(chunk.clone()));

            let pcm = match synth.synthesize(&chunk) {
                Ok(pcm) => pcm,
                Err(e) => {
                    on_event(TtsEvent::Error(e.to_string()));
                    continue;
                }
            };
            let processed = apply_chain(&pcm, &self.voice_mod);

            let estimated_duration =
                Duration::from_secs_f64(processed.len() as f64 / super::dsp::SAMPLE_RATE as f64);
            self.active = Some(ActiveChunk {
                offset,
                len: chunk.chars().count(),
                started_at: Instant::now(),
                estimated_duration,
            });

            if let Err(e) = sink.play_blocking(&processed) {
                on_event(TtsEvent::Error(e.to_string()));
                self.active = None;
                return;
            }

            let total = self.total_chars;
            let chunk_end = offset + chunk.chars().count();
            match self.mode {
                // Poll until the chunk drains from the device, posting progress
                // at the same cadence a real UI would read it at.
                SynthMode::Realtime => loop {
                    std::thread::sleep(PROGRESS_POLL_INTERVAL);
                    let Some((char_pos, total_chars)) = self.poll_progress(Instant::now()) else {
                        break;
                    };
                    on_event(TtsEvent::Progress { char_pos, total_chars });
                    if char_pos >= chunk_end {
                        break;
                    }
                },
                // No mid-chunk polling: wait for the chunk to drain, then post
                // one terminal progress event for the whole chunk.
                SynthMode::Batch => {
                    if let Some(active) = &self.active {
                        std::thread::sleep(active.estimated_duration);
                    }
                    on_event(TtsEvent::Progress { char_pos: chunk_end, total_chars: total });
                }
            }
            self.active = None;
        }

        if !self.cleared {
            on_event(TtsEvent::Finished);
        }
    }

    /// Poll-based progress for the currently playing chunk, to be called at
    /// ~50 Hz from the TTS worker while `play_blocking` would otherwise be
    /// opaque. Real `AudioSink` implementations that can report elapsed
    /// playback time should prefer driving `on_event` directly from device
    /// callbacks; this wall-clock estimate is the fallback used by the
    /// default sink.
    pub fn poll_progress(&self, now: Instant) -> Option<(usize, usize)> {
        let active = self.active.as_ref()?;
        let elapsed = now.saturating_duration_since(active.started_at);
        let frac = if active.estimated_duration.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f64() / active.estimated_duration.as_secs_f64()
        };
        // Fast-finish: once past the configured fraction, jump to chunk end.
        let frac = if frac >= self.config.fast_finish_fraction as f64 { 1.0 } else { frac };
        let within_chunk = (frac * active.len as f64).round() as usize;
        let char_pos = active.offset + within_chunk.min(active.len);
        Some((char_pos, self.total_chars))
    }
}
