//! Typed, per-component event channels, modeling global singletons as an
//! explicit event bus instead. There is no shared dispatch table; each
//! producer owns a bounded `crossbeam_channel` and hands clones of the
//! sender to whoever needs to post to it. This is the message-passing seam
//! that lets the caption engine, TTS adapter, serial dispatcher and SSR
//! controller run on independent threads.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::llm::LlmResponse;

/// A bounded channel pair with the capacity convention used across the
/// engine: event producers never block the main/UI thread, so every channel
/// here is created with headroom and producers drop (and log) rather than
/// block when it's full.
pub fn channel<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    crossbeam_channel::bounded(capacity)
}

/// Post best-effort: never blocks. A full channel means a consumer has
/// stalled; that is logged once here as a transient condition rather than
/// propagated as a hard error.
pub fn try_post<T>(sender: &Sender<T>, event: T, what: &str) {
    if sender.try_send(event).is_err() {
        tracing::warn!(channel = what, "event dropped: receiver is not keeping up");
    }
}

/// Inputs the show conductor reacts to. `ScreenshotSaved` is the first
/// downstream signal that the screenshot-trigger transition needs to exit
/// on, made explicit here as its own event variant.
#[derive(Debug, Clone)]
pub enum ConductorEvent {
    FrameFaceUpdate(bool),
    ScreenshotSaved(std::path::PathBuf),
    LlmReady(LlmResponse),
    CaptionComplete,
    SpotlightReady,
    WeaponSequenceComplete,
    CooldownElapsed,
}

/// Outputs the show conductor emits.
#[derive(Debug, Clone)]
pub enum ConductorCommand {
    RequestScreenshot,
    RequestLlm(std::path::PathBuf),
    RequestCaptionDisplay(LlmResponse),
    RequestSpotlight,
    RequestWeaponDisplay(Vec<String>),
    RequestReset,
}

/// Posted by the caption engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionEvent {
    EnglishDone,
    TraditionalChineseDone,
    AllDone,
}

/// Posted by the TTS-DSP adapter.
#[derive(Debug, Clone)]
pub enum TtsEvent {
    Started,
    Progress { char_pos: usize, total_chars: usize },
    Chunk(String),
    Finished,
    Error(String),
}

/// Posted by the SSR controller.
#[derive(Debug, Clone, Copy)]
pub enum SsrEvent {
    CaptionLightingReady,
    SpotlightReady,
}

/// Face-detection thread output.
#[derive(Debug, Clone)]
pub struct DetectionFrame {
    pub bbox: Option<crate::bbox::BoundingBox>,
    pub elapsed_since_start: Duration,
}
