//! Traits the core consumes but does not implement: camera acquisition,
//! face detection, and the LLM pair. `show-runtime` supplies concrete
//! adapters; tests supply stubs.

use std::path::Path;

use crate::bbox::BoundingBox;
use crate::error::Result;
use crate::llm::LlmResponse;

/// Produces frames; out of scope is *how* (v4l2, AVFoundation, DirectShow),
/// in scope is only that it can be asked for the next one. Implementations
/// are expected to block on acquisition.
pub trait FrameSource {
    /// Opaque RGB/BGR frame buffer; the detector and screenshot writer are
    /// the only consumers and agree on layout out of band.
    type Frame;

    fn next_frame(&mut self) -> Result<Self::Frame>;
}

/// Wraps whatever face-detection backend is in use; returns at most one box
/// per frame, already the largest selected upstream.
pub trait FaceDetector<F> {
    fn detect(&mut self, frame: &F) -> Result<Option<BoundingBox>>;
}

/// Writes a frame to disk as the trigger screenshot on entering
/// `ScreenshotTrigger`.
pub trait ScreenshotWriter<F> {
    fn write(&mut self, frame: &F, path: &Path) -> Result<()>;
}

/// The two-model LLM pipeline (vision summary, then captioned tool
/// selection) behind one call.
pub trait LlmClient {
    fn describe_and_select(&mut self, screenshot: &Path, tool_list: &[String]) -> Result<LlmResponse>;
}
