//! show-core: the real-time choreography engine for the installation
//! controller — state machine, face tracker, caption/TTS co-scheduler,
//! overlay animator, serial dispatcher, and SSR lighting controller.
//!
//! Camera acquisition, face detection, the vision/language models, the TTS
//! synthesizer, image decoding, and the UI toolkit are all external
//! collaborators; this crate consumes their contracts (see [`contracts`])
//! and owns none of their implementations.

pub mod bbox;
pub mod caption;
pub mod conductor;
pub mod config;
pub mod contracts;
pub mod error;
pub mod events;
pub mod face_tracker;
pub mod llm;
pub mod overlay;
pub mod serial;
pub mod ssr;
pub mod telemetry;
pub mod tts;
pub mod weapon;

#[cfg(test)]
mod test_support;

pub use bbox::BoundingBox;
pub use conductor::{ConductorCommand, ConductorConfig, ConductorEvent, ShowConductor, ShowState};
pub use error::{Result, ShowError};
