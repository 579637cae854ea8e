//! TTS-DSP adapter: chunking, synthesis hand-off, effects chain, and
//! progress reporting.

mod adapter;
mod chunker;
pub mod dsp;

pub use adapter::{AudioSink, Synthesizer, TtsAdapter, TtsAdapterConfig};
pub use chunker::chunk_text;
