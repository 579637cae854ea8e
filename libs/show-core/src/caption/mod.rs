//! Caption engine: typed bilingual subtitles synchronized to TTS progress.

mod session;
mod wrap;

pub use session::{CaptionEngine, CaptionEngineConfig, DisplayMode};
pub use wrap::{WrappedText, wrap_lines};
