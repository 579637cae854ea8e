pub mod voice_preview;
