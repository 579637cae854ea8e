//! `tts_config.txt`: `key=value` lines controlling the synthesizer adapter.

use std::path::Path;

use crate::error::Result;

use super::kv::parse_kv_file;

/// Whether the TTS adapter reports progress as it synthesizes (realtime) or
/// only after a whole chunk finishes (batch). See SUPPLEMENTED FEATURES: the
/// original's `realtime_mode` flag, default `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthMode {
    Realtime,
    Batch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtsConfig {
    pub enabled: bool,
    pub mode: SynthMode,
    pub voice: String,
    /// Playback speed multiplier, 0.5-2.0.
    pub speed: f32,
    pub min_english_chars: u32,
    pub max_chunk_length: u32,
    pub min_chunk_length: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: SynthMode::Realtime,
            voice: "default".to_string(),
            speed: 1.0,
            min_english_chars: 3,
            max_chunk_length: 200,
            min_chunk_length: 3,
        }
    }
}

impl TtsConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut cfg = Self::default();
        let kv = parse_kv_file(path, "tts_config.txt")?;
        for (key, raw) in kv {
            match key.as_str() {
                "enabled" => cfg.enabled = parse_bool(&raw, cfg.enabled),
                "realtime_mode" => {
                    cfg.mode = if parse_bool(&raw, true) { SynthMode::Realtime } else { SynthMode::Batch };
                }
                "voice" => cfg.voice = raw,
                "speed" => cfg.speed = raw.parse().unwrap_or(cfg.speed).clamp(0.5, 2.0),
                "min_english_chars" => cfg.min_english_chars = raw.parse().unwrap_or(cfg.min_english_chars),
                "max_chunk_length" => cfg.max_chunk_length = raw.parse().unwrap_or(cfg.max_chunk_length),
                "min_chunk_length" => cfg.min_chunk_length = raw.parse().unwrap_or(cfg.min_chunk_length),
                other => tracing::debug!(key = other, "tts_config.txt: unrecognized key"),
            }
        }
        Ok(cfg)
    }
}

fn parse_bool(raw: &str, default: bool) -> bool {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realtime_mode_defaults_true() {
        assert_eq!(TtsConfig::default().mode, SynthMode::Realtime);
    }

    #[test]
    fn parses_file() {
        let dir = crate::test_support::scratch_dir("tts-config");
        let path = dir.join("tts_config.txt");
        std::fs::write(&path, "enabled=true\nrealtime_mode=false\nspeed=1.25\nvoice=narrator\n").unwrap();
        let cfg = TtsConfig::load(&path).unwrap();
        assert_eq!(cfg.mode, SynthMode::Batch);
        assert_eq!(cfg.speed, 1.25);
        assert_eq!(cfg.voice, "narrator");
        std::fs::remove_dir_all(&dir).ok();
    }
}
