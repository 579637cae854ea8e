//! `voice_mod_config.txt`: the DSP effect chain profile.

use std::path::Path;

use crate::error::Result;

use super::kv::parse_kv_file;

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceModConfig {
    pub enabled: bool,
    /// When true, all fields below are used verbatim; when false, a named
    /// `voice_profile` supplies them (profiles are a runtime concern, see
    /// `show-runtime`'s voice-preview command).
    pub manual_mode: bool,
    pub voice_profile: String,
    pub profile_intensity: f32,
    /// Semitones, -12..+12.
    pub pitch_shift: f32,
    /// -5..+5.
    pub formant_shift: f32,
    pub reverb_amount: f32,
    /// Seconds.
    pub echo_delay: f32,
    pub distortion: f32,
    pub compression: f32,
    pub eq_bass: f32,
    pub eq_mid: f32,
    pub eq_treble: f32,
    pub effect_blend: f32,
    /// dB.
    pub output_volume: f32,
}

impl Default for VoiceModConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            manual_mode: true,
            voice_profile: "none".to_string(),
            profile_intensity: 1.0,
            pitch_shift: 0.0,
            formant_shift: 0.0,
            reverb_amount: 0.0,
            echo_delay: 0.0,
            distortion: 0.0,
            compression: 0.0,
            eq_bass: 1.0,
            eq_mid: 1.0,
            eq_treble: 1.0,
            effect_blend: 1.0,
            output_volume: 0.0,
        }
    }
}

impl VoiceModConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut cfg = Self::default();
        let kv = parse_kv_file(path, "voice_mod_config.txt")?;
        for (key, raw) in kv {
            let f = || raw.parse::<f32>().ok();
            match key.as_str() {
                "voice_mod_enabled" => cfg.enabled = parse_bool(&raw, cfg.enabled),
                "manual_mode" => cfg.manual_mode = parse_bool(&raw, cfg.manual_mode),
                "voice_profile" => cfg.voice_profile = raw,
                "profile_intensity" => if let Some(v) = f() { cfg.profile_intensity = v },
                "pitch_shift" => if let Some(v) = f() { cfg.pitch_shift = v.clamp(-12.0, 12.0) },
                "formant_shift" => if let Some(v) = f() { cfg.formant_shift = v.clamp(-5.0, 5.0) },
                "reverb_amount" => if let Some(v) = f() { cfg.reverb_amount = v },
                "echo_delay" => if let Some(v) = f() { cfg.echo_delay = v },
                "distortion" => if let Some(v) = f() { cfg.distortion = v },
                "compression" => if let Some(v) = f() { cfg.compression = v },
                "eq_bass" => if let Some(v) = f() { cfg.eq_bass = v },
                "eq_mid" => if let Some(v) = f() { cfg.eq_mid = v },
                "eq_treble" => if let Some(v) = f() { cfg.eq_treble = v },
                "effect_blend" => if let Some(v) = f() { cfg.effect_blend = v },
                "output_volume" => if let Some(v) = f() { cfg.output_volume = v },
                other => tracing::debug!(key = other, "voice_mod_config.txt: unrecognized key"),
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
    fn clamps_pitch_and_formant() {
        let dir = crate::test_support::scratch_dir("voice-mod-config");
        let path = dir.join("voice_mod_config.txt");
        std::fs::write(&path, "pitch_shift=99\nformant_shift=-99\n").unwrap();
        let cfg = VoiceModConfig::load(&path).unwrap();
        assert_eq!(cfg.pitch_shift, 12.0);
        assert_eq!(cfg.formant_shift, -5.0);
        std::fs::remove_dir_all(&dir).ok();
    }
}
