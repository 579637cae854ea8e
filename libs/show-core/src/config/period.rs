//! `period_config.csv`: the flat table of scalar tunables that don't belong
//! to any other config file — detection timing, caption pacing, cooldowns.

use std::path::Path;

use crate::error::{Result, ShowError};

/// Tunables loaded from `period_config.csv`. Every field has a compiled-in
/// default, used whenever the row is missing or unparsable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodConfig {
    /// Minimum detector confidence to accept a box into the tracker's ring (0-1).
    pub detection_sensitivity: f32,
    /// Seconds of continuous presence required to fire `ScreenshotTrigger`.
    pub detect_duration: f32,
    /// ms/char for the non-TTS typing fallback.
    pub caption_typing_speed: f32,
    /// Grace period after both languages finish typing before `all_done`.
    pub caption_wait_after: f32,
    pub caption_max_chars_per_line: u32,
    /// Relative weight of a CJK character vs. a Latin one when wrapping.
    pub caption_chinese_char_weight: f32,
    /// Pause between successive tools in the weapon sequence.
    pub weapon_switch_delay: f32,
    /// `Reset` dwell time before returning to `Detecting`.
    pub cooldown_time: f32,
    /// Hard timeout on `LlmLoading` before a default response is substituted.
    pub llm_response_timeout: f32,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            detection_sensitivity: 0.5,
            detect_duration: 3.0,
            caption_typing_speed: 30.0,
            caption_wait_after: 2.0,
            caption_max_chars_per_line: 40,
            caption_chinese_char_weight: 1.8,
            weapon_switch_delay: 0.5,
            cooldown_time: 3.0,
            llm_response_timeout: 10.0,
        }
    }
}

impl PeriodConfig {
    /// Load from a `period_config.csv` with rows
    /// `display_name, param_key, default_value, description`. Unrecognized
    /// keys are ignored; unparsable values keep the compiled-in default and
    /// log a warning rather than failing the load.
    pub fn load(path: &Path) -> Result<Self> {
        let mut cfg = Self::default();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| ShowError::Configuration(format!("{}: {e}", path.display())))?;

        for record in reader.records() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("period_config.csv: skipping malformed row: {e}");
                    continue;
                }
            };
            let key = record.get(1).unwrap_or("").trim();
            let raw = record.get(2).unwrap_or("").trim();
            if key.is_empty() || raw.is_empty() {
                continue;
            }
            let parsed: Result<f32, _> = raw.parse();
            let value = match parsed {
                Ok(v) => v,
                Err(_) => {
                    tracing::warn!(key, raw, "period_config.csv: unparsable value, keeping default");
                    continue;
                }
            };
            match key {
                "detection_sensitivity" => cfg.detection_sensitivity = value,
                "detect_duration" => cfg.detect_duration = value,
                "caption_typing_speed" => cfg.caption_typing_speed = value,
                "caption_wait_after" => cfg.caption_wait_after = value,
                "caption_max_chars_per_line" => cfg.caption_max_chars_per_line = value as u32,
                "caption_chinese_char_weight" => cfg.caption_chinese_char_weight = value,
                "weapon_switch_delay" => cfg.weapon_switch_delay = value,
                "cooldown_time" => cfg.cooldown_time = value,
                "llm_response_timeout" => cfg.llm_response_timeout = value,
                other => tracing::debug!(key = other, "period_config.csv: unrecognized key, ignoring"),
            }
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = PeriodConfig::default();
        assert_eq!(cfg.detect_duration, 3.0);
        assert_eq!(cfg.llm_response_timeout, 10.0);
    }

    #[test]
    fn load_from_csv() {
        let dir = crate::test_support::scratch_dir("period-config");
        let path = dir.join("period_config.csv");
        std::fs::write(
            &path,
            "display_name,param_key,default_value,description\n\
             Detect Duration,detect_duration,0.1,how long a face must be seen\n\
             Unknown Thing,totally_unknown_key,5,ignored\n",
        )
        .unwrap();
        let cfg = PeriodConfig::load(&path).unwrap();
        assert_eq!(cfg.detect_duration, 0.1);
        // untouched fields keep their defaults
        assert_eq!(cfg.cooldown_time, PeriodConfig::default().cooldown_time);
        std::fs::remove_dir_all(&dir).ok();
    }
}
