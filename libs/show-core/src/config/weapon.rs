//! `weapon_config.csv`: one row per "defensive tool" the LLM can select.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, ShowError};

/// A single tool row.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    /// Zero-padded 2-digit numeric token, e.g. `"01"`.
    pub id: String,
    pub display_name: String,
    /// Absent when the tool has no associated actuator pulse.
    pub pin: Option<u8>,
    pub image_path: String,
    pub pre_delay_ms: u64,
    pub pulse_high_ms: u64,
    pub post_delay_ms: u64,
    pub fade_in_s: f32,
    pub display_s: f32,
    pub fade_out_s: f32,
}

impl ToolSpec {
    pub fn sequence_duration(&self, weapon_switch_delay: f32) -> f32 {
        self.fade_in_s + self.display_s + self.fade_out_s + weapon_switch_delay
    }
}

#[derive(Debug, Clone, Default)]
pub struct WeaponConfig {
    by_id: HashMap<String, ToolSpec>,
}

impl WeaponConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| ShowError::Configuration(format!("{}: {e}", path.display())))?;

        let mut by_id = HashMap::new();
        for record in reader.records() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("weapon_config.csv: skipping malformed row: {e}");
                    continue;
                }
            };
            let id = record.get(0).unwrap_or("").trim().to_string();
            if id.is_empty() {
                continue;
            }
            let pin = record
                .get(2)
                .and_then(|s| if s.trim().is_empty() { None } else { s.trim().parse::<u8>().ok() });
            let spec = ToolSpec {
                id: id.clone(),
                display_name: record.get(1).unwrap_or("").to_string(),
                pin,
                image_path: record.get(3).unwrap_or("").to_string(),
                pre_delay_ms: parse_or(record.get(4), 0),
                pulse_high_ms: parse_or(record.get(5), 500),
                post_delay_ms: parse_or(record.get(6), 0),
                fade_in_s: parse_or(record.get(7), 0.5),
                display_s: parse_or(record.get(8), 2.0),
                fade_out_s: parse_or(record.get(9), 0.5),
            };
            by_id.insert(id, spec);
        }
        Ok(Self { by_id })
    }

    pub fn get(&self, id: &str) -> Option<&ToolSpec> {
        self.by_id.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Every tool id in the catalog, in no particular order — the candidate
    /// list handed to the LLM for tool selection.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_id.keys().map(String::as_str)
    }

    /// Every pin with an actuator pulse attached, in no particular order.
    pub fn pins(&self) -> impl Iterator<Item = u8> + '_ {
        self.by_id.values().filter_map(|spec| spec.pin)
    }

    /// Validate an LLM-supplied tool-id list: drop unknown IDs, cap at three,
    /// falling back to `['01','02']` if the result is empty.
    pub fn validate_tool_ids(&self, requested: &[String]) -> Vec<String> {
        let mut valid: Vec<String> = requested
            .iter()
            .filter(|id| self.by_id.contains_key(id.as_str()))
            .take(3)
            .cloned()
            .collect();
        if valid.is_empty() {
            valid = ["01", "02"]
                .into_iter()
                .filter(|id| self.by_id.contains_key(*id))
                .map(String::from)
                .collect();
        }
        valid
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WeaponConfig {
        let dir = crate::test_support::scratch_dir("weapon-config");
        let path = dir.join("weapon_config.csv");
        std::fs::write(
            &path,
            "id,display_name,pin,image_path,pre_delay_ms,pulse_high_ms,post_delay_ms,fade_in_s,display_s,fade_out_s\n\
             01,Shield,4,shield.png,100,500,100,0.5,2.0,0.5\n\
             02,Net,,net.png,0,0,0,0.5,2.0,0.5\n",
        )
        .unwrap();
        let cfg = WeaponConfig::load(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        cfg
    }

    #[test]
    fn tool_with_no_pin_has_none() {
        let cfg = sample();
        assert_eq!(cfg.get("02").unwrap().pin, None);
        assert_eq!(cfg.get("01").unwrap().pin, Some(4));
    }

    #[test]
    fn unknown_ids_are_dropped_and_capped_at_three() {
        let cfg = sample();
        let validated = cfg.validate_tool_ids(&[
            "01".to_string(),
            "99".to_string(),
            "02".to_string(),
            "01".to_string(),
            "02".to_string(),
        ]);
        assert_eq!(validated, vec!["01", "02", "01"]);
    }

    #[test]
    fn empty_result_falls_back_to_defaults() {
        let cfg = sample();
        let validated = cfg.validate_tool_ids(&["99".to_string()]);
        assert_eq!(validated, vec!["01", "02"]);
    }
}
