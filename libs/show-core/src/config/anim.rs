//! `anim_config.csv`: per-phase easing and geometry for the overlay reticle.
//! Rows are `section,key,value`; sections `BASIC`, `STATE1`..`STATE4`, `VISUAL`.

use std::path::Path;

use crate::error::{Result, ShowError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseConfig {
    pub duration_frames: u32,
    pub easing_alpha: f32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self { duration_frames: 60, easing_alpha: 0.12 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimConfig {
    /// Center-tracking easing alpha (typically 0.08-0.15).
    pub position_smooth: f32,
    /// Target size = detected bbox × this multiplier (default 1.5).
    pub frame_size_multiplier: f32,
    /// Durations D1..D4 and per-phase easing alpha, indexed 0..4 for phase 1..4.
    pub phases: [PhaseConfig; 4],
    /// STATE1 geometry: corner arm length as a fraction of width (default 0.07).
    pub corner_arm_ratio: f32,
    /// STATE2 geometry: inner rectangle size as a fraction of outer (default 0.9).
    pub inner_rect_ratio: f32,
    /// STATE2 geometry: inner rectangle alpha, 0-255 (default ~50).
    pub inner_rect_alpha: u8,
    /// STATE3 geometry: crosshair start length range as fraction of width/height.
    pub cross_start_ratio_min: f32,
    pub cross_start_ratio_max: f32,
    /// STATE4 geometry: crosshair end (completed) length ratio (default 1.0).
    pub cross_end_ratio: f32,
    /// VISUAL: reticle stroke color.
    pub color: (u8, u8, u8),
    pub alpha: u8,
    /// Per-draw, per-reticle chance of skipping rendering entirely (default 0.2).
    pub flicker_probability: f32,
}

impl Default for AnimConfig {
    fn default() -> Self {
        Self {
            position_smooth: 0.12,
            frame_size_multiplier: 1.5,
            phases: [PhaseConfig::default(); 4],
            corner_arm_ratio: 0.07,
            inner_rect_ratio: 0.9,
            inner_rect_alpha: 50,
            cross_start_ratio_min: 0.55,
            cross_start_ratio_max: 0.59,
            cross_end_ratio: 1.0,
            color: (0, 255, 120),
            alpha: 255,
            flicker_probability: 0.2,
        }
    }
}

impl AnimConfig {
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
                    tracing::warn!("anim_config.csv: skipping malformed row: {e}");
                    continue;
                }
            };
            let section = record.get(0).unwrap_or("").trim().to_uppercase();
            let key = record.get(1).unwrap_or("").trim();
            let raw = record.get(2).unwrap_or("").trim();
            apply_row(&mut cfg, &section, key, raw);
        }
        Ok(cfg)
    }
}

fn apply_row(cfg: &mut AnimConfig, section: &str, key: &str, raw: &str) {
    let as_f32 = || raw.parse::<f32>().ok();
    let as_u32 = || raw.parse::<u32>().ok();
    let as_u8 = || raw.parse::<u8>().ok();

    match section {
        "BASIC" => match key {
            "position_smooth" => if let Some(v) = as_f32() { cfg.position_smooth = v },
            "frame_size_multiplier" => if let Some(v) = as_f32() { cfg.frame_size_multiplier = v },
            "state1_duration" => if let Some(v) = as_u32() { cfg.phases[0].duration_frames = v },
            "state2_duration" => if let Some(v) = as_u32() { cfg.phases[1].duration_frames = v },
            "state3_duration" => if let Some(v) = as_u32() { cfg.phases[2].duration_frames = v },
            "state4_duration" => if let Some(v) = as_u32() { cfg.phases[3].duration_frames = v },
            other => tracing::debug!(section, key = other, "anim_config.csv: unrecognized key"),
        },
        "STATE1" => match key {
            "easing_alpha" => if let Some(v) = as_f32() { cfg.phases[0].easing_alpha = v },
            "corner_arm_ratio" => if let Some(v) = as_f32() { cfg.corner_arm_ratio = v },
            other => tracing::debug!(section, key = other, "anim_config.csv: unrecognized key"),
        },
        "STATE2" => match key {
            "easing_alpha" => if let Some(v) = as_f32() { cfg.phases[1].easing_alpha = v },
            "inner_rect_ratio" => if let Some(v) = as_f32() { cfg.inner_rect_ratio = v },
            "inner_rect_alpha" => if let Some(v) = as_u8() { cfg.inner_rect_alpha = v },
            other => tracing::debug!(section, key = other, "anim_config.csv: unrecognized key"),
        },
        "STATE3" => match key {
            "easing_alpha" => if let Some(v) = as_f32() { cfg.phases[2].easing_alpha = v },
            "cross_start_ratio_min" => if let Some(v) = as_f32() { cfg.cross_start_ratio_min = v },
            "cross_start_ratio_max" => if let Some(v) = as_f32() { cfg.cross_start_ratio_max = v },
            other => tracing::debug!(section, key = other, "anim_config.csv: unrecognized key"),
        },
        "STATE4" => match key {
            "easing_alpha" => if let Some(v) = as_f32() { cfg.phases[3].easing_alpha = v },
            "cross_end_ratio" => if let Some(v) = as_f32() { cfg.cross_end_ratio = v },
            other => tracing::debug!(section, key = other, "anim_config.csv: unrecognized key"),
        },
        "VISUAL" => match key {
            "color_r" => if let Some(v) = as_u8() { cfg.color.0 = v },
            "color_g" => if let Some(v) = as_u8() { cfg.color.1 = v },
            "color_b" => if let Some(v) = as_u8() { cfg.color.2 = v },
            "alpha" => if let Some(v) = as_u8() { cfg.alpha = v },
            "flicker_probability" => if let Some(v) = as_f32() { cfg.flicker_probability = v },
            other => tracing::debug!(section, key = other, "anim_config.csv: unrecognized key"),
        },
        other => tracing::debug!(section = other, "anim_config.csv: unrecognized section"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections() {
        let dir = crate::test_support::scratch_dir("anim-config");
        let path = dir.join("anim_config.csv");
        std::fs::write(
            &path,
            "section,key,value\n\
             BASIC,frame_size_multiplier,2.0\n\
             STATE1,corner_arm_ratio,0.1\n\
             VISUAL,flicker_probability,0.5\n",
        )
        .unwrap();
        let cfg = AnimConfig::load(&path).unwrap();
        assert_eq!(cfg.frame_size_multiplier, 2.0);
        assert_eq!(cfg.corner_arm_ratio, 0.1);
        assert_eq!(cfg.flicker_probability, 0.5);
        std::fs::remove_dir_all(&dir).ok();
    }
}
