//! Overlay animator: per-face 4-phase reticle animation.

use std::collections::HashMap;

use rand::Rng;

use crate::bbox::BoundingBox;
use crate::config::AnimConfig;

/// Opaque handle identifying a tracked face across frames, e.g. the episode
/// that spawned it.
pub type ReticleId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl Phase {
    fn from_t(t: u64, cfg: &AnimConfig) -> Self {
        let d1 = cfg.phases[0].duration_frames as u64;
        let d2 = cfg.phases[1].duration_frames as u64;
        let d3 = cfg.phases[2].duration_frames as u64;
        if t < d1 {
            Phase::One
        } else if t < d1 + d2 {
            Phase::Two
        } else if t < d1 + d2 + d3 {
            Phase::Three
        } else {
            Phase::Four
        }
    }
}

/// Per-tracked-face visual state.
#[derive(Debug, Clone, Copy)]
pub struct Reticle {
    pub smoothed_center: (f32, f32),
    pub target_size: (f32, f32),
    pub tween_size: (f32, f32),
    pub outside_size: (f32, f32),
    pub cross_start_ratio: f32,
    pub cross_end_ratio: f32,
    /// Monotonic; never reset (I4).
    pub frames_elapsed: u64,
    pub phase: Phase,
}

impl Reticle {
    fn new(target_center: (f32, f32), target_size: (f32, f32)) -> Self {
        Self {
            smoothed_center: target_center,
            target_size,
            tween_size: (0.0, 0.0),
            outside_size: target_size,
            cross_start_ratio: 0.0,
            cross_end_ratio: 0.0,
            frames_elapsed: 0,
            phase: Phase::One,
        }
    }

    fn step(&mut self, target_center: (f32, f32), target_size: (f32, f32), cfg: &AnimConfig) {
        self.target_size = target_size;

        let alpha = cfg.position_smooth;
        self.smoothed_center.0 += (target_center.0 - self.smoothed_center.0) * alpha;
        self.smoothed_center.1 += (target_center.1 - self.smoothed_center.1) * alpha;

        // I4: frames_elapsed is monotonic and preserved across target updates.
        self.frames_elapsed += 1;
        let t = self.frames_elapsed;
        self.phase = Phase::from_t(t, cfg);

        let phase_idx = (self.phase as usize) - 1;
        let size_alpha = cfg.phases[phase_idx].easing_alpha;
        self.tween_size.0 += (target_size.0 - self.tween_size.0) * size_alpha;
        self.tween_size.1 += (target_size.1 - self.tween_size.1) * size_alpha;
        self.outside_size = target_size;

        match self.phase {
            Phase::One | Phase::Two => {}
            Phase::Three => {
                let span = cfg.cross_start_ratio_max - cfg.cross_start_ratio_min;
                let d1 = cfg.phases[0].duration_frames as u64;
                let d2 = cfg.phases[1].duration_frames as u64;
                let d3 = cfg.phases[2].duration_frames.max(1) as u64;
                let into_phase = (t - d1 - d2).min(d3) as f32 / d3 as f32;
                self.cross_start_ratio = cfg.cross_start_ratio_min + span * into_phase;
            }
            Phase::Four => {
                self.cross_start_ratio = cfg.cross_start_ratio_max;
                let d1 = cfg.phases[0].duration_frames as u64;
                let d2 = cfg.phases[1].duration_frames as u64;
                let d3 = cfg.phases[2].duration_frames as u64;
                let d4 = cfg.phases[3].duration_frames.max(1) as u64;
                let into_phase = (t - d1 - d2 - d3).min(d4) as f32 / d4 as f32;
                self.cross_end_ratio = cfg.cross_end_ratio * into_phase;
            }
        }
    }

    /// Whether phase 4's crosshair has reached its full length. `phase`
    /// itself stays clamped at `Four` regardless, as `frames_elapsed` keeps
    /// advancing.
    pub fn fully_drawn(&self, cfg: &AnimConfig) -> bool {
        self.phase == Phase::Four && self.cross_end_ratio >= cfg.cross_end_ratio
    }
}

/// Drives one reticle per tracked face. `tick()` must run at the render
/// cadence (~60 Hz); it is not frame-synchronized to the camera.
pub struct OverlayAnimator {
    config: AnimConfig,
    reticles: HashMap<ReticleId, Reticle>,
}

impl OverlayAnimator {
    pub fn new(config: AnimConfig) -> Self {
        Self { config, reticles: HashMap::new() }
    }

    /// Advance (or spawn) the reticle for `id`, targeting `bbox`.
    pub fn tick(&mut self, id: ReticleId, bbox: &BoundingBox) {
        let (cx, cy) = bbox.center();
        let target_center = (cx, cy - bbox.h as f32 * 0.2);
        let target_size = (
            bbox.w as f32 * self.config.frame_size_multiplier,
            bbox.h as f32 * self.config.frame_size_multiplier,
        );
        let reticle = self
            .reticles
            .entry(id)
            .or_insert_with(|| Reticle::new(target_center, target_size));
        reticle.step(target_center, target_size, &self.config);
    }

    /// A reticle dies when the tracker loses its face, or the conductor
    /// leaves `Detecting`/`ScreenshotTrigger`.
    pub fn remove(&mut self, id: ReticleId) {
        self.reticles.remove(&id);
    }

    pub fn clear(&mut self) {
        self.reticles.clear();
    }

    pub fn get(&self, id: ReticleId) -> Option<&Reticle> {
        self.reticles.get(&id)
    }

    /// Whether this reticle should be skipped on this draw (flicker, §4.3).
    pub fn should_flicker_skip(&self, rng: &mut impl Rng) -> bool {
        rng.gen::<f32>() < self.config.flicker_probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(x: i32, y: i32, w: i32, h: i32) -> BoundingBox {
        BoundingBox::new(x, y, w, h, 1.0)
    }

    #[test]
    fn frames_elapsed_is_monotonic_across_target_changes() {
        let mut anim = OverlayAnimator::new(AnimConfig::default());
        let mut toggled = false;
        for i in 0..300u64 {
            let b = if toggled { bb(50, 50, 80, 80) } else { bb(100, 100, 200, 200) };
            toggled = !toggled;
            anim.tick(1, &b);
            let r = anim.get(1).unwrap();
            assert_eq!(r.frames_elapsed, i + 1);
        }
    }

    #[test]
    fn phase_is_non_decreasing_until_clamped_at_four() {
        let mut anim = OverlayAnimator::new(AnimConfig::default());
        let mut last_phase = 0u8;
        for _ in 0..500 {
            anim.tick(1, &bb(100, 100, 200, 200));
            let phase = anim.get(1).unwrap().phase as u8;
            assert!(phase >= last_phase);
            last_phase = phase;
        }
        assert_eq!(last_phase, 4);
    }

    #[test]
    fn removed_reticle_restarts_fresh() {
        let mut anim = OverlayAnimator::new(AnimConfig::default());
        for _ in 0..100 {
            anim.tick(1, &bb(100, 100, 200, 200));
        }
        anim.remove(1);
        assert!(anim.get(1).is_none());
        anim.tick(1, &bb(100, 100, 200, 200));
        assert_eq!(anim.get(1).unwrap().frames_elapsed, 1);
    }
}
