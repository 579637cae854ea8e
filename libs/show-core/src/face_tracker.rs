//! Face tracker: turns a per-frame raw bounding box into a smoothed "episode"
//! signal the overlay animator and show conductor can consume.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::bbox::BoundingBox;

const RING_CAPACITY: usize = 5;
/// Most-recent-highest weights. Only the last `min(ring.len(), WEIGHTS.len())`
/// ring entries are ever averaged — a 5-deep ring with a 4-long weight table
/// means the oldest ring entry only ever contributes to hysteresis
/// bookkeeping, never to the smoothed output. Reproduced faithfully from the
/// original Python tracker rather than "fixed", since nothing downstream
/// depends on the 5th entry being weighted.
const WEIGHTS: [f32; 4] = [0.4, 0.3, 0.2, 0.1];

#[derive(Debug, Clone, Copy)]
pub struct FaceTrackerConfig {
    /// Consecutive missed frames tolerated before an episode ends.
    pub max_lost_frames: u32,
    /// Minimum detector confidence to accept a box into the ring (§9 open question).
    pub detection_sensitivity: f32,
}

impl Default for FaceTrackerConfig {
    fn default() -> Self {
        Self {
            max_lost_frames: 10,
            detection_sensitivity: 0.5,
        }
    }
}

/// A maximal interval of continuous face presence.
#[derive(Debug, Clone)]
pub struct Episode {
    pub started_at: Instant,
    pub last_seen_at: Instant,
    pub current_bbox: BoundingBox,
    pub smoothed_bbox: BoundingBox,
}

impl Episode {
    pub fn duration(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}

/// Result of feeding one frame to the tracker.
#[derive(Debug, Clone)]
pub struct TrackerUpdate {
    /// `None` when no episode is active (face lost beyond the grace window).
    pub episode: Option<Episode>,
}

pub struct FaceTracker {
    config: FaceTrackerConfig,
    ring: VecDeque<BoundingBox>,
    lost_count: u32,
    episode: Option<Episode>,
}

impl FaceTracker {
    pub fn new(config: FaceTrackerConfig) -> Self {
        Self {
            config,
            ring: VecDeque::with_capacity(RING_CAPACITY),
            lost_count: 0,
            episode: None,
        }
    }

    /// Feed one frame's detection (at most one box, already the largest
    /// upstream) to the tracker.
    pub fn on_frame(&mut self, raw: Option<BoundingBox>, now: Instant) -> TrackerUpdate {
        let accepted = raw.filter(|b| b.confidence >= self.config.detection_sensitivity);

        match accepted {
            Some(raw_bbox) => {
                self.lost_count = 0;
                let accept_into_ring = match self.ring.back() {
                    None => true,
                    Some(prev) => is_significant_change(prev, &raw_bbox),
                };
                if accept_into_ring {
                    if self.ring.len() == RING_CAPACITY {
                        self.ring.pop_front();
                    }
                    self.ring.push_back(raw_bbox);
                }
                let smoothed = self.smoothed_bbox();
                self.episode = Some(match self.episode.take() {
                    Some(mut ep) => {
                        ep.last_seen_at = now;
                        ep.current_bbox = raw_bbox;
                        ep.smoothed_bbox = smoothed;
                        ep
                    }
                    None => {
                        tracing::debug!("face tracker: episode started");
                        Episode {
                            started_at: now,
                            last_seen_at: now,
                            current_bbox: raw_bbox,
                            smoothed_bbox: smoothed,
                        }
                    }
                });
            }
            None => {
                self.lost_count += 1;
                if self.lost_count > self.config.max_lost_frames {
                    if self.episode.is_some() {
                        tracing::debug!(
                            lost_count = self.lost_count,
                            "face tracker: episode ended (lost frames exceeded)"
                        );
                    }
                    self.episode = None;
                    self.ring.clear();
                } else if let Some(ep) = self.episode.as_mut() {
                    // still within grace window: re-emit last smoothed bbox,
                    // advance last_seen_at so duration() keeps counting through
                    // the gap; momentary loss does not end the episode
                    ep.last_seen_at = now;
                }
            }
        }

        TrackerUpdate {
            episode: self.episode.clone(),
        }
    }

    fn smoothed_bbox(&self) -> BoundingBox {
        let k = self.ring.len().min(WEIGHTS.len());
        let recent: Vec<BoundingBox> = self
            .ring
            .iter()
            .rev()
            .take(k)
            .rev()
            .copied()
            .collect();
        let weights = &WEIGHTS[WEIGHTS.len() - k..];
        BoundingBox::weighted_average(&recent, weights)
    }

    pub fn episode(&self) -> Option<&Episode> {
        self.episode.as_ref()
    }
}

fn is_significant_change(prev: &BoundingBox, next: &BoundingBox) -> bool {
    let dx = (next.x - prev.x).abs();
    let dy = (next.y - prev.y).abs();
    if dx > 5 || dy > 5 {
        return true;
    }
    let prev_area = prev.area().max(1) as f64;
    let delta_area = (next.area() - prev.area()).abs() as f64;
    delta_area / prev_area > 0.10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(x: i32, y: i32, w: i32, h: i32) -> BoundingBox {
        BoundingBox::new(x, y, w, h, 1.0)
    }

    #[test]
    fn trivial_changes_are_ignored() {
        let mut tracker = FaceTracker::new(FaceTrackerConfig::default());
        let t0 = Instant::now();
        tracker.on_frame(Some(bb(100, 100, 200, 200)), t0);
        let before = tracker.smoothed_bbox();

        // well within the 5px / 10% area hysteresis band
        tracker.on_frame(Some(bb(102, 101, 204, 202)), t0);
        let after = tracker.smoothed_bbox();
        assert_eq!(before, after, "sub-threshold jitter must not move the smoothed bbox");
    }

    #[test]
    fn large_delta_is_reflected_next_emission() {
        let mut tracker = FaceTracker::new(FaceTrackerConfig::default());
        let t0 = Instant::now();
        tracker.on_frame(Some(bb(100, 100, 200, 200)), t0);
        let before = tracker.smoothed_bbox();

        tracker.on_frame(Some(bb(300, 300, 200, 200)), t0);
        let after = tracker.smoothed_bbox();
        assert_ne!(before, after);
    }

    #[test]
    fn single_frame_gap_does_not_end_episode() {
        let mut tracker = FaceTracker::new(FaceTrackerConfig {
            max_lost_frames: 10,
            detection_sensitivity: 0.5,
        });
        let t0 = Instant::now();
        tracker.on_frame(Some(bb(0, 0, 100, 100)), t0);
        let update = tracker.on_frame(None, t0);
        assert!(update.episode.is_some(), "one missed frame must not end the episode");
    }

    #[test]
    fn exceeding_max_lost_frames_ends_episode() {
        let mut tracker = FaceTracker::new(FaceTrackerConfig {
            max_lost_frames: 2,
            detection_sensitivity: 0.5,
        });
        let t0 = Instant::now();
        tracker.on_frame(Some(bb(0, 0, 100, 100)), t0);
        tracker.on_frame(None, t0);
        tracker.on_frame(None, t0);
        let update = tracker.on_frame(None, t0);
        assert!(update.episode.is_none());
    }

    #[test]
    fn low_confidence_detection_is_treated_as_a_miss() {
        let mut tracker = FaceTracker::new(FaceTrackerConfig {
            max_lost_frames: 10,
            detection_sensitivity: 0.9,
        });
        let t0 = Instant::now();
        let update = tracker.on_frame(
            Some(BoundingBox::new(0, 0, 100, 100, 0.3)),
            t0,
        );
        assert!(update.episode.is_none(), "below-threshold confidence must not start an episode");
    }
}
