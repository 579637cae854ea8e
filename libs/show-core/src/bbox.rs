//! Bounding boxes and the canvas they're clamped to.

/// An axis-aligned integer bounding box with a detector confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32, confidence: f32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Clamp this box so it lies entirely within `0..canvas_w` x `0..canvas_h`.
    pub fn clamped_to(&self, canvas_w: i32, canvas_h: i32) -> Self {
        let x = self.x.clamp(0, canvas_w.max(0));
        let y = self.y.clamp(0, canvas_h.max(0));
        let w = self.w.min(canvas_w - x).max(0);
        let h = self.h.min(canvas_h - y).max(0);
        Self {
            x,
            y,
            w,
            h,
            confidence: self.confidence,
        }
    }

    pub fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.w as f32 / 2.0,
            self.y as f32 + self.h as f32 / 2.0,
        )
    }

    /// Weighted average of several boxes, most-recent-highest weight. `weights`
    /// and `boxes` must be the same length; weights need not sum to 1 (they
    /// are normalized by this function against an implicit trailing weight of 0).
    pub fn weighted_average(boxes: &[BoundingBox], weights: &[f32]) -> BoundingBox {
        debug_assert_eq!(boxes.len(), weights.len());
        let total: f32 = weights.iter().sum();
        if total <= 0.0 || boxes.is_empty() {
            return boxes.last().copied().unwrap_or(BoundingBox::new(0, 0, 0, 0, 0.0));
        }
        let mut x = 0.0f32;
        let mut y = 0.0f32;
        let mut w = 0.0f32;
        let mut h = 0.0f32;
        let mut conf = 0.0f32;
        for (b, wt) in boxes.iter().zip(weights.iter()) {
            x += b.x as f32 * wt;
            y += b.y as f32 * wt;
            w += b.w as f32 * wt;
            h += b.h as f32 * wt;
            conf += b.confidence * wt;
        }
        BoundingBox::new(
            (x / total).round() as i32,
            (y / total).round() as i32,
            (w / total).round() as i32,
            (h / total).round() as i32,
            conf / total,
        )
    }
}
