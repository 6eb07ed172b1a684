//! Picture-in-picture placement.
//!
//! Pure geometry, no pixels. The camera bubble sits in the bottom-right
//! corner, `margin_px` away from both edges.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipOptions {
    /// PIP width as a fraction of the canvas width, capped at 1. Zero,
    /// negative or NaN ratios draw no bubble.
    pub size_ratio: f32,
    pub margin_px: u32,
}

impl Default for PipOptions {
    fn default() -> Self {
        Self {
            size_ratio: 0.15,
            margin_px: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipLayout {
    /// Top-left corner of the PIP box; may be negative on tiny canvases
    pub x: i64,
    pub y: i64,
    pub width: u32,
    /// Preserves the camera aspect ratio
    pub height: u32,
    pub diameter: u32,
}

impl PipLayout {
    /// `None` when there is nothing sensible to draw (zero-sized canvas or
    /// a camera that has not reported its dimensions).
    pub fn compute(
        canvas_width: u32,
        canvas_height: u32,
        camera_width: u32,
        camera_height: u32,
        options: &PipOptions,
    ) -> Option<Self> {
        if camera_width == 0 || camera_height == 0 || canvas_width == 0 || canvas_height == 0 {
            return None;
        }

        if options.size_ratio.is_nan() || options.size_ratio <= 0.0 {
            return None;
        }
        let ratio = options.size_ratio.min(1.0);

        let width = (canvas_width as f32 * ratio).round() as u32;
        if width == 0 {
            return None;
        }
        let height =
            ((width as u64 * camera_height as u64 + camera_width as u64 / 2) / camera_width as u64)
                as u32;
        if height == 0 {
            return None;
        }

        let margin = options.margin_px as i64;
        Some(Self {
            x: canvas_width as i64 - width as i64 - margin,
            y: canvas_height as i64 - height as i64 - margin,
            width,
            height,
            diameter: width.min(height),
        })
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    pub fn radius(&self) -> f32 {
        self.diameter as f32 / 2.0
    }
}
