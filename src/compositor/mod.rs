//! Per-frame compositing of the drawing surface and the camera bubble.
//!
//! Each tick clears the off-screen canvas, draws the board's base layer and
//! its interactive overlay scaled to the canvas, then the circular camera
//! picture-in-picture, and publishes the result to the canvas track.

pub mod canvas_track;
pub mod layout;
pub mod render_loop;

use image::imageops::{self, FilterType};
use image::{Pixel, Rgba, RgbaImage};
use std::sync::Arc;

use crate::capture::{MediaTrack, VideoFrame};

pub use canvas_track::CanvasFeed;
pub use layout::{PipLayout, PipOptions};
pub use render_loop::CompositorLoop;

const BORDER_WIDTH: f32 = 3.0;
const BORDER_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SHADOW_WIDTH: f32 = 6.0;
const SHADOW_ALPHA: f32 = 0.25;

/// The board being recorded.
pub trait DrawingSurface: Send + Sync {
    /// Size of the primary canvas, `None` if it cannot be located.
    fn size(&self) -> Option<(u32, u32)>;

    /// Static content of the board.
    fn base_layer(&self) -> Option<VideoFrame>;

    /// Live cursors, laser pointer and other transient annotations.
    fn overlay_layer(&self) -> Option<VideoFrame>;
}

pub struct FrameCompositor {
    canvas: RgbaImage,
    surface: Arc<dyn DrawingSurface>,
    camera: Option<Arc<dyn MediaTrack>>,
    pip: PipOptions,
    feed: CanvasFeed,
    frames_rendered: u64,
}

impl FrameCompositor {
    pub fn new(
        surface: Arc<dyn DrawingSurface>,
        camera: Option<Arc<dyn MediaTrack>>,
        pip: PipOptions,
        size: (u32, u32),
        feed: CanvasFeed,
    ) -> Self {
        Self {
            canvas: RgbaImage::new(size.0, size.1),
            surface,
            camera,
            pip,
            feed,
            frames_rendered: 0,
        }
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn render_frame(&mut self) -> VideoFrame {
        for pixel in self.canvas.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }

        if let Some(base) = self.surface.base_layer() {
            draw_scaled(&mut self.canvas, &base);
        }
        if let Some(overlay) = self.surface.overlay_layer() {
            draw_scaled(&mut self.canvas, &overlay);
        }

        let camera_frame = self
            .camera
            .as_ref()
            .filter(|track| track.is_live())
            .and_then(|track| track.latest_frame());
        if let Some(frame) = camera_frame {
            let (width, height) = self.canvas.dimensions();
            let (cam_width, cam_height) = frame.dimensions();
            if let Some(layout) = PipLayout::compute(width, height, cam_width, cam_height, &self.pip)
            {
                draw_pip(&mut self.canvas, &frame, &layout);
            }
        }

        self.frames_rendered += 1;
        let frame = Arc::new(self.canvas.clone());
        self.feed.publish(frame.clone());
        frame
    }
}

fn draw_scaled(canvas: &mut RgbaImage, layer: &RgbaImage) {
    if layer.dimensions() == canvas.dimensions() {
        imageops::overlay(canvas, layer, 0, 0);
    } else {
        let (width, height) = canvas.dimensions();
        let scaled = imageops::resize(layer, width, height, FilterType::Triangle);
        imageops::overlay(canvas, &scaled, 0, 0);
    }
}

/// Camera clipped to a circle, a solid ring around it and a fading shadow ring.
fn draw_pip(canvas: &mut RgbaImage, camera: &RgbaImage, layout: &PipLayout) {
    let scaled = imageops::resize(camera, layout.width, layout.height, FilterType::Triangle);
    let (cx, cy) = layout.center();
    let radius = layout.radius();
    let outer = radius + BORDER_WIDTH + SHADOW_WIDTH;

    let (canvas_width, canvas_height) = canvas.dimensions();
    let min_x = ((cx - outer).floor() as i64).max(0);
    let min_y = ((cy - outer).floor() as i64).max(0);
    let max_x = ((cx + outer).ceil() as i64).min(canvas_width as i64);
    let max_y = ((cy + outer).ceil() as i64).min(canvas_height as i64);

    for py in min_y..max_y {
        for px in min_x..max_x {
            let dx = px as f32 + 0.5 - cx;
            let dy = py as f32 + 0.5 - cy;
            let distance = (dx * dx + dy * dy).sqrt();
            let target = canvas.get_pixel_mut(px as u32, py as u32);

            if distance <= radius {
                let sx = px - layout.x;
                let sy = py - layout.y;
                if sx >= 0 && sy >= 0 && (sx as u32) < layout.width && (sy as u32) < layout.height {
                    target.blend(scaled.get_pixel(sx as u32, sy as u32));
                }
            } else if distance <= radius + BORDER_WIDTH {
                *target = BORDER_COLOR;
            } else if distance <= outer {
                let fade = 1.0 - (distance - radius - BORDER_WIDTH) / SHADOW_WIDTH;
                let alpha = (SHADOW_ALPHA * fade * 255.0).round() as u8;
                target.blend(&Rgba([0, 0, 0, alpha]));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::TrackKind;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Board {
        size: (u32, u32),
        base: Option<VideoFrame>,
        overlay: Option<VideoFrame>,
    }

    impl DrawingSurface for Board {
        fn size(&self) -> Option<(u32, u32)> {
            Some(self.size)
        }
        fn base_layer(&self) -> Option<VideoFrame> {
            self.base.clone()
        }
        fn overlay_layer(&self) -> Option<VideoFrame> {
            self.overlay.clone()
        }
    }

    struct Camera {
        frame: Option<VideoFrame>,
        live: AtomicBool,
    }

    impl MediaTrack for Camera {
        fn kind(&self) -> TrackKind {
            TrackKind::Video
        }
        fn label(&self) -> String {
            "camera".to_string()
        }
        fn is_live(&self) -> bool {
            self.live.load(Ordering::SeqCst)
        }
        fn stop(&self) {
            self.live.store(false, Ordering::SeqCst);
        }
        fn latest_frame(&self) -> Option<VideoFrame> {
            self.frame.clone()
        }
    }

    fn solid(width: u32, height: u32, color: [u8; 4]) -> VideoFrame {
        Arc::new(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    fn compositor(board: Board, camera: Option<Arc<dyn MediaTrack>>) -> FrameCompositor {
        let size = board.size;
        FrameCompositor::new(
            Arc::new(board),
            camera,
            PipOptions::default(),
            size,
            CanvasFeed::new(),
        )
    }

    #[test]
    fn test_base_layer_is_scaled_to_canvas() {
        let board = Board {
            size: (200, 100),
            base: Some(solid(50, 25, [10, 20, 30, 255])),
            overlay: None,
        };
        let mut compositor = compositor(board, None);
        let frame = compositor.render_frame();

        assert_eq!(frame.dimensions(), (200, 100));
        assert_eq!(frame.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
        assert_eq!(frame.get_pixel(199, 99), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_overlay_drawn_over_base() {
        let mut overlay = RgbaImage::new(200, 100);
        overlay.put_pixel(5, 5, Rgba([255, 0, 0, 255]));
        let board = Board {
            size: (200, 100),
            base: Some(solid(200, 100, [0, 0, 255, 255])),
            overlay: Some(Arc::new(overlay)),
        };
        let mut compositor = compositor(board, None);
        let frame = compositor.render_frame();

        assert_eq!(frame.get_pixel(5, 5), &Rgba([255, 0, 0, 255]));
        // transparent overlay pixels leave the base visible
        assert_eq!(frame.get_pixel(6, 5), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_camera_bubble_is_circular_with_border() {
        let board = Board {
            size: (1000, 1000),
            base: Some(solid(1000, 1000, [0, 0, 255, 255])),
            overlay: None,
        };
        let camera: Arc<dyn MediaTrack> = Arc::new(Camera {
            frame: Some(solid(100, 100, [0, 255, 0, 255])),
            live: AtomicBool::new(true),
        });
        let mut compositor = compositor(board, Some(camera));
        let frame = compositor.render_frame();

        // 150x150 box at (830, 830), centre (905, 905), radius 75
        assert_eq!(frame.get_pixel(905, 905), &Rgba([0, 255, 0, 255]));
        // box corner lies outside the circle: still board
        assert_eq!(frame.get_pixel(831, 831), &Rgba([0, 0, 255, 255]));
        // just outside the radius on the horizontal axis: border ring
        assert_eq!(frame.get_pixel(905 + 76, 905), &BORDER_COLOR);
        // shadow ring darkens the board
        let shadow = frame.get_pixel(905 + 80, 905);
        assert!(shadow[2] < 255 && shadow[2] > 0);
    }

    #[test]
    fn test_camera_without_frames_is_skipped() {
        let board = Board {
            size: (400, 400),
            base: Some(solid(400, 400, [1, 2, 3, 255])),
            overlay: None,
        };
        let camera: Arc<dyn MediaTrack> = Arc::new(Camera {
            frame: None,
            live: AtomicBool::new(true),
        });
        let mut compositor = compositor(board, Some(camera));
        let frame = compositor.render_frame();
        assert!(frame.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));
    }

    #[test]
    fn test_frames_reach_the_canvas_feed() {
        let feed = CanvasFeed::new();
        let board = Board {
            size: (10, 10),
            base: None,
            overlay: None,
        };
        let mut compositor = FrameCompositor::new(
            Arc::new(board),
            None,
            PipOptions::default(),
            (10, 10),
            feed.clone(),
        );
        assert!(feed.latest().is_none());
        compositor.render_frame();
        compositor.render_frame();
        assert_eq!(compositor.frames_rendered(), 2);
        assert_eq!(feed.latest().unwrap().dimensions(), (10, 10));
    }
}
