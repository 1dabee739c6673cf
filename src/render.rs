//! The rasterizer seam between the viewer and the GPU backend

use crate::color::ClearColor;
use crate::error::RenderError;
use crate::scene::Scene;

/// Pixel-density cap applied when the renderer is first created
pub const INITIAL_PIXEL_RATIO_CAP: f64 = 4.0;

/// Pixel-density cap applied on every resize afterwards
pub const RESIZE_PIXEL_RATIO_CAP: f64 = 2.0;

/// Something that can draw a `Scene` onto the viewer's canvas.
///
/// Sizes are logical (layout) pixels; the backing buffer holds
/// `size * pixel_ratio` physical pixels.
pub trait Rasterizer {
    fn set_size(&mut self, width: f32, height: f32);

    fn set_pixel_ratio(&mut self, ratio: f64);

    fn set_clear_color(&mut self, color: ClearColor);

    /// Draw one frame of `scene` through its camera
    fn render(&mut self, scene: &Scene) -> Result<(), RenderError>;

    /// Release GPU resources. Rendering afterwards fails with `Disposed`.
    fn dispose(&mut self);
}

/// Physical backing-buffer size for a logical size at `ratio`, never empty
pub fn backing_size(width: f32, height: f32, ratio: f64) -> (u32, u32) {
    let scale = |v: f32| ((v as f64 * ratio).round().max(1.0)).min(u32::MAX as f64) as u32;
    (scale(width), scale(height))
}

/// Shrink `size` uniformly so neither side exceeds `max`, keeping the aspect
pub fn fit_within((width, height): (u32, u32), max: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max {
        return (width, height);
    }
    let scale = max as f64 / longest as f64;
    let fit = |v: u32| ((v as f64 * scale).round() as u32).clamp(1, max);
    (fit(width), fit(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_size_scales_and_rounds() {
        assert_eq!(backing_size(1600.0, 600.0, 2.0), (3200, 1200));
        assert_eq!(backing_size(10.5, 3.0, 1.5), (16, 5));
    }

    #[test]
    fn backing_size_is_never_zero() {
        assert_eq!(backing_size(0.0, 0.0, 2.0), (1, 1));
        assert_eq!(backing_size(f32::NAN, 100.0, 1.0), (1, 100));
    }

    #[test]
    fn fit_within_keeps_aspect_when_over_the_limit() {
        assert_eq!(fit_within((16000, 6000), 8192), (8192, 3072));
        assert_eq!(fit_within((6000, 16000), 8192), (3072, 8192));
        assert_eq!(fit_within((20000, 1), 8192), (8192, 1));
    }

    #[test]
    fn fit_within_leaves_small_sizes_alone() {
        assert_eq!(fit_within((3200, 1200), 8192), (3200, 1200));
        assert_eq!(fit_within((8192, 8192), 8192), (8192, 8192));
    }
}
