//! Page layout: decides how large the drawing canvas is.
//!
//! The viewer never sizes its canvas itself; it measures whatever this
//! layout produced, the same way a page component reads the client size
//! its stylesheet gave it.

/// Rendered size of the canvas in logical pixels, plus the display's
/// physical-to-logical pixel ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMetrics {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f64,
}

impl SurfaceMetrics {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Width over height. Zero-area layouts produce a non-finite value.
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// Fixed page geometry around the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    /// Largest canvas the page will give out
    pub canvas_max: (f32, f32),
    /// Horizontal space kept clear on each side of the canvas
    pub margin: f32,
    /// Vertical space taken by the heading and the control strip
    pub chrome_height: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            canvas_max: (1600.0, 600.0),
            margin: 24.0,
            chrome_height: 220.0,
        }
    }
}

impl PageLayout {
    /// Canvas size for a window of the given logical size
    pub fn canvas_size(&self, window_width: f32, window_height: f32) -> (f32, f32) {
        let width = (window_width - 2.0 * self.margin).min(self.canvas_max.0).max(0.0);
        let height = (window_height - self.chrome_height).min(self.canvas_max.1).max(0.0);
        (width.floor(), height.floor())
    }

    /// Measure the canvas for a window of `physical` size at `scale_factor`
    pub fn measure(&self, physical: (u32, u32), scale_factor: f64) -> SurfaceMetrics {
        let logical_w = (physical.0 as f64 / scale_factor) as f32;
        let logical_h = (physical.1 as f64 / scale_factor) as f32;
        let (width, height) = self.canvas_size(logical_w, logical_h);
        SurfaceMetrics::new(width, height, scale_factor)
    }
}
