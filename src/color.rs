//! Background presets and clear colours
//!
//! Each preset pairs the page container's colour token with the numeric
//! colour the renderer clears the canvas to. The two are always applied
//! together by the viewer.

/// A packed 0xRRGGBB colour, as used for renderer clear colours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearColor(pub u32);

impl ClearColor {
    pub fn hex(self) -> u32 {
        self.0 & 0x00ff_ffff
    }

    /// Components in 0.0-1.0, still sRGB encoded
    pub fn to_srgb(self) -> [f64; 3] {
        let hex = self.hex();
        [
            ((hex >> 16) & 0xff) as f64 / 255.0,
            ((hex >> 8) & 0xff) as f64 / 255.0,
            (hex & 0xff) as f64 / 255.0,
        ]
    }

    /// Components decoded to linear light.
    ///
    /// Clearing an sRGB render target with these values stores exactly the
    /// hex colour in the target.
    pub fn to_linear(self) -> [f64; 3] {
        self.to_srgb().map(srgb_to_linear)
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        let [r, g, b] = self.to_linear();
        wgpu::Color { r, g, b, a: 1.0 }
    }
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Background colour selections offered by the control buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundPreset {
    #[default]
    Pink,
    Dark,
    Green,
}

impl BackgroundPreset {
    /// Button order
    pub const ALL: [BackgroundPreset; 3] = [
        BackgroundPreset::Pink,
        BackgroundPreset::Dark,
        BackgroundPreset::Green,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BackgroundPreset::Pink => "Pink",
            BackgroundPreset::Dark => "Dark",
            BackgroundPreset::Green => "Green",
        }
    }

    /// Colour token applied to the page container
    pub fn container_token(self) -> &'static str {
        match self {
            BackgroundPreset::Pink => "bg-pink-100",
            BackgroundPreset::Dark => "bg-gray-900",
            BackgroundPreset::Green => "bg-green-100",
        }
    }

    /// Concrete RGB of `container_token`
    pub fn container_rgb(self) -> [u8; 3] {
        match self {
            BackgroundPreset::Pink => [0xfc, 0xe7, 0xf3],
            BackgroundPreset::Dark => [0x11, 0x18, 0x27],
            BackgroundPreset::Green => [0xdc, 0xfc, 0xe7],
        }
    }

    /// Colour the renderer clears the canvas to
    pub fn clear_color(self) -> ClearColor {
        match self {
            BackgroundPreset::Pink => ClearColor(0xf5e6e8),
            BackgroundPreset::Dark => ClearColor(0x222222),
            BackgroundPreset::Green => ClearColor(0xe0ffea),
        }
    }

    /// RGB of the button face
    pub fn button_rgb(self) -> [u8; 3] {
        match self {
            BackgroundPreset::Pink => [0xec, 0x48, 0x99],
            BackgroundPreset::Dark => [0x11, 0x18, 0x27],
            BackgroundPreset::Green => [0x22, 0xc5, 0x5e],
        }
    }
}

/// User-selectable viewer state; lives as long as the mounted viewer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerState {
    pub background: BackgroundPreset,
}

impl ViewerState {
    pub fn container_token(&self) -> &'static str {
        self.background.container_token()
    }
}
