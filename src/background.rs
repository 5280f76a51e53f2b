//! Background color and parallax layers.

use macroquad::color::Color;

/// Packs a color as `0xRRGGBBAA`.
pub fn color_to_u32(color: Color) -> u32 {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(color.r) << 24) | (channel(color.g) << 16) | (channel(color.b) << 8) | channel(color.a)
}

/// Unpacks a `0xRRGGBBAA` value.
pub fn color_from_u32(value: u32) -> Color {
    let channel = |shift: u32| ((value >> shift) & 0xff) as f32 / 255.0;
    Color::new(channel(24), channel(16), channel(8), channel(0))
}

/// An image scrolled behind the map at its own speed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallaxLayer {
    /// Image file
    pub file_name: Option<String>,
    /// Repeat vertically
    pub v_tile: bool,
    /// Repeat horizontally
    pub h_tile: bool,
    /// Scroll vertically with the camera
    pub v_scroll: bool,
    /// Scroll horizontally with the camera
    pub h_scroll: bool,
    /// Vertical scroll rate relative to the camera
    pub v_scroll_speed: f32,
    /// Horizontal scroll rate relative to the camera
    pub h_scroll_speed: f32,
    /// Hidden layers are still saved
    pub visible: bool,
}

impl Default for ParallaxLayer {
    fn default() -> Self {
        Self {
            file_name: None,
            v_tile: false,
            h_tile: false,
            v_scroll: false,
            h_scroll: false,
            v_scroll_speed: 1.0,
            h_scroll_speed: 1.0,
            visible: true,
        }
    }
}

impl ParallaxLayer {
    /// Default layer showing `file_name`.
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: Some(file_name.to_string()),
            ..Self::default()
        }
    }
}

/// Level background.
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    /// Clear color
    pub color: Color,
    /// Parallax layers, back to front
    pub parallaxes: Vec<ParallaxLayer>,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            color: Color::new(0.0, 0.0, 0.0, 1.0),
            parallaxes: Vec::new(),
        }
    }
}
