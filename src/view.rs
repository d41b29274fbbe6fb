use serde::{Deserialize, Serialize};

use crate::canvas::PixelPos;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 64.0;
/// Floor for the continuous wheel mode; steps that reach it are refused.
pub const MIN_CONTINUOUS_ZOOM: f32 = 0.1;
/// Wheel delta that adds 1.0 to the zoom in continuous mode.
const WHEEL_SENSITIVITY: f32 = 500.0;

/// Pointer position in view (screen) pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewPos {
    pub x: f32,
    pub y: f32,
}

impl ViewPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// View position -> image pixel: subtract the canvas origin, divide by zoom, floor.
///
/// The result may lie outside the canvas; callers bounds-check before writing.
pub fn view_to_image(view: ViewPos, origin: ViewPos, zoom: f32) -> PixelPos {
    let sx = (view.x - origin.x) / zoom;
    let sy = (view.y - origin.y) / zoom;
    PixelPos::new(sx.floor() as i32, sy.floor() as i32)
}

/// Screen position of a pixel's top-left corner.
pub fn image_to_view(pixel: PixelPos, origin: ViewPos, zoom: f32) -> ViewPos {
    ViewPos::new(
        origin.x + pixel.x as f32 * zoom,
        origin.y + pixel.y as f32 * zoom,
    )
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomMode {
    /// Zoom snaps to powers of two within [MIN_ZOOM, MAX_ZOOM].
    #[default]
    PowerOfTwo,
    /// Wheel deltas change zoom linearly.
    Continuous,
}

/// Zoom factor and canvas placement inside the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    zoom: f32,
    /// Top-left of the rendered canvas in view space (includes scroll offset).
    pub origin: ViewPos,
    pub mode: ZoomMode,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ZoomMode::PowerOfTwo)
    }
}

impl Viewport {
    pub fn new(mode: ZoomMode) -> Self {
        Self {
            zoom: 1.0,
            origin: ViewPos::default(),
            mode,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    pub fn set_zoom(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.zoom = match self.mode {
            ZoomMode::PowerOfTwo => quantize_pow2(factor),
            ZoomMode::Continuous => factor.clamp(MIN_CONTINUOUS_ZOOM, MAX_ZOOM),
        };
    }

    pub fn zoom_in(&mut self) {
        match self.mode {
            ZoomMode::PowerOfTwo => self.zoom = quantize_pow2(self.zoom * 2.0),
            ZoomMode::Continuous => self.zoom = (self.zoom * 2.0).min(MAX_ZOOM),
        }
    }

    pub fn zoom_out(&mut self) {
        match self.mode {
            ZoomMode::PowerOfTwo => self.zoom = quantize_pow2(self.zoom / 2.0),
            ZoomMode::Continuous => {
                let z = self.zoom / 2.0;
                if z > MIN_CONTINUOUS_ZOOM {
                    self.zoom = z;
                }
            }
        }
    }

    /// Mouse-wheel zoom. `delta` is the wheel angle delta (120 per notch on most mice).
    pub fn apply_wheel(&mut self, delta: f32) {
        if delta == 0.0 || !delta.is_finite() {
            return;
        }
        match self.mode {
            ZoomMode::PowerOfTwo => {
                if delta > 0.0 {
                    self.zoom_in();
                } else {
                    self.zoom_out();
                }
            }
            ZoomMode::Continuous => {
                let z = self.zoom + delta / WHEEL_SENSITIVITY;
                if z > MIN_CONTINUOUS_ZOOM {
                    self.zoom = z.min(MAX_ZOOM);
                }
            }
        }
    }

    pub fn to_image(&self, view: ViewPos) -> PixelPos {
        view_to_image(view, self.origin, self.zoom)
    }

    pub fn to_view(&self, pixel: PixelPos) -> ViewPos {
        image_to_view(pixel, self.origin, self.zoom)
    }

    /// On-screen size of a `w x h` canvas at the current zoom.
    pub fn scaled_size(&self, (w, h): (u32, u32)) -> (u32, u32) {
        scaled_size((w, h), self.zoom)
    }
}

pub fn scaled_size((w, h): (u32, u32), zoom: f32) -> (u32, u32) {
    (
        ((w as f32 * zoom).floor() as u32).max(1),
        ((h as f32 * zoom).floor() as u32).max(1),
    )
}

/// Nearest power of two in log space, clamped to the zoom range.
fn quantize_pow2(factor: f32) -> f32 {
    let exp = factor.log2().round();
    2f32.powf(exp).clamp(MIN_ZOOM, MAX_ZOOM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_to_image_uses_floor() {
        let origin = ViewPos::new(10.0, 20.0);
        // 8x zoom: view x 10..17.99 is pixel 0, 18 is pixel 1
        assert_eq!(view_to_image(ViewPos::new(17.9, 27.9), origin, 8.0), PixelPos::new(0, 0));
        assert_eq!(view_to_image(ViewPos::new(18.0, 28.0), origin, 8.0), PixelPos::new(1, 1));
        // Just past the half-pixel mark must not round up
        assert_eq!(view_to_image(ViewPos::new(14.5, 24.5), origin, 8.0), PixelPos::new(0, 0));
    }

    #[test]
    fn test_view_to_image_left_of_canvas_is_negative() {
        let origin = ViewPos::new(10.0, 10.0);
        assert_eq!(view_to_image(ViewPos::new(9.0, 9.0), origin, 4.0), PixelPos::new(-1, -1));
    }

    #[test]
    fn test_fractional_zoom() {
        let origin = ViewPos::default();
        assert_eq!(view_to_image(ViewPos::new(1.9, 0.0), origin, 0.5), PixelPos::new(3, 0));
    }

    #[test]
    fn test_image_to_view_inverts_mapping() {
        let vp = Viewport {
            zoom: 4.0,
            origin: ViewPos::new(3.0, 5.0),
            mode: ZoomMode::PowerOfTwo,
        };
        let pixel = PixelPos::new(7, 2);
        assert_eq!(vp.to_image(vp.to_view(pixel)), pixel);
    }

    #[test]
    fn test_power_of_two_quantization() {
        let mut vp = Viewport::default();
        vp.set_zoom(3.0);
        assert_eq!(vp.zoom(), 4.0);
        vp.set_zoom(5.0);
        assert_eq!(vp.zoom(), 4.0);
        vp.set_zoom(6.0);
        assert_eq!(vp.zoom(), 8.0);
        vp.set_zoom(1000.0);
        assert_eq!(vp.zoom(), MAX_ZOOM);
        vp.set_zoom(0.01);
        assert_eq!(vp.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_zoom_steps_clamp() {
        let mut vp = Viewport::default();
        for _ in 0..20 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom(), 64.0);
        for _ in 0..20 {
            vp.apply_wheel(-120.0);
        }
        assert_eq!(vp.zoom(), 0.5);
        vp.apply_wheel(120.0);
        assert_eq!(vp.zoom(), 1.0);
        assert_eq!(vp.zoom_percent(), 100);
    }

    #[test]
    fn test_invalid_zoom_ignored() {
        let mut vp = Viewport::default();
        vp.set_zoom(0.0);
        vp.set_zoom(-2.0);
        vp.set_zoom(f32::NAN);
        assert_eq!(vp.zoom(), 1.0);
    }

    #[test]
    fn test_continuous_wheel() {
        let mut vp = Viewport::new(ZoomMode::Continuous);
        vp.apply_wheel(250.0);
        assert!((vp.zoom() - 1.5).abs() < 1e-6);
        // A step that would drop to 0.1 or below is refused
        vp.set_zoom(0.2);
        vp.apply_wheel(-100.0);
        assert!((vp.zoom() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_scaled_size_never_zero() {
        assert_eq!(scaled_size((1, 1), 0.5), (1, 1));
        assert_eq!(scaled_size((10, 3), 4.0), (40, 12));
    }
}
