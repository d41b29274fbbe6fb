//! Canvas presentation: nearest-neighbor upscaling plus the optional pixel grid.

use image::{Rgba, RgbaImage};

use crate::canvas::PixelBuffer;
use crate::settings::GridSettings;
use crate::view::scaled_size;

/// Rectangle of the zoomed canvas, in zoomed pixels from its top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RenderRegion {
    /// Clip to a `w x h` zoomed canvas. `None` when nothing is left.
    pub fn clipped_to(self, (w, h): (u32, u32)) -> Option<Self> {
        let x_end = self.x.saturating_add(self.width).min(w);
        let y_end = self.y.saturating_add(self.height).min(h);
        if self.x >= x_end || self.y >= y_end {
            return None;
        }
        Some(Self {
            x: self.x,
            y: self.y,
            width: x_end - self.x,
            height: y_end - self.y,
        })
    }
}

/// Rasterize the whole of `buffer` at `zoom`, for export.
///
/// The output is `W*zoom x H*zoom` RGBA and is allocated in one piece
/// (a 512x512 canvas at 64x is 4 GiB). Interactive shells should use
/// [`render_region`] with the visible rectangle instead.
pub fn render(buffer: &PixelBuffer, zoom: f32, grid: &GridSettings) -> RgbaImage {
    let (dw, dh) = scaled_size(buffer.size(), zoom);
    let full = RenderRegion {
        x: 0,
        y: 0,
        width: dw,
        height: dh,
    };
    render_region(buffer, zoom, grid, full).unwrap_or_default()
}

/// Rasterize only `region` of the zoomed canvas. Memory is bounded by the
/// region size, not the zoom. `None` when the region misses the canvas.
///
/// Each output pixel samples the source pixel under its top-left corner.
/// Grid lines are drawn on the first row/column of every source pixel.
pub fn render_region(
    buffer: &PixelBuffer,
    zoom: f32,
    grid: &GridSettings,
    region: RenderRegion,
) -> Option<RgbaImage> {
    let (sw, sh) = buffer.size();
    let region = region.clipped_to(scaled_size((sw, sh), zoom))?;
    let src = buffer.as_image();

    let grid_color = grid.visible_at(zoom).then(|| {
        let c = grid.color();
        Rgba([c[0], c[1], c[2], 255])
    });

    // Column -> source x, computed once per frame.
    let x_map: Vec<(u32, bool)> = (region.x..region.x + region.width)
        .map(|dx| source_index(dx, zoom, sw))
        .collect();

    let mut out = RgbaImage::new(region.width, region.height);
    for oy in 0..region.height {
        let (sy, row_edge) = source_index(region.y + oy, zoom, sh);
        for (dx, &(sx, col_edge)) in x_map.iter().enumerate() {
            let pixel = match grid_color {
                Some(g) if row_edge || col_edge => g,
                _ => {
                    let p = src.get_pixel(sx, sy);
                    Rgba([p[0], p[1], p[2], 255])
                }
            };
            out.put_pixel(dx as u32, oy, pixel);
        }
    }
    Some(out)
}

/// Source index for output coordinate `d`, and whether `d` is the first
/// output pixel of that source cell.
fn source_index(d: u32, zoom: f32, len: u32) -> (u32, bool) {
    let s = ((d as f32 / zoom).floor() as u32).min(len - 1);
    let edge = d == 0 || ((d - 1) as f32 / zoom).floor() as u32 != s;
    (s, edge)
}
