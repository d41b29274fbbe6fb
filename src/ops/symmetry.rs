use crate::canvas::PixelPos;

/// Mirror axes applied to brush and line writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Symmetry {
    /// Mirror across the vertical center line: x -> W-1-x.
    pub horizontal: bool,
    /// Mirror across the horizontal center line: y -> H-1-y.
    pub vertical: bool,
}

impl Symmetry {
    pub const NONE: Symmetry = Symmetry {
        horizontal: false,
        vertical: false,
    };

    pub fn is_active(&self) -> bool {
        self.horizontal || self.vertical
    }

    /// Flip one axis; the other keeps its state.
    pub fn toggle(&mut self, axis: Axis) {
        match axis {
            Axis::Horizontal => self.horizontal = !self.horizontal,
            Axis::Vertical => self.vertical = !self.vertical,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// The write set for one pixel: `p` plus its mirror images.
///
/// Coinciding mirrors (a pixel on the center line) appear once.
pub fn mirror_points(p: PixelPos, (w, h): (u32, u32), symmetry: Symmetry) -> Vec<PixelPos> {
    let mx = w as i32 - 1 - p.x;
    let my = h as i32 - 1 - p.y;

    let mut out = Vec::with_capacity(4);
    out.push(p);
    if symmetry.vertical {
        push_unique(&mut out, PixelPos::new(p.x, my));
    }
    if symmetry.horizontal {
        push_unique(&mut out, PixelPos::new(mx, p.y));
    }
    if symmetry.horizontal && symmetry.vertical {
        push_unique(&mut out, PixelPos::new(mx, my));
    }
    out
}

/// Mirror a whole path, e.g. a rasterized line.
pub fn mirror_path(points: &[PixelPos], size: (u32, u32), symmetry: Symmetry) -> Vec<PixelPos> {
    if !symmetry.is_active() {
        return points.to_vec();
    }
    points
        .iter()
        .flat_map(|&p| mirror_points(p, size, symmetry))
        .collect()
}

fn push_unique(out: &mut Vec<PixelPos>, p: PixelPos) {
    if !out.contains(&p) {
        out.push(p);
    }
}
