use crate::canvas::PixelPos;

/// Sub-steps per unit of x when sampling a sloped line.
const SAMPLES_PER_PIXEL: i64 = 100;

/// Integer pixels approximating the segment `p1 -> p2`.
///
/// Vertical segments cover `[min y, max y)`; sloped segments sample
/// `[min x, max x)` at 1/100 px steps and round each sample, so the result
/// carries duplicates. Equal endpoints give an empty path.
pub fn rasterize(p1: PixelPos, p2: PixelPos) -> Vec<PixelPos> {
    if p1 == p2 {
        return Vec::new();
    }

    if p1.x == p2.x {
        let (lo, hi) = (p1.y.min(p2.y), p1.y.max(p2.y));
        return (lo..hi).map(|y| PixelPos::new(p1.x, y)).collect();
    }

    let (a, b) = slope_intercept(p1, p2);
    let lo = p1.x.min(p2.x) as i64 * SAMPLES_PER_PIXEL;
    let hi = p1.x.max(p2.x) as i64 * SAMPLES_PER_PIXEL;

    let mut points = Vec::with_capacity((hi - lo) as usize);
    for step in lo..hi {
        let x = step as f64 / SAMPLES_PER_PIXEL as f64;
        let y = a * x + b;
        points.push(PixelPos::new(
            x.round_ties_even() as i32,
            y.round_ties_even() as i32,
        ));
    }
    points
}

/// `y = a*x + b` through both points. Caller guarantees `p1.x != p2.x`.
fn slope_intercept(p1: PixelPos, p2: PixelPos) -> (f64, f64) {
    let a = (p2.y - p1.y) as f64 / (p2.x - p1.x) as f64;
    let b = p1.y as f64 - a * p1.x as f64;
    (a, b)
}
