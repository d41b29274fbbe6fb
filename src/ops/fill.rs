use crate::canvas::{Color, PixelBuffer, PixelPos};

/// Paint the 4-connected region of `seed`'s color with `new_color`.
///
/// Returns the number of pixels painted. A seed outside the buffer, or a
/// region that already has `new_color`, leaves the buffer untouched.
pub fn flood_fill(buffer: &mut PixelBuffer, seed: PixelPos, new_color: Color) -> usize {
    let Ok(target) = buffer.get_at(seed) else {
        return 0;
    };
    if target == new_color {
        return 0;
    }

    let (w, h) = buffer.size();
    let (wu, hu) = (w as usize, h as usize);
    let flat_index = |p: PixelPos| p.y as usize * wu + p.x as usize;

    // Marked at discovery so each pixel is pushed at most once.
    let mut visited = vec![false; wu * hu];
    let mut stack: Vec<PixelPos> = Vec::with_capacity(1024);
    visited[flat_index(seed)] = true;
    stack.push(seed);

    let mut painted = 0;
    while let Some(pos) = stack.pop() {
        match buffer.get_at(pos) {
            Ok(c) if c == target => {}
            _ => continue,
        }
        if buffer.set_at(pos, new_color).is_ok() {
            painted += 1;
        }

        for n in neighbors(pos) {
            if buffer.contains(n) {
                let idx = flat_index(n);
                if !visited[idx] {
                    visited[idx] = true;
                    stack.push(n);
                }
            }
        }
    }
    painted
}

fn neighbors(p: PixelPos) -> [PixelPos; 4] {
    [
        PixelPos::new(p.x, p.y - 1),
        PixelPos::new(p.x, p.y + 1),
        PixelPos::new(p.x - 1, p.y),
        PixelPos::new(p.x + 1, p.y),
    ]
}
