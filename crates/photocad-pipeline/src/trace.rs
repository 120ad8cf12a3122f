//! Line tracing: extract raw point sequences from a binary edge mask.
//!
//! Pixels are scanned in raster order. Each unvisited "on" pixel seeds
//! an 8-connected depth-first flood. A coordinate counts as visited the
//! first time it is popped off the stack, whether or not it is on, so
//! every pixel is handled at most once and the whole pass is
//! O(width × height).
//!
//! One connected component becomes exactly one [`RawTrace`], with its
//! points in DFS discovery order. That order is not a geometric walk:
//! a thick or branching component comes out zig-zagged. See
//! [`crate::order`] for the opt-in re-chaining.

use crate::feature::RawTrace;
use crate::types::{PixelBuffer, Point};

/// A mask pixel is "on" when its intensity is strictly above this.
pub const ON_THRESHOLD: u8 = 128;

/// Neighbour offsets `(dx, dy)`, pushed in this order.
///
/// The stack pops the last entry first, so the flood prefers the
/// lower-right neighbour.
const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Trace every connected component of "on" pixels in `mask`.
///
/// Components with fewer than `min_line_length` points are dropped
/// whole; they are not split into smaller traces.
///
/// This is step 3 in the pipeline, between edge detection and
/// classification.
#[must_use = "returns the traced point sequences"]
pub fn trace_lines(mask: &PixelBuffer, min_line_length: usize) -> Vec<RawTrace> {
    let (width, height) = mask.dimensions();
    let mut visited = vec![false; width as usize * height as usize];
    let mut stack = Vec::new();
    let mut traces = Vec::new();
    let mut discarded = 0usize;

    for y in 0..height {
        for x in 0..width {
            if visited[index(x, y, width)] || !is_on(mask, x, y) {
                continue;
            }
            let points = flood(mask, (x, y), &mut visited, &mut stack);
            if points.len() >= min_line_length {
                traces.push(RawTrace::new(points));
            } else {
                discarded += 1;
            }
        }
    }

    log::debug!(
        "traced {} components ({discarded} shorter than {min_line_length} points discarded)",
        traces.len(),
    );
    traces
}

/// Depth-first flood from `start`, returning the "on" pixels in
/// discovery order.
///
/// `stack` is scratch space reused across components.
fn flood(
    mask: &PixelBuffer,
    start: (u32, u32),
    visited: &mut [bool],
    stack: &mut Vec<(u32, u32)>,
) -> Vec<Point> {
    let (width, height) = mask.dimensions();
    let mut points = Vec::new();
    stack.clear();
    stack.push(start);

    while let Some((x, y)) = stack.pop() {
        let idx = index(x, y, width);
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        if !is_on(mask, x, y) {
            continue;
        }
        points.push(Point::new(f64::from(x), f64::from(y)));

        for (dx, dy) in NEIGHBOURS {
            let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy)) else {
                continue;
            };
            if nx < width && ny < height {
                stack.push((nx, ny));
            }
        }
    }

    points
}

fn is_on(mask: &PixelBuffer, x: u32, y: u32) -> bool {
    mask.get_pixel(x, y).0[0] > ON_THRESHOLD
}

const fn index(x: u32, y: u32, width: u32) -> usize {
    y as usize * width as usize + x as usize
}
