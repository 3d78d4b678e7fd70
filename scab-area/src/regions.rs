use itertools::Itertools;
use ndarray::Array2;

use crate::threshold::BinaryMask;

/// A top-level connected dark region.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Corners of the outer boundary, `[x, y]` in pixel-corner coordinates.
    pub vertices: Vec<[u32; 2]>,
    /// Shoelace area of `vertices` in px².
    pub area: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Heading {
    East,
    South,
    West,
    North,
}

impl Heading {
    // image coordinates, y grows downward
    fn step(self) -> (i64, i64) {
        match self {
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
            Heading::North => (0, -1),
        }
    }

    fn turn_left(self) -> Heading {
        match self {
            Heading::East => Heading::North,
            Heading::North => Heading::West,
            Heading::West => Heading::South,
            Heading::South => Heading::East,
        }
    }

    fn turn_right(self) -> Heading {
        match self {
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
            Heading::North => Heading::East,
        }
    }
}

/// Mask copy with a one pixel background frame, indexed `[row, col]`.
struct PaddedMask {
    cells: Array2<bool>,
}

impl PaddedMask {
    fn new(mask: &BinaryMask) -> PaddedMask {
        let (width, height) = (mask.width() as usize, mask.height() as usize);
        let cells = Array2::from_shape_fn((height + 2, width + 2), |(row, col)| {
            row > 0
                && col > 0
                && row <= height
                && col <= width
                && mask.is_foreground(col as u32 - 1, row as u32 - 1)
        });
        PaddedMask { cells }
    }

    /// Foreground test for the pixel touching corner `(cx, cy)` in quadrant `(qx, qy)`,
    /// each of `qx`, `qy` being -1 or 1.
    #[inline]
    fn quadrant(&self, cx: i64, cy: i64, qx: i64, qy: i64) -> bool {
        let row = (cy + (qy + 1) / 2) as usize;
        let col = (cx + (qx + 1) / 2) as usize;
        self.cells[[row, col]]
    }

    /// Background cells 4-connected to the frame. Anything else is dark or enclosed
    /// by a dark region.
    fn outside_background(&self) -> Array2<bool> {
        let (rows, cols) = self.cells.dim();
        let mut outside = Array2::from_elem((rows, cols), false);
        let mut node_stack = vec![(0usize, 0usize)];
        outside[[0, 0]] = true;

        while let Some((row, col)) = node_stack.pop() {
            let neighbors = [
                (row.wrapping_sub(1), col),
                (row + 1, col),
                (row, col.wrapping_sub(1)),
                (row, col + 1),
            ];
            for (nr, nc) in neighbors {
                if nr >= rows || nc >= cols {
                    continue;
                }
                if !self.cells[[nr, nc]] && !outside[[nr, nc]] {
                    outside[[nr, nc]] = true;
                    node_stack.push((nr, nc));
                }
            }
        }
        outside
    }

    /// Mark every cell of the 8-connected dark component holding `[row, col]`.
    /// Dark cells never sit on the frame, so the 3x3 neighbourhood stays in bounds.
    fn label_component(&self, visited: &mut Array2<bool>, row: usize, col: usize) {
        let mut node_stack = vec![(row, col)];
        visited[[row, col]] = true;

        while let Some((r, c)) = node_stack.pop() {
            for (nr, nc) in (r - 1..=r + 1).cartesian_product(c - 1..=c + 1) {
                if self.cells[[nr, nc]] && !visited[[nr, nc]] {
                    visited[[nr, nc]] = true;
                    node_stack.push((nr, nc));
                }
            }
        }
    }

    /// Follow the pixel-edge boundary of the 8-connected component whose topmost,
    /// leftmost pixel is `(x, y)`, keeping the component on the right-hand side.
    fn trace_outer_boundary(&self, x: u32, y: u32) -> Vec<[u32; 2]> {
        let start = (x as i64, y as i64);
        let (rows, cols) = self.cells.dim();
        let max_steps = 4 * rows * cols;

        let mut vertices = vec![[x, y]];
        let (mut cx, mut cy) = start;
        let mut heading = Heading::East;

        for _ in 0..max_steps {
            let (dx, dy) = heading.step();
            cx += dx;
            cy += dy;

            // ahead-left and ahead-right quadrants relative to the current heading
            let ahead_left = self.quadrant(cx, cy, dx + dy, dy - dx);
            let ahead_right = self.quadrant(cx, cy, dx - dy, dy + dx);
            let next = if ahead_left {
                heading.turn_left()
            } else if ahead_right {
                heading
            } else {
                heading.turn_right()
            };

            if (cx, cy) == start && next == Heading::East {
                return vertices;
            }
            if next != heading {
                vertices.push([cx as u32, cy as u32]);
            }
            heading = next;
        }

        debug_assert!(false, "boundary trace did not close at ({}, {})", x, y);
        vertices
    }
}

/// Area of a closed polygon by the shoelace formula.
pub fn polygon_area(vertices: &[[u32; 2]]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let twice_area: i64 = vertices
        .iter()
        .circular_tuple_windows::<(_, _)>()
        .map(|(a, b)| a[0] as i64 * b[1] as i64 - b[0] as i64 * a[1] as i64)
        .sum();
    twice_area.abs() as f64 / 2.0
}

/// Extract the outer boundaries of all top-level dark regions.
///
/// Regions sitting inside a hole of another region are skipped: their area is
/// already covered by the enclosing boundary. Results are in raster order of each
/// region's topmost, leftmost pixel.
pub fn extract_regions(mask: &BinaryMask) -> Vec<Region> {
    if mask.width() == 0 || mask.height() == 0 {
        return Vec::new();
    }
    let padded = PaddedMask::new(mask);
    let outside = padded.outside_background();
    let mut visited = Array2::from_elem(padded.cells.dim(), false);
    let mut regions = Vec::new();

    // row-major scan: the first cell met of each component is its topmost, leftmost pixel
    for ((row, col), &dark) in padded.cells.indexed_iter() {
        if !dark || visited[[row, col]] {
            continue;
        }
        padded.label_component(&mut visited, row, col);

        // top-level iff the background just above the first pixel reaches the frame
        if outside[[row - 1, col]] {
            let vertices = padded.trace_outer_boundary(col as u32 - 1, row as u32 - 1);
            let area = polygon_area(&vertices);
            regions.push(Region { vertices, area });
        }
    }
    regions
}
