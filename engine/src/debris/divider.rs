//! Recursive space divider for crumbling.
//!
//! Tiles the unit face `[0,1]²` with exactly `count` rectangles by halving
//! the count and cutting the longer side in the same proportion. A small
//! jitter on the cut keeps the result from looking like a grid.

use rand::Rng;

/// Largest relative shift applied to a cut position.
const CUT_JITTER: f32 = 0.15;

/// One rectangle of a divided face, in face units (y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceCell {
    pub left: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceCell {
    /// The whole face.
    pub const UNIT: Self = Self {
        left: 0.0,
        bottom: 0.0,
        width: 1.0,
        height: 1.0,
    };

    #[inline]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.bottom + self.height
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Area shared with `other` (zero for cells that only touch).
    pub fn overlap_area(&self, other: &FaceCell) -> f32 {
        let w = self.right().min(other.right()) - self.left.max(other.left);
        let h = self.top().min(other.top()) - self.bottom.max(other.bottom);
        if w > 0.0 && h > 0.0 { w * h } else { 0.0 }
    }
}

/// Divide the unit face into exactly `count` cells.
pub fn divide_face<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<FaceCell> {
    let mut cells = Vec::with_capacity(count);
    if count > 0 {
        split(FaceCell::UNIT, count, rng, &mut cells);
    }
    cells
}

fn split<R: Rng + ?Sized>(cell: FaceCell, count: usize, rng: &mut R, out: &mut Vec<FaceCell>) {
    if count <= 1 {
        out.push(cell);
        return;
    }

    let first = count / 2;
    let second = count - first;
    let ratio = first as f32 / count as f32;
    let ratio = (ratio * (1.0 + rng.gen_range(-CUT_JITTER..CUT_JITTER))).clamp(0.05, 0.95);

    let (a, b) = if cell.width >= cell.height {
        let w = cell.width * ratio;
        (
            FaceCell { width: w, ..cell },
            FaceCell {
                left: cell.left + w,
                width: cell.width - w,
                ..cell
            },
        )
    } else {
        let h = cell.height * ratio;
        (
            FaceCell { height: h, ..cell },
            FaceCell {
                bottom: cell.bottom + h,
                height: cell.height - h,
                ..cell
            },
        )
    };

    split(a, first, rng, out);
    split(b, second, rng, out);
}
