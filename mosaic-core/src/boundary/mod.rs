//! # Boundaries
//!
//! Tracing of mask edges into directed segments on the pixel lattice, and the bookkeeping
//! to turn those into loops. A pixel is *inside* when its sampled value is at least the threshold.
//!
//! Segments are directed such that the inside always lies to the right of the direction of travel,
//! in image (y-down) coordinates. Filled areas therefore trace clockwise on screen and holes counter-clockwise,
//! giving filled loops a positive [signed area](SortedBoundary::group_area) and holes a negative one.

mod sort;

pub use sort::{simplify, sort, SortedBoundary};

use crate::buffer::PixelSource;
use crate::util::Rect;

/// Inside/outside cut-off used when none is specified.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// A single directed edge of a traced contour.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct BoundSeg {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// Leading edge in scan order: a top edge (inside below) or a left edge (inside to the right).
    pub open: bool,
    /// Scratch flag for the sorter. Always clear on segments handed out by this module.
    pub visited: bool,
}
impl BoundSeg {
    #[must_use]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32, open: bool) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            open,
            visited: false,
        }
    }
    #[must_use]
    pub fn start(&self) -> (i32, i32) {
        (self.x1, self.y1)
    }
    #[must_use]
    pub fn end(&self) -> (i32, i32) {
        (self.x2, self.y2)
    }
    /// Unit direction of travel. Segments are always axis aligned.
    #[must_use]
    pub fn direction(&self) -> (i32, i32) {
        ((self.x2 - self.x1).signum(), (self.y2 - self.y1).signum())
    }
    /// Twice the signed area contributed by this segment to a shoelace sum.
    #[must_use]
    fn cross(&self) -> i64 {
        i64::from(self.x1) * i64::from(self.y2) - i64::from(self.x2) * i64::from(self.y1)
    }
}

/// How the tracer treats the edges of the traced region.
#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum BoundaryType {
    /// Clip the trace to the region. Only transitions between two pixels of the region are emitted,
    /// so contours are cut open where they reach the region's border.
    WithinBounds,
    /// Let contours continue past the region, comparing its border against the pixels just outside it.
    /// Pixels outside the buffer repeat the nearest buffer pixel.
    IgnoreBounds,
}

/// Which component of a pixel is compared against the threshold.
#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum TraceFormat {
    /// Gray value, or luminance of color pixels.
    Luminance,
    Alpha,
}

/// Trace the edges of the mask within `region` of `buffer`.
///
/// One horizontal segment is emitted per maximal run of same-kind transitions between two rows,
/// and one unit vertical segment per transition between two columns of a row. The result is unordered;
/// see [`sort`]. Empty or uniform regions yield no segments.
pub fn trace(
    buffer: &impl PixelSource,
    region: Rect,
    format: TraceFormat,
    bound_type: BoundaryType,
    threshold: f32,
) -> Vec<BoundSeg> {
    let extent = buffer.extent();
    let Some(region) = region.intersect(&extent) else {
        return Vec::new();
    };
    let pixel_format = buffer.format();
    let inside = |x: i32, y: i32| -> bool {
        let (x, y) = extent.clamp(x, y);
        let pixel = buffer.pixel(x, y);
        let value = match format {
            TraceFormat::Luminance => pixel_format.luminance(pixel),
            TraceFormat::Alpha => pixel_format.alpha(pixel),
        };
        value >= threshold
    };
    // Rows are sampled one column beyond the region on each side, index 0 is `region.x1 - 1`.
    let sample_row = |y: i32| -> Vec<bool> {
        (region.x1 - 1..=region.x2).map(|x| inside(x, y)).collect()
    };

    let (first_line, last_line, first_col, last_col) = match bound_type {
        BoundaryType::WithinBounds => (region.y1 + 1, region.y2 - 1, region.x1 + 1, region.x2 - 1),
        BoundaryType::IgnoreBounds => (region.y1, region.y2, region.x1, region.x2),
    };

    let mut segs = Vec::new();
    let mut above = sample_row(region.y1 - 1);
    for y in region.y1..=region.y2 {
        let below = sample_row(y);
        if (first_line..=last_line).contains(&y) {
            horizontal_segs(&mut segs, region, y, &above, &below);
        }
        if y < region.y2 {
            for x in first_col..=last_col {
                let idx = (x - region.x1 + 1) as usize;
                match (below[idx - 1], below[idx]) {
                    // Left edge, inside to the right. Travels up.
                    (false, true) => segs.push(BoundSeg::new(x, y + 1, x, y, true)),
                    // Right edge, inside to the left. Travels down.
                    (true, false) => segs.push(BoundSeg::new(x, y, x, y + 1, false)),
                    _ => (),
                }
            }
        }
        above = below;
    }

    log::trace!(
        "Traced {} segments in {:?} ({})",
        segs.len(),
        region,
        bound_type.as_ref()
    );
    segs
}

/// Emit the horizontal runs of line `y`, between the rows `above` and `below`.
fn horizontal_segs(segs: &mut Vec<BoundSeg>, region: Rect, y: i32, above: &[bool], below: &[bool]) {
    // Some(true) for a top edge (inside below), Some(false) for a bottom edge.
    let kind_at = |x: i32| -> Option<bool> {
        let idx = (x - region.x1 + 1) as usize;
        (above[idx] != below[idx]).then_some(below[idx])
    };
    let mut run: Option<(i32, bool)> = None;
    for x in region.x1..=region.x2 {
        let kind = if x < region.x2 { kind_at(x) } else { None };
        match (run, kind) {
            (Some((_, run_kind)), Some(kind)) if run_kind == kind => continue,
            (Some((start, top)), _) => {
                segs.push(if top {
                    BoundSeg::new(start, y, x, y, true)
                } else {
                    BoundSeg::new(x, y, start, y, false)
                });
            }
            (None, _) => (),
        }
        run = kind.map(|kind| (x, kind));
    }
}

/// Translate every segment in place.
pub fn offset(segs: &mut [BoundSeg], dx: i32, dy: i32) {
    for seg in segs {
        seg.x1 += dx;
        seg.y1 += dy;
        seg.x2 += dx;
        seg.y2 += dy;
    }
}
