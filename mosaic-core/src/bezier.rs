//! # Bezier paths
//!
//! Renderable path descriptions. [`BezierPath`] owns its commands, [`BezierPathView`] borrows someone else's.
//! A path built from boundary segments copies their coordinates, and never refers back to the segments.

use crate::boundary::SortedBoundary;

pub type Point = [f64; 2];

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    /// Cubic curve through two control points to an end point.
    CurveTo(Point, Point, Point),
    ClosePath,
}
impl PathCommand {
    fn translate(&mut self, dx: f64, dy: f64) {
        let shift = |p: &mut Point| {
            p[0] += dx;
            p[1] += dy;
        };
        match self {
            Self::MoveTo(p) | Self::LineTo(p) => shift(p),
            Self::CurveTo(a, b, c) => {
                shift(a);
                shift(b);
                shift(c);
            }
            Self::ClosePath => (),
        }
    }
    fn for_each_point(&self, mut f: impl FnMut(Point)) {
        match *self {
            Self::MoveTo(p) | Self::LineTo(p) => f(p),
            Self::CurveTo(a, b, c) => {
                f(a);
                f(b);
                f(c);
            }
            Self::ClosePath => (),
        }
    }
}

/// An owned path.
///
/// Cloning makes an independent deep copy.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct BezierPath {
    commands: Vec<PathCommand>,
}
impl BezierPath {
    /// Take ownership of existing commands, without copying.
    #[must_use]
    pub fn new(commands: Vec<PathCommand>) -> Self {
        Self { commands }
    }
    /// Outline sorted boundary segments: one `MoveTo` per group, a `LineTo` for every segment,
    /// and a `ClosePath` for groups which are closed loops.
    ///
    /// The segments must come from [`crate::boundary::sort`] (and optionally `simplify`).
    #[must_use]
    pub fn from_bound_segs(sorted: &SortedBoundary) -> Self {
        let mut commands = Vec::with_capacity(sorted.segs().len() + 2 * sorted.n_groups());
        for (group, chain) in sorted.groups().enumerate() {
            let Some(first) = chain.first() else {
                continue;
            };
            debug_assert!(
                chain.windows(2).all(|pair| pair[0].end() == pair[1].start()),
                "boundary group {group} is not sorted"
            );
            commands.push(PathCommand::MoveTo([f64::from(first.x1), f64::from(first.y1)]));
            commands.extend(
                chain
                    .iter()
                    .map(|seg| PathCommand::LineTo([f64::from(seg.x2), f64::from(seg.y2)])),
            );
            if sorted.is_closed(group) {
                commands.push(PathCommand::ClosePath);
            }
        }
        Self { commands }
    }
    #[must_use]
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }
    #[must_use]
    pub fn into_commands(self) -> Vec<PathCommand> {
        self.commands
    }
    #[must_use]
    pub fn n_commands(&self) -> usize {
        self.commands.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
    #[must_use]
    pub fn as_view(&self) -> BezierPathView<'_> {
        BezierPathView {
            commands: &self.commands,
        }
    }
    /// Move every point in place.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for command in &mut self.commands {
            command.translate(dx, dy);
        }
    }
    #[must_use]
    pub fn bounds(&self) -> Option<[f64; 4]> {
        self.as_view().bounds()
    }
    #[must_use]
    pub fn to_svg_path(&self) -> String {
        self.as_view().to_svg_path()
    }
}
impl From<&SortedBoundary> for BezierPath {
    fn from(value: &SortedBoundary) -> Self {
        Self::from_bound_segs(value)
    }
}

/// A path borrowed from elsewhere. Cannot outlive, nor free, the commands it views.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct BezierPathView<'a> {
    commands: &'a [PathCommand],
}
impl<'a> BezierPathView<'a> {
    #[must_use]
    pub fn new(commands: &'a [PathCommand]) -> Self {
        Self { commands }
    }
    #[must_use]
    pub fn commands(&self) -> &'a [PathCommand] {
        self.commands
    }
    /// Copy the viewed commands into a new owned path.
    #[must_use]
    pub fn to_path(&self) -> BezierPath {
        BezierPath::new(self.commands.to_vec())
    }
    /// Bounding box of every point, control points included, as `[min x, min y, max x, max y]`.
    #[must_use]
    pub fn bounds(&self) -> Option<[f64; 4]> {
        let mut bounds: Option<[f64; 4]> = None;
        for command in self.commands {
            command.for_each_point(|[x, y]| {
                bounds = Some(match bounds {
                    None => [x, y, x, y],
                    Some([x1, y1, x2, y2]) => [x1.min(x), y1.min(y), x2.max(x), y2.max(y)],
                });
            });
        }
        bounds
    }
    /// Format as SVG path data, e.g. `M0 0L4 0L4 4Z`.
    #[must_use]
    pub fn to_svg_path(&self) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(self.commands.len() * 8);
        for command in self.commands {
            // Writing to a String is infallible.
            let _ = match command {
                PathCommand::MoveTo([x, y]) => write!(out, "M{x} {y}"),
                PathCommand::LineTo([x, y]) => write!(out, "L{x} {y}"),
                PathCommand::CurveTo([ax, ay], [bx, by], [x, y]) => {
                    write!(out, "C{ax} {ay} {bx} {by} {x} {y}")
                }
                PathCommand::ClosePath => write!(out, "Z"),
            };
        }
        out
    }
}
impl<'a> From<&'a BezierPath> for BezierPathView<'a> {
    fn from(value: &'a BezierPath) -> Self {
        value.as_view()
    }
}
