//! Utility types, used throughout the crate.

/// A float which is never NaN nor infinite.
#[derive(Copy, Clone, PartialEq, PartialOrd, bytemuck::NoUninit, bytemuck::Zeroable, Debug)]
#[repr(transparent)]
pub struct FiniteF32(f32);
impl FiniteF32 {
    pub const ZERO: Self = Self(0.0);
    pub const ONE: Self = Self(1.0);
    pub fn new(val: f32) -> Result<Self, FiniteF32Error> {
        if val.is_finite() {
            // Normalize -0.0, so that equal values hash equally.
            Ok(Self(val + 0.0))
        } else {
            Err(FiniteF32Error::NotFinite)
        }
    }
    /// Clamp into `[0, 1]`, as used by opacities and thresholds.
    pub fn new_unit(val: f32) -> Result<Self, FiniteF32Error> {
        Self::new(val).map(|v| Self(v.0.clamp(0.0, 1.0)))
    }
    #[must_use]
    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for FiniteF32 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<f32> for FiniteF32 {
    type Error = FiniteF32Error;
    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
impl From<FiniteF32> for f32 {
    fn from(value: FiniteF32) -> Self {
        value.get()
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiniteF32Error {
    #[error("not finite")]
    NotFinite,
}

// No NaN means PartialEq is total.
impl Eq for FiniteF32 {}
#[allow(clippy::derive_ord_xor_partial_ord)]
impl Ord for FiniteF32 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}
impl std::hash::Hash for FiniteF32 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u32(self.0.to_bits());
    }
}

/// An integer pixel rectangle, `[x1, x2) x [y1, y2)`.
///
/// A rectangle with `x2 <= x1` or `y2 <= y1` is empty. Empty rectangles
/// are valid values, and intersect with nothing.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}
impl Rect {
    pub const EMPTY: Self = Self {
        x1: 0,
        y1: 0,
        x2: 0,
        y2: 0,
    };
    /// Construct from the two corners. The max corner is exclusive.
    #[must_use]
    pub const fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }
    /// Construct from the min corner and a size. A max corner past `i32::MAX` is clamped to it, so the
    /// result may be smaller than asked for. See [`Self::try_from_size`].
    #[must_use]
    pub const fn from_size(x: i32, y: i32, width: u32, height: u32) -> Self {
        const fn extend(start: i32, len: u32) -> i32 {
            if len > i32::MAX as u32 {
                i32::MAX
            } else {
                start.saturating_add(len as i32)
            }
        }
        Self {
            x1: x,
            y1: y,
            x2: extend(x, width),
            y2: extend(y, height),
        }
    }
    /// As [`Self::from_size`], or `None` if the max corner is not representable.
    #[must_use]
    pub fn try_from_size(x: i32, y: i32, width: u32, height: u32) -> Option<Self> {
        let x2 = x.checked_add(i32::try_from(width).ok()?)?;
        let y2 = y.checked_add(i32::try_from(height).ok()?)?;
        Some(Self::from_corners(x, y, x2, y2))
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        u32::try_from(i64::from(self.x2) - i64::from(self.x1)).unwrap_or(0)
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        u32::try_from(i64::from(self.y2) - i64::from(self.y1)).unwrap_or(0)
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
    #[must_use]
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.is_empty()
            || (other.x1 >= self.x1
                && other.y1 >= self.y1
                && other.x2 <= self.x2
                && other.y2 <= self.y2)
    }
    /// Overlapping area of the two rectangles, or `None` if they do not touch.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let rect = Self {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        (!rect.is_empty()).then_some(rect)
    }
    #[must_use = "returns a new rect and does not modify `self`"]
    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }
    /// Clamp a point into the rect, which must not be empty.
    #[must_use]
    pub fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        debug_assert!(!self.is_empty());
        (x.clamp(self.x1, self.x2 - 1), y.clamp(self.y1, self.y2 - 1))
    }
}

#[cfg(test)]
mod test {
    use super::{FiniteF32, Rect};
    #[test]
    fn finite_rejects_nan() {
        assert!(FiniteF32::new(f32::NAN).is_err());
        assert!(FiniteF32::new(f32::INFINITY).is_err());
        assert_eq!(FiniteF32::new_unit(2.0).unwrap(), FiniteF32::ONE);
    }
    #[test]
    fn rect_intersect() {
        let a = Rect::from_corners(0, 0, 10, 10);
        let b = Rect::from_corners(5, -5, 20, 5);
        assert_eq!(a.intersect(&b), Some(Rect::from_corners(5, 0, 10, 5)));
        // Touching edges share no pixels.
        let c = Rect::from_corners(10, 0, 12, 10);
        assert_eq!(a.intersect(&c), None);
        assert!(a.contains_rect(&Rect::EMPTY));
    }
    #[test]
    fn rect_size_limits() {
        assert_eq!(Rect::try_from_size(-4, 2, 8, 1), Some(Rect::from_corners(-4, 2, 4, 3)));
        assert_eq!(Rect::try_from_size(i32::MAX - 647, 0, 1000, 10), None);
        assert_eq!(Rect::try_from_size(0, 0, u32::MAX, 1), None);
        let clamped = Rect::from_size(i32::MAX - 647, 0, 1000, u32::MAX);
        assert_eq!(clamped, Rect::from_corners(i32::MAX - 647, 0, i32::MAX, i32::MAX));
        assert_eq!(clamped.width(), 647);
        assert_eq!(Rect::from_corners(i32::MIN, 0, i32::MAX, 1).width(), u32::MAX);
    }
    #[test]
    fn rect_clamp() {
        let a = Rect::from_size(2, 2, 3, 3);
        assert_eq!(a.clamp(-10, 100), (2, 4));
        assert_eq!(a.width(), 3);
        assert!(Rect::from_corners(3, 3, 1, 5).is_empty());
    }
}
