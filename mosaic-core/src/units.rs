//! Physical units of an image, and the resolution relating them to pixels.

use crate::util::{FiniteF32, FiniteF32Error};

pub const MM_PER_IN: f32 = 25.4;
/// Constant varies by who you ask - but this is the one defined by W3C.
pub const PT_PER_IN: f32 = 72.0;
pub const PC_PER_IN: f32 = 6.0;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UnitParseError {
    #[error(transparent)]
    Value(#[from] std::num::ParseFloatError),
    #[error(transparent)]
    NotFinite(#[from] FiniteF32Error),
    #[error("unknown unit")]
    UnrecognizedUnit,
}

/// The unit in which an image's dimensions are presented.
#[derive(strum::AsRefStr, strum::EnumIter, Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Unit {
    #[default]
    #[strum(serialize = "px")]
    Pixel,
    #[strum(serialize = "in")]
    Inch,
    #[strum(serialize = "mm")]
    Millimeter,
    /// Typographic points, as defined by W3C.
    #[strum(serialize = "pt")]
    Point,
    #[strum(serialize = "pc")]
    Pica,
}
impl Unit {
    /// How many of this unit fit in an inch. `None` for pixels, which depend on resolution.
    #[must_use]
    pub fn per_inch(self) -> Option<f32> {
        match self {
            Self::Pixel => None,
            Self::Inch => Some(1.0),
            Self::Millimeter => Some(MM_PER_IN),
            Self::Point => Some(PT_PER_IN),
            Self::Pica => Some(PC_PER_IN),
        }
    }
}
impl std::str::FromStr for Unit {
    type Err = UnitParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use strum::IntoEnumIterator;
        let s = s.trim_ascii();
        Self::iter()
            .find(|unit| unit.as_ref().eq_ignore_ascii_case(s))
            .ok_or(UnitParseError::UnrecognizedUnit)
    }
}

/// Pixels per inch along each axis, and the unit the image is presented in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub x: FiniteF32,
    pub y: FiniteF32,
    pub unit: Unit,
}
impl Default for Resolution {
    fn default() -> Self {
        // Unwrap OK - literal.
        let ppi = FiniteF32::new(72.0).unwrap();
        Self {
            x: ppi,
            y: ppi,
            unit: Unit::Inch,
        }
    }
}
impl Resolution {
    pub fn new(x_ppi: f32, y_ppi: f32, unit: Unit) -> Result<Self, FiniteF32Error> {
        Ok(Self {
            x: FiniteF32::new(x_ppi)?,
            y: FiniteF32::new(y_ppi)?,
            unit,
        })
    }
    /// Size of a `width` by `height` pixel area, measured in `unit`.
    #[must_use]
    pub fn size_in(&self, width: u32, height: u32, unit: Unit) -> [f32; 2] {
        let (width, height) = (width as f32, height as f32);
        match unit.per_inch() {
            None => [width, height],
            Some(per_inch) => [
                width / self.x.get() * per_inch,
                height / self.y.get() * per_inch,
            ],
        }
    }
}
impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}ppi ({})", self.x.get(), self.y.get(), self.unit.as_ref())
    }
}

#[cfg(test)]
mod test {
    use super::{Resolution, Unit};

    #[test]
    fn parse_units() {
        assert_eq!(" MM ".parse::<Unit>(), Ok(Unit::Millimeter));
        assert_eq!("px".parse::<Unit>(), Ok(Unit::Pixel));
        assert!("furlong".parse::<Unit>().is_err());
    }
    #[test]
    fn conversions() {
        let res = Resolution::new(300.0, 150.0, Unit::Millimeter).unwrap();
        let [w, h] = res.size_in(600, 300, Unit::Inch);
        assert!((w - 2.0).abs() < 1e-5);
        assert!((h - 2.0).abs() < 1e-5);
        let [mm, _] = res.size_in(300, 1, Unit::Millimeter);
        assert!((mm - 25.4).abs() < 1e-4);
        assert_eq!(res.size_in(12, 7, Unit::Pixel), [12.0, 7.0]);
        assert!(Resolution::new(f32::NAN, 1.0, Unit::Inch).is_err());
        assert_eq!(res.to_string(), "300x150ppi (mm)");
    }
}
