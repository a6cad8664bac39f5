//! Guides and sample points: auxiliary markers placed on an image, which hold no pixels.

pub type GuideID = crate::UniqueID<Guide>;
pub type SamplePointID = crate::UniqueID<SamplePoint>;

#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Guide {
    pub(crate) id: GuideID,
    pub(crate) orientation: Orientation,
    /// Pixel offset from the top edge for horizontal guides, from the left edge for vertical guides.
    pub(crate) position: i32,
}
impl Guide {
    #[must_use]
    pub fn id(&self) -> GuideID {
        self.id
    }
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
    #[must_use]
    pub fn position(&self) -> i32 {
        self.position
    }
}

/// What a sample point reports.
#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum PickMode {
    #[default]
    Pixel,
    Rgb,
    Hsv,
    Lch,
    Cmyk,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct SamplePoint {
    pub(crate) id: SamplePointID,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) pick_mode: PickMode,
}
impl SamplePoint {
    #[must_use]
    pub fn id(&self) -> SamplePointID {
        self.id
    }
    #[must_use]
    pub fn position(&self) -> [i32; 2] {
        [self.x, self.y]
    }
    #[must_use]
    pub fn pick_mode(&self) -> PickMode {
        self.pick_mode
    }
}
