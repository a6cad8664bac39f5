//! # State
//!
//! The mutable entities of a document: the [`Image`] with its items, guides, sample points, and the
//! assorted image-wide properties. Clients read state freely; all modification goes through the
//! [`writer`]s handed out by [`crate::history::UndoHistory`], so that every change is recorded as an undo.

pub mod aux_item;
pub mod item;
pub mod writer;

use std::sync::Arc;

pub use aux_item::{Guide, GuideID, Orientation, PickMode, SamplePoint, SamplePointID};
pub use item::{Item, ItemID, ItemKind, ItemTree};

use crate::buffer::{Depth, PixelBuffer};
use crate::units::Resolution;
use crate::util::FiniteF32;

pub type ImageID = crate::UniqueID<Image>;

#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum BaseType {
    #[default]
    Rgb,
    Gray,
    Indexed,
}

/// Tone response curve of stored values.
#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Trc {
    Linear,
    #[default]
    NonLinear,
    Perceptual,
}

/// Storage type and encoding of pixel components.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Precision {
    pub depth: Depth,
    pub trc: Trc,
}
impl Default for Precision {
    fn default() -> Self {
        Self {
            depth: Depth::U8,
            trc: Trc::NonLinear,
        }
    }
}

#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum GridStyle {
    Dots,
    Intersections,
    OnOffDash,
    DoubleDash,
    #[default]
    Solid,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Grid {
    pub style: GridStyle,
    pub spacing: [FiniteF32; 2],
    pub offset: [FiniteF32; 2],
    /// Straight RGBA.
    pub foreground: [u8; 4],
}
impl Default for Grid {
    fn default() -> Self {
        // Unwrap OK - literal.
        let spacing = FiniteF32::new(10.0).unwrap();
        Self {
            style: GridStyle::default(),
            spacing: [spacing; 2],
            offset: [FiniteF32::ZERO; 2],
            foreground: [0, 0, 0, 255],
        }
    }
}

bitflags::bitflags! {
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
    pub struct ParasiteFlags: u32 {
        /// Saved along with the image.
        const PERSISTENT = 1;
        /// Changes are recorded in the undo history.
        const UNDOABLE = 2;
    }
}

/// Arbitrary named data attached to an image or item.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Parasite {
    pub name: String,
    pub flags: ParasiteFlags,
    pub data: Vec<u8>,
}
impl Parasite {
    #[must_use]
    pub fn new(name: impl Into<String>, flags: ParasiteFlags, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            flags,
            data,
        }
    }
    #[must_use]
    pub fn is_undoable(&self) -> bool {
        self.flags.contains(ParasiteFlags::UNDOABLE)
    }
    pub(crate) fn heap_size(&self) -> usize {
        self.name.capacity() + self.data.capacity()
    }
}

/// Parasites by name.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct ParasiteList(std::collections::BTreeMap<String, Parasite>);
impl ParasiteList {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parasite> {
        self.0.get(name)
    }
    pub fn iter(&self) -> impl Iterator<Item = &Parasite> {
        self.0.values()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Attach a parasite, or detach if `None`, returning what was previously under that name.
    pub(crate) fn replace(&mut self, name: &str, parasite: Option<Parasite>) -> Option<Parasite> {
        match parasite {
            Some(parasite) => self.0.insert(name.to_owned(), parasite),
            None => self.0.remove(name),
        }
    }
}

/// Key-value image metadata (Exif, XMP, IPTC tags).
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Metadata(pub std::collections::BTreeMap<String, String>);
impl Metadata {
    pub(crate) fn heap_size(&self) -> usize {
        self.0
            .iter()
            .map(|(k, v)| k.capacity() + v.capacity())
            .sum()
    }
}

/// An image, the root of all document state.
#[derive(Clone, PartialEq, Debug)]
pub struct Image {
    pub(crate) id: ImageID,
    pub(crate) base_type: BaseType,
    pub(crate) precision: Precision,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) resolution: Resolution,
    pub(crate) grid: Option<Grid>,
    /// Palette of indexed images.
    pub(crate) colormap: Option<Vec<[u8; 3]>>,
    /// Color profile kept aside while the image is in a mode that cannot use it.
    pub(crate) hidden_profile: Option<Arc<[u8]>>,
    pub(crate) metadata: Option<Metadata>,
    pub(crate) parasites: ParasiteList,
    pub(crate) items: ItemTree,
    pub(crate) guides: Vec<Guide>,
    pub(crate) sample_points: Vec<SamplePoint>,
    /// The layer currently floating above a drawable, if any.
    pub(crate) floating_selection: Option<ItemID>,
    /// Selection mask in image coordinates. `None` when nothing is selected.
    pub(crate) selection: Option<PixelBuffer>,
}
impl Image {
    #[must_use]
    pub fn new(width: u32, height: u32, base_type: BaseType) -> Self {
        Self {
            id: ImageID::default(),
            base_type,
            precision: Precision::default(),
            width,
            height,
            resolution: Resolution::default(),
            grid: None,
            colormap: (base_type == BaseType::Indexed).then(Vec::new),
            hidden_profile: None,
            metadata: None,
            parasites: ParasiteList::default(),
            items: ItemTree::default(),
            guides: Vec::new(),
            sample_points: Vec::new(),
            floating_selection: None,
            selection: None,
        }
    }
    #[must_use]
    pub fn id(&self) -> ImageID {
        self.id
    }
    #[must_use]
    pub fn base_type(&self) -> BaseType {
        self.base_type
    }
    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[must_use]
    pub fn bounds(&self) -> crate::util::Rect {
        crate::util::Rect::from_size(0, 0, self.width, self.height)
    }
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }
    #[must_use]
    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }
    #[must_use]
    pub fn colormap(&self) -> Option<&[[u8; 3]]> {
        self.colormap.as_deref()
    }
    #[must_use]
    pub fn hidden_profile(&self) -> Option<&[u8]> {
        self.hidden_profile.as_deref()
    }
    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }
    #[must_use]
    pub fn parasites(&self) -> &ParasiteList {
        &self.parasites
    }
    #[must_use]
    pub fn items(&self) -> &ItemTree {
        &self.items
    }
    #[must_use]
    pub fn item(&self, id: ItemID) -> Option<&Item> {
        self.items.get(id)
    }
    #[must_use]
    pub fn guides(&self) -> &[Guide] {
        &self.guides
    }
    #[must_use]
    pub fn guide(&self, id: GuideID) -> Option<&Guide> {
        self.guides.iter().find(|guide| guide.id == id)
    }
    #[must_use]
    pub fn sample_points(&self) -> &[SamplePoint] {
        &self.sample_points
    }
    #[must_use]
    pub fn sample_point(&self, id: SamplePointID) -> Option<&SamplePoint> {
        self.sample_points.iter().find(|point| point.id == id)
    }
    #[must_use]
    pub fn floating_selection(&self) -> Option<ItemID> {
        self.floating_selection
    }
    #[must_use]
    pub fn selection(&self) -> Option<&PixelBuffer> {
        self.selection.as_ref()
    }
}
