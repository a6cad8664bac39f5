//! # Undo
//!
//! Every change to an [`Image`] made through a [`crate::state::writer`] is recorded as an [`Undo`], a small
//! object holding just enough of the old state to get back to it. Applying an undo swaps the state it holds
//! with the image's, so the same object serves both directions: after an undo it holds the state to redo to.

mod aux_item;
mod drawable;
mod image;
mod item;

pub use aux_item::{GuideUndo, SamplePointUndo};
pub use drawable::{DrawableModUndo, DrawableUndo, LayerMaskUndo, MaskUndo};
pub use image::ImageUndo;
pub use item::{FloatingSelUndo, GroupLayerUndo, ItemPropUndo, ItemUndo, LayerPropUndo};

use crate::state::Image;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum UndoError {
    #[error("undo constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("resource referenced by the undo is not found")]
    UnknownResource,
    #[error("change makes no difference")]
    NoOp,
}

/// Which way an undo is being applied.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum UndoMode {
    Undo,
    Redo,
}
impl UndoMode {
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Self::Undo => Self::Redo,
            Self::Redo => Self::Undo,
        }
    }
}

bitflags::bitflags! {
    /// Which aspects of an image a change affects, for listeners deciding what to refresh.
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
    pub struct DirtyMask: u32 {
        const IMAGE = 1 << 0;
        const IMAGE_SIZE = 1 << 1;
        const IMAGE_META = 1 << 2;
        const IMAGE_STRUCTURE = 1 << 3;
        const ITEM = 1 << 4;
        const ITEM_META = 1 << 5;
        const DRAWABLE = 1 << 6;
        const SELECTION = 1 << 7;
        const ALL = u32::MAX;
    }
}

#[derive(strum::AsRefStr, strum::IntoStaticStr, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum UndoType {
    ImageType,
    ImagePrecision,
    ImageSize,
    ImageResolution,
    ImageGrid,
    ImageColormap,
    ImageHiddenProfile,
    ImageMetadata,
    ParasiteAttach,
    ParasiteRemove,
    ItemReorder,
    ItemRename,
    ItemDisplace,
    ItemVisibility,
    ItemColorTag,
    ItemLockContent,
    ItemLockPosition,
    ItemLockVisibility,
    LayerAdd,
    LayerRemove,
    ChannelAdd,
    ChannelRemove,
    ChannelColor,
    PathAdd,
    PathRemove,
    LayerMaskAdd,
    LayerMaskRemove,
    LayerMode,
    LayerOpacity,
    LayerLockAlpha,
    GroupLayerSuspendResize,
    GroupLayerResumeResize,
    GroupLayerSuspendMask,
    GroupLayerResumeMask,
    GroupLayerConvert,
    FsToLayer,
    Drawable,
    DrawableMod,
    Mask,
    Guide,
    SamplePoint,
    Cant,
    Group,
}
impl UndoType {
    /// The parts of an image changes of this type usually dirty.
    #[must_use]
    pub fn dirty_mask(self) -> DirtyMask {
        match self {
            Self::ImageType | Self::ImagePrecision | Self::ImageColormap => {
                DirtyMask::IMAGE | DirtyMask::DRAWABLE
            }
            Self::ImageSize => DirtyMask::IMAGE | DirtyMask::IMAGE_SIZE,
            Self::ImageResolution => DirtyMask::IMAGE,
            Self::ImageGrid
            | Self::ImageHiddenProfile
            | Self::ImageMetadata
            | Self::ParasiteAttach
            | Self::ParasiteRemove
            | Self::Guide
            | Self::SamplePoint => DirtyMask::IMAGE_META,
            Self::ItemReorder
            | Self::LayerAdd
            | Self::LayerRemove
            | Self::ChannelAdd
            | Self::ChannelRemove
            | Self::PathAdd
            | Self::PathRemove
            | Self::LayerMaskAdd
            | Self::LayerMaskRemove
            | Self::FsToLayer => DirtyMask::IMAGE_STRUCTURE,
            Self::ItemDisplace
            | Self::GroupLayerConvert
            | Self::ChannelColor
            | Self::Drawable
            | Self::DrawableMod => DirtyMask::ITEM | DirtyMask::DRAWABLE,
            Self::Mask => DirtyMask::SELECTION,
            Self::ItemRename
            | Self::ItemVisibility
            | Self::ItemColorTag
            | Self::ItemLockContent
            | Self::ItemLockPosition
            | Self::ItemLockVisibility
            | Self::LayerMode
            | Self::LayerOpacity
            | Self::LayerLockAlpha
            | Self::GroupLayerSuspendResize
            | Self::GroupLayerResumeResize
            | Self::GroupLayerSuspendMask
            | Self::GroupLayerResumeMask => DirtyMask::ITEM_META,
            Self::Cant => DirtyMask::ALL,
            Self::Group => DirtyMask::empty(),
        }
    }
}

/// A recorded change.
pub trait UndoDelta {
    #[must_use]
    fn undo_type(&self) -> UndoType;
    #[must_use]
    fn dirty_mask(&self) -> DirtyMask {
        self.undo_type().dirty_mask()
    }
    /// Swap the state held by `self` into `image`. If this generates an error,
    /// neither `self` nor `image` are observably changed.
    fn apply(&mut self, image: &mut Image, mode: UndoMode) -> Result<(), UndoError>;
    /// Approximate bytes held, for limiting the size of history.
    #[must_use]
    fn memory_size(&self) -> usize;
}

/// An action that cannot be undone. Undoing it does nothing.
#[derive(Clone, Debug)]
pub struct CantUndo {
    pub description: String,
}
impl UndoDelta for CantUndo {
    fn undo_type(&self) -> UndoType {
        UndoType::Cant
    }
    fn apply(&mut self, _: &mut Image, mode: UndoMode) -> Result<(), UndoError> {
        if mode == UndoMode::Undo {
            log::warn!("Can't undo {:?}", self.description);
        }
        Ok(())
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.description.capacity()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GroupType {
    /// Undos grouped because they were individual parts of a single, larger operation.
    Atoms,
    /// A writer panicked mid write. The undos contained may be part of an incomplete operation,
    /// but are still tracked so the history matches the image.
    WritePanic,
}

/// Many undos applied as one, in reverse order when undoing.
#[derive(Clone, Debug)]
pub struct UndoGroup {
    pub ty: GroupType,
    pub description: String,
    pub undos: Box<[Undo]>,
}
impl UndoDelta for UndoGroup {
    fn undo_type(&self) -> UndoType {
        UndoType::Group
    }
    fn dirty_mask(&self) -> DirtyMask {
        self.undos
            .iter()
            .fold(DirtyMask::empty(), |mask, undo| mask | undo.dirty_mask())
    }
    fn apply(&mut self, image: &mut Image, mode: UndoMode) -> Result<(), UndoError> {
        let order: Vec<usize> = match mode {
            UndoMode::Undo => (0..self.undos.len()).rev().collect(),
            UndoMode::Redo => (0..self.undos.len()).collect(),
        };
        for (done, &idx) in order.iter().enumerate() {
            if let Err(err) = self.undos[idx].apply(image, mode) {
                // Put back the members already applied, newest first.
                for &applied in order[..done].iter().rev() {
                    if let Err(inner) = self.undos[applied].apply(image, mode.inverse()) {
                        log::error!("Failed to roll back partially applied group: {inner}");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.description.capacity()
            + self.undos.iter().map(Undo::memory_size).sum::<usize>()
    }
}

#[derive(Clone, Debug)]
pub enum Undo {
    Image(ImageUndo),
    Item(ItemUndo),
    ItemProp(ItemPropUndo),
    LayerProp(LayerPropUndo),
    GroupLayer(GroupLayerUndo),
    FloatingSel(FloatingSelUndo),
    Drawable(DrawableUndo),
    DrawableMod(DrawableModUndo),
    Mask(MaskUndo),
    LayerMask(LayerMaskUndo),
    Guide(GuideUndo),
    SamplePoint(SamplePointUndo),
    Cant(CantUndo),
    Group(UndoGroup),
}
impl Undo {
    fn as_delta(&self) -> &dyn UndoDelta {
        match self {
            Self::Image(undo) => undo,
            Self::Item(undo) => undo,
            Self::ItemProp(undo) => undo,
            Self::LayerProp(undo) => undo,
            Self::GroupLayer(undo) => undo,
            Self::FloatingSel(undo) => undo,
            Self::Drawable(undo) => undo,
            Self::DrawableMod(undo) => undo,
            Self::Mask(undo) => undo,
            Self::LayerMask(undo) => undo,
            Self::Guide(undo) => undo,
            Self::SamplePoint(undo) => undo,
            Self::Cant(undo) => undo,
            Self::Group(undo) => undo,
        }
    }
    fn as_delta_mut(&mut self) -> &mut dyn UndoDelta {
        match self {
            Self::Image(undo) => undo,
            Self::Item(undo) => undo,
            Self::ItemProp(undo) => undo,
            Self::LayerProp(undo) => undo,
            Self::GroupLayer(undo) => undo,
            Self::FloatingSel(undo) => undo,
            Self::Drawable(undo) => undo,
            Self::DrawableMod(undo) => undo,
            Self::Mask(undo) => undo,
            Self::LayerMask(undo) => undo,
            Self::Guide(undo) => undo,
            Self::SamplePoint(undo) => undo,
            Self::Cant(undo) => undo,
            Self::Group(undo) => undo,
        }
    }
    /// Human readable summary, e.g. for an undo history list.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Group(group) => &group.description,
            Self::Cant(cant) => &cant.description,
            other => other.undo_type().into(),
        }
    }
}
impl UndoDelta for Undo {
    fn undo_type(&self) -> UndoType {
        self.as_delta().undo_type()
    }
    fn dirty_mask(&self) -> DirtyMask {
        self.as_delta().dirty_mask()
    }
    fn apply(&mut self, image: &mut Image, mode: UndoMode) -> Result<(), UndoError> {
        log::trace!("{mode:?} {}", self.undo_type().as_ref());
        self.as_delta_mut().apply(image, mode)
    }
    fn memory_size(&self) -> usize {
        self.as_delta().memory_size()
    }
}

macro_rules! impl_from_undo {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Undo {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}
impl_from_undo!(
    Image(ImageUndo),
    Item(ItemUndo),
    ItemProp(ItemPropUndo),
    LayerProp(LayerPropUndo),
    GroupLayer(GroupLayerUndo),
    FloatingSel(FloatingSelUndo),
    Drawable(DrawableUndo),
    DrawableMod(DrawableModUndo),
    Mask(MaskUndo),
    LayerMask(LayerMaskUndo),
    Guide(GuideUndo),
    SamplePoint(SamplePointUndo),
    Cant(CantUndo),
    Group(UndoGroup),
);

#[cfg(test)]
mod test {
    use super::{CantUndo, GroupType, ImageUndo, Undo, UndoDelta, UndoError, UndoGroup, UndoMode};
    use crate::state::{BaseType, Image};

    #[test]
    fn group_applies_in_reverse() {
        let mut image = Image::new(4, 4, BaseType::Rgb);
        // Record two resizes, as a writer would: capture, then mutate.
        let first = ImageUndo::size(&image);
        image.width = 8;
        let second = ImageUndo::size(&image);
        image.width = 16;
        let mut group = UndoGroup {
            ty: GroupType::Atoms,
            description: "Resize twice".into(),
            undos: vec![Undo::from(first), Undo::from(second)].into_boxed_slice(),
        };
        group.apply(&mut image, UndoMode::Undo).unwrap();
        assert_eq!(image.width(), 4);
        group.apply(&mut image, UndoMode::Redo).unwrap();
        assert_eq!(image.width(), 16);
        assert!(group.dirty_mask().contains(super::DirtyMask::IMAGE_SIZE));
        assert_eq!(Undo::from(group).description(), "Resize twice");
    }
    #[test]
    fn failed_group_rolls_back() {
        let mut image = Image::new(4, 4, BaseType::Rgb);
        let resize = ImageUndo::size(&image);
        image.width = 8;
        let mut group = UndoGroup {
            ty: GroupType::Atoms,
            description: String::new(),
            undos: vec![
                Undo::from(super::GuideUndo::added(crate::state::GuideID::default())),
                Undo::from(resize),
            ]
            .into_boxed_slice(),
        };
        // The guide is unknown to the image, so the group fails after undoing the resize.
        assert_eq!(
            group.apply(&mut image, UndoMode::Undo),
            Err(UndoError::UnknownResource)
        );
        assert_eq!(image.width(), 8);
    }
    #[test]
    fn cant_undo_is_inert() {
        let mut image = Image::new(4, 4, BaseType::Rgb);
        let mut cant = Undo::from(CantUndo {
            description: "Plug-in".into(),
        });
        cant.apply(&mut image, UndoMode::Undo).unwrap();
        cant.apply(&mut image, UndoMode::Redo).unwrap();
        assert_eq!(image.width(), 4);
        assert!(cant.memory_size() >= "Plug-in".len());
    }
}
