use super::{DirtyMask, UndoDelta, UndoError, UndoMode, UndoType};
use crate::blend::LayerMode;
use crate::state::item::{ColorTag, Layer, Position};
use crate::state::{BaseType, Image, Item, ItemID, ItemKind, Parasite, Precision};
use crate::util::FiniteF32;

/// An item, with everything nested within it, being added to or removed from the image.
///
/// Holds the items while they are out of the image.
#[derive(Clone, Debug)]
pub struct ItemUndo {
    ty: UndoType,
    root: ItemID,
    /// Parents before children, so they can be inserted in order.
    stash: Vec<(Item, Position)>,
}
/// Add and remove types for each kind of item.
fn add_remove_types(kind: &ItemKind) -> (UndoType, UndoType) {
    match kind {
        ItemKind::Layer(_) => (UndoType::LayerAdd, UndoType::LayerRemove),
        ItemKind::Channel { .. } => (UndoType::ChannelAdd, UndoType::ChannelRemove),
        ItemKind::Path => (UndoType::PathAdd, UndoType::PathRemove),
    }
}
impl ItemUndo {
    /// An item yet to be added. Apply with [`UndoMode::Redo`] to insert it.
    #[must_use]
    pub fn add(item: Item, at: Position) -> Self {
        Self {
            ty: add_remove_types(&item.kind).0,
            root: item.id,
            stash: vec![(item, at)],
        }
    }
    /// An item yet to be removed. Apply with [`UndoMode::Redo`] to remove it.
    #[must_use]
    pub fn remove(item: &Item) -> Self {
        Self {
            ty: add_remove_types(&item.kind).1,
            root: item.id,
            stash: Vec::new(),
        }
    }
    #[must_use]
    pub fn item(&self) -> ItemID {
        self.root
    }
    fn take_out(&mut self, image: &mut Image) -> Result<(), UndoError> {
        if !self.stash.is_empty() {
            return Err(UndoError::MismatchedState);
        }
        if !image.items.contains(self.root) {
            return Err(UndoError::UnknownResource);
        }
        // Children go first, from the bottom of the subtree up.
        for id in image.items.subtree(self.root).into_iter().rev() {
            let removed = image.items.remove(id)?;
            if image.floating_selection == Some(id) {
                image.floating_selection = None;
            }
            self.stash.push(removed);
        }
        self.stash.reverse();
        Ok(())
    }
    fn put_back(&mut self, image: &mut Image) -> Result<(), UndoError> {
        let Some((_, at)) = self.stash.first() else {
            return Err(UndoError::MismatchedState);
        };
        if image.items.contains(self.root) {
            return Err(UndoError::MismatchedState);
        }
        if let Some(parent) = at.parent {
            if !image.items.get(parent).is_some_and(Item::is_group) {
                return Err(UndoError::UnknownResource);
            }
        }
        for (item, at) in std::mem::take(&mut self.stash) {
            let id = item.id;
            let floating = item.layer().is_some_and(|layer| layer.floating_drawable.is_some());
            // Parents are in place by now, so this cannot fail.
            image.items.insert(item, at)?;
            if floating {
                image.floating_selection = Some(id);
            }
        }
        Ok(())
    }
}
impl UndoDelta for ItemUndo {
    fn undo_type(&self) -> UndoType {
        self.ty
    }
    fn apply(&mut self, image: &mut Image, mode: UndoMode) -> Result<(), UndoError> {
        let adding = matches!(
            self.ty,
            UndoType::LayerAdd | UndoType::ChannelAdd | UndoType::PathAdd
        );
        let in_image = adding == (mode == UndoMode::Undo);
        if in_image {
            self.take_out(image)
        } else {
            self.put_back(image)
        }
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self
                .stash
                .iter()
                .map(|(item, _)| std::mem::size_of::<(Item, Position)>() + item.heap_size())
                .sum::<usize>()
    }
}

#[derive(Clone, Debug)]
enum ItemProp {
    Reorder(Position),
    Rename(String),
    Displace([i32; 2]),
    Visibility(bool),
    ColorTag(ColorTag),
    LockContent(bool),
    LockPosition(bool),
    LockVisibility(bool),
    ChannelColor([u8; 4]),
    Parasite {
        name: String,
        parasite: Option<Parasite>,
    },
}

/// A change to a property common to all items.
#[derive(Clone, Debug)]
pub struct ItemPropUndo {
    item: ItemID,
    ty: UndoType,
    prop: ItemProp,
}
impl ItemPropUndo {
    pub fn reorder(image: &Image, item: ItemID) -> Result<Self, UndoError> {
        let position = image
            .items
            .position(item)
            .ok_or(UndoError::UnknownResource)?;
        Ok(Self {
            item,
            ty: UndoType::ItemReorder,
            prop: ItemProp::Reorder(position),
        })
    }
    #[must_use]
    pub fn rename(item: &Item) -> Self {
        Self::new(item, UndoType::ItemRename, ItemProp::Rename(item.name.clone()))
    }
    #[must_use]
    pub fn displace(item: &Item) -> Self {
        Self::new(item, UndoType::ItemDisplace, ItemProp::Displace(item.offset))
    }
    #[must_use]
    pub fn visibility(item: &Item) -> Self {
        Self::new(item, UndoType::ItemVisibility, ItemProp::Visibility(item.visible))
    }
    #[must_use]
    pub fn color_tag(item: &Item) -> Self {
        Self::new(item, UndoType::ItemColorTag, ItemProp::ColorTag(item.color_tag))
    }
    #[must_use]
    pub fn lock_content(item: &Item) -> Self {
        Self::new(
            item,
            UndoType::ItemLockContent,
            ItemProp::LockContent(item.lock_content),
        )
    }
    #[must_use]
    pub fn lock_position(item: &Item) -> Self {
        Self::new(
            item,
            UndoType::ItemLockPosition,
            ItemProp::LockPosition(item.lock_position),
        )
    }
    #[must_use]
    pub fn lock_visibility(item: &Item) -> Self {
        Self::new(
            item,
            UndoType::ItemLockVisibility,
            ItemProp::LockVisibility(item.lock_visibility),
        )
    }
    /// Before a channel's display color changes. Only channels have one.
    pub fn channel_color(item: &Item) -> Result<Self, UndoError> {
        let ItemKind::Channel { color } = item.kind else {
            return Err(UndoError::MismatchedState);
        };
        Ok(Self::new(item, UndoType::ChannelColor, ItemProp::ChannelColor(color)))
    }
    #[must_use]
    pub fn parasite_attach(item: &Item, name: &str) -> Self {
        Self::parasite(UndoType::ParasiteAttach, item, name)
    }
    #[must_use]
    pub fn parasite_remove(item: &Item, name: &str) -> Self {
        Self::parasite(UndoType::ParasiteRemove, item, name)
    }
    fn parasite(ty: UndoType, item: &Item, name: &str) -> Self {
        Self::new(
            item,
            ty,
            ItemProp::Parasite {
                name: name.to_owned(),
                parasite: item.parasites.get(name).cloned(),
            },
        )
    }
    fn new(item: &Item, ty: UndoType, prop: ItemProp) -> Self {
        Self {
            item: item.id,
            ty,
            prop,
        }
    }
}
impl UndoDelta for ItemPropUndo {
    fn undo_type(&self) -> UndoType {
        self.ty
    }
    fn dirty_mask(&self) -> DirtyMask {
        match self.prop {
            ItemProp::Parasite { .. } => DirtyMask::ITEM_META,
            _ => self.ty.dirty_mask(),
        }
    }
    fn apply(&mut self, image: &mut Image, _: UndoMode) -> Result<(), UndoError> {
        if let ItemProp::Reorder(position) = &mut self.prop {
            *position = image.items.reorder(self.item, *position)?;
            return Ok(());
        }
        let item = image
            .items
            .get_mut(self.item)
            .ok_or(UndoError::UnknownResource)?;
        match &mut self.prop {
            ItemProp::Reorder(_) => unreachable!(), // Handled above
            ItemProp::Rename(name) => std::mem::swap(name, &mut item.name),
            ItemProp::Displace(offset) => std::mem::swap(offset, &mut item.offset),
            ItemProp::Visibility(visible) => std::mem::swap(visible, &mut item.visible),
            ItemProp::ColorTag(tag) => std::mem::swap(tag, &mut item.color_tag),
            ItemProp::LockContent(lock) => std::mem::swap(lock, &mut item.lock_content),
            ItemProp::LockPosition(lock) => std::mem::swap(lock, &mut item.lock_position),
            ItemProp::LockVisibility(lock) => std::mem::swap(lock, &mut item.lock_visibility),
            ItemProp::ChannelColor(color) => match &mut item.kind {
                ItemKind::Channel { color: current } => std::mem::swap(color, current),
                _ => return Err(UndoError::MismatchedState),
            },
            ItemProp::Parasite { name, parasite } => {
                *parasite = item.parasites.replace(name, parasite.take());
            }
        }
        Ok(())
    }
    fn memory_size(&self) -> usize {
        let heap = match &self.prop {
            ItemProp::Rename(name) => name.capacity(),
            ItemProp::Parasite { name, parasite } => {
                name.capacity() + parasite.as_ref().map_or(0, Parasite::heap_size)
            }
            _ => 0,
        };
        std::mem::size_of::<Self>() + heap
    }
}

#[derive(Clone, Copy, Debug)]
enum LayerProp {
    Mode(LayerMode),
    Opacity(FiniteF32),
    LockAlpha(bool),
}

/// A change to a property only layers have.
#[derive(Clone, Debug)]
pub struct LayerPropUndo {
    layer: ItemID,
    prop: LayerProp,
}
impl LayerPropUndo {
    #[must_use]
    pub fn mode(id: ItemID, layer: &Layer) -> Self {
        Self {
            layer: id,
            prop: LayerProp::Mode(layer.blend.mode),
        }
    }
    #[must_use]
    pub fn opacity(id: ItemID, layer: &Layer) -> Self {
        Self {
            layer: id,
            prop: LayerProp::Opacity(layer.blend.opacity),
        }
    }
    #[must_use]
    pub fn lock_alpha(id: ItemID, layer: &Layer) -> Self {
        Self {
            layer: id,
            prop: LayerProp::LockAlpha(layer.lock_alpha),
        }
    }
}
impl UndoDelta for LayerPropUndo {
    fn undo_type(&self) -> UndoType {
        match self.prop {
            LayerProp::Mode(_) => UndoType::LayerMode,
            LayerProp::Opacity(_) => UndoType::LayerOpacity,
            LayerProp::LockAlpha(_) => UndoType::LayerLockAlpha,
        }
    }
    fn apply(&mut self, image: &mut Image, _: UndoMode) -> Result<(), UndoError> {
        let layer = image
            .items
            .get_mut(self.layer)
            .ok_or(UndoError::UnknownResource)?
            .layer_mut()
            .ok_or(UndoError::MismatchedState)?;
        match &mut self.prop {
            LayerProp::Mode(mode) => std::mem::swap(mode, &mut layer.blend.mode),
            LayerProp::Opacity(opacity) => std::mem::swap(opacity, &mut layer.blend.opacity),
            LayerProp::LockAlpha(lock) => std::mem::swap(lock, &mut layer.lock_alpha),
        }
        Ok(())
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

#[derive(Clone, Copy, Debug)]
enum GroupOp {
    SuspendResize,
    ResumeResize,
    SuspendMask,
    ResumeMask,
    Convert {
        base_type: BaseType,
        precision: Precision,
    },
}

/// Bookkeeping and format changes of a group layer.
#[derive(Clone, Debug)]
pub struct GroupLayerUndo {
    group: ItemID,
    op: GroupOp,
}
impl GroupLayerUndo {
    #[must_use]
    pub fn suspend_resize(group: ItemID) -> Self {
        Self {
            group,
            op: GroupOp::SuspendResize,
        }
    }
    #[must_use]
    pub fn resume_resize(group: ItemID) -> Self {
        Self {
            group,
            op: GroupOp::ResumeResize,
        }
    }
    #[must_use]
    pub fn suspend_mask(group: ItemID) -> Self {
        Self {
            group,
            op: GroupOp::SuspendMask,
        }
    }
    #[must_use]
    pub fn resume_mask(group: ItemID) -> Self {
        Self {
            group,
            op: GroupOp::ResumeMask,
        }
    }
    /// Before the group's pixel format is converted.
    #[must_use]
    pub fn convert(group: ItemID, layer: &Layer) -> Self {
        Self {
            group,
            op: GroupOp::Convert {
                base_type: layer.base_type,
                precision: layer.precision,
            },
        }
    }
}
/// Step a suspension counter. Fails without change on underflow.
fn step(counter: &mut u32, up: bool) -> Result<(), UndoError> {
    *counter = if up {
        counter.checked_add(1)
    } else {
        counter.checked_sub(1)
    }
    .ok_or(UndoError::MismatchedState)?;
    Ok(())
}
impl UndoDelta for GroupLayerUndo {
    fn undo_type(&self) -> UndoType {
        match self.op {
            GroupOp::SuspendResize => UndoType::GroupLayerSuspendResize,
            GroupOp::ResumeResize => UndoType::GroupLayerResumeResize,
            GroupOp::SuspendMask => UndoType::GroupLayerSuspendMask,
            GroupOp::ResumeMask => UndoType::GroupLayerResumeMask,
            GroupOp::Convert { .. } => UndoType::GroupLayerConvert,
        }
    }
    fn apply(&mut self, image: &mut Image, mode: UndoMode) -> Result<(), UndoError> {
        let layer = image
            .items
            .get_mut(self.group)
            .ok_or(UndoError::UnknownResource)?
            .layer_mut()
            .ok_or(UndoError::MismatchedState)?;
        let redo = mode == UndoMode::Redo;
        match &mut self.op {
            GroupOp::Convert {
                base_type,
                precision,
            } => {
                if layer.group.is_none() {
                    return Err(UndoError::MismatchedState);
                }
                std::mem::swap(base_type, &mut layer.base_type);
                std::mem::swap(precision, &mut layer.precision);
                Ok(())
            }
            op => {
                let group = layer.group.as_mut().ok_or(UndoError::MismatchedState)?;
                // Redoing a suspend counts up, undoing it counts down. Resumes are the opposite.
                match op {
                    GroupOp::SuspendResize => step(&mut group.suspend_resize, redo),
                    GroupOp::ResumeResize => step(&mut group.suspend_resize, !redo),
                    GroupOp::SuspendMask => step(&mut group.suspend_mask, redo),
                    GroupOp::ResumeMask => step(&mut group.suspend_mask, !redo),
                    GroupOp::Convert { .. } => unreachable!(), // Matched above
                }
            }
        }
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

/// A floating selection becoming an ordinary layer, detached from the drawable it floated above.
#[derive(Clone, Debug)]
pub struct FloatingSelUndo {
    layer: ItemID,
    /// The drawable while detached, `None` while attached.
    drawable: Option<ItemID>,
}
impl FloatingSelUndo {
    /// Before `layer` is turned into an ordinary layer.
    pub fn to_layer(id: ItemID, layer: &Layer) -> Result<Self, UndoError> {
        if layer.floating_drawable.is_none() {
            return Err(UndoError::MismatchedState);
        }
        Ok(Self {
            layer: id,
            drawable: None,
        })
    }
}
impl UndoDelta for FloatingSelUndo {
    fn undo_type(&self) -> UndoType {
        UndoType::FsToLayer
    }
    fn apply(&mut self, image: &mut Image, _: UndoMode) -> Result<(), UndoError> {
        let layer = image
            .items
            .get_mut(self.layer)
            .ok_or(UndoError::UnknownResource)?
            .layer_mut()
            .ok_or(UndoError::MismatchedState)?;
        // Exactly one side holds the drawable.
        if layer.floating_drawable.is_some() == self.drawable.is_some() {
            return Err(UndoError::MismatchedState);
        }
        std::mem::swap(&mut self.drawable, &mut layer.floating_drawable);
        if layer.floating_drawable.is_some() {
            image.floating_selection = Some(self.layer);
        } else if image.floating_selection == Some(self.layer) {
            image.floating_selection = None;
        }
        Ok(())
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}
