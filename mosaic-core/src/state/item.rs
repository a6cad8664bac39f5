//! Items are the stackable contents of an image: layers, channels and paths, arranged into a tree by
//! group layers.

use hashbrown::HashMap;

use super::{BaseType, ParasiteList, Precision};
use crate::blend::Blend;
use crate::buffer::{Layout, PixelBuffer, PixelFormat};
use crate::undo::UndoError;
use crate::util::Rect;

pub type ItemID = crate::UniqueID<Item>;

#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum ColorTag {
    #[default]
    None,
    Blue,
    Green,
    Yellow,
    Orange,
    Brown,
    Red,
    Violet,
    Gray,
}

/// Bookkeeping of a group layer, whose extent follows its children.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct GroupState {
    /// While nonzero, the group does not resize to fit its children.
    pub suspend_resize: u32,
    /// While nonzero, the group's mask is not resized along with it.
    pub suspend_mask: u32,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Layer {
    pub blend: Blend,
    /// Painting may not change the alpha of existing pixels.
    pub lock_alpha: bool,
    pub base_type: BaseType,
    pub precision: Precision,
    /// Present for group layers.
    pub group: Option<GroupState>,
    /// The drawable this layer floats above, if it is a floating selection.
    pub floating_drawable: Option<ItemID>,
    /// Layer mask, covering the same area as the layer.
    pub mask: Option<PixelBuffer>,
}
impl Layer {
    #[must_use]
    pub fn new(base_type: BaseType, precision: Precision) -> Self {
        Self {
            blend: Blend::default(),
            lock_alpha: false,
            base_type,
            precision,
            group: None,
            floating_drawable: None,
            mask: None,
        }
    }
    #[must_use]
    pub fn new_group(base_type: BaseType, precision: Precision) -> Self {
        Self {
            group: Some(GroupState::default()),
            ..Self::new(base_type, precision)
        }
    }
    /// Format of the layer's pixels. Always has alpha.
    #[must_use]
    pub fn pixel_format(&self) -> PixelFormat {
        let layout = match self.base_type {
            BaseType::Rgb => Layout::Rgba,
            BaseType::Gray | BaseType::Indexed => Layout::YA,
        };
        PixelFormat {
            layout,
            depth: self.precision.depth,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum ItemKind {
    Layer(Layer),
    Channel {
        /// Straight RGBA the channel is displayed in.
        color: [u8; 4],
    },
    Path,
}
impl ItemKind {
    /// Format of the item's own pixels. `None` for items without any, such as paths and group layers,
    /// whose content is rendered from their children.
    #[must_use]
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        match self {
            Self::Layer(layer) if layer.group.is_none() => Some(layer.pixel_format()),
            Self::Layer(_) | Self::Path => None,
            Self::Channel { .. } => Some(PixelFormat::MASK_U8),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Item {
    pub(crate) id: ItemID,
    pub(crate) name: String,
    pub(crate) kind: ItemKind,
    pub(crate) offset: [i32; 2],
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) visible: bool,
    pub(crate) color_tag: ColorTag,
    pub(crate) lock_content: bool,
    pub(crate) lock_position: bool,
    pub(crate) lock_visibility: bool,
    pub(crate) parasites: ParasiteList,
    /// Content of drawables, in item-local coordinates.
    pub(crate) pixels: Option<PixelBuffer>,
}
impl Item {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ItemKind, width: u32, height: u32) -> Self {
        let pixels = kind
            .pixel_format()
            .map(|format| PixelBuffer::new(Rect::from_size(0, 0, width, height), format));
        Self {
            id: ItemID::default(),
            name: name.into(),
            kind,
            offset: [0; 2],
            width,
            height,
            visible: true,
            color_tag: ColorTag::default(),
            lock_content: false,
            lock_position: false,
            lock_visibility: false,
            parasites: ParasiteList::default(),
            pixels,
        }
    }
    #[must_use]
    pub fn id(&self) -> ItemID {
        self.id
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }
    #[must_use]
    pub fn layer(&self) -> Option<&Layer> {
        match &self.kind {
            ItemKind::Layer(layer) => Some(layer),
            _ => None,
        }
    }
    pub(crate) fn layer_mut(&mut self) -> Option<&mut Layer> {
        match &mut self.kind {
            ItemKind::Layer(layer) => Some(layer),
            _ => None,
        }
    }
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.layer().is_some_and(|layer| layer.group.is_some())
    }
    /// Whether the item has pixels of its own.
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.pixels.is_some()
    }
    #[must_use]
    pub fn pixels(&self) -> Option<&PixelBuffer> {
        self.pixels.as_ref()
    }
    #[must_use]
    pub fn offset(&self) -> [i32; 2] {
        self.offset
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.offset[0], self.offset[1], self.width, self.height)
    }
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }
    #[must_use]
    pub fn color_tag(&self) -> ColorTag {
        self.color_tag
    }
    #[must_use]
    pub fn lock_content(&self) -> bool {
        self.lock_content
    }
    #[must_use]
    pub fn lock_position(&self) -> bool {
        self.lock_position
    }
    #[must_use]
    pub fn lock_visibility(&self) -> bool {
        self.lock_visibility
    }
    #[must_use]
    pub fn parasites(&self) -> &ParasiteList {
        &self.parasites
    }
    /// Rough size of owned heap data, for memory accounting.
    pub(crate) fn heap_size(&self) -> usize {
        let mask = self.layer().and_then(|layer| layer.mask.as_ref());
        self.name.capacity()
            + self
                .parasites
                .iter()
                .map(super::Parasite::heap_size)
                .sum::<usize>()
            + self.pixels.iter().chain(mask).map(|p| p.data().len()).sum::<usize>()
    }
}

/// Where an item sits in the tree. A `None` parent is the image's top level.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Position {
    pub parent: Option<ItemID>,
    pub index: usize,
}

/// Ordered tree of items. Index 0 of each level is the topmost item.
#[derive(Clone, Default, Debug)]
pub struct ItemTree {
    items: HashMap<ItemID, Item>,
    parents: HashMap<ItemID, Option<ItemID>>,
    children: HashMap<Option<ItemID>, Vec<ItemID>>,
}
/// Equal when holding the same items in the same arrangement.
impl PartialEq for ItemTree {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
            && self
                .children
                .keys()
                .chain(other.children.keys())
                .all(|&parent| self.children(parent) == other.children(parent))
    }
}
impl ItemTree {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    #[must_use]
    pub fn get(&self, id: ItemID) -> Option<&Item> {
        self.items.get(&id)
    }
    pub(crate) fn get_mut(&mut self, id: ItemID) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }
    #[must_use]
    pub fn contains(&self, id: ItemID) -> bool {
        self.items.contains_key(&id)
    }
    /// The items directly within `parent`, topmost first.
    #[must_use]
    pub fn children(&self, parent: Option<ItemID>) -> &[ItemID] {
        self.children.get(&parent).map_or(&[][..], Vec::as_slice)
    }
    #[must_use]
    pub fn position(&self, id: ItemID) -> Option<Position> {
        let parent = *self.parents.get(&id)?;
        let index = self.children(parent).iter().position(|&c| c == id)?;
        Some(Position { parent, index })
    }
    /// `id` and everything nested within it, parents before children.
    #[must_use]
    pub fn subtree(&self, id: ItemID) -> Vec<ItemID> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            // Reversed so the topmost child is visited first.
            stack.extend(self.children(Some(next)).iter().rev());
        }
        out
    }
    /// Every item, parents before children, topmost first.
    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        self.children(None)
            .iter()
            .flat_map(move |&top| self.subtree(top))
            .filter_map(move |id| self.get(id))
    }
    /// Insert a new item. The index is clamped to the number of siblings.
    pub(crate) fn insert(&mut self, item: Item, at: Position) -> Result<(), UndoError> {
        if self.items.contains_key(&item.id) {
            return Err(UndoError::MismatchedState);
        }
        if let Some(parent) = at.parent {
            if !self.get(parent).is_some_and(Item::is_group) {
                return Err(UndoError::UnknownResource);
            }
        }
        let id = item.id;
        let siblings = self.children.entry(at.parent).or_default();
        siblings.insert(at.index.min(siblings.len()), id);
        self.parents.insert(id, at.parent);
        self.items.insert(id, item);
        Ok(())
    }
    /// Remove a childless item, returning it along with where it was.
    pub(crate) fn remove(&mut self, id: ItemID) -> Result<(Item, Position), UndoError> {
        if !self.children(Some(id)).is_empty() {
            return Err(UndoError::MismatchedState);
        }
        let position = self.position(id).ok_or(UndoError::UnknownResource)?;
        self.children.remove(&Some(id));
        if let Some(siblings) = self.children.get_mut(&position.parent) {
            siblings.remove(position.index);
        }
        self.parents.remove(&id);
        let item = self.items.remove(&id).ok_or(UndoError::UnknownResource)?;
        Ok((item, position))
    }
    /// Move an item, with its children, returning where it was.
    pub(crate) fn reorder(&mut self, id: ItemID, to: Position) -> Result<Position, UndoError> {
        let from = self.position(id).ok_or(UndoError::UnknownResource)?;
        if let Some(parent) = to.parent {
            if !self.get(parent).is_some_and(Item::is_group) {
                return Err(UndoError::UnknownResource);
            }
            // Into itself!
            if self.subtree(id).contains(&parent) {
                return Err(UndoError::MismatchedState);
            }
        }
        if let Some(siblings) = self.children.get_mut(&from.parent) {
            siblings.remove(from.index);
        }
        let siblings = self.children.entry(to.parent).or_default();
        siblings.insert(to.index.min(siblings.len()), id);
        self.parents.insert(id, to.parent);
        Ok(from)
    }
}
