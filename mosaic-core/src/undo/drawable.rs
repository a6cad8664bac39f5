//! Undos of pixel data: drawable content, layer masks, and the image's selection.

use super::{UndoDelta, UndoError, UndoMode, UndoType};
use crate::buffer::{PixelBuffer, PixelSource};
use crate::state::{Image, Item, ItemID};
use crate::util::Rect;

/// A region of a drawable's pixels, swapped with the drawable's own.
#[derive(Clone, Debug)]
pub struct DrawableUndo {
    item: ItemID,
    /// Extent is the region, in item-local coordinates.
    pixels: PixelBuffer,
}
impl DrawableUndo {
    /// Before `rect` of `item`'s pixels is modified.
    pub fn new(item: &Item, rect: Rect) -> Result<Self, UndoError> {
        let source = item.pixels().ok_or(UndoError::MismatchedState)?;
        let mut pixels = PixelBuffer::new(rect, source.format());
        pixels
            .copy_from(source, rect)
            .map_err(|_| UndoError::MismatchedState)?;
        Ok(Self {
            item: item.id(),
            pixels,
        })
    }
    #[must_use]
    pub fn item(&self) -> ItemID {
        self.item
    }
    /// The area covered, in item-local coordinates.
    #[must_use]
    pub fn region(&self) -> Rect {
        self.pixels.extent()
    }
}
impl UndoDelta for DrawableUndo {
    fn undo_type(&self) -> UndoType {
        UndoType::Drawable
    }
    fn apply(&mut self, image: &mut Image, _: UndoMode) -> Result<(), UndoError> {
        image
            .items
            .get_mut(self.item)
            .ok_or(UndoError::UnknownResource)?
            .pixels
            .as_mut()
            .ok_or(UndoError::MismatchedState)?
            .swap_region(&mut self.pixels)
            .map_err(|_| UndoError::MismatchedState)
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.pixels.data().len()
    }
}

/// A drawable's entire pixel buffer, along with its size and offset.
#[derive(Clone, Debug)]
pub struct DrawableModUndo {
    item: ItemID,
    pixels: PixelBuffer,
    offset: [i32; 2],
}
impl DrawableModUndo {
    /// Before `item`'s buffer is replaced.
    pub fn new(item: &Item) -> Result<Self, UndoError> {
        Ok(Self {
            item: item.id(),
            pixels: item.pixels().ok_or(UndoError::MismatchedState)?.clone(),
            offset: item.offset(),
        })
    }
}
impl UndoDelta for DrawableModUndo {
    fn undo_type(&self) -> UndoType {
        UndoType::DrawableMod
    }
    fn apply(&mut self, image: &mut Image, _: UndoMode) -> Result<(), UndoError> {
        let item = image
            .items
            .get_mut(self.item)
            .ok_or(UndoError::UnknownResource)?;
        let pixels = item.pixels.as_mut().ok_or(UndoError::MismatchedState)?;
        std::mem::swap(pixels, &mut self.pixels);
        let extent = pixels.extent();
        item.width = extent.width();
        item.height = extent.height();
        std::mem::swap(&mut item.offset, &mut self.offset);
        Ok(())
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.pixels.data().len()
    }
}

/// The image's selection mask, whole.
#[derive(Clone, Debug)]
pub struct MaskUndo {
    selection: Option<PixelBuffer>,
}
impl MaskUndo {
    /// Before the selection changes.
    #[must_use]
    pub fn new(image: &Image) -> Self {
        Self {
            selection: image.selection.clone(),
        }
    }
}
impl UndoDelta for MaskUndo {
    fn undo_type(&self) -> UndoType {
        UndoType::Mask
    }
    fn apply(&mut self, image: &mut Image, _: UndoMode) -> Result<(), UndoError> {
        std::mem::swap(&mut self.selection, &mut image.selection);
        Ok(())
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.selection.as_ref().map_or(0, |mask| mask.data().len())
    }
}

/// A layer mask being added to or removed from a layer. Holds the mask while it is off the layer.
#[derive(Clone, Debug)]
pub struct LayerMaskUndo {
    layer: ItemID,
    ty: UndoType,
    mask: Option<PixelBuffer>,
}
impl LayerMaskUndo {
    /// A mask yet to be added. Apply with [`UndoMode::Redo`] to add it.
    #[must_use]
    pub fn add(layer: ItemID, mask: PixelBuffer) -> Self {
        Self {
            layer,
            ty: UndoType::LayerMaskAdd,
            mask: Some(mask),
        }
    }
    /// A mask yet to be removed. Apply with [`UndoMode::Redo`] to remove it.
    #[must_use]
    pub fn remove(layer: ItemID) -> Self {
        Self {
            layer,
            ty: UndoType::LayerMaskRemove,
            mask: None,
        }
    }
}
impl UndoDelta for LayerMaskUndo {
    fn undo_type(&self) -> UndoType {
        self.ty
    }
    fn apply(&mut self, image: &mut Image, _: UndoMode) -> Result<(), UndoError> {
        let layer = image
            .items
            .get_mut(self.layer)
            .ok_or(UndoError::UnknownResource)?
            .layer_mut()
            .ok_or(UndoError::MismatchedState)?;
        // Exactly one side holds the mask.
        if layer.mask.is_some() == self.mask.is_some() {
            return Err(UndoError::MismatchedState);
        }
        std::mem::swap(&mut self.mask, &mut layer.mask);
        Ok(())
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.mask.as_ref().map_or(0, |mask| mask.data().len())
    }
}

#[cfg(test)]
mod test {
    use super::{DrawableModUndo, DrawableUndo, LayerMaskUndo, MaskUndo};
    use crate::buffer::{PixelBuffer, PixelFormat, PixelSource};
    use crate::state::item::{Layer, Position};
    use crate::state::{BaseType, Image, Item, ItemID, ItemKind, Precision};
    use crate::undo::{UndoDelta, UndoError, UndoMode, UndoType};
    use crate::util::Rect;

    fn image_with(kind: ItemKind) -> (Image, ItemID) {
        let mut image = Image::new(8, 8, BaseType::Gray);
        let item = Item::new("drawable", kind, 4, 4);
        let id = item.id();
        image
            .items
            .insert(
                item,
                Position {
                    parent: None,
                    index: 0,
                },
            )
            .unwrap();
        (image, id)
    }
    fn channel() -> ItemKind {
        ItemKind::Channel { color: [0; 4] }
    }

    #[test]
    fn region_swaps_back_and_forth() {
        let (mut image, id) = image_with(channel());
        let rect = Rect::from_size(1, 1, 2, 2);
        let mut undo = DrawableUndo::new(image.item(id).unwrap(), rect).unwrap();
        assert_eq!(undo.region(), rect);
        image.items.get_mut(id).unwrap().pixels.as_mut().unwrap().fill(rect, &[200]);

        undo.apply(&mut image, UndoMode::Undo).unwrap();
        let pixels = image.item(id).unwrap().pixels().unwrap();
        assert!(pixels.data().iter().all(|&v| v == 0));
        undo.apply(&mut image, UndoMode::Redo).unwrap();
        let pixels = image.item(id).unwrap().pixels().unwrap();
        assert_eq!(pixels.pixel(2, 2), [200]);
        assert_eq!(pixels.pixel(0, 0), [0]);
        assert!(undo.memory_size() >= 4);
    }
    #[test]
    fn region_outside_drawable() {
        let (image, id) = image_with(channel());
        let item = image.item(id).unwrap();
        assert_eq!(
            DrawableUndo::new(item, Rect::from_size(3, 3, 2, 2)).err(),
            Some(UndoError::MismatchedState)
        );
        // Paths have no pixels.
        let (image, id) = image_with(ItemKind::Path);
        assert!(DrawableUndo::new(image.item(id).unwrap(), Rect::from_size(0, 0, 1, 1)).is_err());
    }
    #[test]
    fn whole_buffer_with_size() {
        let (mut image, id) = image_with(channel());
        let mut undo = DrawableModUndo::new(image.item(id).unwrap()).unwrap();
        {
            let item = image.items.get_mut(id).unwrap();
            item.pixels = Some(PixelBuffer::new(Rect::from_size(0, 0, 6, 2), PixelFormat::MASK_U8));
            item.width = 6;
            item.height = 2;
            item.offset = [5, 5];
        }
        undo.apply(&mut image, UndoMode::Undo).unwrap();
        let item = image.item(id).unwrap();
        assert_eq!(item.bounds(), Rect::from_size(0, 0, 4, 4));
        assert_eq!(item.pixels().unwrap().extent(), Rect::from_size(0, 0, 4, 4));
        undo.apply(&mut image, UndoMode::Redo).unwrap();
        assert_eq!(image.item(id).unwrap().bounds(), Rect::from_size(5, 5, 6, 2));
    }
    #[test]
    fn selection_and_layer_masks() {
        let layer = ItemKind::Layer(Layer::new(BaseType::Gray, Precision::default()));
        let (mut image, id) = image_with(layer);

        let mut select = MaskUndo::new(&image);
        image.selection = Some(PixelBuffer::new(image.bounds(), PixelFormat::MASK_U8));
        select.apply(&mut image, UndoMode::Undo).unwrap();
        assert!(image.selection().is_none());
        assert_eq!(select.undo_type(), UndoType::Mask);

        let mask = PixelBuffer::new(Rect::from_size(0, 0, 4, 4), PixelFormat::MASK_U8);
        let mut add = LayerMaskUndo::add(id, mask);
        add.apply(&mut image, UndoMode::Redo).unwrap();
        assert!(image.item(id).unwrap().layer().unwrap().mask.is_some());
        let mut remove = LayerMaskUndo::remove(id);
        remove.apply(&mut image, UndoMode::Redo).unwrap();
        assert!(image.item(id).unwrap().layer().unwrap().mask.is_none());
        // Already off the layer.
        assert_eq!(
            add.apply(&mut image, UndoMode::Undo),
            Err(UndoError::MismatchedState)
        );
        remove.apply(&mut image, UndoMode::Undo).unwrap();
        add.apply(&mut image, UndoMode::Undo).unwrap();
        assert!(image.item(id).unwrap().layer().unwrap().mask.is_none());
    }
}
