//! Writers modify an [`Image`], recording an [`Undo`] for every change. Each operation captures its undo before
//! mutating. Structural changes that can fail run their undo in the redo direction to make the change, and
//! record it only once that succeeded, so the recorded history always ends at the current state.

use std::sync::Arc;

use super::item::{ColorTag, Position};
use super::{
    BaseType, Grid, GuideID, Image, Item, ItemID, ItemKind, Metadata, Orientation, Parasite,
    PickMode, Precision, SamplePointID,
};
use crate::blend::LayerMode;
use crate::buffer::{Layout, PixelBuffer, PixelSource};
use crate::history::writer::UndoWrite;
use crate::undo::{
    DrawableModUndo, DrawableUndo, FloatingSelUndo, GroupLayerUndo, GuideUndo, ImageUndo,
    ItemPropUndo, ItemUndo, LayerMaskUndo, LayerPropUndo, MaskUndo, SamplePointUndo, Undo,
    UndoDelta, UndoError, UndoMode,
};
use crate::units::Resolution;
use crate::util::{FiniteF32, Rect};

pub struct ImageWriter<'a, Write: UndoWrite<Undo>> {
    writer: Write,
    image: &'a mut Image,
}
impl<'a, Write: UndoWrite<Undo>> ImageWriter<'a, Write> {
    pub fn new(writer: Write, image: &'a mut Image) -> Self {
        Self { writer, image }
    }
    /// View the image as it is now.
    #[must_use]
    pub fn image(&self) -> &Image {
        self.image
    }
    /// Convert between RGB, grayscale and indexed. Converting to indexed starts an empty colormap,
    /// converting away drops it.
    pub fn set_base_type(&mut self, base_type: BaseType) -> Result<(), UndoError> {
        if self.image.base_type == base_type {
            return Err(UndoError::NoOp);
        }
        self.writer.write(ImageUndo::image_type(self.image).into());
        self.image.base_type = base_type;

        let indexed = base_type == BaseType::Indexed;
        if indexed != self.image.colormap.is_some() {
            self.writer.write(ImageUndo::colormap(self.image).into());
            self.image.colormap = indexed.then(Vec::new);
        }
        Ok(())
    }
    pub fn set_precision(&mut self, precision: Precision) -> Result<(), UndoError> {
        if self.image.precision == precision {
            return Err(UndoError::NoOp);
        }
        self.writer.write(ImageUndo::precision(self.image).into());
        self.image.precision = precision;
        Ok(())
    }
    fn set_size(&mut self, width: u32, height: u32) -> Result<(), UndoError> {
        if (self.image.width, self.image.height) == (width, height) {
            return Err(UndoError::NoOp);
        }
        self.writer.write(ImageUndo::size(self.image).into());
        self.image.width = width;
        self.image.height = height;
        Ok(())
    }
    /// Change the canvas size. Items are not affected, the selection is cropped.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), UndoError> {
        self.set_size(width, height)?;
        self.fit_selection([0, 0])
    }
    /// Move the selection by `offset` and crop it to the canvas.
    fn fit_selection(&mut self, offset: [i32; 2]) -> Result<(), UndoError> {
        let Some(selection) = &self.image.selection else {
            return Ok(());
        };
        let bounds = self.image.bounds();
        let mut moved = selection.clone();
        moved.translate(offset[0], offset[1]);
        if moved.extent() == bounds {
            return Ok(());
        }
        let mut fitted = PixelBuffer::new(bounds, moved.format());
        if let Some(overlap) = moved.extent().intersect(&bounds) {
            fitted
                .copy_from(&moved, overlap)
                .map_err(|_| UndoError::MismatchedState)?;
        }
        self.writer.write(MaskUndo::new(self.image).into());
        self.image.selection = Some(fitted);
        Ok(())
    }
    /// Change the canvas size, shifting the contents by `offset`. Guides and sample points which end up
    /// outside the canvas are removed.
    pub fn resize_canvas(&mut self, width: u32, height: u32, offset: [i32; 2]) -> Result<(), UndoError> {
        if offset == [0, 0] {
            return self.resize(width, height);
        }
        match self.set_size(width, height) {
            Ok(()) | Err(UndoError::NoOp) => (),
            Err(err) => return Err(err),
        }
        self.fit_selection(offset)?;
        let items: Vec<ItemID> = self.image.items.iter().map(Item::id).collect();
        for id in items {
            if let Some(item) = self.image.items.get_mut(id) {
                self.writer.write(ItemPropUndo::displace(item).into());
                item.offset[0] = item.offset[0].saturating_add(offset[0]);
                item.offset[1] = item.offset[1].saturating_add(offset[1]);
            }
        }
        let bounds = self.image.bounds();
        let guides: Vec<GuideID> = self.image.guides.iter().map(|guide| guide.id).collect();
        for id in guides {
            let Some(guide) = self.image.guide(id).copied() else {
                continue;
            };
            let (position, extent) = match guide.orientation {
                Orientation::Horizontal => (guide.position.saturating_add(offset[1]), height),
                Orientation::Vertical => (guide.position.saturating_add(offset[0]), width),
            };
            if u32::try_from(position).is_ok_and(|position| position <= extent) {
                if position != guide.position {
                    self.move_guide(id, position)?;
                }
            } else {
                self.remove_guide(id)?;
            }
        }
        let points: Vec<SamplePointID> = self.image.sample_points.iter().map(|point| point.id).collect();
        for id in points {
            let Some(point) = self.image.sample_point(id).copied() else {
                continue;
            };
            let x = point.x.saturating_add(offset[0]);
            let y = point.y.saturating_add(offset[1]);
            if bounds.contains(x, y) {
                self.move_sample_point(id, x, y)?;
            } else {
                self.remove_sample_point(id)?;
            }
        }
        Ok(())
    }
    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<(), UndoError> {
        if self.image.resolution == resolution {
            return Err(UndoError::NoOp);
        }
        self.writer.write(ImageUndo::resolution(self.image).into());
        self.image.resolution = resolution;
        Ok(())
    }
    pub fn set_grid(&mut self, grid: Option<Grid>) -> Result<(), UndoError> {
        if self.image.grid == grid {
            return Err(UndoError::NoOp);
        }
        self.writer.write(ImageUndo::grid(self.image).into());
        self.image.grid = grid;
        Ok(())
    }
    /// Replace the palette of an indexed image.
    pub fn set_colormap(&mut self, colormap: Vec<[u8; 3]>) -> Result<(), UndoError> {
        match &self.image.colormap {
            None => return Err(UndoError::MismatchedState),
            Some(old) if *old == colormap => return Err(UndoError::NoOp),
            Some(_) => (),
        }
        self.writer.write(ImageUndo::colormap(self.image).into());
        self.image.colormap = Some(colormap);
        Ok(())
    }
    pub fn set_hidden_profile(&mut self, profile: Option<Arc<[u8]>>) -> Result<(), UndoError> {
        if self.image.hidden_profile == profile {
            return Err(UndoError::NoOp);
        }
        self.writer.write(ImageUndo::hidden_profile(self.image).into());
        self.image.hidden_profile = profile;
        Ok(())
    }
    pub fn set_metadata(&mut self, metadata: Option<Metadata>) -> Result<(), UndoError> {
        if self.image.metadata == metadata {
            return Err(UndoError::NoOp);
        }
        self.writer.write(ImageUndo::metadata(self.image).into());
        self.image.metadata = metadata;
        Ok(())
    }
    /// Attach a parasite, replacing any of the same name. Only recorded if the parasite is undoable.
    pub fn attach_parasite(&mut self, parasite: Parasite) {
        let name = parasite.name.clone();
        if parasite.is_undoable() {
            self.writer
                .write(ImageUndo::parasite_attach(self.image, &name).into());
        }
        self.image.parasites.replace(&name, Some(parasite));
    }
    pub fn detach_parasite(&mut self, name: &str) -> Result<Parasite, UndoError> {
        let parasite = self
            .image
            .parasites
            .get(name)
            .ok_or(UndoError::UnknownResource)?;
        if parasite.is_undoable() {
            self.writer
                .write(ImageUndo::parasite_remove(self.image, name).into());
        }
        self.image
            .parasites
            .replace(name, None)
            .ok_or(UndoError::UnknownResource)
    }
    /// Replace the selection mask, or select nothing with `None`. A mask must be single channel and
    /// cover exactly the canvas.
    pub fn select(&mut self, mask: Option<PixelBuffer>) -> Result<(), UndoError> {
        if let Some(mask) = &mask {
            if mask.format().layout != Layout::Y || mask.extent() != self.image.bounds() {
                return Err(UndoError::MismatchedState);
            }
        }
        if self.image.selection == mask {
            return Err(UndoError::NoOp);
        }
        self.writer.write(MaskUndo::new(self.image).into());
        self.image.selection = mask;
        Ok(())
    }
    pub fn add_guide(&mut self, orientation: Orientation, position: i32) -> GuideID {
        let id = GuideID::default();
        self.writer.write(GuideUndo::added(id).into());
        self.image.guides.push(super::Guide {
            id,
            orientation,
            position,
        });
        id
    }
    fn guide_index(&self, id: GuideID) -> Result<usize, UndoError> {
        self.image
            .guides
            .iter()
            .position(|guide| guide.id == id)
            .ok_or(UndoError::UnknownResource)
    }
    pub fn move_guide(&mut self, id: GuideID, position: i32) -> Result<(), UndoError> {
        let index = self.guide_index(id)?;
        let guide = &mut self.image.guides[index];
        if guide.position == position {
            return Err(UndoError::NoOp);
        }
        self.writer.write(GuideUndo::changed(index, guide).into());
        guide.position = position;
        Ok(())
    }
    pub fn remove_guide(&mut self, id: GuideID) -> Result<(), UndoError> {
        let index = self.guide_index(id)?;
        self.writer
            .write(GuideUndo::changed(index, &self.image.guides[index]).into());
        self.image.guides.remove(index);
        Ok(())
    }
    pub fn add_sample_point(&mut self, x: i32, y: i32) -> SamplePointID {
        let id = SamplePointID::default();
        self.writer.write(SamplePointUndo::added(id).into());
        self.image.sample_points.push(super::SamplePoint {
            id,
            x,
            y,
            pick_mode: PickMode::default(),
        });
        id
    }
    fn sample_point_index(&self, id: SamplePointID) -> Result<usize, UndoError> {
        self.image
            .sample_points
            .iter()
            .position(|point| point.id == id)
            .ok_or(UndoError::UnknownResource)
    }
    pub fn move_sample_point(&mut self, id: SamplePointID, x: i32, y: i32) -> Result<(), UndoError> {
        let index = self.sample_point_index(id)?;
        let point = &mut self.image.sample_points[index];
        if [point.x, point.y] == [x, y] {
            return Err(UndoError::NoOp);
        }
        self.writer.write(SamplePointUndo::changed(index, point).into());
        point.x = x;
        point.y = y;
        Ok(())
    }
    pub fn set_sample_point_pick_mode(
        &mut self,
        id: SamplePointID,
        pick_mode: PickMode,
    ) -> Result<(), UndoError> {
        let index = self.sample_point_index(id)?;
        let point = &mut self.image.sample_points[index];
        if point.pick_mode == pick_mode {
            return Err(UndoError::NoOp);
        }
        self.writer.write(SamplePointUndo::changed(index, point).into());
        point.pick_mode = pick_mode;
        Ok(())
    }
    pub fn remove_sample_point(&mut self, id: SamplePointID) -> Result<(), UndoError> {
        let index = self.sample_point_index(id)?;
        self.writer
            .write(SamplePointUndo::changed(index, &self.image.sample_points[index]).into());
        self.image.sample_points.remove(index);
        Ok(())
    }
    /// Insert an item, which may be a floating selection if it is a layer attached to a drawable.
    pub fn insert_item(&mut self, item: Item, at: Position) -> Result<ItemID, UndoError> {
        if let Some(floating) = item.layer().and_then(|layer| layer.floating_drawable) {
            if self.image.floating_selection.is_some() || !self.image.items.contains(floating) {
                return Err(UndoError::MismatchedState);
            }
        }
        let id = item.id;
        let mut undo = ItemUndo::add(item, at);
        undo.apply(self.image, UndoMode::Redo)?;
        self.writer.write(undo.into());
        Ok(id)
    }
    /// Remove an item along with everything nested within it.
    pub fn remove_item(&mut self, id: ItemID) -> Result<(), UndoError> {
        let item = self.image.items.get(id).ok_or(UndoError::UnknownResource)?;
        let mut undo = ItemUndo::remove(item);
        undo.apply(self.image, UndoMode::Redo)?;
        self.writer.write(undo.into());
        Ok(())
    }
    /// Modify an existing item, or `None` if it does not exist.
    pub fn item(&mut self, id: ItemID) -> Option<ItemWriter<'_, &mut Write>> {
        if !self.image.items.contains(id) {
            return None;
        }
        Some(ItemWriter {
            writer: &mut self.writer,
            image: self.image,
            id,
        })
    }
}

pub struct ItemWriter<'a, Write: UndoWrite<Undo>> {
    writer: Write,
    image: &'a mut Image,
    id: ItemID,
}
impl<Write: UndoWrite<Undo>> ItemWriter<'_, Write> {
    #[must_use]
    pub fn id(&self) -> ItemID {
        self.id
    }
    fn item_mut(&mut self) -> Result<&mut Item, UndoError> {
        self.image
            .items
            .get_mut(self.id)
            .ok_or(UndoError::UnknownResource)
    }
    /// Record `capture` of the item, then run `change` on it, unless `unchanged` says there's nothing to do.
    fn prop<U: Into<Undo>>(
        &mut self,
        unchanged: impl FnOnce(&Item) -> bool,
        capture: impl FnOnce(&Item) -> U,
        change: impl FnOnce(&mut Item),
    ) -> Result<(), UndoError> {
        let item = self
            .image
            .items
            .get_mut(self.id)
            .ok_or(UndoError::UnknownResource)?;
        if unchanged(&*item) {
            return Err(UndoError::NoOp);
        }
        self.writer.write(capture(&*item).into());
        change(item);
        Ok(())
    }
    /// As [`Self::prop`], for layers only.
    fn layer_prop<U: Into<Undo>>(
        &mut self,
        unchanged: impl FnOnce(&super::item::Layer) -> bool,
        capture: impl FnOnce(ItemID, &super::item::Layer) -> U,
        change: impl FnOnce(&mut super::item::Layer),
    ) -> Result<(), UndoError> {
        let layer = self
            .image
            .items
            .get_mut(self.id)
            .ok_or(UndoError::UnknownResource)?
            .layer_mut()
            .ok_or(UndoError::MismatchedState)?;
        if unchanged(&*layer) {
            return Err(UndoError::NoOp);
        }
        self.writer.write(capture(self.id, &*layer).into());
        change(layer);
        Ok(())
    }
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), UndoError> {
        let name = name.into();
        self.prop(
            |item| item.name == name,
            ItemPropUndo::rename,
            |item| item.name = name.clone(),
        )
    }
    pub fn translate(&mut self, dx: i32, dy: i32) -> Result<(), UndoError> {
        self.prop(
            |_| dx == 0 && dy == 0,
            ItemPropUndo::displace,
            |item| {
                item.offset[0] = item.offset[0].saturating_add(dx);
                item.offset[1] = item.offset[1].saturating_add(dy);
            },
        )
    }
    pub fn set_visible(&mut self, visible: bool) -> Result<(), UndoError> {
        self.prop(
            |item| item.visible == visible,
            ItemPropUndo::visibility,
            |item| item.visible = visible,
        )
    }
    pub fn set_color_tag(&mut self, tag: ColorTag) -> Result<(), UndoError> {
        self.prop(
            |item| item.color_tag == tag,
            ItemPropUndo::color_tag,
            |item| item.color_tag = tag,
        )
    }
    pub fn set_lock_content(&mut self, lock: bool) -> Result<(), UndoError> {
        self.prop(
            |item| item.lock_content == lock,
            ItemPropUndo::lock_content,
            |item| item.lock_content = lock,
        )
    }
    pub fn set_lock_position(&mut self, lock: bool) -> Result<(), UndoError> {
        self.prop(
            |item| item.lock_position == lock,
            ItemPropUndo::lock_position,
            |item| item.lock_position = lock,
        )
    }
    pub fn set_lock_visibility(&mut self, lock: bool) -> Result<(), UndoError> {
        self.prop(
            |item| item.lock_visibility == lock,
            ItemPropUndo::lock_visibility,
            |item| item.lock_visibility = lock,
        )
    }
    /// Attach a parasite, replacing any of the same name. Only recorded if the parasite is undoable.
    pub fn attach_parasite(&mut self, parasite: Parasite) -> Result<(), UndoError> {
        let name = parasite.name.clone();
        let item = self
            .image
            .items
            .get_mut(self.id)
            .ok_or(UndoError::UnknownResource)?;
        if parasite.is_undoable() {
            self.writer
                .write(ItemPropUndo::parasite_attach(item, &name).into());
        }
        item.parasites.replace(&name, Some(parasite));
        Ok(())
    }
    pub fn detach_parasite(&mut self, name: &str) -> Result<Parasite, UndoError> {
        let item = self
            .image
            .items
            .get_mut(self.id)
            .ok_or(UndoError::UnknownResource)?;
        let undoable = item
            .parasites
            .get(name)
            .ok_or(UndoError::UnknownResource)?
            .is_undoable();
        if undoable {
            self.writer
                .write(ItemPropUndo::parasite_remove(item, name).into());
        }
        item.parasites
            .replace(name, None)
            .ok_or(UndoError::UnknownResource)
    }
    /// Display color of a channel.
    pub fn set_channel_color(&mut self, color: [u8; 4]) -> Result<(), UndoError> {
        let item = self.item_mut()?;
        let ItemKind::Channel { color: current } = &mut item.kind else {
            return Err(UndoError::MismatchedState);
        };
        if *current == color {
            return Err(UndoError::NoOp);
        }
        let undo = ItemPropUndo::channel_color(item)?;
        self.writer.write(undo.into());
        if let ItemKind::Channel { color: current } = &mut self.item_mut()?.kind {
            *current = color;
        }
        Ok(())
    }
    /// Copy `rect` of `source` into the drawable's pixels, in item-local coordinates. `source` may be
    /// anything covering `rect` in the drawable's format, such as a region read from a [`crate::tile::TiledBuffer`].
    pub fn write_pixels(&mut self, source: &impl PixelSource, rect: Rect) -> Result<(), UndoError> {
        if rect.is_empty() {
            return Err(UndoError::NoOp);
        }
        let item = self
            .image
            .items
            .get_mut(self.id)
            .ok_or(UndoError::UnknownResource)?;
        let undo = DrawableUndo::new(item, rect)?;
        let pixels = item.pixels.as_mut().ok_or(UndoError::MismatchedState)?;
        if source.format() != pixels.format() || !source.extent().contains_rect(&rect) {
            return Err(UndoError::MismatchedState);
        }
        self.writer.write(undo.into());
        // Checked above.
        let _ = pixels.copy_from(source, rect);
        Ok(())
    }
    /// Replace the drawable's pixels entirely, resizing it to match and placing it at `offset`.
    /// `pixels` must start at the origin.
    pub fn replace_pixels(&mut self, pixels: PixelBuffer, offset: [i32; 2]) -> Result<(), UndoError> {
        let extent = pixels.extent();
        if (extent.x1, extent.y1) != (0, 0) {
            return Err(UndoError::MismatchedState);
        }
        let item = self
            .image
            .items
            .get_mut(self.id)
            .ok_or(UndoError::UnknownResource)?;
        let undo = DrawableModUndo::new(item)?;
        self.writer.write(undo.into());
        item.pixels = Some(pixels);
        item.width = extent.width();
        item.height = extent.height();
        item.offset = offset;
        Ok(())
    }
    /// Give a layer a mask. The mask must be single channel and the same size as the layer.
    pub fn add_mask(&mut self, mask: PixelBuffer) -> Result<(), UndoError> {
        let item = self.item_mut()?;
        let size = Rect::from_size(0, 0, item.width, item.height);
        let layer = item.layer().ok_or(UndoError::MismatchedState)?;
        if layer.mask.is_some() || mask.format().layout != Layout::Y || mask.extent() != size {
            return Err(UndoError::MismatchedState);
        }
        let mut undo = LayerMaskUndo::add(self.id, mask);
        undo.apply(self.image, UndoMode::Redo)?;
        self.writer.write(undo.into());
        Ok(())
    }
    /// Take a layer's mask off, returning a copy of it.
    pub fn remove_mask(&mut self) -> Result<PixelBuffer, UndoError> {
        let mask = self
            .item_mut()?
            .layer()
            .and_then(|layer| layer.mask.clone())
            .ok_or(UndoError::MismatchedState)?;
        let mut undo = LayerMaskUndo::remove(self.id);
        undo.apply(self.image, UndoMode::Redo)?;
        self.writer.write(undo.into());
        Ok(mask)
    }
    /// Move within the item tree.
    pub fn reorder(&mut self, to: Position) -> Result<(), UndoError> {
        let from = self
            .image
            .items
            .position(self.id)
            .ok_or(UndoError::UnknownResource)?;
        if from == to {
            return Err(UndoError::NoOp);
        }
        let undo = ItemPropUndo::reorder(self.image, self.id)?;
        self.image.items.reorder(self.id, to)?;
        self.writer.write(undo.into());
        Ok(())
    }
    pub fn set_mode(&mut self, mode: LayerMode) -> Result<(), UndoError> {
        self.layer_prop(
            |layer| layer.blend.mode == mode,
            LayerPropUndo::mode,
            |layer| layer.blend.mode = mode,
        )
    }
    pub fn set_opacity(&mut self, opacity: FiniteF32) -> Result<(), UndoError> {
        self.layer_prop(
            |layer| layer.blend.opacity == opacity,
            LayerPropUndo::opacity,
            |layer| layer.blend.opacity = opacity,
        )
    }
    pub fn set_lock_alpha(&mut self, lock: bool) -> Result<(), UndoError> {
        self.layer_prop(
            |layer| layer.lock_alpha == lock,
            LayerPropUndo::lock_alpha,
            |layer| layer.lock_alpha = lock,
        )
    }
    /// Run a group-layer bookkeeping undo in the redo direction, recording it on success.
    fn group_op(&mut self, mut undo: GroupLayerUndo) -> Result<(), UndoError> {
        undo.apply(self.image, UndoMode::Redo)?;
        self.writer.write(undo.into());
        Ok(())
    }
    /// Stop a group layer from resizing to fit its children, until a matching [`Self::resume_resize`].
    pub fn suspend_resize(&mut self) -> Result<(), UndoError> {
        self.group_op(GroupLayerUndo::suspend_resize(self.id))
    }
    pub fn resume_resize(&mut self) -> Result<(), UndoError> {
        self.group_op(GroupLayerUndo::resume_resize(self.id))
    }
    pub fn suspend_mask(&mut self) -> Result<(), UndoError> {
        self.group_op(GroupLayerUndo::suspend_mask(self.id))
    }
    pub fn resume_mask(&mut self) -> Result<(), UndoError> {
        self.group_op(GroupLayerUndo::resume_mask(self.id))
    }
    /// Change the pixel format a group layer renders its children into.
    pub fn convert(&mut self, base_type: BaseType, precision: Precision) -> Result<(), UndoError> {
        let layer = self
            .image
            .items
            .get_mut(self.id)
            .ok_or(UndoError::UnknownResource)?
            .layer_mut()
            .ok_or(UndoError::MismatchedState)?;
        if layer.group.is_none() {
            return Err(UndoError::MismatchedState);
        }
        if (layer.base_type, layer.precision) == (base_type, precision) {
            return Err(UndoError::NoOp);
        }
        self.writer
            .write(GroupLayerUndo::convert(self.id, layer).into());
        layer.base_type = base_type;
        layer.precision = precision;
        Ok(())
    }
    /// Detach a floating selection from its drawable, making it an ordinary layer.
    pub fn floating_to_layer(&mut self) -> Result<(), UndoError> {
        let id = self.id;
        let layer = self.item_mut()?.layer_mut().ok_or(UndoError::MismatchedState)?;
        let mut undo = FloatingSelUndo::to_layer(id, layer)?;
        undo.apply(self.image, UndoMode::Redo)?;
        self.writer.write(undo.into());
        Ok(())
    }
}
