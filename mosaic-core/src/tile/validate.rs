use std::sync::Arc;

use super::Region;
use crate::buffer::{PixelBuffer, PixelFormat, PixelSource};
use crate::util::Rect;

/// A node of a render graph, able to compute the pixels of any area.
pub trait RenderNode {
    /// Compute the pixels covered by `out`'s extent into `out`.
    fn render(&self, out: &mut PixelBuffer);
}
/// A buffer renders as itself. Pixels outside of it are left untouched.
impl RenderNode for PixelBuffer {
    fn render(&self, out: &mut PixelBuffer) {
        if let Some(part) = out.extent().intersect(&self.extent()) {
            // In range by construction.
            let _ = out.copy_from(self, part);
        }
    }
}

/// Something that can be attached to a [`super::TiledBuffer`] to recompute stale tiles.
///
/// Implementors provide access to their [`TileHandlerValidate`], and may wrap the validation
/// by overriding [`Self::begin_validate`] and [`Self::end_validate`].
pub trait TileValidator {
    fn handler(&self) -> &TileHandlerValidate;
    fn handler_mut(&mut self) -> &mut TileHandlerValidate;
    /// Start a validation. Must be paired with [`Self::end_validate`], and may not nest.
    fn begin_validate(&mut self) {
        self.handler_mut().begin_validate();
    }
    fn end_validate(&mut self) {
        self.handler_mut().end_validate();
    }
    /// Recompute the stale pixels of `tile`, if any.
    fn validate_tile(&mut self, tile: &mut PixelBuffer) {
        let handler = self.handler();
        if handler.is_suspended() || !handler.is_dirty(tile.extent()) {
            return;
        }
        let mut bracket = RenderBracket::begin(self);
        bracket.handler_mut().render_dirty(tile);
    }
}

/// An open validation, ended when dropped.
pub struct RenderBracket<'a, V: TileValidator + ?Sized> {
    validator: &'a mut V,
}
impl<'a, V: TileValidator + ?Sized> RenderBracket<'a, V> {
    pub fn begin(validator: &'a mut V) -> Self {
        validator.begin_validate();
        Self { validator }
    }
    pub fn handler_mut(&mut self) -> &mut TileHandlerValidate {
        self.validator.handler_mut()
    }
}
impl<V: TileValidator + ?Sized> Drop for RenderBracket<'_, V> {
    fn drop(&mut self) {
        self.validator.end_validate();
    }
}

/// Tracks which pixels are stale, and renders a graph node to refresh them.
pub struct TileHandlerValidate {
    graph: Arc<dyn RenderNode>,
    format: PixelFormat,
    dirty: Region,
    suspend_validate: u32,
    /// Render whole tiles, rather than only their stale parts.
    whole_tile: bool,
    validating: bool,
}
impl TileHandlerValidate {
    #[must_use]
    pub fn new(graph: Arc<dyn RenderNode>, format: PixelFormat) -> Self {
        Self {
            graph,
            format,
            dirty: Region::new(),
            suspend_validate: 0,
            whole_tile: false,
            validating: false,
        }
    }
    #[must_use]
    pub fn graph(&self) -> &Arc<dyn RenderNode> {
        &self.graph
    }
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }
    #[must_use]
    pub fn dirty_region(&self) -> &Region {
        &self.dirty
    }
    pub fn set_whole_tile(&mut self, whole_tile: bool) {
        self.whole_tile = whole_tile;
    }
    /// Mark an area as stale.
    pub fn invalidate(&mut self, rect: Rect) {
        self.dirty.add(rect);
    }
    /// Revert an [`Self::invalidate`], marking the area as up-to-date without rendering it.
    pub fn undo_invalidate(&mut self, rect: Rect) {
        self.dirty.subtract(rect);
    }
    #[must_use]
    pub fn is_dirty(&self, rect: Rect) -> bool {
        self.dirty.intersects(rect)
    }
    /// Stop validating, until an equal number of [`Self::resume_validate`] calls.
    /// Stale tiles are handed out as-is in the meantime.
    pub fn suspend_validate(&mut self) {
        self.suspend_validate += 1;
    }
    pub fn resume_validate(&mut self) {
        debug_assert!(self.suspend_validate > 0, "unbalanced resume_validate");
        self.suspend_validate = self.suspend_validate.saturating_sub(1);
    }
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspend_validate > 0
    }
    #[must_use]
    pub fn is_validating(&self) -> bool {
        self.validating
    }
    /// # Panics
    /// If a validation is already in progress.
    pub fn begin_validate(&mut self) {
        assert!(!self.validating, "begin_validate while already validating");
        self.validating = true;
    }
    /// # Panics
    /// If no validation is in progress.
    pub fn end_validate(&mut self) {
        assert!(self.validating, "end_validate without begin_validate");
        self.validating = false;
    }
    /// Render the stale parts of `tile` and mark them valid. Must be called between
    /// [`Self::begin_validate`] and [`Self::end_validate`].
    pub fn render_dirty(&mut self, tile: &mut PixelBuffer) {
        debug_assert!(self.validating, "rendering outside of a validation");
        debug_assert_eq!(tile.format(), self.format);
        let rect = tile.extent();
        let parts = if self.whole_tile {
            vec![rect]
        } else {
            self.dirty.intersections(rect)
        };
        for part in parts {
            let mut rendered = PixelBuffer::new(part, self.format);
            self.graph.render(&mut rendered);
            // Parts lie within the tile by construction.
            let _ = tile.copy_from(&rendered, part);
        }
        log::trace!("Validated tile {rect:?}");
        self.dirty.subtract(rect);
    }
}
impl TileValidator for TileHandlerValidate {
    fn handler(&self) -> &TileHandlerValidate {
        self
    }
    fn handler_mut(&mut self) -> &mut TileHandlerValidate {
        self
    }
}

#[cfg(test)]
mod test {
    use super::{RenderNode, TileHandlerValidate, TileValidator};
    use crate::buffer::{PixelBuffer, PixelFormat, PixelSource};
    use crate::util::Rect;
    use std::cell::Cell;
    use std::sync::Arc;

    /// Renders a constant, counting render calls.
    struct Solid {
        value: f32,
        renders: Cell<usize>,
    }
    impl RenderNode for Solid {
        fn render(&self, out: &mut PixelBuffer) {
            self.renders.set(self.renders.get() + 1);
            let extent = out.extent();
            for y in extent.y1..extent.y2 {
                for x in extent.x1..extent.x2 {
                    out.set_all_channels(x, y, self.value);
                }
            }
        }
    }
    fn solid() -> Arc<Solid> {
        Arc::new(Solid {
            value: 1.0,
            renders: Cell::new(0),
        })
    }

    #[test]
    fn renders_only_dirty_parts() {
        let node = solid();
        let mut handler = TileHandlerValidate::new(node.clone(), PixelFormat::MASK_U8);
        let mut tile = PixelBuffer::new(Rect::from_size(0, 0, 4, 4), PixelFormat::MASK_U8);
        handler.invalidate(Rect::from_size(0, 0, 2, 1));

        handler.validate_tile(&mut tile);
        assert_eq!(node.renders.get(), 1);
        assert_eq!(tile.pixel(1, 0), &[255]);
        assert_eq!(tile.pixel(2, 0), &[0]);
        assert!(handler.dirty_region().is_empty());
        assert!(!handler.is_validating());

        // Clean now, so nothing more to render.
        handler.validate_tile(&mut tile);
        assert_eq!(node.renders.get(), 1);
    }
    #[test]
    fn whole_tile() {
        let node = solid();
        let mut handler = TileHandlerValidate::new(node.clone(), PixelFormat::MASK_U8);
        handler.set_whole_tile(true);
        let mut tile = PixelBuffer::new(Rect::from_size(0, 0, 4, 4), PixelFormat::MASK_U8);
        handler.invalidate(Rect::from_size(3, 3, 1, 1));
        handler.validate_tile(&mut tile);
        assert!(tile.data().iter().all(|&v| v == 255));
    }
    #[test]
    fn suspend_and_undo_invalidate() {
        let node = solid();
        let mut handler = TileHandlerValidate::new(node.clone(), PixelFormat::MASK_U8);
        let mut tile = PixelBuffer::new(Rect::from_size(0, 0, 4, 4), PixelFormat::MASK_U8);
        handler.invalidate(Rect::from_size(0, 0, 4, 4));
        handler.suspend_validate();
        handler.validate_tile(&mut tile);
        assert_eq!(node.renders.get(), 0);
        handler.resume_validate();

        handler.undo_invalidate(Rect::from_size(0, 0, 4, 4));
        handler.validate_tile(&mut tile);
        assert_eq!(node.renders.get(), 0);
    }
    #[test]
    #[should_panic(expected = "already validating")]
    fn nested_validate_panics() {
        let mut handler = TileHandlerValidate::new(solid(), PixelFormat::MASK_U8);
        handler.begin_validate();
        handler.begin_validate();
    }
}
