use std::sync::{Arc, Weak};

use super::{RenderNode, TileHandlerValidate, TileValidator};
use crate::buffer::PixelFormat;

/// A source of rendered pixels, such as an image's projection, which must be told when rendering happens.
pub trait Projectable {
    fn begin_render(&self);
    fn end_render(&self);
    /// The graph node computing this projectable's pixels.
    fn graph(&self) -> Arc<dyn RenderNode>;
}

/// Validates tiles from a [`Projectable`]'s graph, between its `begin_render` and `end_render` hooks.
///
/// Only a weak reference to the projectable is held. Once it is dropped, validation carries on rendering the
/// graph node without calling the hooks.
pub struct TileHandlerProjectable {
    base: TileHandlerValidate,
    projectable: Weak<dyn Projectable>,
}
impl TileHandlerProjectable {
    #[must_use]
    pub fn new<P: Projectable + 'static>(projectable: &Arc<P>, format: PixelFormat) -> Self {
        let weak: Weak<dyn Projectable> = Arc::downgrade(projectable) as Weak<dyn Projectable>;
        Self {
            base: TileHandlerValidate::new(projectable.graph(), format),
            projectable: weak,
        }
    }
    /// Whether the projectable is still alive.
    #[must_use]
    pub fn has_projectable(&self) -> bool {
        self.projectable.strong_count() > 0
    }
    fn projectable(&self) -> Option<Arc<dyn Projectable>> {
        let projectable = self.projectable.upgrade();
        if projectable.is_none() {
            log::warn!("Validating a tile after its projectable was dropped");
        }
        projectable
    }
}
impl TileValidator for TileHandlerProjectable {
    fn handler(&self) -> &TileHandlerValidate {
        &self.base
    }
    fn handler_mut(&mut self) -> &mut TileHandlerValidate {
        &mut self.base
    }
    /// Idle -> Rendering.
    ///
    /// # Panics
    /// If already rendering. The projectable's hook is not called in that case.
    fn begin_validate(&mut self) {
        assert!(
            !self.base.is_validating(),
            "begin_validate while already validating"
        );
        if let Some(projectable) = self.projectable() {
            projectable.begin_render();
        }
        self.base.begin_validate();
    }
    /// Rendering -> Idle.
    fn end_validate(&mut self) {
        self.base.end_validate();
        if let Some(projectable) = self.projectable() {
            projectable.end_render();
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Projectable, TileHandlerProjectable};
    use crate::buffer::{PixelBuffer, PixelFormat, PixelSource};
    use crate::tile::{RenderNode, TileValidator, TiledBuffer};
    use crate::util::Rect;
    use std::cell::RefCell;
    use std::sync::Arc;

    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    enum Event {
        Begin,
        End,
    }
    struct Recorder {
        source: Arc<PixelBuffer>,
        events: RefCell<Vec<Event>>,
    }
    impl Projectable for Recorder {
        fn begin_render(&self) {
            self.events.borrow_mut().push(Event::Begin);
        }
        fn end_render(&self) {
            self.events.borrow_mut().push(Event::End);
        }
        fn graph(&self) -> Arc<dyn RenderNode> {
            self.source.clone()
        }
    }
    fn recorder(extent: Rect) -> Arc<Recorder> {
        Arc::new(Recorder {
            source: Arc::new(PixelBuffer::from_fn(extent, PixelFormat::MASK_U8, |x, _| {
                if x % 2 == 0 {
                    1.0
                } else {
                    0.0
                }
            })),
            events: RefCell::default(),
        })
    }

    #[test]
    fn hooks_are_paired() {
        let extent = Rect::from_size(0, 0, 16, 16);
        let projectable = recorder(extent);
        let mut handler = TileHandlerProjectable::new(&projectable, PixelFormat::MASK_U8);
        handler.handler_mut().invalidate(extent);

        let mut buffer = TiledBuffer::with_tile_size(extent, PixelFormat::MASK_U8, 8);
        buffer.set_validator(handler);
        let read = buffer.read(extent).unwrap();
        assert_eq!(read.data(), projectable.source.data());

        // Four stale tiles, each rendered once within its own bracket.
        let events = projectable.events.borrow();
        assert_eq!(events.len(), 8);
        for pair in events.chunks(2) {
            assert_eq!(pair, [Event::Begin, Event::End]);
        }
        drop(events);

        // Already valid, no more renders.
        let _ = buffer.read(extent).unwrap();
        assert_eq!(projectable.events.borrow().len(), 8);
        assert_eq!(read.pixel(2, 3), &[255]);
    }
    #[test]
    #[should_panic(expected = "already validating")]
    fn reentrant_begin_validate() {
        let projectable = recorder(Rect::from_size(0, 0, 4, 4));
        let mut handler = TileHandlerProjectable::new(&projectable, PixelFormat::MASK_U8);
        handler.begin_validate();
        handler.begin_validate();
    }
    #[test]
    fn reentrant_begin_does_not_render_twice() {
        let projectable = recorder(Rect::from_size(0, 0, 4, 4));
        let mut handler = TileHandlerProjectable::new(&projectable, PixelFormat::MASK_U8);
        handler.begin_validate();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            handler.begin_validate();
        }));
        assert!(result.is_err());
        assert_eq!(*projectable.events.borrow(), [Event::Begin]);
    }
    #[test]
    fn dropped_projectable_skips_hooks() {
        let extent = Rect::from_size(0, 0, 4, 4);
        let projectable = recorder(extent);
        let source = projectable.source.clone();
        let mut handler = TileHandlerProjectable::new(&projectable, PixelFormat::MASK_U8);
        handler.handler_mut().invalidate(extent);
        assert!(handler.has_projectable());
        drop(projectable);
        assert!(!handler.has_projectable());

        // The graph node is owned by the handler, and still renders.
        let mut tile = PixelBuffer::new(extent, PixelFormat::MASK_U8);
        handler.validate_tile(&mut tile);
        assert_eq!(tile.data(), source.data());
        assert!(!handler.handler().is_validating());
    }
}
