//! # Undo history
//!
//! Each image is owned by an [`UndoHistory`], which keeps track of every change made to it and can step back and
//! forth through them. The history is the ground truth for its image: changes are made within
//! [`UndoHistory::write_with`], where every modification is recorded as it happens.
//!
//! History is linear. Making a change after undoing discards everything that could have been redone.
//! Old entries are discarded once the history grows past both the configured number of levels and the
//! configured memory size.

use std::collections::VecDeque;

use crate::config::HistoryConfig;
use crate::state::{Image, ImageID};
use crate::undo::{DirtyMask, Undo, UndoDelta, UndoError, UndoMode, UndoType};

pub mod writer;

/// Something that happened to a history, reported to listeners after the fact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryEvent {
    Pushed { ty: UndoType, dirty: DirtyMask },
    Undone { ty: UndoType, dirty: DirtyMask },
    Redone { ty: UndoType, dirty: DirtyMask },
    /// Oldest entries were discarded to make room.
    Evicted(usize),
    /// The image now matches what was last saved.
    Cleaned,
}

type Listener = Box<dyn FnMut(&HistoryEvent) + Send>;

struct HistoryInner {
    image: Image,
    /// Oldest first.
    undo_stack: VecDeque<Undo>,
    /// Most recently undone last.
    redo_stack: Vec<Undo>,
    /// Steps away from the clean state. Negative when the clean state is ahead, in the redo stack.
    /// `None` once the clean state has been discarded.
    dirty: Option<isize>,
    config: HistoryConfig,
    /// Events yet to be reported to listeners, which can't be called while locked.
    pending: Vec<HistoryEvent>,
}
impl HistoryInner {
    fn push(&mut self, undo: Undo) {
        log::debug!(
            "Pushed {} ({})",
            undo.description(),
            human_bytes::human_bytes(undo.memory_size() as f64)
        );
        if !self.redo_stack.is_empty() {
            self.redo_stack.clear();
        }
        self.dirty = match self.dirty {
            // Clean state was just discarded with the redo stack.
            Some(dirty) if dirty < 0 => None,
            dirty => dirty.map(|dirty| dirty + 1),
        };
        self.pending.push(HistoryEvent::Pushed {
            ty: undo.undo_type(),
            dirty: undo.dirty_mask(),
        });
        self.undo_stack.push_back(undo);
        self.evict();
    }
    fn memory_size(&self) -> usize {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .map(Undo::memory_size)
            .sum()
    }
    /// Drop the oldest entries while there are more than the minimum levels and they take more than the
    /// maximum size.
    fn evict(&mut self) {
        let mut size = self.memory_size();
        let mut evicted = 0;
        while self.undo_stack.len() > self.config.undo_levels && size > self.config.undo_size {
            let len = self.undo_stack.len();
            let Some(oldest) = self.undo_stack.pop_front() else {
                break;
            };
            if self.dirty == isize::try_from(len).ok() {
                // Clean state was the one before the oldest entry.
                self.dirty = None;
            }
            size = size.saturating_sub(oldest.memory_size());
            evicted += 1;
        }
        if evicted > 0 {
            log::debug!(
                "Evicted {evicted} undo steps, {} remain",
                human_bytes::human_bytes(size as f64)
            );
            self.pending.push(HistoryEvent::Evicted(evicted));
        }
    }
    fn step(&mut self, mode: UndoMode) -> Result<bool, UndoError> {
        let popped = match mode {
            UndoMode::Undo => self.undo_stack.pop_back(),
            UndoMode::Redo => self.redo_stack.pop(),
        };
        let Some(mut undo) = popped else {
            return Ok(false);
        };
        if let Err(err) = undo.apply(&mut self.image, mode) {
            log::warn!("Failed to {mode:?} {}: {err}", undo.description());
            // Unchanged, so it goes right back.
            match mode {
                UndoMode::Undo => self.undo_stack.push_back(undo),
                UndoMode::Redo => self.redo_stack.push(undo),
            }
            return Err(err);
        }
        let (ty, dirty) = (undo.undo_type(), undo.dirty_mask());
        match mode {
            UndoMode::Undo => {
                self.dirty = self.dirty.map(|dirty| dirty - 1);
                self.redo_stack.push(undo);
                self.pending.push(HistoryEvent::Undone { ty, dirty });
            }
            UndoMode::Redo => {
                self.dirty = self.dirty.map(|dirty| dirty + 1);
                self.undo_stack.push_back(undo);
                self.pending.push(HistoryEvent::Redone { ty, dirty });
            }
        }
        if self.dirty == Some(0) {
            self.pending.push(HistoryEvent::Cleaned);
        }
        Ok(true)
    }
}

pub struct UndoHistory {
    inner: parking_lot::RwLock<HistoryInner>,
    listeners: parking_lot::Mutex<Vec<Listener>>,
    image: ImageID,
}
impl UndoHistory {
    /// Take ownership of an image, starting with an empty history. The image is considered clean.
    #[must_use]
    pub fn new(image: Image, config: HistoryConfig) -> Self {
        let id = image.id();
        Self {
            inner: HistoryInner {
                image,
                undo_stack: VecDeque::new(),
                redo_stack: Vec::new(),
                dirty: Some(0),
                config,
                pending: Vec::new(),
            }
            .into(),
            listeners: parking_lot::Mutex::default(),
            image: id,
        }
    }
    #[must_use]
    pub fn id(&self) -> ImageID {
        self.image
    }
    /// View the image. Writes and undos block while this is held.
    #[must_use]
    pub fn read(&self) -> parking_lot::MappedRwLockReadGuard<'_, Image> {
        parking_lot::RwLockReadGuard::map(self.inner.read(), |inner| &inner.image)
    }
    /// Release the image, discarding its history.
    #[must_use]
    pub fn into_image(self) -> Image {
        self.inner.into_inner().image
    }
    pub fn set_config(&self, config: HistoryConfig) {
        let mut lock = self.inner.write();
        lock.config = config;
        lock.evict();
        drop(lock);
        self.notify();
    }
    /// Be told about every change after it happens. Listeners are called outside of the lock,
    /// so they may read the image.
    pub fn connect(&self, listener: impl FnMut(&HistoryEvent) + Send + 'static) {
        self.listeners.lock().push(Box::new(listener));
    }
    fn notify(&self) {
        let events = std::mem::take(&mut self.inner.write().pending);
        if events.is_empty() {
            return;
        }
        let mut listeners = self.listeners.lock();
        for event in &events {
            for listener in listeners.iter_mut() {
                listener(event);
            }
        }
    }
    /// Locks the history for writing during the span of the closure, where each modification of the image is
    /// recorded. If multiple changes are written, they are pushed as a single group entry.
    pub fn write_with<F, T>(&self, write: F) -> T
    where
        F: FnOnce(&mut writer::HistoryWriter<'_>) -> T,
    {
        let result = {
            let mut writer = writer::HistoryWriter {
                lock: self.inner.write(),
                undos: smallvec::SmallVec::new(),
                description: None,
            };
            // Panic safe - the writer's Drop pushes what was recorded, keeping the history in sync with the
            // image. However, listeners will not be notified.
            write(&mut writer)
        };
        self.notify();
        result
    }
    /// Step back once. `Ok(false)` if there was nothing to undo. On error, nothing is changed.
    pub fn undo(&self) -> Result<bool, UndoError> {
        let result = self.inner.write().step(UndoMode::Undo);
        self.notify();
        result
    }
    /// Step forward once. `Ok(false)` if there was nothing to redo. On error, nothing is changed.
    pub fn redo(&self) -> Result<bool, UndoError> {
        let result = self.inner.write().step(UndoMode::Redo);
        self.notify();
        result
    }
    /// Step back up to `num` times, returning how many steps were taken.
    pub fn undo_n(&self, num: usize) -> Result<usize, UndoError> {
        self.step_n(UndoMode::Undo, num)
    }
    /// Step forward up to `num` times, returning how many steps were taken.
    pub fn redo_n(&self, num: usize) -> Result<usize, UndoError> {
        self.step_n(UndoMode::Redo, num)
    }
    fn step_n(&self, mode: UndoMode, num: usize) -> Result<usize, UndoError> {
        let result = {
            let mut lock = self.inner.write();
            let mut taken = 0;
            loop {
                if taken == num {
                    break Ok(taken);
                }
                match lock.step(mode) {
                    Ok(true) => taken += 1,
                    Ok(false) => break Ok(taken),
                    Err(err) => break Err(err),
                }
            }
        };
        self.notify();
        result
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.inner.read().undo_stack.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.inner.read().redo_stack.is_empty()
    }
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.inner.read().undo_stack.len()
    }
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.inner.read().redo_stack.len()
    }
    /// Descriptions of the entries that can be undone, most recent first.
    #[must_use]
    pub fn undo_descriptions(&self) -> Vec<String> {
        self.inner
            .read()
            .undo_stack
            .iter()
            .rev()
            .map(|undo| undo.description().to_owned())
            .collect()
    }
    /// Approximate bytes held by all entries.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        self.inner.read().memory_size()
    }
    /// Whether the image differs from when it was last marked clean.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.read().dirty != Some(0)
    }
    /// Mark the current state as clean, such as after saving.
    pub fn mark_clean(&self) {
        let mut lock = self.inner.write();
        lock.dirty = Some(0);
        lock.pending.push(HistoryEvent::Cleaned);
        drop(lock);
        self.notify();
    }
}

#[cfg(test)]
mod test {
    use super::writer::HistoryWriter;
    use super::{HistoryEvent, UndoHistory};
    use crate::buffer::{Depth, PixelBuffer, PixelFormat, PixelSource};
    use crate::config::HistoryConfig;
    use crate::state::item::{Layer, Position};
    use crate::state::{
        BaseType, Image, Item, ItemID, ItemKind, Orientation, Parasite, ParasiteFlags, Precision, Trc,
    };
    use crate::tile::TiledBuffer;
    use crate::undo::{UndoError, UndoType};
    use crate::util::Rect;
    use std::sync::{Arc, Mutex};

    fn history() -> UndoHistory {
        UndoHistory::new(
            Image::new(64, 64, BaseType::Rgb),
            HistoryConfig {
                undo_levels: 5,
                undo_size: usize::MAX,
            },
        )
    }
    const TOP: Position = Position {
        parent: None,
        index: 0,
    };

    #[test]
    fn undo_redo() {
        let history = history();
        history.write_with(|w| w.image().resize(32, 32)).unwrap();
        history
            .write_with(|w| w.image().set_base_type(BaseType::Gray))
            .unwrap();
        assert_eq!(history.undo_len(), 2);

        assert_eq!(history.undo(), Ok(true));
        assert_eq!(history.read().base_type(), BaseType::Rgb);
        assert_eq!(history.read().width(), 32);
        assert_eq!(history.undo(), Ok(true));
        assert_eq!(history.read().width(), 64);
        assert_eq!(history.undo(), Ok(false));

        assert_eq!(history.redo_n(5), Ok(2));
        assert_eq!(history.read().width(), 32);
        assert_eq!(history.read().base_type(), BaseType::Gray);
        assert!(!history.can_redo());
    }
    #[test]
    fn multiple_changes_are_one_step() {
        let history = history();
        let layer = history
            .write_with(|w| {
                w.set_description("Add layer");
                let item = Item::new("layer", ItemKind::Path, 8, 8);
                let id = w.image().insert_item(item, TOP)?;
                w.image().add_guide(Orientation::Horizontal, 4);
                Ok::<_, UndoError>(id)
            })
            .unwrap();
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.undo_descriptions(), ["Add layer"]);

        history.undo().unwrap();
        assert!(history.read().item(layer).is_none());
        assert!(history.read().guides().is_empty());
    }
    #[test]
    fn nested_group() {
        let history = history();
        history.write_with(|w| {
            w.image().resize(10, 10).unwrap();
            w.group("Guides", |w| {
                w.image().add_guide(Orientation::Vertical, 1);
                w.image().add_guide(Orientation::Vertical, 2);
            });
        });
        assert_eq!(history.undo_len(), 1);
        history.undo().unwrap();
        assert_eq!(history.read().width(), 64);
        assert!(history.read().guides().is_empty());
        history.redo().unwrap();
        assert_eq!(history.read().guides().len(), 2);
    }
    #[test]
    fn push_clears_redo() {
        let history = history();
        history.write_with(|w| w.image().resize(1, 1)).unwrap();
        history.undo().unwrap();
        assert!(history.can_redo());
        history.write_with(|w| w.image().resize(2, 2)).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.redo(), Ok(false));
    }
    #[test]
    fn no_op_writes_nothing() {
        let history = history();
        let result = history.write_with(|w| w.image().resize(64, 64));
        assert_eq!(result, Err(UndoError::NoOp));
        assert!(!history.can_undo());
        assert!(!history.is_dirty());
    }
    #[test]
    fn dirty_tracking() {
        let history = history();
        assert!(!history.is_dirty());
        history.write_with(|w| w.image().resize(1, 1)).unwrap();
        assert!(history.is_dirty());
        history.mark_clean();
        history.write_with(|w| w.image().resize(2, 2)).unwrap();
        history.undo().unwrap();
        assert!(!history.is_dirty());
        history.undo().unwrap();
        assert!(history.is_dirty());
        history.redo().unwrap();
        assert!(!history.is_dirty());

        // Undo past the clean state, then diverge. The clean state is gone for good.
        history.undo().unwrap();
        history.write_with(|w| w.image().resize(3, 3)).unwrap();
        history.undo().unwrap();
        assert!(history.is_dirty());
    }
    #[test]
    fn eviction_keeps_minimum_levels() {
        let history = UndoHistory::new(
            Image::new(1, 1, BaseType::Rgb),
            HistoryConfig {
                undo_levels: 3,
                undo_size: 0,
            },
        );
        for size in 2..10 {
            history.write_with(|w| w.image().resize(size, size)).unwrap();
        }
        assert_eq!(history.undo_len(), 3);
        assert_eq!(history.undo_n(10), Ok(3));
        assert_eq!(history.read().width(), 6);
        // The clean state was evicted.
        assert!(history.is_dirty());
    }
    #[test]
    fn failed_undo_stays_put() {
        let history = history();
        let layer = history
            .write_with(|w| {
                let item = Item::new("layer", ItemKind::Path, 8, 8);
                w.image().insert_item(item, TOP)
            })
            .unwrap();
        history
            .write_with(|w| w.image().item(layer).unwrap().rename("renamed"))
            .unwrap();
        // Pull the item out from under the history.
        history.inner.write().image.items.remove(layer).unwrap();
        assert_eq!(history.undo(), Err(UndoError::UnknownResource));
        assert_eq!(history.undo_len(), 2);
    }
    #[test]
    fn panicking_write_is_recorded() {
        let history = history();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            history.write_with(|w| {
                w.image().resize(5, 5).unwrap();
                panic!("oops");
            });
        }));
        assert!(result.is_err());
        assert_eq!(history.read().width(), 5);
        assert_eq!(history.undo_len(), 1);
        history.undo().unwrap();
        assert_eq!(history.read().width(), 64);
    }
    #[test]
    fn listeners() {
        let history = history();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        history.connect(move |event| sink.lock().unwrap().push(event.clone()));

        history.write_with(|w| w.image().resize(1, 1)).unwrap();
        history.undo().unwrap();
        let seen = seen.lock().unwrap();
        assert!(matches!(
            seen[0],
            HistoryEvent::Pushed {
                ty: UndoType::ImageSize,
                ..
            }
        ));
        assert!(matches!(seen[1], HistoryEvent::Undone { .. }));
        assert_eq!(seen[2], HistoryEvent::Cleaned);
    }

    /// Run `write`, then check that undo restores the image exactly and redo brings the change back.
    fn undo_restores<T>(history: &UndoHistory, write: impl FnOnce(&mut HistoryWriter<'_>) -> T) -> T {
        let before = history.read().clone();
        let result = history.write_with(write);
        let after = history.read().clone();
        assert_ne!(before, after);
        assert_eq!(history.undo(), Ok(true));
        assert_eq!(*history.read(), before);
        assert_eq!(history.redo(), Ok(true));
        assert_eq!(*history.read(), after);
        result
    }
    fn layer(name: &str, size: u32) -> Item {
        let layer = Layer::new(BaseType::Rgb, Precision::default());
        Item::new(name, ItemKind::Layer(layer), size, size)
    }
    fn group(name: &str) -> Item {
        let layer = Layer::new_group(BaseType::Rgb, Precision::default());
        Item::new(name, ItemKind::Layer(layer), 0, 0)
    }
    fn insert(history: &UndoHistory, item: Item, parent: Option<ItemID>, index: usize) -> ItemID {
        history
            .write_with(|w| w.image().insert_item(item, Position { parent, index }))
            .unwrap()
    }
    #[test]
    fn resize_canvas_undoes_everything() {
        let history = history();
        let layer = insert(&history, layer("layer", 16), None, 0);
        history.write_with(|w| {
            let mut image = w.image();
            image.add_guide(Orientation::Horizontal, 10);
            image.add_guide(Orientation::Vertical, 60);
            image.add_guide(Orientation::Vertical, 12);
            image.add_sample_point(5, 5);
            image.add_sample_point(20, 20);
            let mask = PixelBuffer::from_fn(Rect::from_size(0, 0, 64, 64), PixelFormat::MASK_U8, |x, _| {
                x as f32 / 64.0
            });
            image.select(Some(mask)).unwrap();
        });

        undo_restores(&history, |w| w.image().resize_canvas(48, 48, [-8, 0])).unwrap();
        let image = history.read();
        assert_eq!((image.width(), image.height()), (48, 48));
        assert_eq!(image.item(layer).unwrap().offset(), [-8, 0]);
        let guides: Vec<_> = image.guides().iter().map(|guide| guide.position).collect();
        assert_eq!(guides, [10, 4]);
        let points: Vec<_> = image.sample_points().iter().map(|point| (point.x, point.y)).collect();
        assert_eq!(points, [(12, 20)]);
        let selection = image.selection().unwrap();
        assert_eq!(selection.extent(), Rect::from_size(0, 0, 48, 48));
        // Was column 8 before the shift.
        assert_eq!(selection.pixel(0, 0), [32]);
    }
    #[test]
    fn remove_item_undoes_in_place() {
        let history = history();
        let bottom = insert(&history, layer("bottom", 8), None, 0);
        let folder = insert(&history, group("folder"), None, 0);
        insert(&history, layer("child a", 4), Some(folder), 0);
        insert(&history, layer("child b", 4), Some(folder), 1);
        let top = insert(&history, layer("top", 8), None, 0);

        assert_eq!(history.read().items().children(None), [top, folder, bottom]);
        undo_restores(&history, |w| w.image().remove_item(folder)).unwrap();
        assert_eq!(history.read().items().children(None), [top, bottom]);
        history.undo().unwrap();
        assert_eq!(history.read().items().children(Some(folder)).len(), 2);
    }
    #[test]
    fn reorder_undoes() {
        let history = history();
        let a = insert(&history, layer("a", 8), None, 0);
        let b = insert(&history, layer("b", 8), None, 1);
        let folder = insert(&history, group("folder"), None, 2);

        undo_restores(&history, |w| {
            w.image().item(a).unwrap().reorder(Position {
                parent: Some(folder),
                index: 0,
            })
        })
        .unwrap();
        assert_eq!(history.read().items().children(None), [b, folder]);
        assert_eq!(history.read().items().children(Some(folder)), [a]);
    }
    #[test]
    fn convert_undoes() {
        let history = history();
        let folder = insert(&history, group("folder"), None, 0);
        let precision = Precision {
            depth: Depth::U16,
            trc: Trc::Linear,
        };
        undo_restores(&history, |w| {
            w.image().item(folder).unwrap().convert(BaseType::Gray, precision)
        })
        .unwrap();
        let image = history.read();
        let layer = image.item(folder).unwrap().layer().unwrap();
        assert_eq!((layer.base_type, layer.precision), (BaseType::Gray, precision));
    }
    #[test]
    fn floating_to_layer_undoes() {
        let history = history();
        let base = insert(&history, layer("base", 8), None, 0);
        let mut floating = layer("floating", 4);
        if let ItemKind::Layer(layer) = &mut floating.kind {
            layer.floating_drawable = Some(base);
        }
        let floating = insert(&history, floating, None, 0);
        assert_eq!(history.read().floating_selection(), Some(floating));

        undo_restores(&history, |w| w.image().item(floating).unwrap().floating_to_layer()).unwrap();
        assert_eq!(history.read().floating_selection(), None);
    }
    #[test]
    fn item_parasites_undo() {
        let history = history();
        let item = insert(&history, layer("layer", 8), None, 0);
        let parasite = Parasite::new("note", ParasiteFlags::UNDOABLE, b"hi".to_vec());

        undo_restores(&history, |w| {
            w.image().item(item).unwrap().attach_parasite(parasite.clone())
        })
        .unwrap();
        assert_eq!(history.read().item(item).unwrap().parasites().get("note"), Some(&parasite));

        let detached = undo_restores(&history, |w| {
            w.image().item(item).unwrap().detach_parasite("note")
        });
        assert_eq!(detached, Ok(parasite));
        assert!(history.read().item(item).unwrap().parasites().get("note").is_none());
    }
    #[test]
    fn pixels_from_tiles_undo() {
        let history = history();
        let alpha = Item::new("alpha", ItemKind::Channel { color: [0; 4] }, 16, 16);
        let channel = insert(&history, alpha, None, 0);
        let full = Rect::from_size(0, 0, 16, 16);
        let ones = PixelBuffer::from_fn(full, PixelFormat::MASK_U8, |_, _| 1.0);
        undo_restores(&history, |w| {
            w.image().item(channel).unwrap().replace_pixels(ones.clone(), [2, 3])
        })
        .unwrap();
        assert_eq!(history.read().item(channel).unwrap().offset(), [2, 3]);

        // A fresh tiled buffer reads back as zeros.
        let mut tiles = TiledBuffer::with_tile_size(full, PixelFormat::MASK_U8, 4);
        let rect = Rect::from_size(4, 4, 8, 8);
        let read = tiles.read(rect).unwrap();
        undo_restores(&history, |w| w.image().item(channel).unwrap().write_pixels(&read, rect)).unwrap();
        let image = history.read();
        let pixels = image.item(channel).unwrap().pixels().unwrap();
        assert_eq!(pixels.pixel(4, 4), [0]);
        assert_eq!(pixels.pixel(3, 4), [255]);
        assert_eq!(pixels.pixel(11, 11), [0]);
        assert_eq!(pixels.pixel(12, 11), [255]);
    }
    #[test]
    fn pixel_writes_check_their_source() {
        let history = history();
        let item = insert(&history, layer("layer", 8), None, 0);
        let mask = PixelBuffer::new(Rect::from_size(0, 0, 8, 8), PixelFormat::MASK_U8);
        // Wrong format for an RGB layer.
        let result = history.write_with(|w| {
            w.image()
                .item(item)
                .unwrap()
                .write_pixels(&mask, Rect::from_size(0, 0, 2, 2))
        });
        assert_eq!(result, Err(UndoError::MismatchedState));
        let empty = history.write_with(|w| {
            w.image()
                .item(item)
                .unwrap()
                .write_pixels(&mask, Rect::from_size(0, 0, 0, 2))
        });
        assert_eq!(empty, Err(UndoError::NoOp));
        assert_eq!(history.undo_len(), 1);
    }
    #[test]
    fn layer_masks_and_channel_colors_undo() {
        let history = history();
        let item = insert(&history, layer("layer", 8), None, 0);
        let mask = PixelBuffer::from_fn(Rect::from_size(0, 0, 8, 8), PixelFormat::MASK_U8, |x, y| {
            ((x + y) % 2) as f32
        });
        undo_restores(&history, |w| w.image().item(item).unwrap().add_mask(mask.clone())).unwrap();
        // Only one mask per layer.
        let again = history.write_with(|w| w.image().item(item).unwrap().add_mask(mask.clone()));
        assert_eq!(again, Err(UndoError::MismatchedState));

        let removed = undo_restores(&history, |w| w.image().item(item).unwrap().remove_mask());
        assert_eq!(removed, Ok(mask));

        let red = Item::new("red", ItemKind::Channel { color: [255, 0, 0, 128] }, 8, 8);
        let channel = insert(&history, red, None, 0);
        undo_restores(&history, |w| {
            w.image().item(channel).unwrap().set_channel_color([0, 0, 255, 128])
        })
        .unwrap();
        let same = history.write_with(|w| {
            w.image().item(channel).unwrap().set_channel_color([0, 0, 255, 128])
        });
        assert_eq!(same, Err(UndoError::NoOp));
        let not_a_channel = history.write_with(|w| w.image().item(item).unwrap().set_channel_color([0; 4]));
        assert_eq!(not_a_channel, Err(UndoError::MismatchedState));
    }
    #[test]
    fn selection_undoes() {
        let history = history();
        let bounds = history.read().bounds();
        let mask = PixelBuffer::from_fn(bounds, PixelFormat::MASK_U8, |x, _| (x % 2) as f32);
        undo_restores(&history, |w| w.image().select(Some(mask.clone()))).unwrap();
        assert_eq!(history.read().selection(), Some(&mask));
        undo_restores(&history, |w| w.image().select(None)).unwrap();

        let small = PixelBuffer::new(Rect::from_size(0, 0, 2, 2), PixelFormat::MASK_U8);
        assert_eq!(
            history.write_with(|w| w.image().select(Some(small))),
            Err(UndoError::MismatchedState)
        );
    }
    #[test]
    fn shrinking_config_evicts() {
        let history = UndoHistory::new(
            Image::new(1, 1, BaseType::Rgb),
            HistoryConfig {
                undo_levels: 20,
                undo_size: usize::MAX,
            },
        );
        for size in 2..12 {
            history.write_with(|w| w.image().resize(size, size)).unwrap();
        }
        assert_eq!(history.undo_len(), 10);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        history.connect(move |event| sink.lock().unwrap().push(event.clone()));

        history.set_config(HistoryConfig {
            undo_levels: 4,
            undo_size: 0,
        });
        assert_eq!(history.undo_len(), 4);
        assert_eq!(*seen.lock().unwrap(), [HistoryEvent::Evicted(6)]);
        assert_eq!(history.undo_n(10), Ok(4));
        assert_eq!(history.read().width(), 7);
    }
}
