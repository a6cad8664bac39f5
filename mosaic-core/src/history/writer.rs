use crate::state::writer::ImageWriter;
use crate::undo::{GroupType, Undo, UndoGroup};

/// Any type which can sink undos.
pub trait UndoWrite<U> {
    /// Inserts an undo.
    fn write(&mut self, undo: U);
}
impl<Write, U> UndoWrite<U> for &mut Write
where
    Write: UndoWrite<U>,
{
    fn write(&mut self, undo: U) {
        (**self).write(undo);
    }
}
// Any undo that can be wrapped in Undo can be written into any
// smallvec of Undo.
impl<Sub, Array> UndoWrite<Sub> for smallvec::SmallVec<Array>
where
    Sub: Into<Undo>,
    Array: smallvec::Array<Item = Undo>,
{
    fn write(&mut self, undo: Sub) {
        self.push(undo.into());
    }
}

pub struct HistoryWriter<'a> {
    pub(super) lock: parking_lot::RwLockWriteGuard<'a, super::HistoryInner>,
    // Most writes are exactly one change.
    pub(super) undos: smallvec::SmallVec<[Undo; 1]>,
    pub(super) description: Option<String>,
}
// As with any guard, leaking this leaves the history locked forever rather than
// letting anyone observe an image that doesn't match its history.
impl Drop for HistoryWriter<'_> {
    fn drop(&mut self) {
        if self.undos.is_empty() {
            return;
        }
        let undos = std::mem::take(&mut self.undos);
        let description = self.description.take();

        // Always push exactly one entry, bundling if there's more than one undo or if we're panicking.
        let undo = if std::thread::panicking() {
            Undo::Group(UndoGroup {
                ty: GroupType::WritePanic,
                description: description.unwrap_or_else(|| "Interrupted change".to_owned()),
                undos: undos.into_boxed_slice(),
            })
        } else if undos.len() == 1 && description.is_none() {
            match undos.into_iter().next() {
                Some(undo) => undo,
                None => return,
            }
        } else {
            let description = description.unwrap_or_else(|| {
                undos
                    .first()
                    .map(|first| first.description().to_owned())
                    .unwrap_or_default()
            });
            Undo::Group(UndoGroup {
                ty: GroupType::Atoms,
                description,
                undos: undos.into_boxed_slice(),
            })
        };
        self.lock.push(undo);
    }
}
impl HistoryWriter<'_> {
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.undos.is_empty()
    }
    /// Name the entry this write will produce, as shown in an undo history list.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }
    pub fn image(&mut self) -> ImageWriter<'_, &mut smallvec::SmallVec<[Undo; 1]>> {
        ImageWriter::new(&mut self.undos, &mut self.lock.image)
    }
    /// Record that something happened which cannot be undone.
    pub fn cant_undo(&mut self, description: impl Into<String>) {
        self.undos.write(crate::undo::CantUndo {
            description: description.into(),
        });
    }
    /// Bundle every change made within `write` into a single undo, nested within this write.
    pub fn group<T>(&mut self, description: impl Into<String>, write: impl FnOnce(&mut Self) -> T) -> T {
        let start = self.undos.len();
        // On panic, the undos are left in place and written flat into the panic group.
        let result = write(self);
        if self.undos.len() > start {
            let undos: Vec<Undo> = self.undos.drain(start..).collect();
            self.undos.push(Undo::Group(UndoGroup {
                ty: GroupType::Atoms,
                description: description.into(),
                undos: undos.into_boxed_slice(),
            }));
        }
        result
    }
}
