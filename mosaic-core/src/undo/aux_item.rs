use super::{UndoDelta, UndoError, UndoMode, UndoType};
use crate::state::{Guide, GuideID, Image, Orientation, PickMode, SamplePoint, SamplePointID};

/// A guide being added, moved or removed. Holds the guide's other state, or `None` where it
/// did not exist.
#[derive(Clone, Debug)]
pub struct GuideUndo {
    guide: GuideID,
    /// Where in the image's list the guide sat when last present.
    index: usize,
    state: Option<(Orientation, i32)>,
}
impl GuideUndo {
    /// Before `guide` is added to the image.
    #[must_use]
    pub fn added(guide: GuideID) -> Self {
        Self {
            guide,
            index: 0,
            state: None,
        }
    }
    /// Before `guide`, found at `index` of the image's guides, is moved or removed.
    #[must_use]
    pub fn changed(index: usize, guide: &Guide) -> Self {
        Self {
            guide: guide.id,
            index,
            state: Some((guide.orientation, guide.position)),
        }
    }
}
impl UndoDelta for GuideUndo {
    fn undo_type(&self) -> UndoType {
        UndoType::Guide
    }
    fn apply(&mut self, image: &mut Image, _: UndoMode) -> Result<(), UndoError> {
        let index = image.guides.iter().position(|guide| guide.id == self.guide);
        self.state = match (index, self.state) {
            (None, None) => return Err(UndoError::UnknownResource),
            (Some(index), None) => {
                let guide = image.guides.remove(index);
                self.index = index;
                Some((guide.orientation, guide.position))
            }
            (None, Some((orientation, position))) => {
                let at = self.index.min(image.guides.len());
                image.guides.insert(
                    at,
                    Guide {
                        id: self.guide,
                        orientation,
                        position,
                    },
                );
                None
            }
            (Some(index), Some((orientation, position))) => {
                let guide = &mut image.guides[index];
                let old = (guide.orientation, guide.position);
                guide.orientation = orientation;
                guide.position = position;
                self.index = index;
                Some(old)
            }
        };
        Ok(())
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

/// A sample point being added, moved, changed or removed, as [`GuideUndo`].
#[derive(Clone, Debug)]
pub struct SamplePointUndo {
    point: SamplePointID,
    index: usize,
    state: Option<([i32; 2], PickMode)>,
}
impl SamplePointUndo {
    #[must_use]
    pub fn added(point: SamplePointID) -> Self {
        Self {
            point,
            index: 0,
            state: None,
        }
    }
    #[must_use]
    pub fn changed(index: usize, point: &SamplePoint) -> Self {
        Self {
            point: point.id,
            index,
            state: Some(([point.x, point.y], point.pick_mode)),
        }
    }
}
impl UndoDelta for SamplePointUndo {
    fn undo_type(&self) -> UndoType {
        UndoType::SamplePoint
    }
    fn apply(&mut self, image: &mut Image, _: UndoMode) -> Result<(), UndoError> {
        let index = image
            .sample_points
            .iter()
            .position(|point| point.id == self.point);
        self.state = match (index, self.state) {
            (None, None) => return Err(UndoError::UnknownResource),
            (Some(index), None) => {
                let point = image.sample_points.remove(index);
                self.index = index;
                Some(([point.x, point.y], point.pick_mode))
            }
            (None, Some(([x, y], pick_mode))) => {
                let at = self.index.min(image.sample_points.len());
                image.sample_points.insert(
                    at,
                    SamplePoint {
                        id: self.point,
                        x,
                        y,
                        pick_mode,
                    },
                );
                None
            }
            (Some(index), Some(([x, y], pick_mode))) => {
                let point = &mut image.sample_points[index];
                let old = ([point.x, point.y], point.pick_mode);
                point.x = x;
                point.y = y;
                point.pick_mode = pick_mode;
                self.index = index;
                Some(old)
            }
        };
        Ok(())
    }
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod test {
    use super::{GuideUndo, SamplePointUndo};
    use crate::state::{
        BaseType, Guide, GuideID, Image, Orientation, PickMode, SamplePoint, SamplePointID,
    };
    use crate::undo::{UndoDelta, UndoError, UndoMode};

    #[test]
    fn guide_lifecycle() {
        let mut image = Image::new(100, 100, BaseType::Rgb);
        let id = GuideID::default();
        let mut add = GuideUndo::added(id);
        image.guides.push(Guide {
            id,
            orientation: Orientation::Vertical,
            position: 10,
        });
        let mut moved = GuideUndo::changed(0, &image.guides[0]);
        image.guides[0].position = 40;

        moved.apply(&mut image, UndoMode::Undo).unwrap();
        assert_eq!(image.guide(id).map(Guide::position), Some(10));
        add.apply(&mut image, UndoMode::Undo).unwrap();
        assert!(image.guides().is_empty());

        // And back.
        add.apply(&mut image, UndoMode::Redo).unwrap();
        assert_eq!(image.guide(id).map(Guide::orientation), Some(Orientation::Vertical));
        moved.apply(&mut image, UndoMode::Redo).unwrap();
        assert_eq!(image.guide(id).map(Guide::position), Some(40));
    }
    #[test]
    fn removed_sample_point_comes_back() {
        let mut image = Image::new(10, 10, BaseType::Rgb);
        let point = SamplePoint {
            id: SamplePointID::default(),
            x: 3,
            y: 4,
            pick_mode: PickMode::Hsv,
        };
        image.sample_points.push(point);
        let mut remove = SamplePointUndo::changed(0, &point);
        image.sample_points.clear();

        remove.apply(&mut image, UndoMode::Undo).unwrap();
        assert_eq!(image.sample_point(point.id), Some(&point));
        remove.apply(&mut image, UndoMode::Redo).unwrap();
        assert!(image.sample_points().is_empty());
    }
    #[test]
    fn unknown_guide() {
        let mut image = Image::new(10, 10, BaseType::Rgb);
        let mut undo = GuideUndo::added(GuideID::default());
        assert_eq!(
            undo.apply(&mut image, UndoMode::Undo),
            Err(UndoError::UnknownResource)
        );
    }
    #[test]
    fn removed_guide_keeps_its_place() {
        let mut image = Image::new(10, 10, BaseType::Rgb);
        let guide = |position| Guide {
            id: GuideID::default(),
            orientation: Orientation::Horizontal,
            position,
        };
        image.guides = vec![guide(1), guide(2), guide(3)];
        let before = image.guides.clone();

        let mut remove = GuideUndo::changed(0, &image.guides[0]);
        image.guides.remove(0);
        remove.apply(&mut image, UndoMode::Undo).unwrap();
        assert_eq!(image.guides, before);

        // Removing again on redo remembers the index it was taken from.
        remove.apply(&mut image, UndoMode::Redo).unwrap();
        assert_eq!(image.guides, before[1..]);
        image.guides.push(guide(4));
        remove.apply(&mut image, UndoMode::Undo).unwrap();
        assert_eq!(image.guides[0], before[0]);
        assert_eq!(image.guides.len(), 4);
    }
}
