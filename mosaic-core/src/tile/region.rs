use crate::util::Rect;

/// A set of pixels, stored as disjoint rectangles.
#[derive(Clone, Default, Debug)]
pub struct Region {
    rects: Vec<Rect>,
}
impl Region {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }
    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> u64 {
        self.rects
            .iter()
            .map(|rect| u64::from(rect.width()) * u64::from(rect.height()))
            .sum()
    }
    pub fn add(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.subtract(rect);
        self.rects.push(rect);
    }
    pub fn subtract(&mut self, cut: Rect) {
        if cut.is_empty() {
            return;
        }
        let mut kept = Vec::with_capacity(self.rects.len());
        for rect in self.rects.drain(..) {
            let Some(hole) = rect.intersect(&cut) else {
                kept.push(rect);
                continue;
            };
            // Up to four pieces remain: full-width bands above and below, and the sides of the hole.
            let pieces = [
                Rect::from_corners(rect.x1, rect.y1, rect.x2, hole.y1),
                Rect::from_corners(rect.x1, hole.y2, rect.x2, rect.y2),
                Rect::from_corners(rect.x1, hole.y1, hole.x1, hole.y2),
                Rect::from_corners(hole.x2, hole.y1, rect.x2, hole.y2),
            ];
            kept.extend(pieces.into_iter().filter(|piece| !piece.is_empty()));
        }
        self.rects = kept;
    }
    #[must_use]
    pub fn intersects(&self, rect: Rect) -> bool {
        self.rects.iter().any(|r| r.intersect(&rect).is_some())
    }
    /// The parts of this region within `rect`.
    #[must_use]
    pub fn intersections(&self, rect: Rect) -> Vec<Rect> {
        self.rects.iter().filter_map(|r| r.intersect(&rect)).collect()
    }
    pub fn clear(&mut self) {
        self.rects.clear();
    }
}
