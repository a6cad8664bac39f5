use super::BoundSeg;

type Point = (i32, i32);

/// Segments reordered into chains, each chain continuing where the previous segment ended.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct SortedBoundary {
    segs: Vec<BoundSeg>,
    /// Range of `segs` covered by each group, in order and without gaps.
    groups: Vec<std::ops::Range<usize>>,
}
impl SortedBoundary {
    #[must_use]
    pub fn segs(&self) -> &[BoundSeg] {
        &self.segs
    }
    #[must_use]
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }
    /// The segments of a single group, or `None` if out of range.
    #[must_use]
    pub fn group(&self, group: usize) -> Option<&[BoundSeg]> {
        self.groups.get(group).map(|range| &self.segs[range.clone()])
    }
    pub fn groups(&self) -> impl ExactSizeIterator<Item = &[BoundSeg]> + '_ {
        self.groups.iter().map(|range| &self.segs[range.clone()])
    }
    /// Whether the group returns to where it started.
    /// Groups clipped by [`super::BoundaryType::WithinBounds`] may be open chains.
    #[must_use]
    pub fn is_closed(&self, group: usize) -> bool {
        self.group(group).is_some_and(chain_closed)
    }
    /// Signed shoelace area of a group, positive for filled areas.
    /// Open chains are implicitly closed by a straight line from their end back to their start.
    #[must_use]
    pub fn group_area(&self, group: usize) -> f64 {
        self.group(group).map_or(0.0, chain_area)
    }
    /// Sum of the signed areas of every group.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.groups().map(chain_area).sum()
    }
    /// Bounding box of every segment, or `None` if there are none.
    #[must_use]
    pub fn bounds(&self) -> Option<crate::util::Rect> {
        let first = self.segs.first()?;
        let init = crate::util::Rect::from_corners(first.x1, first.y1, first.x1, first.y1);
        Some(self.segs.iter().fold(init, |rect, seg| crate::util::Rect {
            x1: rect.x1.min(seg.x1).min(seg.x2),
            y1: rect.y1.min(seg.y1).min(seg.y2),
            x2: rect.x2.max(seg.x1).max(seg.x2),
            y2: rect.y2.max(seg.y1).max(seg.y2),
        }))
    }
    /// Translate every segment in place.
    pub fn offset(&mut self, dx: i32, dy: i32) {
        super::offset(&mut self.segs, dx, dy);
    }
}

fn chain_closed(chain: &[BoundSeg]) -> bool {
    match (chain.first(), chain.last()) {
        (Some(first), Some(last)) => first.start() == last.end(),
        _ => false,
    }
}
fn chain_area(chain: &[BoundSeg]) -> f64 {
    let (Some(first), Some(last)) = (chain.first(), chain.last()) else {
        return 0.0;
    };
    let closing = BoundSeg::new(last.x2, last.y2, first.x1, first.y1, false);
    let twice: i64 = chain.iter().map(BoundSeg::cross).sum::<i64>() + closing.cross();
    twice as f64 / 2.0
}

/// Order in which outgoing directions are preferred after arriving with direction `(dx, dy)`.
/// Straight on, then turning toward the inside, then away from it.
fn preference(arriving: Point, leaving: Point) -> u8 {
    let (dx, dy) = arriving;
    if leaving == (dx, dy) {
        0
    } else if leaving == (-dy, dx) {
        1
    } else if leaving == (dy, -dx) {
        2
    } else {
        3
    }
}

/// Chain segments end-to-start into groups.
///
/// Chains with a free start are followed first, so that open chains come out whole, then closed loops.
/// At junctions the straightest continuation is taken, turning toward the inside when there is none,
/// which keeps diagonally touching pixels in separate loops. The input is not modified.
#[must_use]
pub fn sort(segs: &[BoundSeg]) -> SortedBoundary {
    let mut starts = hashbrown::HashMap::<Point, smallvec::SmallVec<[usize; 2]>>::with_capacity(segs.len());
    let mut ends = hashbrown::HashSet::<Point>::with_capacity(segs.len());
    for (idx, seg) in segs.iter().enumerate() {
        starts.entry(seg.start()).or_default().push(idx);
        ends.insert(seg.end());
    }

    let mut work: Vec<BoundSeg> = segs
        .iter()
        .map(|seg| BoundSeg {
            visited: false,
            ..*seg
        })
        .collect();
    let mut sorted = SortedBoundary {
        segs: Vec::with_capacity(segs.len()),
        groups: Vec::new(),
    };

    let heads = (0..segs.len()).filter(|&idx| !ends.contains(&segs[idx].start()));
    let order: Vec<usize> = heads.chain(0..segs.len()).collect();
    for first in order {
        if work[first].visited {
            continue;
        }
        let group_start = sorted.segs.len();
        let mut cur = first;
        loop {
            work[cur].visited = true;
            sorted.segs.push(BoundSeg {
                visited: false,
                ..work[cur]
            });
            let arriving = work[cur].direction();
            let Some(candidates) = starts.get(&work[cur].end()) else {
                break;
            };
            let next = candidates
                .iter()
                .copied()
                .filter(|&idx| idx == first || !work[idx].visited)
                .min_by_key(|&idx| preference(arriving, work[idx].direction()));
            match next {
                Some(next) if next != first => cur = next,
                // Closed the loop, or nowhere left to go.
                _ => break,
            }
        }
        sorted.groups.push(group_start..sorted.segs.len());
    }

    log::trace!(
        "Sorted {} segments into {} groups",
        sorted.segs.len(),
        sorted.groups.len()
    );
    sorted
}

/// Merge consecutive collinear segments of every group, preserving geometry and area.
#[must_use]
pub fn simplify(sorted: &SortedBoundary) -> SortedBoundary {
    let mut simplified = SortedBoundary {
        segs: Vec::with_capacity(sorted.segs.len()),
        groups: Vec::with_capacity(sorted.groups.len()),
    };
    for chain in sorted.groups() {
        let group_start = simplified.segs.len();
        for seg in chain {
            match simplified.segs[group_start..].last_mut() {
                Some(last) if last.direction() == seg.direction() && last.end() == seg.start() => {
                    last.x2 = seg.x2;
                    last.y2 = seg.y2;
                }
                _ => simplified.segs.push(*seg),
            }
        }
        // A closed loop may start in the middle of a straight run.
        if chain_closed(chain) && simplified.segs.len() - group_start > 1 {
            let first = simplified.segs[group_start];
            let last = simplified.segs[simplified.segs.len() - 1];
            if first.direction() == last.direction() {
                simplified.segs.pop();
                let first = &mut simplified.segs[group_start];
                first.x1 = last.x1;
                first.y1 = last.y1;
            }
        }
        simplified.groups.push(group_start..simplified.segs.len());
    }
    simplified
}

#[cfg(test)]
mod test {
    use super::{simplify, sort};
    use crate::boundary::{trace, BoundSeg, BoundaryType, TraceFormat, DEFAULT_THRESHOLD};
    use crate::buffer::{PixelBuffer, PixelFormat};
    use crate::util::Rect;

    /// Deterministic noise, so failures reproduce.
    fn noise_mask(seed: u32, size: u32, border: bool) -> PixelBuffer {
        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
        let last = size as i32 - 1;
        PixelBuffer::from_fn(Rect::from_size(0, 0, size, size), PixelFormat::MASK_U8, |x, y| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let edge = x == 0 || y == 0 || x == last || y == last;
            if border && edge {
                0.0
            } else if state % 3 == 0 {
                1.0
            } else {
                0.0
            }
        })
    }
    fn trace_noise(buffer: &PixelBuffer, bound_type: BoundaryType) -> Vec<BoundSeg> {
        trace(
            buffer,
            Rect::from_size(0, 0, 32, 32),
            TraceFormat::Luminance,
            bound_type,
            DEFAULT_THRESHOLD,
        )
    }

    #[test]
    fn sort_keeps_every_segment() {
        for seed in 0..8 {
            let segs = trace_noise(&noise_mask(seed, 24, false), BoundaryType::WithinBounds);
            let sorted = sort(&segs);
            assert_eq!(sorted.segs().len(), segs.len());
            let mut a = segs.clone();
            let mut b = sorted.segs().to_vec();
            a.sort_by_key(|s| (s.x1, s.y1, s.x2, s.y2));
            b.sort_by_key(|s| (s.x1, s.y1, s.x2, s.y2));
            assert_eq!(a, b);
        }
    }
    #[test]
    fn groups_are_chains() {
        for seed in 0..8 {
            let segs = trace_noise(&noise_mask(seed, 24, false), BoundaryType::WithinBounds);
            let sorted = sort(&segs);
            for chain in sorted.groups() {
                for pair in chain.windows(2) {
                    assert_eq!(pair[0].end(), pair[1].start());
                }
            }
        }
    }
    #[test]
    fn closed_area_counts_pixels() {
        for seed in 0..8 {
            let buffer = noise_mask(seed, 20, true);
            let inside = buffer.data().iter().filter(|&&v| v == 255).count();
            let sorted = sort(&trace_noise(&buffer, BoundaryType::IgnoreBounds));
            assert!((0..sorted.n_groups()).all(|group| sorted.is_closed(group)));
            assert_eq!(sorted.area(), inside as f64);
        }
    }
    #[test]
    fn simplify_preserves_area() {
        for seed in 0..16 {
            for bound_type in [BoundaryType::WithinBounds, BoundaryType::IgnoreBounds] {
                let segs = trace_noise(&noise_mask(seed, 24, seed % 2 == 0), bound_type);
                let sorted = sort(&segs);
                let simplified = simplify(&sorted);
                assert_eq!(simplified.n_groups(), sorted.n_groups());
                assert!(simplified.segs().len() <= sorted.segs().len());
                for group in 0..sorted.n_groups() {
                    assert_eq!(simplified.group_area(group), sorted.group_area(group));
                    assert_eq!(simplified.is_closed(group), sorted.is_closed(group));
                }
            }
        }
    }
    #[test]
    fn diagonal_pixels_stay_separate() {
        // Checkerboard corners touching at (1, 1).
        let buffer = PixelBuffer::from_fn(Rect::from_size(0, 0, 2, 2), PixelFormat::MASK_U8, |x, y| {
            if x == y {
                1.0
            } else {
                0.0
            }
        });
        let sorted = sort(&trace_noise(&buffer, BoundaryType::WithinBounds));
        // Clipped to the region, only the four inner edges remain, as two open corners.
        assert_eq!(sorted.n_groups(), 2);
        assert_eq!(sorted.segs().len(), 4);
        for chain in sorted.groups() {
            assert_eq!(chain.len(), 2);
        }
    }
    #[test]
    fn simplify_square() {
        // A 3x3 block: two runs and six unit edges become four sides.
        let buffer = PixelBuffer::from_fn(Rect::from_size(0, 0, 5, 5), PixelFormat::MASK_U8, |x, y| {
            if (1..4).contains(&x) && (1..4).contains(&y) {
                1.0
            } else {
                0.0
            }
        });
        let sorted = sort(&trace_noise(&buffer, BoundaryType::IgnoreBounds));
        let simplified = simplify(&sorted);
        assert_eq!(simplified.n_groups(), 1);
        assert_eq!(simplified.segs().len(), 4);
        assert_eq!(simplified.area(), 9.0);
        assert_eq!(simplified.bounds(), Some(Rect::from_corners(1, 1, 4, 4)));
    }
    #[test]
    fn empty_input() {
        let sorted = sort(&[]);
        assert!(sorted.is_empty());
        assert_eq!(sorted.n_groups(), 0);
        assert_eq!(simplify(&sorted), sorted);
        assert_eq!(sorted.bounds(), None);
    }
}
