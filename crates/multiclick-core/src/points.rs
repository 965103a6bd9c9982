//! Ordered point store.

use crate::Point;
use serde::{Deserialize, Serialize};

/// Ordered, index-addressed list of capture points.
///
/// Indices stay dense (`0..len`) after every mutation. Playback never walks
/// the live list; it takes a `snapshot` and iterates that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointList {
    points: Vec<Point>,
}

impl PointList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append a point at the end.
    pub fn append(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Remove a set of indices in one update.
    ///
    /// Out-of-range and duplicate indices are ignored, and the order the
    /// indices are supplied in does not matter. Returns how many entries
    /// were removed.
    pub fn remove_at(&mut self, indices: &[usize]) -> usize {
        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&index| index < self.points.len())
            .collect();
        // Highest first, so earlier removals don't shift later ones.
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        for &index in &sorted {
            self.points.remove(index);
        }
        sorted.len()
    }

    /// Swap a point one slot toward the front. No-op at index 0 and out of
    /// range; returns whether a swap happened.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.points.len() {
            return false;
        }
        self.points.swap(index, index - 1);
        true
    }

    /// Swap a point one slot toward the back. No-op on the last entry and
    /// out of range; returns whether a swap happened.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.points.len() {
            return false;
        }
        self.points.swap(index, index + 1);
        true
    }

    /// Drop all points.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Owned copy, detached from later mutation.
    pub fn snapshot(&self) -> Vec<Point> {
        self.points.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(coords: &[(i32, i32)]) -> PointList {
        let mut list = PointList::new();
        for &(x, y) in coords {
            list.append(Point { x, y });
        }
        list
    }

    #[test]
    fn test_append_keeps_order() {
        let list = list(&[(1, 1), (2, 2), (3, 3)]);
        assert_eq!(list.len(), 3);
        assert_eq!(
            list.snapshot(),
            vec![
                Point { x: 1, y: 1 },
                Point { x: 2, y: 2 },
                Point { x: 3, y: 3 }
            ]
        );
    }

    #[test]
    fn test_move_down_swaps_forward() {
        let mut list = list(&[(1, 1), (2, 2), (3, 3)]);
        assert!(list.move_down(0));
        assert_eq!(
            list.snapshot(),
            vec![
                Point { x: 2, y: 2 },
                Point { x: 1, y: 1 },
                Point { x: 3, y: 3 }
            ]
        );
    }

    #[test]
    fn test_move_boundaries_are_noops() {
        let mut list = list(&[(1, 1), (2, 2)]);
        assert!(!list.move_up(0));
        assert!(!list.move_down(1));
        assert!(!list.move_up(7));
        assert!(!list.move_down(7));
        assert_eq!(
            list.snapshot(),
            vec![Point { x: 1, y: 1 }, Point { x: 2, y: 2 }]
        );
    }

    #[test]
    fn test_remove_set_is_dense_afterwards() {
        let mut list = list(&[(1, 1), (2, 2), (3, 3), (4, 4)]);
        assert_eq!(list.remove_at(&[1, 3]), 2);
        assert_eq!(
            list.snapshot(),
            vec![Point { x: 1, y: 1 }, Point { x: 3, y: 3 }]
        );
    }

    #[test]
    fn test_remove_is_order_independent() {
        let mut forward = list(&[(1, 1), (2, 2), (3, 3), (4, 4)]);
        let mut backward = forward.clone();
        forward.remove_at(&[1, 3]);
        backward.remove_at(&[3, 1]);
        assert_eq!(forward.snapshot(), backward.snapshot());
    }

    #[test]
    fn test_remove_ignores_duplicates_and_out_of_range() {
        let mut list = list(&[(1, 1), (2, 2), (3, 3)]);
        assert_eq!(list.remove_at(&[2, 2, 9]), 1);
        assert_eq!(
            list.snapshot(),
            vec![Point { x: 1, y: 1 }, Point { x: 2, y: 2 }]
        );
    }

    #[test]
    fn test_clear_empties_the_list() {
        let mut list = list(&[(1, 1), (2, 2)]);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.remove_at(&[0]), 0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut list = list(&[(1, 1)]);
        let snapshot = list.snapshot();
        list.append(Point { x: 2, y: 2 });
        list.clear();
        assert_eq!(snapshot, vec![Point { x: 1, y: 1 }]);
    }
}
