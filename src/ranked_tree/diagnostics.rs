use alloc::vec::Vec;

use super::RankedTree;
use crate::comparer::Comparer;
use crate::error::Result;

/// Occupancy of one level of the tree, as reported by
/// [`RankedTree::statistics`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelStats {
    /// Distance from the root; the root is level 0 and the leaves are last.
    pub level: usize,
    /// Nodes on this level.
    pub node_count: usize,
    /// Keys held on this level: elements for leaves, pivots for branches.
    pub key_count: usize,
    /// Keys the level could hold at its current node count.
    pub capacity: usize,
    /// `key_count` as a percentage of `capacity`.
    pub fill_percent: f64,
}

impl LevelStats {
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn new(level: usize, node_count: usize, key_count: usize, capacity: usize) -> Self {
        let fill_percent = if capacity == 0 {
            0.0
        } else {
            key_count as f64 * 100.0 / capacity as f64
        };
        LevelStats {
            level,
            node_count,
            key_count,
            capacity,
            fill_percent,
        }
    }
}

impl<K, V, C> RankedTree<K, V, C> {
    /// Returns the number of levels; an empty tree has height 1.
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Returns the order the tree was built with.
    #[must_use]
    pub fn order(&self) -> usize {
        self.raw.order()
    }

    /// Returns the modification stage.
    ///
    /// The stage changes on every mutation and on every handout of a mutable
    /// value reference. Two reads that return the same stage saw the same tree.
    #[must_use]
    pub fn stage(&self) -> u64 {
        self.raw.stage()
    }

    /// Reports node and key counts for every level, root first.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let mut tree = RankedTree::with_order(4)?;
    /// for key in (2..=24).step_by(2) {
    ///     tree.add(key);
    /// }
    ///
    /// let stats = tree.statistics();
    /// assert_eq!(stats.len(), 2);
    /// assert_eq!(stats[1].node_count, 4);
    /// assert_eq!(stats[1].fill_percent, 100.0);
    /// # Ok::<(), ranked_bptree::Error>(())
    /// ```
    #[must_use]
    pub fn statistics(&self) -> Vec<LevelStats> {
        self.raw.statistics()
    }
}

impl<K, V, C: Comparer<K>> RankedTree<K, V, C> {
    /// Walks the whole tree and verifies its structural invariants: weights,
    /// pivots, key order, fill bounds, leaf depth and the leaf chain.
    ///
    /// Meant for tests and debugging; a correct build never fails it.
    ///
    /// # Errors
    ///
    /// [`Error::StructuralInvariantViolation`](crate::Error::StructuralInvariantViolation)
    /// listing every violation found.
    pub fn sanity_check(&self) -> Result<()> {
        self.raw.sanity_check()
    }
}
