use core::ops::{Index, IndexMut};

use super::RankedTree;
use crate::Rank;
use crate::comparer::Comparer;
use crate::error::{Error, Result};
use crate::raw::Edge;

impl<K, V, C> RankedTree<K, V, C> {
    /// Returns the element at position `index` in sorted order.
    ///
    /// Returns `None` if `index` is out of bounds.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let tree = RankedTree::from([("a", 10), ("c", 30), ("b", 20)]);
    /// assert_eq!(tree.get_by_index(1), Some((&"b", &20)));
    /// assert!(tree.get_by_index(3).is_none());
    /// ```
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<(&K, &V)> {
        self.raw.get_by_index(index)
    }

    /// Returns the key and a mutable reference to the value at position `index`.
    ///
    /// Counts as a mutation when `index` is in bounds. The key is returned as a
    /// shared reference because changing it could break the ordering.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let mut tree = RankedTree::from([(10, "a"), (5, "b")]);
    /// if let Some((key, value)) = tree.get_by_index_mut(0) {
    ///     assert_eq!(*key, 5);
    ///     *value = "updated";
    /// }
    /// assert_eq!(tree.get(&5), Some(&"updated"));
    /// ```
    #[must_use]
    pub fn get_by_index_mut(&mut self, index: usize) -> Option<(&K, &mut V)> {
        self.raw.get_by_index_mut(index)
    }

    /// Returns the element at position `index`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `index >= len()`.
    pub fn element_at(&self, index: usize) -> Result<(&K, &V)> {
        self.get_by_index(index)
            .ok_or(Error::invalid_argument("index", "must be less than the element count"))
    }

    /// Returns the position of the first element whose value equals `value`.
    ///
    /// Values are not indexed, so this walks the leaves: O(n).
    pub fn index_of_value(&self, value: &V) -> Option<usize>
    where
        V: PartialEq,
    {
        self.raw.index_of_value(value)
    }
}

impl<K: Clone, V, C: Comparer<K>> RankedTree<K, V, C> {
    /// Returns the position of the first element with key `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let mut tree = RankedTree::new();
    /// for key in [4, 2, 2, 9, 2] {
    ///     tree.add(key);
    /// }
    /// assert_eq!(tree.first_index_of(&2), Some(0));
    /// assert_eq!(tree.last_index_of(&2), Some(2));
    /// assert_eq!(tree.count_of(&2), 3);
    /// assert_eq!(tree.first_index_of(&5), None);
    /// ```
    pub fn first_index_of(&self, key: &K) -> Option<usize> {
        let position = self.raw.try_find(key, Edge::Left);
        position.found.then_some(position.rank)
    }

    /// Returns the position of the last element with key `key`.
    pub fn last_index_of(&self, key: &K) -> Option<usize> {
        let position = self.raw.try_find(key, Edge::Right);
        position.found.then_some(position.rank)
    }

    /// Returns how many elements have key `key`.
    ///
    /// # Complexity
    ///
    /// O(log n), whatever the count.
    pub fn count_of(&self, key: &K) -> usize {
        self.raw.bound_rank(key, Edge::Right) - self.raw.bound_rank(key, Edge::Left)
    }
}

/// Indexes into the tree by position.
///
/// # Panics
///
/// Panics if `rank` is out of bounds.
impl<K, V, C> Index<Rank> for RankedTree<K, V, C> {
    type Output = V;

    fn index(&self, rank: Rank) -> &Self::Output {
        self.get_by_index(rank.0).map(|(_, v)| v).expect("index out of bounds")
    }
}

/// Mutably indexes into the tree by position. Counts as a mutation.
///
/// # Panics
///
/// Panics if `rank` is out of bounds.
///
/// # Examples
///
/// ```
/// use ranked_bptree::{RankedTree, Rank};
///
/// let mut tree = RankedTree::from([(1, 10), (2, 20)]);
/// tree[Rank(1)] += 5;
/// assert_eq!(tree.get(&2), Some(&25));
/// ```
impl<K, V, C> IndexMut<Rank> for RankedTree<K, V, C> {
    fn index_mut(&mut self, rank: Rank) -> &mut Self::Output {
        self.get_by_index_mut(rank.0).map(|(_, v)| v).expect("index out of bounds")
    }
}
