use core::fmt;
use core::ops::{Bound, RangeBounds};

use crate::comparer::{Comparer, NaturalOrder};
use crate::error::{Error, Result};
use crate::raw::{DEFAULT_ORDER, Edge, MAX_ORDER, MIN_ORDER, RawTree};

mod diagnostics;
mod enumerator;
mod iter;
mod neighbors;
mod order_statistic;

pub use diagnostics::LevelStats;
pub use enumerator::Enumerator;
pub use iter::{IntoIter, Iter, Keys, Values};

/// An ordered, position-indexable collection built on a B+ tree.
///
/// Elements are `(key, value)` pairs kept in the order given by the tree's
/// [`Comparer`]. Equal keys are allowed and keep their insertion order, so the
/// tree serves as a multimap, or as a bag when `V` is `()`. Every branch caches
/// the number of elements below it, which makes access by position
/// ([`get_by_index`](Self::get_by_index), [`remove_at`](Self::remove_at),
/// [`Rank`](crate::Rank) indexing) logarithmic.
///
/// The *order* fixes the node capacity for the lifetime of the tree: a branch
/// has at most `order` children and any node at most `order - 1` keys.
///
/// Every mutation, including handing out a mutable reference to a value,
/// advances the tree's [`stage`](Self::stage). Borrowing iterators cannot
/// outlive a mutation at all; detached [`Enumerator`]s check the stage on every
/// step and fail with [`Error::ConcurrentModification`] once it moves.
///
/// It is a logic error for a key to be modified in such a way that its
/// ordering relative to other keys changes while it is in the tree. The
/// behavior resulting from such a logic error is not specified, but will not
/// result in undefined behavior.
///
/// # Examples
///
/// ```
/// use ranked_bptree::RankedTree;
///
/// let mut scores = RankedTree::new();
/// scores.insert(85, "Bob");
/// scores.insert(92, "Carol");
/// scores.insert(85, "Dave");
///
/// assert_eq!(scores.len(), 3);
/// assert_eq!(scores.count_of(&85), 2);
/// assert_eq!(scores.get_by_index(1), Some((&85, &"Dave")));
/// assert_eq!(scores.find(&92), Ok(2));
/// ```
#[derive(Clone)]
pub struct RankedTree<K, V = (), C = NaturalOrder> {
    raw: RawTree<K, V, C>,
}

/// Outcome of an insertion.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Insertion {
    /// Sorted position of the inserted element, or of the existing element
    /// when [`insert_unique`](RankedTree::insert_unique) declined to insert.
    pub index: usize,
    /// Whether no equal key was present beforehand.
    pub is_new_key: bool,
}

fn validate_order(order: usize) -> Result<()> {
    if (MIN_ORDER..=MAX_ORDER).contains(&order) {
        Ok(())
    } else {
        Err(Error::invalid_argument("order", "must be between 4 and 256"))
    }
}

/// Turns key bounds into the half-open rank window they select.
fn rank_window<K, V, C>(raw: &RawTree<K, V, C>, lower: Bound<&K>, upper: Bound<&K>) -> (usize, usize)
where
    K: Clone,
    C: Comparer<K>,
{
    let start = match lower {
        Bound::Included(key) => raw.bound_rank(key, Edge::Left),
        Bound::Excluded(key) => raw.bound_rank(key, Edge::Right),
        Bound::Unbounded => 0,
    };
    let end = match upper {
        Bound::Included(key) => raw.bound_rank(key, Edge::Right),
        Bound::Excluded(key) => raw.bound_rank(key, Edge::Left),
        Bound::Unbounded => raw.len(),
    };
    (start, end.max(start))
}

impl<K, V> RankedTree<K, V> {
    /// Makes a new, empty tree ordered by `K`'s [`Ord`] implementation.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let mut tree = RankedTree::new();
    /// tree.insert(1, "a");
    /// assert_eq!(tree.order(), 128);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparer(NaturalOrder)
    }

    /// Makes a new, empty tree with the given order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `order` is outside `4..=256`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::{Error, RankedTree};
    ///
    /// let tree: RankedTree<i32> = RankedTree::with_order(16)?;
    /// assert_eq!(tree.order(), 16);
    /// assert!(matches!(RankedTree::<i32>::with_order(3), Err(Error::InvalidArgument { .. })));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn with_order(order: usize) -> Result<Self> {
        Self::with_order_and_comparer(order, NaturalOrder)
    }
}

impl<K, V, C> RankedTree<K, V, C> {
    /// Makes a new, empty tree ordered by `comparer`.
    #[must_use]
    pub fn with_comparer(comparer: C) -> Self {
        RankedTree {
            raw: RawTree::new(DEFAULT_ORDER, comparer),
        }
    }

    /// Makes a new, empty tree with the given order, ordered by `comparer`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `order` is outside `4..=256`.
    pub fn with_order_and_comparer(order: usize, comparer: C) -> Result<Self> {
        validate_order(order)?;
        Ok(RankedTree {
            raw: RawTree::new(order, comparer),
        })
    }

    /// Returns the comparer that orders this tree.
    pub fn comparer(&self) -> &C {
        self.raw.comparer()
    }

    /// Returns the number of elements in the tree.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every element, leaving a single empty leaf.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns the first element in sorted order.
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.raw.first()
    }

    /// Returns the last element in sorted order.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.raw.last()
    }

    /// Gets an iterator over the elements in sorted order.
    ///
    /// The iterator is double-ended and exact-size; [`Iterator::nth`] and
    /// therefore [`Iterator::skip`] jump by position in O(log n).
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let tree = RankedTree::from([(3, 'c'), (1, 'a'), (2, 'b')]);
    /// let mut iter = tree.iter();
    /// assert_eq!(iter.next(), Some((&1, &'a')));
    /// assert_eq!(iter.next_back(), Some((&3, &'c')));
    /// assert_eq!(iter.next(), Some((&2, &'b')));
    /// assert_eq!(iter.next(), None);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter::new(&self.raw, 0, self.len())
    }

    /// Gets an iterator over the keys in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V, C> {
        Keys::new(self.iter())
    }

    /// Gets an iterator over the values, ordered by their keys.
    pub fn values(&self) -> Values<'_, K, V, C> {
        Values::new(self.iter())
    }
}

impl<K: Clone, V, C: Comparer<K>> RankedTree<K, V, C> {
    /// Inserts an element after every element with an equal key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::{Insertion, RankedTree};
    ///
    /// let mut tree = RankedTree::new();
    /// assert_eq!(tree.insert(5, "first"), Insertion { index: 0, is_new_key: true });
    /// assert_eq!(tree.insert(5, "second"), Insertion { index: 1, is_new_key: false });
    /// assert_eq!(tree.values().copied().collect::<Vec<_>>(), ["first", "second"]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert(&mut self, key: K, value: V) -> Insertion {
        let (index, is_new_key) = self.raw.insert(key, value);
        Insertion {
            index,
            is_new_key,
        }
    }

    /// Inserts an element unless an equal key is already present.
    ///
    /// When the key exists nothing changes, not even the stage, and the
    /// returned index is that of the existing element.
    pub fn insert_unique(&mut self, key: K, value: V) -> Insertion {
        let (index, is_new_key) = self.raw.insert_unique(key, value);
        Insertion {
            index,
            is_new_key,
        }
    }

    /// Sets the value of the first element with key `key`, returning the old
    /// value, or inserts a new element if there is none.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let mut tree = RankedTree::new();
    /// assert_eq!(tree.replace(37, "a"), None);
    /// assert_eq!(tree.replace(37, "b"), Some("a"));
    /// assert_eq!(tree.len(), 1);
    /// ```
    pub fn replace(&mut self, key: K, value: V) -> Option<V> {
        self.raw.replace(key, value)
    }

    /// Removes the first element with key `key`.
    ///
    /// A missing key leaves the tree and its stage untouched.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn remove(&mut self, key: &K) -> Option<(K, V)> {
        self.raw.remove(key)
    }

    /// Removes every element with key `key`, returning how many there were.
    pub fn remove_all(&mut self, key: &K) -> usize {
        self.raw.remove_all(key)
    }

    /// Removes the element at position `index`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `index >= len()`.
    pub fn remove_at(&mut self, index: usize) -> Result<(K, V)> {
        self.raw
            .remove_at(index)
            .ok_or(Error::invalid_argument("index", "must be less than the element count"))
    }

    /// Removes `count` consecutive elements starting at position `index`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `index > len()` or the range runs past the
    /// end. Nothing is removed in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let mut tree: RankedTree<i32> = (0..10).map(|k| (k, ())).collect();
    /// tree.remove_range(2, 5)?;
    /// assert_eq!(tree.keys().copied().collect::<Vec<_>>(), [0, 1, 7, 8, 9]);
    /// assert!(tree.remove_range(4, 2).is_err());
    /// # Ok::<(), ranked_bptree::Error>(())
    /// ```
    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<()> {
        let len = self.len();
        if index > len {
            return Err(Error::invalid_argument("index", "must not exceed the element count"));
        }
        if count > len - index {
            return Err(Error::invalid_argument("count", "range runs past the last element"));
        }
        self.raw.remove_range(index, count);
        Ok(())
    }

    /// Removes every element `predicate` selects, returning how many went.
    ///
    /// The stage only advances when something is removed.
    pub fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.raw.remove_where(predicate)
    }

    /// Retains only the elements `keep` accepts, visiting them in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let mut tree: RankedTree<i32, i32> = (0..8).map(|k| (k, k * 10)).collect();
    /// tree.retain(|&k, v| {
    ///     *v += 1;
    ///     k % 2 == 0
    /// });
    /// assert_eq!(tree.values().copied().collect::<Vec<_>>(), [1, 21, 41, 61]);
    /// ```
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.raw.retain(keep);
    }

    /// Removes and returns the first element in sorted order.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.raw.pop_first()
    }

    /// Removes and returns the last element in sorted order.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.raw.pop_last()
    }

    /// Searches for `key`.
    ///
    /// Returns `Ok` with the position of its first occurrence, or `Err` with
    /// the position where it would be inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let tree: RankedTree<i32> = [(10, ()), (20, ()), (20, ()), (30, ())].into();
    /// assert_eq!(tree.find(&20), Ok(1));
    /// assert_eq!(tree.find(&25), Err(3));
    /// assert_eq!(tree.find(&5), Err(0));
    /// ```
    pub fn find(&self, key: &K) -> core::result::Result<usize, usize> {
        let position = self.raw.try_find(key, Edge::Left);
        if position.found {
            Ok(position.rank)
        } else {
            Err(position.rank)
        }
    }

    /// Returns `true` if the tree holds an element with key `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.raw.get(key).is_some()
    }

    /// Returns the value of the first element with key `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.raw.get(key).map(|(_, value)| value)
    }

    /// Returns the stored key and value of the first element with key `key`.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.raw.get(key)
    }

    /// Returns a mutable reference to the value of the first element with key
    /// `key`. Counts as a mutation when the key is present.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.raw.get_mut(key).map(|(_, value)| value)
    }

    /// Returns the value of the first element with key `key`.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] if no element has that key.
    pub fn value_of(&self, key: &K) -> Result<&V> {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Gets an iterator over the elements whose keys fall in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range starts after it ends, or if both ends are excluded
    /// and equal.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let tree: RankedTree<i32> = (0..20).map(|k| (k, ())).collect();
    /// let keys: Vec<_> = tree.range(5..9).map(|(k, _)| *k).collect();
    /// assert_eq!(keys, [5, 6, 7, 8]);
    /// assert_eq!(tree.range(..=2).count(), 3);
    /// ```
    pub fn range<R>(&self, range: R) -> Iter<'_, K, V, C>
    where
        R: RangeBounds<K>,
    {
        self.validate_range_bounds(&range);
        let (start, end) = rank_window(&self.raw, range.start_bound(), range.end_bound());
        Iter::new(&self.raw, start, end)
    }

    /// Gets an iterator over the elements with keys in `lower..=upper`.
    ///
    /// Empty when `lower` orders after `upper`.
    pub fn elements_between(&self, lower: &K, upper: &K) -> Iter<'_, K, V, C> {
        let (start, end) = rank_window(&self.raw, Bound::Included(lower), Bound::Included(upper));
        Iter::new(&self.raw, start, end)
    }

    /// Gets an iterator over the elements with keys at or after `lower`.
    pub fn elements_from(&self, lower: &K) -> Iter<'_, K, V, C> {
        let (start, end) = rank_window(&self.raw, Bound::Included(lower), Bound::Unbounded);
        Iter::new(&self.raw, start, end)
    }

    fn validate_range_bounds<R: RangeBounds<K>>(&self, range: &R) {
        if let (Bound::Included(start) | Bound::Excluded(start), Bound::Included(end) | Bound::Excluded(end)) =
            (range.start_bound(), range.end_bound())
        {
            let ordering = self.comparer().compare(start, end);
            let valid =
                if matches!(range.start_bound(), Bound::Excluded(_)) && matches!(range.end_bound(), Bound::Excluded(_)) {
                    ordering.is_lt()
                } else {
                    ordering.is_le()
                };
            assert!(valid, "range start is greater than range end in RankedTree");
        }
    }
}

impl<K: Clone, C: Comparer<K>> RankedTree<K, (), C> {
    /// Adds a key to a key-only tree, after any equal keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let mut bag = RankedTree::new();
    /// bag.add("pear");
    /// bag.add("apple");
    /// bag.add("pear");
    /// assert_eq!(bag.keys().copied().collect::<Vec<_>>(), ["apple", "pear", "pear"]);
    /// ```
    pub fn add(&mut self, key: K) -> Insertion {
        self.insert(key, ())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for RankedTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C: Default> Default for RankedTree<K, V, C> {
    fn default() -> Self {
        Self::with_comparer(C::default())
    }
}

impl<K: PartialEq, V: PartialEq, C> PartialEq for RankedTree<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C> Eq for RankedTree<K, V, C> {}

impl<K: Clone + Ord, V> FromIterator<(K, V)> for RankedTree<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut tree = RankedTree::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Clone, V, C: Comparer<K>> Extend<(K, V)> for RankedTree<K, V, C> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Clone + Ord, V, const N: usize> From<[(K, V); N]> for RankedTree<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<'a, K, V, C> IntoIterator for &'a RankedTree<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, C>;

    fn into_iter(self) -> Iter<'a, K, V, C> {
        self.iter()
    }
}

impl<K, V, C> IntoIterator for RankedTree<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Gets an owning iterator over the elements in sorted order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let tree = RankedTree::from([(2, "b"), (1, "a")]);
    /// let mut iter = tree.into_iter();
    /// assert_eq!(iter.next(), Some((1, "a")));
    /// assert_eq!(iter.next_back(), Some((2, "b")));
    /// ```
    fn into_iter(mut self) -> IntoIter<K, V> {
        IntoIter::new(self.raw.drain())
    }
}
