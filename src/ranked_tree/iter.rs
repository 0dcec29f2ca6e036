use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::iter::FusedIterator;

use crate::comparer::NaturalOrder;
use crate::raw::{Handle, RawTree};

/// An iterator over the elements of a [`RankedTree`](crate::RankedTree).
///
/// This `struct` is created by [`iter`], [`range`] and the other borrowing
/// iteration methods of [`RankedTree`](crate::RankedTree).
///
/// Each step follows the leaf chain, so it is O(1). [`nth`](Iterator::nth) and
/// [`nth_back`](DoubleEndedIterator::nth_back) jump by position instead of
/// stepping, which makes `skip(n)` O(log n).
///
/// # Examples
///
/// ```
/// use ranked_bptree::RankedTree;
///
/// let tree: RankedTree<u32> = (0..1000).map(|k| (k, ())).collect();
/// let mut iter = tree.iter().skip(990);
/// assert_eq!(iter.next(), Some((&990, &())));
/// assert_eq!(iter.len(), 9);
/// ```
///
/// [`iter`]: crate::RankedTree::iter
/// [`range`]: crate::RankedTree::range
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V, C = NaturalOrder> {
    tree: &'a RawTree<K, V, C>,
    front: Option<(Handle, usize)>,
    back: Option<(Handle, usize)>,
    // Unvisited positions are front_rank..back_rank.
    front_rank: usize,
    back_rank: usize,
}

impl<'a, K, V, C> Iter<'a, K, V, C> {
    /// Iterates positions `start..end`.
    pub(crate) fn new(tree: &'a RawTree<K, V, C>, start: usize, end: usize) -> Self {
        let end = end.max(start);
        Iter {
            tree,
            front: if start < end { tree.find_by_index(start) } else { None },
            back: if start < end { tree.find_by_index(end - 1) } else { None },
            front_rank: start,
            back_rank: end,
        }
    }
}

impl<'a, K, V, C> Iterator for Iter<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front_rank >= self.back_rank {
            return None;
        }

        let (handle, offset) = self.front?;
        let tree = self.tree;
        let leaf = tree.leaf(handle);
        self.front_rank += 1;

        // Move to next leaf if needed
        self.front = if offset + 1 < leaf.len() {
            Some((handle, offset + 1))
        } else {
            leaf.next().map(|next| (next, 0))
        };

        Some(leaf.entry(offset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back_rank - self.front_rank;
        (remaining, Some(remaining))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        if n == 0 {
            return self.next();
        }
        if n >= self.len() {
            self.front_rank = self.back_rank;
            return None;
        }

        self.front_rank += n;
        self.front = self.tree.find_by_index(self.front_rank);
        self.next()
    }

    fn count(self) -> usize {
        self.len()
    }

    fn last(mut self) -> Option<Self::Item> {
        self.next_back()
    }
}

impl<K, V, C> DoubleEndedIterator for Iter<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front_rank >= self.back_rank {
            return None;
        }

        let (handle, offset) = self.back?;
        let tree = self.tree;
        let leaf = tree.leaf(handle);
        self.back_rank -= 1;

        self.back = match offset.checked_sub(1) {
            Some(prev) => Some((handle, prev)),
            None => leaf.prev().map(|prev| (prev, tree.leaf(prev).len() - 1)),
        };

        Some(leaf.entry(offset))
    }

    fn nth_back(&mut self, n: usize) -> Option<Self::Item> {
        if n == 0 {
            return self.next_back();
        }
        if n >= self.len() {
            self.back_rank = self.front_rank;
            return None;
        }

        self.back_rank -= n;
        self.back = self.tree.find_by_index(self.back_rank - 1);
        self.next_back()
    }
}

impl<K, V, C> ExactSizeIterator for Iter<'_, K, V, C> {
    fn len(&self) -> usize {
        self.back_rank - self.front_rank
    }
}

impl<K, V, C> FusedIterator for Iter<'_, K, V, C> {}

impl<K, V, C> Clone for Iter<'_, K, V, C> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front: self.front,
            back: self.back,
            front_rank: self.front_rank,
            back_rank: self.back_rank,
        }
    }
}

impl<K, V, C> fmt::Debug for Iter<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("front_rank", &self.front_rank)
            .field("back_rank", &self.back_rank)
            .finish()
    }
}

/// An iterator over the keys of a [`RankedTree`](crate::RankedTree).
///
/// This `struct` is created by [`RankedTree::keys`](crate::RankedTree::keys).
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V, C = NaturalOrder> {
    inner: Iter<'a, K, V, C>,
}

impl<'a, K, V, C> Keys<'a, K, V, C> {
    pub(crate) fn new(inner: Iter<'a, K, V, C>) -> Self {
        Keys {
            inner,
        }
    }
}

impl<'a, K, V, C> Iterator for Keys<'a, K, V, C> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    fn nth(&mut self, n: usize) -> Option<&'a K> {
        self.inner.nth(n).map(|(k, _)| k)
    }
}

impl<K, V, C> DoubleEndedIterator for Keys<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V, C> ExactSizeIterator for Keys<'_, K, V, C> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V, C> FusedIterator for Keys<'_, K, V, C> {}

impl<K, V, C> Clone for Keys<'_, K, V, C> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V, C> fmt::Debug for Keys<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// An iterator over the values of a [`RankedTree`](crate::RankedTree).
///
/// This `struct` is created by [`RankedTree::values`](crate::RankedTree::values).
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V, C = NaturalOrder> {
    inner: Iter<'a, K, V, C>,
}

impl<'a, K, V, C> Values<'a, K, V, C> {
    pub(crate) fn new(inner: Iter<'a, K, V, C>) -> Self {
        Values {
            inner,
        }
    }
}

impl<'a, K, V, C> Iterator for Values<'a, K, V, C> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    fn nth(&mut self, n: usize) -> Option<&'a V> {
        self.inner.nth(n).map(|(_, v)| v)
    }
}

impl<K, V, C> DoubleEndedIterator for Values<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V, C> ExactSizeIterator for Values<'_, K, V, C> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V, C> FusedIterator for Values<'_, K, V, C> {}

impl<K, V, C> Clone for Values<'_, K, V, C> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V: fmt::Debug, C> fmt::Debug for Values<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// An owning iterator over the elements of a [`RankedTree`](crate::RankedTree).
///
/// This `struct` is created by the [`into_iter`](IntoIterator::into_iter)
/// method on [`RankedTree`](crate::RankedTree).
pub struct IntoIter<K, V> {
    inner: vec::IntoIter<(K, V)>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(entries: Vec<(K, V)>) -> Self {
        IntoIter {
            inner: entries.into_iter(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<(K, V)> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IntoIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.as_slice()).finish()
    }
}
