use core::fmt;
use core::marker::PhantomData;
use core::ops::Bound;

use super::{RankedTree, rank_window};
use crate::comparer::{Comparer, NaturalOrder};
use crate::error::{Error, Result};
use crate::raw::{Handle, RawTree};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Direction {
    Forward,
    Reverse,
}

/// A cursor over a [`RankedTree`] that does not borrow it.
///
/// An `Enumerator` remembers the tree's [`stage`](RankedTree::stage) when it
/// is created or [`reset`](Self::reset). Each step is handed the tree and first
/// checks that the stage has not moved; if the tree was modified in between,
/// the step fails with [`Error::ConcurrentModification`] instead of yielding
/// elements from a tree that changed underneath it.
///
/// Stepping an enumerator with any tree other than the one that created it,
/// a clone included, fails the same way.
///
/// # Examples
///
/// ```
/// use ranked_bptree::{Error, RankedTree};
///
/// let mut tree: RankedTree<i32> = (0..10).map(|k| (k, ())).collect();
/// let mut cursor = tree.enumerate();
///
/// assert_eq!(cursor.move_next(&tree)?, Some((&0, &())));
/// cursor.skip(&tree, 5)?;
/// assert_eq!(cursor.move_next(&tree)?, Some((&6, &())));
///
/// tree.remove(&9);
/// assert_eq!(cursor.move_next(&tree), Err(Error::ConcurrentModification));
///
/// cursor.reset(&tree);
/// assert_eq!(cursor.move_next(&tree)?, Some((&0, &())));
/// # Ok::<(), Error>(())
/// ```
pub struct Enumerator<K, V, C = NaturalOrder> {
    direction: Direction,
    lower: Bound<K>,
    upper: Bound<K>,
    // Window of positions selected by the bounds.
    start: usize,
    end: usize,
    // Forward: the next position to yield. Reverse: one past it.
    position: usize,
    // Leaf and offset of the next element; located lazily after a jump.
    cursor: Option<(Handle, usize)>,
    tree_id: usize,
    stage: u64,
    marker: PhantomData<fn() -> (V, C)>,
}

impl<K, V, C> Enumerator<K, V, C> {
    fn new(tree: &RawTree<K, V, C>, direction: Direction, lower: Bound<K>, upper: Bound<K>, window: (usize, usize)) -> Self {
        let (start, end) = window;
        Enumerator {
            direction,
            lower,
            upper,
            start,
            end,
            position: match direction {
                Direction::Forward => start,
                Direction::Reverse => end,
            },
            cursor: None,
            tree_id: tree.id(),
            stage: tree.stage(),
            marker: PhantomData,
        }
    }

    /// Number of elements left to yield, assuming the tree is unchanged.
    #[must_use]
    pub fn remaining(&self) -> usize {
        match self.direction {
            Direction::Forward => self.end - self.position,
            Direction::Reverse => self.position - self.start,
        }
    }

    /// Returns `true` once `tree` has been modified since this enumerator last
    /// synchronized with it, or if `tree` is not the tree it synchronized with.
    #[must_use]
    pub fn is_stale(&self, tree: &RankedTree<K, V, C>) -> bool {
        tree.raw.id() != self.tree_id || tree.raw.stage() != self.stage
    }

    fn check(&self, tree: &RawTree<K, V, C>) -> Result<()> {
        if tree.id() == self.tree_id && tree.stage() == self.stage {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            expected = self.stage,
            actual = tree.stage(),
            same_tree = tree.id() == self.tree_id,
            "enumerator: tree modified since last sync"
        );

        Err(Error::ConcurrentModification)
    }

    /// Leaf and offset of the next element, without consuming it.
    fn peek(&mut self, tree: &RawTree<K, V, C>) -> Option<(Handle, usize)> {
        let index = match self.direction {
            Direction::Forward if self.position < self.end => self.position,
            Direction::Reverse if self.position > self.start => self.position - 1,
            _ => return None,
        };
        if self.cursor.is_none() {
            self.cursor = tree.find_by_index(index);
        }
        self.cursor
    }

    /// Consumes the element `peek` returned.
    fn advance(&mut self, tree: &RawTree<K, V, C>, handle: Handle, offset: usize) {
        let leaf = tree.leaf(handle);
        match self.direction {
            Direction::Forward => {
                self.position += 1;
                self.cursor = if offset + 1 < leaf.len() {
                    Some((handle, offset + 1))
                } else {
                    leaf.next().map(|next| (next, 0))
                };
            }
            Direction::Reverse => {
                self.position -= 1;
                self.cursor = match offset.checked_sub(1) {
                    Some(prev) => Some((handle, prev)),
                    None => leaf.prev().map(|prev| (prev, tree.leaf(prev).len() - 1)),
                };
            }
        }
    }

    /// Yields the next element, or `Ok(None)` once the window is exhausted.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentModification`] if `tree` changed since the
    /// enumerator was created or last reset.
    pub fn move_next<'a>(&mut self, tree: &'a RankedTree<K, V, C>) -> Result<Option<(&'a K, &'a V)>> {
        let raw = &tree.raw;
        self.check(raw)?;

        let Some((handle, offset)) = self.peek(raw) else {
            return Ok(None);
        };
        self.advance(raw, handle, offset);
        Ok(Some(raw.leaf(handle).entry(offset)))
    }

    /// Skips up to `count` elements in O(log n), stopping at the end of the window.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentModification`] if `tree` changed since the
    /// enumerator was created or last reset.
    pub fn skip(&mut self, tree: &RankedTree<K, V, C>, count: usize) -> Result<()> {
        self.check(&tree.raw)?;
        if count == 0 {
            return Ok(());
        }

        self.position = match self.direction {
            Direction::Forward => self.position.saturating_add(count).min(self.end),
            Direction::Reverse => self.position.saturating_sub(count).max(self.start),
        };
        self.cursor = None;
        Ok(())
    }

    /// Skips elements while `predicate` accepts them; the first rejected
    /// element is left for the next [`move_next`](Self::move_next).
    ///
    /// The stage is checked before every element.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentModification`] if `tree` changed since the
    /// enumerator was created or last reset.
    pub fn skip_while<F>(&mut self, tree: &RankedTree<K, V, C>, mut predicate: F) -> Result<()>
    where
        F: FnMut(&K, &V) -> bool,
    {
        let raw = &tree.raw;
        loop {
            self.check(raw)?;
            let Some((handle, offset)) = self.peek(raw) else {
                return Ok(());
            };
            let (key, value) = raw.leaf(handle).entry(offset);
            if !predicate(key, value) {
                return Ok(());
            }
            self.advance(raw, handle, offset);
        }
    }
}

impl<K: Clone, V, C: Comparer<K>> Enumerator<K, V, C> {
    /// Rewinds to the start of the window and resynchronizes with `tree`.
    ///
    /// A bounded window is recomputed from its keys, so it reflects any
    /// elements added or removed since. The enumerator is bound to `tree`
    /// from then on, even if another tree created it.
    pub fn reset(&mut self, tree: &RankedTree<K, V, C>) {
        let (start, end) = rank_window(&tree.raw, self.lower.as_ref(), self.upper.as_ref());
        self.start = start;
        self.end = end;
        self.position = match self.direction {
            Direction::Forward => start,
            Direction::Reverse => end,
        };
        self.cursor = None;
        self.tree_id = tree.raw.id();
        self.stage = tree.raw.stage();
    }
}

impl<K: Clone, V, C> Clone for Enumerator<K, V, C> {
    fn clone(&self) -> Self {
        Enumerator {
            direction: self.direction,
            lower: self.lower.clone(),
            upper: self.upper.clone(),
            start: self.start,
            end: self.end,
            position: self.position,
            cursor: self.cursor,
            tree_id: self.tree_id,
            stage: self.stage,
            marker: PhantomData,
        }
    }
}

impl<K, V, C> fmt::Debug for Enumerator<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enumerator")
            .field("direction", &self.direction)
            .field("position", &self.position)
            .field("remaining", &self.remaining())
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl<K, V, C> RankedTree<K, V, C> {
    /// Creates an [`Enumerator`] over every element in ascending order.
    pub fn enumerate(&self) -> Enumerator<K, V, C> {
        Enumerator::new(&self.raw, Direction::Forward, Bound::Unbounded, Bound::Unbounded, (0, self.len()))
    }

    /// Creates an [`Enumerator`] over every element in descending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let tree = RankedTree::from([(1, 'a'), (2, 'b'), (3, 'c')]);
    /// let mut cursor = tree.enumerate_reverse();
    /// cursor.skip(&tree, 1)?;
    /// assert_eq!(cursor.move_next(&tree)?, Some((&2, &'b')));
    /// assert_eq!(cursor.move_next(&tree)?, Some((&1, &'a')));
    /// assert_eq!(cursor.move_next(&tree)?, None);
    /// # Ok::<(), ranked_bptree::Error>(())
    /// ```
    pub fn enumerate_reverse(&self) -> Enumerator<K, V, C> {
        Enumerator::new(&self.raw, Direction::Reverse, Bound::Unbounded, Bound::Unbounded, (0, self.len()))
    }
}

impl<K: Clone, V, C: Comparer<K>> RankedTree<K, V, C> {
    /// Creates an [`Enumerator`] over the elements with keys in `lower..=upper`.
    ///
    /// Positioning is O(log n); each step after that is O(1).
    pub fn enumerate_between(&self, lower: &K, upper: &K) -> Enumerator<K, V, C> {
        let window = rank_window(&self.raw, Bound::Included(lower), Bound::Included(upper));
        Enumerator::new(&self.raw, Direction::Forward, Bound::Included(lower.clone()), Bound::Included(upper.clone()), window)
    }

    /// Creates an [`Enumerator`] over the elements with keys at or after `lower`.
    pub fn enumerate_from(&self, lower: &K) -> Enumerator<K, V, C> {
        let window = rank_window(&self.raw, Bound::Included(lower), Bound::Unbounded);
        Enumerator::new(&self.raw, Direction::Forward, Bound::Included(lower.clone()), Bound::Unbounded, window)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn drain<K: Copy, V, C>(cursor: &mut Enumerator<K, V, C>, tree: &RankedTree<K, V, C>) -> Vec<K> {
        let mut keys = Vec::new();
        while let Some((k, _)) = cursor.move_next(tree).unwrap() {
            keys.push(*k);
        }
        keys
    }

    #[test]
    fn windows_select_key_ranges() {
        let tree: RankedTree<i32> = (0..100).map(|k| (k, ())).collect();

        assert_eq!(drain(&mut tree.enumerate_between(&10, &14), &tree), [10, 11, 12, 13, 14]);
        assert_eq!(drain(&mut tree.enumerate_from(&97), &tree), [97, 98, 99]);
        assert!(drain(&mut tree.enumerate_between(&50, &40), &tree).is_empty());
        assert_eq!(drain(&mut tree.enumerate_reverse(), &tree).len(), 100);
    }

    #[test]
    fn skip_while_leaves_the_first_rejected_element() {
        let tree: RankedTree<i32> = (0..40).map(|k| (k, ())).collect();
        let mut cursor = tree.enumerate();

        cursor.skip_while(&tree, |&k, _| k < 17).unwrap();
        assert_eq!(cursor.move_next(&tree).unwrap(), Some((&17, &())));
        assert_eq!(cursor.remaining(), 22);

        let mut reverse = tree.enumerate_reverse();
        reverse.skip_while(&tree, |&k, _| k > 30).unwrap();
        assert_eq!(reverse.move_next(&tree).unwrap(), Some((&30, &())));
    }

    #[test]
    fn enumerator_rejects_a_different_tree() {
        let tree: RankedTree<i32> = (0..40).map(|k| (k, ())).collect();
        let other: RankedTree<i32> = (100..140).map(|k| (k, ())).collect();
        let copy = tree.clone();
        assert_eq!(other.stage(), tree.stage());
        assert_eq!(copy.stage(), tree.stage());

        let mut cursor = tree.enumerate();
        assert!(cursor.is_stale(&other));
        assert_eq!(cursor.move_next(&other), Err(Error::ConcurrentModification));
        assert_eq!(cursor.move_next(&copy), Err(Error::ConcurrentModification));
        assert_eq!(cursor.skip(&copy, 3), Err(Error::ConcurrentModification));
        assert_eq!(cursor.move_next(&tree), Ok(Some((&0, &()))));

        cursor.reset(&copy);
        assert!(cursor.is_stale(&tree));
        assert_eq!(cursor.move_next(&copy), Ok(Some((&0, &()))));
    }

    #[test]
    fn stale_enumerator_fails_every_operation() {
        let mut tree: RankedTree<i32> = (0..40).map(|k| (k, ())).collect();
        let mut cursor = tree.enumerate();
        assert!(!cursor.is_stale(&tree));

        tree.add(100);
        assert!(cursor.is_stale(&tree));
        assert_eq!(cursor.move_next(&tree), Err(Error::ConcurrentModification));
        assert_eq!(cursor.skip(&tree, 3), Err(Error::ConcurrentModification));
        assert_eq!(cursor.skip_while(&tree, |_, _| true), Err(Error::ConcurrentModification));

        cursor.reset(&tree);
        assert_eq!(cursor.remaining(), 41);
    }

    #[test]
    fn reset_recomputes_a_bounded_window() {
        let mut tree: RankedTree<i32> = (0..10).map(|k| (k, ())).collect();
        let mut cursor = tree.enumerate_between(&3, &5);
        assert_eq!(cursor.remaining(), 3);

        tree.add(4);
        cursor.reset(&tree);
        assert_eq!(drain(&mut cursor, &tree), [3, 4, 4, 5]);
    }
}
