use core::cmp::Ordering;
use core::fmt;

/// A total order over keys.
///
/// Every tree is built around exactly one comparer, fixed for its lifetime.
/// Implementations must be consistent: if `compare(a, b)` is `Less`, then
/// `compare(b, a)` is `Greater`, and so on transitively. The behavior of a tree
/// whose comparer breaks this contract is unspecified but memory safe.
pub trait Comparer<K: ?Sized> {
    /// Compares two keys.
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// The default comparer, ordering keys by their [`Ord`] implementation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparer<K> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Adapts a closure into a [`Comparer`].
///
/// # Examples
///
/// ```
/// use ranked_bptree::{CompareFn, RankedTree};
///
/// let mut tree = RankedTree::with_comparer(CompareFn(|a: &i32, b: &i32| b.cmp(a)));
/// tree.add(1);
/// tree.add(3);
/// tree.add(2);
/// assert_eq!(tree.keys().copied().collect::<Vec<_>>(), [3, 2, 1]);
/// ```
#[derive(Clone, Copy, Default)]
pub struct CompareFn<F>(pub F);

impl<K: ?Sized, F: Fn(&K, &K) -> Ordering> Comparer<K> for CompareFn<F> {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.0)(a, b)
    }
}

impl<F> fmt::Debug for CompareFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompareFn(..)")
    }
}

impl<K: ?Sized, C: Comparer<K> + ?Sized> Comparer<K> for &C {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        (**self).compare(a, b)
    }
}
