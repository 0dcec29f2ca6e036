/// A zero-based position in the sorted order of a tree.
///
/// Indexing a tree by `Rank` is O(log n): branch weights turn the position
/// into a single root-to-leaf descent.
///
/// # Examples
///
/// ```
/// use ranked_bptree::{RankedTree, Rank};
///
/// let mut tree = RankedTree::new();
/// tree.insert("a", 10);
/// tree.insert("b", 20);
///
/// assert_eq!(tree[Rank(1)], 20);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Rank(pub usize);
