use alloc::vec::Vec;
use core::cmp::Ordering;

use super::handle::Handle;
use crate::comparer::Comparer;

/// Smallest order a tree accepts; below it a half-full leaf could be empty.
pub(crate) const MIN_ORDER: usize = 4;
/// Largest order a tree accepts.
pub(crate) const MAX_ORDER: usize = 256;

#[cfg(test)]
pub(crate) const DEFAULT_ORDER: usize = 8;
#[cfg(not(test))]
pub(crate) const DEFAULT_ORDER: usize = 128;

/// Which occurrence a search resolves to when the key appears more than once.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Edge {
    /// First occurrence; the insertion point is before every equal key.
    Left,
    /// Last occurrence; the insertion point is after every equal key.
    Right,
}

/// Number of keys ordered before `key`, counting equal keys only for [`Edge::Right`].
#[inline]
pub(crate) fn bound<K, C: Comparer<K>>(keys: &[K], key: &K, edge: Edge, comparer: &C) -> usize {
    match edge {
        Edge::Left => keys.partition_point(|k| comparer.compare(k, key) == Ordering::Less),
        Edge::Right => keys.partition_point(|k| comparer.compare(k, key) != Ordering::Greater),
    }
}

/// Result of searching for a key in a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SearchResult {
    /// Key was found at the given index.
    Found(usize),
    /// Key was not found; index is where it would be inserted.
    NotFound(usize),
}

#[derive(Clone)]
#[allow(clippy::large_enum_variant)]
pub(crate) enum Node<K, V> {
    Branch(Branch<K>),
    Leaf(Leaf<K, V>),
}

// B+Tree: branches hold pivots and child handles.
#[derive(Clone)]
pub(crate) struct Branch<K> {
    // Number of leaf-level elements in the subtree.
    weight: usize,
    // keys[i] is the anchor (first key) of children[i + 1].
    keys: Vec<K>,
    children: Vec<Handle>,
}

// B+Tree: leaves hold the elements and the sibling chain.
#[derive(Clone)]
pub(crate) struct Leaf<K, V> {
    prev: Option<Handle>,
    next: Option<Handle>,
    keys: Vec<K>,
    // Parallel to `keys`; zero-sized for key-only trees.
    values: Vec<V>,
}

impl<K, V> Node<K, V> {
    /// Returns the leaf node, panicking if this is not a leaf.
    #[inline]
    pub(crate) fn as_leaf(&self) -> &Leaf<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Branch(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the leaf node mutably, panicking if this is not a leaf.
    #[inline]
    pub(crate) fn as_leaf_mut(&mut self) -> &mut Leaf<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Branch(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the branch node, panicking if this is a leaf.
    #[inline]
    pub(crate) fn as_branch(&self) -> &Branch<K> {
        match self {
            Node::Branch(branch) => branch,
            Node::Leaf(_) => panic!("expected branch node"),
        }
    }

    /// Returns the branch node mutably, panicking if this is a leaf.
    #[inline]
    pub(crate) fn as_branch_mut(&mut self) -> &mut Branch<K> {
        match self {
            Node::Branch(branch) => branch,
            Node::Leaf(_) => panic!("expected branch node"),
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Number of leaf-level elements in this subtree.
    #[inline]
    pub(crate) fn weight(&self) -> usize {
        match self {
            Node::Branch(branch) => branch.weight,
            Node::Leaf(leaf) => leaf.len(),
        }
    }

    /// Keys held by a leaf, children held by a branch.
    #[inline]
    pub(crate) fn fill(&self) -> usize {
        match self {
            Node::Branch(branch) => branch.child_count(),
            Node::Leaf(leaf) => leaf.len(),
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        match self {
            Node::Branch(branch) => branch.keys.len(),
            Node::Leaf(leaf) => leaf.len(),
        }
    }
}

impl<K> Branch<K> {
    pub(crate) fn new(order: usize) -> Self {
        Self {
            weight: 0,
            keys: Vec::with_capacity(order),
            children: Vec::with_capacity(order + 1),
        }
    }

    /// A branch over two children separated by `pivot`.
    pub(crate) fn with_children(order: usize, left: Handle, pivot: K, right: Handle, weight: usize) -> Self {
        let mut branch = Self::new(order);
        branch.children.push(left);
        branch.keys.push(pivot);
        branch.children.push(right);
        branch.weight = weight;
        branch
    }

    /// A branch over a single child; the caller sets the weight.
    pub(crate) fn with_child(order: usize, child: Handle) -> Self {
        let mut branch = Self::new(order);
        branch.children.push(child);
        branch
    }

    #[inline]
    pub(crate) fn weight(&self) -> usize {
        self.weight
    }

    #[inline]
    pub(crate) fn set_weight(&mut self, weight: usize) {
        self.weight = weight;
    }

    #[inline]
    pub(crate) fn change_weight(&mut self, delta: isize) {
        self.weight = self.weight.checked_add_signed(delta).expect("branch weight underflow");
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    pub(crate) fn set_key(&mut self, index: usize, key: K) {
        self.keys[index] = key;
    }

    pub(crate) fn replace_key(&mut self, index: usize, key: K) -> K {
        core::mem::replace(&mut self.keys[index], key)
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    #[inline]
    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Index of the child whose range holds `key`.
    #[inline]
    pub(crate) fn search_child<C: Comparer<K>>(&self, key: &K, edge: Edge, comparer: &C) -> usize {
        bound(&self.keys, key, edge, comparer)
    }

    /// Inserts `key` at `index` and `child` to its right.
    pub(crate) fn insert_child(&mut self, index: usize, key: K, child: Handle) {
        self.keys.insert(index, key);
        self.children.insert(index + 1, child);
    }

    /// Removes the key at `index` and the child to its right.
    pub(crate) fn remove_child(&mut self, index: usize) -> (K, Handle) {
        let key = self.keys.remove(index);
        let child = self.children.remove(index + 1);
        (key, child)
    }

    /// Removes the last child, and its pivot when one exists.
    pub(crate) fn pop_child(&mut self) -> (Option<K>, Handle) {
        let child = self.children.pop().expect("pop_child on a childless branch");
        (self.keys.pop(), child)
    }

    pub(crate) fn push_child(&mut self, key: K, child: Handle) {
        self.keys.push(key);
        self.children.push(child);
    }

    /// Puts `child` in front of the current first child, with `key` as the anchor of the old first child.
    pub(crate) fn push_front_child(&mut self, child: Handle, key: K) {
        self.keys.insert(0, key);
        self.children.insert(0, child);
    }

    /// Removes the first child and the pivot that followed it.
    pub(crate) fn pop_front_child(&mut self) -> (Handle, K) {
        let child = self.children.remove(0);
        (child, self.keys.remove(0))
    }

    /// Keeps the first `child_count` children and returns the discarded tail as a new
    /// branch, along with the pivot that separated the two halves.
    ///
    /// The returned branch has weight zero; the caller owns the weight bookkeeping.
    pub(crate) fn truncate(&mut self, child_count: usize, order: usize) -> (K, Branch<K>) {
        let mut right = Branch::new(order);
        right.keys.extend(self.keys.drain(child_count..));
        right.children.extend(self.children.drain(child_count..));
        let pivot = self.keys.pop().expect("truncate needs a pivot between the halves");
        (pivot, right)
    }

    /// Appends every child of `right`, joined by `separator`.
    pub(crate) fn coalesce(&mut self, separator: K, mut right: Branch<K>) {
        self.keys.push(separator);
        self.keys.append(&mut right.keys);
        self.children.append(&mut right.children);
        self.weight += right.weight;
    }
}

impl<K, V> Leaf<K, V> {
    pub(crate) fn new(order: usize) -> Self {
        Self {
            prev: None,
            next: None,
            keys: Vec::with_capacity(order),
            values: Vec::with_capacity(order),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn prev(&self) -> Option<Handle> {
        self.prev
    }

    pub(crate) fn set_prev(&mut self, prev: Option<Handle>) {
        self.prev = prev;
    }

    pub(crate) fn next(&self) -> Option<Handle> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<Handle>) {
        self.next = next;
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    /// The first key, which the parent level uses as this leaf's pivot.
    pub(crate) fn anchor(&self) -> Option<&K> {
        self.keys.first()
    }

    #[inline]
    pub(crate) fn entry(&self, index: usize) -> (&K, &V) {
        (&self.keys[index], &self.values[index])
    }

    #[inline]
    pub(crate) fn entry_mut(&mut self, index: usize) -> (&K, &mut V) {
        (&self.keys[index], &mut self.values[index])
    }

    pub(crate) fn values(&self) -> &[V] {
        &self.values
    }

    /// Finds the first or last occurrence of `key`, or its edge-bounded insertion point.
    #[inline]
    pub(crate) fn search<C: Comparer<K>>(&self, key: &K, edge: Edge, comparer: &C) -> SearchResult {
        let point = bound(&self.keys, key, edge, comparer);
        let candidate = match edge {
            Edge::Left => point,
            Edge::Right => point.wrapping_sub(1),
        };
        match self.keys.get(candidate) {
            Some(k) if comparer.compare(k, key) == Ordering::Equal => SearchResult::Found(candidate),
            _ => SearchResult::NotFound(point),
        }
    }

    pub(crate) fn insert(&mut self, index: usize, key: K, value: V) {
        self.keys.insert(index, key);
        self.values.insert(index, value);
    }

    pub(crate) fn remove(&mut self, index: usize) -> (K, V) {
        (self.keys.remove(index), self.values.remove(index))
    }

    pub(crate) fn push(&mut self, key: K, value: V) {
        self.keys.push(key);
        self.values.push(value);
    }

    pub(crate) fn push_front(&mut self, key: K, value: V) {
        self.keys.insert(0, key);
        self.values.insert(0, value);
    }

    pub(crate) fn pop(&mut self) -> Option<(K, V)> {
        Some((self.keys.pop()?, self.values.pop()?))
    }

    /// Moves `[from, to)` of `source` onto the end of this leaf.
    pub(crate) fn append_range(&mut self, source: &mut Leaf<K, V>, from: usize, to: usize) {
        self.keys.extend(source.keys.drain(from..to));
        self.values.extend(source.values.drain(from..to));
    }

    /// Appends every element of `right`. The caller unlinks `right` from the chain.
    pub(crate) fn coalesce(&mut self, mut right: Leaf<K, V>) {
        self.keys.append(&mut right.keys);
        self.values.append(&mut right.values);
    }

    /// Moves the first `count` elements of `right` onto the end of this leaf.
    pub(crate) fn move_left(&mut self, right: &mut Leaf<K, V>, count: usize) {
        self.append_range(right, 0, count);
    }

    /// Empties the leaf, handing back its elements in order.
    pub(crate) fn take_all(&mut self) -> (Vec<K>, Vec<V>) {
        (core::mem::take(&mut self.keys), core::mem::take(&mut self.values))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::comparer::NaturalOrder;

    fn leaf(keys: &[i32]) -> Leaf<i32, ()> {
        let mut leaf = Leaf::new(8);
        for &k in keys {
            leaf.push(k, ());
        }
        leaf
    }

    #[test]
    fn edge_search_resolves_duplicates() {
        let leaf = leaf(&[1, 3, 3, 3, 7]);

        assert_eq!(leaf.search(&3, Edge::Left, &NaturalOrder), SearchResult::Found(1));
        assert_eq!(leaf.search(&3, Edge::Right, &NaturalOrder), SearchResult::Found(3));
        assert_eq!(leaf.search(&4, Edge::Left, &NaturalOrder), SearchResult::NotFound(4));
        assert_eq!(leaf.search(&0, Edge::Right, &NaturalOrder), SearchResult::NotFound(0));
        assert_eq!(leaf.search(&9, Edge::Left, &NaturalOrder), SearchResult::NotFound(5));
    }

    #[test]
    fn bound_brackets_duplicates() {
        let leaf = leaf(&[1, 3, 3, 3, 7]);

        assert_eq!(bound(leaf.keys(), &3, Edge::Left, &NaturalOrder), 1);
        assert_eq!(bound(leaf.keys(), &3, Edge::Right, &NaturalOrder), 4);
        assert_eq!(bound(leaf.keys(), &4, Edge::Left, &NaturalOrder), 4);
        assert_eq!(bound(leaf.keys(), &4, Edge::Right, &NaturalOrder), 4);
        assert_eq!(bound(leaf.keys(), &0, Edge::Right, &NaturalOrder), 0);
        assert_eq!(bound(leaf.keys(), &9, Edge::Left, &NaturalOrder), 5);
    }

    #[test]
    fn branch_routes_equal_keys_by_edge() {
        let mut branch: Branch<i32> = Branch::new(8);
        branch.children.push(Handle::new(0, 0));
        branch.push_child(10, Handle::new(1, 0));
        branch.push_child(20, Handle::new(2, 0));

        assert_eq!(branch.search_child(&10, Edge::Left, &NaturalOrder), 0);
        assert_eq!(branch.search_child(&10, Edge::Right, &NaturalOrder), 1);
        assert_eq!(branch.search_child(&15, Edge::Left, &NaturalOrder), 1);
        assert_eq!(branch.search_child(&25, Edge::Right, &NaturalOrder), 2);
    }

    #[test]
    fn truncate_splits_children_around_pivot() {
        let mut branch: Branch<i32> = Branch::new(4);
        branch.children.push(Handle::new(0, 0));
        for (i, key) in [8, 14, 17, 20].into_iter().enumerate() {
            branch.push_child(key, Handle::new(i + 1, 0));
        }

        let (pivot, right) = branch.truncate(3, 4);
        assert_eq!(pivot, 17);
        assert_eq!(branch.keys(), &[8, 14]);
        assert_eq!(branch.child_count(), 3);
        assert_eq!(right.keys(), &[20]);
        assert_eq!(right.children(), &[Handle::new(3, 0), Handle::new(4, 0)]);
    }

    #[test]
    fn move_left_and_coalesce_preserve_order() {
        let mut left = leaf(&[1, 2]);
        let mut right = leaf(&[3, 4, 5, 6]);

        left.move_left(&mut right, 2);
        assert_eq!(left.keys(), &[1, 2, 3, 4]);
        assert_eq!(right.keys(), &[5, 6]);

        left.coalesce(right);
        assert_eq!(left.keys(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(left.values().len(), 6);
    }
}
