use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Edge, Leaf, Node};
use super::node_vector::NodeVector;
use crate::comparer::{Comparer, NaturalOrder};

/// Where a keyed search landed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Position {
    pub(crate) leaf: Handle,
    /// Index inside `leaf`.
    pub(crate) offset: usize,
    /// Sorted position across the whole tree.
    pub(crate) rank: usize,
    /// When set, `leaf`/`offset`/`rank` name the matching element; otherwise
    /// they name the insertion point.
    pub(crate) found: bool,
}

/// A B+ tree with rank-augmented branches.
///
/// Elements live in leaves, which form a doubly linked chain in sorted order.
/// Branches carry one pivot per child after the first: the smallest key of that
/// child. Every branch also carries its weight, the number of elements below
/// it, which turns positional lookups into a single descent.
///
/// The root always exists; an empty tree is a single empty leaf. `stage`
/// changes on every mutation so detached cursors can tell when they are stale.
/// `id` is unique per instance, clones included, so a cursor can also tell
/// when it is handed a different tree.
pub(crate) struct RawTree<K, V, C = NaturalOrder> {
    nodes: Arena<Node<K, V>>,
    root: Handle,
    leftmost_leaf: Handle,
    rightmost_leaf: Handle,
    comparer: C,
    order: usize,
    stage: u64,
    id: usize,
}

fn next_tree_id() -> usize {
    static NEXT_ID: AtomicUsize = AtomicUsize::new(0);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

impl<K: Clone, V: Clone, C: Clone> Clone for RawTree<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            leftmost_leaf: self.leftmost_leaf,
            rightmost_leaf: self.rightmost_leaf,
            comparer: self.comparer.clone(),
            order: self.order,
            stage: self.stage,
            id: next_tree_id(),
        }
    }
}

impl<K, V, C> RawTree<K, V, C> {
    /// Creates an empty tree. `order` must already be validated.
    pub(crate) fn new(order: usize, comparer: C) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::Leaf(Leaf::new(order)));
        Self {
            nodes,
            root,
            leftmost_leaf: root,
            rightmost_leaf: root,
            comparer,
            order,
            stage: 0,
            id: next_tree_id(),
        }
    }

    #[inline]
    pub(crate) fn nodes(&self) -> &Arena<Node<K, V>> {
        &self.nodes
    }

    #[cfg(test)]
    pub(crate) fn nodes_mut(&mut self) -> &mut Arena<Node<K, V>> {
        &mut self.nodes
    }

    #[inline]
    pub(crate) fn root(&self) -> Handle {
        self.root
    }

    #[inline]
    pub(crate) fn comparer(&self) -> &C {
        &self.comparer
    }

    #[inline]
    pub(crate) fn order(&self) -> usize {
        self.order
    }

    /// Most keys a node may hold.
    #[inline]
    pub(crate) fn max_key_count(&self) -> usize {
        self.order - 1
    }

    #[inline]
    pub(crate) fn stage(&self) -> u64 {
        self.stage
    }

    #[inline]
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.get(self.root).weight()
    }

    #[inline]
    pub(crate) fn leftmost_leaf(&self) -> Handle {
        self.leftmost_leaf
    }

    #[inline]
    pub(crate) fn rightmost_leaf(&self) -> Handle {
        self.rightmost_leaf
    }

    #[inline]
    pub(crate) fn leaf(&self, handle: Handle) -> &Leaf<K, V> {
        self.nodes.get(handle).as_leaf()
    }

    /// Number of levels, counting the leaf level.
    pub(crate) fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while let Node::Branch(branch) = self.nodes.get(current) {
            height += 1;
            current = branch.child(0);
        }
        height
    }

    #[inline]
    fn touch(&mut self) {
        self.stage = self.stage.wrapping_add(1);
    }

    pub(crate) fn clear(&mut self) {
        self.touch();
        self.nodes.clear();
        self.root = self.nodes.alloc(Node::Leaf(Leaf::new(self.order)));
        self.leftmost_leaf = self.root;
        self.rightmost_leaf = self.root;
    }

    /// Leaf and offset of the element at `index`, or `None` past the end.
    pub(crate) fn find_by_index(&self, index: usize) -> Option<(Handle, usize)> {
        if index >= self.len() {
            return None;
        }
        let top = NodeVector::at_index(&self.nodes, self.root, index).top();
        Some((top.node, top.index))
    }

    pub(crate) fn get_by_index(&self, index: usize) -> Option<(&K, &V)> {
        let (leaf, offset) = self.find_by_index(index)?;
        Some(self.leaf(leaf).entry(offset))
    }

    /// Counts as a mutation: the caller may rewrite the value.
    pub(crate) fn get_by_index_mut(&mut self, index: usize) -> Option<(&K, &mut V)> {
        let (leaf, offset) = self.find_by_index(index)?;
        self.touch();
        Some(self.nodes.get_mut(leaf).as_leaf_mut().entry_mut(offset))
    }

    pub(crate) fn first(&self) -> Option<(&K, &V)> {
        let leaf = self.leaf(self.leftmost_leaf);
        (!leaf.is_empty()).then(|| leaf.entry(0))
    }

    pub(crate) fn last(&self) -> Option<(&K, &V)> {
        let leaf = self.leaf(self.rightmost_leaf);
        leaf.len().checked_sub(1).map(|offset| leaf.entry(offset))
    }

    /// Rank of the first element whose value equals `value`. Linear.
    pub(crate) fn index_of_value(&self, value: &V) -> Option<usize>
    where
        V: PartialEq,
    {
        let mut rank = 0;
        let mut current = Some(self.leftmost_leaf);
        while let Some(handle) = current {
            let leaf = self.leaf(handle);
            if let Some(offset) = leaf.values().iter().position(|v| v == value) {
                return Some(rank + offset);
            }
            rank += leaf.len();
            current = leaf.next();
        }
        None
    }

    /// Empties the tree, handing back every element in order.
    pub(crate) fn drain(&mut self) -> Vec<(K, V)> {
        let mut entries = Vec::with_capacity(self.len());
        let mut current = Some(self.leftmost_leaf);
        while let Some(handle) = current {
            let leaf = self.nodes.get_mut(handle).as_leaf_mut();
            current = leaf.next();
            let (keys, values) = leaf.take_all();
            entries.extend(keys.into_iter().zip(values));
        }
        self.clear();
        entries
    }
}

impl<K, V, C> RawTree<K, V, C>
where
    K: Clone,
    C: Comparer<K>,
{
    fn descend(&self, key: &K, edge: Edge) -> NodeVector {
        NodeVector::descend(&self.nodes, self.root, &self.comparer, key, edge)
    }

    /// Locates the first ([`Edge::Left`]) or last ([`Edge::Right`]) occurrence of `key`.
    pub(crate) fn try_find(&self, key: &K, edge: Edge) -> Position {
        let path = self.descend(key, edge);
        let top = path.top();
        let rank = path.rank(&self.nodes);
        let found = path.is_found();
        // A right-edge leaf entry sits just past the last match.
        let step = usize::from(found && edge == Edge::Right);
        Position {
            leaf: top.node,
            offset: top.index - step,
            rank: rank - step,
            found,
        }
    }

    /// Number of elements ordered before `key`, plus the equal ones for [`Edge::Right`].
    pub(crate) fn bound_rank(&self, key: &K, edge: Edge) -> usize {
        self.descend(key, edge).rank(&self.nodes)
    }

    pub(crate) fn get(&self, key: &K) -> Option<(&K, &V)> {
        let position = self.try_find(key, Edge::Left);
        position.found.then(|| self.leaf(position.leaf).entry(position.offset))
    }

    /// Counts as a mutation when the key is present.
    pub(crate) fn get_mut(&mut self, key: &K) -> Option<(&K, &mut V)> {
        let position = self.try_find(key, Edge::Left);
        if !position.found {
            return None;
        }
        self.touch();
        Some(self.nodes.get_mut(position.leaf).as_leaf_mut().entry_mut(position.offset))
    }

    /// Inserts after every equal key. Returns the element's sorted position and
    /// whether no equal key was present before.
    pub(crate) fn insert(&mut self, key: K, value: V) -> (usize, bool) {
        let path = self.descend(&key, Edge::Right);
        let is_new_key = !path.is_found();
        let index = path.rank(&self.nodes);
        self.insert_at(path, key, value);
        (index, is_new_key)
    }

    /// Inserts only when no equal key exists. On a collision nothing changes
    /// and the position of the existing key is returned.
    pub(crate) fn insert_unique(&mut self, key: K, value: V) -> (usize, bool) {
        let path = self.descend(&key, Edge::Right);
        let index = path.rank(&self.nodes);
        if path.is_found() {
            return (index - 1, false);
        }
        self.insert_at(path, key, value);
        (index, true)
    }

    /// Overwrites the value of the first occurrence of `key`, or inserts it.
    pub(crate) fn replace(&mut self, key: K, value: V) -> Option<V> {
        let path = self.descend(&key, Edge::Left);
        if !path.is_found() {
            self.insert_at(path, key, value);
            return None;
        }
        self.touch();
        let top = path.top();
        let (_, slot) = self.nodes.get_mut(top.node).as_leaf_mut().entry_mut(top.index);
        Some(core::mem::replace(slot, value))
    }

    fn insert_at(&mut self, mut path: NodeVector, key: K, value: V) {
        self.touch();
        path.increment_path_weight(&mut self.nodes);

        let top = path.top();
        let leaf_handle = top.node;
        let point = top.index;
        let max_keys = self.max_key_count();

        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        if leaf.len() < max_keys {
            if point == 0 {
                let anchor = key.clone();
                leaf.insert(point, key, value);
                path.set_pivot(&mut self.nodes, anchor);
            } else {
                leaf.insert(point, key, value);
            }
            return;
        }

        // Appending past the last leaf keeps the full leaf full.
        let is_append = point == leaf.len() && leaf.next().is_none();
        let mut sibling = Leaf::new(self.order);
        let mut left_anchor = None;
        if is_append {
            sibling.push(key, value);
        } else {
            let split = leaf.len() / 2 + 1;
            if point < split {
                let len = leaf.len();
                sibling.append_range(leaf, split - 1, len);
                if point == 0 {
                    left_anchor = Some(key.clone());
                }
                leaf.insert(point, key, value);
            } else {
                sibling.append_range(leaf, split, point);
                sibling.push(key, value);
                let len = leaf.len();
                sibling.append_range(leaf, split, len);
            }
        }

        let next = leaf.next();
        sibling.set_prev(Some(leaf_handle));
        sibling.set_next(next);
        let anchor = sibling.anchor().cloned().expect("split leaf is never empty");
        let sibling = self.nodes.alloc(Node::Leaf(sibling));
        self.nodes.get_mut(leaf_handle).as_leaf_mut().set_next(Some(sibling));
        match next {
            Some(next) => self.nodes.get_mut(next).as_leaf_mut().set_prev(Some(sibling)),
            None => self.rightmost_leaf = sibling,
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(is_append, "insert: split a full leaf");

        if let Some(left_anchor) = left_anchor {
            path.set_pivot(&mut self.nodes, left_anchor);
        }
        path.promote(&mut self.nodes, &mut self.root, self.order, anchor, sibling, is_append);
    }

    /// Removes the first occurrence of `key`.
    pub(crate) fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let path = self.descend(key, Edge::Left);
        path.is_found().then(|| self.remove_path(path))
    }

    /// Removes the element at `index`, or returns `None` past the end.
    pub(crate) fn remove_at(&mut self, index: usize) -> Option<(K, V)> {
        if index >= self.len() {
            return None;
        }
        let path = NodeVector::at_index(&self.nodes, self.root, index);
        Some(self.remove_path(path))
    }

    /// Removes `count` elements starting at `index`; the range must be in bounds.
    pub(crate) fn remove_range(&mut self, index: usize, count: usize) {
        debug_assert!(index + count <= self.len(), "remove_range out of bounds");
        for _ in 0..count {
            self.remove_at(index);
        }
    }

    /// Removes every occurrence of `key`, returning how many there were.
    pub(crate) fn remove_all(&mut self, key: &K) -> usize {
        let first = self.bound_rank(key, Edge::Left);
        let count = self.bound_rank(key, Edge::Right) - first;
        self.remove_range(first, count);
        count
    }

    pub(crate) fn pop_first(&mut self) -> Option<(K, V)> {
        self.remove_at(0)
    }

    pub(crate) fn pop_last(&mut self) -> Option<(K, V)> {
        let len = self.len();
        len.checked_sub(1).and_then(|index| self.remove_at(index))
    }

    /// Keeps the elements `keep` accepts, in order. Returns how many were removed.
    pub(crate) fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.touch();
        let mut index = 0;
        let mut removed = 0;
        while index < self.len() {
            let (leaf, offset) = self.find_by_index(index).expect("index is below len");
            let (key, value) = self.nodes.get_mut(leaf).as_leaf_mut().entry_mut(offset);
            if keep(key, value) {
                index += 1;
            } else {
                self.remove_at(index);
                removed += 1;
            }
        }
        removed
    }

    /// Removes the elements `predicate` selects, in order. Returns how many were removed.
    ///
    /// Only the removals themselves touch the stage.
    pub(crate) fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut index = 0;
        let mut removed = 0;
        while let Some((key, value)) = self.get_by_index(index) {
            if predicate(key, value) {
                self.remove_at(index);
                removed += 1;
            } else {
                index += 1;
            }
        }
        removed
    }

    fn remove_path(&mut self, path: NodeVector) -> (K, V) {
        self.touch();
        path.decrement_path_weight(&mut self.nodes);

        let top = path.top();
        let leaf = self.nodes.get_mut(top.node).as_leaf_mut();
        let removed = leaf.remove(top.index);
        if top.index == 0
            && let Some(anchor) = leaf.anchor().cloned()
        {
            path.set_pivot(&mut self.nodes, anchor);
        }

        self.rebalance(path);
        removed
    }

    /// Restores fill bounds from the top of `path` upward after a removal.
    fn rebalance(&mut self, mut path: NodeVector) {
        let min_keys = self.max_key_count().div_ceil(2);
        let min_children = self.order.div_ceil(2);

        loop {
            let top = path.top();
            let Some(parent) = path.parent() else {
                self.prune_root();
                return;
            };

            let node = self.nodes.get(top.node);
            let fill = node.fill();
            let is_leaf = node.is_leaf();

            // The last node of a level may run light; it only goes once empty.
            if path.is_rightmost(&self.nodes) {
                if fill > 0 {
                    return;
                }
                self.detach_rightmost(parent.node, top.node);
                path.pop();
                continue;
            }

            let minimum = if is_leaf { min_keys } else { min_children };
            if fill >= minimum {
                return;
            }

            let index = parent.index;
            let branch = self.nodes.get(parent.node).as_branch();
            let right = (index + 1 < branch.child_count()).then(|| branch.child(index + 1));
            let left = index.checked_sub(1).map(|i| branch.child(i));
            let right_spare = right.is_some_and(|h| self.nodes.get(h).fill() > minimum);
            let left_spare = left.is_some_and(|h| self.nodes.get(h).fill() > minimum);

            if right_spare {
                self.borrow_from_right(parent.node, index, is_leaf);
                return;
            }
            if left_spare {
                self.borrow_from_left(parent.node, index, is_leaf);
                return;
            }
            if right.is_some() {
                self.coalesce(parent.node, index);
            } else {
                self.coalesce(parent.node, index - 1);
            }
            path.pop();
        }
    }

    fn borrow_from_right(&mut self, parent: Handle, index: usize, is_leaf: bool) {
        let branch = self.nodes.get(parent).as_branch();
        let (node, right) = (branch.child(index), branch.child(index + 1));

        if is_leaf {
            let (node, right) = self.nodes.get_pair_mut(node, right);
            let right = right.as_leaf_mut();
            node.as_leaf_mut().move_left(right, 1);
            let anchor = right.anchor().cloned().expect("lending leaf keeps an element");
            self.nodes.get_mut(parent).as_branch_mut().set_key(index, anchor);
        } else {
            let (child, next_pivot) = self.nodes.get_mut(right).as_branch_mut().pop_front_child();
            let separator = self.nodes.get_mut(parent).as_branch_mut().replace_key(index, next_pivot);
            let weight = signed(self.nodes.get(child).weight());
            let node = self.nodes.get_mut(node).as_branch_mut();
            node.push_child(separator, child);
            node.change_weight(weight);
            self.nodes.get_mut(right).as_branch_mut().change_weight(-weight);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(index, is_leaf, "rebalance: borrowed from right sibling");
    }

    fn borrow_from_left(&mut self, parent: Handle, index: usize, is_leaf: bool) {
        let branch = self.nodes.get(parent).as_branch();
        let (left, node) = (branch.child(index - 1), branch.child(index));

        if is_leaf {
            let (key, value) = self.nodes.get_mut(left).as_leaf_mut().pop().expect("lending leaf is not empty");
            self.nodes.get_mut(parent).as_branch_mut().set_key(index - 1, key.clone());
            self.nodes.get_mut(node).as_leaf_mut().push_front(key, value);
        } else {
            let (pivot, child) = self.nodes.get_mut(left).as_branch_mut().pop_child();
            let pivot = pivot.expect("lending branch keeps two children");
            let separator = self.nodes.get_mut(parent).as_branch_mut().replace_key(index - 1, pivot);
            let weight = signed(self.nodes.get(child).weight());
            let node = self.nodes.get_mut(node).as_branch_mut();
            node.push_front_child(child, separator);
            node.change_weight(weight);
            self.nodes.get_mut(left).as_branch_mut().change_weight(-weight);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(index, is_leaf, "rebalance: borrowed from left sibling");
    }

    /// Merges child `index + 1` of `parent` into child `index`.
    fn coalesce(&mut self, parent: Handle, index: usize) {
        let (separator, right) = self.nodes.get_mut(parent).as_branch_mut().remove_child(index);
        let left = self.nodes.get(parent).as_branch().child(index);

        match self.nodes.take(right) {
            Node::Leaf(right) => {
                let next = right.next();
                let left_leaf = self.nodes.get_mut(left).as_leaf_mut();
                left_leaf.coalesce(right);
                left_leaf.set_next(next);
                match next {
                    Some(next) => self.nodes.get_mut(next).as_leaf_mut().set_prev(Some(left)),
                    None => self.rightmost_leaf = left,
                }
            }
            Node::Branch(right) => self.nodes.get_mut(left).as_branch_mut().coalesce(separator, right),
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(index, "rebalance: coalesced siblings");
    }

    /// Unlinks and frees an empty node at the right edge of its level.
    fn detach_rightmost(&mut self, parent: Handle, node: Handle) {
        let (_, child) = self.nodes.get_mut(parent).as_branch_mut().pop_child();
        debug_assert_eq!(child, node, "rightmost node is its parent's last child");

        if let Node::Leaf(leaf) = self.nodes.take(node) {
            let prev = leaf.prev().expect("a non-root leaf has a left neighbor");
            self.nodes.get_mut(prev).as_leaf_mut().set_next(None);
            self.rightmost_leaf = prev;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("rebalance: detached an empty rightmost node");
    }

    /// Collapses single-child roots until the root is a leaf or a real branch.
    fn prune_root(&mut self) {
        while let Node::Branch(branch) = self.nodes.get(self.root)
            && branch.child_count() == 1
        {
            let child = branch.child(0);
            self.nodes.free(self.root);
            self.root = child;

            #[cfg(feature = "tracing")]
            tracing::debug!(height = self.height(), "rebalance: pruned the root");
        }
    }
}

#[allow(clippy::cast_possible_wrap)]
#[inline]
fn signed(weight: usize) -> isize {
    weight as isize
}
