use core::cmp::Ordering;

use smallvec::SmallVec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Branch, Edge, Node, SearchResult};
use crate::comparer::Comparer;

/// One level of a recorded descent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct PathElement {
    /// Node at this level.
    pub(crate) node: Handle,
    /// Child index for a branch; key index or insertion point for a leaf.
    pub(crate) index: usize,
}

/// The root-to-leaf chain of one operation.
///
/// Built fresh per insert, delete or positional lookup and dropped afterwards.
/// It holds handles into the tree but owns none of its state. Mutations use it
/// to adjust weights along the whole chain in one pass and to walk back up
/// during split and coalesce cascades without searching again.
pub(crate) struct NodeVector {
    path: SmallVec<[PathElement; 16]>,
    is_found: bool,
}

impl NodeVector {
    /// Descends toward `key`, choosing the first or last occurrence per `edge`.
    ///
    /// The leaf entry records the edge-bounded insertion point. For
    /// [`Edge::Left`] a match that begins in the next leaf moves the path there.
    pub(crate) fn descend<K, V, C>(nodes: &Arena<Node<K, V>>, root: Handle, comparer: &C, key: &K, edge: Edge) -> Self
    where
        C: Comparer<K>,
    {
        let mut path = SmallVec::new();
        let mut current = root;

        loop {
            match nodes.get(current) {
                Node::Branch(branch) => {
                    let index = branch.search_child(key, edge, comparer);
                    path.push(PathElement {
                        node: current,
                        index,
                    });
                    current = branch.child(index);
                }
                Node::Leaf(leaf) => {
                    // The path records the edge-bounded insertion point, which
                    // for a right-edge match sits just past the last occurrence.
                    let (index, is_found) = match leaf.search(key, edge, comparer) {
                        SearchResult::Found(index) if edge == Edge::Right => (index + 1, true),
                        SearchResult::Found(index) => (index, true),
                        SearchResult::NotFound(index) => (index, false),
                    };
                    path.push(PathElement {
                        node: current,
                        index,
                    });

                    let mut vector = Self {
                        path,
                        is_found,
                    };
                    if edge == Edge::Left && index == leaf.len() {
                        let is_equal = |k: &K| comparer.compare(k, key) == Ordering::Equal;
                        let continues = leaf.next().is_some_and(|next| nodes.get(next).as_leaf().anchor().is_some_and(is_equal));
                        if continues && vector.traverse_right(nodes) {
                            vector.is_found = true;
                        }
                    }
                    return vector;
                }
            }
        }
    }

    /// Descends to the element at `index` in sorted order, steering by branch weights.
    pub(crate) fn at_index<K, V>(nodes: &Arena<Node<K, V>>, root: Handle, index: usize) -> Self {
        let mut path = SmallVec::new();
        let mut current = root;
        let mut remaining = index;

        loop {
            match nodes.get(current) {
                Node::Branch(branch) => {
                    let mut child_index = 0;
                    for (i, &child) in branch.children().iter().enumerate() {
                        child_index = i;
                        let weight = nodes.get(child).weight();
                        if remaining < weight {
                            break;
                        }
                        remaining -= weight;
                    }
                    path.push(PathElement {
                        node: current,
                        index: child_index,
                    });
                    current = branch.child(child_index);
                }
                Node::Leaf(leaf) => {
                    debug_assert!(remaining < leaf.len(), "at_index: index {index} outside the tree");
                    path.push(PathElement {
                        node: current,
                        index: remaining,
                    });
                    return Self {
                        path,
                        is_found: true,
                    };
                }
            }
        }
    }

    #[inline]
    pub(crate) fn is_found(&self) -> bool {
        self.is_found
    }

    /// Number of levels still recorded.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.path.len()
    }

    #[inline]
    pub(crate) fn top(&self) -> PathElement {
        *self.path.last().expect("empty node vector")
    }

    /// The entry directly above the top, if the top is not the root.
    #[inline]
    pub(crate) fn parent(&self) -> Option<PathElement> {
        let len = self.path.len();
        (len >= 2).then(|| self.path[len - 2])
    }

    pub(crate) fn pop(&mut self) -> Option<PathElement> {
        self.path.pop()
    }

    /// Sorted position of the top leaf entry.
    pub(crate) fn rank<K, V>(&self, nodes: &Arena<Node<K, V>>) -> usize {
        let (leaf, branches) = self.path.split_last().expect("empty node vector");
        let mut rank = leaf.index;
        for element in branches {
            let branch = nodes.get(element.node).as_branch();
            rank += branch.children()[..element.index].iter().map(|&c| nodes.get(c).weight()).sum::<usize>();
        }
        rank
    }

    /// Adds `delta` to the weight of every branch on the path.
    pub(crate) fn change_path_weight<K, V>(&self, nodes: &mut Arena<Node<K, V>>, delta: isize) {
        for element in &self.path {
            if let Node::Branch(branch) = nodes.get_mut(element.node) {
                branch.change_weight(delta);
            }
        }
    }

    pub(crate) fn increment_path_weight<K, V>(&self, nodes: &mut Arena<Node<K, V>>) {
        self.change_path_weight(nodes, 1);
    }

    pub(crate) fn decrement_path_weight<K, V>(&self, nodes: &mut Arena<Node<K, V>>) {
        self.change_path_weight(nodes, -1);
    }

    /// Rewrites the pivot that mirrors the anchor of the top node.
    ///
    /// That pivot lives in the nearest ancestor the path entered through a
    /// child other than the first. A node on the tree's left edge has none.
    pub(crate) fn set_pivot<K, V>(&self, nodes: &mut Arena<Node<K, V>>, anchor: K) {
        let Some((_, ancestors)) = self.path.split_last() else {
            return;
        };
        if let Some(element) = ancestors.iter().rev().find(|e| e.index > 0) {
            nodes.get_mut(element.node).as_branch_mut().set_key(element.index - 1, anchor);
        }
    }

    /// Whether the top node is the last node of its level.
    pub(crate) fn is_rightmost<K, V>(&self, nodes: &Arena<Node<K, V>>) -> bool {
        let Some((_, ancestors)) = self.path.split_last() else {
            return true;
        };
        ancestors.iter().all(|e| e.index + 1 == nodes.get(e.node).as_branch().child_count())
    }

    /// Moves the path to the first leaf right of the current one.
    ///
    /// Returns `false`, leaving the path untouched, when the top leaf is the last leaf.
    pub(crate) fn traverse_right<K, V>(&mut self, nodes: &Arena<Node<K, V>>) -> bool {
        let Some(pivot_level) = (0..self.path.len().saturating_sub(1))
            .rev()
            .find(|&level| {
                let element = self.path[level];
                element.index + 1 < nodes.get(element.node).as_branch().child_count()
            })
        else {
            return false;
        };

        self.path.truncate(pivot_level + 1);
        self.path[pivot_level].index += 1;
        let element = self.path[pivot_level];
        let mut current = nodes.get(element.node).as_branch().child(element.index);

        loop {
            self.path.push(PathElement {
                node: current,
                index: 0,
            });
            match nodes.get(current) {
                Node::Branch(branch) => current = branch.child(0),
                Node::Leaf(_) => return true,
            }
        }
    }

    /// Inserts `key` and `new_node` into the parent of the top node, which just split.
    ///
    /// Overflowing parents split the same way, level by level, until a branch
    /// absorbs the promotion or a new root is grown above the old one.
    /// `is_append` marks a split that put only the new element in `new_node`
    /// at the far right of the tree; appends keep the left node full.
    pub(crate) fn promote<K, V>(
        &mut self,
        nodes: &mut Arena<Node<K, V>>,
        root: &mut Handle,
        order: usize,
        mut key: K,
        mut new_node: Handle,
        mut is_append: bool,
    ) {
        let max_keys = order - 1;

        loop {
            let split = self.path.pop().expect("promote needs the split node on the path");

            let Some(&PathElement {
                node: parent,
                index,
            }) = self.path.last()
            else {
                let weight = nodes.get(split.node).weight() + nodes.get(new_node).weight();
                let branch = Branch::with_children(order, split.node, key, new_node, weight);
                *root = nodes.alloc(Node::Branch(branch));

                #[cfg(feature = "tracing")]
                tracing::debug!(weight, "promote: grew a new root");

                return;
            };

            let (pivot, mut right) = {
                let branch = nodes.get_mut(parent).as_branch_mut();
                if branch.keys().len() < max_keys {
                    branch.insert_child(index, key, new_node);
                    return;
                }

                if is_append && index + 1 == branch.child_count() {
                    (key, Branch::with_child(order, new_node))
                } else {
                    is_append = false;
                    branch.insert_child(index, key, new_node);
                    branch.truncate((order + 1).div_ceil(2), order)
                }
            };

            let moved: usize = right.children().iter().map(|&child| nodes.get(child).weight()).sum();
            right.set_weight(moved);
            #[allow(clippy::cast_possible_wrap)]
            nodes.get_mut(parent).as_branch_mut().change_weight(-(moved as isize));

            #[cfg(feature = "tracing")]
            tracing::debug!(moved, is_append, "promote: split an overflowing branch");

            key = pivot;
            new_node = nodes.alloc(Node::Branch(right));
        }
    }
}
