use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;

use super::handle::Handle;
use super::node::Node;
use super::raw_tree::RawTree;
use crate::comparer::Comparer;
use crate::error::{Error, Result};
use crate::ranked_tree::LevelStats;

impl<K, V, C> RawTree<K, V, C> {
    /// Node and key counts for every level, root first.
    pub(crate) fn statistics(&self) -> Vec<LevelStats> {
        let max_keys = self.max_key_count();
        let mut levels = Vec::new();
        let mut level = alloc::vec![self.root()];

        while !level.is_empty() {
            let key_count = level.iter().map(|&h| self.nodes().get(h).key_count()).sum();
            levels.push(LevelStats::new(levels.len(), level.len(), key_count, level.len() * max_keys));

            level = level
                .iter()
                .filter_map(|&h| match self.nodes().get(h) {
                    Node::Branch(branch) => Some(branch.children().iter().copied()),
                    Node::Leaf(_) => None,
                })
                .flatten()
                .collect();
        }
        levels
    }
}

/// Facts gathered about one subtree while checking it.
struct Subtree<'a, K> {
    anchor: Option<&'a K>,
    weight: usize,
}

impl<K, V, C: Comparer<K>> RawTree<K, V, C> {
    /// Verifies every structural invariant, reporting all violations at once.
    ///
    /// Walks the whole tree, so it is meant for tests and debugging.
    pub(crate) fn sanity_check(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // 1. Shape, weights, pivots and fill, collecting leaves left to right
        let mut leaves: Vec<Handle> = Vec::new();
        let mut leaf_depth: Option<usize> = None;
        let root = self.check_node(self.root(), 0, true, &mut leaf_depth, &mut leaves, &mut errors);

        // 2. Leaf chain against the walk
        self.check_leaf_chain(&leaves, &mut errors);

        // 3. Element count
        let counted: usize = leaves.iter().map(|&h| self.leaf(h).len()).sum();
        if root.weight != counted {
            errors.push(format!("root weight {} but leaves hold {counted} elements", root.weight));
        }
        if leaf_depth.map(|depth| depth + 1) != Some(self.height()) {
            errors.push(format!("leaf depth {leaf_depth:?} disagrees with height {}", self.height()));
        }

        // 4. Every live arena slot is reachable
        let reached: usize = self.statistics().iter().map(|level| level.node_count).sum();
        if reached != self.nodes().len() {
            errors.push(format!("arena holds {} nodes but {reached} are reachable", self.nodes().len()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::StructuralInvariantViolation(errors.join("\n")))
        }
    }

    fn check_node<'a>(
        &'a self,
        handle: Handle,
        depth: usize,
        is_rightmost: bool,
        leaf_depth: &mut Option<usize>,
        leaves: &mut Vec<Handle>,
        errors: &mut Vec<String>,
    ) -> Subtree<'a, K> {
        let is_root = handle == self.root();
        let max_keys = self.max_key_count();

        match self.nodes().get(handle) {
            Node::Leaf(leaf) => {
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        errors.push(format!("leaf {handle:?} at depth {depth}, expected {expected}"));
                    }
                    Some(_) => {}
                }
                leaves.push(handle);

                let minimum = if is_root {
                    0
                } else if is_rightmost {
                    1
                } else {
                    max_keys.div_ceil(2)
                };
                if leaf.len() < minimum || leaf.len() > max_keys {
                    errors.push(format!("leaf {handle:?} holds {} keys, allowed {minimum}..={max_keys}", leaf.len()));
                }
                if leaf.values().len() != leaf.len() {
                    errors.push(format!("leaf {handle:?} has {} values for {} keys", leaf.values().len(), leaf.len()));
                }
                if leaf.keys().windows(2).any(|w| self.comparer().compare(&w[0], &w[1]) == Ordering::Greater) {
                    errors.push(format!("leaf {handle:?} keys out of order"));
                }

                Subtree {
                    anchor: leaf.anchor(),
                    weight: leaf.len(),
                }
            }
            Node::Branch(branch) => {
                let children = branch.child_count();
                let minimum = if is_root {
                    2
                } else if is_rightmost {
                    1
                } else {
                    self.order().div_ceil(2)
                };
                if children < minimum || children > self.order() {
                    errors.push(format!("branch {handle:?} has {children} children, allowed {minimum}..={}", self.order()));
                }
                if branch.keys().len() + 1 != children {
                    errors.push(format!("branch {handle:?} has {} keys for {children} children", branch.keys().len()));
                }

                let mut weight = 0;
                let mut anchor = None;
                for (i, &child) in branch.children().iter().enumerate() {
                    let last = i + 1 == children;
                    let subtree = self.check_node(child, depth + 1, is_rightmost && last, leaf_depth, leaves, errors);
                    weight += subtree.weight;

                    if i == 0 {
                        anchor = subtree.anchor;
                    } else if let (Some(pivot), Some(first)) = (branch.keys().get(i - 1), subtree.anchor)
                        && self.comparer().compare(pivot, first) != Ordering::Equal
                    {
                        errors.push(format!("branch {handle:?} pivot {} does not match the anchor of child {i}", i - 1));
                    }
                }

                if weight != branch.weight() {
                    errors.push(format!("branch {handle:?} weight {} but children hold {weight}", branch.weight()));
                }

                Subtree {
                    anchor,
                    weight,
                }
            }
        }
    }

    fn check_leaf_chain(&self, leaves: &[Handle], errors: &mut Vec<String>) {
        if leaves.first() != Some(&self.leftmost_leaf()) {
            errors.push(format!("leftmost leaf {:?} is not the first leaf of the walk", self.leftmost_leaf()));
        }
        if leaves.last() != Some(&self.rightmost_leaf()) {
            errors.push(format!("rightmost leaf {:?} is not the last leaf of the walk", self.rightmost_leaf()));
        }

        let mut prev: Option<Handle> = None;
        let mut prev_last: Option<&K> = None;
        for &handle in leaves {
            let leaf = self.leaf(handle);
            if leaf.prev() != prev {
                errors.push(format!("leaf {handle:?} links back to {:?}, expected {prev:?}", leaf.prev()));
            }
            if let Some(p) = prev
                && self.leaf(p).next() != Some(handle)
            {
                errors.push(format!("leaf {p:?} does not link forward to {handle:?}"));
            }
            if let (Some(last), Some(first)) = (prev_last, leaf.anchor())
                && self.comparer().compare(last, first) == Ordering::Greater
            {
                errors.push(format!("leaf {handle:?} starts below the end of its left neighbor"));
            }

            prev = Some(handle);
            prev_last = leaf.keys().last().or(prev_last);
        }

        if let Some(&last) = leaves.last()
            && self.leaf(last).next().is_some()
        {
            errors.push(format!("rightmost leaf {last:?} links forward"));
        }
    }
}
