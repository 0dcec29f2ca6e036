use super::RankedTree;
use crate::comparer::Comparer;
use crate::raw::Edge;

impl<K: Clone, V, C: Comparer<K>> RankedTree<K, V, C> {
    /// Returns the last element whose key orders strictly before `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_bptree::RankedTree;
    ///
    /// let tree = RankedTree::from([(10, 'a'), (20, 'b'), (20, 'c'), (30, 'd')]);
    /// assert_eq!(tree.less_than(&20), Some((&10, &'a')));
    /// assert_eq!(tree.less_than_or_equal(&20), Some((&20, &'c')));
    /// assert_eq!(tree.greater_than(&20), Some((&30, &'d')));
    /// assert_eq!(tree.greater_than_or_equal(&20), Some((&20, &'b')));
    /// assert_eq!(tree.less_than(&10), None);
    /// ```
    pub fn less_than(&self, key: &K) -> Option<(&K, &V)> {
        let rank = self.raw.bound_rank(key, Edge::Left);
        self.get_by_index(rank.checked_sub(1)?)
    }

    /// Returns the last element whose key orders at or before `key`.
    pub fn less_than_or_equal(&self, key: &K) -> Option<(&K, &V)> {
        let rank = self.raw.bound_rank(key, Edge::Right);
        self.get_by_index(rank.checked_sub(1)?)
    }

    /// Returns the first element whose key orders strictly after `key`.
    pub fn greater_than(&self, key: &K) -> Option<(&K, &V)> {
        self.get_by_index(self.raw.bound_rank(key, Edge::Right))
    }

    /// Returns the first element whose key orders at or after `key`.
    pub fn greater_than_or_equal(&self, key: &K) -> Option<(&K, &V)> {
        self.get_by_index(self.raw.bound_rank(key, Edge::Left))
    }
}
