use pretty_assertions::assert_eq;
use proptest::prelude::*;
use ranked_bptree::{CompareFn, Error, Insertion, Rank, RankedTree};

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 1_000;

/// Keys drawn from a narrow range so duplicates are common.
fn key_strategy() -> impl Strategy<Value = i32> {
    -300i32..300i32
}

// ─── Sorted Vec model ────────────────────────────────────────────────────────

/// Reference implementation: a sorted vector with stable tie order.
#[derive(Default)]
struct Model {
    entries: Vec<(i32, u32)>,
}

impl Model {
    fn lower(&self, key: i32) -> usize {
        self.entries.partition_point(|&(k, _)| k < key)
    }

    fn upper(&self, key: i32) -> usize {
        self.entries.partition_point(|&(k, _)| k <= key)
    }

    fn insert(&mut self, key: i32, value: u32) -> Insertion {
        let index = self.upper(key);
        let is_new_key = index == self.lower(key);
        self.entries.insert(index, (key, value));
        Insertion {
            index,
            is_new_key,
        }
    }

    fn remove(&mut self, key: i32) -> Option<(i32, u32)> {
        let index = self.lower(key);
        (index < self.upper(key)).then(|| self.entries.remove(index))
    }

    fn remove_all(&mut self, key: i32) -> usize {
        let (lower, upper) = (self.lower(key), self.upper(key));
        self.entries.drain(lower..upper).count()
    }
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum TreeOp {
    Insert(i32),
    InsertUnique(i32),
    Remove(i32),
    RemoveAll(i32),
    RemoveAt(usize),
    RemoveRange(usize, usize),
    PopFirst,
    PopLast,
    Find(i32),
    GetByIndex(usize),
}

fn tree_op_strategy() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        12 => key_strategy().prop_map(TreeOp::Insert),
        2 => key_strategy().prop_map(TreeOp::InsertUnique),
        4 => key_strategy().prop_map(TreeOp::Remove),
        1 => key_strategy().prop_map(TreeOp::RemoveAll),
        3 => any::<usize>().prop_map(TreeOp::RemoveAt),
        1 => (any::<usize>(), 0usize..40).prop_map(|(at, count)| TreeOp::RemoveRange(at, count)),
        1 => Just(TreeOp::PopFirst),
        1 => Just(TreeOp::PopLast),
        2 => key_strategy().prop_map(TreeOp::Find),
        2 => any::<usize>().prop_map(TreeOp::GetByIndex),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Replays a random sequence of operations on both the tree and the model
    /// and asserts identical results, and a sound structure, at every step.
    #[test]
    fn tree_ops_match_sorted_vec(
        order in 4usize..12,
        ops in proptest::collection::vec(tree_op_strategy(), TEST_SIZE),
    ) {
        let mut tree: RankedTree<i32, u32> = RankedTree::with_order(order).unwrap();
        let mut model = Model::default();

        for (tag, op) in (0u32..).zip(ops) {
            match op {
                TreeOp::Insert(key) => {
                    prop_assert_eq!(tree.insert(key, tag), model.insert(key, tag));
                }
                TreeOp::InsertUnique(key) => {
                    let result = tree.insert_unique(key, tag);
                    if model.lower(key) < model.upper(key) {
                        prop_assert_eq!(result, Insertion { index: model.upper(key) - 1, is_new_key: false });
                    } else {
                        prop_assert_eq!(result, model.insert(key, tag));
                    }
                }
                TreeOp::Remove(key) => {
                    prop_assert_eq!(tree.remove(&key), model.remove(key));
                }
                TreeOp::RemoveAll(key) => {
                    prop_assert_eq!(tree.remove_all(&key), model.remove_all(key));
                }
                TreeOp::RemoveAt(which) => {
                    let len = model.entries.len();
                    if len == 0 {
                        prop_assert!(tree.remove_at(which).is_err());
                    } else {
                        let index = which % len;
                        prop_assert_eq!(tree.remove_at(index), Ok(model.entries.remove(index)));
                    }
                }
                TreeOp::RemoveRange(which, count) => {
                    let len = model.entries.len();
                    let index = which % (len + 1);
                    let result = tree.remove_range(index, count);
                    if count <= len - index {
                        prop_assert!(result.is_ok());
                        model.entries.drain(index..index + count);
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
                TreeOp::PopFirst => {
                    let expected = (!model.entries.is_empty()).then(|| model.entries.remove(0));
                    prop_assert_eq!(tree.pop_first(), expected);
                }
                TreeOp::PopLast => {
                    prop_assert_eq!(tree.pop_last(), model.entries.pop());
                }
                TreeOp::Find(key) => {
                    let (lower, upper) = (model.lower(key), model.upper(key));
                    let expected = if lower < upper { Ok(lower) } else { Err(lower) };
                    prop_assert_eq!(tree.find(&key), expected);
                    prop_assert_eq!(tree.count_of(&key), upper - lower);
                }
                TreeOp::GetByIndex(which) => {
                    let index = which % (model.entries.len() + 1);
                    let expected = model.entries.get(index).map(|(k, v)| (k, v));
                    prop_assert_eq!(tree.get_by_index(index), expected);
                }
            }

            prop_assert_eq!(tree.len(), model.entries.len());
            if let Err(error) = tree.sanity_check() {
                return Err(TestCaseError::fail(error.to_string()));
            }
        }

        let actual: Vec<(i32, u32)> = tree.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(actual, model.entries);
    }

    /// Removing every key, in any order, returns the tree to a single empty leaf.
    #[test]
    fn round_trip_to_empty(
        order in 4usize..10,
        keys in proptest::collection::vec(key_strategy(), 0..TEST_SIZE).prop_shuffle(),
        removal_seed in any::<u64>(),
    ) {
        let mut tree: RankedTree<i32> = RankedTree::with_order(order).unwrap();
        for &key in &keys {
            tree.add(key);
        }

        let mut removal = keys.clone();
        let mut x = removal_seed;
        for i in (1..removal.len()).rev() {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            removal.swap(i, (x >> 33) as usize % (i + 1));
        }
        for key in removal {
            prop_assert!(tree.remove(&key).is_some());
        }

        prop_assert!(tree.is_empty());
        prop_assert_eq!(tree.height(), 1);
        prop_assert!(tree.sanity_check().is_ok());
    }

    /// `get_by_index(i)` followed by a key lookup returns `i` when keys are unique.
    #[test]
    fn index_and_key_lookup_are_inverse(
        keys in proptest::collection::btree_set(any::<i32>(), 0..TEST_SIZE),
    ) {
        let tree: RankedTree<i32> = keys.iter().map(|&k| (k, ())).collect();

        for index in 0..tree.len() {
            let (key, _) = tree.get_by_index(index).unwrap();
            prop_assert_eq!(tree.find(key), Ok(index));
        }
    }

    /// Equal keys iterate in the order they were inserted.
    #[test]
    fn ties_keep_insertion_order(keys in proptest::collection::vec(0i32..8, 0..TEST_SIZE)) {
        let mut tree: RankedTree<i32, usize> = RankedTree::with_order(5).unwrap();
        let mut expected: Vec<(i32, usize)> = Vec::new();
        for (tag, &key) in keys.iter().enumerate() {
            tree.insert(key, tag);
            expected.push((key, tag));
        }
        expected.sort_by_key(|&(k, _)| k);

        let actual: Vec<(i32, usize)> = tree.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(actual, expected);
    }

    /// Skipping k then iterating yields the same suffix as iterating and discarding k.
    #[test]
    fn skip_yields_the_same_suffix(len in 0usize..TEST_SIZE, k in 0usize..TEST_SIZE) {
        let tree: RankedTree<usize> = (0..len).map(|i| (i / 3, ())).collect();
        let full: Vec<usize> = tree.keys().copied().collect();

        let skipped: Vec<usize> = tree.keys().skip(k).copied().collect();
        prop_assert_eq!(&skipped, &full.iter().skip(k).copied().collect::<Vec<_>>());

        let mut cursor = tree.enumerate();
        cursor.skip(&tree, k).unwrap();
        let mut enumerated = Vec::new();
        while let Some((key, _)) = cursor.move_next(&tree).unwrap() {
            enumerated.push(*key);
        }
        prop_assert_eq!(enumerated, skipped);
    }

    /// Range iteration agrees with filtering the sorted model.
    #[test]
    fn range_matches_filter(
        keys in proptest::collection::vec(key_strategy(), 0..TEST_SIZE),
        a in key_strategy(),
        b in key_strategy(),
    ) {
        let (lo, hi) = (a.min(b), a.max(b));
        let tree: RankedTree<i32> = keys.iter().map(|&k| (k, ())).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();

        let between: Vec<i32> = tree.elements_between(&lo, &hi).map(|(k, _)| *k).collect();
        prop_assert_eq!(between, sorted.iter().copied().filter(|k| (lo..=hi).contains(k)).collect::<Vec<_>>());

        let half_open: Vec<i32> = tree.range(lo..hi).map(|(k, _)| *k).collect();
        prop_assert_eq!(half_open, sorted.iter().copied().filter(|k| (lo..hi).contains(k)).collect::<Vec<_>>());

        let reversed: Vec<i32> = tree.elements_from(&lo).rev().map(|(k, _)| *k).collect();
        prop_assert_eq!(reversed, sorted.iter().rev().copied().filter(|&k| k >= lo).collect::<Vec<_>>());
    }
}

// ─── Structural scenarios ────────────────────────────────────────────────────

fn even_keys(order: usize, last: i32) -> RankedTree<i32> {
    let mut tree = RankedTree::with_order(order).unwrap();
    for key in (2..=last).step_by(2) {
        tree.add(key);
    }
    tree
}

#[test]
fn sequential_load_packs_leaves() {
    let tree = even_keys(4, 24);

    assert_eq!(tree.height(), 2);
    let stats = tree.statistics();
    assert_eq!((stats[0].node_count, stats[0].key_count), (1, 3));
    assert_eq!((stats[1].node_count, stats[1].key_count), (4, 12));
    tree.sanity_check().unwrap();
}

#[test]
fn leaf_split_promotes_into_a_new_root() {
    let mut tree = even_keys(4, 24);
    assert_eq!(tree.add(17), Insertion { index: 8, is_new_key: true });

    assert_eq!(tree.height(), 3);
    let stats = tree.statistics();
    assert_eq!((stats[0].node_count, stats[0].key_count), (1, 1));
    assert_eq!(stats[1].node_count, 2);
    assert_eq!(tree.greater_than_or_equal(&17), Some((&17, &())));
    tree.sanity_check().unwrap();
}

#[test]
fn rightmost_leaf_may_run_light() {
    let mut tree = even_keys(6, 92);
    let height = tree.height();

    assert_eq!(tree.remove(&92), Some((92, ())));
    assert_eq!(tree.height(), height);
    assert_eq!(tree.last(), Some((&90, &())));
    let leaves = tree.statistics().pop().unwrap();
    assert_eq!((leaves.node_count, leaves.key_count), (9, 45));
    tree.sanity_check().unwrap();

    // Shrinking the last leaf below half never borrows from its neighbor.
    for key in [90, 88, 86] {
        tree.remove(&key);
        tree.sanity_check().unwrap();
    }
    let leaves = tree.statistics().pop().unwrap();
    assert_eq!((leaves.node_count, leaves.key_count), (9, 42));
}

#[test]
fn skip_matches_discarding() {
    let tree: RankedTree<u32, u32> = (0..500).map(|k| (k, k * k)).collect();

    for k in [0, 1, 7, 127, 128, 499, 500, 600] {
        let skipped: Vec<_> = tree.iter().skip(k).collect();
        let discarded: Vec<_> = tree.iter().collect::<Vec<_>>().into_iter().skip(k).collect();
        assert_eq!(skipped, discarded);
    }
}

#[test]
fn mutation_invalidates_open_enumerator() {
    let mut tree: RankedTree<i32> = (0..100).map(|k| (k, ())).collect();
    let mut cursor = tree.enumerate();
    assert_eq!(cursor.move_next(&tree), Ok(Some((&0, &()))));

    assert!(tree.remove(&50).is_some());
    assert_eq!(cursor.move_next(&tree), Err(Error::ConcurrentModification));

    // A failed lookup is not a mutation.
    cursor.reset(&tree);
    assert!(tree.remove(&50).is_none());
    assert_eq!(cursor.move_next(&tree), Ok(Some((&0, &()))));

    // Handing out a mutable value is.
    let mut values: RankedTree<i32, i32> = (0..10).map(|k| (k, k)).collect();
    let mut cursor = values.enumerate_reverse();
    if let Some((_, value)) = values.get_by_index_mut(3) {
        *value = -1;
    }
    assert_eq!(cursor.move_next(&values), Err(Error::ConcurrentModification));
}

// ─── Public surface ──────────────────────────────────────────────────────────

#[test]
fn custom_comparer_orders_descending() {
    let mut tree = RankedTree::with_order_and_comparer(4, CompareFn(|a: &i32, b: &i32| b.cmp(a))).unwrap();
    for key in 0..50 {
        tree.insert(key, key.to_string());
    }

    assert_eq!(tree.first(), Some((&49, &"49".to_string())));
    assert_eq!(tree.find(&0), Ok(49));
    assert_eq!(tree.less_than(&10).map(|(k, _)| *k), Some(11));
    assert_eq!(tree.range(30..=25).map(|(k, _)| *k).collect::<Vec<_>>(), [30, 29, 28, 27, 26, 25]);
    tree.sanity_check().unwrap();
}

#[test]
fn errors_are_reported_without_side_effects() {
    let mut tree: RankedTree<&str, i32> = [("a", 1), ("b", 2)].into();
    let stage = tree.stage();

    assert_eq!(
        tree.remove_at(2),
        Err(Error::InvalidArgument {
            name: "index",
            reason: "must be less than the element count"
        })
    );
    assert!(matches!(tree.element_at(5), Err(Error::InvalidArgument { .. })));
    assert_eq!(tree.value_of(&"z"), Err(Error::KeyNotFound));
    assert_eq!(tree.stage(), stage);
    assert_eq!(Error::KeyNotFound.to_string(), "key not found");
}

#[test]
fn rank_indexing_reads_and_writes() {
    let mut tree = RankedTree::from([("x", 1), ("y", 2), ("z", 3)]);

    assert_eq!(tree[Rank(2)], 3);
    tree[Rank(0)] = 10;
    assert_eq!(tree.get(&"x"), Some(&10));
    assert_eq!(tree.index_of_value(&2), Some(1));
}

#[test]
fn bulk_removal_by_predicate() {
    let mut tree: RankedTree<i32, i32> = (0..200).map(|k| (k % 20, k)).collect();

    assert_eq!(tree.remove_where(|&k, _| k < 5), 50);
    assert_eq!(tree.len(), 150);
    assert_eq!(tree.first().map(|(k, _)| *k), Some(5));

    tree.retain(|_, v| *v % 2 == 0);
    assert_eq!(tree.len(), 70);
    assert!(tree.values().all(|v| v % 2 == 0));
    tree.sanity_check().unwrap();
}

#[test]
fn clone_and_equality() {
    let tree: RankedTree<i32, char> = (0..30).map(|k| (k, 'v')).collect();
    let mut copy = tree.clone();
    assert_eq!(copy, tree);

    copy.replace(3, 'w');
    assert_ne!(copy, tree);
    assert_eq!(format!("{:?}", RankedTree::from([(1, 'a')])), "{1: 'a'}");

    let owned: Vec<(i32, char)> = tree.into_iter().take(2).collect();
    assert_eq!(owned, [(0, 'v'), (1, 'v')]);
}
