//! A rank-indexed B+ tree for Rust.
//!
//! This crate provides [`RankedTree`], an ordered collection that keeps equal
//! keys in insertion order and answers positional queries in O(log n):
//!
//! - [`get_by_index`](RankedTree::get_by_index) - Get the element at a given sorted position
//! - [`find`](RankedTree::find) - Get the position of a key, or where it would go
//! - [`remove_at`](RankedTree::remove_at) - Remove by position
//! - Indexing by [`Rank`] - e.g., `tree[Rank(0)]` for the first element
//!
//! # Example
//!
//! ```
//! use ranked_bptree::{RankedTree, Rank};
//!
//! let mut scores = RankedTree::new();
//! scores.insert(100, "Alice");
//! scores.insert(85, "Bob");
//! scores.insert(92, "Carol");
//!
//! // Elements are ordered by key
//! assert_eq!(scores.first(), Some((&85, &"Bob")));
//!
//! // Order-statistic operations (O(log n))
//! assert_eq!(scores.get_by_index(1), Some((&92, &"Carol")));
//! assert_eq!(scores.find(&100), Ok(2));
//! assert_eq!(scores[Rank(0)], "Bob");
//!
//! // Iteration follows the leaf chain, skipping by position
//! let tail: Vec<_> = scores.keys().skip(1).copied().collect();
//! assert_eq!(tail, [92, 100]);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`
//! - **Duplicate keys** - Equal keys are kept in insertion order, so the tree doubles as a bag or multimap
//! - **Custom ordering** - Any [`Comparer`], including closures via [`CompareFn`]
//! - **Stale cursor detection** - Detached [`Enumerator`]s fail with [`Error::ConcurrentModification`]
//!   once the tree changes under them
//! - **`tracing`** (default) - Structural events (root growth, splits, merges) are logged through `tracing`
//!
//! # Implementation
//!
//! Elements live in leaves linked into a doubly linked chain; branches hold
//! pivot keys plus a weight, the element count of their subtree, which turns
//! a position into a single root-to-leaf descent. Nodes live in a
//! generational arena and refer to each other by handle.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod comparer;
mod error;
mod order_statistic;
mod raw;

pub mod ranked_tree;

pub use comparer::{CompareFn, Comparer, NaturalOrder};
pub use error::{Error, Result};
pub use order_statistic::Rank;
pub use ranked_tree::{Enumerator, Insertion, IntoIter, Iter, Keys, LevelStats, RankedTree, Values};
