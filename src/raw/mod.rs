mod arena;
mod check;
mod handle;
mod node;
mod node_vector;
mod raw_tree;

pub(crate) use handle::Handle;
pub(crate) use node::{DEFAULT_ORDER, Edge, MAX_ORDER, MIN_ORDER};
pub(crate) use raw_tree::RawTree;
