//! The decision tree engine: pure, single-threaded functions over in-memory
//! records.
//!
//! Four cooperating pieces:
//! 1. `gain`: entropy and gain-ratio scoring of candidate attributes.
//! 2. `builder`: recursive partitioning into a `TreeNode`, with a training trace.
//! 3. `predict`: walking a tree for one record, with the decision path.
//! 4. `visualize`: indented text diagrams of a tree and of the trace.
//!
//! The tree is built once per training call and only read afterwards.

mod builder;
pub mod gain;
mod predict;
mod visualize;

pub use builder::{build_tree, TraceEntry, TreeBuilder};
pub use gain::{
    entropy, find_best_attribute, gain_ratio_categorical, gain_ratio_continuous, AttributeScore, AttributeSelection,
};
pub use predict::{predict, predict_all, PathStep, Prediction};
pub use visualize::{format_trace, visualize, visualize_detailed};
