//! C4.5-style decision trees for scholarship eligibility screening.
//!
//! Records are flat attribute maps with a class label. Training picks splits
//! by gain ratio, with numeric thresholds for continuous attributes and one
//! branch per observed value for categorical ones. Every prediction carries
//! the path of conditions that produced it.

pub mod config;
pub mod cpu_time;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod model;
pub mod results;
pub mod tree;
pub mod utils;

pub use config::{AttributeKind, AttributeSchema, EngineConfig};
pub use dataset::{Dataset, Record, Value};
pub use engine::{build_tree, predict, visualize, Prediction};
pub use error::EngineError;
pub use evaluate::{cross_validate, evaluate};
pub use model::{DecisionTreeModel, ModelHandle};
pub use tree::TreeNode;
