//! Object tree
//!
//! The tree model the mutator works against: node payloads, sibling ordering and the
//! item arena with its event queue.

pub mod node;
pub mod sort;
pub mod widget;

pub use node::{render_label, NodeData};
pub use widget::{BranchSnapshot, Tree, TreeEvent};
