//! The join tree: nodes, per-relation tree nodes and the manager that
//! resolves path expressions into them.

mod manager;
mod node;

pub use manager::{JoinManager, ResolveOptions};
pub use node::{JoinNode, JoinNodeId, JoinTreeNode, JoinType};

pub(crate) use manager::{
    CorrelatedPath, ResolveLevel, explicit_join, resolve_correlated_root, resolve_path,
};
