//! Read-only tree projection over the registry.
//!
//! The tree is always derived on demand from `by_id` + `children_of`;
//! nothing downstream mutates through it, so ownership stays flat and
//! acyclic no matter how the underlying maps change.

use crate::metadata::SpecStatus;
use crate::registry::{SpecRecord, SpecRegistry};
use crate::spec_id::SpecId;

/// One node of the projected tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// `None` only for the synthetic forest root.
    pub record: Option<SpecRecord>,
    /// Aggregated status at this node.
    pub status: SpecStatus,
    /// Children in deterministic sibling order.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Total number of real records under (and including) this node.
    pub fn record_count(&self) -> usize {
        usize::from(self.record.is_some())
            + self.children.iter().map(TreeNode::record_count).sum::<usize>()
    }
}

impl SpecRegistry {
    /// Project the tree rooted at `root`, or a synthetic forest root over
    /// all top-level epics when no root is given. Returns `None` for an
    /// unregistered root id.
    pub fn get_tree(&self, root: Option<&SpecId>) -> Option<TreeNode> {
        match root {
            Some(id) => {
                self.get(id)?;
                Some(self.project(id))
            }
            None => {
                let children: Vec<TreeNode> = self
                    .roots()
                    .iter()
                    .map(|record| self.project(&record.id))
                    .collect();
                let status = forest_status(&children);
                Some(TreeNode {
                    record: None,
                    status,
                    children,
                })
            }
        }
    }

    fn project(&self, id: &SpecId) -> TreeNode {
        let children = self
            .children_of
            .get(id)
            .into_iter()
            .flatten()
            .filter(|child| self.by_id.contains_key(child))
            .map(|child| self.project(child))
            .collect();
        TreeNode {
            record: self.by_id.get(id).cloned(),
            status: self.status_of(id).unwrap_or_default(),
            children,
        }
    }
}

/// Same children rule as the registry rollup, applied to the epics.
fn forest_status(epics: &[TreeNode]) -> SpecStatus {
    if epics.is_empty() {
        return SpecStatus::Draft;
    }
    if epics.iter().all(|n| n.status == SpecStatus::Completed) {
        SpecStatus::Completed
    } else if epics.iter().any(|n| n.status != SpecStatus::Draft) {
        SpecStatus::InProgress
    } else {
        SpecStatus::Draft
    }
}
