//! Normalized spec metadata.
//!
//! The metadata block of a spec document is weakly typed on disk; this
//! module defines the closed set of fields specdex interprets, with
//! explicit defaults for the optional ones. Anything outside the schema is
//! preserved opaquely in [`Metadata::extra`] and never interpreted.

use crate::spec_id::SpecLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Workflow status of a spec document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SpecStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
    Blocked,
}

impl Display for SpecStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SpecStatus::Draft => "draft",
            SpecStatus::InProgress => "in_progress",
            SpecStatus::Completed => "completed",
            SpecStatus::Blocked => "blocked",
        };
        f.write_str(name)
    }
}

/// Priority of a spec document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// The normalized metadata record extracted from a document's frontmatter.
///
/// `id` and `kind` are required for registration but optional here: the
/// parser always produces a usable value and lets validation decide whether
/// the document can be registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Local identifier, unique within its directory (`T01`).
    pub id: Option<String>,
    /// Human-readable title.
    pub title: Option<String>,
    /// Document kind; must agree with the id's segment letter.
    pub kind: Option<SpecLevel>,
    /// Workflow status, `draft` when absent.
    pub status: SpecStatus,
    /// Priority, `medium` when absent.
    pub priority: Priority,
    /// Creation timestamp, kept as written.
    pub created_at: Option<String>,
    /// Last-update timestamp, kept as written.
    pub updated_at: Option<String>,
    /// Explicitly declared parent hierarchical id. When absent the parent
    /// is inferred from the document's position in the tree.
    pub parent: Option<String>,
    /// Explicitly declared child ids, informational only.
    pub children: Vec<String>,
    /// Estimated effort in hours.
    pub estimated_hours: Option<f64>,
    /// Actual effort in hours.
    pub actual_hours: Option<f64>,
    /// Keys outside the schema, preserved but never interpreted.
    pub extra: BTreeMap<String, serde_yaml::Value>,
}
