//! specdex-core - Core library for spec-tree indexing
//!
//! This crate provides the pure building blocks for keeping an in-memory,
//! hierarchically organized view of a tree of spec documents:
//!
//! - Parsing and validating hierarchical identifiers (`E01-F02-T01`)
//! - Extracting YAML frontmatter metadata from raw documents, with
//!   resilient recovery for malformed blocks
//! - The [`SpecRegistry`]: an id-keyed arena plus a derived children index,
//!   with bottom-up status aggregation re-evaluated on every mutation
//! - On-demand [`TreeNode`] projections for read-only consumers
//!
//! Everything here is synchronous, I/O-free, and side-effect-free except
//! for the registry's own maps; discovery, file watching, and the async
//! boundary API live in the `specdex` crate.
//!
//! # Parsing a document
//!
//! ```
//! use specdex_core::{SpecRecord, SpecLevel};
//!
//! let raw = "---\nid: T01\nkind: task\nparent: E01-F02\nstatus: draft\n---\nBody.\n";
//! let record = SpecRecord::build("specs/t01.md", None, raw).unwrap();
//! assert_eq!(record.id.to_string(), "E01-F02-T01");
//! assert_eq!(record.id.level(), SpecLevel::Task);
//! assert_eq!(record.id.depth(), 2);
//! ```
//!
//! # Registering and querying
//!
//! ```
//! use specdex_core::{SpecRecord, SpecRegistry, SpecStatus, UpsertOutcome};
//!
//! let mut registry = SpecRegistry::new();
//! let epic = SpecRecord::build(
//!     "specs/e01.md",
//!     None,
//!     "---\nid: E01\nkind: epic\nstatus: completed\n---\n",
//! )
//! .unwrap();
//! assert!(matches!(registry.upsert(epic), UpsertOutcome::Inserted));
//!
//! let tree = registry.get_tree(None).unwrap();
//! assert_eq!(tree.children.len(), 1);
//! assert_eq!(tree.status, SpecStatus::Completed);
//! ```

mod error;
mod frontmatter;
mod metadata;
mod registry;
mod spec_id;
mod tree;

pub use error::{ParseIssue, RegistryError};
pub use frontmatter::{ParsedDocument, content_checksum, parse_document};
pub use metadata::{Metadata, Priority, SpecStatus};
pub use registry::{SpecRecord, SpecRegistry, UpsertOutcome};
pub use spec_id::{IdError, Segment, SpecId, SpecLevel};
pub use tree::TreeNode;
