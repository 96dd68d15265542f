//! Live indexing engine for hierarchical spec-document trees.
//!
//! This crate wraps the pure data model from `specdex-core` with the I/O
//! shell a long-running embedder needs:
//!
//! - [`config`]: where the tree lives, which suffix counts, how long
//!   file-system events settle before processing.
//! - [`discovery`]: gitignore-aware enumeration of candidate documents.
//! - [`loader`]: one-shot bulk load with parallel parsing.
//! - [`engine`]: the boundary API — a registry behind a lock, queries,
//!   and a broadcast stream of change notifications.
//! - [`watcher`]: debounced file watching that keeps the registry current.
//! - [`observability`]: opt-in tracing subscriber setup for embedders.
//!
//! ```no_run
//! use specdex::{Config, Engine};
//! use std::sync::Arc;
//!
//! # async fn run() -> eyre::Result<()> {
//! let engine = Arc::new(Engine::new(Config::new("./specs")));
//! let report = engine.initial_load().await?;
//! println!("{} documents registered", report.total_registered);
//!
//! let mut notices = engine.subscribe();
//! let watcher = engine.watch()?;
//! while let Ok(notice) = notices.recv().await {
//!     println!("{} {:?}", notice.id, notice.kind);
//! }
//! watcher.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod engine;
pub mod loader;
pub mod observability;
pub mod watcher;

pub use config::Config;
pub use discovery::{Discovered, DiscoveryWarning};
pub use engine::{ChangeKind, ChangeNotice, Engine, Stats};
pub use loader::LoadReport;
pub use observability::init_tracing;
pub use watcher::{FsEvent, FsEventKind, WatcherHandle, WatcherState};

// The data model is the public vocabulary of every engine method, so
// re-export it wholesale.
pub use specdex_core::{
    Metadata, ParseIssue, Priority, SpecId, SpecLevel, SpecRecord, SpecRegistry, SpecStatus,
    TreeNode, UpsertOutcome,
};
