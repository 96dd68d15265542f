//! The engine: the boundary API every collaborator reads from.
//!
//! Owns one registry instance behind a single `RwLock` scoped to whole
//! upsert/delete operations, so readers never observe the two maps
//! mid-surgery. The loader and the watcher both feed the same
//! parse/resolve/upsert pipeline ([`Engine::apply_change`]); change
//! notifications fan out over a broadcast channel, fire-and-forget, so a
//! slow subscriber never backpressures the watcher.

use eyre::Result;
use specdex_core::{SpecId, SpecRecord, SpecRegistry, SpecStatus, TreeNode, UpsertOutcome};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

use crate::config::Config;
use crate::loader::{self, LoadReport};
use crate::watcher::{self, WatcherHandle};

/// Capacity of the notification fan-out channel. Subscribers that lag past
/// this many events observe a `Lagged` gap rather than blocking anyone.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// What happened to a record, as seen by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One change notification, emitted once per settled logical change.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    pub id: SpecId,
    pub kind: ChangeKind,
}

/// Health/introspection snapshot.
#[derive(Debug, Clone)]
pub struct Stats {
    pub record_count: usize,
    pub error_count: usize,
    pub last_change_at: Option<SystemTime>,
}

/// One registry plus the machinery that keeps it current.
///
/// Explicit instance, explicit teardown: tests construct as many
/// independent engines as they like, and dropping the engine (after
/// shutting down its watcher) drops the maps.
pub struct Engine {
    config: Config,
    registry: RwLock<SpecRegistry>,
    change_tx: broadcast::Sender<ChangeNotice>,
    /// Millis since epoch of the last emitted change; 0 = none yet.
    last_change_ms: AtomicU64,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            config,
            registry: RwLock::new(SpecRegistry::new()),
            change_tx,
            last_change_ms: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// One-shot bulk load of the whole tree. Holds the write lock for the
    /// registration pass; parsing runs on the rayon pool first.
    pub async fn initial_load(&self) -> Result<LoadReport> {
        let mut registry = self.registry.write().await;
        loader::load(&mut registry, &self.config)
    }

    /// O(1) record lookup.
    pub async fn get(&self, id: &SpecId) -> Option<SpecRecord> {
        self.registry.read().await.get(id).cloned()
    }

    /// Children of a node in deterministic sibling order.
    pub async fn get_children(&self, id: &SpecId) -> Vec<SpecRecord> {
        self.registry
            .read()
            .await
            .get_children(id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Tree projection; synthetic forest root when `root` is `None`.
    pub async fn get_tree(&self, root: Option<&SpecId>) -> Option<TreeNode> {
        self.registry.read().await.get_tree(root)
    }

    /// Aggregated status of a registered node.
    pub async fn status_of(&self, id: &SpecId) -> Option<SpecStatus> {
        self.registry.read().await.status_of(id)
    }

    pub async fn stats(&self) -> Stats {
        let registry = self.registry.read().await;
        Stats {
            record_count: registry.len(),
            error_count: registry.error_count(),
            last_change_at: self.last_change_at(),
        }
    }

    /// Subscribe to change notifications. Every subscriber receives the
    /// same stream independently; errors or lag in one never affect the
    /// others or the watcher.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.change_tx.subscribe()
    }

    /// Arm the file watcher. The returned handle keeps the watch alive;
    /// call [`WatcherHandle::shutdown`] to tear it down.
    pub fn watch(self: &Arc<Self>) -> Result<WatcherHandle> {
        watcher::spawn(Arc::clone(self))
    }

    /// Re-run the full pipeline for one on-disk path and upsert the result.
    /// Shared by the watcher and by embedders that learn about changes out
    /// of band. A path that no longer exists is treated as a removal.
    pub async fn apply_change(&self, path: &Path) -> Result<()> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return self.apply_removal(path).await;
            }
            Err(e) => {
                warn!("Could not read {}: {e}", path.display());
                return Ok(());
            }
        };

        let chain = loader::dir_chain(&self.config.root, path);
        let record = match SpecRecord::build(path, chain, &raw) {
            Ok(record) => record,
            Err(issue) => {
                warn!("Not registered {}: {issue}", path.display());
                return Ok(());
            }
        };
        let id = record.id.clone();

        let outcome = {
            let mut registry = self.registry.write().await;
            registry.upsert(record)
        };
        match outcome {
            UpsertOutcome::Inserted => self.emit(id, ChangeKind::Created),
            UpsertOutcome::Updated => self.emit(id, ChangeKind::Updated),
            UpsertOutcome::Unchanged => {
                debug!("Unchanged content for {}", path.display());
            }
            UpsertOutcome::Rejected(e) => {
                warn!("Rejected {}: {e}", path.display());
            }
        }
        Ok(())
    }

    /// Remove whatever record the given path owns, if any.
    pub async fn apply_removal(&self, path: &Path) -> Result<()> {
        let deleted = {
            let mut registry = self.registry.write().await;
            let Some(id) = registry.id_for_path(path).cloned() else {
                return Ok(());
            };
            registry.delete(&id).then_some(id)
        };
        if let Some(id) = deleted {
            self.emit(id, ChangeKind::Deleted);
        }
        Ok(())
    }

    fn emit(&self, id: SpecId, kind: ChangeKind) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.last_change_ms.store(now, Ordering::SeqCst);
        debug!("Change: {id} {kind:?}");
        // No receivers is fine; notifications are fire-and-forget.
        let _ = self.change_tx.send(ChangeNotice { id, kind });
    }

    fn last_change_at(&self) -> Option<SystemTime> {
        let ms = self.last_change_ms.load(Ordering::SeqCst);
        if ms == 0 {
            None
        } else {
            Some(UNIX_EPOCH + Duration::from_millis(ms))
        }
    }
}
