//! Change watcher: debounced incremental re-processing.
//!
//! Raw `notify` events are bridged onto a channel and collapsed by a
//! per-path debounce state machine before anything touches the registry.
//! Each path is conceptually Idle → PendingSettle → Processing → Idle:
//!
//! - any raw notification for an idle path starts its settle timer;
//! - further notifications while pending restart the timer and overwrite
//!   the remembered event kind (only the last observed kind is acted on,
//!   so a stale upsert can never land after a later delete);
//! - when the timer fires uninterrupted, the path is processed exactly
//!   once through the same parse/resolve/upsert pipeline the bulk load
//!   uses, and one change notification goes out.
//!
//! Events arriving while a path is being processed queue on the channel
//! and re-enter the pending state afterwards. There is at most one
//! deadline per path at any time; restarting overwrites it in place, so
//! timers never leak.

use eyre::{Result, WrapErr};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::discovery;
use crate::engine::Engine;

/// A raw file-system notification after suffix filtering, before debounce.
#[derive(Debug, Clone)]
pub struct FsEvent {
    pub path: PathBuf,
    pub kind: FsEventKind,
}

/// What the notification implies for the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    /// Create or modify; processing re-checks existence anyway.
    Upsert,
    Remove,
}

/// Shared state for monitoring watcher health.
///
/// Shared between the notify callback thread and the owning engine, so the
/// introspection surface can report on watcher liveness.
pub struct WatcherState {
    active: AtomicBool,
    event_count: AtomicU64,
    /// Millis since epoch of the last raw event; 0 = none yet.
    last_event_ms: AtomicU64,
    error: RwLock<Option<String>>,
}

impl WatcherState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicBool::new(false),
            event_count: AtomicU64::new(0),
            last_event_ms: AtomicU64::new(0),
            error: RwLock::new(None),
        })
    }

    fn mark_active(&self) {
        self.active.store(true, Ordering::SeqCst);
        *self.error.write().unwrap() = None;
    }

    fn mark_failed(&self, error: String) {
        self.active.store(false, Ordering::SeqCst);
        *self.error.write().unwrap() = Some(error);
    }

    fn record_event(&self) {
        self.event_count.fetch_add(1, Ordering::SeqCst);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.last_event_ms.store(now, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::SeqCst)
    }

    /// Millis since epoch of the last raw event, or `None` if no events.
    pub fn last_event_ms(&self) -> Option<u64> {
        let ms = self.last_event_ms.load(Ordering::SeqCst);
        if ms == 0 { None } else { Some(ms) }
    }

    pub fn error(&self) -> Option<String> {
        self.error.read().unwrap().clone()
    }
}

/// Keeps the watch alive; dropping or shutting down stops it.
pub struct WatcherHandle {
    // The OS watch is unregistered when this is dropped.
    _fs_watcher: RecommendedWatcher,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    state: Arc<WatcherState>,
}

impl WatcherHandle {
    pub fn state(&self) -> &Arc<WatcherState> {
        &self.state
    }

    /// Stop watching and wait for the debounce task to drain.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

/// Arm the watcher for the engine's configured root.
pub fn spawn(engine: Arc<Engine>) -> Result<WatcherHandle> {
    let state = WatcherState::new();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let extension = engine.config().extension.clone();
    let callback_state = Arc::clone(&state);
    let mut fs_watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        match result {
            Ok(event) => {
                let Some(kind) = classify(&event.kind) else {
                    return;
                };
                for path in event.paths {
                    if !discovery::has_extension(&path, &extension) {
                        continue;
                    }
                    callback_state.record_event();
                    // Fails only once the debounce task is gone.
                    let _ = event_tx.send(FsEvent { path, kind });
                }
            }
            Err(e) => callback_state.mark_failed(e.to_string()),
        }
    })
    .wrap_err("Failed to create file watcher")?;

    let root = engine.config().root.clone();
    fs_watcher
        .watch(&root, RecursiveMode::Recursive)
        .wrap_err_with(|| format!("Failed to watch {}", root.display()))?;
    state.mark_active();
    info!("Watching spec tree: {}", root.display());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let settle = engine.config().settle_window();
    let task = tokio::spawn(debounce_loop(engine, event_rx, shutdown_rx, settle));

    Ok(WatcherHandle {
        _fs_watcher: fs_watcher,
        shutdown_tx,
        task,
        state,
    })
}

fn classify(kind: &EventKind) -> Option<FsEventKind> {
    match kind {
        EventKind::Remove(_) => Some(FsEventKind::Remove),
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any | EventKind::Other => {
            Some(FsEventKind::Upsert)
        }
        EventKind::Access(_) => None,
    }
}

/// Last observed kind plus the settle deadline for one pending path.
#[derive(Debug, Clone, Copy)]
struct Pending {
    kind: FsEventKind,
    deadline: Instant,
}

/// The debounce core, factored out of [`spawn`] so synthetic event streams
/// can drive it under a paused clock in tests.
pub async fn debounce_loop(
    engine: Arc<Engine>,
    mut events: mpsc::UnboundedReceiver<FsEvent>,
    mut shutdown: watch::Receiver<bool>,
    settle: Duration,
) {
    let mut pending: HashMap<PathBuf, Pending> = HashMap::new();

    loop {
        let next_deadline = pending.values().map(|p| p.deadline).min();
        tokio::select! {
            _ = shutdown.changed() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                pending.insert(
                    event.path,
                    Pending {
                        kind: event.kind,
                        deadline: Instant::now() + settle,
                    },
                );
            }
            _ = sleep_until_next(next_deadline) => {
                let now = Instant::now();
                let due: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, p)| p.deadline <= now)
                    .map(|(path, _)| path.clone())
                    .collect();
                for path in due {
                    let Some(entry) = pending.remove(&path) else {
                        continue;
                    };
                    process(&engine, &path, entry.kind).await;
                }
            }
        }
    }
    debug!("Debounce loop stopped");
}

async fn sleep_until_next(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        // Nothing pending: park until an event arms a deadline.
        None => std::future::pending().await,
    }
}

async fn process(engine: &Engine, path: &Path, kind: FsEventKind) {
    let result = match kind {
        FsEventKind::Upsert => engine.apply_change(path).await,
        FsEventKind::Remove => engine.apply_removal(path).await,
    };
    if let Err(e) = result {
        warn!("Failed to process {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::ChangeKind;
    use std::fs;
    use tokio::time::{advance, sleep};

    fn epic_doc(status: &str) -> String {
        format!("---\nid: E01\nkind: epic\nstatus: {status}\n---\n")
    }

    struct Harness {
        engine: Arc<Engine>,
        event_tx: mpsc::UnboundedSender<FsEvent>,
        shutdown_tx: watch::Sender<bool>,
        task: JoinHandle<()>,
    }

    fn start(root: &Path, settle: Duration) -> Harness {
        let engine = Arc::new(Engine::new(Config::new(root)));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(debounce_loop(
            Arc::clone(&engine),
            event_rx,
            shutdown_rx,
            settle,
        ));
        Harness {
            engine,
            event_tx,
            shutdown_tx,
            task,
        }
    }

    impl Harness {
        fn send(&self, path: &Path, kind: FsEventKind) {
            self.event_tx
                .send(FsEvent {
                    path: path.to_path_buf(),
                    kind,
                })
                .expect("debounce loop alive");
        }

        async fn stop(self) {
            let _ = self.shutdown_tx.send(true);
            let _ = self.task.await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_events_collapses_to_one_notification() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("e01.md");
        fs::write(&path, epic_doc("draft")).expect("write");

        let harness = start(dir.path(), Duration::from_millis(100));
        harness.engine.apply_change(&path).await.expect("seed");
        let mut notices = harness.engine.subscribe();

        // An editor save storm: three raw events within 50ms for one path,
        // content settled on a new status.
        fs::write(&path, epic_doc("in_progress")).expect("write");
        harness.send(&path, FsEventKind::Upsert);
        sleep(Duration::from_millis(25)).await;
        harness.send(&path, FsEventKind::Upsert);
        sleep(Duration::from_millis(25)).await;
        harness.send(&path, FsEventKind::Upsert);

        // Let the settle window elapse once, uninterrupted.
        sleep(Duration::from_millis(150)).await;

        let notice = notices.try_recv().expect("exactly one notice");
        assert_eq!(notice.kind, ChangeKind::Updated);
        assert_eq!(notice.id.to_string(), "E01");
        assert!(notices.try_recv().is_err(), "no redundant notifications");

        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn events_keep_restarting_the_settle_timer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("e01.md");
        fs::write(&path, epic_doc("draft")).expect("write");

        let harness = start(dir.path(), Duration::from_millis(100));
        let mut notices = harness.engine.subscribe();

        // Events every 60ms: each restarts the 100ms window, so nothing
        // processes until the stream goes quiet.
        for _ in 0..4 {
            harness.send(&path, FsEventKind::Upsert);
            sleep(Duration::from_millis(60)).await;
            assert!(notices.try_recv().is_err());
        }
        sleep(Duration::from_millis(120)).await;
        assert!(notices.try_recv().is_ok());

        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn last_observed_kind_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("e01.md");
        fs::write(&path, epic_doc("draft")).expect("write");

        let harness = start(dir.path(), Duration::from_millis(100));
        harness.engine.apply_change(&path).await.expect("seed");
        let mut notices = harness.engine.subscribe();

        // A modify burst that ends in a delete must act on the delete.
        fs::remove_file(&path).expect("remove");
        harness.send(&path, FsEventKind::Upsert);
        sleep(Duration::from_millis(10)).await;
        harness.send(&path, FsEventKind::Remove);
        sleep(Duration::from_millis(150)).await;

        let notice = notices.try_recv().expect("one notice");
        assert_eq!(notice.kind, ChangeKind::Deleted);
        assert!(notices.try_recv().is_err());
        assert_eq!(harness.engine.stats().await.record_count, 0);

        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_paths_settle_independently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("e01.md");
        let b = dir.path().join("e02.md");
        fs::write(&a, epic_doc("draft")).expect("write");
        fs::write(&b, "---\nid: E02\nkind: epic\n---\n").expect("write");

        let harness = start(dir.path(), Duration::from_millis(100));
        let mut notices = harness.engine.subscribe();

        harness.send(&a, FsEventKind::Upsert);
        sleep(Duration::from_millis(50)).await;
        // Touching b must not delay a's already-running window.
        harness.send(&b, FsEventKind::Upsert);
        sleep(Duration::from_millis(60)).await;

        let first = notices.recv().await.expect("first notice");
        assert_eq!(first.id.to_string(), "E01");
        sleep(Duration::from_millis(60)).await;
        let second = notices.recv().await.expect("second notice");
        assert_eq!(second.id.to_string(), "E02");

        harness.stop().await;
    }

    #[test]
    fn watcher_state_lifecycle() {
        let state = WatcherState::new();
        assert!(!state.is_active());
        assert!(state.error().is_none());
        assert_eq!(state.event_count(), 0);
        assert!(state.last_event_ms().is_none());

        state.mark_active();
        assert!(state.is_active());

        state.record_event();
        state.record_event();
        assert_eq!(state.event_count(), 2);
        assert!(state.last_event_ms().is_some());

        state.mark_failed("watch backend gone".to_string());
        assert!(!state.is_active());
        assert_eq!(state.error(), Some("watch backend gone".to_string()));

        state.mark_active();
        assert!(state.error().is_none());
    }

    #[test]
    fn classify_maps_event_kinds() {
        use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            Some(FsEventKind::Upsert)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Any)),
            Some(FsEventKind::Upsert)
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::File)),
            Some(FsEventKind::Remove)
        );
        assert_eq!(classify(&EventKind::Access(AccessKind::Any)), None);
    }
}
