//! Initial bulk load: discovery, parallel parsing, serialized registration.
//!
//! Parsing is a pure function of file content, so the per-file work fans
//! out across the rayon pool; every result is then handed to the single
//! registry-mutating path in deterministic (sorted) order. One bad file
//! never blocks the rest of the corpus — only a missing base directory is
//! fatal.

use eyre::Result;
use rayon::prelude::*;
use specdex_core::{ParseIssue, SpecId, SpecRecord, SpecRegistry, UpsertOutcome};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::Config;
use crate::discovery;

/// What one bulk load did.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_found: usize,
    pub total_registered: usize,
    pub total_failed: usize,
    pub duration: Duration,
}

/// Discover, parse, and register every document under the configured root.
///
/// Idempotent against an unchanged tree: upsert is identity-keyed and
/// short-circuits on matching checksums, so re-running re-validates without
/// duplicating entries.
pub fn load(registry: &mut SpecRegistry, config: &Config) -> Result<LoadReport> {
    let start = Instant::now();

    if !config.root.is_dir() {
        eyre::bail!(
            "spec root {} is not a readable directory",
            config.root.display()
        );
    }

    let discovered = discovery::scan(config);
    let total_found = discovered.paths.len();

    // Parallel compute, serialized write: collect preserves input order.
    let parsed: Vec<(PathBuf, Result<SpecRecord, ParseIssue>)> = discovered
        .paths
        .into_par_iter()
        .map(|path| {
            let outcome = match std::fs::read_to_string(&path) {
                Ok(raw) => SpecRecord::build(&path, dir_chain(&config.root, &path), &raw),
                Err(e) => Err(ParseIssue::Unreadable(e.to_string())),
            };
            (path, outcome)
        })
        .collect();

    let mut total_registered = 0;
    let mut total_failed = 0;
    for (path, outcome) in parsed {
        match outcome {
            Ok(record) => match registry.upsert(record) {
                UpsertOutcome::Rejected(e) => {
                    warn!("Not registered {}: {e}", path.display());
                    total_failed += 1;
                }
                _ => total_registered += 1,
            },
            Err(issue) => {
                warn!("Not registered {}: {issue}", path.display());
                total_failed += 1;
            }
        }
    }

    let duration = start.elapsed();
    info!(
        "Loaded {} of {} documents in {:?} ({} failed)",
        total_registered, total_found, duration, total_failed
    );

    Ok(LoadReport {
        total_found,
        total_registered,
        total_failed,
        duration,
    })
}

/// Hierarchical id implied by a file's directory placement under the root
/// (`E01/F01/T03/spec.md` → `E01-F01-T03`). `None` when any directory
/// component is not a valid next segment; the metadata's declared parent
/// then carries the placement on its own.
pub(crate) fn dir_chain(root: &Path, path: &Path) -> Option<SpecId> {
    let rel = path.strip_prefix(root).ok()?;
    let mut chain: Option<SpecId> = None;
    for component in rel.parent()?.components() {
        let segment = component.as_os_str().to_str()?;
        chain = Some(SpecId::join(chain.as_ref(), segment).ok()?);
    }
    chain
}
