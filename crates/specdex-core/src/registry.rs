//! The authoritative in-memory spec registry.
//!
//! Two maps carry all state: `by_id` (the arena, keyed by hierarchical id)
//! and `children_of` (a derived back-reference index, mutated only here).
//! Every mutation goes through [`SpecRegistry::upsert`] or
//! [`SpecRegistry::delete`], which keep the two maps consistent and
//! recompute the bottom-up status rollup for every affected ancestor.
//! Both operations are total over well-formed input; rejections are values,
//! not panics.

use crate::error::{ParseIssue, RegistryError};
use crate::frontmatter::{content_checksum, parse_document};
use crate::metadata::{Metadata, SpecStatus};
use crate::spec_id::{SpecId, SpecLevel};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The registry's unit of truth for one spec document.
#[derive(Debug, Clone)]
pub struct SpecRecord {
    /// Hierarchical id, globally unique, the registry's primary key.
    pub id: SpecId,
    pub metadata: Metadata,
    pub body: String,
    pub source_path: PathBuf,
    /// Checksum of the full raw content, gates change detection.
    pub checksum: String,
    pub parsed_at: SystemTime,
    /// Recovery annotation, if the parser or resolver degraded gracefully.
    pub issue: Option<ParseIssue>,
}

impl SpecRecord {
    /// Run the full parse/validate/resolve pipeline on one raw document.
    ///
    /// `dir_chain` is the hierarchical id implied by the file's directory
    /// placement (e.g. `E01-F02-T01` for `E01/F02/T01/spec.md`), used when
    /// the metadata declares no explicit parent. Fatal issues (missing
    /// `id`/`kind`, malformed id, kind mismatch) return `Err` and the
    /// document must not be registered; recoverable ones come back inside
    /// the record.
    pub fn build(
        source_path: impl Into<PathBuf>,
        dir_chain: Option<SpecId>,
        raw: &str,
    ) -> Result<SpecRecord, ParseIssue> {
        let checksum = content_checksum(raw);
        let parsed = parse_document(raw);

        let local = parsed
            .metadata
            .id
            .clone()
            .ok_or(ParseIssue::MissingRequiredField("id"))?;
        let kind = parsed
            .metadata
            .kind
            .ok_or(ParseIssue::MissingRequiredField("kind"))?;

        let declared_parent = match parsed.metadata.parent.as_deref() {
            Some(p) => Some(SpecId::parse(p)?),
            None => None,
        };

        let id = match (&declared_parent, &dir_chain) {
            // An explicit parent always wins over directory placement.
            (Some(parent), _) => SpecId::join(Some(parent), &local)?,
            // The file sits inside its own directory (`E01/F01/T03/spec.md`).
            (None, Some(chain)) if chain.local() == local => chain.clone(),
            // The id field already carries the full hierarchical path.
            (None, _) if local.contains('-') => SpecId::parse(&local)?,
            // The file sits directly inside its parent's directory.
            (None, chain) => SpecId::join(chain.as_ref(), &local)?,
        };

        if id.level() != kind {
            return Err(ParseIssue::KindMismatch {
                kind,
                level: id.level(),
            });
        }

        Ok(SpecRecord {
            id,
            metadata: parsed.metadata,
            body: parsed.body,
            source_path: source_path.into(),
            checksum,
            parsed_at: SystemTime::now(),
            issue: parsed.issue,
        })
    }

    /// This document's own status folded into rollup terms: anything that
    /// is neither draft nor completed counts as in-progress at the parent.
    fn rollup_status(&self) -> SpecStatus {
        match self.metadata.status {
            SpecStatus::Completed => SpecStatus::Completed,
            SpecStatus::Draft => SpecStatus::Draft,
            SpecStatus::InProgress | SpecStatus::Blocked => SpecStatus::InProgress,
        }
    }
}

/// What an upsert did.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Same path, same checksum: registry state is untouched and no change
    /// notification should be emitted.
    Unchanged,
    Rejected(RegistryError),
}

/// In-memory store of all registered spec records plus derived indices.
///
/// Synchronous and single-writer by design; embedders serialize mutations
/// behind one lock scoped to the whole operation so the two maps are never
/// observed mid-surgery.
#[derive(Debug, Default)]
pub struct SpecRegistry {
    pub(crate) by_id: HashMap<SpecId, SpecRecord>,
    pub(crate) children_of: HashMap<SpecId, BTreeSet<SpecId>>,
    by_path: HashMap<PathBuf, SpecId>,
    derived: HashMap<SpecId, SpecStatus>,
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update one record.
    ///
    /// Identity is by id, not by path: a second path claiming a registered
    /// id is rejected (first writer wins). A path whose document changed
    /// its id gets its stale entry removed first, so parent changes relink
    /// `children_of` with no duplicates left anywhere. Ancestor statuses
    /// are recomputed bottom-up on every accepted mutation.
    pub fn upsert(&mut self, mut record: SpecRecord) -> UpsertOutcome {
        if let Some(existing) = self.by_id.get(&record.id) {
            if existing.source_path != record.source_path {
                return UpsertOutcome::Rejected(RegistryError::DuplicateId {
                    id: record.id.clone(),
                    existing: existing.source_path.clone(),
                });
            }
            if existing.checksum == record.checksum {
                return UpsertOutcome::Unchanged;
            }
        }

        // The same file previously registered under a different id (its
        // declared parent or local id changed): detach the stale entry.
        if let Some(old_id) = self.by_path.get(&record.source_path).cloned() {
            if old_id != record.id {
                self.delete(&old_id);
            }
        }

        let id = record.id.clone();
        let path = record.source_path.clone();
        let parent = id.parent();

        if let Some(p) = &parent {
            if !self.by_id.contains_key(p) && record.issue.is_none() {
                record.issue = Some(ParseIssue::OrphanedParent(p.to_string()));
            }
            self.children_of
                .entry(p.clone())
                .or_default()
                .insert(id.clone());
        }

        let updated = self.by_id.insert(id.clone(), record).is_some();
        self.by_path.insert(path, id.clone());

        // Adopt any children that registered before this node existed.
        if let Some(children) = self.children_of.get(&id) {
            let orphans: Vec<SpecId> = children.iter().cloned().collect();
            for child_id in orphans {
                if let Some(child) = self.by_id.get_mut(&child_id) {
                    if matches!(child.issue, Some(ParseIssue::OrphanedParent(_))) {
                        child.issue = None;
                    }
                }
            }
        }

        self.recompute_status_from(&id);

        if updated {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        }
    }

    /// Remove one record. Descendants stay registered but detached: they
    /// remain reachable by direct id lookup, and their children set stays
    /// keyed under the now-absent parent so a reappearing parent adopts
    /// them again.
    pub fn delete(&mut self, id: &SpecId) -> bool {
        let Some(record) = self.by_id.remove(id) else {
            return false;
        };
        self.by_path.remove(&record.source_path);
        self.derived.remove(id);

        if let Some(parent) = id.parent() {
            if let Some(set) = self.children_of.get_mut(&parent) {
                set.remove(id);
                if set.is_empty() {
                    self.children_of.remove(&parent);
                }
            }
            self.recompute_status_from(&parent);
        }
        true
    }

    /// O(1) lookup by hierarchical id.
    pub fn get(&self, id: &SpecId) -> Option<&SpecRecord> {
        self.by_id.get(id)
    }

    /// Children of a node in deterministic sibling order.
    pub fn get_children(&self, id: &SpecId) -> Vec<&SpecRecord> {
        self.children_of
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.by_id.get(child))
            .collect()
    }

    /// All registered top-level epics in order.
    pub fn roots(&self) -> Vec<&SpecRecord> {
        let mut epics: Vec<&SpecRecord> = self
            .by_id
            .values()
            .filter(|r| r.id.level() == SpecLevel::Epic)
            .collect();
        epics.sort_by(|a, b| a.id.cmp(&b.id));
        epics
    }

    /// The aggregated (bottom-up) status of a registered node.
    pub fn status_of(&self, id: &SpecId) -> Option<SpecStatus> {
        self.derived.get(id).copied()
    }

    /// The id currently registered from a source path, if any.
    pub fn id_for_path(&self, path: &Path) -> Option<&SpecId> {
        self.by_path.get(path)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Number of registered records carrying a recovery annotation.
    pub fn error_count(&self) -> usize {
        self.by_id.values().filter(|r| r.issue.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpecRecord> {
        self.by_id.values()
    }

    /// Referential-integrity sweep over the derived index: every member of
    /// every children set must exist in `by_id` with a placement whose
    /// parent equals the set's key. Returns a description per violation;
    /// empty means consistent.
    pub fn integrity_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for (parent, children) in &self.children_of {
            for child in children {
                if !self.by_id.contains_key(child) {
                    violations.push(format!(
                        "`{child}` listed under `{parent}` but not registered"
                    ));
                    continue;
                }
                if child.parent().as_ref() != Some(parent) {
                    violations.push(format!(
                        "`{child}` listed under `{parent}` but its placement disagrees"
                    ));
                }
            }
        }
        violations
    }

    /// Recompute the derived status of `start` and every ancestor up to the
    /// root. Depth is bounded by the id grammar (≤ 4 levels), so this is
    /// cheap enough to run on every mutation.
    fn recompute_status_from(&mut self, start: &SpecId) {
        let mut current = Some(start.clone());
        while let Some(id) = current {
            if self.by_id.contains_key(&id) {
                let status = self.compute_status(&id);
                self.derived.insert(id.clone(), status);
            }
            current = id.parent();
        }
    }

    /// Pure function of the node's children (or its own status for a
    /// leaf): completed iff all children completed, in-progress once any
    /// child leaves draft, draft otherwise.
    fn compute_status(&self, id: &SpecId) -> SpecStatus {
        let children = self.children_of.get(id).filter(|set| !set.is_empty());
        let Some(children) = children else {
            return self
                .by_id
                .get(id)
                .map(SpecRecord::rollup_status)
                .unwrap_or_default();
        };

        let mut all_completed = true;
        let mut any_non_draft = false;
        for child in children {
            let status = self.derived.get(child).copied().unwrap_or_default();
            if status != SpecStatus::Completed {
                all_completed = false;
            }
            if status != SpecStatus::Draft {
                any_non_draft = true;
            }
        }
        if all_completed {
            SpecStatus::Completed
        } else if any_non_draft {
            SpecStatus::InProgress
        } else {
            SpecStatus::Draft
        }
    }
}
