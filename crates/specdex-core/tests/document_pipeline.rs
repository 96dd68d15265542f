//! Integration tests running realistic documents through the full
//! parse → resolve → register → aggregate pipeline.

use pretty_assertions::assert_eq;
use specdex_core::{
    ParseIssue, SpecId, SpecRecord, SpecRegistry, SpecStatus, UpsertOutcome, parse_document,
};

const EPIC_DOC: &str = r#"---
# === IDENTIFICATION ===
id: E01
kind: epic
title: Data ingestion pipeline
status: in_progress   # kicked off in Q2
priority: high
created_at: 2026-04-02
owner: ingestion-team
---

# Data ingestion pipeline

Everything between the sources and the warehouse.
"#;

const TASK_DOC: &str = r#"---
id: T01
kind: task
title: Backfill historical events
parent: E01-F01
status: completed
estimated_hours: 12
actual_hours: 9.5
---

Backfill notes.
"#;

fn id(s: &str) -> SpecId {
    SpecId::parse(s).expect("valid id")
}

#[test]
fn realistic_documents_parse_with_annotations_preserved() {
    let doc = parse_document(EPIC_DOC);
    assert_eq!(doc.issue, None);
    assert_eq!(doc.metadata.id.as_deref(), Some("E01"));
    assert_eq!(doc.metadata.status, SpecStatus::InProgress);
    assert_eq!(doc.metadata.created_at.as_deref(), Some("2026-04-02"));
    assert!(doc.metadata.extra.contains_key("owner"));
    assert!(doc.body.starts_with("\n# Data ingestion pipeline"));

    let task = parse_document(TASK_DOC);
    assert_eq!(task.metadata.estimated_hours, Some(12.0));
    assert_eq!(task.metadata.actual_hours, Some(9.5));
}

#[test]
fn a_small_corpus_registers_and_aggregates() {
    let mut registry = SpecRegistry::new();

    let epic = SpecRecord::build("specs/E01/spec.md", Some(id("E01")), EPIC_DOC)
        .expect("epic builds");
    assert_eq!(registry.upsert(epic), UpsertOutcome::Inserted);

    let feature = SpecRecord::build(
        "specs/E01/F01/spec.md",
        Some(id("E01-F01")),
        "---\nid: F01\nkind: feature\ntitle: Event intake\n---\n",
    )
    .expect("feature builds");
    assert_eq!(registry.upsert(feature), UpsertOutcome::Inserted);

    let task = SpecRecord::build("specs/tasks/backfill.md", None, TASK_DOC)
        .expect("task builds");
    assert_eq!(registry.upsert(task), UpsertOutcome::Inserted);

    // The single completed task completes the whole chain.
    assert_eq!(registry.status_of(&id("E01-F01")), Some(SpecStatus::Completed));
    assert_eq!(registry.status_of(&id("E01")), Some(SpecStatus::Completed));

    let tree = registry.get_tree(None).expect("forest root");
    assert_eq!(tree.record_count(), 3);
    assert!(registry.integrity_violations().is_empty());
}

#[test]
fn degraded_documents_never_panic_the_pipeline() {
    let cases: &[&str] = &[
        "",
        "no frontmatter at all",
        "---\n",
        "---\n---\n",
        "---\nid: [\n---\n",
        "---\nid: E01\n",
        "---\nkind: epic\n---\n",
        "---\nid: Q99\nkind: epic\n---\n",
    ];
    let mut registry = SpecRegistry::new();
    for raw in cases {
        if let Ok(record) = SpecRecord::build("x.md", None, raw) {
            registry.upsert(record);
        }
    }
    // None of these form a registrable document.
    assert!(registry.is_empty());
}

#[test]
fn unreadable_and_orphan_issues_follow_the_registration_policy() {
    assert!(!ParseIssue::Unreadable("permission denied".into()).is_recoverable());
    assert!(ParseIssue::OrphanedParent("E02".into()).is_recoverable());

    let mut registry = SpecRegistry::new();
    let orphan = SpecRecord::build(
        "f01.md",
        None,
        "---\nid: F01\nkind: feature\nparent: E02\n---\n",
    )
    .expect("orphan builds");
    assert_eq!(registry.upsert(orphan), UpsertOutcome::Inserted);
    assert_eq!(registry.error_count(), 1);
    assert!(registry.get(&id("E02-F01")).is_some());
}
