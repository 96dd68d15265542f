//! Common test utilities.

#![allow(dead_code)]

use std::path::Path;

/// Write one spec document at `rel` under `root`, creating directories.
pub fn write_spec(root: &Path, rel: &str, frontmatter: &str, body: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("has parent")).expect("Failed to create dirs");
    std::fs::write(path, format!("---\n{frontmatter}---\n{body}")).expect("Failed to write spec");
}

/// Build a small two-epic corpus in the directory-per-node layout:
///
/// ```text
/// E01/spec.md              epic, draft
/// E01/F01/spec.md          feature
/// E01/F01/T01/spec.md      task, completed
/// E01/F01/T02/spec.md      task, in_progress
/// E01/F02/spec.md          feature
/// E01/F02/T01/spec.md      task, draft
/// E02/spec.md              epic, completed (leaf)
/// ```
pub fn build_corpus(root: &Path) {
    write_spec(root, "E01/spec.md", "id: E01\nkind: epic\ntitle: Ingestion\n", "# Ingestion\n");
    write_spec(root, "E01/F01/spec.md", "id: F01\nkind: feature\n", "");
    write_spec(
        root,
        "E01/F01/T01/spec.md",
        "id: T01\nkind: task\nstatus: completed\n",
        "",
    );
    write_spec(
        root,
        "E01/F01/T02/spec.md",
        "id: T02\nkind: task\nstatus: in_progress\n",
        "",
    );
    write_spec(root, "E01/F02/spec.md", "id: F02\nkind: feature\n", "");
    write_spec(root, "E01/F02/T01/spec.md", "id: T01\nkind: task\n", "");
    write_spec(root, "E02/spec.md", "id: E02\nkind: epic\nstatus: completed\n", "");
}
