//! Discovery scanner: path enumeration only, no parsing.
//!
//! Walks the spec tree recursively (gitignore-aware, like the rest of the
//! ecosystem expects) and yields candidate document paths. Unreadable
//! entries are reported as warnings and skipped; a scan is finite and can
//! be re-invoked at any time.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::Config;

/// One path discovery could not read. Non-fatal: the scan continues.
#[derive(Debug, Clone)]
pub struct DiscoveryWarning {
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Outcome of one scan pass.
#[derive(Debug, Default)]
pub struct Discovered {
    /// Candidate document paths, sorted for deterministic load order.
    pub paths: Vec<PathBuf>,
    pub warnings: Vec<DiscoveryWarning>,
}

/// Enumerate candidate document files under the configured root.
pub fn scan(config: &Config) -> Discovered {
    scan_dir(&config.root, &config.extension, config.follow_gitignore)
}

/// Enumerate candidate document files under `root` with the given suffix.
pub fn scan_dir(root: &Path, extension: &str, follow_gitignore: bool) -> Discovered {
    let mut discovered = Discovered::default();

    let walker = WalkBuilder::new(root)
        .follow_links(true)
        .hidden(false)
        .git_ignore(follow_gitignore)
        .git_global(follow_gitignore)
        .git_exclude(follow_gitignore)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discovery skipped an unreadable entry: {e}");
                discovered.warnings.push(DiscoveryWarning {
                    path: None,
                    message: e.to_string(),
                });
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if !has_extension(path, extension) {
            continue;
        }
        discovered.paths.push(path.to_path_buf());
    }

    discovered.paths.sort();
    discovered
}

/// Whether a path carries the configured document suffix.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_finds_only_matching_suffixes_recursively() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("E01/F01")).expect("mkdir");
        fs::write(dir.path().join("E01/spec.md"), "x").expect("write");
        fs::write(dir.path().join("E01/F01/spec.md"), "x").expect("write");
        fs::write(dir.path().join("E01/notes.txt"), "x").expect("write");
        fs::write(dir.path().join("README.md"), "x").expect("write");

        let found = scan_dir(dir.path(), "md", true);
        assert!(found.warnings.is_empty());
        let names: Vec<String> = found
            .paths
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .expect("under root")
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(names, ["E01/F01/spec.md", "E01/spec.md", "README.md"]);
    }

    #[test]
    fn scan_is_restartable() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.md"), "x").expect("write");

        let first = scan_dir(dir.path(), "md", true);
        fs::write(dir.path().join("b.md"), "x").expect("write");
        let second = scan_dir(dir.path(), "md", true);

        assert_eq!(first.paths.len(), 1);
        assert_eq!(second.paths.len(), 2);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_extension(Path::new("spec.MD"), "md"));
        assert!(has_extension(Path::new("spec.md"), "md"));
        assert!(!has_extension(Path::new("spec.mdx"), "md"));
        assert!(!has_extension(Path::new("spec"), "md"));
    }
}
