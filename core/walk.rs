use crate::config::ProjectConfig;
use crate::patterns::{FileDecision, PatternMatcher, normalize_relative};
use log;
use serde::Serialize;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkEntry {
    /// Path relative to the walked root.
    pub path: PathBuf,
    /// 1 for direct children of the root.
    pub depth: usize,
    pub is_dir: bool,
    /// Present for files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<FileDecision>,
}

impl WalkEntry {
    pub fn is_included_file(&self) -> bool {
        self.decision.as_ref().is_some_and(|d| d.included)
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One row of the rendered directory structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    /// 0 for direct children of the root.
    pub level: usize,
    pub name: String,
    pub is_dir: bool,
}

/// Depth-first listing of a root: parents precede their children.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub root: PathBuf,
    pub entries: Vec<WalkEntry>,
}

impl Listing {
    pub fn included_files(&self) -> impl Iterator<Item = &WalkEntry> {
        self.entries.iter().filter(|e| e.is_included_file())
    }

    pub fn excluded_files(&self) -> impl Iterator<Item = &WalkEntry> {
        self.entries
            .iter()
            .filter(|e| e.decision.as_ref().is_some_and(|d| !d.included))
    }

    /// Directory structure restricted to included files and the directories holding them.
    pub fn included_tree(&self) -> Vec<TreeLine> {
        let mut needed_dirs: HashSet<&Path> = HashSet::new();
        for entry in self.included_files() {
            let mut parent = entry.path.parent();
            while let Some(dir) = parent {
                if dir.as_os_str().is_empty() || !needed_dirs.insert(dir) {
                    break;
                }
                parent = dir.parent();
            }
        }

        self.entries
            .iter()
            .filter(|e| {
                if e.is_dir {
                    needed_dirs.contains(e.path.as_path())
                } else {
                    e.is_included_file()
                }
            })
            .map(|e| TreeLine {
                level: e.depth.saturating_sub(1),
                name: e.name(),
                is_dir: e.is_dir,
            })
            .collect()
    }
}

pub fn walk(root: &Path, config: &ProjectConfig) -> Listing {
    let matcher = PatternMatcher::new(root, config);
    walk_with(&matcher, config.sort_entries)
}

pub fn walk_with(matcher: &PatternMatcher, sort_entries: bool) -> Listing {
    let root = matcher.root().to_path_buf();
    log::info!("Walking project directory: {}", root.display());

    let mut walker = WalkDir::new(&root).follow_links(false).min_depth(1);
    if sort_entries {
        walker = walker.sort_by_file_name();
    }

    let mut entries = Vec::new();
    let iter = walker.into_iter().filter_entry(|entry| {
        if !entry.file_type().is_dir() {
            return true;
        }
        match pathdiff::diff_paths(entry.path(), &root) {
            Some(relative) => !matcher.prunes_directory(&relative),
            None => true,
        }
    });

    for entry_result in iter {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!(
                    "Error walking directory: {} (at {})",
                    e,
                    e.path()
                        .map_or_else(|| "unknown path".into(), |p| p.display().to_string())
                );
                continue;
            }
        };
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            log::trace!("Skipping symbolic link: {}", entry.path().display());
            continue;
        }
        let Some(relative) = pathdiff::diff_paths(entry.path(), &root) else {
            log::warn!("Could not get relative path for: {}", entry.path().display());
            continue;
        };

        if file_type.is_dir() {
            log::trace!("Walked directory: {}", relative.display());
            entries.push(WalkEntry {
                path: relative,
                depth: entry.depth(),
                is_dir: true,
                decision: None,
            });
        } else if file_type.is_file() {
            let size = entry.metadata().map(|m| m.len()).map_err(io::Error::from);
            let decision = matcher.decide_with_size(&relative, size);
            entries.push(WalkEntry {
                path: relative,
                depth: entry.depth(),
                is_dir: false,
                decision: Some(decision),
            });
        } else {
            log::trace!("Skipping special file: {}", normalize_relative(entry.path()));
        }
    }

    let listing = Listing { root, entries };
    log::info!(
        "Directory walk complete. {} entries, {} included files.",
        listing.entries.len(),
        listing.included_files().count()
    );
    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn paths(listing: &Listing) -> Vec<String> {
        listing
            .entries
            .iter()
            .map(|e| normalize_relative(&e.path))
            .collect()
    }

    #[test]
    fn directory_rules_prevent_descent() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "vendor/deep/file.txt", "x");
        write(dir.path(), "src/lib.txt", "y");

        let config = ProjectConfig::new()
            .with_default_rules(["vendor/"])
            .with_sorted_entries(true);
        let listing = walk(dir.path(), &config);
        let seen = paths(&listing);
        assert!(!seen.iter().any(|p| p.starts_with("vendor")));
        assert_eq!(seen, vec!["src", "src/lib.txt"]);
    }

    #[test]
    fn parents_precede_children_and_dirs_carry_no_decision() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/b/c.txt", "x");
        write(dir.path(), "a/d.txt", "y");

        let listing = walk(dir.path(), &ProjectConfig::new());
        for (i, entry) in listing.entries.iter().enumerate() {
            assert_eq!(entry.is_dir, entry.decision.is_none());
            if let Some(parent) = entry.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                let parent_pos = listing
                    .entries
                    .iter()
                    .position(|e| e.path == parent)
                    .expect("parent listed");
                assert!(parent_pos < i);
            }
        }
        assert_eq!(listing.included_files().count(), 2);
    }

    #[test]
    fn non_directory_rules_still_descend() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "cache/keep.txt", "x");
        let config = ProjectConfig::new()
            .with_default_rules(["cache"])
            .with_sorted_entries(true);
        let listing = walk(dir.path(), &config);
        assert_eq!(paths(&listing), vec!["cache", "cache/keep.txt"]);
        assert_eq!(listing.included_files().count(), 0);
        assert_eq!(listing.excluded_files().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "real.txt", "x");
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join("broken"))
            .unwrap();
        let listing = walk(dir.path(), &ProjectConfig::new().with_sorted_entries(true));
        assert_eq!(paths(&listing), vec!["real.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subtree_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "locked/hidden.txt", "x");
        write(dir.path(), "src/lib.txt", "y");
        write(dir.path(), "top.txt", "z");
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Permission bits do not bind this user (e.g. root).
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let listing = walk(dir.path(), &ProjectConfig::new().with_sorted_entries(true));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let included: Vec<String> = listing
            .included_files()
            .map(|e| normalize_relative(&e.path))
            .collect();
        assert_eq!(included, vec!["src/lib.txt", "top.txt"]);
        assert!(!paths(&listing).contains(&"locked/hidden.txt".to_string()));
    }

    #[test]
    fn included_tree_lists_only_populated_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/main.txt", "x");
        write(dir.path(), "empty/skip.log", "x");
        write(dir.path(), "top.txt", "x");

        let listing = walk(dir.path(), &ProjectConfig::new().with_sorted_entries(true));
        let tree = listing.included_tree();
        assert_eq!(
            tree,
            vec![
                TreeLine { level: 0, name: "src".into(), is_dir: true },
                TreeLine { level: 1, name: "main.txt".into(), is_dir: false },
                TreeLine { level: 0, name: "top.txt".into(), is_dir: false },
            ]
        );
    }

    #[test]
    fn missing_root_yields_empty_listing() {
        let dir = tempfile::tempdir().unwrap();
        let listing = walk(&dir.path().join("nope"), &ProjectConfig::new());
        assert!(listing.entries.is_empty());
    }
}
