use crate::config::ProjectConfig;
use crate::media;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Matched an exclusion rule (default or caller supplied).
    Pattern { rule: String },
    /// Include patterns were given and none matched.
    NotIncluded,
    /// Matched the project's `.gitignore`.
    Gitignored,
    /// Extension implies a non-textual media type.
    Binary { media_type: String },
    TooLarge { size: u64, limit: u64 },
    /// The size query failed (permissions, vanished file, ...).
    Unreadable { error: String },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Pattern { rule } => write!(f, "matches exclusion rule '{}'", rule),
            ExclusionReason::NotIncluded => write!(f, "matches no include pattern"),
            ExclusionReason::Gitignored => write!(f, "ignored by .gitignore"),
            ExclusionReason::Binary { media_type } => write!(f, "non-text media type {}", media_type),
            ExclusionReason::TooLarge { size, limit } => {
                write!(f, "size {} bytes exceeds limit of {} bytes", size, limit)
            }
            ExclusionReason::Unreadable { error } => write!(f, "unreadable: {}", error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDecision {
    pub path: String,
    pub included: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ExclusionReason>,
}

impl FileDecision {
    fn include(path: String) -> Self {
        Self {
            path,
            included: true,
            reason: None,
        }
    }

    fn exclude(path: String, reason: ExclusionReason) -> Self {
        log::trace!("Excluding {}: {}", path, reason);
        Self {
            path,
            included: false,
            reason: Some(reason),
        }
    }
}

/// Joins the normal components of a relative path with `/`.
pub fn normalize_relative(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// A compiled set of exclusion (or inclusion) rules.
///
/// Every rule is tried both as a glob and, when it contains no glob
/// metacharacters, as a plain substring of the relative path. Rules ending in
/// `/` name a directory and match it along with everything below it.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<String>,
    globs: GlobSet,
    glob_owners: Vec<usize>,
    dir_globs: GlobSet,
    dir_glob_owners: Vec<usize>,
    substrings: Vec<(usize, String)>,
}

impl RuleSet {
    pub fn compile<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept = Vec::new();
        let mut builder = GlobSetBuilder::new();
        let mut glob_owners = Vec::new();
        let mut dir_builder = GlobSetBuilder::new();
        let mut dir_glob_owners = Vec::new();
        let mut substrings = Vec::new();

        for raw in rules {
            let rule = raw.as_ref().trim();
            if rule.is_empty() {
                continue;
            }
            let id = kept.len();
            kept.push(rule.to_string());

            let has_meta = rule.contains(GLOB_META);
            if !has_meta {
                substrings.push((id, rule.to_string()));
            }

            let is_dir_rule = rule.len() > 1 && rule.ends_with('/');
            if is_dir_rule {
                let name = rule.trim_end_matches('/');
                let (anchored, name) = match name.strip_prefix('/') {
                    Some(stripped) => (true, stripped),
                    None => (false, name),
                };
                let itself = if anchored {
                    name.to_string()
                } else {
                    format!("**/{}", name)
                };
                let below = format!("{}/**", itself);
                // A file that merely shares the directory's name stays eligible.
                if let Some(glob) = compile_glob(rule, &itself, true) {
                    dir_builder.add(glob);
                    dir_glob_owners.push(id);
                }
                if let Some(glob) = compile_glob(rule, &below, true) {
                    builder.add(glob.clone());
                    glob_owners.push(id);
                    dir_builder.add(glob);
                    dir_glob_owners.push(id);
                }
            } else if rule.contains('/') {
                let pattern = rule.trim_start_matches('/');
                if let Some(glob) = compile_glob(rule, pattern, false) {
                    builder.add(glob);
                    glob_owners.push(id);
                }
            } else {
                let pattern = format!("**/{}", rule);
                if let Some(glob) = compile_glob(rule, &pattern, true) {
                    builder.add(glob);
                    glob_owners.push(id);
                }
            }
        }

        let globs = builder.build().unwrap_or_else(|e| {
            log::warn!("Failed to build exclusion glob set, glob rules disabled: {}", e);
            glob_owners.clear();
            GlobSet::empty()
        });
        let dir_globs = dir_builder.build().unwrap_or_else(|e| {
            log::warn!("Failed to build directory glob set, pruning disabled: {}", e);
            dir_glob_owners.clear();
            GlobSet::empty()
        });

        Self {
            rules: kept,
            globs,
            glob_owners,
            dir_globs,
            dir_glob_owners,
            substrings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// The earliest declared rule matching `relative`, if any.
    pub fn first_match(&self, relative: &str) -> Option<&str> {
        let by_glob = self
            .globs
            .matches(relative)
            .into_iter()
            .filter_map(|i| self.glob_owners.get(i).copied())
            .min();
        let by_substring = self
            .substrings
            .iter()
            .filter(|(_, needle)| relative.contains(needle.as_str()))
            .map(|(id, _)| *id)
            .min();
        let id = match (by_glob, by_substring) {
            (Some(a), Some(b)) => a.min(b),
            (a, b) => a.or(b)?,
        };
        self.rules.get(id).map(String::as_str)
    }

    /// The earliest directory-scoped rule naming `relative_dir` or one of its ancestors.
    pub fn directory_match(&self, relative_dir: &str) -> Option<&str> {
        self.dir_globs
            .matches(relative_dir)
            .into_iter()
            .filter_map(|i| self.dir_glob_owners.get(i).copied())
            .min()
            .and_then(|id| self.rules.get(id))
            .map(String::as_str)
    }
}

fn compile_glob(rule: &str, pattern: &str, literal_separator: bool) -> Option<globset::Glob> {
    match GlobBuilder::new(pattern)
        .literal_separator(literal_separator)
        .build()
    {
        Ok(glob) => {
            log::trace!("Adding glob pattern: {} (processed as {})", rule, pattern);
            Some(glob)
        }
        Err(e) => {
            log::debug!("Treating malformed pattern \"{}\" as non-matching: {}", rule, e);
            None
        }
    }
}

/// Decides, per relative path, whether a file belongs in the output.
#[derive(Debug)]
pub struct PatternMatcher {
    root: PathBuf,
    exclude: RuleSet,
    include: Option<RuleSet>,
    gitignore: Option<Gitignore>,
    max_file_size: u64,
}

impl PatternMatcher {
    pub fn new(root: &Path, config: &ProjectConfig) -> Self {
        let exclude = RuleSet::compile(config.exclusion_rules());
        let include = if config.include_patterns.is_empty() {
            None
        } else {
            Some(RuleSet::compile(&config.include_patterns))
        };
        let gitignore = if config.use_gitignore {
            load_gitignore(root)
        } else {
            None
        };
        log::debug!(
            "Pattern matcher ready ({} exclusion rules, {} include patterns, gitignore: {}, max size: {} bytes)",
            exclude.len(),
            include.as_ref().map_or(0, RuleSet::len),
            gitignore.is_some(),
            config.max_file_size
        );
        Self {
            root: root.to_path_buf(),
            exclude,
            include,
            gitignore,
            max_file_size: config.max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path-only checks: exclusion rules, `.gitignore` and include patterns.
    pub fn rule_exclusion(&self, relative: &Path) -> Option<ExclusionReason> {
        let rel = normalize_relative(relative);
        if let Some(rule) = self.exclude.first_match(&rel) {
            return Some(ExclusionReason::Pattern {
                rule: rule.to_string(),
            });
        }
        if let Some(gitignore) = &self.gitignore {
            if gitignore
                .matched_path_or_any_parents(relative, false)
                .is_ignore()
            {
                return Some(ExclusionReason::Gitignored);
            }
        }
        if let Some(include) = &self.include {
            if include.first_match(&rel).is_none() {
                return Some(ExclusionReason::NotIncluded);
            }
        }
        None
    }

    pub fn decide(&self, relative: &Path) -> FileDecision {
        let size = fs::metadata(self.root.join(relative)).map(|m| m.len());
        self.decide_with_size(relative, size)
    }

    /// Same as [`decide`](Self::decide) with the size query already answered.
    pub fn decide_with_size(
        &self,
        relative: &Path,
        size: std::io::Result<u64>,
    ) -> FileDecision {
        let rel = normalize_relative(relative);
        if let Some(reason) = self.rule_exclusion(relative) {
            return FileDecision::exclude(rel, reason);
        }
        if let Some(media_type) = media::binary_media_type(relative) {
            return FileDecision::exclude(
                rel,
                ExclusionReason::Binary {
                    media_type: media_type.to_string(),
                },
            );
        }
        match size {
            Ok(size) if size > self.max_file_size => FileDecision::exclude(
                rel,
                ExclusionReason::TooLarge {
                    size,
                    limit: self.max_file_size,
                },
            ),
            Ok(_) => {
                log::trace!("Including {}", rel);
                FileDecision::include(rel)
            }
            Err(e) => FileDecision::exclude(
                rel,
                ExclusionReason::Unreadable {
                    error: e.to_string(),
                },
            ),
        }
    }

    /// Whether descent into `relative_dir` is cut off entirely.
    pub fn prunes_directory(&self, relative_dir: &Path) -> bool {
        let rel = normalize_relative(relative_dir);
        if let Some(rule) = self.exclude.directory_match(&rel) {
            log::trace!("Pruning directory {} (rule '{}')", rel, rule);
            return true;
        }
        if let Some(gitignore) = &self.gitignore {
            if gitignore
                .matched_path_or_any_parents(relative_dir, true)
                .is_ignore()
            {
                log::trace!("Pruning directory {} (.gitignore)", rel);
                return true;
            }
        }
        false
    }
}

/// One-shot decision for a single path, building the matcher on the fly.
pub fn decide(root: &Path, relative: &Path, config: &ProjectConfig) -> FileDecision {
    PatternMatcher::new(root, config).decide(relative)
}

fn load_gitignore(root: &Path) -> Option<Gitignore> {
    let path = root.join(".gitignore");
    if !path.is_file() {
        log::trace!("No .gitignore at {}", path.display());
        return None;
    }
    let mut builder = GitignoreBuilder::new(root);
    if let Some(e) = builder.add(&path) {
        log::warn!("Problem reading {}: {}", path.display(), e);
    }
    match builder.build() {
        Ok(gitignore) => {
            log::debug!(
                "Loaded {} rules from {}",
                gitignore.num_ignores(),
                path.display()
            );
            Some(gitignore)
        }
        Err(e) => {
            log::warn!("Ignoring malformed {}: {}", path.display(), e);
            None
        }
    }
}
