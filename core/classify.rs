use crate::config::DEFAULT_EXCLUSIONS;
use crate::patterns::{RuleSet, normalize_relative};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

pub mod table;

pub use table::{ProjectTypeSpec, ProjectTypeTable};

pub const GENERIC_PROJECT_TYPE: &str = "generic";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectTypeReport {
    /// Detected type tags in table order.
    pub detected: Vec<String>,
    pub main_type: String,
    /// Type-specific additions only, sorted and deduplicated.
    pub type_exclusions: Vec<String>,
    /// Defaults plus type-specific additions, sorted and deduplicated.
    pub exclusions: Vec<String>,
}

/// Guesses project types from marker files and derives exclusions for them.
#[derive(Debug, Clone)]
pub struct ProjectClassifier {
    table: ProjectTypeTable,
    default_rules: Vec<String>,
}

impl Default for ProjectClassifier {
    fn default() -> Self {
        Self::new(
            ProjectTypeTable::default(),
            DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl ProjectClassifier {
    pub fn new(table: ProjectTypeTable, default_rules: Vec<String>) -> Self {
        Self {
            table,
            default_rules,
        }
    }

    pub fn table(&self) -> &ProjectTypeTable {
        &self.table
    }

    pub fn classify(&self, root: &Path) -> ProjectTypeReport {
        log::debug!("Detecting project types in: {}", root.display());
        let markers: Vec<GlobSet> = self.table.entries.iter().map(marker_set).collect();
        let mut detected = vec![false; markers.len()];
        let prune = RuleSet::compile(&self.default_rules);

        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                if !entry.file_type().is_dir() {
                    return true;
                }
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                prune.directory_match(&normalize_relative(relative)).is_none()
            });

        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry during type detection: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };
            for (i, set) in markers.iter().enumerate() {
                if !detected[i] && set.is_match(file_name) {
                    log::trace!(
                        "Detected project type '{}' from {}",
                        self.table.entries[i].tag,
                        entry.path().display()
                    );
                    detected[i] = true;
                }
            }
            if detected.iter().all(|d| *d) {
                break;
            }
        }

        let tags: Vec<String> = self
            .table
            .entries
            .iter()
            .zip(&detected)
            .filter(|(_, hit)| **hit)
            .map(|(spec, _)| spec.tag.clone())
            .collect();
        let report = self.report_for(tags);
        log::debug!("Detected project types: {:?}", report.detected);
        report
    }

    /// Builds a report for an explicit set of tags (unknown tags contribute nothing).
    pub fn report_for(&self, detected: Vec<String>) -> ProjectTypeReport {
        let type_exclusions: BTreeSet<String> = detected
            .iter()
            .filter_map(|tag| self.table.get(tag))
            .flat_map(|spec| spec.exclusions.iter().cloned())
            .collect();
        let exclusions: BTreeSet<String> = self
            .default_rules
            .iter()
            .cloned()
            .chain(type_exclusions.iter().cloned())
            .collect();
        let main_type = detected
            .first()
            .cloned()
            .unwrap_or_else(|| GENERIC_PROJECT_TYPE.to_string());
        ProjectTypeReport {
            detected,
            main_type,
            type_exclusions: type_exclusions.into_iter().collect(),
            exclusions: exclusions.into_iter().collect(),
        }
    }
}

pub fn classify(root: &Path) -> ProjectTypeReport {
    ProjectClassifier::default().classify(root)
}

fn marker_set(spec: &ProjectTypeSpec) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for marker in &spec.markers {
        match Glob::new(marker) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => log::debug!("Ignoring malformed marker '{}' for {}: {}", marker, spec.tag, e),
        }
    }
    builder.build().unwrap_or_else(|e| {
        log::warn!("Markers for '{}' disabled: {}", spec.tag, e);
        GlobSet::empty()
    })
}
