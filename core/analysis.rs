use crate::classify::table::{is_important_file, map_extension_to_language};
use crate::classify::{ProjectClassifier, ProjectTypeReport};
use crate::config::ensure_directory;
use crate::error::Result;
use crate::patterns::normalize_relative;
use byte_unit::{Byte, UnitType};
use indexmap::IndexMap;
use log;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use walkdir::WalkDir;

const TOP_FILE_TYPES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectAnalysis {
    pub root_path: String,
    pub total_files: usize,
    pub total_size: u64,
    pub total_size_readable: String,
    /// Extension (with leading dot, lowercase) to file count, most frequent first.
    pub file_types: IndexMap<String, usize>,
    pub languages: Vec<String>,
    pub project: ProjectTypeReport,
    pub important_files: Vec<String>,
}

pub fn analyze(root: &Path) -> Result<ProjectAnalysis> {
    analyze_with(root, &ProjectClassifier::default())
}

pub fn analyze_with(root: &Path, classifier: &ProjectClassifier) -> Result<ProjectAnalysis> {
    ensure_directory(root)?;
    log::info!("Analyzing project: {}", root.display());

    let mut total_files = 0usize;
    let mut total_size = 0u64;
    let mut extension_counts: HashMap<String, usize> = HashMap::new();
    let mut languages = BTreeSet::new();
    let mut important_files = Vec::new();

    for entry_result in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry during analysis: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        total_files += 1;
        match entry.metadata() {
            Ok(meta) => total_size = total_size.saturating_add(meta.len()),
            Err(e) => log::debug!("No size for {}: {}", entry.path().display(), e),
        }

        let path = entry.path();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            let lower = extension.to_lowercase();
            if let Some(language) = map_extension_to_language(&lower) {
                languages.insert(language.to_string());
            }
            *extension_counts.entry(format!(".{}", lower)).or_default() += 1;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_important_file(name) {
                let relative = path.strip_prefix(root).unwrap_or(path);
                important_files.push(normalize_relative(relative));
            }
        }
    }

    let mut ranked: Vec<(String, usize)> = extension_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let file_types: IndexMap<String, usize> = ranked.into_iter().take(TOP_FILE_TYPES).collect();
    important_files.sort();

    let total_size_readable = Byte::from_u64(total_size)
        .get_appropriate_unit(UnitType::Binary)
        .to_string();

    let analysis = ProjectAnalysis {
        root_path: root.display().to_string(),
        total_files,
        total_size,
        total_size_readable,
        file_types,
        languages: languages.into_iter().collect(),
        project: classifier.classify(root),
        important_files,
    };
    log::debug!(
        "Analysis complete: {} files, {} bytes, main type '{}'",
        analysis.total_files,
        analysis.total_size,
        analysis.project.main_type
    );
    Ok(analysis)
}
