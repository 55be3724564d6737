use crate::classify::ProjectClassifier;
use crate::config::{ProjectConfig, ensure_directory};
use crate::error::Result;
use crate::render::{OutputFormat, RenderedDocument, render};
use crate::walk::walk;
use log;
use std::path::Path;

/// Converts `root` with the default configuration plus `extra_exclusions`.
///
/// Exclusions specific to the detected project types are layered on top of the
/// defaults before walking.
pub fn generate<S: AsRef<str>>(
    root: &Path,
    format: OutputFormat,
    extra_exclusions: &[S],
) -> Result<RenderedDocument> {
    let config = ProjectConfig::new().with_extra_rules(extra_exclusions.iter().map(|s| s.as_ref()));
    generate_with_config(root, format, &config)
}

pub fn generate_with_config(
    root: &Path,
    format: OutputFormat,
    config: &ProjectConfig,
) -> Result<RenderedDocument> {
    ensure_directory(root)?;
    let report = ProjectClassifier::default().classify(root);
    let config = layer_type_exclusions(config, &report.type_exclusions);
    log::debug!(
        "Generating {} output for '{}' project at {}",
        format,
        report.main_type,
        root.display()
    );
    let listing = walk(root, &config);
    Ok(render(&listing, format))
}

fn layer_type_exclusions(config: &ProjectConfig, type_exclusions: &[String]) -> ProjectConfig {
    let mut layered = config.clone();
    for rule in type_exclusions {
        if !layered.default_rules.contains(rule) && !layered.extra_rules.contains(rule) {
            layered.extra_rules.push(rule.clone());
        }
    }
    layered
}
