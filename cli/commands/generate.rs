use crate::cli_args::{FilterGroup, GenerateArgs};
use crate::load_config_for_command;
use crate::output;
use anyhow::{Context, Result};
use colored::Colorize;
use log;
use repo2text_core::config::parse_byte_size;
use repo2text_core::{self as core, Config, OutputFormat, ProjectConfig, Provider, TokenEstimator};

pub fn handle_generate_command(args: GenerateArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(&project_root, &args.project_config)
        .context("Failed to load configuration")?;

    // An explicit -f must name a real format; the config file value is lenient.
    let format = match &args.format {
        Some(name) => name.parse::<OutputFormat>()?,
        None => OutputFormat::from_identifier(&config.output.format),
    };
    let estimate_with = estimate_provider(args.estimate.as_deref())?;
    let project_config = merge_filters(&config, &args.filters)?;
    log::debug!("Effective filtering config: {:?}", project_config);

    let document = core::generate_with_config(&project_root, format, &project_config)
        .with_context(|| format!("Failed to generate document for {}", project_root.display()))?;

    if !document.failed_reads.is_empty() && !quiet {
        eprintln!(
            "{} {} file(s) could not be read and were noted inline.",
            "Warning:".yellow().bold(),
            document.failed_reads.len()
        );
    }

    output::print_document_or_save(&document.text, args.output.as_deref(), quiet)?;

    if let Some(provider) = estimate_with {
        let estimate = TokenEstimator::default().estimate(&document.text, provider);
        eprintln!(
            "{} {} files, ~{} tokens ({} chars, {})",
            "Estimate:".green().bold(),
            document.file_count,
            estimate.tokens,
            estimate.characters,
            provider
        );
        for (model, usage) in &estimate.utilization {
            eprintln!("  {:<20} {:>7.2}% of {}", model, usage.percent, usage.window);
        }
    }
    Ok(())
}

/// Parsed before generation so a bad `--estimate` fails without printing a document.
fn estimate_provider(name: Option<&str>) -> Result<Option<Provider>> {
    Ok(name.map(str::parse::<Provider>).transpose()?)
}

/// Layers the command line filters over the config file's.
fn merge_filters(config: &Config, filters: &FilterGroup) -> Result<ProjectConfig> {
    let mut project_config = config
        .to_project_config()
        .context("Invalid [filters] section in config")?
        .with_extra_rules(filters.exclude.iter().cloned())
        .with_include_patterns(filters.include.iter().cloned());

    if let Some(size) = &filters.max_file_size {
        project_config = project_config.with_max_file_size(parse_byte_size(size)?);
    }
    if filters.no_gitignore {
        project_config = project_config.with_gitignore(false);
    }
    if filters.sorted {
        project_config = project_config.with_sorted_entries(true);
    }
    Ok(project_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_filters_extend_config_filters() {
        let config = Config::from_toml_str(
            "[filters]\nexclude = [\"fixtures/\"]\nmax_file_size = \"2 KiB\"\n",
        )
        .unwrap();
        let filters = FilterGroup {
            exclude: vec!["*.snap".to_string()],
            include: vec!["src/".to_string()],
            max_file_size: None,
            no_gitignore: true,
            sorted: true,
        };
        let merged = merge_filters(&config, &filters).unwrap();
        assert_eq!(merged.extra_rules, vec!["fixtures/", "*.snap"]);
        assert_eq!(merged.include_patterns, vec!["src/"]);
        assert_eq!(merged.max_file_size, 2048);
        assert!(!merged.use_gitignore);
        assert!(merged.sort_entries);
    }

    #[test]
    fn cli_size_overrides_config_size() {
        let filters = FilterGroup {
            max_file_size: Some("10".to_string()),
            ..Default::default()
        };
        let merged = merge_filters(&Config::default(), &filters).unwrap();
        assert_eq!(merged.max_file_size, 10);
        assert!(merged.use_gitignore);
    }

    #[test]
    fn estimate_provider_is_checked_up_front() {
        assert_eq!(estimate_provider(None).unwrap(), None);
        assert_eq!(
            estimate_provider(Some("anthropic")).unwrap(),
            Some(Provider::Anthropic)
        );
        let err = estimate_provider(Some("mistral")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<repo2text_core::AppError>(),
            Some(repo2text_core::AppError::UnknownProvider(_))
        ));
    }

    #[test]
    fn bad_size_is_rejected() {
        let filters = FilterGroup {
            max_file_size: Some("lots".to_string()),
            ..Default::default()
        };
        assert!(merge_filters(&Config::default(), &filters).is_err());
    }
}
