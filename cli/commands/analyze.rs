use crate::cli_args::AnalyzeArgs;
use crate::output::{print_analysis_table, print_data_or_text, wants_text};
use anyhow::{Context, Result};
use log;
use repo2text_core::{self as core, Config};

pub fn handle_analyze_command(args: AnalyzeArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let analysis = core::analyze(&project_root)
        .with_context(|| format!("Failed to analyze {}", project_root.display()))?;

    if analysis.total_files == 0 && !quiet {
        eprintln!("No files found under {}.", project_root.display());
    }

    if wants_text(&args.format_output) {
        print_analysis_table(&analysis)
    } else {
        print_data_or_text(&analysis, None, &args.format_output, "json")
    }
}
