use crate::cli_args::{EstimateArgs, ProjectConfigOpts};
use crate::commands::read_input;
use crate::load_config_for_command;
use crate::output::{print_data_or_text, print_estimate_table, wants_text};
use anyhow::{Context, Result};
use log;
use repo2text_core::{Config, Provider, TokenEstimate, TokenEstimator, count_bpe_tokens};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct EstimateReport {
    #[serde(flatten)]
    estimate: TokenEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    exact_tokens: Option<usize>,
}

pub fn handle_estimate_command(args: EstimateArgs) -> Result<()> {
    let text = read_input(args.input.as_deref())?;
    let provider = resolve_provider(args.provider.as_deref())?;
    log::debug!("Estimating {} chars for provider {}", text.len(), provider);

    let estimate = TokenEstimator::default().estimate(&text, provider);
    let exact_tokens = if args.exact {
        Some(count_bpe_tokens(&text).context("Failed to count tokens with cl100k_base")?)
    } else {
        None
    };

    if wants_text(&args.format_output) {
        print_estimate_table(&estimate, exact_tokens)
    } else {
        let report = EstimateReport {
            estimate,
            exact_tokens,
        };
        print_data_or_text(&report, None, &args.format_output, "json")
    }
}

/// An explicit `--provider` is strict; otherwise the project config (if any)
/// picks the provider, leniently.
fn resolve_provider(cli_provider: Option<&str>) -> Result<Provider> {
    if let Some(name) = cli_provider {
        return Ok(name.parse()?);
    }
    let config = Config::determine_project_root(None)
        .ok()
        .and_then(|root| load_config_for_command(&root, &ProjectConfigOpts::default()).ok());
    Ok(match config {
        Some(config) => Provider::from_name(&config.tokens.provider),
        None => Provider::default(),
    })
}
