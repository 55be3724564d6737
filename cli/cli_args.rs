use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Specify the target project directory (default: current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long = "config",
        help = "Specify path of the TOML config file (default: .repo2text/repo2text.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "disable_config_file",
        help_heading = "Project Setup"
    )]
    pub config_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Project Setup"
    )]
    pub disable_config_file: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(short = 'f', long, help = "Set the report format [default: json].", value_name = "FORMAT", value_parser = ["json", "yaml", "text"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Pretty-print JSON output.",
        help_heading = "Output Formatting"
    )]
    pub pretty: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert a repository into LLM-friendly text.",
    long_about = "repo2text walks a project, filters out dependency caches, build output, binaries \nand oversized files, and renders the rest as a tagged-block, delimiter-block or markdown document. \nIt can also estimate token usage against common context windows and split a model's plan into sections.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  repo2text generate -f shotgun -e fixtures/\n  repo2text analyze -f text\n  repo2text estimate context.txt --provider anthropic\n  repo2text split plan.md",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "g",
        visible_alias = "gen",
        about = "Render the repository as a single text document."
    )]
    Generate(GenerateArgs),

    #[command(
        visible_alias = "a",
        about = "Summarize files, languages and detected project types."
    )]
    Analyze(AnalyzeArgs),

    #[command(
        visible_alias = "e",
        about = "Estimate token usage of a text against known context windows."
    )]
    Estimate(EstimateArgs),

    #[command(
        visible_alias = "s",
        about = "Split a model's plan into named sections."
    )]
    Split(SplitArgs),

    #[command(about = "Print the default configuration file.")]
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(
        short = 'f',
        long = "format",
        value_name = "FORMAT",
        help = "Document format: xml, shotgun, markdown or tree [default: config or xml].",
        help_heading = "Output Control"
    )]
    pub format: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the document to FILE instead of standard output.",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PROVIDER",
        num_args = 0..=1,
        default_missing_value = "generic",
        help = "Print a token estimate for the document to stderr.",
        help_heading = "Output Control"
    )]
    pub estimate: Option<String>,

    #[clap(flatten)]
    pub filters: FilterGroup,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterGroup {
    #[arg(short = 'e', long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append, help = "Add an exclusion pattern (glob, substring, or dir/).", help_heading = "Content Filtering")]
    pub exclude: Vec<String>,

    #[arg(short = 'i', long = "include", value_name = "PATTERN", action = clap::ArgAction::Append, help = "Only consider paths matching PATTERN (repeatable).", help_heading = "Content Filtering")]
    pub include: Vec<String>,

    #[arg(
        long,
        value_name = "SIZE",
        help = "Skip files larger than SIZE (e.g. '512KiB', '2MB') [default: 1 MiB].",
        help_heading = "Content Filtering"
    )]
    pub max_file_size: Option<String>,

    #[arg(
        long,
        help = "Do not import rules from the root .gitignore (nested .gitignore files are never read).",
        help_heading = "Content Filtering"
    )]
    pub no_gitignore: bool,

    #[arg(
        long,
        help = "Sort directory entries by name for reproducible output.",
        help_heading = "Content Filtering"
    )]
    pub sorted: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct EstimateArgs {
    #[arg(value_name = "FILE", help = "Text file to measure (default: read standard input).")]
    pub input: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "PROVIDER",
        help = "Provider profile: openai, anthropic, google or generic [default: generic]."
    )]
    pub provider: Option<String>,

    #[arg(long, help = "Also count tokens exactly with the cl100k_base tokenizer.")]
    pub exact: bool,

    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    #[arg(value_name = "FILE", help = "Text file to split (default: read standard input).")]
    pub input: Option<PathBuf>,

    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}
