use crate::cli_args::SplitArgs;
use crate::commands::read_input;
use crate::output::print_data_or_text;
use anyhow::Result;
use colored::Colorize;
use log;
use repo2text_core::{Section, SectionMap, split};

pub fn handle_split_command(args: SplitArgs) -> Result<()> {
    let text = read_input(args.input.as_deref())?;
    let sections = split(&text);
    if sections.is_empty() {
        log::warn!("No recognized section headings found in input.");
    }
    let plain = render_plain(&sections);
    print_data_or_text(&sections, Some(plain), &args.format_output, "json")
}

fn section_title(section: Section) -> &'static str {
    match section {
        Section::Overview => "Overview",
        Section::ArchitectureChanges => "Architecture Changes",
        Section::ImplementationSteps => "Implementation Steps",
        Section::FileModifications => "File Modifications",
        Section::CodeExamples => "Code Examples",
        Section::TestingStrategy => "Testing Strategy",
        Section::PotentialIssues => "Potential Issues",
    }
}

fn render_plain(sections: &SectionMap) -> String {
    let mut out = String::new();
    for section in Section::ALL {
        let body = match (sections.text(section), sections.blocks(section)) {
            (Some(text), _) if !text.is_empty() => text.to_string(),
            (_, Some(blocks)) if !blocks.is_empty() => blocks
                .iter()
                .enumerate()
                .map(|(i, block)| format!("[{}]\n{}", i + 1, block))
                .collect::<Vec<_>>()
                .join("\n\n"),
            _ => continue,
        };
        out.push_str(&format!("{}\n{}\n\n", section_title(section).green().bold(), body));
    }
    out
}
