use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use repo2text_core::{ProjectAnalysis, TokenEstimate};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::cli_args::FormatOutputOpts;

/// Writes a rendered document to `output_path`, or to stdout when absent.
pub fn print_document_or_save(text: &str, output_path: Option<&Path>, quiet: bool) -> Result<()> {
    match output_path {
        Some(path) => {
            write_to_file(path, text)?;
            if !quiet {
                eprintln!(
                    "{} Document saved to: {}",
                    "✅".green(),
                    path.display().to_string().blue()
                );
            }
        }
        None => write_to_stdout(text)?,
    }
    Ok(())
}

/// True when the human-readable view was requested with `-f text`.
pub fn wants_text(format_opts: &FormatOutputOpts) -> bool {
    format_opts
        .format
        .as_deref()
        .is_some_and(|f| f.eq_ignore_ascii_case("text"))
}

/// Prints `data` as json/yaml, or `plain_text` when the text format is selected.
pub fn print_data_or_text<T: Serialize>(
    data: &T,
    plain_text: Option<String>,
    format_opts: &FormatOutputOpts,
    default_format: &str,
) -> Result<()> {
    let format = format_opts
        .format
        .as_deref()
        .unwrap_or(default_format)
        .to_lowercase();

    if format == "text" {
        match plain_text {
            Some(text) => write_to_stdout(&text),
            None => write_to_stdout(&serialize_output(data, "json", true)?),
        }
    } else {
        let content = serialize_output(data, &format, format_opts.pretty)?;
        write_to_stdout(&content)
    }
}

fn serialize_output<T: Serialize>(data: &T, format: &str, pretty: bool) -> Result<String> {
    let content = match format {
        "yaml" | "yml" => serde_yml::to_string(data).context("Failed to serialize to YAML")?,
        _ if pretty => {
            serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?
        }
        _ => serde_json::to_string(data).context("Failed to serialize to JSON")?,
    };
    Ok(content)
}

fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn print_estimate_table(estimate: &TokenEstimate, exact: Option<usize>) -> Result<()> {
    println!();
    println!("{}", " Token Estimate ".green().bold().underline());
    println!(
        "{:<20} {}",
        "Characters:".green(),
        estimate.characters.to_string().cyan()
    );
    println!(
        "{:<20} {} (ratio {})",
        "Provider:".green(),
        estimate.provider.to_string().cyan(),
        estimate.ratio
    );
    println!(
        "{:<20} {}",
        "Est. Tokens:".green(),
        estimate.tokens.to_string().cyan()
    );
    if let Some(count) = exact {
        println!(
            "{:<20} {}",
            "cl100k Tokens:".green(),
            count.to_string().cyan()
        );
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Model").fg(Color::Green),
        Cell::new("Window").fg(Color::Green),
        Cell::new("Used").fg(Color::Green),
    ]);
    for (model, usage) in &estimate.utilization {
        let used = format!("{:.2}%", usage.percent);
        let used_cell = if usage.percent > 100.0 {
            Cell::new(used).fg(Color::Red)
        } else {
            Cell::new(used)
        };
        table.add_row(vec![
            Cell::new(model).fg(Color::Cyan),
            Cell::new(usage.window).set_alignment(CellAlignment::Right),
            used_cell.set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
    println!();
    Ok(())
}

pub fn print_analysis_table(analysis: &ProjectAnalysis) -> Result<()> {
    println!();
    println!("{}", " Project Analysis ".green().bold().underline());
    println!("{:<20} {}", "Root:".green(), analysis.root_path.cyan());
    println!(
        "{:<20} {}",
        "Total Files:".green(),
        analysis.total_files.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Size:".green(),
        analysis.total_size_readable.cyan()
    );
    println!(
        "{:<20} {}",
        "Project Type:".green(),
        analysis.project.main_type.cyan()
    );
    if !analysis.languages.is_empty() {
        println!(
            "{:<20} {}",
            "Languages:".green(),
            analysis.languages.join(", ").cyan()
        );
    }

    if analysis.file_types.is_empty() {
        println!("\n{}", "(No files with extensions found)".yellow());
    } else {
        println!("\n{}", " File Types ".green().bold().underline());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Extension").fg(Color::Green),
            Cell::new("Files").fg(Color::Green),
        ]);
        for (extension, count) in &analysis.file_types {
            table.add_row(vec![
                Cell::new(extension).fg(Color::Cyan),
                Cell::new(count).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{table}");
    }

    if !analysis.important_files.is_empty() {
        println!("\n{}", " Important Files ".green().bold().underline());
        for path in &analysis.important_files {
            println!("  {}", path.blue());
        }
    }
    println!();
    Ok(())
}
