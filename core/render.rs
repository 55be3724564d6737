use crate::error::AppError;
use crate::patterns::normalize_relative;
use crate::walk::{Listing, TreeLine, WalkEntry};
use log;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::str::FromStr;

pub const ROOT_OPEN: &str = "<repo-to-text>";
pub const ROOT_CLOSE: &str = "</repo-to-text>";
pub const STRUCTURE_OPEN: &str = "<directory_structure>";
pub const STRUCTURE_CLOSE: &str = "</directory_structure>";
pub const CONTENT_CLOSE: &str = "</content>";
const DELIMITER: &str = "*#*#*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// XML-like tagged blocks with a directory structure preamble.
    #[default]
    Xml,
    /// `*#*#*path*#*#*begin*#*#*` delimited blocks.
    Shotgun,
    Markdown,
    /// Directory structure only, no file contents.
    Tree,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Xml,
        OutputFormat::Shotgun,
        OutputFormat::Markdown,
        OutputFormat::Tree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Shotgun => "shotgun",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Tree => "tree",
        }
    }

    /// Lenient parse: unrecognized identifiers fall back to [`OutputFormat::Xml`].
    pub fn from_identifier(identifier: &str) -> Self {
        identifier.parse().unwrap_or_else(|e| {
            log::warn!("{}; falling back to '{}'", e, OutputFormat::default());
            OutputFormat::default()
        })
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" | "tagged" => Ok(OutputFormat::Xml),
            "shotgun" | "delimiter" => Ok(OutputFormat::Shotgun),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "tree" | "structure" => Ok(OutputFormat::Tree),
            _ => Err(AppError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedDocument {
    pub format: OutputFormat,
    pub text: String,
    /// Included files that were rendered (or attempted).
    pub file_count: usize,
    /// Relative paths whose content could not be read.
    pub failed_reads: Vec<String>,
}

enum FileBody {
    Text(String),
    Failed(String),
}

pub fn render(listing: &Listing, format: OutputFormat) -> RenderedDocument {
    log::debug!(
        "Rendering {} as {}",
        listing.root.display(),
        format.as_str()
    );
    let mut renderer = Renderer::new(listing);
    let text = match format {
        OutputFormat::Xml => renderer.tagged_block(true),
        OutputFormat::Tree => renderer.tagged_block(false),
        OutputFormat::Shotgun => renderer.delimiter_block(),
        OutputFormat::Markdown => renderer.markdown(),
    };
    log::info!(
        "Rendered {} files ({} characters, {} read failures)",
        renderer.file_count,
        text.len(),
        renderer.failed_reads.len()
    );
    RenderedDocument {
        format,
        text,
        file_count: renderer.file_count,
        failed_reads: renderer.failed_reads,
    }
}

struct Renderer<'a> {
    listing: &'a Listing,
    file_count: usize,
    failed_reads: Vec<String>,
}

impl<'a> Renderer<'a> {
    fn new(listing: &'a Listing) -> Self {
        Self {
            listing,
            file_count: 0,
            failed_reads: Vec::new(),
        }
    }

    fn root_name(&self) -> String {
        self.listing
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.listing.root.display().to_string())
    }

    fn read(&mut self, entry: &WalkEntry) -> (String, FileBody) {
        let rel = normalize_relative(&entry.path);
        self.file_count += 1;
        match fs::read(self.listing.root.join(&entry.path)) {
            Ok(bytes) => (rel, FileBody::Text(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) => {
                log::warn!("Failed to read {}: {}", rel, e);
                self.failed_reads.push(rel.clone());
                let note = format!("<!-- failed to read {}: {} -->", rel, e);
                (rel, FileBody::Failed(note))
            }
        }
    }

    fn tree_lines(&self) -> Vec<String> {
        self.listing
            .included_tree()
            .iter()
            .map(format_tree_line)
            .collect()
    }

    fn tagged_block(&mut self, with_contents: bool) -> String {
        let mut lines: Vec<String> = vec![
            ROOT_OPEN.to_string(),
            format!("Directory: {}", self.root_name()),
            String::new(),
        ];

        let tree = self.tree_lines();
        if !tree.is_empty() {
            lines.push("Directory Structure:".to_string());
            lines.push(STRUCTURE_OPEN.to_string());
            lines.extend(tree);
            lines.push(STRUCTURE_CLOSE.to_string());
            lines.push(String::new());
        }

        let listing = self.listing;
        for entry in listing.included_files() {
            if !with_contents {
                self.file_count += 1;
                continue;
            }
            match self.read(entry) {
                (rel, FileBody::Text(content)) => {
                    lines.push(format!("<content full_path=\"{}\">", escape(rel.as_str())));
                    lines.push(content);
                    lines.push(CONTENT_CLOSE.to_string());
                }
                (_, FileBody::Failed(note)) => lines.push(note),
            }
            lines.push(String::new());
        }

        lines.push(ROOT_CLOSE.to_string());
        lines.join("\n")
    }

    fn delimiter_block(&mut self) -> String {
        let mut out = String::new();
        let listing = self.listing;
        for entry in listing.included_files() {
            match self.read(entry) {
                (rel, FileBody::Text(content)) => {
                    out.push_str(&format!(
                        "{d}{rel}{d}begin{d}\n{content}\n{d}end{d}\n\n",
                        d = DELIMITER
                    ));
                }
                (_, FileBody::Failed(note)) => {
                    out.push_str(&note);
                    out.push_str("\n\n");
                }
            }
        }
        out
    }

    fn markdown(&mut self) -> String {
        let mut out = format!("# Repository: {}\n\n", self.root_name());

        let tree = self.tree_lines();
        if !tree.is_empty() {
            out.push_str("## Directory Structure\n\n```text\n");
            for line in tree {
                out.push_str(&line);
                out.push('\n');
            }
            out.push_str("```\n\n");
        }

        out.push_str("## Files\n");
        let listing = self.listing;
        for entry in listing.included_files() {
            match self.read(entry) {
                (rel, FileBody::Text(content)) => {
                    let fence = "`".repeat(longest_backtick_run(&content).max(2) + 1);
                    out.push_str(&format!(
                        "\n### `{}`\n\n{}{}\n{}",
                        rel,
                        fence,
                        language_hint(&rel),
                        content
                    ));
                    if !content.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(&fence);
                    out.push('\n');
                }
                (rel, FileBody::Failed(note)) => {
                    out.push_str(&format!("\n### `{}`\n\n{}\n", rel, note));
                }
            }
        }
        out
    }
}

fn format_tree_line(line: &TreeLine) -> String {
    let indent = "  ".repeat(line.level);
    if line.is_dir {
        format!("{}{}/", indent, line.name)
    } else {
        format!("{}{}", indent, line.name)
    }
}

fn longest_backtick_run(content: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn language_hint(relative: &str) -> String {
    let extension = relative
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(stem, ext)| if stem.is_empty() { "" } else { ext })
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "rs" => "rust".to_string(),
        "py" => "python".to_string(),
        "js" | "mjs" | "cjs" => "javascript".to_string(),
        "ts" => "typescript".to_string(),
        "md" => "markdown".to_string(),
        "yml" => "yaml".to_string(),
        "sh" => "bash".to_string(),
        "rb" => "ruby".to_string(),
        _ => extension,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::walk::walk;
    use std::path::Path;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.txt"), "fn main() {}\n").unwrap();
        fs::write(root.join("README.md"), "# Demo").unwrap();
        fs::write(root.join("image.png"), [0x89, b'P', b'N', b'G']).unwrap();
        dir
    }

    fn listing(root: &Path) -> Listing {
        walk(root, &ProjectConfig::new().with_sorted_entries(true))
    }

    #[test]
    fn parses_format_identifiers() {
        assert_eq!("xml".parse::<OutputFormat>().unwrap(), OutputFormat::Xml);
        assert_eq!(" Shotgun ".parse::<OutputFormat>().unwrap(), OutputFormat::Shotgun);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!(matches!(
            "pdf".parse::<OutputFormat>(),
            Err(AppError::UnknownFormat(_))
        ));
    }

    #[test]
    fn unknown_identifier_falls_back_to_tagged_block() {
        assert_eq!(OutputFormat::from_identifier("yaml"), OutputFormat::Xml);
        assert_eq!(OutputFormat::from_identifier(""), OutputFormat::Xml);
        assert_eq!(OutputFormat::from_identifier("tree"), OutputFormat::Tree);
    }

    #[test]
    fn tagged_block_layout() {
        let dir = fixture();
        let doc = render(&listing(dir.path()), OutputFormat::Xml);
        let name = dir.path().file_name().unwrap().to_string_lossy();
        let expected = format!(
            "<repo-to-text>\nDirectory: {name}\n\nDirectory Structure:\n<directory_structure>\nREADME.md\nsrc/\n  main.txt\n</directory_structure>\n\n<content full_path=\"README.md\">\n# Demo\n</content>\n\n<content full_path=\"src/main.txt\">\nfn main() {{}}\n\n</content>\n\n</repo-to-text>"
        );
        assert_eq!(doc.text, expected);
        assert_eq!(doc.file_count, 2);
        assert!(doc.failed_reads.is_empty());
    }

    #[test]
    fn delimiter_block_layout() {
        let dir = fixture();
        let doc = render(&listing(dir.path()), OutputFormat::Shotgun);
        assert_eq!(
            doc.text,
            "*#*#*README.md*#*#*begin*#*#*\n# Demo\n*#*#*end*#*#*\n\n\
             *#*#*src/main.txt*#*#*begin*#*#*\nfn main() {}\n\n*#*#*end*#*#*\n\n"
        );
    }

    #[test]
    fn markdown_uses_fences_longer_than_content_backticks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.md"), "```rust\nlet x = 1;\n```").unwrap();
        let doc = render(&listing(dir.path()), OutputFormat::Markdown);
        assert!(doc.text.contains("### `notes.md`\n\n````markdown\n```rust\nlet x = 1;\n```\n````\n"));
        assert!(doc.text.contains("## Directory Structure\n\n```text\nnotes.md\n```"));
    }

    #[test]
    fn tree_format_omits_contents() {
        let dir = fixture();
        let doc = render(&listing(dir.path()), OutputFormat::Tree);
        assert!(doc.text.contains("<directory_structure>\nREADME.md\nsrc/\n  main.txt\n</directory_structure>"));
        assert!(!doc.text.contains("<content"));
        assert_eq!(doc.file_count, 2);
    }

    #[test]
    fn rendering_is_idempotent() {
        let dir = fixture();
        let listing = listing(dir.path());
        for format in OutputFormat::ALL {
            assert_eq!(render(&listing, format), render(&listing, format));
        }
    }

    #[test]
    fn undecodable_bytes_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("latin1.txt"), [b'c', b'a', b'f', 0xE9]).unwrap();
        let doc = render(&listing(dir.path()), OutputFormat::Shotgun);
        assert!(doc.text.contains("caf\u{FFFD}"));
    }

    #[test]
    fn vanished_files_are_reported_inline() {
        let dir = fixture();
        let listing = listing(dir.path());
        fs::remove_file(dir.path().join("src/main.txt")).unwrap();

        let doc = render(&listing, OutputFormat::Xml);
        assert_eq!(doc.failed_reads, vec!["src/main.txt".to_string()]);
        assert!(doc.text.contains("<!-- failed to read src/main.txt:"));
        assert!(doc.text.contains("<content full_path=\"README.md\">"));
        assert!(doc.text.ends_with(ROOT_CLOSE));
    }

    #[test]
    fn path_attributes_are_escaped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a&b.txt"), "x").unwrap();
        let doc = render(&listing(dir.path()), OutputFormat::Xml);
        assert!(doc.text.contains("<content full_path=\"a&amp;b.txt\">"));
    }

    #[test]
    fn language_hints() {
        assert_eq!(language_hint("src/lib.rs"), "rust");
        assert_eq!(language_hint("Makefile"), "");
        assert_eq!(language_hint(".env.example"), "example");
        assert_eq!(language_hint("dir.d/.hidden"), "");
    }
}
