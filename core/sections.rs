//! Splits free-form markdown-ish text (typically a model's implementation plan)
//! into a fixed set of named sections keyed off its headings.

use log;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Overview,
    ArchitectureChanges,
    ImplementationSteps,
    FileModifications,
    CodeExamples,
    TestingStrategy,
    PotentialIssues,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Overview,
        Section::ArchitectureChanges,
        Section::ImplementationSteps,
        Section::FileModifications,
        Section::CodeExamples,
        Section::TestingStrategy,
        Section::PotentialIssues,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Raw-text sections keep their body verbatim; the rest are split into blocks.
    pub fn is_raw_text(self) -> bool {
        matches!(self, Section::Overview | Section::TestingStrategy)
    }
}

/// Heading triggers, tried top to bottom; the first hit wins.
pub const HEADING_RULES: &[(&[&str], Section)] = &[
    (&["overview", "summary"], Section::Overview),
    (&["architecture", "design"], Section::ArchitectureChanges),
    (&["implementation", "steps"], Section::ImplementationSteps),
    (
        &[
            "file modification",
            "file change",
            "files to",
            "files changed",
            "modified files",
            "affected files",
        ],
        Section::FileModifications,
    ),
    (&["code example", "example", "snippet"], Section::CodeExamples),
    (&["test"], Section::TestingStrategy),
    (
        &["issue", "risk", "pitfall", "concern", "caveat"],
        Section::PotentialIssues,
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SectionMap {
    pub overview: String,
    pub architecture_changes: Vec<String>,
    pub implementation_steps: Vec<String>,
    pub file_modifications: Vec<String>,
    pub code_examples: Vec<String>,
    pub testing_strategy: String,
    pub potential_issues: Vec<String>,
}

impl SectionMap {
    pub fn text(&self, section: Section) -> Option<&str> {
        match section {
            Section::Overview => Some(&self.overview),
            Section::TestingStrategy => Some(&self.testing_strategy),
            _ => None,
        }
    }

    pub fn blocks(&self, section: Section) -> Option<&[String]> {
        match section {
            Section::ArchitectureChanges => Some(&self.architecture_changes),
            Section::ImplementationSteps => Some(&self.implementation_steps),
            Section::FileModifications => Some(&self.file_modifications),
            Section::CodeExamples => Some(&self.code_examples),
            Section::PotentialIssues => Some(&self.potential_issues),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        Section::ALL.iter().all(|s| match self.text(*s) {
            Some(text) => text.is_empty(),
            None => self.blocks(*s).is_none_or(|b| b.is_empty()),
        })
    }
}

/// Returns the section a heading line opens, if any.
pub fn heading_section(line: &str) -> Option<Section> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('#') {
        return None;
    }
    let lower = trimmed.to_lowercase();
    HEADING_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, section)| *section)
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn is_list_item(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ") {
        return true;
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && matches!(trimmed[digits..].chars().next(), Some('.') | Some(')'))
}

pub fn split(text: &str) -> SectionMap {
    let mut lines: [Vec<&str>; 7] = Default::default();
    let mut current: Option<Section> = None;
    let mut in_fence = false;

    for line in text.lines() {
        // Fences count from the first line; `#` inside code is never a heading.
        if is_fence(line) {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some(section) = heading_section(line) {
                log::trace!("Heading opens {:?}: {}", section, line.trim());
                lines[section.index()].clear();
                current = Some(section);
                continue;
            }
        }
        let Some(section) = current else {
            continue;
        };
        lines[section.index()].push(line);
    }

    let raw = |section: Section| lines[section.index()].join("\n").trim().to_string();
    let blocks = |section: Section| to_blocks(&lines[section.index()]);
    let map = SectionMap {
        overview: raw(Section::Overview),
        architecture_changes: blocks(Section::ArchitectureChanges),
        implementation_steps: blocks(Section::ImplementationSteps),
        file_modifications: blocks(Section::FileModifications),
        code_examples: blocks(Section::CodeExamples),
        testing_strategy: raw(Section::TestingStrategy),
        potential_issues: blocks(Section::PotentialIssues),
    };
    log::debug!(
        "Split text into sections ({} implementation steps, {} code examples)",
        map.implementation_steps.len(),
        map.code_examples.len()
    );
    map
}

/// Groups body lines into blocks: a blank line or a new list item starts a
/// block, and fenced code stays in one block.
fn to_blocks(lines: &[&str]) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    let mut flush = |current: &mut Vec<&str>| {
        let block = current.join("\n").trim().to_string();
        if !block.is_empty() {
            blocks.push(block);
        }
        current.clear();
    };

    for &line in lines {
        if in_fence {
            current.push(line);
            if is_fence(line) {
                in_fence = false;
                flush(&mut current);
            }
            continue;
        }
        if is_fence(line) {
            flush(&mut current);
            current.push(line);
            in_fence = true;
            continue;
        }
        if line.trim().is_empty() {
            flush(&mut current);
            continue;
        }
        if is_list_item(line) {
            flush(&mut current);
        }
        current.push(line);
    }
    flush(&mut current);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testing_strategy_is_trimmed_raw_text() {
        let map = split("## Testing Strategy\nRun unit tests.\n");
        assert_eq!(map.testing_strategy, "Run unit tests.");
        assert_eq!(map.text(Section::TestingStrategy), Some("Run unit tests."));
    }

    #[test]
    fn text_before_first_heading_is_dropped() {
        let map = split("Sure! Here is the plan.\n\n# Overview\nAdd caching.\n");
        assert_eq!(map.overview, "Add caching.");
    }

    #[test]
    fn empty_input_leaves_every_bucket_empty() {
        assert!(split("").is_empty());
        assert!(split("no headings here\nat all").is_empty());
    }

    #[test]
    fn splits_full_plan() {
        let plan = "\
# Implementation Plan Overview
Introduce a cache layer.

## Architecture Changes
- Add a cache module
- Wire it into the service

## Implementation Steps
1. Create the module
2. Add tests
   with fixtures

## File Modifications
- src/cache.rs (new)

## Code Examples
```rust
# [derive(Debug)]
struct Cache;
```

## Testing Strategy
Unit tests for eviction.
Integration test for the service.

## Potential Issues
- Memory growth
";
        let map = split(plan);
        assert_eq!(map.overview, "Introduce a cache layer.");
        assert_eq!(
            map.architecture_changes,
            vec!["- Add a cache module", "- Wire it into the service"]
        );
        assert_eq!(
            map.implementation_steps,
            vec!["1. Create the module", "2. Add tests\n   with fixtures"]
        );
        assert_eq!(map.file_modifications, vec!["- src/cache.rs (new)"]);
        assert_eq!(
            map.code_examples,
            vec!["```rust\n# [derive(Debug)]\nstruct Cache;\n```"]
        );
        assert_eq!(
            map.testing_strategy,
            "Unit tests for eviction.\nIntegration test for the service."
        );
        assert_eq!(map.potential_issues, vec!["- Memory growth"]);
    }

    #[test]
    fn first_rule_in_priority_order_wins() {
        // "Implementation" precedes "test" in the rule order.
        assert_eq!(
            heading_section("## Test Implementation"),
            Some(Section::ImplementationSteps)
        );
        assert_eq!(heading_section("### Risks"), Some(Section::PotentialIssues));
        assert_eq!(heading_section("Testing without a marker"), None);
        assert_eq!(heading_section("## Acknowledgements"), None);
    }

    #[test]
    fn reopened_heading_resets_its_bucket() {
        let map = split("## Testing\nold\n## Overview\nintro\n## Testing\nnew\n");
        assert_eq!(map.testing_strategy, "new");
        assert_eq!(map.overview, "intro");
    }

    #[test]
    fn unrecognized_heading_is_body_text() {
        let map = split("## Overview\nfirst\n## Notes\nsecond\n");
        assert_eq!(map.overview, "first\n## Notes\nsecond");
    }

    #[test]
    fn fenced_code_before_first_heading_is_skipped() {
        let text = "Helper I used:\n```python\n# test helper\nx = 1\n```\n## Overview\nAdd caching.\n## Testing Strategy\nRun unit tests.\n";
        let map = split(text);
        assert_eq!(map.overview, "Add caching.");
        assert_eq!(map.testing_strategy, "Run unit tests.");
    }

    #[test]
    fn hash_lines_inside_fences_stay_in_their_section() {
        let map = split("## Code Examples\n```sh\n# install\nmake\n```\n## Potential Issues\n- flaky\n");
        assert_eq!(map.code_examples, vec!["```sh\n# install\nmake\n```"]);
        assert_eq!(map.potential_issues, vec!["- flaky"]);
    }

    #[test]
    fn case_insensitive_keywords() {
        let map = split("#### POTENTIAL ISSUES\n* race on shutdown\n");
        assert_eq!(map.potential_issues, vec!["* race on shutdown"]);
    }
}
