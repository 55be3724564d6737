use repo2text_core::{
    OutputFormat, ProjectConfig, Provider, TokenEstimator, analyze, generate, generate_with_config,
    split, walk,
};
use std::fs;
use std::path::Path;

fn scaffold(root: &Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("node_modules")).unwrap();
    fs::write(root.join("src/main.txt"), "hi").unwrap();
    fs::write(root.join("node_modules/dep.js"), "x").unwrap();
    fs::write(root.join("image.png"), [0x89, b'P', b'N', b'G', 0, 0]).unwrap();
}

#[test]
fn tagged_output_contains_only_the_text_file() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());

    let doc = generate(dir.path(), OutputFormat::Xml, &[] as &[&str]).unwrap();
    assert_eq!(doc.file_count, 1);
    assert!(doc.failed_reads.is_empty());
    assert_eq!(doc.text.matches("<content full_path=").count(), 1);
    assert!(doc.text.contains("<content full_path=\"src/main.txt\">\nhi\n</content>"));
    assert!(doc.text.contains("<directory_structure>\nsrc/\n  main.txt\n</directory_structure>"));
    assert!(!doc.text.contains("node_modules"));
    assert!(!doc.text.contains("image.png"));
    assert!(doc.text.starts_with("<repo-to-text>\nDirectory: "));
    assert!(doc.text.ends_with("</repo-to-text>"));
}

#[test]
fn delimiter_output_is_one_block_per_file() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());

    let doc = generate(dir.path(), OutputFormat::Shotgun, &[] as &[&str]).unwrap();
    assert_eq!(doc.text, "*#*#*src/main.txt*#*#*begin*#*#*\nhi\n*#*#*end*#*#*\n\n");
}

#[test]
fn directory_rule_prunes_whole_subtree() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("vendor/a/b")).unwrap();
    fs::write(root.join("vendor/a/b/deep.txt"), "deep").unwrap();
    fs::write(root.join("keep.txt"), "keep").unwrap();

    let config = ProjectConfig::new().with_extra_rules(["vendor/"]);
    let listing = walk(root, &config);
    assert!(listing.entries.iter().all(|e| !e.path.starts_with("vendor/a")));
    let included: Vec<_> = listing
        .included_files()
        .map(|e| e.path.to_string_lossy().into_owned())
        .collect();
    assert_eq!(included, vec!["keep.txt"]);
}

#[test]
fn every_included_path_appears_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("docs/guide")).unwrap();
    fs::create_dir_all(root.join("lib")).unwrap();
    fs::write(root.join("docs/guide/intro.md"), "# Intro").unwrap();
    fs::write(root.join("lib/one.txt"), "one").unwrap();
    fs::write(root.join("lib/two.txt"), "two").unwrap();
    fs::write(root.join("notes.txt"), "notes").unwrap();

    let config = ProjectConfig::new().with_sorted_entries(true);
    let paths = ["docs/guide/intro.md", "lib/one.txt", "lib/two.txt", "notes.txt"];

    let xml = generate_with_config(root, OutputFormat::Xml, &config).unwrap();
    let shotgun = generate_with_config(root, OutputFormat::Shotgun, &config).unwrap();
    for path in paths {
        let tag = format!("<content full_path=\"{}\">", path);
        let delimiter = format!("*#*#*{}*#*#*begin*#*#*", path);
        assert_eq!(xml.text.matches(&tag).count(), 1, "{}", path);
        assert_eq!(shotgun.text.matches(&delimiter).count(), 1, "{}", path);
    }
    assert_eq!(xml.file_count, paths.len());
    assert_eq!(shotgun.file_count, paths.len());
}

#[test]
fn oversized_files_are_left_out() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("big.txt"), "x".repeat(64)).unwrap();
    fs::write(dir.path().join("small.txt"), "x").unwrap();

    let config = ProjectConfig::new().with_max_file_size(16);
    let doc = generate_with_config(dir.path(), OutputFormat::Shotgun, &config).unwrap();
    assert!(doc.text.contains("small.txt"));
    assert!(!doc.text.contains("big.txt"));
}

#[test]
fn estimate_of_four_thousand_chars() {
    let text = "a".repeat(4000);
    let estimate = TokenEstimator::default().estimate(&text, Provider::Generic);
    assert_eq!(estimate.tokens, 1000);
    let usage = &estimate.utilization["gpt-4"];
    assert_eq!(usage.window, 128_000);
    assert!((usage.percent - 0.78125).abs() < 1e-9);
}

#[test]
fn rendered_document_feeds_the_estimator() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());
    let doc = generate(dir.path(), OutputFormat::Markdown, &[] as &[&str]).unwrap();
    let estimator = TokenEstimator::default();
    let tokens = estimator.estimate_tokens(&doc.text, Provider::Anthropic);
    assert_eq!(tokens, (doc.text.chars().count() as f64 / 4.5).floor() as u64);
}

#[test]
fn analysis_sees_every_file() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());
    let analysis = analyze(dir.path()).unwrap();
    assert_eq!(analysis.total_files, 3);
    assert_eq!(analysis.project.main_type, "generic");
}

#[test]
fn plan_splits_into_sections() {
    let sections = split("## Overview\nShip it.\n## Steps\n1. Build\n2. Test\n");
    assert_eq!(sections.overview, "Ship it.");
    assert_eq!(sections.implementation_steps, vec!["1. Build", "2. Test"]);
}
