// Marker files, per-type exclusions and extension mappings used by the classifier.

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectTypeSpec {
    pub tag: String,
    /// Glob patterns matched against file names.
    pub markers: Vec<String>,
    /// Exclusion rules layered on top of the defaults when the type is detected.
    pub exclusions: Vec<String>,
}

impl ProjectTypeSpec {
    pub fn new(tag: &str, markers: &[&str], exclusions: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            markers: markers.iter().map(|s| s.to_string()).collect(),
            exclusions: exclusions.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Ordered table of project types; declaration order is reporting order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectTypeTable {
    pub entries: Vec<ProjectTypeSpec>,
}

impl ProjectTypeTable {
    pub fn new(entries: Vec<ProjectTypeSpec>) -> Self {
        Self { entries }
    }

    pub fn get(&self, tag: &str) -> Option<&ProjectTypeSpec> {
        self.entries.iter().find(|e| e.tag == tag)
    }
}

impl Default for ProjectTypeTable {
    fn default() -> Self {
        Self::new(vec![
            ProjectTypeSpec::new(
                "python",
                &["requirements.txt", "setup.py", "pyproject.toml", "Pipfile", "setup.cfg"],
                &[
                    "*.egg-info/",
                    ".pytest_cache/",
                    ".mypy_cache/",
                    ".ruff_cache/",
                    ".tox/",
                    "htmlcov/",
                    ".coverage",
                ],
            ),
            ProjectTypeSpec::new(
                "node",
                &["package.json"],
                &[
                    "node_modules/",
                    ".next/",
                    ".nuxt/",
                    ".turbo/",
                    "coverage/",
                    "*.min.js",
                    "*.map",
                    "package-lock.json",
                    "yarn.lock",
                    "pnpm-lock.yaml",
                ],
            ),
            ProjectTypeSpec::new("rust", &["Cargo.toml"], &["target/", "Cargo.lock"]),
            ProjectTypeSpec::new("go", &["go.mod"], &["vendor/", "go.sum"]),
            ProjectTypeSpec::new(
                "java",
                &["pom.xml", "build.gradle", "build.gradle.kts"],
                &[".gradle/", "target/", "build/", "*.jar", "*.war"],
            ),
            ProjectTypeSpec::new(
                "ruby",
                &["Gemfile", "Rakefile", "*.gemspec"],
                &[".bundle/", "vendor/bundle/", "Gemfile.lock"],
            ),
            ProjectTypeSpec::new("php", &["composer.json"], &["vendor/", "composer.lock"]),
            ProjectTypeSpec::new(
                "dotnet",
                &["*.csproj", "*.fsproj", "*.sln"],
                &["bin/", "obj/", "*.nupkg"],
            ),
            ProjectTypeSpec::new(
                "docker",
                &["Dockerfile", "docker-compose.yml", "docker-compose.yaml"],
                &[],
            ),
        ])
    }
}

// Maps file extensions (lowercase) to a language name.
pub fn map_extension_to_language(extension: &str) -> Option<&'static str> {
    match extension {
        "rs" => Some("Rust"),
        "py" | "pyi" => Some("Python"),
        "js" | "cjs" | "mjs" | "jsx" => Some("JavaScript"),
        "ts" | "tsx" => Some("TypeScript"),
        "go" => Some("Go"),
        "java" => Some("Java"),
        "kt" | "kts" => Some("Kotlin"),
        "rb" | "rake" => Some("Ruby"),
        "php" => Some("PHP"),
        "c" | "h" => Some("C"),
        "cpp" | "cc" | "cxx" | "hpp" => Some("C++"),
        "cs" => Some("C#"),
        "swift" => Some("Swift"),
        "scala" => Some("Scala"),
        "sh" | "bash" | "zsh" => Some("Shell"),
        "html" | "htm" => Some("HTML"),
        "css" | "scss" | "sass" => Some("CSS"),
        "sql" => Some("SQL"),
        _ => None,
    }
}

/// Files a reader of the repository usually wants to see first.
pub fn is_important_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.starts_with("readme")
        || lower.starts_with("license")
        || lower.starts_with("contributing")
        || lower.starts_with("changelog")
        || matches!(
            file_name,
            "Cargo.toml"
                | "package.json"
                | "pyproject.toml"
                | "setup.py"
                | "requirements.txt"
                | "go.mod"
                | "pom.xml"
                | "build.gradle"
                | "Gemfile"
                | "composer.json"
                | "Dockerfile"
                | "docker-compose.yml"
                | "Makefile"
        )
}
