use crate::error::{AppError, Result};
use byte_unit::Byte;
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_DIR: &str = ".repo2text";
pub const DEFAULT_CONFIG_FILENAME: &str = "repo2text.toml";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_MAX_FILE_SIZE_STR: &str = "1 MiB";

/// Noise that is unwanted in practically every repository, regardless of ecosystem.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    // Dependencies
    "node_modules/",
    "venv/",
    "env/",
    ".env/",
    "__pycache__/",
    "vendor/",
    ".bundle/",
    "pkg/",
    "target/",
    "dist/",
    "build/",
    // Version control
    ".git/",
    ".svn/",
    ".hg/",
    ".bzr/",
    // IDE/Editor files
    ".vscode/",
    ".idea/",
    "*.swp",
    "*.swo",
    "*~",
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    // Logs and temp files
    "*.log",
    "logs/",
    "temp/",
    "tmp/",
    ".cache/",
    ".tmp/",
    // Compiled/generated files
    "*.pyc",
    "*.pyo",
    "*.class",
    "*.o",
    "*.so",
    "*.exe",
    "*.dll",
    "*.obj",
    "*.bin",
    "*.deb",
    "*.rpm",
    "*.dmg",
    "*.msi",
    // Media, archives and databases
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.ico",
    "*.mp3",
    "*.mp4",
    "*.zip",
    "*.tar",
    "*.gz",
    "*.7z",
    "*.sqlite",
    "*.sqlite3",
    "*.db",
];

/// Per-request filtering configuration. Built once, then only read.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub default_rules: Vec<String>,
    pub extra_rules: Vec<String>,
    pub include_patterns: Vec<String>,
    pub max_file_size: u64,
    pub use_gitignore: bool,
    pub sort_entries: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            default_rules: DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            extra_rules: Vec::new(),
            include_patterns: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            use_gitignore: true,
            sort_entries: false,
        }
    }
}

impl ProjectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_rules = rules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extra_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_rules
            .extend(rules.into_iter().map(Into::into).filter(|r: &String| !r.trim().is_empty()));
        self
    }

    pub fn with_include_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_patterns
            .extend(patterns.into_iter().map(Into::into).filter(|p: &String| !p.trim().is_empty()));
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_gitignore(mut self, enabled: bool) -> Self {
        self.use_gitignore = enabled;
        self
    }

    pub fn with_sorted_entries(mut self, sorted: bool) -> Self {
        self.sort_entries = sorted;
        self
    }

    /// Default rules followed by the caller's extra rules, without duplicates.
    pub fn exclusion_rules(&self) -> Vec<&str> {
        let mut rules: Vec<&str> = Vec::with_capacity(self.default_rules.len() + self.extra_rules.len());
        for rule in self.default_rules.iter().chain(self.extra_rules.iter()) {
            let rule = rule.as_str();
            if !rules.contains(&rule) {
                rules.push(rule);
            }
        }
        rules
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default)]
    pub sort_entries: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FiltersConfig {
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TokensConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
}

fn default_true() -> bool {
    true
}
fn default_max_file_size() -> String {
    DEFAULT_MAX_FILE_SIZE_STR.to_string()
}
fn default_format() -> String {
    "xml".to_string()
}
fn default_provider() -> String {
    "generic".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            use_gitignore: default_true(),
            sort_entries: false,
        }
    }
}
impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            include: Vec::new(),
            max_file_size: default_max_file_size(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}
impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
        }
    }
}

/// Parses a human size such as `"512 KiB"`, `"1MB"` or `"2048"` into bytes.
pub fn parse_byte_size(size_str: &str) -> Result<u64> {
    let byte = Byte::from_str(size_str.trim()).map_err(|e| {
        AppError::InvalidArgument(format!(
            "Invalid size '{}': {}. Use a byte count or a unit such as KiB, MB.",
            size_str, e
        ))
    })?;
    Ok(byte.as_u64())
}

impl Config {
    /// Converts the file model into the runtime filtering configuration.
    pub fn to_project_config(&self) -> Result<ProjectConfig> {
        let max_file_size = parse_byte_size(&self.filters.max_file_size)?;
        Ok(ProjectConfig::new()
            .with_extra_rules(self.filters.exclude.iter().cloned())
            .with_include_patterns(self.filters.include.iter().cloned())
            .with_max_file_size(max_file_size)
            .with_gitignore(self.general.use_gitignore)
            .with_sorted_entries(self.general.sort_entries))
    }

    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        let canonical = path_to_resolve
            .canonicalize()
            .map_err(|e| AppError::InvalidRoot {
                path: path_to_resolve.clone(),
                reason: format!("cannot be resolved: {}", e),
            })?;
        ensure_directory(&canonical)?;
        Ok(canonical)
    }

    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(p_str) => {
                let mut path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
                if !path.exists() && path.extension().is_none() {
                    path.set_extension("toml");
                }
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Ok(Some(path))
            }
            None => {
                let default_path = project_root
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        toml::from_str::<Config>(toml_content).map_err(|e| {
            AppError::TomlParse(format!("{}. Check TOML syntax and structure.", e))
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Precondition check shared by every operation that takes a project root.
pub fn ensure_directory(root: &Path) -> Result<()> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(AppError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "is not a directory".to_string(),
        }),
        Err(e) => Err(AppError::InvalidRoot {
            path: root.to_path_buf(),
            reason: format!("does not exist or is not accessible: {}", e),
        }),
    }
}
