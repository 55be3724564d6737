pub mod analysis;
pub mod classify;
pub mod config;
pub mod error;
pub mod media;
pub mod patterns;
pub mod pipeline;
pub mod render;
pub mod sections;
pub mod tokens;
pub mod walk;

pub use analysis::{ProjectAnalysis, analyze};
pub use classify::{ProjectClassifier, ProjectTypeReport, classify};
pub use config::{Config, DEFAULT_EXCLUSIONS, ProjectConfig};
pub use error::{AppError, Result};
pub use patterns::{ExclusionReason, FileDecision, PatternMatcher, decide};
pub use pipeline::{generate, generate_with_config};
pub use render::{OutputFormat, RenderedDocument, render};
pub use sections::{Section, SectionMap, split};
pub use tokens::{Provider, TokenEstimate, TokenEstimator, count_bpe_tokens};
pub use walk::{Listing, WalkEntry, walk};
