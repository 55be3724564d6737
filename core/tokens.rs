use crate::error::{AppError, Result};
use indexmap::IndexMap;
use log;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tiktoken_rs::cl100k_base;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Google,
    #[default]
    Generic,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Google,
        Provider::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Generic => "generic",
        }
    }

    /// Lenient parse: unknown names fall back to [`Provider::Generic`].
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|e| {
            log::warn!("{}; falling back to '{}'", e, Provider::Generic);
            Provider::Generic
        })
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            "google" => Ok(Provider::Google),
            "generic" => Ok(Provider::Generic),
            _ => Err(AppError::UnknownProvider(s.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const GENERIC_RATIO: f64 = 4.0;

pub fn default_ratios() -> IndexMap<Provider, f64> {
    IndexMap::from([
        (Provider::OpenAi, 4.0),
        (Provider::Anthropic, 4.5),
        (Provider::Google, 4.0),
        (Provider::Generic, GENERIC_RATIO),
    ])
}

pub fn default_context_windows() -> IndexMap<String, u64> {
    [
        ("gpt-4", 128_000),
        ("gpt-4-turbo", 128_000),
        ("claude-3-sonnet", 200_000),
        ("claude-3-opus", 200_000),
        ("claude-3.5-sonnet", 200_000),
        ("gemini-1.5-pro", 2_000_000),
        ("gemini-2.0-flash", 1_000_000),
    ]
    .into_iter()
    .map(|(name, size)| (name.to_string(), size))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowUsage {
    pub window: u64,
    /// May exceed 100.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenEstimate {
    pub characters: usize,
    pub provider: Provider,
    pub ratio: f64,
    pub tokens: u64,
    pub utilization: IndexMap<String, WindowUsage>,
}

/// Character-ratio token heuristic. Never exact.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenEstimator {
    ratios: IndexMap<Provider, f64>,
    windows: IndexMap<String, u64>,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(default_ratios(), default_context_windows())
    }
}

impl TokenEstimator {
    pub fn new(ratios: IndexMap<Provider, f64>, windows: IndexMap<String, u64>) -> Self {
        Self { ratios, windows }
    }

    pub fn context_windows(&self) -> &IndexMap<String, u64> {
        &self.windows
    }

    pub fn ratio(&self, provider: Provider) -> f64 {
        self.ratios
            .get(&provider)
            .or_else(|| self.ratios.get(&Provider::Generic))
            .copied()
            .filter(|r| *r > 0.0)
            .unwrap_or(GENERIC_RATIO)
    }

    pub fn estimate_tokens(&self, text: &str, provider: Provider) -> u64 {
        let characters = text.chars().count();
        (characters as f64 / self.ratio(provider)).floor() as u64
    }

    pub fn estimate(&self, text: &str, provider: Provider) -> TokenEstimate {
        let characters = text.chars().count();
        let ratio = self.ratio(provider);
        let tokens = (characters as f64 / ratio).floor() as u64;
        let utilization = self
            .windows
            .iter()
            .map(|(name, window)| {
                let percent = if *window == 0 {
                    0.0
                } else {
                    100.0 * tokens as f64 / *window as f64
                };
                (
                    name.clone(),
                    WindowUsage {
                        window: *window,
                        percent,
                    },
                )
            })
            .collect();
        log::debug!(
            "Estimated {} tokens for {} characters ({}, ratio {})",
            tokens,
            characters,
            provider,
            ratio
        );
        TokenEstimate {
            characters,
            provider,
            ratio,
            tokens,
            utilization,
        }
    }

    /// Same as [`estimate`](Self::estimate) with a provider name, falling back to generic.
    pub fn estimate_named(&self, text: &str, provider: &str) -> TokenEstimate {
        self.estimate(text, Provider::from_name(provider))
    }
}

/// Exact token count with the cl100k_base BPE, for comparison with the heuristic.
pub fn count_bpe_tokens(text: &str) -> Result<usize> {
    let bpe = cl100k_base().map_err(|e| AppError::TikToken(e.to_string()))?;
    Ok(bpe.encode_ordinary(text).len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_four_thousand_chars() {
        let estimate = TokenEstimator::default().estimate(&"a".repeat(4000), Provider::OpenAi);
        assert_eq!(estimate.characters, 4000);
        assert_eq!(estimate.tokens, 1000);
        let gpt4 = &estimate.utilization["gpt-4"];
        assert_eq!(gpt4.window, 128_000);
        assert!((gpt4.percent - 0.78125).abs() < 1e-9);
    }

    #[test]
    fn anthropic_ratio_floors() {
        let estimator = TokenEstimator::default();
        assert_eq!(estimator.estimate_tokens(&"a".repeat(10), Provider::Anthropic), 2);
        assert_eq!(estimator.estimate_tokens("", Provider::Anthropic), 0);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let estimator = TokenEstimator::default();
        let estimate = estimator.estimate("ééééééééé", Provider::Generic);
        assert_eq!(estimate.characters, 9);
        assert_eq!(estimate.tokens, 2);
    }

    #[test]
    fn unknown_provider_falls_back_to_generic() {
        assert_eq!(Provider::from_name("mistral"), Provider::Generic);
        assert_eq!(Provider::from_name("OpenAI"), Provider::OpenAi);
        assert!(matches!(
            "mistral".parse::<Provider>(),
            Err(AppError::UnknownProvider(_))
        ));
        let estimate = TokenEstimator::default().estimate_named(&"a".repeat(8), "mistral");
        assert_eq!(estimate.provider, Provider::Generic);
        assert_eq!(estimate.tokens, 2);
    }

    #[test]
    fn context_window_table_is_verbatim() {
        let windows = default_context_windows();
        let expected = [
            ("gpt-4", 128_000),
            ("gpt-4-turbo", 128_000),
            ("claude-3-sonnet", 200_000),
            ("claude-3-opus", 200_000),
            ("claude-3.5-sonnet", 200_000),
            ("gemini-1.5-pro", 2_000_000),
            ("gemini-2.0-flash", 1_000_000),
        ];
        assert_eq!(windows.len(), expected.len());
        for ((name, size), (exp_name, exp_size)) in windows.iter().zip(expected) {
            assert_eq!(name, exp_name);
            assert_eq!(*size, exp_size);
        }
    }

    #[test]
    fn utilization_is_not_clamped() {
        let mut windows = IndexMap::new();
        windows.insert("tiny".to_string(), 10);
        let estimator = TokenEstimator::new(default_ratios(), windows);
        let estimate = estimator.estimate(&"a".repeat(400), Provider::Generic);
        assert_eq!(estimate.tokens, 100);
        assert!((estimate.utilization["tiny"].percent - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn estimate_is_monotonic_in_length() {
        let estimator = TokenEstimator::default();
        for provider in Provider::ALL {
            let mut previous = 0;
            for len in 0..200 {
                let tokens = estimator.estimate_tokens(&"x".repeat(len), provider);
                assert!(tokens >= previous);
                previous = tokens;
            }
        }
    }

    #[test]
    fn missing_ratio_uses_generic_entry() {
        let mut ratios = IndexMap::new();
        ratios.insert(Provider::Generic, 2.0);
        let estimator = TokenEstimator::new(ratios, IndexMap::new());
        assert_eq!(estimator.ratio(Provider::Google), 2.0);
        assert!(estimator.estimate("abcd", Provider::Google).utilization.is_empty());
    }

    #[test]
    fn provider_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Provider::OpenAi).unwrap(), "\"openai\"");
        assert_eq!(serde_json::to_string(&Provider::Anthropic).unwrap(), "\"anthropic\"");
    }
}
