// =============================================================================
// Runtime Configuration — file defaults + environment overrides
// =============================================================================
//
// Every field carries a serde default so a partial (or missing) JSON file
// still yields a usable configuration.  Environment variables are applied on
// top, which is how deployments normally supply the symbol basket, the
// provider key and the call budget.
//
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::provider::alpha_vantage::DEFAULT_BASE_URL;
use crate::provider::CallBudget;
use crate::signals::ScoreWeights;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "AAPL".to_string(),
        "MSFT".to_string(),
        "NVDA".to_string(),
        "TSLA".to_string(),
        "AMZN".to_string(),
    ]
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_interval() -> String {
    "5min".to_string()
}

fn default_output_size() -> String {
    "compact".to_string()
}

fn default_max_calls_per_window() -> u32 {
    1
}

/// 5 calls per minute on the free tier, spaced evenly.
fn default_rate_window_ms() -> u64 {
    15_000
}

fn default_min_bars() -> usize {
    crate::scanner::DEFAULT_MIN_BARS
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

// =============================================================================
// ScannerConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Symbols scanned on every request, in ranking tie-break order.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Provider API key.  Never written back out.
    #[serde(default, skip_serializing)]
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub provider_base_url: String,

    /// Intraday bar size requested from the provider.
    #[serde(default = "default_interval")]
    pub interval: String,

    #[serde(default = "default_output_size")]
    pub output_size: String,

    /// Provider calls allowed per `rate_window_ms`.
    #[serde(default = "default_max_calls_per_window")]
    pub max_calls_per_window: u32,

    #[serde(default = "default_rate_window_ms")]
    pub rate_window_ms: u64,

    /// Series shorter than this are skipped.
    #[serde(default = "default_min_bars")]
    pub min_bars: usize,

    /// Optional wall-clock limit for one scan; partial results are returned
    /// when it is hit.
    #[serde(default)]
    pub scan_timeout_secs: Option<u64>,

    /// Score weights and probability caps.
    #[serde(default)]
    pub score: ScoreWeights,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            api_key: String::new(),
            provider_base_url: default_base_url(),
            interval: default_interval(),
            output_size: default_output_size(),
            max_calls_per_window: default_max_calls_per_window(),
            rate_window_ms: default_rate_window_ms(),
            min_bars: default_min_bars(),
            scan_timeout_secs: None,
            score: ScoreWeights::default(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scanner config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse scanner config from {}", path.display()))?;

        info!(path = %path.display(), symbols = ?config.symbols, "scanner config loaded");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production, a
    /// map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(syms) = lookup("SCANNER_SYMBOLS") {
            self.symbols = syms
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(key) = lookup("ALPHA_VANTAGE_API_KEY") {
            self.api_key = key;
        }
        if let Some(url) = lookup("ALPHA_VANTAGE_BASE_URL") {
            self.provider_base_url = url;
        }
        if let Some(interval) = lookup("SCANNER_INTERVAL") {
            self.interval = interval;
        }
        if let Some(v) = lookup("SCANNER_MAX_CALLS") {
            self.max_calls_per_window = v
                .trim()
                .parse()
                .with_context(|| format!("SCANNER_MAX_CALLS is not a number: {v}"))?;
        }
        if let Some(v) = lookup("SCANNER_RATE_WINDOW_MS") {
            self.rate_window_ms = v
                .trim()
                .parse()
                .with_context(|| format!("SCANNER_RATE_WINDOW_MS is not a number: {v}"))?;
        }
        if let Some(v) = lookup("SCANNER_TIMEOUT_SECS") {
            let secs: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("SCANNER_TIMEOUT_SECS is not a number: {v}"))?;
            self.scan_timeout_secs = (secs > 0).then_some(secs);
        }
        if let Some(v) = lookup("SCANNER_BASE_CAP") {
            self.score.base_cap = v
                .trim()
                .parse()
                .with_context(|| format!("SCANNER_BASE_CAP is not a number: {v}"))?;
        }
        if let Some(v) = lookup("SCANNER_BONUS_CAP") {
            self.score.bonus_cap = v
                .trim()
                .parse()
                .with_context(|| format!("SCANNER_BONUS_CAP is not a number: {v}"))?;
        }
        if let Some(addr) = lookup("SCANNER_BIND_ADDR") {
            self.bind_addr = addr;
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {port}"))?;
            self.bind_addr = format!("0.0.0.0:{port}");
        }
        Ok(())
    }

    /// Reject settings the scanner cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            bail!("no symbols configured");
        }
        if self.max_calls_per_window == 0 {
            bail!("max_calls_per_window must be at least 1");
        }
        if self.rate_window_ms == 0 {
            bail!("rate_window_ms must be positive");
        }
        self.score.validate()
    }

    pub fn call_budget(&self) -> CallBudget {
        CallBudget::new(
            self.max_calls_per_window,
            Duration::from_millis(self.rate_window_ms),
        )
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs.map(Duration::from_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = ScannerConfig::default();
        assert_eq!(cfg.symbols.len(), 5);
        assert_eq!(cfg.symbols[0], "AAPL");
        assert_eq!(cfg.interval, "5min");
        assert_eq!(cfg.call_budget(), CallBudget::fixed_delay(Duration::from_secs(15)));
        assert_eq!(cfg.min_bars, 2);
        assert!(cfg.scan_timeout().is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let cfg: ScannerConfig =
            serde_json::from_str(r#"{ "symbols": ["IBM"], "rate_window_ms": 12000 }"#).unwrap();
        assert_eq!(cfg.symbols, vec!["IBM"]);
        assert_eq!(cfg.rate_window_ms, 12_000);
        assert_eq!(cfg.max_calls_per_window, 1);
        assert_eq!(cfg.output_size, "compact");
    }

    #[test]
    fn api_key_is_never_serialised() {
        let cfg = ScannerConfig {
            api_key: "top-secret".into(),
            ..ScannerConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("top-secret"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = ScannerConfig::default();
        cfg.apply_overrides(env(&[
            ("SCANNER_SYMBOLS", " ibm, msft ,,goog "),
            ("ALPHA_VANTAGE_API_KEY", "k"),
            ("SCANNER_MAX_CALLS", "5"),
            ("SCANNER_RATE_WINDOW_MS", "60000"),
            ("SCANNER_TIMEOUT_SECS", "90"),
            ("PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(cfg.symbols, vec!["IBM", "MSFT", "GOOG"]);
        assert_eq!(cfg.api_key, "k");
        assert_eq!(cfg.call_budget(), CallBudget::new(5, Duration::from_secs(60)));
        assert_eq!(cfg.scan_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let mut cfg = ScannerConfig::default();
        cfg.apply_overrides(env(&[("SCANNER_TIMEOUT_SECS", "0")])).unwrap();
        assert!(cfg.scan_timeout().is_none());
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let mut cfg = ScannerConfig::default();
        assert!(cfg.apply_overrides(env(&[("SCANNER_MAX_CALLS", "many")])).is_err());
        assert!(cfg.apply_overrides(env(&[("PORT", "99999")])).is_err());
    }

    #[test]
    fn score_caps_come_from_file_and_env() {
        let mut cfg: ScannerConfig =
            serde_json::from_str(r#"{ "score": { "base_cap": 60, "momentum": 35 } }"#).unwrap();
        assert_eq!(cfg.score.base_cap, 60.0);
        assert_eq!(cfg.score.momentum, 35.0);
        assert_eq!(cfg.score.bonus_cap, 95.0);

        cfg.apply_overrides(env(&[("SCANNER_BONUS_CAP", "70")])).unwrap();
        assert_eq!(cfg.score.bonus_cap, 70.0);
        assert!(cfg.validate().is_ok());

        cfg.apply_overrides(env(&[("SCANNER_BASE_CAP", "150")])).unwrap();
        assert!(cfg.validate().is_err());
        assert!(cfg.apply_overrides(env(&[("SCANNER_BASE_CAP", "high")])).is_err());
    }

    #[test]
    fn validate_rejects_empty_basket_and_zero_budget() {
        let mut cfg = ScannerConfig::default();
        cfg.apply_overrides(env(&[("SCANNER_SYMBOLS", " , ")])).unwrap();
        assert!(cfg.validate().is_err());

        let cfg = ScannerConfig {
            max_calls_per_window: 0,
            ..ScannerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
