//! Application configuration: parsing, normalization, validation and loading.
//!
//! The TOML file has three parts:
//! - `[data]`: where prices come from and how they are fetched,
//! - `[training]`: the date that splits training rows from testing rows,
//! - `[[companies]]`: display names offered to the user and their tickers.
//!
//! Every section is optional; missing values fall back to the built-in
//! defaults (Yahoo, a three-year window, a 2023-01-01 cutoff and ten large
//! tech companies). Unknown keys are rejected.
//!
//! Entrypoints:
//! - Parse + normalize + validate a TOML string: [`load_config_str`]
//! - The same from a file: [`load_config_path`]
//! - Resolve the file from a CLI flag or [`CONFIG_ENV`]: [`load_config`]

use std::{
    collections::HashSet,
    num::NonZeroU32,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, bail};
use chrono::NaiveDate;
use indexmap::IndexMap;
use price_store::{
    DataProvider, DateRange, FetchPolicy,
    providers::{csv_file::CsvProvider, yahoo::YahooProvider},
};
use serde::{Deserialize, Serialize};
use shared_utils::env::get_optional_env_var;
use tracing::{debug, info};

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "STOCK_PREDICTOR_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataCfg,
    #[serde(default)]
    pub training: TrainingCfg,
    #[serde(default = "default_companies")]
    pub companies: Vec<CompanyCfg>,
}

/// Which market-data source to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataCfg {
    pub provider: ProviderKind,
    /// Directory of `<SYMBOL>.csv` files; required for the csv provider.
    pub csv_dir: Option<PathBuf>,
    /// Length of the retrieval window, ending at `end`.
    pub lookback_years: u32,
    /// Last day of the retrieval window. Defaults to today (UTC).
    pub end: Option<NaiveDate>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub requests_per_second: u32,
    pub cache: bool,
}

impl Default for DataCfg {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Yahoo,
            csv_dir: None,
            lookback_years: 3,
            end: None,
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            requests_per_second: 2,
            cache: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingCfg {
    /// Rows dated before this day train the model; the rest are held out.
    pub cutoff: NaiveDate,
}

impl Default for TrainingCfg {
    fn default() -> Self {
        Self {
            cutoff: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
        }
    }
}

/// A company the user can pick by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompanyCfg {
    pub name: String,
    pub symbol: String,
}

fn default_companies() -> Vec<CompanyCfg> {
    [
        ("Apple", "AAPL"),
        ("Google", "GOOG"),
        ("Microsoft", "MSFT"),
        ("Amazon", "AMZN"),
        ("Starbucks", "SBUX"),
        ("Cisco", "CSCO"),
        ("Meta", "META"),
        ("Tesla", "TSLA"),
        ("AMD", "AMD"),
        ("Netflix", "NFLX"),
    ]
    .into_iter()
    .map(|(name, symbol)| CompanyCfg {
        name: name.into(),
        symbol: symbol.into(),
    })
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataCfg::default(),
            training: TrainingCfg::default(),
            companies: default_companies(),
        }
    }
}

impl AppConfig {
    /// Looks a company up by display name, ignoring case and surrounding
    /// whitespace.
    pub fn company(&self, name: &str) -> Option<&CompanyCfg> {
        let wanted = name.trim();
        self.companies
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(wanted))
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.companies.iter().map(|c| c.symbol.as_str()).collect()
    }

    /// The window every fetch uses: `lookback_years` ending at `end` (or
    /// `today` when unset).
    pub fn retrieval_window(&self, today: NaiveDate) -> DateRange {
        DateRange::trailing_years(self.data.end.unwrap_or(today), self.data.lookback_years)
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.data.timeout_secs),
            max_retries: self.data.max_retries,
            base_delay: Duration::from_millis(self.data.base_delay_ms),
            requests_per_second: NonZeroU32::new(self.data.requests_per_second)
                .unwrap_or(NonZeroU32::MIN),
            cache: self.data.cache,
        }
    }

    /// Instantiates the configured market-data provider.
    pub fn build_provider(&self) -> anyhow::Result<Arc<dyn DataProvider>> {
        let provider: Arc<dyn DataProvider> = match self.data.provider {
            ProviderKind::Yahoo => {
                Arc::new(YahooProvider::new().context("failed to create Yahoo provider")?)
            }
            ProviderKind::Csv => {
                let Some(dir) = &self.data.csv_dir else {
                    bail!("data.csv_dir is required when data.provider = \"csv\"");
                };
                Arc::new(CsvProvider::new(dir))
            }
        };
        Ok(provider)
    }
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default)]
pub struct NormalizationReport {
    /// Company names or symbols that changed when trimming.
    pub fields_trimmed: usize,
    /// Symbols that changed when uppercasing.
    pub symbols_uppercased: usize,
}

/// Normalize companies in place.
///
/// - Trim names and symbols; uppercase symbols
/// - Reject empty values and duplicates (names compare case-insensitively)
///
/// Order is preserved.
pub fn normalize_config(cfg: &mut AppConfig) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    if cfg.companies.is_empty() {
        bail!("at least one company must be configured");
    }

    let mut by_name: IndexMap<String, CompanyCfg> = IndexMap::new();
    let mut symbols = HashSet::new();

    for company in std::mem::take(&mut cfg.companies) {
        let name = company.name.trim().to_string();
        if name.is_empty() {
            bail!("company name cannot be empty after trimming");
        }
        let trimmed = company.symbol.trim();
        if trimmed.is_empty() {
            bail!("symbol for company '{name}' cannot be empty after trimming");
        }
        let symbol = trimmed.to_uppercase();

        if name != company.name || trimmed != company.symbol {
            report.fields_trimmed += 1;
        }
        if symbol != trimmed {
            report.symbols_uppercased += 1;
        }

        let key = name.to_lowercase();
        if by_name.contains_key(&key) {
            bail!("duplicate company name: {name}");
        }
        if !symbols.insert(symbol.clone()) {
            bail!("duplicate company symbol: {symbol}");
        }
        by_name.insert(key, CompanyCfg { name, symbol });
    }

    cfg.companies = by_name.into_values().collect();
    Ok(report)
}

/// Checks the value ranges serde cannot express.
pub fn validate_config(cfg: &AppConfig) -> anyhow::Result<()> {
    let data = &cfg.data;
    if data.lookback_years == 0 {
        bail!("data.lookback_years must be at least 1");
    }
    if data.timeout_secs == 0 {
        bail!("data.timeout_secs must be at least 1");
    }
    if data.requests_per_second == 0 {
        bail!("data.requests_per_second must be at least 1");
    }
    if data.provider == ProviderKind::Csv && data.csv_dir.is_none() {
        bail!("data.csv_dir is required when data.provider = \"csv\"");
    }
    Ok(())
}

/// Parse, normalize and validate a config from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<AppConfig> {
    let mut cfg: AppConfig = toml::from_str(toml_str).context("failed to parse config TOML")?;
    let report = normalize_config(&mut cfg).context("normalize_config failed")?;
    debug!(?report, "normalized config");
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Read a config TOML file from disk, then see [`load_config_str`].
pub fn load_config_path(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text).with_context(|| format!("invalid config {}", path.as_ref().display()))
}

/// The config file to read: `explicit` if given, else [`CONFIG_ENV`].
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| get_optional_env_var(CONFIG_ENV).map(PathBuf::from))
}

/// Loads the resolved config file, or the defaults when there is none.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    match resolve_config_path(explicit) {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_config_path(&path)
        }
        None => {
            info!("no config file given, using defaults");
            Ok(AppConfig::default())
        }
    }
}
