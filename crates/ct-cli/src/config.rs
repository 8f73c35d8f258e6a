//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use ct_core::{CategorySpec, RuleError, RuleSet};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Calendar to read events from.
    pub calendar: String,
    /// How many weeks before the current one to include.
    pub weeks: u32,
    /// Event cache file. Loaded instead of fetching when it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<PathBuf>,
    /// Print day totals as decimal hours instead of `XhYmZs`.
    pub decimal_output: bool,
    pub google: GoogleConfig,
    /// Categories, in match order.
    pub categories: Vec<CategorySpec>,
}

/// Google Calendar credentials.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// OAuth 2.0 access token with calendar read scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Calendar API root, for proxies and test servers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("calendar", &self.calendar)
            .field("weeks", &self.weeks)
            .field("cache", &self.cache)
            .field("decimal_output", &self.decimal_output)
            .field("google", &self.google)
            .field("categories", &self.categories.len())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calendar: "primary".to_string(),
            weeks: 0,
            cache: None,
            decimal_output: false,
            google: GoogleConfig::default(),
            categories: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Unlike the default location, an explicitly named file must exist.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        if let Some(path) = config_path.filter(|p| !p.is_file()) {
            return Err(figment::Error::from(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let user_config = dirs_config_path().map(|dir| dir.join("config.toml"));
        layered(user_config.as_deref(), config_path).extract()
    }

    /// Compiles the configured categories into match order.
    pub fn rules(&self) -> Result<RuleSet, RuleError> {
        RuleSet::compile(&self.categories)
    }
}

/// Defaults, then the user config file, then an explicit file, then `CT_*`
/// environment variables (`__` separates nested keys).
fn layered(user_config: Option<&Path>, config_path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = user_config {
        figment = figment.merge(Toml::file(path));
    }

    if let Some(path) = config_path {
        figment = if is_yaml(path) {
            figment.merge(Yaml::file(path))
        } else {
            figment.merge(Toml::file(path))
        };
    }

    figment.merge(Env::prefixed("CT_").split("__"))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Returns the platform-specific config directory for ct.
///
/// On Linux: `~/.config/ct`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ct"))
}
