use procgate_core::version::ApiVersion;
use procgate_sql::normalizer::NormalizeOptions;
use serde::Deserialize;
use std::collections::HashMap;

pub const DEFAULT_CONNECTION: &str = "DefaultConnection";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub connection_strings: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub listen_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    pub shared_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub versions: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            versions: vec!["1.0".into()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NormalizerConfig {
    #[serde(default = "default_true")]
    pub expand_nested: bool,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            expand_nested: true,
            max_depth: default_max_depth(),
        }
    }
}

impl From<&NormalizerConfig> for NormalizeOptions {
    fn from(config: &NormalizerConfig) -> Self {
        NormalizeOptions {
            expand_nested: config.expand_nested,
            max_depth: config.max_depth,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    NormalizeOptions::default().max_depth
}

fn default_connect_timeout() -> u64 {
    10
}

impl Config {
    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn supported_versions(&self) -> anyhow::Result<Vec<ApiVersion>> {
        self.api
            .versions
            .iter()
            .map(|raw| {
                raw.parse::<ApiVersion>()
                    .map_err(|_| anyhow::anyhow!("invalid api version {raw:?}"))
            })
            .collect()
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.security.shared_secret.trim().is_empty() {
            return Err(anyhow::anyhow!("security.shared_secret must not be empty"));
        }
        if !self.connection_strings.contains_key(DEFAULT_CONNECTION) {
            return Err(anyhow::anyhow!(format!(
                "connection_strings.{DEFAULT_CONNECTION} missing"
            )));
        }
        if self.api.versions.is_empty() {
            return Err(anyhow::anyhow!("api.versions must list at least one version"));
        }
        self.supported_versions()?;
        if self.normalizer.max_depth == 0 {
            return Err(anyhow::anyhow!("normalizer.max_depth must be positive"));
        }
        Ok(())
    }
}
