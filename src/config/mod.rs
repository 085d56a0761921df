//! Configuration module

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub simbase: SimbaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Delay before a setup that was not ready is attempted again
    #[serde(default = "default_setup_retry_seconds")]
    pub setup_retry_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            setup_retry_seconds: default_setup_retry_seconds(),
        }
    }
}

/// The single Simbase account this service is bound to
#[derive(Debug, Clone, Deserialize)]
pub struct SimbaseConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_entry_id")]
    pub entry_id: String,
    #[serde(default = "default_usage_interval")]
    pub usage_interval_seconds: u64,
    #[serde(default = "default_balance_interval")]
    pub balance_interval_seconds: u64,
}

impl SimbaseConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            entry_id: default_entry_id(),
            usage_interval_seconds: default_usage_interval(),
            balance_interval_seconds: default_balance_interval(),
        }
    }

    /// Webhook id registered with the provider: `simbase_{entry_id}`
    pub fn webhook_id(&self) -> String {
        format!("simbase_{}", self.entry_id)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("simbase.api_key must not be empty");
        }
        if self.usage_interval_seconds == 0 {
            anyhow::bail!("simbase.usage_interval_seconds must be a positive number of seconds");
        }
        if self.balance_interval_seconds == 0 {
            anyhow::bail!("simbase.balance_interval_seconds must be a positive number of seconds");
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| anyhow::anyhow!("simbase.base_url is not a valid URL: {}", e))?;
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://api.simbase.com/v2".to_string()
}

fn default_entry_id() -> String {
    "default".to_string()
}

fn default_usage_interval() -> u64 {
    300
}

fn default_balance_interval() -> u64 {
    3600
}

fn default_setup_retry_seconds() -> u64 {
    30
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("SIMBASE").separator("__"))
            .build()?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
        config.simbase.validate()?;

        Ok(config)
    }
}
