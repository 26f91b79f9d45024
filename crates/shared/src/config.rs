use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Maximum number of links resolved at the same time.
    pub max_workers: usize,
    /// Time allowed for one link, covering all of its requests.
    pub per_url_timeout: Duration,
    /// Wall-clock limit for a whole batch.
    pub batch_timeout: Duration,
    pub show_progress: bool,
    /// Pause after each successful resolution.
    pub interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_workers: 20,
            per_url_timeout: Duration::from_secs(15),
            batch_timeout: Duration::from_secs(180),
            show_progress: true,
            interval: Duration::from_millis(50),
        }
    }
}

impl ResolverConfig {
    /// Defaults overridden by `RESOLVER_*` environment variables.
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let mut config = Self::default();

        if let Some(workers) = read_var::<usize>("RESOLVER_MAX_WORKERS")? {
            config.max_workers = workers;
        }
        if let Some(secs) = read_var::<u64>("RESOLVER_PER_URL_TIMEOUT")? {
            config.per_url_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = read_var::<u64>("RESOLVER_BATCH_TIMEOUT")? {
            config.batch_timeout = Duration::from_secs(secs);
        }
        if let Some(show) = read_var::<bool>("RESOLVER_SHOW_PROGRESS")? {
            config.show_progress = show;
        }
        if let Some(ms) = read_var::<u64>("RESOLVER_INTERVAL_MS")? {
            config.interval = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            anyhow::bail!("max_workers must be at least 1");
        }
        if self.per_url_timeout.is_zero() {
            anyhow::bail!("per_url_timeout must be greater than zero");
        }
        if self.batch_timeout.is_zero() {
            anyhow::bail!("batch_timeout must be greater than zero");
        }
        Ok(())
    }

    fn try_load_dotenv() {
        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/news-resolver/.env
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("news-resolver").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                dotenvy::from_path(&home_path).ok();
            }
        }
    }
}

fn read_var<V>(name: &str) -> Result<Option<V>>
where
    V: FromStr,
    V::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => parse_value(name, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_value<V>(name: &str, raw: &str) -> Result<V>
where
    V: FromStr,
    V::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<V>()
        .with_context(|| format!("{} has an invalid value: {:?}", name, raw))
}
