use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Bot token; also the key material for init-data signatures.
    pub telegram_token: Option<String>,
    /// Every API request is treated as a fixed admin.
    pub api_test: bool,
    pub init_data_max_age: chrono::Duration,
    pub request_timeout: Duration,
    pub dialogue_ttl: Duration,
    pub webhook_secret: Option<String>,
    pub mini_app_url: Option<String>,
    pub admin_username: Option<String>,
    pub otel_exporter_endpoint: Option<String>,
    pub service_name: String,
    /// `0` disables the Prometheus listener.
    pub metrics_port: u16,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn number<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(name)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let database_url = optional("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://hackhub.db?mode=rwc".to_string());

        let server_host = optional("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let server_port = number("SERVER_PORT", 3000)?;

        let api_test = optional("API_TEST").is_some();
        let telegram_token = optional("TELEGRAM_TOKEN");
        if telegram_token.is_none() && !api_test {
            return Err(ConfigError::MissingTelegramToken);
        }

        let init_data_max_age =
            chrono::Duration::hours(i64::from(number::<u32>("INIT_DATA_MAX_AGE_HOURS", 24)?));
        let request_timeout = Duration::from_secs(number("REQUEST_TIMEOUT_SECS", 10)?);
        let dialogue_ttl = Duration::from_secs(60 * number::<u64>("DIALOGUE_TTL_MINUTES", 30)?);
        if dialogue_ttl.is_zero() {
            return Err(ConfigError::InvalidNumber("DIALOGUE_TTL_MINUTES"));
        }

        Ok(Config {
            database_url,
            server_host,
            server_port,
            telegram_token,
            api_test,
            init_data_max_age,
            request_timeout,
            dialogue_ttl,
            webhook_secret: optional("TELEGRAM_WEBHOOK_SECRET"),
            mini_app_url: optional("MINI_APP_URL"),
            admin_username: optional("ADMIN_USERNAME"),
            otel_exporter_endpoint: optional("OTEL_EXPORTER_OTLP_ENDPOINT"),
            service_name: optional("SERVICE_NAME").unwrap_or_else(|| "hackhub".to_string()),
            metrics_port: number("METRICS_PORT", 9000)?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TELEGRAM_TOKEN environment variable not set (set API_TEST to run without it)")]
    MissingTelegramToken,

    #[error("{0} must be a non-negative integer")]
    InvalidNumber(&'static str),
}
