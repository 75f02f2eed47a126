use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | WORK_DIR | ./work_dir | Database and log directory |
/// | LOG_LEVEL | info | Log level |
/// | LOG_JSON | false | JSON console output |
/// | ENVIRONMENT | development | development / staging / production |
/// | EMAIL_SERVICE_URL | http://localhost:5001/send-order-email | Confirmation email endpoint |
/// | INVOICE_SERVICE_URL | http://localhost:5001/send-invoice-email | Invoice email endpoint |
/// | EMAIL_TIMEOUT_MS | 15000 | Email service request timeout |
/// | NOTIFY_LOCK_TTL_SECS | 60 | In-flight send lock expiry |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/orders LOG_JSON=true cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Holds `orders.redb` and `logs/`
    pub work_dir: String,
    pub log_level: String,
    pub log_json: bool,
    /// development | staging | production
    pub environment: String,
    pub email_service_url: String,
    pub invoice_service_url: String,
    pub email_timeout_ms: u64,
    pub notify_lock_ttl_secs: u64,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Missing or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./work_dir".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            email_service_url: std::env::var("EMAIL_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:5001/send-order-email".into()),
            invoice_service_url: std::env::var("INVOICE_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:5001/send-invoice-email".into()),
            email_timeout_ms: std::env::var("EMAIL_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(15000),
            notify_lock_ttl_secs: std::env::var("NOTIFY_LOCK_TTL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(60),
        }
    }

    /// Override the work directory
    ///
    /// Used by tests
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("orders.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn email_timeout(&self) -> Duration {
        Duration::from_millis(self.email_timeout_ms)
    }

    pub fn notify_lock_ttl(&self) -> Duration {
        Duration::from_secs(self.notify_lock_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_work_dir() {
        let config = Config::with_work_dir("/tmp/orders-test");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/orders-test/orders.redb"));
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/orders-test/logs"));
    }

    #[test]
    fn test_durations() {
        let mut config = Config::with_work_dir("w");
        config.email_timeout_ms = 1500;
        config.notify_lock_ttl_secs = 5;
        assert_eq!(config.email_timeout(), Duration::from_millis(1500));
        assert_eq!(config.notify_lock_ttl(), Duration::from_secs(5));
    }

    #[test]
    fn test_environment_check() {
        let mut config = Config::with_work_dir("w");
        config.environment = "production".to_string();
        assert!(config.is_production());
        config.environment = "development".to_string();
        assert!(!config.is_production());
    }
}
