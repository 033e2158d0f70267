use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// Shared secret the scheduler presents on the reminder trigger. When
    /// unset the trigger is open.
    pub cron_secret: Option<String>,
    /// In-process reminder scan interval; `0` disables the scheduler.
    pub reminder_scan_interval_secs: u64,
    /// Account that bypasses reminder deduplication.
    pub reminder_test_user_id: Option<String>,
    /// Public frontend URL used in email and push links.
    pub app_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `CRON_SECRET`                 | (none)                  |
    /// | `REMINDER_SCAN_INTERVAL_SECS` | `0`                     |
    /// | `REMINDER_TEST_USER_ID`       | (none)                  |
    /// | `APP_URL`                     | `http://localhost:5173` |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let reminder_scan_interval_secs: u64 = std::env::var("REMINDER_SCAN_INTERVAL_SECS")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .expect("REMINDER_SCAN_INTERVAL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            cron_secret: optional_var("CRON_SECRET"),
            reminder_scan_interval_secs,
            reminder_test_user_id: optional_var("REMINDER_TEST_USER_ID"),
            app_url: optional_var("APP_URL").unwrap_or_else(|| "http://localhost:5173".into()),
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
