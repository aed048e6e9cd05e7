/// Server configuration
///
/// # Environment variables
///
/// Every item can be overridden through the environment:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | DATABASE_PATH | swap.db | SQLite database file |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | LOG_LEVEL | info | tracing level filter |
/// | LOG_DIR | (unset) | daily-rolling log directory |
/// | INITIAL_GRANT_CREDITS | 10 | credits granted on profile creation |
/// | MAX_SESSION_CREDITS | 100 | per-session credit ceiling |
/// | MIN_CLAIM_LEVEL | 2 | minimum level to claim a bounty |
/// | RESERVATION_TIMEOUT_HOURS | 24 | age before a requested hold expires |
/// | SWEEP_INTERVAL_SECS | 300 | expiry sweeper period |
/// | NOTIFY_WEBHOOK_URL | (unset) | best-effort event webhook |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub http_port: u16,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// Credits every new profile starts with
    pub initial_grant_credits: i64,
    /// Upper bound on any single reservation
    pub max_session_credits: i64,
    /// Level gate for bounty claims
    pub min_claim_level: i64,
    pub reservation_timeout_hours: i64,
    pub sweep_interval_secs: u64,
    pub notify_webhook_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        Self {
            database_path: std::env::var("DATABASE_PATH").unwrap_or_else(|_| "swap.db".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            initial_grant_credits: std::env::var("INITIAL_GRANT_CREDITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            max_session_credits: std::env::var("MAX_SESSION_CREDITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            min_claim_level: std::env::var("MIN_CLAIM_LEVEL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            reservation_timeout_hours: std::env::var("RESERVATION_TIMEOUT_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),
        }
    }

    /// Reservation timeout in epoch milliseconds
    pub fn reservation_timeout_ms(&self) -> i64 {
        self.reservation_timeout_hours * 3_600_000
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
