//! Server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Prefix for generated order references (e.g. `ORD` -> ORD20250829001)
    pub reference_prefix: String,
    /// Upper bound on a single order/status transaction, in milliseconds
    pub tx_timeout_ms: u64,
    /// SES sender email address
    pub ses_from_email: String,
    /// Public base URL used in email links
    pub public_base_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment,
            reference_prefix: std::env::var("REFERENCE_PREFIX").unwrap_or_else(|_| "ORD".into()),
            tx_timeout_ms: std::env::var("TX_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5_000),
            ses_from_email: std::env::var("SES_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@example.org".into()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
        })
    }
}
