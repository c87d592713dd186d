//! Application state

use aws_sdk_sesv2::Client as SesClient;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// AWS SES client for sending emails
    pub ses: SesClient,
    /// SES sender email address
    pub ses_from_email: String,
    /// Prefix for generated order references
    pub reference_prefix: String,
    /// Upper bound on a single order/status transaction
    pub tx_timeout: Duration,
    /// Public base URL used in email links
    pub public_base_url: String,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let ses = SesClient::new(&aws_config);

        Ok(Self {
            pool,
            ses,
            ses_from_email: config.ses_from_email.clone(),
            reference_prefix: config.reference_prefix.clone(),
            tx_timeout: Duration::from_millis(config.tx_timeout_ms),
            public_base_url: config.public_base_url.clone(),
        })
    }
}
