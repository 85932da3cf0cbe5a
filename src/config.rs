use std::env;

use anyhow::Context;
use chrono::FixedOffset;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    /// Shared secret of the identity provider that signs session tokens.
    pub jwt_secret: String,

    pub claude_api_key: String,
    pub claude_model: String,
    pub claude_base_url: String,

    // Object storage for paper diary scans
    pub storage_url: String,
    pub storage_service_key: String,
    pub storage_bucket: String,

    /// Offset of the reference time zone that decides what "today" is.
    pub reference_utc_offset_hours: i32,

    // Demo mode
    pub demo_comments_per_hour: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("PORT must be a number")?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,

            claude_api_key: env::var("CLAUDE_API_KEY").unwrap_or_default(),
            claude_model: env::var("CLAUDE_MODEL")
                .unwrap_or_else(|_| "claude-3-5-haiku-latest".into()),
            claude_base_url: env::var("CLAUDE_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".into()),

            storage_url: env::var("STORAGE_URL").context("STORAGE_URL must be set")?,
            storage_service_key: env::var("STORAGE_SERVICE_KEY").unwrap_or_default(),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "paper-diaries".into()),

            reference_utc_offset_hours: env::var("REFERENCE_UTC_OFFSET_HOURS")
                .unwrap_or_else(|_| "9".into())
                .parse()
                .context("REFERENCE_UTC_OFFSET_HOURS must be a number")?,

            demo_comments_per_hour: env::var("DEMO_COMMENTS_PER_HOUR")
                .unwrap_or_else(|_| "20".into())
                .parse()
                .unwrap_or(20),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reference_offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.reference_utc_offset_hours * 3600).with_context(|| {
            format!(
                "REFERENCE_UTC_OFFSET_HOURS out of range: {}",
                self.reference_utc_offset_hours
            )
        })
    }

    /// Extra CORS origins, comma separated (LAN testing from another device).
    pub fn extra_origins() -> Vec<String> {
        env::var("CORS_EXTRA_ORIGINS")
            .map(|extra| {
                extra
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
