use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::AppError;

/// Window for demo comment requests.
const DEMO_WINDOW_SECS: u64 = 3600;

/// In-memory rate limit state (for single-instance deployments)
#[derive(Clone, Default)]
pub struct RateLimitState {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
    window: Duration,
}

impl RateLimitEntry {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.window_start) > self.window
    }
}

impl RateLimitState {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the remaining budget, or how long until the window resets.
    pub async fn check_with_limits(
        &self,
        key: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(window_secs);

        // Forget clients whose window has run out.
        entries.retain(|k, e| k == key || !e.expired(now));

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
            window,
        });
        entry.window = window;

        if entry.expired(now) {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= max_requests {
            let retry_after = window.saturating_sub(now.duration_since(entry.window_start));
            return Err(retry_after);
        }

        entry.count += 1;
        Ok(max_requests - entry.count)
    }

    #[cfg(test)]
    pub(crate) async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Demo visitors get generated comments without an account, so each
    /// client address has an hourly budget.
    pub async fn check_demo_comment(
        &self,
        addr: Option<SocketAddr>,
        per_hour: u32,
    ) -> Result<(), AppError> {
        let ip = addr
            .map(|a| a.ip().to_string())
            .unwrap_or_else(|| "unknown".into());
        let key = format!("demo-comment:{}", ip);

        match self.check_with_limits(&key, per_hour, DEMO_WINDOW_SECS).await {
            Ok(remaining) => {
                tracing::debug!(ip = %ip, remaining, "Demo rate limit check passed");
                Ok(())
            }
            Err(retry_after) => {
                tracing::warn!(
                    ip = %ip,
                    retry_after_secs = retry_after.as_secs(),
                    "Demo rate limit exceeded"
                );
                Err(AppError::RateLimited)
            }
        }
    }
}
