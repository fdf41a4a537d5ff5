use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for webhook rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether to enable rate limiting
    pub enabled: bool,
    /// Maximum number of requests per window
    pub max_requests: u32,
    /// Window duration in seconds
    pub window_seconds: u64,
    /// Per-provider rate limits (override the global settings)
    pub per_provider: HashMap<String, ProviderRateLimit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRateLimit {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_seconds: 60,
            per_provider: HashMap::new(),
        }
    }
}

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);
const MAX_IDLE: Duration = Duration::from_secs(3600);

/// Token-bucket rate limiter keyed by arbitrary strings.
///
/// Webhook endpoints key buckets as `provider` or `provider:client-ip` (see
/// [`KeyGenerator`]); the per-provider table lets a chatty provider get its
/// own allowance. Idle buckets are dropped during checks, so no background
/// task is needed.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<Buckets>>,
}

#[derive(Debug)]
struct Buckets {
    map: HashMap<String, TokenBucket>,
    last_cleanup: Instant,
}

#[derive(Debug)]
struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
    max_tokens: u32,
    refill_rate: f64, // tokens per second
}

impl TokenBucket {
    fn new(max_tokens: u32, window_seconds: u64) -> Self {
        let refill_rate = max_tokens as f64 / window_seconds as f64;
        Self {
            tokens: max_tokens,
            last_refill: Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        let tokens_to_add = (elapsed * self.refill_rate).floor() as u32;

        if tokens_to_add > 0 {
            self.tokens = (self.tokens + tokens_to_add).min(self.max_tokens);
            self.last_refill = now;
        }
    }

    fn retry_after(&self) -> Duration {
        Duration::from_secs_f64((1.0 / self.refill_rate).ceil())
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(Buckets {
                map: HashMap::new(),
                last_cleanup: Instant::now(),
            })),
        }
    }

    /// Check whether a request for `key` should be allowed right now.
    pub fn check_rate_limit(&self, key: &str) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::Allowed;
        }

        let (max_requests, window_seconds) = self.limits_for(key);

        let mut buckets = self.buckets.lock().unwrap();

        let now = Instant::now();
        if now.duration_since(buckets.last_cleanup) > CLEANUP_INTERVAL {
            buckets.map.retain(|key, bucket| {
                let keep = now.duration_since(bucket.last_refill) < MAX_IDLE;
                if !keep {
                    debug!("dropping idle rate limit bucket for key: {}", key);
                }
                keep
            });
            buckets.last_cleanup = now;
        }

        let bucket = buckets
            .map
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(max_requests, window_seconds));

        if bucket.try_consume() {
            debug!("rate limit check passed for key: {}", key);
            RateLimitResult::Allowed
        } else {
            warn!("rate limit exceeded for key: {}", key);
            RateLimitResult::Limited {
                retry_after: bucket.retry_after(),
            }
        }
    }

    fn limits_for(&self, key: &str) -> (u32, u64) {
        // Keys look like "provider" or "provider:identifier".
        let provider = key.split(':').next().unwrap_or(key);
        match self.config.per_provider.get(provider) {
            Some(limit) => (limit.max_requests, limit.window_seconds),
            None => (self.config.max_requests, self.config.window_seconds),
        }
    }
}

/// Result of a rate limit check
#[derive(Debug)]
pub enum RateLimitResult {
    Allowed,
    Limited { retry_after: Duration },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed)
    }
}

/// Generic rate limit key generator
pub trait KeyGenerator {
    fn generate_key(&self, provider: &str, identifier: &str) -> String {
        format!("{}:{}", provider, identifier)
    }

    fn extract_client_ip(&self, headers: &msg_core::Headers) -> Option<String> {
        // Look for common IP headers
        for (name, value) in headers {
            match name.to_lowercase().as_str() {
                "x-forwarded-for" => return Some(value.split(',').next()?.trim().to_string()),
                "x-real-ip" => return Some(value.clone()),
                "cf-connecting-ip" => return Some(value.clone()),
                _ => continue,
            }
        }
        None
    }
}

/// Default key generator implementation
pub struct DefaultKeyGenerator;

impl KeyGenerator for DefaultKeyGenerator {}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_requests: u32, window_seconds: u64) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            max_requests,
            window_seconds,
            per_provider: HashMap::new(),
        }
    }

    #[test]
    fn allows_requests_within_the_limit() {
        let limiter = RateLimiter::new(config(2, 60));

        assert!(limiter.check_rate_limit("twilio").is_allowed());
        assert!(limiter.check_rate_limit("twilio").is_allowed());
        assert!(!limiter.check_rate_limit("twilio").is_allowed());
    }

    #[test]
    fn limited_result_carries_a_retry_hint() {
        let limiter = RateLimiter::new(config(1, 60));

        assert!(limiter.check_rate_limit("twilio").is_allowed());
        match limiter.check_rate_limit("twilio") {
            RateLimitResult::Limited { retry_after } => {
                assert!(retry_after >= Duration::from_secs(1));
            }
            RateLimitResult::Allowed => panic!("second request should be limited"),
        }
    }

    #[test]
    fn disabled_limiter_allows_everything() {
        let mut cfg = config(1, 60);
        cfg.enabled = false;
        let limiter = RateLimiter::new(cfg);

        for _ in 0..10 {
            assert!(limiter.check_rate_limit("twilio").is_allowed());
        }
    }

    #[test]
    fn keys_get_independent_buckets() {
        let limiter = RateLimiter::new(config(1, 60));

        assert!(limiter.check_rate_limit("twilio:1.2.3.4").is_allowed());
        assert!(limiter.check_rate_limit("twilio:5.6.7.8").is_allowed());
        assert!(!limiter.check_rate_limit("twilio:1.2.3.4").is_allowed());
    }

    #[test]
    fn per_provider_limits_override_the_global_limit() {
        let mut per_provider = HashMap::new();
        per_provider.insert(
            "twilio".to_string(),
            ProviderRateLimit {
                max_requests: 10,
                window_seconds: 60,
            },
        );
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: true,
            max_requests: 2,
            window_seconds: 60,
            per_provider,
        });

        // Twilio gets its own allowance of 10.
        for _ in 0..10 {
            assert!(limiter.check_rate_limit("twilio:test").is_allowed());
        }
        assert!(!limiter.check_rate_limit("twilio:test").is_allowed());

        // SendGrid falls back to the global limit of 2.
        assert!(limiter.check_rate_limit("sendgrid:test").is_allowed());
        assert!(limiter.check_rate_limit("sendgrid:test").is_allowed());
        assert!(!limiter.check_rate_limit("sendgrid:test").is_allowed());
    }

    #[test]
    fn key_generator_extracts_forwarded_ips() {
        let headers: msg_core::Headers = vec![(
            "X-Forwarded-For".to_string(),
            "203.0.113.9, 198.51.100.2".to_string(),
        )];
        let key_gen = DefaultKeyGenerator;
        assert_eq!(
            key_gen.extract_client_ip(&headers),
            Some("203.0.113.9".to_string())
        );
        assert_eq!(key_gen.generate_key("twilio", "203.0.113.9"), "twilio:203.0.113.9");
    }
}
