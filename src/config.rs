use clap::Parser;
use std::time::Duration;
use crate::transport::TransportSettings;

pub const DEFAULT_MAX_CONCURRENT: usize = 10;
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(5000);

/// Limits applied by the scheduler. Can be changed while it runs; see
/// [`ConfigUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of admitted (throttled or in-flight) calls.
    pub max_concurrent: usize,
    /// Minimum spacing between two dispatches to the same endpoint.
    pub min_interval: Duration,
    /// How long a successful result answers identical calls.
    pub cache_ttl: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            min_interval: DEFAULT_MIN_INTERVAL,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

// Partial config change; None keeps the current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub max_concurrent: Option<usize>,
    pub min_interval: Option<Duration>,
    pub cache_ttl: Option<Duration>,
}

impl SchedulerConfig {
    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(max_concurrent) = update.max_concurrent {
            self.max_concurrent = max_concurrent;
        }
        if let Some(min_interval) = update.min_interval {
            self.min_interval = min_interval;
        }
        if let Some(cache_ttl) = update.cache_ttl {
            self.cache_ttl = cache_ttl;
        }
    }
}

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "dispatch-gateway")]
#[command(about = "Request orchestrating sidecar for the dispatch dashboard")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Dashboard backend base url
    // Example: "api.dispatch.local:3000/api"
    #[arg(short, long, default_value = "localhost:3000")]
    pub backend: String,

    // Max calls admitted at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT)]
    pub max_concurrent: usize,

    // Min spacing between calls to one endpoint, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub min_interval_ms: u64,

    // Cache TTL in milliseconds
    #[arg(short, long, default_value_t = 5000)]
    pub cache_ttl_ms: u64,

    // Header carrying the workspace identifier
    #[arg(long, default_value = "X-Tenant-Id")]
    pub tenant_header: String,

    // Where the dashboard is sent when the session ends
    #[arg(long, default_value = "/login")]
    pub login_route: String,

    // Backend path of the login call, exempt from stale-session detection
    #[arg(long, default_value = "/auth/login")]
    pub login_path: String,

    // Text in a 404 body that means the session's workspace is gone
    #[arg(long, default_value = "workspace not found")]
    pub stale_session_marker: String,
}

impl Args {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrent: self.max_concurrent,
            min_interval: Duration::from_millis(self.min_interval_ms),
            cache_ttl: Duration::from_millis(self.cache_ttl_ms),
        }
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            tenant_header: self.tenant_header.clone(),
            login_route: self.login_route.clone(),
            login_path: self.login_path.clone(),
            stale_session_marker: self.stale_session_marker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let args = Args::parse_from(["dispatch-gateway"]);
        assert_eq!(args.scheduler_config(), SchedulerConfig::default());
        assert_eq!(args.transport_settings(), TransportSettings::default());
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let mut config = SchedulerConfig::default();
        config.apply(ConfigUpdate {
            max_concurrent: Some(2),
            ..ConfigUpdate::default()
        });
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.min_interval, DEFAULT_MIN_INTERVAL);
        assert_eq!(config.cache_ttl, DEFAULT_CACHE_TTL);
    }
}
