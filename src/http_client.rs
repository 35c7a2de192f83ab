use crate::config::Settings;
use crate::error::{AggregatorError, Result};

/// Builds the single process-wide HTTP client every crawl task shares.
/// Connection limits and timeouts come from `Settings`; when proxy
/// rotation is enabled, all traffic is routed through the configured
/// endpoint instead of dialing providers directly.
pub fn build_client(settings: &Settings) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(settings.http_max_idle_per_host)
        .timeout(settings.http_request_timeout)
        .connect_timeout(settings.http_connect_timeout)
        .user_agent("sportscanner/0.1");

    if settings.use_proxies {
        let endpoint = settings
            .rotating_proxy_endpoint
            .as_deref()
            .ok_or_else(|| AggregatorError::Config("USE_PROXIES set without an endpoint".into()))?;
        let proxy = reqwest::Proxy::all(endpoint)
            .map_err(|error| AggregatorError::Config(format!("invalid proxy endpoint: {error}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|error| AggregatorError::Config(format!("failed to build HTTP client: {error}")))
}
