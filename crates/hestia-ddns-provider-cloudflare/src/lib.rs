// # Cloudflare DNS Provider
//
// This crate implements `DnsProvider` over the Cloudflare API v4.
//
// ## Behavior
//
// - Zones and records are listed page by page up to `result_info.total_pages`
// - Record lookups pass the domain as the `name` filter; callers re-check names
// - Updates are a full PUT of type, name, content, ttl and proxied
// - Every request is preceded by the configured pacing delay
// - Network errors, timeouts and retryable statuses are retried with backoff
// - Dry-run mode performs every GET but only logs the PUT it would send
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - List Zones: GET `/zones?page=N&per_page=M`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&page=N`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use hestia_ddns_core::config::ProviderConfig;
use hestia_ddns_core::policy::{PacingPolicy, RetryPolicy};
use hestia_ddns_core::traits::{DnsProvider, DnsRecord, RecordUpdate, Zone};
use hestia_ddns_core::{Error, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Provider name used in errors and logs
const PROVIDER: &str = "cloudflare";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for list endpoints
const PAGE_SIZE: u32 = 50;

/// Maximum response excerpt kept in error messages
const MAX_ERROR_EXCERPT: usize = 200;

/// Envelope shared by every Cloudflare v4 response
#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct CloudflareMessage {
    code: i64,
    message: String,
}

/// Pagination block of list responses
///
/// The echoed `page` is ignored; the requested page number is tracked locally.
#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

impl ResultInfo {
    fn has_page_after(&self, page: u32) -> bool {
        page < self.total_pages
    }
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone listing, record lookup)
/// - Log the intended PUT payload
/// - **NOT** actually modify DNS records
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL without trailing slash
    api_base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip PUT updates
    dry_run: bool,

    /// Delay before every request
    pacing: PacingPolicy,

    /// Retry of transient failures
    retry: RetryPolicy,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("api_base_url", &self.api_base_url)
            .field("dry_run", &self.dry_run)
            .field("pacing", &self.pacing)
            .field("retry", &self.retry)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `api_base_url`: API root, normally `https://api.cloudflare.com/client/v4`
    /// - `dry_run`: If true, perform GET requests but skip PUT updates
    /// - `pacing`: Delay inserted before every request
    /// - `retry`: Retry policy for transient failures
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty token or if the HTTP
    /// client cannot be built.
    pub fn new(
        api_token: impl Into<String>,
        api_base_url: impl Into<String>,
        dry_run: bool,
        pacing: PacingPolicy,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
            pacing,
            retry,
        })
    }

    /// Build a provider from its configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                api_base_url,
                dry_run,
                pacing,
                retry,
            } => {
                if *dry_run {
                    warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
                }
                Self::new(
                    api_token.clone(),
                    api_base_url.clone(),
                    *dry_run,
                    *pacing,
                    retry.clone(),
                )
            }
        }
    }

    /// Whether updates are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    /// Send a request with pacing and retries, returning the parsed envelope
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<CloudflareResponse<T>> {
        let mut attempt = 0;
        loop {
            let Some(req) = request.try_clone() else {
                return Err(Error::provider(PROVIDER, "Request cannot be cloned for sending"));
            };

            self.pacing.pause().await;

            match self.execute_once(req, action).await {
                Ok(response) => return Ok(response),
                Err(e) if self.retry.should_retry(&e, attempt) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {}ms: {}",
                        action,
                        attempt + 1,
                        self.retry.max_attempts,
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a request once and map transport, status and envelope errors
    async fn execute_once<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<CloudflareResponse<T>> {
        debug!("Cloudflare request: {}", action);

        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(PROVIDER, format!("{action}: {e}"))
                } else {
                    Error::network(PROVIDER, format!("{action}: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(PROVIDER, format!("{action}: failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(map_status(status, action, &body));
        }

        let envelope: CloudflareResponse<T> = serde_json::from_str(&body).map_err(|e| {
            Error::provider(PROVIDER, format!("{action}: failed to parse response: {e}"))
        })?;

        if !envelope.success {
            let messages: Vec<String> = envelope
                .errors
                .iter()
                .map(|m| format!("{} ({})", m.message, m.code))
                .collect();
            return Err(Error::provider(
                PROVIDER,
                format!("{action} rejected: {}", messages.join("; ")),
            ));
        }

        Ok(envelope)
    }

    /// Fetch every page of a list endpoint
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        filters: &[(&str, &str)],
        action: &str,
    ) -> Result<Vec<T>> {
        let url = self.url(path);
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let request = self
                .client
                .get(&url)
                .query(filters)
                .query(&[("page", page), ("per_page", PAGE_SIZE)]);

            let envelope: CloudflareResponse<Vec<T>> = self.execute(request, action).await?;
            items.extend(envelope.result.unwrap_or_default());

            match envelope.result_info {
                Some(info) if info.has_page_after(page) => page += 1,
                _ => break,
            }
        }

        Ok(items)
    }
}

/// Map a non-success HTTP status to an error
fn map_status(status: StatusCode, action: &str, body: &str) -> Error {
    let excerpt = excerpt(body);
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{action}: invalid API token or insufficient permissions (status {status})"
        )),
        404 => Error::not_found(format!("{action}: {excerpt}")),
        409 => Error::http_status(
            PROVIDER,
            409,
            format!("{action}: conflict, record is being updated by another process"),
        ),
        429 => Error::http_status(PROVIDER, 429, format!("{action}: rate limit exceeded")),
        code => Error::http_status(PROVIDER, code, format!("{action}: {excerpt}")),
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_EXCERPT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let zones: Vec<Zone> = self.list_all("/zones", &[], "list zones").await?;
        debug!("Cloudflare returned {} zone(s)", zones.len());
        Ok(zones)
    }

    async fn list_records(&self, zone_id: &str, name: Option<&str>) -> Result<Vec<DnsRecord>> {
        let path = format!("/zones/{zone_id}/dns_records");
        let filters: Vec<(&str, &str)> = name.map(|n| ("name", n)).into_iter().collect();
        let action = format!("list records of zone {zone_id}");

        self.list_all(&path, &filters, &action).await
    }

    async fn update_record(&self, zone_id: &str, update: &RecordUpdate) -> Result<DnsRecord> {
        let url = self.url(&format!(
            "/zones/{}/dns_records/{}",
            zone_id, update.record_id
        ));

        if self.dry_run {
            info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(update)?
            );
            return Ok(DnsRecord {
                id: update.record_id.clone(),
                record_type: update.record_type,
                name: update.name.clone(),
                content: update.content.clone(),
                ttl: update.ttl,
                proxied: update.proxied,
            });
        }

        let action = format!("update record {} ({})", update.record_id, update.name);
        let request = self.client.put(&url).json(update);
        let envelope: CloudflareResponse<DnsRecord> = self.execute(request, &action).await?;

        envelope.result.ok_or_else(|| {
            Error::provider(PROVIDER, format!("{action}: response carried no record"))
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
