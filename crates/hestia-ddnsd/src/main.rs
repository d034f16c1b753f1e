// # hestia-ddnsd - HestiaCP to Cloudflare DNS sync
//
// This is a thin wiring layer: it reads configuration from the environment,
// builds the HestiaCP, IP discovery and Cloudflare adapters, and runs one
// reconciliation pass of `hestia_ddns_core::ReconcileEngine`. Schedule it
// with a systemd timer or cron; there is no internal loop.
//
// ## Configuration
//
// ### Cloudflare
// - `CLOUDFLARE_API_TOKEN`: API token (required)
// - `CLOUDFLARE_API_BASE_URL`: API root (default: https://api.cloudflare.com/client/v4)
// - `CLOUDFLARE_EXCLUDED_DOMAINS`: Comma-separated domains never touched
//
// ### IP discovery
// - `IP_SERVICE_URLS`: Comma-separated echo services, tried in order
//
// ### HestiaCP
// - `V_LIST_USERS_PATH`, `V_LIST_WEB_DOMAINS_PATH`, `V_UPDATE_SYS_IP_PATH`
//
// ### Records
// - `DDNS_RECORD_TTL`: TTL written on update, or `preserve` (default: 1, automatic)
// - `DDNS_RECORD_PROXIED`: `true`, `false` or `preserve` (default: false)
// - `DDNS_SYNC_SYSTEM_IP`: Run `v-update-sys-ip` after the pass (default: true)
//
// ### Runtime
// - `.env` next to the executable, else `/etc/hestia-ddns/.env`, is loaded
//   first and overrides the environment
// - `DDNS_LOG_LEVEL` (or `LOG_LEVEL`): trace, debug, info, warn, error
// - `DDNS_MODE=dry-run`: Read everything, log updates instead of sending them
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=your_token
// export CLOUDFLARE_EXCLUDED_DOMAINS=internal.example.com
// hestia-ddnsd
// ```

use anyhow::{Context, Result};
use hestia_ddns_core::config::{
    DEFAULT_CLOUDFLARE_API_BASE, DEFAULT_IP_SERVICES, DdnsConfig, HestiaConfig, IpSourceConfig,
    ProviderConfig, RecordPolicy, SyncConfig,
};
use hestia_ddns_core::{EngineEvent, ReconcileEngine, RunReport};
use hestia_ddns_hestia::{HestiaCli, HestiaSystemSync};
use hestia_ddns_ip_http::HttpIpSource;
use hestia_ddns_provider_cloudflare::CloudflareProvider;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Pass completed (individual domains may have failed)
/// - 1: Configuration or startup error
/// - 2: Fatal run error (no IP, no inventory, no zone listing)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Pass completed
    Completed = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Fatal precondition failed during the run
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// System-wide `.env` fallback
const SYSTEM_ENV_FILE: &str = "/etc/hestia-ddns/.env";

/// `.env` locations in lookup order
fn env_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(2);
    if let Some(dir) = env::current_exe().ok().as_deref().and_then(Path::parent) {
        candidates.push(dir.join(".env"));
    }
    candidates.push(PathBuf::from(SYSTEM_ENV_FILE));
    candidates
}

/// Load the first existing `.env` file, overriding variables already set
///
/// Returns the file loaded, or `None` if no candidate exists.
fn load_env_file(candidates: &[PathBuf]) -> Result<Option<PathBuf>> {
    let Some(path) = candidates.iter().find(|path| path.is_file()) else {
        return Ok(None);
    };
    dotenvy::from_path_override(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(Some(path.clone()))
}

/// Application configuration as read from the environment
struct Config {
    api_token: String,
    api_base_url: String,
    excluded_domains: Vec<String>,
    ip_services: Vec<String>,
    list_users_path: String,
    list_web_domains_path: String,
    update_sys_ip_path: String,
    record_ttl: Option<u32>,
    record_proxied: Option<bool>,
    sync_system_ip: bool,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`; empty values count as unset
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = HestiaConfig::default();

        Ok(Self {
            api_token: var("CLOUDFLARE_API_TOKEN").unwrap_or_default(),
            api_base_url: var("CLOUDFLARE_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CLOUDFLARE_API_BASE.to_string()),
            excluded_domains: split_list(var("CLOUDFLARE_EXCLUDED_DOMAINS").as_deref()),
            ip_services: match var("IP_SERVICE_URLS") {
                Some(urls) => split_list(Some(&urls)),
                None => DEFAULT_IP_SERVICES.iter().map(|s| s.to_string()).collect(),
            },
            list_users_path: var("V_LIST_USERS_PATH").unwrap_or(defaults.list_users_path),
            list_web_domains_path: var("V_LIST_WEB_DOMAINS_PATH")
                .unwrap_or(defaults.list_web_domains_path),
            update_sys_ip_path: var("V_UPDATE_SYS_IP_PATH").unwrap_or(defaults.update_sys_ip_path),
            record_ttl: match var("DDNS_RECORD_TTL") {
                None => RecordPolicy::default().ttl,
                Some(v) if v.eq_ignore_ascii_case("preserve") => None,
                Some(v) => Some(
                    v.parse()
                        .with_context(|| format!("DDNS_RECORD_TTL '{v}' is not a number"))?,
                ),
            },
            record_proxied: match var("DDNS_RECORD_PROXIED") {
                None => RecordPolicy::default().proxied,
                Some(v) if v.eq_ignore_ascii_case("preserve") => None,
                Some(v) => Some(parse_bool("DDNS_RECORD_PROXIED", &v)?),
            },
            sync_system_ip: match var("DDNS_SYNC_SYSTEM_IP") {
                None => true,
                Some(v) => parse_bool("DDNS_SYNC_SYSTEM_IP", &v)?,
            },
            dry_run: var("DDNS_MODE").is_some_and(|mode| mode.eq_ignore_ascii_case("dry-run")),
            log_level: var("DDNS_LOG_LEVEL")
                .or_else(|| var("LOG_LEVEL"))
                .unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks the values only the daemon knows about; the assembled
    /// `DdnsConfig` is validated by `into_ddns_config`.
    fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            anyhow::bail!(
                "CLOUDFLARE_API_TOKEN is required. \
                Set it via: export CLOUDFLARE_API_TOKEN=your_token"
            );
        }

        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower == "token"
        {
            anyhow::bail!(
                "CLOUDFLARE_API_TOKEN appears to be a placeholder. \
                Use an actual API token from Cloudflare."
            );
        }

        if let Some(ttl) = self.record_ttl
            && ttl != 1
            && !(60..=86400).contains(&ttl)
        {
            anyhow::bail!(
                "DDNS_RECORD_TTL must be 1 (automatic) or between 60 and 86400 seconds. Got: {}",
                ttl
            );
        }

        for domain in &self.excluded_domains {
            validate_domain_name(domain)
                .with_context(|| format!("Invalid entry in CLOUDFLARE_EXCLUDED_DOMAINS: '{domain}'"))?;
        }

        Ok(())
    }

    /// Tracing level; `None` if the configured level is not recognized
    fn tracing_level(&self) -> Option<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" | "critical" => Some(Level::ERROR),
            _ => None,
        }
    }

    /// Assemble and validate the library configuration
    fn into_ddns_config(self) -> Result<DdnsConfig> {
        let mut provider = ProviderConfig::cloudflare(self.api_token);
        let ProviderConfig::Cloudflare {
            api_base_url,
            dry_run,
            ..
        } = &mut provider;
        *api_base_url = self.api_base_url;
        *dry_run = self.dry_run;

        let config = DdnsConfig {
            ip_source: IpSourceConfig {
                services: self.ip_services,
                ..IpSourceConfig::default()
            },
            provider,
            hestia: HestiaConfig {
                list_users_path: self.list_users_path,
                list_web_domains_path: self.list_web_domains_path,
                update_sys_ip_path: self.update_sys_ip_path,
            },
            sync: SyncConfig {
                excluded_domains: self.excluded_domains,
                record_policy: RecordPolicy {
                    ttl: self.record_ttl,
                    proxied: self.record_proxied,
                },
                sync_system_ip: self.sync_system_ip,
                ..SyncConfig::default()
            },
        };

        config.validate()?;
        Ok(config)
    }
}

/// Split a comma-separated list, dropping empty entries
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{key} '{value}' is not a boolean (true/false)"),
    }
}

/// Validate that a string is a plausible DNS domain name
///
/// Basic RFC 1035 checks: total length, label length, characters.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.len() > 253 {
        anyhow::bail!("Domain name too long: {} chars (max 253)", domain.len());
    }

    for label in domain.trim_end_matches('.').split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label");
        }

        if label.len() > 63 {
            anyhow::bail!("Domain label too long: {} chars (max 63)", label.len());
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            anyhow::bail!("Domain label '{}' contains invalid characters", label);
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!("Domain label '{}' cannot start or end with hyphen", label);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let env_candidates = env_file_candidates();
    let env_file = match load_env_file(&env_candidates) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.tracing_level();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level.unwrap_or(Level::INFO))
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    if log_level.is_none() {
        warn!("Unknown log level '{}', using info", config.log_level);
    }

    match &env_file {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => warn!(
            "No .env file found (tried: {}); using the process environment",
            env_candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }

    info!("Starting hestia-ddnsd");
    if config.dry_run {
        warn!("DRY-RUN mode: DNS records will not be modified");
    }

    let ddns_config = match config.into_ddns_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration validation error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };
    debug!(config = ?ddns_config, "Configuration loaded");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let (engine, events) = match build_engine(&ddns_config) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let result = rt.block_on(run_once(engine, events));
    exit_code(&result).into()
}

/// Map the outcome of a pass to the process exit code
///
/// Per-domain failures still count as a completed pass.
fn exit_code(result: &Result<RunReport>) -> DdnsExitCode {
    match result {
        Ok(report) => {
            if report.has_failures() {
                warn!("{} domain(s) failed; see the log above", report.failed());
            }
            DdnsExitCode::Completed
        }
        Err(e) => {
            error!("Run aborted: {:#}", e);
            DdnsExitCode::RuntimeError
        }
    }
}

/// Build the adapters and the engine from the library configuration
fn build_engine(config: &DdnsConfig) -> Result<(ReconcileEngine, mpsc::Receiver<EngineEvent>)> {
    let ip_source = HttpIpSource::from_config(&config.ip_source)?;
    let provider = CloudflareProvider::from_config(&config.provider)?;
    let inventory = HestiaCli::from_config(&config.hestia);
    let system_sync = HestiaSystemSync::from_config(&config.hestia);

    let (engine, events) = ReconcileEngine::new(
        Box::new(ip_source),
        Box::new(inventory),
        Box::new(provider),
        config.sync.clone(),
    )?;

    Ok((engine.with_system_sync(Box::new(system_sync)), events))
}

/// Run one pass while draining engine events into the debug log
async fn run_once(
    engine: ReconcileEngine,
    mut events: mpsc::Receiver<EngineEvent>,
) -> Result<RunReport> {
    let drain = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(event = ?event, "Engine event");
        }
    });

    let result = engine.run().await;

    // Dropping the engine closes the channel and ends the drain task
    drop(engine);
    if let Err(e) = drain.await {
        warn!("Event drain task failed: {}", e);
    }

    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hestia_ddns_core::traits::{
        DnsProvider, DnsRecord, Inventory, IpSource, RecordUpdate, WebDomain, Zone,
    };
    use std::collections::HashMap;
    use std::net::IpAddr;
    use tempfile::TempDir;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[("CLOUDFLARE_API_TOKEN", "abcdefghijklmnopqrstuvwxyz0123456789")])
            .expect("loads");

        assert!(config.validate().is_ok());
        assert_eq!(config.api_base_url, DEFAULT_CLOUDFLARE_API_BASE);
        assert_eq!(config.ip_services, vec!["https://api.ipify.org", "https://ifconfig.me/ip"]);
        assert_eq!(config.record_ttl, Some(1));
        assert_eq!(config.record_proxied, Some(false));
        assert!(config.sync_system_ip);
        assert!(!config.dry_run);
        assert_eq!(config.list_users_path, "/usr/local/hestia/bin/v-list-users");
    }

    #[test]
    fn missing_token_fails_validation() {
        let config = config_from(&[]).expect("loads");
        assert!(config.validate().is_err());
    }

    #[test]
    fn placeholder_token_fails_validation() {
        let config = config_from(&[("CLOUDFLARE_API_TOKEN", "your_token")]).expect("loads");
        assert!(config.validate().is_err());
    }

    #[test]
    fn lists_are_trimmed_and_split() {
        let config = config_from(&[
            ("CLOUDFLARE_API_TOKEN", "abcdefghijklmnopqrstuvwxyz0123456789"),
            ("CLOUDFLARE_EXCLUDED_DOMAINS", " a.example.com, ,b.example.com "),
            ("IP_SERVICE_URLS", "https://one.test,https://two.test"),
        ])
        .expect("loads");

        assert_eq!(config.excluded_domains, vec!["a.example.com", "b.example.com"]);
        assert_eq!(config.ip_services, vec!["https://one.test", "https://two.test"]);
    }

    #[test]
    fn record_policy_can_preserve() {
        let config = config_from(&[
            ("DDNS_RECORD_TTL", "preserve"),
            ("DDNS_RECORD_PROXIED", "PRESERVE"),
        ])
        .expect("loads");

        assert_eq!(config.record_ttl, None);
        assert_eq!(config.record_proxied, None);
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(config_from(&[("DDNS_RECORD_TTL", "soon")]).is_err());
        assert!(config_from(&[("DDNS_SYNC_SYSTEM_IP", "maybe")]).is_err());

        let config = config_from(&[
            ("CLOUDFLARE_API_TOKEN", "abcdefghijklmnopqrstuvwxyz0123456789"),
            ("DDNS_RECORD_TTL", "30"),
        ])
        .expect("loads");
        assert!(config.validate().is_err());
    }

    #[test]
    fn log_level_falls_back() {
        let config = config_from(&[("LOG_LEVEL", "DEBUG")]).expect("loads");
        assert_eq!(config.tracing_level(), Some(Level::DEBUG));

        let config = config_from(&[("DDNS_LOG_LEVEL", "loud"), ("LOG_LEVEL", "debug")])
            .expect("loads");
        assert_eq!(config.tracing_level(), None);
    }

    #[test]
    fn dry_run_reaches_provider_config() {
        let config = config_from(&[
            ("CLOUDFLARE_API_TOKEN", "abcdefghijklmnopqrstuvwxyz0123456789"),
            ("DDNS_MODE", "dry-run"),
            ("CLOUDFLARE_API_BASE_URL", "http://127.0.0.1:8080"),
        ])
        .expect("loads");

        let ddns = config.into_ddns_config().expect("valid");
        let ProviderConfig::Cloudflare {
            dry_run,
            api_base_url,
            ..
        } = &ddns.provider;
        assert!(*dry_run);
        assert_eq!(api_base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn domain_name_validation() {
        assert!(validate_domain_name("www.example.com").is_ok());
        assert!(validate_domain_name("example.com.").is_ok());
        assert!(validate_domain_name("bad..example.com").is_err());
        assert!(validate_domain_name("-bad.example.com").is_err());
        assert!(validate_domain_name("sp ace.example.com").is_err());
    }

    #[test]
    fn env_file_candidates_end_with_system_file() {
        let candidates = env_file_candidates();
        assert_eq!(candidates.last(), Some(&PathBuf::from(SYSTEM_ENV_FILE)));
        assert!(candidates.iter().all(|path| path.ends_with(".env")));
    }

    #[test]
    fn first_existing_env_file_is_loaded() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("missing").join(".env");
        let present = dir.path().join(".env");
        std::fs::write(&present, "HESTIA_DDNSD_ENV_FILE_TEST=from-file\n").expect("write .env");

        let loaded = load_env_file(&[missing, present.clone()]).expect("loads");

        assert_eq!(loaded, Some(present));
        assert_eq!(
            env::var("HESTIA_DDNSD_ENV_FILE_TEST").ok().as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn no_env_file_is_not_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let loaded = load_env_file(&[dir.path().join(".env")]).expect("nothing to load");
        assert_eq!(loaded, None);
    }

    struct StubIpSource(Option<IpAddr>);

    #[async_trait]
    impl IpSource for StubIpSource {
        async fn current(&self) -> hestia_ddns_core::Result<IpAddr> {
            self.0
                .ok_or_else(|| hestia_ddns_core::Error::ip_source("every service failed"))
        }
    }

    struct StubInventory(Vec<WebDomain>);

    #[async_trait]
    impl Inventory for StubInventory {
        async fn list_users(&self) -> hestia_ddns_core::Result<Vec<String>> {
            Ok(vec!["admin".to_string()])
        }

        async fn list_domains(&self, _user: &str) -> hestia_ddns_core::Result<Vec<WebDomain>> {
            Ok(self.0.clone())
        }
    }

    /// Provider with one zone whose record lookups always fail
    struct StubProvider;

    #[async_trait]
    impl DnsProvider for StubProvider {
        async fn list_zones(&self) -> hestia_ddns_core::Result<Vec<Zone>> {
            Ok(vec![Zone::new("z1", "example.com")])
        }

        async fn list_records(
            &self,
            _zone_id: &str,
            _name: Option<&str>,
        ) -> hestia_ddns_core::Result<Vec<DnsRecord>> {
            Err(hestia_ddns_core::Error::network("stub", "connection reset"))
        }

        async fn update_record(
            &self,
            _zone_id: &str,
            _update: &RecordUpdate,
        ) -> hestia_ddns_core::Result<DnsRecord> {
            Err(hestia_ddns_core::Error::provider("stub", "no updates expected"))
        }

        fn provider_name(&self) -> &'static str {
            "stub"
        }
    }

    fn engine(
        ip: Option<IpAddr>,
        domains: Vec<WebDomain>,
    ) -> (ReconcileEngine, mpsc::Receiver<EngineEvent>) {
        ReconcileEngine::new(
            Box::new(StubIpSource(ip)),
            Box::new(StubInventory(domains)),
            Box::new(StubProvider),
            SyncConfig::default(),
        )
        .expect("engine builds")
    }

    #[tokio::test]
    async fn aborted_run_exits_with_runtime_error() {
        let (engine, events) = engine(None, Vec::new());

        let result = run_once(engine, events).await;

        assert!(result.is_err());
        assert_eq!(exit_code(&result), DdnsExitCode::RuntimeError);
        assert_eq!(DdnsExitCode::RuntimeError as u8, 2);
    }

    #[tokio::test]
    async fn domain_failures_still_complete() {
        let ip = "203.0.113.7".parse().ok();
        let (engine, events) = engine(ip, vec![WebDomain::new("www.example.com", Vec::<String>::new())]);

        let result = run_once(engine, events).await;

        let report = result.as_ref().expect("pass completes");
        assert_eq!(report.failed(), 1);
        assert_eq!(exit_code(&result), DdnsExitCode::Completed);
    }

    #[tokio::test]
    async fn empty_inventory_completes() {
        let (engine, events) = engine("203.0.113.7".parse().ok(), Vec::new());

        let result = run_once(engine, events).await;

        assert_eq!(exit_code(&result), DdnsExitCode::Completed);
    }
}
