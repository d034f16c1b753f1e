// # HestiaCP Adapter
//
// Reads the panel inventory through the HestiaCP command-line tools and
// runs the panel's system IP sync after a reconciliation pass.
//
// ## Commands
//
// - `v-list-users json`: object keyed by user name
// - `v-list-web-domains <user> json`: object keyed by domain, each entry
//   carrying an `ALIAS` string separated by commas and/or whitespace
// - `v-update-sys-ip`: no arguments, exit status only

use async_trait::async_trait;
use hestia_ddns_core::config::HestiaConfig;
use hestia_ddns_core::traits::{Inventory, SystemSync, WebDomain};
use hestia_ddns_core::{Error, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Inventory backed by the HestiaCP command-line tools
#[derive(Debug, Clone)]
pub struct HestiaCli {
    list_users_path: PathBuf,
    list_web_domains_path: PathBuf,
}

impl HestiaCli {
    /// Create an inventory from the paths of `v-list-users` and `v-list-web-domains`
    ///
    /// The paths are not checked here; a missing binary surfaces as an
    /// inventory error on first use.
    pub fn new(list_users_path: impl Into<PathBuf>, list_web_domains_path: impl Into<PathBuf>) -> Self {
        Self {
            list_users_path: list_users_path.into(),
            list_web_domains_path: list_web_domains_path.into(),
        }
    }

    /// Build an inventory from the configured command paths
    pub fn from_config(config: &HestiaConfig) -> Self {
        Self::new(&config.list_users_path, &config.list_web_domains_path)
    }

    /// Run a listing command and parse its stdout as a JSON object
    async fn run_json(&self, program: &Path, args: &[&str]) -> Result<Map<String, Value>> {
        debug!("Running {} {}", program.display(), args.join(" "));

        let output = Command::new(program).args(args).output().await.map_err(|e| {
            Error::inventory(format!("Failed to run {}: {}", program.display(), e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::inventory(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_object(&stdout).map_err(|e| {
            Error::inventory(format!("Unexpected output from {}: {}", program.display(), e))
        })
    }
}

#[async_trait]
impl Inventory for HestiaCli {
    async fn list_users(&self) -> Result<Vec<String>> {
        let users = self.run_json(&self.list_users_path, &["json"]).await?;
        Ok(users.into_iter().map(|(user, _)| user).collect())
    }

    async fn list_domains(&self, user: &str) -> Result<Vec<WebDomain>> {
        let domains = self
            .run_json(&self.list_web_domains_path, &[user, "json"])
            .await?;
        Ok(web_domains(domains))
    }
}

/// Parse a listing; empty output is an empty listing
fn parse_object(stdout: &str) -> std::result::Result<Map<String, Value>, String> {
    if stdout.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(stdout) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn web_domains(listing: Map<String, Value>) -> Vec<WebDomain> {
    listing
        .into_iter()
        .map(|(domain, props)| {
            let aliases = props
                .get("ALIAS")
                .and_then(Value::as_str)
                .map(split_aliases)
                .unwrap_or_default();
            WebDomain {
                domain,
                aliases,
            }
        })
        .collect()
}

/// Split an `ALIAS` value on commas and whitespace
fn split_aliases(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|alias| !alias.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs `v-update-sys-ip` so the panel picks up the new address
#[derive(Debug, Clone)]
pub struct HestiaSystemSync {
    path: PathBuf,
}

impl HestiaSystemSync {
    /// Create a hook running the `v-update-sys-ip` binary at `path`
    ///
    /// A missing binary is reported by `sync_ip`, not here.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Build the hook from the configured `v-update-sys-ip` path
    pub fn from_config(config: &HestiaConfig) -> Self {
        Self::new(&config.update_sys_ip_path)
    }
}

#[async_trait]
impl SystemSync for HestiaSystemSync {
    async fn sync_ip(&self) -> bool {
        if !self.path.exists() {
            warn!(
                "{} not found, skipping panel system IP sync",
                self.path.display()
            );
            return false;
        }

        info!("Running {}", self.path.display());
        match Command::new(&self.path).output().await {
            Ok(output) if output.status.success() => {
                debug!(
                    "{} output: {}",
                    self.path.display(),
                    String::from_utf8_lossy(&output.stdout).trim()
                );
                true
            }
            Ok(output) => {
                warn!(
                    "{} exited with {}: {}",
                    self.path.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Err(e) => {
                warn!("Failed to run {}: {}", self.path.display(), e);
                false
            }
        }
    }
}
