// # Inventory Trait
//
// Defines the interface to the hosting panel's list of users and the web
// domains each of them manages.
//
// ## Implementations
//
// - HestiaCP CLI: `hestia-ddns-hestia` crate

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A web domain together with its aliases
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebDomain {
    /// Primary domain name
    pub domain: String,
    /// Additional names served by the same site
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl WebDomain {
    /// Create a web domain with aliases
    pub fn new<I, S>(domain: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domain: domain.into(),
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }

    /// The primary domain followed by its aliases
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.domain.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Trait for hosting panel inventory implementations
///
/// Any error is fatal to a reconciliation run; zone grouping needs the
/// complete domain set.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// List panel user names
    async fn list_users(&self) -> Result<Vec<String>, crate::Error>;

    /// List the web domains owned by `user`
    async fn list_domains(&self, user: &str) -> Result<Vec<WebDomain>, crate::Error>;
}

/// Collect every domain and alias for every user, in listing order
///
/// Each primary domain is immediately followed by its aliases. Names are
/// lowercased since DNS names compare case-insensitively.
pub async fn collect_domains(inventory: &dyn Inventory) -> Result<Vec<String>, crate::Error> {
    let users = inventory.list_users().await?;
    tracing::info!(users = ?users, "Panel users found");

    let mut domains = Vec::new();
    for user in &users {
        for web in inventory.list_domains(user).await? {
            domains.extend(web.names().map(str::to_ascii_lowercase));
        }
    }

    Ok(domains)
}
