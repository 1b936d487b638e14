use std::{collections::HashMap, sync::Arc};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tokio::sync::RwLock,
};

use crate::error::{Error, Result};

/// Default inbound staleness threshold in seconds.
pub const DEFAULT_STALENESS_SECS: u64 = 30;

fn default_staleness_secs() -> u64 {
    DEFAULT_STALENESS_SECS
}

/// One tenant: a messaging session paired with one desk configuration.
///
/// Owned by the external tenant directory; read-only to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub tenant_id: String,
    /// Desk base URL, e.g. `https://desk.example.com`.
    pub desk_url: String,
    pub account_id: String,
    pub access_token: String,
    /// Desk inbox id; resolved lazily from `inbox_name` when unset.
    #[serde(default)]
    pub inbox_id: Option<u64>,
    #[serde(default)]
    pub inbox_name: Option<String>,
    /// Forward self-sent messages as `outgoing` desk entries instead of
    /// dropping them (cross-device visibility).
    #[serde(default)]
    pub mirror_self_messages: bool,
    /// Send a reaction instead of text when an outbound message is exactly
    /// one emoji glyph and references a prior message.
    #[serde(default)]
    pub reaction_shortcut: bool,
    /// Inbound messages older than this are dropped (replay protection).
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,
}

/// Tenant configuration lookup. Persistence is the host's concern; the
/// bridge only reads.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn get(&self, tenant_id: &str) -> Result<TenantConfig>;
    async fn list(&self) -> Result<Vec<TenantConfig>>;
    async fn save(&self, config: TenantConfig) -> Result<()>;
}

/// Map-backed directory for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryTenantDirectory {
    tenants: Arc<RwLock<HashMap<String, TenantConfig>>>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn get(&self, tenant_id: &str) -> Result<TenantConfig> {
        let tenants = self.tenants.read().await;
        tenants
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| Error::unknown_tenant(tenant_id))
    }

    async fn list(&self) -> Result<Vec<TenantConfig>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.values().cloned().collect())
    }

    async fn save(&self, config: TenantConfig) -> Result<()> {
        let mut tenants = self.tenants.write().await;
        tenants.insert(config.tenant_id.clone(), config);
        Ok(())
    }
}
