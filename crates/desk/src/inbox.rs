//! Inbox-id resolution.
//!
//! Tenants may configure an inbox by name instead of id. Resolution goes
//! through an injected read-through cache keyed by tenant id, so each call
//! gets an immutable snapshot and no shared config object is mutated.

use std::collections::HashMap;

use {deskbridge_messaging::TenantConfig, tokio::sync::RwLock, tracing::debug};

use crate::{
    client::DeskClient,
    error::{Error, Result},
};

/// Read-through cache for inbox ids, keyed by tenant id.
#[derive(Default)]
pub struct InboxResolver {
    cache: RwLock<HashMap<String, u64>>,
}

impl InboxResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the tenant's inbox id, hitting the desk API at most once
    /// per tenant for name-configured inboxes.
    pub async fn resolve(&self, client: &DeskClient, tenant: &TenantConfig) -> Result<u64> {
        if let Some(id) = tenant.inbox_id {
            return Ok(id);
        }

        {
            let cache = self.cache.read().await;
            if let Some(&id) = cache.get(&tenant.tenant_id) {
                return Ok(id);
            }
        }

        let name = tenant
            .inbox_name
            .as_deref()
            .ok_or_else(|| Error::MissingInbox {
                tenant_id: tenant.tenant_id.clone(),
            })?;

        let inboxes = client.list_inboxes().await?;
        let id = inboxes
            .into_iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| id)
            .ok_or_else(|| Error::InboxNotFound { name: name.into() })?;

        debug!(tenant_id = %tenant.tenant_id, inbox = name, inbox_id = id, "resolved inbox by name");
        let mut cache = self.cache.write().await;
        cache.insert(tenant.tenant_id.clone(), id);
        Ok(id)
    }
}
