//! Per-plugin allow-list gate.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{EventKind, InboundEvent};
use crate::infrastructure::storage::JsonStore;

/// On-disk allow-list, one JSON file per plugin. Empty lists mean the
/// plugin is open to everyone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowList {
    pub group_id: Vec<i64>,
    pub user_id: Vec<i64>,
}

/// Authorizes plugin invocations against their allow-list files.
/// Default-permissive while a plugin has no file (one is created on
/// first check), default-restrictive once populated.
pub struct AuthorizationGate {
    store: JsonStore,
}

impl AuthorizationGate {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub fn check(&self, plugin_name: &str, event: &InboundEvent) -> bool {
        let file = format!("{plugin_name}.json");
        if !self.store.have(&file) {
            if let Err(e) = self.store.write(&file, &AllowList::default()) {
                tracing::warn!("Failed to create allow-list {file}: {e}");
            }
            return true;
        }
        let list: AllowList = match self.store.read(&file) {
            Ok(list) => list,
            Err(e) => {
                tracing::error!("Malformed allow-list {file}: {e}");
                return false;
            }
        };
        if list.group_id.is_empty() && list.user_id.is_empty() {
            return true;
        }
        match event.kind {
            EventKind::Group => {
                list.group_id.contains(&event.group_id) || list.user_id.contains(&event.user_id)
            }
            EventKind::PrivateFriend => list.user_id.contains(&event.user_id),
            EventKind::PrivateTemporary => false,
        }
    }
}
