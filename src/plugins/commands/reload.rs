//! Operator command reloading every cached plugin.

use std::sync::Weak;

use async_trait::async_trait;

use crate::application::errors::PluginError;
use crate::domain::entities::InboundEvent;
use crate::domain::traits::Plugin;
use crate::plugins::PluginRegistry;

pub struct Reload {
    registry: Weak<PluginRegistry>,
}

impl Reload {
    pub fn new(registry: Weak<PluginRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Plugin for Reload {
    fn name(&self) -> &str {
        "reload"
    }

    fn description(&self) -> &str {
        "Reload all plugins"
    }

    async fn run(&self, _event: &InboundEvent) -> Result<String, PluginError> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| PluginError::Runtime("registry unavailable".to_string()))?;
        if registry.reload_all().await {
            Ok("Plugins reloaded".to_string())
        } else {
            Ok("Reload skipped: another reload or shutdown is in progress".to_string())
        }
    }
}
