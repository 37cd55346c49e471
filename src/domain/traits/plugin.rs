use async_trait::async_trait;

use crate::application::errors::PluginError;
use crate::domain::entities::InboundEvent;

/// A command plugin, resolved by name from the first whitespace token
/// of a chat message.
///
/// Every hook except `name` is optional: `configure` runs once per
/// load (and once more after each reload), `run` produces the reply
/// text, `teardown` runs on reload and shutdown. A plugin without a
/// `run` implementation always yields an empty reply.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique name; also the command token users type after the prefix.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// One-time initialization after load.
    fn configure(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Handle one event and return the reply text (empty sends nothing).
    async fn run(&self, _event: &InboundEvent) -> Result<String, PluginError> {
        Ok(String::new())
    }

    /// Release resources before reload or shutdown.
    fn teardown(&self) {}
}
