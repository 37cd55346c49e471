//! Report the bot version.

use async_trait::async_trait;

use crate::application::errors::PluginError;
use crate::domain::entities::InboundEvent;
use crate::domain::traits::Plugin;

pub struct Version;

#[async_trait]
impl Plugin for Version {
    fn name(&self) -> &str {
        "version"
    }

    fn description(&self) -> &str {
        "Show the bot version"
    }

    async fn run(&self, _event: &InboundEvent) -> Result<String, PluginError> {
        Ok(format!("tanuki-bot v{}", env!("CARGO_PKG_VERSION")))
    }
}
