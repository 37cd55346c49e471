//! Echo back the argument text.

use async_trait::async_trait;

use crate::application::errors::PluginError;
use crate::domain::entities::InboundEvent;
use crate::domain::traits::Plugin;

pub struct Echo;

#[async_trait]
impl Plugin for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Repeat the text after the command"
    }

    async fn run(&self, event: &InboundEvent) -> Result<String, PluginError> {
        let args = event
            .text
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim())
            .unwrap_or("");
        Ok(args.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::EventKind;

    #[tokio::test]
    async fn repeats_argument_text() {
        let event = InboundEvent::synthetic(EventKind::Group, 1, 2, ".echo hello there");
        let reply = Echo.run(&event).await.expect("run");
        assert_eq!(reply, "hello there");
    }

    #[tokio::test]
    async fn no_arguments_is_empty() {
        let event = InboundEvent::synthetic(EventKind::Group, 1, 2, ".echo");
        let reply = Echo.run(&event).await.expect("run");
        assert!(reply.is_empty());
    }
}
