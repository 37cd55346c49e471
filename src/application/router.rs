//! Message router - repeat detection, command dispatch, reply delivery

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::domain::entities::{DispatchOutcome, DispatchStatus, EventKind, InboundEvent};
use crate::domain::traits::ChatApi;
use crate::plugins::PluginRegistry;

/// Window within which two identical group messages from different
/// senders count as a repeat.
const REPEAT_WINDOW_SECS: i64 = 60;

/// Plugin names are letters and underscores only; the prefix character
/// is stripped before this is applied.
static PLUGIN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[_A-Za-z]+$").expect("valid pattern"));

/// Last repeat-eligible message seen in a group.
#[derive(Debug, Clone)]
struct RepeatSignature {
    text: String,
    sender_id: i64,
    timestamp: i64,
}

/// Outcome of routing one inbound event.
#[derive(Debug, Clone)]
pub struct RouteResult {
    /// Present when a command token was detected.
    pub outcome: Option<DispatchOutcome>,
    /// Final reply text; empty sends nothing.
    pub reply: String,
}

/// Routes inbound chat events to plugins and decides the outbound
/// reply. Shared across all event-handling tasks.
pub struct MessageRouter {
    prefix: char,
    blocked_payloads: Vec<String>,
    registry: Arc<PluginRegistry>,
    api: Arc<dyn ChatApi>,
    repeats: Mutex<HashMap<i64, RepeatSignature>>,
}

impl MessageRouter {
    pub fn new(
        prefix: char,
        blocked_payloads: Vec<String>,
        registry: Arc<PluginRegistry>,
        api: Arc<dyn ChatApi>,
    ) -> Self {
        Self {
            prefix,
            blocked_payloads,
            registry,
            api,
            repeats: Mutex::new(HashMap::new()),
        }
    }

    /// Process one event and produce the reply decision. Never fails;
    /// every internal error is converted to a logged event and a safe
    /// default.
    pub async fn handle(&self, event: &InboundEvent) -> RouteResult {
        if self.blocked_payloads.iter().any(|p| p == &event.text) {
            tracing::debug!("Dropping blocked payload from user {}", event.user_id);
            return RouteResult {
                outcome: None,
                reply: String::new(),
            };
        }

        let mut echo = !event.synthetic && self.check_repeat(event);

        let mut outcome = None;
        if let Some(name) = self.command_target(&event.text) {
            let result = self.registry.invoke(&name, event).await;
            if result.status == DispatchStatus::Success {
                echo = false;
            }
            outcome = Some(result);
        }

        let mut reply = match &outcome {
            Some(o) if o.status == DispatchStatus::Success => o.reply.clone(),
            _ => String::new(),
        };
        if reply.is_empty() && echo {
            reply = event.text.clone();
        }

        RouteResult { outcome, reply }
    }

    /// Send the final reply once, by event kind. Empty replies send
    /// nothing; failed sends are logged, never raised.
    pub async fn flush_reply(&self, event: &InboundEvent, routed: &RouteResult) {
        if routed.reply.is_empty() {
            return;
        }
        let code = match event.kind {
            EventKind::Group => {
                self.api
                    .send_group_message(event.group_id, &routed.reply)
                    .await
            }
            EventKind::PrivateFriend => {
                self.api
                    .send_private_message(event.user_id, &routed.reply)
                    .await
            }
            EventKind::PrivateTemporary => {
                self.api
                    .send_temporary_private_message(event.user_id, event.group_id, &routed.reply)
                    .await
            }
        };
        if code != 200 {
            tracing::warn!(
                "Reply to user {} group {} failed with code {}",
                event.user_id,
                event.group_id,
                code
            );
        }
    }

    /// Extract the plugin name when the first whitespace token is the
    /// prefix character followed by letters/underscores.
    fn command_target(&self, text: &str) -> Option<String> {
        let first = text.split_whitespace().next()?;
        let rest = first.strip_prefix(self.prefix)?;
        if PLUGIN_NAME.is_match(rest) {
            Some(rest.to_string())
        } else {
            None
        }
    }

    /// Repeat heuristic. Returns true when the echo should fire for
    /// this event.
    fn check_repeat(&self, event: &InboundEvent) -> bool {
        if event.kind != EventKind::Group {
            return false;
        }
        let Ok(mut repeats) = self.repeats.lock() else {
            return false;
        };
        match repeats.get_mut(&event.group_id) {
            Some(sig)
                if sig.text == event.text
                    && sig.sender_id != event.user_id
                    && event.timestamp - sig.timestamp < REPEAT_WINDOW_SECS =>
            {
                if sig.sender_id == event.self_id {
                    // This round already echoed; the sentinel stays
                    // until the text changes or the window expires.
                    false
                } else {
                    sig.sender_id = event.self_id;
                    true
                }
            }
            _ => {
                repeats.insert(
                    event.group_id,
                    RepeatSignature {
                        text: event.text.clone(),
                        sender_id: event.user_id,
                        timestamp: event.timestamp,
                    },
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::EventKind;
    use crate::infrastructure::report::Reporter;
    use crate::infrastructure::storage::JsonStore;
    use crate::plugins::AuthorizationGate;
    use async_trait::async_trait;

    struct RecordingApi {
        sent: Mutex<Vec<(String, i64, String)>>,
    }

    impl RecordingApi {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(String, i64, String)> {
            self.sent.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl ChatApi for RecordingApi {
        async fn send_group_message(&self, group_id: i64, text: &str) -> i64 {
            self.sent
                .lock()
                .expect("lock")
                .push(("group".into(), group_id, text.into()));
            200
        }

        async fn send_private_message(&self, user_id: i64, text: &str) -> i64 {
            self.sent
                .lock()
                .expect("lock")
                .push(("private".into(), user_id, text.into()));
            200
        }

        async fn send_temporary_private_message(
            &self,
            user_id: i64,
            _group_id: i64,
            text: &str,
        ) -> i64 {
            self.sent
                .lock()
                .expect("lock")
                .push(("temporary".into(), user_id, text.into()));
            200
        }
    }

    fn group_event(user_id: i64, text: &str, timestamp: i64) -> InboundEvent {
        InboundEvent {
            kind: EventKind::Group,
            message_id: 1,
            user_id,
            group_id: 42,
            self_id: 99,
            text: text.into(),
            raw_text: text.into(),
            timestamp,
            synthetic: false,
        }
    }

    fn make_router(dir: &std::path::Path) -> (Arc<MessageRouter>, Arc<RecordingApi>) {
        let api = Arc::new(RecordingApi::new());
        let gate = AuthorizationGate::new(JsonStore::new(dir.join("json")).expect("json dir"));
        let reporter = Arc::new(Reporter::new(vec![], vec![], api.clone()));
        let registry = Arc::new(PluginRegistry::new(gate, reporter));
        let router = Arc::new(MessageRouter::new(
            '!',
            vec!["[unsupported media]".into()],
            registry,
            api.clone(),
        ));
        (router, api)
    }

    #[tokio::test]
    async fn repeat_echo_fires_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (router, api) = make_router(dir.path());

        let first = group_event(1, "nice weather", 1000);
        let routed = router.handle(&first).await;
        router.flush_reply(&first, &routed).await;
        assert!(api.sent().is_empty());

        // Same text from a second sender within the window echoes.
        let second = group_event(2, "nice weather", 1010);
        let routed = router.handle(&second).await;
        assert_eq!(routed.reply, "nice weather");
        router.flush_reply(&second, &routed).await;
        assert_eq!(api.sent().len(), 1);

        // A third sender does not re-trigger the same round.
        let third = group_event(3, "nice weather", 1020);
        let routed = router.handle(&third).await;
        assert!(routed.reply.is_empty());
    }

    #[tokio::test]
    async fn repeat_window_expires() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (router, _api) = make_router(dir.path());

        router.handle(&group_event(1, "hello", 1000)).await;
        let late = group_event(2, "hello", 1070);
        let routed = router.handle(&late).await;
        assert!(routed.reply.is_empty());
    }

    #[tokio::test]
    async fn synthetic_events_skip_repeat_detection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (router, _api) = make_router(dir.path());

        router.handle(&group_event(1, "ping", 1000)).await;
        let mut synthetic = group_event(2, "ping", 1005);
        synthetic.synthetic = true;
        let routed = router.handle(&synthetic).await;
        assert!(routed.reply.is_empty());
    }

    #[tokio::test]
    async fn blocked_payload_is_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (router, api) = make_router(dir.path());

        let event = group_event(1, "[unsupported media]", 1000);
        let routed = router.handle(&event).await;
        assert!(routed.outcome.is_none());
        assert!(routed.reply.is_empty());
        router.flush_reply(&event, &routed).await;
        assert!(api.sent().is_empty());
    }

    #[tokio::test]
    async fn unknown_command_produces_no_send() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (router, api) = make_router(dir.path());

        let event = group_event(1, "!weather", 1000);
        let routed = router.handle(&event).await;
        let outcome = routed.outcome.as_ref().expect("command detected");
        assert_eq!(outcome.status, DispatchStatus::NotFound);
        router.flush_reply(&event, &routed).await;
        assert!(api.sent().is_empty());
    }

    #[test]
    fn command_target_requires_prefix_and_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (router, _api) = make_router(dir.path());

        assert_eq!(router.command_target("!echo hi"), Some("echo".into()));
        assert_eq!(router.command_target("!my_plugin"), Some("my_plugin".into()));
        assert_eq!(router.command_target("echo hi"), None);
        assert_eq!(router.command_target("!123"), None);
        assert_eq!(router.command_target("!"), None);
        assert_eq!(router.command_target(""), None);
    }
}
