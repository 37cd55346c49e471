//! Inbound webhook transport. The gateway posts every event as JSON to
//! `/`; each chat message is handled on its own spawned task.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::application::router::MessageRouter;
use crate::application::ticker::HeartbeatWatch;
use crate::domain::entities::{EventKind, InboundEvent};

pub struct AppState {
    pub router: Arc<MessageRouter>,
    pub heartbeat: Arc<HeartbeatWatch>,
}

/// Raw webhook payload. Fields default so one struct covers every
/// `post_type`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub post_type: String,
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub sub_type: String,
    #[serde(default)]
    pub message_id: i64,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub group_id: i64,
    #[serde(default)]
    pub self_id: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub raw_message: String,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub meta_event_type: String,
    #[serde(default)]
    pub notice_type: String,
    #[serde(default)]
    pub request_type: String,
    /// Heartbeat interval in milliseconds.
    pub interval: Option<i64>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handle_event))
        .route("/version", get(version))
        .with_state(state)
}

async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

async fn handle_event(State(state): State<Arc<AppState>>, Json(raw): Json<RawEvent>) -> String {
    match raw.post_type.as_str() {
        "message" => {
            if let Some(event) = classify_message(&raw) {
                let router = state.router.clone();
                tokio::spawn(async move {
                    let routed = router.handle(&event).await;
                    router.flush_reply(&event, &routed).await;
                });
            }
        }
        "meta_event" => {
            if raw.meta_event_type == "heartbeat" {
                if let Some(interval) = raw.interval.filter(|i| *i > 0) {
                    tracing::debug!("Heartbeat with interval {interval}ms");
                    state.heartbeat.beat(interval / 1000);
                }
            }
        }
        "notice" => {
            tracing::debug!("Ignoring notice {}", raw.notice_type);
        }
        "request" => {
            tracing::debug!("Ignoring request {}", raw.request_type);
        }
        other => {
            tracing::debug!("Unsupported post type {other:?}");
        }
    }
    String::new()
}

/// Map the gateway's message/sub_type pair onto an event kind. System
/// posts (anonymous group messages, the bot's own private echoes) are
/// dropped.
fn classify_message(raw: &RawEvent) -> Option<InboundEvent> {
    let kind = match (raw.message_type.as_str(), raw.sub_type.as_str()) {
        ("group", "normal") => EventKind::Group,
        ("group", _) => return None,
        ("private", "friend") => EventKind::PrivateFriend,
        ("private", "group") => EventKind::PrivateTemporary,
        _ => return None,
    };
    Some(InboundEvent {
        kind,
        message_id: raw.message_id,
        user_id: raw.user_id,
        group_id: if kind == EventKind::PrivateFriend {
            0
        } else {
            raw.group_id
        },
        self_id: raw.self_id,
        text: raw.message.clone(),
        raw_text: raw.raw_message.clone(),
        timestamp: raw.time,
        synthetic: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(post: &str, message: &str, sub: &str) -> RawEvent {
        RawEvent {
            post_type: post.to_string(),
            message_type: message.to_string(),
            sub_type: sub.to_string(),
            message_id: 1,
            user_id: 10,
            group_id: 20,
            self_id: 99,
            message: "hi".to_string(),
            raw_message: "hi".to_string(),
            time: 1000,
            meta_event_type: String::new(),
            notice_type: String::new(),
            request_type: String::new(),
            interval: None,
        }
    }

    #[test]
    fn normal_group_messages_classify() {
        let event = classify_message(&raw("message", "group", "normal")).expect("event");
        assert_eq!(event.kind, EventKind::Group);
        assert_eq!(event.group_id, 20);
        assert!(!event.synthetic);
    }

    #[test]
    fn anonymous_group_messages_drop() {
        assert!(classify_message(&raw("message", "group", "anonymous")).is_none());
    }

    #[test]
    fn private_sub_types_classify() {
        let friend = classify_message(&raw("message", "private", "friend")).expect("event");
        assert_eq!(friend.kind, EventKind::PrivateFriend);
        assert_eq!(friend.group_id, 0);

        let temp = classify_message(&raw("message", "private", "group")).expect("event");
        assert_eq!(temp.kind, EventKind::PrivateTemporary);
        assert_eq!(temp.group_id, 20);

        assert!(classify_message(&raw("message", "private", "group_self")).is_none());
        assert!(classify_message(&raw("message", "private", "other")).is_none());
    }
}
