use chrono::Utc;

/// Classification of an inbound chat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Message posted in a group chat.
    Group,
    /// Direct message from a friend.
    PrivateFriend,
    /// Temporary private session initiated through a group.
    PrivateTemporary,
}

/// An inbound chat event, built by the transport layer from a webhook
/// delivery or synthesized by the schedule engine for timed firings.
/// Immutable once constructed.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub message_id: i64,
    pub user_id: i64,
    /// 0 for private events.
    pub group_id: i64,
    /// The bot's own account id on the gateway.
    pub self_id: i64,
    pub text: String,
    pub raw_text: String,
    /// Unix timestamp reported by the gateway.
    pub timestamp: i64,
    /// True when the event was manufactured by the schedule engine.
    pub synthetic: bool,
}

impl InboundEvent {
    pub fn is_group(&self) -> bool {
        self.kind == EventKind::Group
    }

    pub fn is_private(&self) -> bool {
        matches!(self.kind, EventKind::PrivateFriend | EventKind::PrivateTemporary)
    }

    /// Build a synthetic event carrying `text`, stamped with the
    /// current time.
    pub fn synthetic(kind: EventKind, user_id: i64, group_id: i64, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind,
            message_id: 0,
            user_id,
            group_id,
            self_id: 0,
            raw_text: text.clone(),
            text,
            timestamp: Utc::now().timestamp(),
            synthetic: true,
        }
    }
}

/// Result of one plugin invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The plugin ran (or was cached in a failed-configure state and
    /// produced its fixed error reply).
    Success,
    /// No plugin resolves to the requested name.
    NotFound,
    /// The allow-list denied the invocation.
    Blocked,
}

/// Outcome returned by `PluginRegistry::invoke`. A `Success` outcome
/// suppresses the repeat-echo heuristic.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub status: DispatchStatus,
    pub reply: String,
}

impl DispatchOutcome {
    pub fn success(reply: impl Into<String>) -> Self {
        Self {
            status: DispatchStatus::Success,
            reply: reply.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: DispatchStatus::NotFound,
            reply: String::new(),
        }
    }

    pub fn blocked() -> Self {
        Self {
            status: DispatchStatus::Blocked,
            reply: String::new(),
        }
    }
}
