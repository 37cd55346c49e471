use async_trait::async_trait;

/// Status code returned when the HTTP request itself failed before the
/// gateway could answer.
pub const REQUEST_ERR: i64 = -1;

/// Outbound chat API surface. Implementations report failures through
/// the returned status code and never panic or raise into callers.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send a message to a group chat. 200 on success, otherwise the
    /// gateway's error code or [`REQUEST_ERR`].
    async fn send_group_message(&self, group_id: i64, text: &str) -> i64;

    /// Send a direct message to a friend.
    async fn send_private_message(&self, user_id: i64, text: &str) -> i64;

    /// Send into a temporary private session opened through a group.
    async fn send_temporary_private_message(&self, user_id: i64, group_id: i64, text: &str) -> i64;
}
