//! Error reports to operator users and groups.

use std::sync::Arc;

use crate::domain::traits::ChatApi;

/// Delivers error texts to every configured admin group and user.
pub struct Reporter {
    admin_users: Vec<i64>,
    admin_groups: Vec<i64>,
    api: Arc<dyn ChatApi>,
}

impl Reporter {
    pub fn new(admin_users: Vec<i64>, admin_groups: Vec<i64>, api: Arc<dyn ChatApi>) -> Self {
        Self {
            admin_users,
            admin_groups,
            api,
        }
    }

    pub async fn report(&self, message: &str) {
        for gid in &self.admin_groups {
            let code = self.api.send_group_message(*gid, message).await;
            if code != 200 {
                tracing::error!("Report to group {gid} failed with code {code}");
            }
        }
        for uid in &self.admin_users {
            let code = self.api.send_private_message(*uid, message).await;
            if code != 200 {
                tracing::error!("Report to user {uid} failed with code {code}");
            }
        }
    }
}
