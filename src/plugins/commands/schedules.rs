//! Command surface for date/time scheduled messages.

use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::application::errors::PluginError;
use crate::application::schedule::ScheduleEngine;
use crate::domain::entities::{EventKind, InboundEvent, TargetKind};
use crate::domain::traits::Plugin;

const HELP: &str = "Manage scheduled messages\n\
Usage:\n\
    schedules add time <hhmm> <message>\n\
    schedules add date <MMdd> <message>\n\
    schedules list time\n\
    schedules list date\n\
    schedules del time <index>\n\
    schedules del date <index>";

pub struct Schedules {
    engine: Weak<ScheduleEngine>,
}

impl Schedules {
    pub fn new(engine: Weak<ScheduleEngine>) -> Self {
        Self { engine }
    }

    fn engine(&self) -> Result<Arc<ScheduleEngine>, PluginError> {
        self.engine
            .upgrade()
            .ok_or_else(|| PluginError::Runtime("schedule engine unavailable".to_string()))
    }
}

#[async_trait]
impl Plugin for Schedules {
    fn name(&self) -> &str {
        "schedules"
    }

    fn description(&self) -> &str {
        "Manage date and time scheduled messages"
    }

    async fn run(&self, event: &InboundEvent) -> Result<String, PluginError> {
        let Some((target, qid)) = target_of(event) else {
            return Ok("Only group and friend chats are supported".to_string());
        };
        let engine = self.engine()?;
        let cmd: Vec<&str> = event.text.split_whitespace().collect();

        let reply = match (cmd.get(1).copied(), cmd.len()) {
            (Some("list"), 3) => match cmd[2] {
                "time" => {
                    let entries = engine.list_time_messages(target, qid);
                    if entries.is_empty() {
                        "Nothing is scheduled".to_string()
                    } else {
                        let mut out = "Scheduled messages".to_string();
                        for (i, (key, msg)) in entries.iter().enumerate() {
                            out.push_str(&format!(
                                "\n{} {} {:02}:{:02} {}",
                                i + 1,
                                msg.text,
                                key / 100,
                                key % 100,
                                msg.user_id
                            ));
                        }
                        out
                    }
                }
                "date" => {
                    let entries = engine.list_date_messages(target, qid);
                    if entries.is_empty() {
                        "Nothing is scheduled".to_string()
                    } else {
                        let mut out = "Scheduled messages".to_string();
                        for (i, (key, msg)) in entries.iter().enumerate() {
                            out.push_str(&format!(
                                "\n{} {} {}/{} {}",
                                i + 1,
                                msg.text,
                                key / 100,
                                key % 100,
                                msg.user_id
                            ));
                        }
                        out
                    }
                }
                _ => HELP.to_string(),
            },
            (Some("del"), 4) => {
                let Ok(index) = cmd[3].parse::<usize>() else {
                    return Ok("del takes a numeric index".to_string());
                };
                let deleted = match cmd[2] {
                    "time" => engine.del_time_message(target, qid, index).is_ok(),
                    "date" => engine.del_date_message(target, qid, index).is_ok(),
                    _ => return Ok(HELP.to_string()),
                };
                if deleted {
                    "Deleted".to_string()
                } else {
                    "Delete failed".to_string()
                }
            }
            (Some("add"), n) if n >= 5 => {
                let Ok(tag) = cmd[3].parse::<u32>() else {
                    return Ok(
                        "Time/date must be four digits (leading zeros allowed)".to_string()
                    );
                };
                // Everything after the fourth token is the message.
                let Some(text) = event.text.splitn(5, char::is_whitespace).nth(4) else {
                    return Ok(HELP.to_string());
                };
                let added = match cmd[2] {
                    "time" => engine
                        .add_time_message(target, event.user_id, event.group_id, tag / 100, tag % 100, text)
                        .is_ok(),
                    "date" => engine
                        .add_date_message(target, event.user_id, event.group_id, tag / 100, tag % 100, text)
                        .is_ok(),
                    _ => return Ok(HELP.to_string()),
                };
                if added {
                    format!("Added {text}")
                } else {
                    "Add failed".to_string()
                }
            }
            _ => HELP.to_string(),
        };
        Ok(reply)
    }
}

/// Schedule CRUD keys off the group for group chats and the user for
/// friend chats; temporary sessions are unsupported.
pub(super) fn target_of(event: &InboundEvent) -> Option<(TargetKind, i64)> {
    match event.kind {
        EventKind::Group => Some((TargetKind::Group, event.group_id)),
        EventKind::PrivateFriend => Some((TargetKind::Private, event.user_id)),
        EventKind::PrivateTemporary => None,
    }
}
