//! Command surface for fixed-interval command replays.

use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::application::errors::PluginError;
use crate::application::schedule::ScheduleEngine;
use crate::domain::entities::InboundEvent;
use crate::domain::traits::Plugin;

use super::schedules::target_of;

const HELP: &str = "Manage repeating commands\n\
Usage:\n\
    intervals add <ticks> <command>\n\
    intervals list\n\
    intervals del <index>";

pub struct Intervals {
    engine: Weak<ScheduleEngine>,
}

impl Intervals {
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
impl Plugin for Intervals {
    fn name(&self) -> &str {
        "intervals"
    }

    fn description(&self) -> &str {
        "Manage commands replayed on a fixed interval"
    }

    async fn run(&self, event: &InboundEvent) -> Result<String, PluginError> {
        let Some((target, qid)) = target_of(event) else {
            return Ok("Only group and friend chats are supported".to_string());
        };
        let engine = self.engine()?;
        let cmd: Vec<&str> = event.text.split_whitespace().collect();

        let reply = match (cmd.get(1).copied(), cmd.len()) {
            (Some("list"), 2) => {
                let entries = engine.list_interval_commands(target, qid);
                if entries.is_empty() {
                    "No commands are set".to_string()
                } else {
                    let mut out = "Command list".to_string();
                    for (i, c) in entries.iter().enumerate() {
                        out.push_str(&format!(
                            "\n{} {} every {} ticks {}",
                            i + 1,
                            c.command,
                            c.interval,
                            c.user_id
                        ));
                    }
                    out
                }
            }
            (Some("del"), 3) => {
                let Ok(index) = cmd[2].parse::<usize>() else {
                    return Ok("del takes a numeric index".to_string());
                };
                if engine.del_interval_command(target, qid, index).is_ok() {
                    "Deleted".to_string()
                } else {
                    "Delete failed".to_string()
                }
            }
            (Some("add"), n) if n >= 4 => {
                let Ok(parsed) = cmd[2].parse::<i64>() else {
                    return Ok("add takes a numeric tick interval".to_string());
                };
                let interval = parsed.abs().max(1);
                // Everything after the third token is the command, prefix included.
                let Some(command) = event.text.splitn(4, char::is_whitespace).nth(3) else {
                    return Ok(HELP.to_string());
                };
                match engine.add_interval_command(
                    target,
                    event.user_id,
                    event.group_id,
                    command,
                    interval,
                ) {
                    Ok(()) => format!("Added: every {interval} ticks {command}"),
                    Err(e) => {
                        tracing::debug!("Interval add rejected: {e}");
                        "Add failed".to_string()
                    }
                }
            }
            _ => HELP.to_string(),
        };
        Ok(reply)
    }
}
