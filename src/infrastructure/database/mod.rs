//! Durable schedule storage. One sqlite table per entry kind;
//! connections are opened per operation and closed again rather than
//! held for the process lifetime.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use crate::application::errors::ScheduleError;
use crate::domain::entities::{date_key, time_key, IntervalCommand, TargetKind, TimedMessage};

pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    /// Open the database once to create missing tables, then close it.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ScheduleError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScheduleError::Internal(e.to_string()))?;
        }
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        let conn = store.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS commands(
                type TEXT, user_id INTEGER, group_id INTEGER, command TEXT, interval INTEGER)",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS bydate(
                type TEXT, user_id INTEGER, group_id INTEGER, month INTEGER, day INTEGER, message TEXT)",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS bytime(
                type TEXT, user_id INTEGER, group_id INTEGER, hour INTEGER, minute INTEGER, message TEXT)",
            [],
        )?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection, ScheduleError> {
        Connection::open(&self.path).map_err(ScheduleError::from)
    }

    /// Load all stored interval commands, countdowns armed to their
    /// interval. Rows are returned in insertion order so reloads keep
    /// the enumeration positional deletes rely on.
    pub fn load_commands(&self) -> Result<Vec<IntervalCommand>, ScheduleError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT type, user_id, group_id, command, interval FROM commands ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        let mut commands = Vec::new();
        for row in rows {
            let (kind, user_id, group_id, command, interval) = row?;
            let Some(target) = TargetKind::parse(&kind) else {
                tracing::warn!("Skipping command row with unknown type {kind}");
                continue;
            };
            commands.push(IntervalCommand {
                target,
                user_id,
                group_id,
                command,
                interval,
                countdown: interval,
            });
        }
        Ok(commands)
    }

    /// Load all date messages as `(bucket key, entry)` pairs.
    pub fn load_date_messages(&self) -> Result<Vec<(i64, TimedMessage)>, ScheduleError> {
        self.load_timed("SELECT type, user_id, group_id, month, day, message FROM bydate ORDER BY rowid", date_key)
    }

    /// Load all time messages as `(bucket key, entry)` pairs.
    pub fn load_time_messages(&self) -> Result<Vec<(i64, TimedMessage)>, ScheduleError> {
        self.load_timed("SELECT type, user_id, group_id, hour, minute, message FROM bytime ORDER BY rowid", time_key)
    }

    fn load_timed(
        &self,
        sql: &str,
        key: fn(u32, u32) -> Option<i64>,
    ) -> Result<Vec<(i64, TimedMessage)>, ScheduleError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut messages = Vec::new();
        for row in rows {
            let (kind, user_id, group_id, high, low, text) = row?;
            let (Some(target), Some(bucket)) = (TargetKind::parse(&kind), key(high, low)) else {
                tracing::warn!("Skipping schedule row with invalid fields ({kind} {high} {low})");
                continue;
            };
            messages.push((
                bucket,
                TimedMessage {
                    target,
                    user_id,
                    group_id,
                    text,
                },
            ));
        }
        Ok(messages)
    }

    pub fn insert_command(&self, cmd: &IntervalCommand) -> Result<(), ScheduleError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO commands(type, user_id, group_id, command, interval) VALUES(?1, ?2, ?3, ?4, ?5)",
            params![
                cmd.target.as_str(),
                cmd.user_id,
                cmd.group_id,
                cmd.command,
                cmd.interval
            ],
        )?;
        Ok(())
    }

    /// Delete one command row by full field match.
    pub fn delete_command(&self, cmd: &IntervalCommand) -> Result<(), ScheduleError> {
        let conn = self.open()?;
        conn.execute(
            "DELETE FROM commands
             WHERE rowid IN (SELECT rowid FROM commands
                 WHERE type=?1 AND user_id=?2 AND group_id=?3 AND command=?4 AND interval=?5
                 LIMIT 1)",
            params![
                cmd.target.as_str(),
                cmd.user_id,
                cmd.group_id,
                cmd.command,
                cmd.interval
            ],
        )?;
        Ok(())
    }

    pub fn insert_date_message(
        &self,
        month: u32,
        day: u32,
        msg: &TimedMessage,
    ) -> Result<(), ScheduleError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO bydate(type, user_id, group_id, month, day, message) VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            params![msg.target.as_str(), msg.user_id, msg.group_id, month, day, msg.text],
        )?;
        Ok(())
    }

    pub fn delete_date_message(
        &self,
        month: u32,
        day: u32,
        msg: &TimedMessage,
    ) -> Result<(), ScheduleError> {
        let conn = self.open()?;
        conn.execute(
            "DELETE FROM bydate
             WHERE rowid IN (SELECT rowid FROM bydate
                 WHERE type=?1 AND user_id=?2 AND group_id=?3 AND month=?4 AND day=?5 AND message=?6
                 LIMIT 1)",
            params![msg.target.as_str(), msg.user_id, msg.group_id, month, day, msg.text],
        )?;
        Ok(())
    }

    pub fn insert_time_message(
        &self,
        hour: u32,
        minute: u32,
        msg: &TimedMessage,
    ) -> Result<(), ScheduleError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO bytime(type, user_id, group_id, hour, minute, message) VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            params![msg.target.as_str(), msg.user_id, msg.group_id, hour, minute, msg.text],
        )?;
        Ok(())
    }

    pub fn delete_time_message(
        &self,
        hour: u32,
        minute: u32,
        msg: &TimedMessage,
    ) -> Result<(), ScheduleError> {
        let conn = self.open()?;
        conn.execute(
            "DELETE FROM bytime
             WHERE rowid IN (SELECT rowid FROM bytime
                 WHERE type=?1 AND user_id=?2 AND group_id=?3 AND hour=?4 AND minute=?5 AND message=?6
                 LIMIT 1)",
            params![msg.target.as_str(), msg.user_id, msg.group_id, hour, minute, msg.text],
        )?;
        Ok(())
    }
}
