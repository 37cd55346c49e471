//! Recurring-message schedule engine.
//!
//! Three kinds of entries live in ordered in-memory maps keyed by a
//! derived bucket integer and, durably, in one sqlite table per kind.
//! The maps are refreshed wholesale from storage on startup and every
//! `reload_ticks` ticks; CRUD writes durable storage first and mutates
//! memory only on success, so the two stores never silently diverge.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};

use crate::application::errors::ScheduleError;
use crate::application::router::MessageRouter;
use crate::domain::entities::{
    date_key, time_key, EventKind, InboundEvent, IntervalCommand, TargetKind, TimedMessage,
};
use crate::domain::traits::ChatApi;
use crate::infrastructure::database::ScheduleStore;
use crate::infrastructure::report::Reporter;
use crate::plugins::PluginRegistry;

#[derive(Default)]
struct ScheduleMaps {
    /// interval -> commands sharing that interval
    commands: BTreeMap<i64, Vec<IntervalCommand>>,
    /// month*100+day -> messages
    by_date: BTreeMap<i64, Vec<TimedMessage>>,
    /// hour*100+minute -> messages
    by_time: BTreeMap<i64, Vec<TimedMessage>>,
}

struct TickState {
    /// Epoch minute handled last; ticks within the same minute no-op.
    last_minute: i64,
    reload_countdown: i64,
}

/// Timer-driven engine firing recurring group/private sends.
pub struct ScheduleEngine {
    store: ScheduleStore,
    maps: Mutex<ScheduleMaps>,
    state: Mutex<TickState>,
    reload_ticks: i64,
    utc_offset: FixedOffset,
    prefix: char,
    registry: Arc<PluginRegistry>,
    router: Arc<MessageRouter>,
    api: Arc<dyn ChatApi>,
    reporter: Arc<Reporter>,
}

impl ScheduleEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: ScheduleStore,
        reload_ticks: i64,
        utc_offset: FixedOffset,
        prefix: char,
        registry: Arc<PluginRegistry>,
        router: Arc<MessageRouter>,
        api: Arc<dyn ChatApi>,
        reporter: Arc<Reporter>,
    ) -> Result<Self, ScheduleError> {
        let reload_ticks = reload_ticks.max(1);
        let engine = Self {
            store,
            maps: Mutex::new(ScheduleMaps::default()),
            state: Mutex::new(TickState {
                last_minute: 0,
                reload_countdown: reload_ticks,
            }),
            reload_ticks,
            utc_offset,
            prefix,
            registry,
            router,
            api,
            reporter,
        };
        engine.data_load()?;
        Ok(engine)
    }

    /// Rebuild all three in-memory maps from durable storage. The maps
    /// are swapped in only when every table loads.
    pub fn data_load(&self) -> Result<(), ScheduleError> {
        tracing::debug!("Schedule loading database");
        let mut fresh = ScheduleMaps::default();
        for cmd in self.store.load_commands()? {
            fresh.commands.entry(cmd.interval).or_default().push(cmd);
        }
        for (key, msg) in self.store.load_date_messages()? {
            fresh.by_date.entry(key).or_default().push(msg);
        }
        for (key, msg) in self.store.load_time_messages()? {
            fresh.by_time.entry(key).or_default().push(msg);
        }
        let mut maps = self.lock_maps()?;
        *maps = fresh;
        tracing::debug!("Schedule load database finished");
        Ok(())
    }

    /// Run the per-minute check against the current wall clock.
    pub async fn tick(&self) {
        let now = Utc::now().with_timezone(&self.utc_offset);
        self.tick_at(now).await;
    }

    /// Tick logic at an explicit instant. At most one tick per
    /// wall-clock minute does any work.
    pub async fn tick_at(&self, now: DateTime<FixedOffset>) {
        let minute = now.timestamp() / 60;
        let reload_due = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if state.last_minute == minute {
                return;
            }
            state.last_minute = minute;
            state.reload_countdown -= 1;
            if state.reload_countdown <= 0 {
                state.reload_countdown = self.reload_ticks;
                true
            } else {
                false
            }
        };
        if reload_due {
            if let Err(e) = self.data_load() {
                let msg = format!("Schedule reload failed: {e}");
                tracing::error!("{msg}");
                self.reporter.report(&msg).await;
            }
        }

        let mut date_due = Vec::new();
        let mut time_due = Vec::new();
        let mut command_due = Vec::new();
        {
            let Ok(mut maps) = self.maps.lock() else {
                return;
            };
            if now.hour() == 0 && now.minute() == 0 {
                if let Some(key) = date_key(now.month(), now.day()) {
                    if let Some(list) = maps.by_date.get(&key) {
                        date_due = list.clone();
                    }
                }
            }
            if let Some(key) = time_key(now.hour(), now.minute()) {
                if let Some(list) = maps.by_time.get(&key) {
                    time_due = list.clone();
                }
            }
            for (interval, list) in maps.commands.iter_mut() {
                for cmd in list.iter_mut() {
                    cmd.countdown -= 1;
                    if cmd.countdown <= 0 {
                        cmd.countdown = *interval;
                        command_due.push(cmd.clone());
                    }
                }
            }
        }

        for msg in date_due.iter().chain(time_due.iter()) {
            self.fire_message(msg).await;
        }
        for cmd in &command_due {
            self.fire_command(cmd).await;
        }
    }

    /// Fire a stored date/time message: dispatch it through the router
    /// (a message that looks like a command still runs the plugin) and
    /// send the plugin reply if a command was detected, the raw text
    /// otherwise.
    async fn fire_message(&self, msg: &TimedMessage) {
        let event = InboundEvent::synthetic(
            event_kind(msg.target),
            msg.user_id,
            msg.group_id,
            msg.text.clone(),
        );
        let routed = self.router.handle(&event).await;
        let reply = if routed.outcome.is_some() {
            routed.reply
        } else {
            msg.text.clone()
        };
        if reply.is_empty() {
            tracing::debug!("Scheduled message for user {} produced no reply", msg.user_id);
            return;
        }
        let code = match msg.target {
            TargetKind::Group => self.api.send_group_message(msg.group_id, &reply).await,
            TargetKind::Private => self.api.send_private_message(msg.user_id, &reply).await,
        };
        if code != 200 {
            tracing::warn!("Scheduled send failed with code {code}");
        }
    }

    /// Fire an interval command: replay `<prefix><command>` through the
    /// router and deliver the router's reply.
    async fn fire_command(&self, cmd: &IntervalCommand) {
        let text = format!("{}{}", self.prefix, cmd.command);
        let event =
            InboundEvent::synthetic(event_kind(cmd.target), cmd.user_id, cmd.group_id, text);
        let routed = self.router.handle(&event).await;
        self.router.flush_reply(&event, &routed).await;
    }

    /// Store a command replay. The command text must carry the prefix
    /// and its first token must resolve to a known plugin.
    pub fn add_interval_command(
        &self,
        target: TargetKind,
        user_id: i64,
        group_id: i64,
        command_text: &str,
        interval: i64,
    ) -> Result<(), ScheduleError> {
        if interval < 1 {
            return Err(ScheduleError::OutOfRange("interval"));
        }
        let trimmed = command_text.trim();
        let stripped = trimmed
            .strip_prefix(self.prefix)
            .ok_or_else(|| ScheduleError::UnknownCommand(trimmed.to_string()))?;
        let name = stripped
            .split_whitespace()
            .next()
            .ok_or_else(|| ScheduleError::UnknownCommand(trimmed.to_string()))?;
        if !self.registry.probe(name) {
            return Err(ScheduleError::UnknownCommand(name.to_string()));
        }
        let entry = IntervalCommand {
            target,
            user_id,
            group_id: normalize_group(target, group_id),
            command: stripped.to_string(),
            interval,
            countdown: interval,
        };
        self.store.insert_command(&entry)?;
        self.lock_maps()?
            .commands
            .entry(interval)
            .or_default()
            .push(entry);
        Ok(())
    }

    pub fn add_date_message(
        &self,
        target: TargetKind,
        user_id: i64,
        group_id: i64,
        month: u32,
        day: u32,
        text: &str,
    ) -> Result<(), ScheduleError> {
        let key = date_key(month, day).ok_or(ScheduleError::OutOfRange("month/day"))?;
        let entry = TimedMessage {
            target,
            user_id,
            group_id: normalize_group(target, group_id),
            text: text.to_string(),
        };
        self.store.insert_date_message(month, day, &entry)?;
        self.lock_maps()?.by_date.entry(key).or_default().push(entry);
        Ok(())
    }

    pub fn add_time_message(
        &self,
        target: TargetKind,
        user_id: i64,
        group_id: i64,
        hour: u32,
        minute: u32,
        text: &str,
    ) -> Result<(), ScheduleError> {
        let key = time_key(hour, minute).ok_or(ScheduleError::OutOfRange("hour/minute"))?;
        let entry = TimedMessage {
            target,
            user_id,
            group_id: normalize_group(target, group_id),
            text: text.to_string(),
        };
        self.store.insert_time_message(hour, minute, &entry)?;
        self.lock_maps()?.by_time.entry(key).or_default().push(entry);
        Ok(())
    }

    /// Commands visible to `qid`, in the same order `del` counts them.
    pub fn list_interval_commands(&self, target: TargetKind, qid: i64) -> Vec<IntervalCommand> {
        let Ok(maps) = self.maps.lock() else {
            return Vec::new();
        };
        maps.commands
            .values()
            .flatten()
            .filter(|c| matches_target(c.target, c.group_id, c.user_id, target, qid))
            .cloned()
            .collect()
    }

    /// Date messages visible to `qid` as `(bucket key, entry)` pairs.
    pub fn list_date_messages(&self, target: TargetKind, qid: i64) -> Vec<(i64, TimedMessage)> {
        self.list_timed(target, qid, false)
    }

    /// Time messages visible to `qid` as `(bucket key, entry)` pairs.
    pub fn list_time_messages(&self, target: TargetKind, qid: i64) -> Vec<(i64, TimedMessage)> {
        self.list_timed(target, qid, true)
    }

    fn list_timed(&self, target: TargetKind, qid: i64, by_time: bool) -> Vec<(i64, TimedMessage)> {
        let Ok(maps) = self.maps.lock() else {
            return Vec::new();
        };
        let map = if by_time { &maps.by_time } else { &maps.by_date };
        map.iter()
            .flat_map(|(key, list)| list.iter().map(move |m| (*key, m)))
            .filter(|(_, m)| matches_target(m.target, m.group_id, m.user_id, target, qid))
            .map(|(key, m)| (key, m.clone()))
            .collect()
    }

    /// Delete the `index`-th (1-based) command of the filtered view.
    pub fn del_interval_command(
        &self,
        target: TargetKind,
        qid: i64,
        index: usize,
    ) -> Result<(), ScheduleError> {
        if index == 0 {
            return Err(ScheduleError::NoSuchEntry);
        }
        let mut maps = self.lock_maps()?;
        let mut remaining = index;
        let mut found = None;
        'search: for (key, list) in maps.commands.iter() {
            for (pos, cmd) in list.iter().enumerate() {
                if matches_target(cmd.target, cmd.group_id, cmd.user_id, target, qid) {
                    remaining -= 1;
                    if remaining == 0 {
                        found = Some((*key, pos));
                        break 'search;
                    }
                }
            }
        }
        let (key, pos) = found.ok_or(ScheduleError::NoSuchEntry)?;
        let entry = maps.commands[&key][pos].clone();
        self.store.delete_command(&entry)?;
        if let Some(list) = maps.commands.get_mut(&key) {
            list.remove(pos);
            if list.is_empty() {
                maps.commands.remove(&key);
            }
        }
        Ok(())
    }

    pub fn del_date_message(
        &self,
        target: TargetKind,
        qid: i64,
        index: usize,
    ) -> Result<(), ScheduleError> {
        self.del_timed(target, qid, index, false)
    }

    pub fn del_time_message(
        &self,
        target: TargetKind,
        qid: i64,
        index: usize,
    ) -> Result<(), ScheduleError> {
        self.del_timed(target, qid, index, true)
    }

    /// Locate the `index`-th filtered entry by walking the exact same
    /// enumeration `list_*` uses, delete the durable row by full field
    /// match, then remove the in-memory slot.
    fn del_timed(
        &self,
        target: TargetKind,
        qid: i64,
        index: usize,
        by_time: bool,
    ) -> Result<(), ScheduleError> {
        if index == 0 {
            return Err(ScheduleError::NoSuchEntry);
        }
        let mut maps = self.lock_maps()?;
        let map = if by_time { &maps.by_time } else { &maps.by_date };
        let mut remaining = index;
        let mut found = None;
        'search: for (key, list) in map.iter() {
            for (pos, msg) in list.iter().enumerate() {
                if matches_target(msg.target, msg.group_id, msg.user_id, target, qid) {
                    remaining -= 1;
                    if remaining == 0 {
                        found = Some((*key, pos));
                        break 'search;
                    }
                }
            }
        }
        let (key, pos) = found.ok_or(ScheduleError::NoSuchEntry)?;
        let entry = map[&key][pos].clone();
        let high = (key / 100) as u32;
        let low = (key % 100) as u32;
        if by_time {
            self.store.delete_time_message(high, low, &entry)?;
        } else {
            self.store.delete_date_message(high, low, &entry)?;
        }
        let map = if by_time {
            &mut maps.by_time
        } else {
            &mut maps.by_date
        };
        if let Some(list) = map.get_mut(&key) {
            list.remove(pos);
            if list.is_empty() {
                map.remove(&key);
            }
        }
        Ok(())
    }

    fn lock_maps(&self) -> Result<std::sync::MutexGuard<'_, ScheduleMaps>, ScheduleError> {
        self.maps
            .lock()
            .map_err(|_| ScheduleError::Internal("schedule maps lock poisoned".to_string()))
    }
}

fn event_kind(target: TargetKind) -> EventKind {
    match target {
        TargetKind::Group => EventKind::Group,
        TargetKind::Private => EventKind::PrivateFriend,
    }
}

fn normalize_group(target: TargetKind, group_id: i64) -> i64 {
    match target {
        TargetKind::Group => group_id,
        TargetKind::Private => 0,
    }
}

fn matches_target(
    entry_target: TargetKind,
    entry_group: i64,
    entry_user: i64,
    target: TargetKind,
    qid: i64,
) -> bool {
    entry_target == target
        && match target {
            TargetKind::Group => entry_group == qid,
            TargetKind::Private => entry_user == qid,
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::JsonStore;
    use crate::plugins::commands::echo::Echo;
    use crate::plugins::AuthorizationGate;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct RecordingApi {
        sent: Mutex<Vec<(String, i64, String)>>,
    }

    impl RecordingApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
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

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).expect("offset")
    }

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        offset()
            .with_ymd_and_hms(2024, 5, 10, hour, minute, 0)
            .single()
            .expect("valid time")
    }

    fn make_engine(
        root: &std::path::Path,
        reload_ticks: i64,
        api: Arc<RecordingApi>,
    ) -> Arc<ScheduleEngine> {
        let gate = AuthorizationGate::new(JsonStore::new(root.join("json")).expect("json dir"));
        let reporter = Arc::new(Reporter::new(vec![], vec![], api.clone()));
        let registry = Arc::new(PluginRegistry::new(gate, reporter.clone()));
        registry.register("echo", || Ok(Box::new(Echo)));
        let router = Arc::new(MessageRouter::new('!', vec![], registry.clone(), api.clone()));
        let store = ScheduleStore::new(root.join("schedule.db")).expect("store");
        Arc::new(
            ScheduleEngine::new(
                store,
                reload_ticks,
                offset(),
                '!',
                registry,
                router,
                api,
                reporter,
            )
            .expect("engine"),
        )
    }

    #[tokio::test]
    async fn time_message_crud_round_trips_through_storage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = RecordingApi::new();
        let engine = make_engine(dir.path(), 1000, api.clone());

        engine
            .add_time_message(TargetKind::Group, 7, 100, 9, 30, "hello")
            .expect("add");
        let listed = engine.list_time_messages(TargetKind::Group, 100);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, 930);
        assert_eq!(listed[0].1.text, "hello");

        // A second engine over the same database sees the durable row.
        let fresh = make_engine(dir.path(), 1000, RecordingApi::new());
        assert_eq!(fresh.list_time_messages(TargetKind::Group, 100).len(), 1);

        // Out-of-range index fails without touching anything.
        assert!(engine.del_time_message(TargetKind::Group, 100, 5).is_err());
        assert!(engine.del_time_message(TargetKind::Group, 100, 0).is_err());
        assert_eq!(engine.list_time_messages(TargetKind::Group, 100).len(), 1);

        engine
            .del_time_message(TargetKind::Group, 100, 1)
            .expect("del");
        assert!(engine.list_time_messages(TargetKind::Group, 100).is_empty());
        engine.data_load().expect("reload");
        assert!(engine.list_time_messages(TargetKind::Group, 100).is_empty());
    }

    #[tokio::test]
    async fn add_validates_buckets_and_commands() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = make_engine(dir.path(), 1000, RecordingApi::new());

        assert!(engine
            .add_time_message(TargetKind::Group, 7, 100, 24, 0, "late")
            .is_err());
        assert!(engine
            .add_date_message(TargetKind::Group, 7, 100, 13, 1, "nope")
            .is_err());
        // Interval commands must carry the prefix and resolve.
        assert!(engine
            .add_interval_command(TargetKind::Group, 7, 100, "echo hi", 5)
            .is_err());
        assert!(engine
            .add_interval_command(TargetKind::Group, 7, 100, "!weather now", 5)
            .is_err());
        assert!(engine
            .add_interval_command(TargetKind::Group, 7, 100, "!echo hi", 0)
            .is_err());
        assert!(engine
            .add_interval_command(TargetKind::Group, 7, 100, "!echo hi", 5)
            .is_ok());
    }

    #[tokio::test]
    async fn interval_command_fires_on_the_fifth_tick_and_rearms() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = RecordingApi::new();
        let engine = make_engine(dir.path(), 1000, api.clone());

        engine
            .add_interval_command(TargetKind::Group, 7, 100, "!echo tick", 5)
            .expect("add");

        for minute in 1..=4 {
            engine.tick_at(at(12, minute)).await;
            assert!(api.sent().is_empty(), "fired early on tick {minute}");
        }
        engine.tick_at(at(12, 5)).await;
        assert_eq!(api.sent(), vec![("group".to_string(), 100, "tick".to_string())]);

        for minute in 6..=9 {
            engine.tick_at(at(12, minute)).await;
        }
        assert_eq!(api.sent().len(), 1);
        engine.tick_at(at(12, 10)).await;
        assert_eq!(api.sent().len(), 2);
    }

    #[tokio::test]
    async fn second_tick_in_same_minute_is_a_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = RecordingApi::new();
        let engine = make_engine(dir.path(), 1000, api.clone());

        engine
            .add_interval_command(TargetKind::Group, 7, 100, "!echo again", 1)
            .expect("add");

        engine.tick_at(at(12, 5)).await;
        engine.tick_at(at(12, 5)).await;
        assert_eq!(api.sent().len(), 1);

        engine.tick_at(at(12, 6)).await;
        assert_eq!(api.sent().len(), 2);
    }

    #[tokio::test]
    async fn time_message_fires_at_its_minute() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = RecordingApi::new();
        let engine = make_engine(dir.path(), 1000, api.clone());

        engine
            .add_time_message(TargetKind::Private, 7, 0, 12, 30, "lunch")
            .expect("add");

        engine.tick_at(at(12, 29)).await;
        assert!(api.sent().is_empty());
        engine.tick_at(at(12, 30)).await;
        assert_eq!(
            api.sent(),
            vec![("private".to_string(), 7, "lunch".to_string())]
        );
        engine.tick_at(at(12, 31)).await;
        assert_eq!(api.sent().len(), 1);
    }

    #[tokio::test]
    async fn date_messages_fire_at_midnight_and_dispatch_commands() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = RecordingApi::new();
        let engine = make_engine(dir.path(), 1000, api.clone());

        engine
            .add_date_message(TargetKind::Group, 7, 100, 5, 10, "!echo happy day")
            .expect("add");
        engine
            .add_date_message(TargetKind::Group, 7, 100, 5, 10, "plain greeting")
            .expect("add");
        engine
            .add_date_message(TargetKind::Group, 7, 100, 6, 1, "other day")
            .expect("add");

        // Not midnight: date messages stay quiet.
        engine.tick_at(at(12, 0)).await;
        assert!(api.sent().is_empty());

        engine.tick_at(at(0, 0)).await;
        let sent = api.sent();
        assert_eq!(sent.len(), 2);
        // The command-shaped message dispatched through the router.
        assert_eq!(sent[0], ("group".to_string(), 100, "happy day".to_string()));
        assert_eq!(
            sent[1],
            ("group".to_string(), 100, "plain greeting".to_string())
        );
    }

    #[tokio::test]
    async fn positional_delete_matches_list_enumeration() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = make_engine(dir.path(), 1000, RecordingApi::new());

        // Three entries across two buckets for group 100, plus noise
        // for another group.
        engine
            .add_time_message(TargetKind::Group, 7, 100, 9, 30, "a")
            .expect("add");
        engine
            .add_time_message(TargetKind::Group, 7, 100, 8, 15, "b")
            .expect("add");
        engine
            .add_time_message(TargetKind::Group, 7, 100, 9, 30, "c")
            .expect("add");
        engine
            .add_time_message(TargetKind::Group, 7, 200, 9, 30, "x")
            .expect("add");

        let listed: Vec<String> = engine
            .list_time_messages(TargetKind::Group, 100)
            .into_iter()
            .map(|(_, m)| m.text)
            .collect();
        assert_eq!(listed, vec!["b", "a", "c"]);

        // Delete the second listed entry ("a", first slot of the 930
        // bucket) and verify the exact slot went away.
        engine
            .del_time_message(TargetKind::Group, 100, 2)
            .expect("del");
        let listed: Vec<String> = engine
            .list_time_messages(TargetKind::Group, 100)
            .into_iter()
            .map(|(_, m)| m.text)
            .collect();
        assert_eq!(listed, vec!["b", "c"]);

        // Durable storage agrees after a wholesale reload.
        engine.data_load().expect("reload");
        let listed: Vec<String> = engine
            .list_time_messages(TargetKind::Group, 100)
            .into_iter()
            .map(|(_, m)| m.text)
            .collect();
        assert_eq!(listed, vec!["b", "c"]);
        assert_eq!(engine.list_time_messages(TargetKind::Group, 200).len(), 1);
    }

    #[tokio::test]
    async fn interval_commands_delete_by_filtered_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = make_engine(dir.path(), 1000, RecordingApi::new());

        engine
            .add_interval_command(TargetKind::Group, 7, 100, "!echo one", 5)
            .expect("add");
        engine
            .add_interval_command(TargetKind::Group, 7, 100, "!echo two", 3)
            .expect("add");
        engine
            .add_interval_command(TargetKind::Private, 7, 0, "!echo mine", 3)
            .expect("add");

        let listed: Vec<String> = engine
            .list_interval_commands(TargetKind::Group, 100)
            .into_iter()
            .map(|c| c.command)
            .collect();
        assert_eq!(listed, vec!["echo two", "echo one"]);

        engine
            .del_interval_command(TargetKind::Group, 100, 1)
            .expect("del");
        let listed: Vec<String> = engine
            .list_interval_commands(TargetKind::Group, 100)
            .into_iter()
            .map(|c| c.command)
            .collect();
        assert_eq!(listed, vec!["echo one"]);
        // The private entry is untouched.
        assert_eq!(
            engine.list_interval_commands(TargetKind::Private, 7).len(),
            1
        );
    }

    #[tokio::test]
    async fn reload_countdown_picks_up_external_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = RecordingApi::new();
        let engine = make_engine(dir.path(), 2, api.clone());

        // A second engine writes straight to the shared database.
        let other = make_engine(dir.path(), 1000, RecordingApi::new());
        other
            .add_time_message(TargetKind::Group, 7, 100, 9, 30, "late arrival")
            .expect("add");
        assert!(engine.list_time_messages(TargetKind::Group, 100).is_empty());

        engine.tick_at(at(12, 1)).await;
        assert!(engine.list_time_messages(TargetKind::Group, 100).is_empty());
        engine.tick_at(at(12, 2)).await;
        assert_eq!(engine.list_time_messages(TargetKind::Group, 100).len(), 1);
    }
}
