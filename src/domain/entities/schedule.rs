//! Schedule entry value objects and bucket-key encoding.

/// Whether a schedule entry targets a group chat or a friend session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Group,
    Private,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Group => "group",
            TargetKind::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "group" => Some(TargetKind::Group),
            "private" => Some(TargetKind::Private),
            _ => None,
        }
    }
}

/// A stored command replayed on a fixed tick interval. The command is
/// kept without its prefix character; `countdown` is decremented once
/// per tick and reset to `interval` on fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalCommand {
    pub target: TargetKind,
    pub user_id: i64,
    /// 0 for private targets.
    pub group_id: i64,
    pub command: String,
    pub interval: i64,
    pub countdown: i64,
}

/// A stored message fired at a day-of-year or time-of-day bucket. The
/// bucket key (`month*100+day` or `hour*100+minute`) lives in the map
/// that owns the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedMessage {
    pub target: TargetKind,
    pub user_id: i64,
    /// 0 for private targets.
    pub group_id: i64,
    pub text: String,
}

/// Encode a (month, day) bucket key, validating the ranges the wire
/// format leaves unchecked.
pub fn date_key(month: u32, day: u32) -> Option<i64> {
    if (1..=12).contains(&month) && (1..=31).contains(&day) {
        Some((month * 100 + day) as i64)
    } else {
        None
    }
}

/// Encode an (hour, minute) bucket key.
pub fn time_key(hour: u32, minute: u32) -> Option<i64> {
    if hour <= 23 && minute <= 59 {
        Some((hour * 100 + minute) as i64)
    } else {
        None
    }
}
