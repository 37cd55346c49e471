mod event;
mod schedule;

pub use event::{DispatchOutcome, DispatchStatus, EventKind, InboundEvent};
pub use schedule::{date_key, time_key, IntervalCommand, TargetKind, TimedMessage};
