//! Webhook-driven chat-bot message router with prefix-dispatched
//! command plugins and a timer-driven schedule engine.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;
