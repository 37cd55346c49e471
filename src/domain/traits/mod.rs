mod chat;
mod plugin;

pub use chat::{ChatApi, REQUEST_ERR};
pub use plugin::Plugin;
