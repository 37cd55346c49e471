//! Plugin system: registry, allow-list gate, and the built-in command
//! set.

pub mod commands;
mod gate;
mod registry;

use std::sync::Arc;

pub use gate::{AllowList, AuthorizationGate};
pub use registry::{PluginFactory, PluginRegistry, LOAD_ERROR_REPLY};

use crate::application::schedule::ScheduleEngine;

/// Register the built-in command set. Factories capture weak handles to
/// the long-lived context objects.
pub fn register_builtin(registry: &Arc<PluginRegistry>, engine: &Arc<ScheduleEngine>) {
    registry.register("echo", || Ok(Box::new(commands::echo::Echo)));
    registry.register("version", || Ok(Box::new(commands::version::Version)));

    let weak = Arc::downgrade(registry);
    registry.register("reload", move || {
        Ok(Box::new(commands::reload::Reload::new(weak.clone())))
    });

    let weak = Arc::downgrade(engine);
    registry.register("schedules", move || {
        Ok(Box::new(commands::schedules::Schedules::new(weak.clone())))
    });

    let weak = Arc::downgrade(engine);
    registry.register("intervals", move || {
        Ok(Box::new(commands::intervals::Intervals::new(weak.clone())))
    });
}
