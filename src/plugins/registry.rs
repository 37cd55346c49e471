//! Plugin registry - load-on-first-use cache with reload support.
//!
//! Plugins are built from a registration table of factories. An entry
//! is created the first time its name is referenced, keeps its
//! configure-success flag for its whole cached life, and is replaced
//! wholesale on reload. A single reload lock serializes reload against
//! shutdown; invocations only take short cache-lock sections and run
//! the plugin without any lock held, so they may observe either the old
//! or the freshly-reloaded instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::application::errors::PluginError;
use crate::domain::entities::{DispatchOutcome, InboundEvent};
use crate::domain::traits::Plugin;
use crate::infrastructure::report::Reporter;

use super::gate::AuthorizationGate;

/// Fixed reply shown while a plugin sits in a failed-configure state.
pub const LOAD_ERROR_REPLY: &str = "module load error";

/// Builds a fresh plugin instance; fallible so a plugin may refuse to
/// load (missing resources, bad key material).
pub type PluginFactory = Arc<dyn Fn() -> Result<Box<dyn Plugin>, PluginError> + Send + Sync>;

struct PluginEntry {
    plugin: Arc<dyn Plugin>,
    configured: bool,
}

pub struct PluginRegistry {
    factories: RwLock<HashMap<String, PluginFactory>>,
    cache: RwLock<HashMap<String, Arc<PluginEntry>>>,
    /// Serializes reload and shutdown. The guarded flag marks a
    /// registry that has shut down and refuses further reloads.
    reload_lock: Mutex<bool>,
    gate: AuthorizationGate,
    reporter: Arc<Reporter>,
}

impl PluginRegistry {
    pub fn new(gate: AuthorizationGate, reporter: Arc<Reporter>) -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            reload_lock: Mutex::new(false),
            gate,
            reporter,
        }
    }

    /// Add a plugin factory to the registration table.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn Plugin>, PluginError> + Send + Sync + 'static,
    {
        let name = name.into();
        if let Ok(mut factories) = self.factories.write() {
            factories.insert(name, Arc::new(factory));
        }
    }

    /// Remove a factory. Cached instances survive until the next
    /// reload drops them.
    pub fn deregister(&self, name: &str) -> bool {
        self.factories
            .write()
            .map(|mut f| f.remove(name).is_some())
            .unwrap_or(false)
    }

    /// Registered plugin names.
    pub fn names(&self) -> Vec<String> {
        self.factories
            .read()
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Load-check used when validating stored interval commands; never
    /// consults the allow-list and never runs the plugin.
    pub fn probe(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Resolve and run a plugin for one event.
    pub async fn invoke(&self, name: &str, event: &InboundEvent) -> DispatchOutcome {
        let known = self
            .cache
            .read()
            .map(|c| c.contains_key(name))
            .unwrap_or(false)
            || self
                .factories
                .read()
                .map(|f| f.contains_key(name))
                .unwrap_or(false);
        if !known {
            tracing::debug!("No such plugin {name}");
            return DispatchOutcome::not_found();
        }

        if !self.gate.check(name, event) {
            tracing::debug!(
                "The plugin request from group {} user {} was blocked",
                event.group_id,
                event.user_id
            );
            return DispatchOutcome::blocked();
        }

        let Some(entry) = self.lookup(name) else {
            return DispatchOutcome::not_found();
        };
        if !entry.configured {
            return DispatchOutcome::success(LOAD_ERROR_REPLY);
        }

        tracing::debug!("Now execute plugin {name}");
        match entry.plugin.run(event).await {
            Ok(reply) => DispatchOutcome::success(reply),
            Err(e) => {
                tracing::error!("Plugin {name} failed: {e}");
                DispatchOutcome::success(String::new())
            }
        }
    }

    /// Get the cached entry, loading and configuring it on first use.
    fn lookup(&self, name: &str) -> Option<Arc<PluginEntry>> {
        if let Some(entry) = self.cache.read().ok()?.get(name) {
            return Some(entry.clone());
        }
        let factory = self.factories.read().ok()?.get(name)?.clone();
        let mut cache = self.cache.write().ok()?;
        // Another task may have loaded it while we waited for the
        // write lock; configure must run only once.
        if let Some(entry) = cache.get(name) {
            return Some(entry.clone());
        }
        let plugin: Arc<dyn Plugin> = match factory() {
            Ok(plugin) => Arc::from(plugin),
            Err(e) => {
                tracing::debug!("Failed to load plugin {name}: {e}");
                return None;
            }
        };
        let configured = match plugin.configure() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to configure plugin {name}: {e}");
                false
            }
        };
        let entry = Arc::new(PluginEntry { plugin, configured });
        cache.insert(name.to_string(), entry.clone());
        Some(entry)
    }

    /// Tear down and rebuild every cached plugin. Skipped when the
    /// reload lock is already held or the registry has shut down.
    pub async fn reload_all(&self) -> bool {
        let failures = {
            let Ok(guard) = self.reload_lock.try_lock() else {
                tracing::warn!("Reload skipped: reload already in progress");
                return false;
            };
            if *guard {
                tracing::warn!("Reload refused: registry is shut down");
                return false;
            }

            let names: Vec<String> = self
                .cache
                .read()
                .map(|c| c.keys().cloned().collect())
                .unwrap_or_default();
            let mut failures = Vec::new();
            for name in names {
                let Some(old) = self.cache.read().ok().and_then(|c| c.get(&name).cloned())
                else {
                    continue;
                };
                old.plugin.teardown();

                let factory = self.factories.read().ok().and_then(|f| f.get(&name).cloned());
                match factory {
                    None => {
                        // The plugin no longer exists; drop it.
                        if let Ok(mut cache) = self.cache.write() {
                            cache.remove(&name);
                        }
                        tracing::info!("Dropped vanished plugin {name}");
                    }
                    Some(factory) => match factory() {
                        Ok(plugin) => {
                            let plugin: Arc<dyn Plugin> = Arc::from(plugin);
                            let configured = match plugin.configure() {
                                Ok(()) => true,
                                Err(e) => {
                                    tracing::error!("Failed to configure plugin {name}: {e}");
                                    false
                                }
                            };
                            if let Ok(mut cache) = self.cache.write() {
                                cache.insert(
                                    name.clone(),
                                    Arc::new(PluginEntry { plugin, configured }),
                                );
                            }
                        }
                        Err(e) => {
                            let msg = format!("Failed to reload plugin {name}: {e}");
                            tracing::error!("{msg}");
                            failures.push(msg);
                        }
                    },
                }
            }
            failures
            // The reload lock drops here, before any report await.
        };
        for msg in &failures {
            self.reporter.report(msg).await;
        }
        true
    }

    /// Tear down every cached plugin exactly once and permanently
    /// refuse further reloads.
    pub fn shutdown(&self) {
        let Ok(mut guard) = self.reload_lock.lock() else {
            return;
        };
        if *guard {
            return;
        }
        if let Ok(mut cache) = self.cache.write() {
            for (_, entry) in cache.drain() {
                entry.plugin.teardown();
            }
        }
        *guard = true;
        tracing::info!("Plugin registry shut down");
    }
}
