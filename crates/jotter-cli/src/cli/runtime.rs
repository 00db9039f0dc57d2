use std::sync::Arc;

use anyhow::{Context, Result};
use jotter_core::agents::UnavailableOrchestrator;
use jotter_core::config::CoreConfig;
use jotter_core::events::BroadcastNotifier;
use jotter_core::shortcuts::{HeadlessShortcuts, ShortcutBackend};
use jotter_core::store::SqliteCommandStore;
use jotter_core::{CommandRegistry, CommandService, HotkeyManager, HotkeyTriggers};

/// Everything a CLI invocation needs, wired together and initialized.
pub struct CommandRuntime {
    pub service: Arc<CommandService>,
    pub notifier: Arc<BroadcastNotifier>,
    pub triggers: HotkeyTriggers,
}

/// Shortcut backend for `listen`. Falls back to the in-process table when
/// the binary was built without OS support.
pub fn listen_backend() -> Result<Arc<dyn ShortcutBackend>> {
    #[cfg(feature = "os-shortcuts")]
    {
        let backend = jotter_core::shortcuts::OsShortcuts::new()
            .context("Failed to start OS shortcut backend")?;
        Ok(Arc::new(backend))
    }

    #[cfg(not(feature = "os-shortcuts"))]
    {
        tracing::warn!("Built without os-shortcuts; global hotkeys will not reach the OS");
        Ok(Arc::new(HeadlessShortcuts::new()))
    }
}

/// Open the command database and bring up registry, hotkey manager and
/// service. One-shot commands pass a [`HeadlessShortcuts`] backend so they
/// never grab OS shortcuts.
pub fn open_service(
    core: &CoreConfig,
    backend: Arc<dyn ShortcutBackend>,
    seed_builtins: bool,
) -> Result<CommandRuntime> {
    let path = core.database_path();
    let store = SqliteCommandStore::open(&path)
        .with_context(|| format!("Failed to open command database: {}", path.display()))?;

    let registry = Arc::new(CommandRegistry::new(
        Arc::new(store),
        Arc::new(UnavailableOrchestrator),
    ));
    let notifier = Arc::new(BroadcastNotifier::new(64));
    let (manager, triggers) = HotkeyManager::new(registry.clone(), backend, notifier.clone());

    let service = Arc::new(CommandService::new(registry, Arc::new(manager)));
    service
        .initialize(seed_builtins)
        .context("Failed to initialize command service")?;

    Ok(CommandRuntime {
        service,
        notifier,
        triggers,
    })
}

pub fn headless_backend() -> Arc<dyn ShortcutBackend> {
    Arc::new(HeadlessShortcuts::new())
}
