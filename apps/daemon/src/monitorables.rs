use github::GithubFaker;
use pingdom::Pingdom;
use tileboard_config::Settings;
use tileboard_core::{MonitorableManager, Store};

/// Register every monitorable, enable its usable variants and seal the registry
pub fn start(settings: &Settings) -> anyhow::Result<Store> {
    let mut store = Store::new();
    let mut manager = MonitorableManager::new();
    let delay = settings.core.default_initial_max_delay;

    manager.register(Box::new(Pingdom::new(
        &settings.monitorables,
        delay,
        &mut store,
    )?));
    if settings.core.faker {
        manager.register(Box::new(GithubFaker::new(delay, &mut store)?));
    }

    let report = manager.enable_all(&mut store);
    if report.enabled.is_empty() {
        log::warn!("Daemon: No monitorable enabled, dashboards will stay empty");
    }
    if report.has_errors() {
        log::warn!(
            "Daemon: {} monitorable variant(s) could not be enabled",
            report.errors.len()
        );
    }

    store.registry.seal();
    for diagnostic in store.registry.diagnostics() {
        log::warn!("Daemon: Registry diagnostic: {}", diagnostic);
    }

    Ok(store)
}
