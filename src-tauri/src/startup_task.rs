use std::env;

use fieldkit_core::{
    root_key, ChannelBroker, ConfigStore, ServiceLaunchPlan, ServiceSupervisor, StoreOptions,
};
use tracing::info;

use crate::{
    launch_plan, runtime_paths::RuntimePaths, window_channels::WindowChannels, ShellState,
    ROOT_KEY_ENV,
};

/// Open the configuration store, provision the root key and launch the domain
/// service. Any error here is fatal: the shell cannot run without a service.
pub(crate) fn bootstrap(paths: &RuntimePaths) -> Result<ShellState, String> {
    let override_key = env::var(ROOT_KEY_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty());
    let plan = launch_plan::resolve_service_launch_plan(paths)?;
    bootstrap_with(paths, override_key.as_deref(), &plan)
}

fn bootstrap_with(
    paths: &RuntimePaths,
    override_key: Option<&str>,
    plan: &ServiceLaunchPlan,
) -> Result<ShellState, String> {
    let store = ConfigStore::open(paths.config_file(), StoreOptions::default())
        .map_err(|error| error.to_string())?;
    info!(path = %store.path().display(), "configuration store ready");

    let root_key = root_key::provision(override_key, &store).map_err(|error| error.to_string())?;

    let storage_dir = paths.storage_dir();
    let service = tauri::async_runtime::block_on(async {
        ServiceSupervisor::start(plan, &root_key.to_hex(), &storage_dir)
    })
    .map_err(|error| error.to_string())?;

    let broker = ChannelBroker::new(service.inbound());
    Ok(ShellState {
        store,
        broker,
        service,
        channels: WindowChannels::default(),
    })
}
