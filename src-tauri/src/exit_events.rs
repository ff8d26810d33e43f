use std::time::Duration;

use fieldkit_core::ServiceProcessHandle;
use tauri::{AppHandle, Manager};
use tracing::info;

use crate::{ShellState, SERVICE_STOP_TIMEOUT_SECS};

pub(crate) fn handle_exit_event(app_handle: &AppHandle) {
    let Some(state) = app_handle.try_state::<ShellState>() else {
        return;
    };
    stop_service(&state.service);
}

/// Kill the domain service and block until it is reaped, so it cannot outlive
/// the shell process.
pub(crate) fn stop_service(service: &ServiceProcessHandle) -> bool {
    if service.is_running() {
        info!(pid = ?service.pid(), "application exiting, stopping domain service");
    }
    tauri::async_runtime::block_on(
        service.shutdown(Duration::from_secs(SERVICE_STOP_TIMEOUT_SECS)),
    )
}
