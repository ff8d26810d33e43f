use tauri::{Manager, RunEvent, WindowEvent};
use tracing::{error, info};

use crate::{exit_events, logging, runtime_paths::RuntimePaths, startup_task, window_channels};

pub(crate) fn run() {
    let paths = RuntimePaths::resolve();
    let file_logging = logging::init_logging(&paths);
    info!(
        root = %paths.root().display(),
        desktop_log = %paths.desktop_log().display(),
        file_logging,
        "desktop process starting"
    );

    tauri::Builder::default()
        .invoke_handler(tauri::generate_handler![
            crate::desktop_bridge_commands::desktop_bridge_is_desktop_runtime,
            crate::desktop_bridge_commands::request_channel,
            crate::desktop_bridge_commands::channel_post,
            crate::desktop_bridge_commands::channel_close,
            crate::desktop_bridge_commands::settings_get,
            crate::desktop_bridge_commands::settings_set,
            crate::desktop_bridge_commands::settings_delete,
            crate::desktop_bridge_commands::settings_effective_locale,
        ])
        .on_window_event(|window, event| {
            if let WindowEvent::Destroyed = event {
                window_channels::handle_window_destroyed(window.app_handle(), window.label());
            }
        })
        .setup(move |app| {
            let app_handle = app.handle().clone();
            match startup_task::bootstrap(&paths) {
                Ok(state) => {
                    info!(pid = ?state.service.pid(), "startup complete");
                    app_handle.manage(state);
                }
                Err(startup_error) => {
                    error!(error = %startup_error, "startup failed");
                    app_handle.exit(1);
                }
            }
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| {
            if let RunEvent::Exit = event {
                exit_events::handle_exit_event(app_handle);
            }
        });
}
