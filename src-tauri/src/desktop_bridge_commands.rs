use fieldkit_core::{ConfigKey, Locale, PublicSettings};
use serde_json::Value;
use tauri::{AppHandle, Manager, WebviewWindow};
use tracing::{debug, info, warn};

use crate::{
    shell_locale,
    window_channels::{PostOutcome, TauriWindowTarget},
    BridgeResult, SettingsBridgeResult, ShellState,
};

const NOT_READY_REASON: &str = "FieldKit did not finish starting.";

fn window_setting_key(raw_key: &str) -> fieldkit_core::Result<ConfigKey> {
    let key: ConfigKey = raw_key.parse()?;
    if !key.is_setting() {
        return Err(fieldkit_core::Error::UnknownSetting(raw_key.to_string()));
    }
    Ok(key)
}

fn post_channel_message(
    state: Option<&ShellState>,
    window_label: &str,
    connection_id: &str,
    data: Value,
) -> BridgeResult {
    let Some(state) = state else {
        return BridgeResult::failed(NOT_READY_REASON);
    };
    match state.channels.post(window_label, connection_id, data) {
        PostOutcome::Delivered => BridgeResult::ok(),
        PostOutcome::UnknownConnection => {
            BridgeResult::failed(format!("Unknown channel '{connection_id}'."))
        }
        PostOutcome::PeerClosed => {
            debug!(window = window_label, %connection_id, "post on closed channel");
            BridgeResult::failed("The domain service closed this channel.")
        }
    }
}

fn close_channel(state: Option<&ShellState>, window_label: &str, connection_id: &str) -> BridgeResult {
    let Some(state) = state else {
        return BridgeResult::failed(NOT_READY_REASON);
    };
    if state.channels.close(window_label, connection_id) {
        debug!(window = window_label, %connection_id, "window closed channel");
        BridgeResult::ok()
    } else {
        BridgeResult::failed(format!("Unknown channel '{connection_id}'."))
    }
}

fn read_settings(state: Option<&ShellState>) -> Result<PublicSettings, String> {
    state
        .map(|state| state.store.public_settings())
        .ok_or_else(|| NOT_READY_REASON.to_string())
}

fn write_setting(state: Option<&ShellState>, key: &str, value: Value) -> SettingsBridgeResult {
    let Some(state) = state else {
        return SettingsBridgeResult::failed(NOT_READY_REASON);
    };
    let result = window_setting_key(key).and_then(|key| state.store.set(key, value));
    if result.is_ok() {
        info!(setting = key, "setting updated");
    }
    result.into()
}

fn remove_setting(state: Option<&ShellState>, key: &str) -> SettingsBridgeResult {
    let Some(state) = state else {
        return SettingsBridgeResult::failed(NOT_READY_REASON);
    };
    let result = window_setting_key(key).and_then(|key| state.store.delete(key));
    if result.is_ok() {
        info!(setting = key, "setting deleted");
    }
    result.into()
}

/// Without a store there is no explicit choice to honour, so follow the system.
fn effective_locale(state: Option<&ShellState>) -> String {
    let locale = state.map_or(Locale::System, |state| state.store.locale());
    shell_locale::effective_language_tag(&locale)
}

#[tauri::command]
pub(crate) fn desktop_bridge_is_desktop_runtime() -> bool {
    true
}

/// Ask for a private channel to the domain service. The port arrives as a
/// `provide-channel` event on the calling window.
#[tauri::command]
pub(crate) fn request_channel(app_handle: AppHandle, window: WebviewWindow) {
    let Some(state) = app_handle.try_state::<ShellState>() else {
        warn!(window = window.label(), "channel requested before startup completed");
        return;
    };
    let target = TauriWindowTarget::new(&app_handle, window.label(), &state.channels);
    state.broker.handle_request(&target);
}

#[tauri::command]
pub(crate) fn channel_post(
    app_handle: AppHandle,
    window: WebviewWindow,
    connection_id: String,
    data: Value,
) -> BridgeResult {
    let state = app_handle.try_state::<ShellState>();
    post_channel_message(state.as_deref(), window.label(), &connection_id, data)
}

#[tauri::command]
pub(crate) fn channel_close(
    app_handle: AppHandle,
    window: WebviewWindow,
    connection_id: String,
) -> BridgeResult {
    let state = app_handle.try_state::<ShellState>();
    close_channel(state.as_deref(), window.label(), &connection_id)
}

#[tauri::command]
pub(crate) fn settings_get(app_handle: AppHandle) -> Result<PublicSettings, String> {
    let state = app_handle.try_state::<ShellState>();
    read_settings(state.as_deref())
}

#[tauri::command]
pub(crate) fn settings_set(app_handle: AppHandle, key: String, value: Value) -> SettingsBridgeResult {
    let state = app_handle.try_state::<ShellState>();
    write_setting(state.as_deref(), &key, value)
}

#[tauri::command]
pub(crate) fn settings_delete(app_handle: AppHandle, key: String) -> SettingsBridgeResult {
    let state = app_handle.try_state::<ShellState>();
    remove_setting(state.as_deref(), &key)
}

#[tauri::command]
pub(crate) fn settings_effective_locale(app_handle: AppHandle) -> String {
    let state = app_handle.try_state::<ShellState>();
    effective_locale(state.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn window_setting_key_accepts_public_settings() {
        assert_eq!(
            window_setting_key("coordinateFormat").unwrap(),
            ConfigKey::CoordinateFormat
        );
        assert_eq!(window_setting_key("locale").unwrap(), ConfigKey::Locale);
    }

    #[test]
    fn window_setting_key_hides_internal_keys() {
        for key in ["rootKey", "telemetryIdentity", "mapStyle"] {
            assert!(matches!(
                window_setting_key(key),
                Err(fieldkit_core::Error::UnknownSetting(name)) if name == key
            ));
        }
    }

    #[test]
    fn commands_fail_cleanly_when_startup_did_not_complete() {
        let posted = post_channel_message(None, "main", "window-1", json!({ "op": "ping" }));
        assert!(!posted.ok);
        assert_eq!(posted.reason.as_deref(), Some(NOT_READY_REASON));

        assert!(!close_channel(None, "main", "window-1").ok);
        assert_eq!(read_settings(None).unwrap_err(), NOT_READY_REASON);

        let set = write_setting(None, "coordinateFormat", json!("dd"));
        assert!(!set.ok);
        assert_eq!(set.reason.as_deref(), Some(NOT_READY_REASON));
        assert!(!remove_setting(None, "activeProjectId").ok);

        assert!(!effective_locale(None).is_empty());
    }
}
