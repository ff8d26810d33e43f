use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use fieldkit_core::{MessagePort, PortReceiver, PortSender, WindowTarget};
use serde_json::Value;
use tauri::{AppHandle, Emitter, Manager};
use tracing::{debug, warn};

use crate::{
    ChannelClosedPayload, ChannelMessagePayload, ProvideChannelPayload, ShellState,
    CHANNEL_CLOSED_EVENT, CHANNEL_MESSAGE_EVENT, PROVIDE_CHANNEL_EVENT,
};

#[derive(Debug)]
struct OwnedPort {
    window_label: String,
    sender: PortSender,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PostOutcome {
    Delivered,
    UnknownConnection,
    PeerClosed,
}

/// Window-side channel endpoints, each owned by exactly one window.
///
/// Dropping an entry drops the window's sender, which the domain service
/// observes as the client going away.
#[derive(Debug, Default)]
pub(crate) struct WindowChannels {
    ports: Mutex<HashMap<String, OwnedPort>>,
}

impl WindowChannels {
    pub(crate) fn register(&self, window_label: &str, connection_id: &str, sender: PortSender) {
        self.lock().insert(
            connection_id.to_string(),
            OwnedPort {
                window_label: window_label.to_string(),
                sender,
            },
        );
    }

    pub(crate) fn post(&self, window_label: &str, connection_id: &str, data: Value) -> PostOutcome {
        let sender = match self.lock().get(connection_id) {
            Some(port) if port.window_label == window_label => port.sender.clone(),
            _ => return PostOutcome::UnknownConnection,
        };
        if sender.post(data) {
            PostOutcome::Delivered
        } else {
            PostOutcome::PeerClosed
        }
    }

    /// Drop one endpoint if `window_label` owns it.
    pub(crate) fn close(&self, window_label: &str, connection_id: &str) -> bool {
        let mut ports = self.lock();
        match ports.get(connection_id) {
            Some(port) if port.window_label == window_label => {
                ports.remove(connection_id);
                true
            }
            _ => false,
        }
    }

    /// Drop every endpoint owned by `window_label`; returns how many.
    pub(crate) fn close_window(&self, window_label: &str) -> usize {
        let mut ports = self.lock();
        let before = ports.len();
        ports.retain(|_, port| port.window_label != window_label);
        before - ports.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, OwnedPort>> {
        self.ports.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Adapts one Tauri window to the broker's window seam.
pub(crate) struct TauriWindowTarget<'a> {
    app_handle: &'a AppHandle,
    label: &'a str,
    channels: &'a WindowChannels,
}

impl<'a> TauriWindowTarget<'a> {
    pub(crate) fn new(app_handle: &'a AppHandle, label: &'a str, channels: &'a WindowChannels) -> Self {
        Self {
            app_handle,
            label,
            channels,
        }
    }
}

impl WindowTarget for TauriWindowTarget<'_> {
    fn label(&self) -> &str {
        self.label
    }

    fn provide_channel(&self, connection_id: &str, port: MessagePort) {
        let (sender, receiver) = port.into_split();
        self.channels.register(self.label, connection_id, sender);

        let payload = ProvideChannelPayload {
            connection_id: connection_id.to_string(),
        };
        if let Err(error) = self
            .app_handle
            .emit_to(self.label, PROVIDE_CHANNEL_EVENT, payload)
        {
            warn!(window = self.label, %connection_id, %error, "failed to provide channel to window");
        }

        tauri::async_runtime::spawn(forward_to_window(
            self.app_handle.clone(),
            self.label.to_string(),
            connection_id.to_string(),
            receiver,
        ));
    }
}

async fn forward_to_window(
    app_handle: AppHandle,
    window_label: String,
    connection_id: String,
    mut receiver: PortReceiver,
) {
    while let Some(data) = receiver.recv().await {
        let payload = ChannelMessagePayload {
            connection_id: connection_id.clone(),
            data,
        };
        if let Err(error) = app_handle.emit_to(window_label.as_str(), CHANNEL_MESSAGE_EVENT, payload) {
            warn!(window = %window_label, %connection_id, %error, "failed to forward service message");
            break;
        }
    }

    // Only tell the window when the service side ended the channel.
    let Some(state) = app_handle.try_state::<ShellState>() else {
        return;
    };
    if state.channels.close(&window_label, &connection_id) {
        debug!(window = %window_label, %connection_id, "domain service closed channel");
        let _ = app_handle.emit_to(
            window_label.as_str(),
            CHANNEL_CLOSED_EVENT,
            ChannelClosedPayload { connection_id },
        );
    }
}

pub(crate) fn handle_window_destroyed(app_handle: &AppHandle, window_label: &str) {
    let Some(state) = app_handle.try_state::<ShellState>() else {
        return;
    };
    let closed = state.channels.close_window(window_label);
    if closed > 0 {
        debug!(window = window_label, closed, "dropped channels of destroyed window");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldkit_core::MessageChannel;
    use serde_json::json;

    fn registered(channels: &WindowChannels, window_label: &str, connection_id: &str) -> MessagePort {
        let (service_port, window_port) = MessageChannel::pair();
        let (sender, _receiver) = window_port.into_split();
        channels.register(window_label, connection_id, sender);
        service_port
    }

    #[test]
    fn post_reaches_the_service_end() {
        let channels = WindowChannels::default();
        let mut service_port = registered(&channels, "main", "window-1");

        assert_eq!(
            channels.post("main", "window-1", json!({ "op": "list" })),
            PostOutcome::Delivered
        );
        assert_eq!(
            tauri::async_runtime::block_on(service_port.recv()),
            Some(json!({ "op": "list" }))
        );
    }

    #[test]
    fn post_rejects_connections_owned_by_other_windows() {
        let channels = WindowChannels::default();
        let _service_port = registered(&channels, "main", "window-1");

        assert_eq!(
            channels.post("settings", "window-1", json!(1)),
            PostOutcome::UnknownConnection
        );
        assert_eq!(
            channels.post("main", "window-404", json!(1)),
            PostOutcome::UnknownConnection
        );
    }

    #[test]
    fn post_reports_closed_service_end() {
        let channels = WindowChannels::default();
        drop(registered(&channels, "main", "window-1"));

        assert_eq!(channels.post("main", "window-1", json!(1)), PostOutcome::PeerClosed);
    }

    #[test]
    fn close_requires_ownership_and_ends_the_service_stream() {
        let channels = WindowChannels::default();
        let mut service_port = registered(&channels, "main", "window-1");

        assert!(!channels.close("settings", "window-1"));
        assert!(channels.close("main", "window-1"));
        assert!(!channels.close("main", "window-1"));
        assert_eq!(tauri::async_runtime::block_on(service_port.recv()), None);
    }

    #[test]
    fn close_window_only_drops_that_windows_channels() {
        let channels = WindowChannels::default();
        let _a = registered(&channels, "main", "window-1");
        let _b = registered(&channels, "main", "window-2");
        let _c = registered(&channels, "map", "window-3");

        assert_eq!(channels.close_window("main"), 2);
        assert_eq!(channels.post("map", "window-3", json!(1)), PostOutcome::Delivered);
        assert_eq!(channels.post("main", "window-1", json!(1)), PostOutcome::UnknownConnection);
    }
}
