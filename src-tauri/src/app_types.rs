use fieldkit_core::{ChannelBroker, ConfigStore, ServiceInbound, ServiceProcessHandle};
use serde::Serialize;
use serde_json::Value;

use crate::window_channels::WindowChannels;

/// Managed state, installed once startup has provisioned everything.
pub(crate) struct ShellState {
    pub(crate) store: ConfigStore,
    pub(crate) broker: ChannelBroker<ServiceInbound>,
    pub(crate) service: ServiceProcessHandle,
    pub(crate) channels: WindowChannels,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProvideChannelPayload {
    pub(crate) connection_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelMessagePayload {
    pub(crate) connection_id: String,
    pub(crate) data: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelClosedPayload {
    pub(crate) connection_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct BridgeResult {
    pub(crate) ok: bool,
    pub(crate) reason: Option<String>,
}

impl BridgeResult {
    pub(crate) fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub(crate) fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// Settings failures carry a user-facing `reason` and a technical `detail`.
#[derive(Debug, Serialize)]
pub(crate) struct SettingsBridgeResult {
    pub(crate) ok: bool,
    pub(crate) reason: Option<String>,
    pub(crate) detail: Option<String>,
}

impl SettingsBridgeResult {
    pub(crate) fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
            detail: None,
        }
    }

    pub(crate) fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
            detail: None,
        }
    }

    pub(crate) fn from_error(error: &fieldkit_core::Error) -> Self {
        Self {
            ok: false,
            reason: Some(error.to_string()),
            detail: Some(format!("{error:?}")),
        }
    }
}

impl From<fieldkit_core::Result<()>> for SettingsBridgeResult {
    fn from(result: fieldkit_core::Result<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(error) => Self::from_error(&error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_bridge_result_exposes_reason_and_detail() {
        let error = fieldkit_core::Error::UnknownSetting("rootKey".to_string());
        let result = SettingsBridgeResult::from(Err::<(), _>(error));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["ok"], json!(false));
        assert!(value["reason"].as_str().unwrap().contains("rootKey"));
        assert!(value["detail"].as_str().unwrap().contains("UnknownSetting"));
    }

    #[test]
    fn channel_message_payload_uses_camel_case() {
        let payload = ChannelMessagePayload {
            connection_id: "window-1".to_string(),
            data: json!({ "op": "ping" }),
        };
        assert_eq!(
            serde_json::to_value(payload).unwrap(),
            json!({ "connectionId": "window-1", "data": { "op": "ping" } })
        );
    }
}
