pub(crate) const APP_DIR_NAME: &str = "fieldkit";
pub(crate) const HOME_FALLBACK_DIR_NAME: &str = ".fieldkit";

pub(crate) const ROOT_DIR_ENV: &str = "FIELDKIT_ROOT";
pub(crate) const ROOT_KEY_ENV: &str = "FIELDKIT_ROOT_KEY";
pub(crate) const SERVICE_CMD_ENV: &str = "FIELDKIT_SERVICE_CMD";
pub(crate) const LOG_FILTER_ENV: &str = "FIELDKIT_LOG";

pub(crate) const DEFAULT_LOG_FILTER: &str = "warn,fieldkit_core=info,fieldkit_desktop=info";

pub(crate) const CONFIG_FILE: &str = "config.json";
pub(crate) const STORAGE_DIR: &str = "storage";
pub(crate) const LOGS_DIR: &str = "logs";
pub(crate) const DESKTOP_LOG_FILE: &str = "desktop.log";
pub(crate) const SERVICE_LOG_FILE: &str = "service.log";

pub(crate) const SERVICE_SIDECAR_NAME: &str = "fieldkit-service";

pub(crate) const PROVIDE_CHANNEL_EVENT: &str = "provide-channel";
pub(crate) const CHANNEL_MESSAGE_EVENT: &str = "channel-message";
pub(crate) const CHANNEL_CLOSED_EVENT: &str = "channel-closed";

pub(crate) const DEFAULT_LANGUAGE_TAG: &str = "en";

pub(crate) const SERVICE_STOP_TIMEOUT_SECS: u64 = 5;
