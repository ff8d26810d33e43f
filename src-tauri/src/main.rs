#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_constants;
mod app_runtime;
mod app_types;
mod desktop_bridge_commands;
mod exit_events;
mod launch_plan;
mod logging;
mod runtime_paths;
mod shell_locale;
mod startup_task;
mod window_channels;

pub(crate) use app_constants::*;
pub(crate) use app_types::{
    BridgeResult, ChannelClosedPayload, ChannelMessagePayload, ProvideChannelPayload,
    SettingsBridgeResult, ShellState,
};

fn main() {
    app_runtime::run();
}
