//! FieldKit core
//!
//! The process-level plumbing of the FieldKit desktop shell:
//!
//! - [`root_key`] obtains the secret that seeds the domain service identity
//! - [`service`] launches and owns the background domain service process
//! - [`channel`] and [`broker`] hand every window a private duplex channel
//!   to that process
//! - [`config`] is the versioned, atomically persisted settings record
//! - [`telemetry`] rotates the monthly pseudonymous diagnostic identity
//!
//! Nothing here depends on the GUI toolkit; the shell crate adapts windows to
//! the [`broker::WindowTarget`] seam.

pub mod broker;
pub mod channel;
pub mod config;
pub mod error;
pub mod root_key;
pub mod service;
pub mod telemetry;

pub use broker::{ChannelBroker, ConnectionIdGenerator, NewClient, ServiceEndpoint, WindowTarget};
pub use channel::{MessageChannel, MessagePort, PortReceiver, PortSender};
pub use config::{
    ConfigKey, ConfigStore, ConfigurationRecord, CoordinateFormat, Locale, PublicSettings,
    StoreOptions, CURRENT_VERSION,
};
pub use error::{Error, Result};
pub use root_key::RootKey;
pub use service::{ServiceInbound, ServiceLaunchPlan, ServiceProcessHandle, ServiceSupervisor};
pub use telemetry::TelemetryIdentity;
