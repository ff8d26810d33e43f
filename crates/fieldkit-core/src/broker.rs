//! Client channel broker.
//!
//! Each "request channel" signal from a window gets its own fresh
//! [`MessageChannel`] pair: one port goes to the domain service tagged with a
//! new connection id, the other goes back to the requesting window. The
//! handoff is fire-and-forget. The service may not have registered the
//! connection by the time the window starts posting, and if the service is
//! not running the service half is simply dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, warn};

use crate::channel::{MessageChannel, MessagePort};

/// The "new client" message handed to the domain service.
#[derive(Debug)]
pub struct NewClient {
    pub connection_id: String,
    pub port: MessagePort,
}

/// Inbound side of the domain service.
pub trait ServiceEndpoint: Send + Sync {
    /// Transfer `client` to the service. Returns false if the service is not
    /// running, in which case the message and its port are dropped.
    fn deliver_new_client(&self, client: NewClient) -> bool;
}

/// A window that can be handed the client half of a channel.
pub trait WindowTarget {
    fn label(&self) -> &str;

    fn provide_channel(&self, connection_id: &str, port: MessagePort);
}

/// Generates `window-<unix millis>` ids, never repeating one even when two
/// requests land in the same millisecond.
#[derive(Debug, Default)]
pub struct ConnectionIdGenerator {
    last: AtomicU64,
}

impl ConnectionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return format!("window-{candidate}"),
                Err(observed) => last = observed,
            }
        }
    }
}

pub struct ChannelBroker<S> {
    service: S,
    ids: ConnectionIdGenerator,
}

impl<S: ServiceEndpoint> ChannelBroker<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            ids: ConnectionIdGenerator::new(),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Serve one channel request from `window`.
    ///
    /// The window always receives its port; it learns nothing about whether
    /// the service accepted the other half. The returned id is for logging.
    pub fn handle_request<W>(&self, window: &W) -> String
    where
        W: WindowTarget + ?Sized,
    {
        let (service_port, window_port) = MessageChannel::pair();
        let connection_id = self.ids.next_id();

        let delivered = self.service.deliver_new_client(NewClient {
            connection_id: connection_id.clone(),
            port: service_port,
        });
        if delivered {
            debug!(window = window.label(), %connection_id, "handed channel to domain service");
        } else {
            warn!(
                window = window.label(),
                %connection_id,
                "domain service is not running, new-client handoff dropped"
            );
        }

        window.provide_channel(&connection_id, window_port);
        connection_id
    }
}
