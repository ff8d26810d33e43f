//! Linked in-memory duplex message endpoints.
//!
//! A [`MessageChannel`] pair is the unit of ownership transfer between a
//! window and the domain service: whoever holds a port talks to whoever holds
//! its peer, with no broker involvement after the handoff.

use serde_json::Value;
use tokio::sync::mpsc;

pub struct MessageChannel;

impl MessageChannel {
    /// Create two linked endpoints. What is posted on one is received on the
    /// other. Queues are unbounded.
    pub fn pair() -> (MessagePort, MessagePort) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            MessagePort {
                sender: PortSender { tx: a_tx },
                receiver: PortReceiver { rx: a_rx },
            },
            MessagePort {
                sender: PortSender { tx: b_tx },
                receiver: PortReceiver { rx: b_rx },
            },
        )
    }
}

#[derive(Debug)]
pub struct MessagePort {
    sender: PortSender,
    receiver: PortReceiver,
}

impl MessagePort {
    /// Post to the peer. Returns false once the peer has been dropped.
    pub fn post(&self, message: Value) -> bool {
        self.sender.post(message)
    }

    /// Next message from the peer, `None` once the peer is gone and the queue
    /// is drained.
    pub async fn recv(&mut self) -> Option<Value> {
        self.receiver.recv().await
    }

    pub fn into_split(self) -> (PortSender, PortReceiver) {
        (self.sender, self.receiver)
    }
}

#[derive(Debug, Clone)]
pub struct PortSender {
    tx: mpsc::UnboundedSender<Value>,
}

impl PortSender {
    pub fn post(&self, message: Value) -> bool {
        self.tx.send(message).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct PortReceiver {
    rx: mpsc::UnboundedReceiver<Value>,
}

impl PortReceiver {
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }
}
