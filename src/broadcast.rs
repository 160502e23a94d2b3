//! Outbound delivery to connected clients
//!
//! Every connection owns a bounded queue drained by its writer task. Senders
//! only ever `try_send`, so a slow or dead socket can never stall a room.

use crate::protocol::ServerMessage;
use axum::body::Bytes;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Items consumed by a connection's writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Frame(ServerMessage),
    Pong(Bytes),
    /// Flush what is queued, then close the socket
    Close,
}

/// Cheap, cloneable sending half of a connection
#[derive(Debug, Clone)]
pub struct ClientHandle {
    tx: mpsc::Sender<Outbound>,
    /// Out-of-band close for when the queue cannot take `Outbound::Close`
    kill: Arc<Notify>,
}

impl ClientHandle {
    pub fn new(tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            tx,
            kill: Arc::new(Notify::new()),
        }
    }

    /// Handle plus the receiving end, for connections and tests alike
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a frame. Returns false if it was dropped (queue full or connection gone).
    pub fn send(&self, msg: ServerMessage) -> bool {
        self.push(Outbound::Frame(msg))
    }

    pub fn pong(&self, data: Bytes) -> bool {
        self.push(Outbound::Pong(data))
    }

    /// Ask the writer to close the socket after the frames already queued.
    ///
    /// If the queue is full the connection is killed without flushing.
    pub fn close(&self) {
        if !self.push(Outbound::Close) {
            self.kill.notify_one();
        }
    }

    /// Resolves once `close` had to bypass the queue
    pub async fn killed(&self) {
        self.kill.notified().await;
    }

    fn push(&self, item: Outbound) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Outbound queue full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Connection already closed, dropping frame");
                false
            }
        }
    }
}

/// Deliver `msg` to every open recipient except `exclude`.
///
/// Returns how many recipients accepted the frame. Failures are absorbed
/// here; the dead connection is reaped by its own disconnect path.
pub fn fan_out<'a, I>(recipients: I, msg: &ServerMessage, exclude: Option<&str>) -> usize
where
    I: IntoIterator<Item = (&'a String, &'a ClientHandle)>,
{
    let mut delivered = 0;
    for (client_id, handle) in recipients {
        if exclude == Some(client_id.as_str()) {
            continue;
        }
        if !handle.is_open() {
            continue;
        }
        if handle.send(msg.clone()) {
            delivered += 1;
        }
    }
    delivered
}
