//! Session directory: peer identity → live ServerFace.
//!
//! Join creates a face, records it, and announces it to the router on the
//! new-face feed. Leave removes the entry and closes the face. Both may run
//! concurrently with each other and with requests reading the table.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use ript_core::{CloseReason, RiptError, SharedFace};

use crate::face::ServerFace;
use crate::mailbox::MailboxCapacity;

/// Receiving end of the new-face feed, owned by the router.
pub type FaceFeed = mpsc::Receiver<SharedFace>;

#[derive(Clone)]
pub struct SessionDirectory {
    faces: Arc<DashMap<String, Arc<ServerFace>>>,
    feed: mpsc::Sender<SharedFace>,
    feed_wait: Duration,
    capacity: MailboxCapacity,
}

impl SessionDirectory {
    pub fn new(
        feed_capacity: usize,
        feed_wait: Duration,
        capacity: MailboxCapacity,
    ) -> (Self, FaceFeed) {
        let (feed, feed_rx) = mpsc::channel(feed_capacity.max(1));
        let directory = Self {
            faces: Arc::new(DashMap::new()),
            feed,
            feed_wait,
            capacity,
        };
        (directory, feed_rx)
    }

    /// Create a face for `peer` and hand it to the router.
    ///
    /// The face is recorded only once the router's feed has taken it. A face
    /// already registered under the same peer is then closed as superseded.
    /// If the feed stays full for the configured wait the join fails and any
    /// existing face for the peer is left in place.
    pub async fn join(&self, peer: &str) -> Result<Arc<ServerFace>, RiptError> {
        let face = Arc::new(ServerFace::new(peer, self.capacity));

        let shared: SharedFace = face.clone();
        if let Err(e) = self.feed.send_timeout(shared, self.feed_wait).await {
            let err = match e {
                SendTimeoutError::Timeout(_) => RiptError::FeedFull,
                SendTimeoutError::Closed(_) => RiptError::IntakeClosed,
            };
            face.shut(CloseReason::Local(err.to_string()));
            tracing::warn!(
                peer,
                wait_ms = self.feed_wait.as_millis() as u64,
                error = %err,
                "join dropped"
            );
            return Err(err);
        }

        if let Some(previous) = self.faces.insert(peer.to_string(), face.clone()) {
            tracing::warn!(peer, "re-join replaces existing face");
            previous.shut(CloseReason::Superseded);
        }
        tracing::info!(peer, faces = self.faces.len(), "peer joined");
        Ok(face)
    }

    /// Remove `peer` and close its face. Returns false if it was not joined.
    pub fn leave(&self, peer: &str) -> bool {
        match self.faces.remove(peer) {
            Some((_, face)) => {
                face.shut(CloseReason::PeerLeft);
                tracing::info!(peer, faces = self.faces.len(), "peer left");
                true
            }
            None => {
                tracing::debug!(peer, "leave for unknown peer");
                false
            }
        }
    }

    pub fn lookup(&self, peer: &str) -> Option<Arc<ServerFace>> {
        self.faces.get(peer).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.faces.iter().map(|entry| entry.key().clone()).collect();
        peers.sort();
        peers
    }

    /// Close every face and empty the table. Returns how many were closed.
    pub fn close_all(&self, reason: CloseReason) -> usize {
        let mut closed = 0;
        self.faces.retain(|_, face| {
            face.shut(reason.clone());
            closed += 1;
            false
        });
        closed
    }
}
