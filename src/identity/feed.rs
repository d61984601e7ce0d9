use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use super::external::ExternalIdentity;

/// Sign-in state published by the identity source. `None` means signed out.
///
/// Every published change is queued in order for the paired [`IdentityEvents`];
/// nothing is coalesced, so a sign-out followed by a sign-in delivers both.
pub struct IdentityFeed {
    tx: mpsc::UnboundedSender<Option<ExternalIdentity>>,
    current: RwLock<Option<ExternalIdentity>>,
}

/// Receiving half of an [`IdentityFeed`]. Closes once the feed is dropped and drained.
pub struct IdentityEvents {
    rx: mpsc::UnboundedReceiver<Option<ExternalIdentity>>,
}

impl IdentityFeed {
    pub fn channel() -> (Self, IdentityEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, current: RwLock::new(None) }, IdentityEvents { rx })
    }

    pub fn current(&self) -> Option<ExternalIdentity> {
        self.current.read().clone()
    }

    /// Publish a change. Always delivered, even when the value is unchanged; dedup is the consumer's job.
    pub fn publish(&self, identity: Option<ExternalIdentity>) {
        let mut current = self.current.write();
        *current = identity.clone();
        if self.tx.send(identity).is_err() {
            debug!("identity event dropped: no consumer");
        }
    }

    pub fn sign_in(&self, identity: ExternalIdentity) {
        self.publish(Some(identity));
    }

    pub fn sign_out(&self) {
        self.publish(None);
    }
}

impl IdentityEvents {
    /// Next change in publish order; `None` once the feed is gone and every change was taken.
    pub async fn recv(&mut self) -> Option<Option<ExternalIdentity>> {
        self.rx.recv().await
    }
}
