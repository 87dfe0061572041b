//! Process-wide setup of the default namespace subscriber.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    store::{Record, RemoteStore},
    BoxError, Error, NamespaceSubscriber, SubscriptionIdentity, SubscriptionItem, Synchronizer,
};

/// Holds the synchronizer and the default [`NamespaceSubscriber`] of a process.
///
/// Create one at startup and pass it to every call site;
/// tests create a fresh context each.
pub struct SubscriberContext<K, S, Y> {
    synchronizer: Mutex<Option<Arc<Y>>>,
    subscriber: Mutex<Option<Arc<NamespaceSubscriber<K, S, Y>>>>,
}

impl<K, S, Y> Default for SubscriberContext<K, S, Y> {
    fn default() -> Self {
        Self {
            synchronizer: Mutex::new(None),
            subscriber: Mutex::new(None),
        }
    }
}

impl<K, S, Y> SubscriberContext<K, S, Y>
where
    K: Record,
    S: RemoteStore<K>,
    Y: Synchronizer<K>,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets up the default namespace subscriber for `sync_id`.
    ///
    /// The synchronizer is created with `make_synchronizer` unless one is already registered.
    /// `build` wires the subscriber to it.
    /// Unless `sync_id` is the root `/`,
    /// a cluster-scoped default item watching `sync_id.namespace` is subscribed.
    ///
    /// Nothing is installed if any step fails.
    /// Subscribing the default item requires a tokio runtime.
    pub fn add<MakeSync, Build>(
        &self,
        sync_id: &SubscriptionIdentity,
        make_synchronizer: MakeSync,
        build: Build,
    ) -> Result<Arc<NamespaceSubscriber<K, S, Y>>, Error>
    where
        MakeSync: FnOnce(&SubscriptionIdentity) -> Result<Y, BoxError>,
        Build: FnOnce(Arc<Y>) -> NamespaceSubscriber<K, S, Y>,
    {
        log::info!("Setting up default namespace subscriber on {sync_id}");

        let mut subscriber_slot = self.subscriber.lock();
        if subscriber_slot.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let synchronizer = {
            let mut slot = self.synchronizer.lock();
            match &*slot {
                Some(synchronizer) => Arc::clone(synchronizer),
                None => {
                    let synchronizer =
                        Arc::new(make_synchronizer(sync_id).map_err(|source| {
                            log::error!("Failed to initialize synchronizer for {sync_id}: {source}");
                            Error::SynchronizerInit {
                                sync_id: sync_id.clone(),
                                source,
                            }
                        })?);
                    *slot = Some(Arc::clone(&synchronizer));
                    synchronizer
                }
            }
        };

        let subscriber = Arc::new(build(synchronizer));

        if !sync_id.is_root() {
            let item = SubscriptionItem::cluster_default(&sync_id.namespace);
            if let Err(err) = subscriber.subscribe_namespace_item(&item, true) {
                log::error!("Failed to initialize default channel to cluster namespace: {err}");
                return Err(err);
            }
        }

        *subscriber_slot = Some(Arc::clone(&subscriber));
        Ok(subscriber)
    }

    /// The default subscriber, if [`add`](Self::add) has succeeded.
    pub fn current_subscriber(&self) -> Option<Arc<NamespaceSubscriber<K, S, Y>>> {
        self.subscriber.lock().clone()
    }

    /// Like [`current_subscriber`](Self::current_subscriber),
    /// but reports a missing subscriber as an error.
    pub fn subscriber(&self) -> Result<Arc<NamespaceSubscriber<K, S, Y>>, Error> {
        self.current_subscriber().ok_or(Error::NoSubscriber)
    }

    pub fn synchronizer(&self) -> Option<Arc<Y>> {
        self.synchronizer.lock().clone()
    }
}
