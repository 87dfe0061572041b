use std::{
    collections::{hash_map, HashMap},
    any::Any,
    mem, panic,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::{Mutex, RwLock};
use tokio::{runtime::Handle, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use super::{OwnerKey, SubscriptionIdentity, SubscriptionItem};
use crate::{
    config::{AdmitAll, Predicate, SharedPredicate},
    controller::{ItemReconciler, WatchController},
    store::{Record, RemoteStore, ScopedCache},
    Config, Error, Synchronizer,
};

/// Runs one watch unit per subscription item over namespaces of a remote store.
pub struct NamespaceSubscriber<K, S, Y> {
    items: Mutex<HashMap<SubscriptionIdentity, WatchUnit>>,
    store: Arc<S>,
    synchronizer: Arc<Y>,
    predicate: SharedPredicate<K>,
    config: Config,
    next_unit: AtomicU64,
}

/// A snapshot of a live watch unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStatus {
    /// Assigned when the unit starts; unchanged by descriptor updates.
    pub unit_id: u64,
    pub cluster_scoped: bool,
    /// Whether both background loops are still alive.
    pub running: bool,
    pub item: SubscriptionItem,
}

impl<K, S, Y> NamespaceSubscriber<K, S, Y>
where
    K: Record,
    S: RemoteStore<K>,
    Y: Synchronizer<K>,
{
    pub fn new(store: Arc<S>, synchronizer: Arc<Y>, config: Config) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            store,
            synchronizer,
            predicate: Arc::new(AdmitAll),
            config,
            next_unit: AtomicU64::new(0),
        }
    }

    /// Sets the predicate filtering notifications before they trigger reconciles.
    pub fn with_predicate(mut self, predicate: impl Predicate<K> + 'static) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    pub fn synchronizer(&self) -> &Arc<Y> {
        &self.synchronizer
    }

    /// Subscribes `item`, starting a watch unit if its identity is new.
    ///
    /// If the identity is already subscribed, a changed descriptor replaces the stored one
    /// without restarting the watch, and an unchanged descriptor is ignored.
    /// A unit whose loops have died is replaced by a fresh one.
    /// Construction failures leave no unit registered.
    ///
    /// Must be called within a tokio runtime, which runs the unit's loops;
    /// otherwise [`Error::NoRuntime`] is returned.
    pub fn subscribe_namespace_item(
        &self,
        item: &SubscriptionItem,
        cluster_scoped: bool,
    ) -> Result<(), Error> {
        let fingerprint = item.fingerprint();

        let mut items = self.items.lock();
        match items.entry(item.identity()) {
            hash_map::Entry::Vacant(vacant) => {
                let unit = self.start_unit(vacant.key(), item, fingerprint, cluster_scoped)?;
                vacant.insert(unit);
            }
            hash_map::Entry::Occupied(mut occupied) if occupied.get().tasks.is_finished() => {
                log::warn!(
                    "Namespace subscriber item {} stopped unexpectedly, restarting",
                    occupied.key()
                );
                let unit = self.start_unit(occupied.key(), item, fingerprint, cluster_scoped)?;
                occupied.insert(unit);
            }
            hash_map::Entry::Occupied(mut occupied) => {
                if occupied.get().differs(item, fingerprint) {
                    log::debug!("Updating namespace subscriber item {}", occupied.key());
                    let unit = occupied.get_mut();
                    *unit.item.write() = item.clone();
                    unit.fingerprint = fingerprint;
                }
            }
        }

        Ok(())
    }

    /// Subscribes an explicit, non-cluster-scoped item.
    pub fn subscribe_item(&self, item: &SubscriptionItem) -> Result<(), Error> {
        self.subscribe_namespace_item(item, false)
    }

    /// Stops the watch unit of `key`, if any, then cleans up every record it owns downstream.
    ///
    /// Both loops of the unit have terminated before cleanup starts.
    /// A cleanup failure is returned after the unit is already removed.
    /// A panic from either loop is resumed after cleanup.
    pub async fn unsubscribe_item(&self, key: &SubscriptionIdentity) -> Result<(), Error> {
        let unit = self.items.lock().remove(key);
        let mut panicked = None;
        if let Some(unit) = unit {
            panicked = unit.tasks.cancel().await;
            log::info!("Stopped namespace subscriber item {key}");
        }

        let owner = OwnerKey::for_host(key.clone());
        let result = self
            .synchronizer
            .cleanup_by_host(key, owner.label())
            .map_err(|source| {
                log::warn!("Failed to clean up records of {key}: {source}");
                Error::Cleanup {
                    key: key.clone(),
                    source,
                }
            });

        if let Some(payload) = panicked {
            panic::resume_unwind(payload)
        }
        result
    }

    /// Stops every watch unit without cleaning up downstream records.
    pub async fn shutdown(&self) {
        let units = mem::take(&mut *self.items.lock());
        for (key, unit) in units {
            if unit.tasks.cancel().await.is_some() {
                log::error!("Namespace subscriber item {key} had panicked");
            }
            log::debug!("Stopped namespace subscriber item {key}");
        }
    }

    pub fn status(&self, key: &SubscriptionIdentity) -> Option<UnitStatus> {
        self.items.lock().get(key).map(|unit| UnitStatus {
            unit_id: unit.id,
            cluster_scoped: unit.cluster_scoped,
            running: !unit.tasks.is_finished(),
            item: unit.item.read().clone(),
        })
    }

    pub fn keys(&self) -> Vec<SubscriptionIdentity> {
        self.items.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn start_unit(
        &self,
        key: &SubscriptionIdentity,
        item: &SubscriptionItem,
        fingerprint: u64,
        cluster_scoped: bool,
    ) -> Result<WatchUnit, Error> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let namespace = item.target_namespace();

        let source = self.store.watch(namespace).map_err(|source| {
            log::error!("Failed to create cache for namespace subscriber item {key}: {source}");
            Error::Cache {
                key: key.clone(),
                source,
            }
        })?;
        let mut cache = ScopedCache::new(source);

        let client = self.store.client(namespace).map_err(|source| {
            log::error!("Failed to create client for namespace subscriber item {key}: {source}");
            Error::Client {
                key: key.clone(),
                source,
            }
        })?;

        let stored = Arc::new(RwLock::new(item.clone()));
        let reconciler = ItemReconciler::<K, _, _>::new(
            client,
            Arc::clone(&self.synchronizer),
            OwnerKey::for_host(key.clone()),
            Arc::clone(&stored),
        );
        let mut controller = WatchController::new(
            format!("{}{key}", self.config.controller_prefix()),
            reconciler,
            &self.config,
        );
        controller.watch(cache.informer(), Arc::clone(&self.predicate));

        let token = CancellationToken::new();
        let handles = vec![
            runtime.spawn(cache.run(token.clone())),
            runtime.spawn(controller.run(token.clone())),
        ];

        let id = self.next_unit.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "Started namespace subscriber item {key} watching {}",
            namespace.unwrap_or("all namespaces")
        );

        Ok(WatchUnit {
            id,
            cluster_scoped,
            item: stored,
            fingerprint,
            tasks: CancellableTasks { token, handles },
        })
    }
}

struct WatchUnit {
    id: u64,
    cluster_scoped: bool,
    item: Arc<RwLock<SubscriptionItem>>,
    fingerprint: u64,
    tasks: CancellableTasks,
}

impl WatchUnit {
    /// The fingerprint decides quickly; equal fingerprints are confirmed structurally.
    fn differs(&self, item: &SubscriptionItem, fingerprint: u64) -> bool {
        descriptor_differs(&self.item.read(), self.fingerprint, item, fingerprint)
    }
}

fn descriptor_differs(
    stored: &SubscriptionItem,
    stored_fingerprint: u64,
    item: &SubscriptionItem,
    fingerprint: u64,
) -> bool {
    stored_fingerprint != fingerprint || stored != item
}

/// Background loops sharing one stop signal.
///
/// Dropping cancels the loops without waiting for them.
struct CancellableTasks {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl CancellableTasks {
    fn is_finished(&self) -> bool {
        self.handles.iter().any(JoinHandle::is_finished)
    }

    /// Cancels and awaits every loop, returning the first panic payload, if any.
    async fn cancel(mut self) -> Option<Box<dyn Any + Send>> {
        self.token.cancel();
        let mut first_panic = None;
        for handle in mem::take(&mut self.handles) {
            if let Err(err) = handle.await {
                if let Ok(panic) = err.try_into_panic() {
                    first_panic.get_or_insert(panic);
                }
            }
        }
        first_panic
    }
}

impl Drop for CancellableTasks {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::descriptor_differs;
    use crate::SubscriptionItem;

    #[test]
    fn equal_fingerprints_are_confirmed_structurally() {
        let stored = SubscriptionItem::cluster_default("ns1");
        let changed = SubscriptionItem::cluster_default("ns2");

        assert!(!descriptor_differs(&stored, 7, &stored.clone(), 7));
        assert!(descriptor_differs(&stored, 7, &changed, 7));
        assert!(descriptor_differs(&stored, 7, &stored.clone(), 8));
    }
}
