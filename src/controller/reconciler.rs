use std::{marker::PhantomData, sync::Arc};

use parking_lot::RwLock;

use super::Reconcile;
use crate::{
    store::{Record, RecordClient},
    Error, OwnerKey, QualifiedName, SubscriptionItem, Synchronizer,
};

/// Mirrors the records watched by one subscription item into the synchronizer.
pub struct ItemReconciler<K, C, Y> {
    client: C,
    synchronizer: Arc<Y>,
    owner: OwnerKey,
    item: Arc<RwLock<SubscriptionItem>>,
    _ph: PhantomData<fn() -> K>,
}

impl<K, C, Y> ItemReconciler<K, C, Y> {
    /// `item` is the descriptor stored in the watch unit;
    /// updates to it apply to subsequent reconciles.
    pub fn new(
        client: C,
        synchronizer: Arc<Y>,
        owner: OwnerKey,
        item: Arc<RwLock<SubscriptionItem>>,
    ) -> Self {
        Self {
            client,
            synchronizer,
            owner,
            item,
            _ph: PhantomData,
        }
    }
}

impl<K, C, Y> Reconcile for ItemReconciler<K, C, Y>
where
    K: Record,
    C: RecordClient<K>,
    Y: Synchronizer<K>,
{
    async fn reconcile(&self, key: &QualifiedName) -> Result<(), Error> {
        let record = self.client.get(key).await.map_err(|source| Error::Fetch {
            key: key.clone(),
            source,
        })?;

        let result = match record {
            Some(record) => {
                log::debug!("Applying {key} for {}", self.owner);
                let item = self.item.read().clone();
                self.synchronizer.apply(&self.owner, &item, &record)
            }
            None => {
                log::debug!("Removing {key} for {}", self.owner);
                self.synchronizer.remove(&self.owner, key)
            }
        };

        result.map_err(|source| Error::Synchronizer {
            owner: self.owner.label().to_owned(),
            record: key.clone(),
            source,
        })
    }
}
