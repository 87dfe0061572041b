//! The downstream synchronizer seam.

use crate::{BoxError, OwnerKey, QualifiedName, SubscriptionIdentity, SubscriptionItem};

/// Applies mirrored records to the target cluster.
///
/// Every directive is tagged with the [`OwnerKey`] of the subscription that produced it.
pub trait Synchronizer<K>: Send + Sync + 'static {
    /// Creates or updates the local mirror of `record`.
    fn apply(&self, owner: &OwnerKey, item: &SubscriptionItem, record: &K) -> Result<(), BoxError>;

    /// Removes the local mirror of the record identified by `key`.
    fn remove(&self, owner: &OwnerKey, key: &QualifiedName) -> Result<(), BoxError>;

    /// Removes every local record `host` produced, identified by `owner_label`.
    fn cleanup_by_host(&self, host: &SubscriptionIdentity, owner_label: &str)
        -> Result<(), BoxError>;
}
