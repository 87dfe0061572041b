use std::sync::Arc;

use crate::store::Notification;

/// Decides whether a watch notification should trigger a reconcile.
///
/// The resource kind's owner usually supplies this,
/// e.g. to ignore status-only updates.
pub trait Predicate<K>: Send + Sync {
    fn admit(&self, notification: &Notification<K>) -> bool;
}

/// A predicate shared by every watch unit of a registry.
pub type SharedPredicate<K> = Arc<dyn Predicate<K>>;

/// Admits every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdmitAll;

impl<K> Predicate<K> for AdmitAll {
    fn admit(&self, _notification: &Notification<K>) -> bool {
        true
    }
}

/// Wraps a closure as a [`Predicate`].
pub fn predicate_fn<K, F>(f: F) -> PredicateFn<F>
where
    F: Fn(&Notification<K>) -> bool + Send + Sync,
{
    PredicateFn(f)
}

pub struct PredicateFn<F>(F);

impl<K, F> Predicate<K> for PredicateFn<F>
where
    F: Fn(&Notification<K>) -> bool + Send + Sync,
{
    fn admit(&self, notification: &Notification<K>) -> bool {
        (self.0)(notification)
    }
}
