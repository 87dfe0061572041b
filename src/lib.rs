//! kube-namespace-subscriber mirrors namespace-scoped resource collections
//! from a remote cluster into a local synchronizer,
//! one independent watch per subscription item.
//!
//! Each subscription item owns a scoped cache over the remote store,
//! a controller reconciling every record the cache sees,
//! and a cancellation token shared by the two background loops.
//! The [`NamespaceSubscriber`] registry keeps exactly one such unit per
//! [`SubscriptionIdentity`], updates stored descriptors in place,
//! and tears units down before asking the [`Synchronizer`] to clean up
//! everything the identity produced.

pub mod bootstrap;
pub use bootstrap::SubscriberContext;
pub mod config;
pub use config::Config;
pub mod controller;
mod error;
pub use error::{BoxError, Error};
pub mod store;
pub use store::{KubeStore, Record, RecordClient, RemoteStore};
pub mod subscriber;
pub use subscriber::{
    NamespaceSubscriber, OwnerKey, QualifiedName, SubscriptionIdentity, SubscriptionItem,
};
pub mod sync;
pub use sync::Synchronizer;
