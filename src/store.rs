//! The remote store seam: scoped watches, record clients and caches over them.

use std::{fmt::Debug, future::Future};

use futures::stream::BoxStream;
use kube_core::Resource;
use kube_runtime::watcher;

use crate::{BoxError, QualifiedName};

/// A watched resource kind with a statically known type.
pub trait Record: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static {}

impl<K> Record for K where K: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static {}

/// The raw list-watch stream of one namespace.
pub type WatchStream<K> = BoxStream<'static, Result<watcher::Event<K>, BoxError>>;

/// The remote collection of records that subscriptions mirror.
///
/// Implementations are shared read-only across all watch units.
pub trait RemoteStore<K: Record>: Send + Sync + 'static {
    type Client: RecordClient<K>;

    /// Opens a list-watch over `namespace`, or over all namespaces if `None`.
    fn watch(&self, namespace: Option<&str>) -> Result<WatchStream<K>, BoxError>;

    /// Builds a client that re-fetches records seen by a watch over `namespace`.
    fn client(&self, namespace: Option<&str>) -> Result<Self::Client, BoxError>;
}

/// Fetches the authoritative state of a record.
pub trait RecordClient<K>: Send + Sync + 'static {
    /// Returns `Ok(None)` if the record does not exist.
    fn get(&self, key: &QualifiedName) -> impl Future<Output = Result<Option<K>, BoxError>> + Send;
}

mod cache;
pub use cache::{Informer, Notification, ScopedCache};

mod kube;
pub use self::kube::{KubeClient, KubeStore};
