use crate::subscriber::{QualifiedName, SubscriptionIdentity};

/// Errors reported by collaborators (remote store, synchronizer).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type of this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote store could not open a scoped watch for a subscription item.
    #[error("failed to create cache for namespace subscriber item {key}: {source}")]
    Cache {
        key: SubscriptionIdentity,
        #[source]
        source: BoxError,
    },
    /// The remote store could not build a client for a subscription item.
    #[error("failed to create client for namespace subscriber item {key}: {source}")]
    Client {
        key: SubscriptionIdentity,
        #[source]
        source: BoxError,
    },
    /// Re-fetching a watched record failed for a reason other than absence.
    #[error("failed to fetch {key}: {source}")]
    Fetch {
        key: QualifiedName,
        #[source]
        source: BoxError,
    },
    /// The synchronizer rejected an apply or remove directive.
    #[error("synchronizer rejected directive for {record} owned by {owner}: {source}")]
    Synchronizer {
        owner: String,
        record: QualifiedName,
        #[source]
        source: BoxError,
    },
    /// Downstream cleanup failed after the watch was already stopped.
    #[error("failed to clean up records owned by {key}: {source}")]
    Cleanup {
        key: SubscriptionIdentity,
        #[source]
        source: BoxError,
    },
    #[error("failed to initialize synchronizer for {sync_id}: {source}")]
    SynchronizerInit {
        sync_id: SubscriptionIdentity,
        #[source]
        source: BoxError,
    },
    /// Watch units were requested outside a tokio runtime.
    #[error("namespace subscriber items must be subscribed within a tokio runtime")]
    NoRuntime,
    #[error("invalid subscription identity {0:?}, expected `namespace/name`")]
    InvalidIdentity(String),
    #[error("default namespace subscriber is already set up")]
    AlreadyInitialized,
    #[error("default namespace subscriber is not set up")]
    NoSubscriber,
}
