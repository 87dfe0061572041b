//! Reconcile loops driven by scoped cache informers.

use std::{collections::HashMap, future::Future};

use futures::{future, stream, stream::BoxStream, StreamExt};
use tokio_util::{
    sync::CancellationToken,
    time::{delay_queue, DelayQueue},
};

use crate::{
    config::SharedPredicate,
    store::{Informer, Record},
    Config, Error, QualifiedName,
};

mod reconciler;
pub use reconciler::ItemReconciler;

/// Brings the local state of one record in line with the remote store.
pub trait Reconcile: Send + Sync + 'static {
    fn reconcile(&self, key: &QualifiedName) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Runs a [`Reconcile`] for every admitted notification of its watch sources.
pub struct WatchController<R> {
    name: String,
    reconciler: R,
    sources: Vec<BoxStream<'static, QualifiedName>>,
    config: Config,
}

impl<R: Reconcile> WatchController<R> {
    pub fn new(name: String, reconciler: R, config: &Config) -> Self {
        Self {
            name,
            reconciler,
            sources: Vec::new(),
            config: config.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueues the key of every notification from `informer` admitted by `predicate`.
    pub fn watch<K: Record>(&mut self, informer: Informer<K>, predicate: SharedPredicate<K>) {
        let source = informer.filter_map(move |notification| {
            future::ready(
                predicate
                    .admit(&notification)
                    .then(|| notification.key()),
            )
        });
        self.sources.push(source.boxed());
    }

    /// Reconciles keys one at a time until `cancel` fires.
    ///
    /// A cancelled in-flight reconcile is dropped before it completes.
    /// Triggers for a key already awaiting a retry are coalesced into that retry.
    pub async fn run(self, cancel: CancellationToken) {
        let Self {
            name,
            reconciler,
            sources,
            config,
        } = self;

        let mut triggers = stream::select_all(sources);
        let mut retries = DelayQueue::new();
        let mut pending = HashMap::<QualifiedName, delay_queue::Key>::new();
        let mut attempts = HashMap::<QualifiedName, u32>::new();

        loop {
            let key = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(expired) = retries.next(), if !retries.is_empty() => {
                    let key = expired.into_inner();
                    pending.remove(&key);
                    key
                }
                Some(key) = triggers.next() => {
                    if pending.contains_key(&key) {
                        continue;
                    }
                    key
                }
            };

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = reconciler.reconcile(&key) => result,
            };

            match result {
                Ok(()) => {
                    attempts.remove(&key);
                }
                Err(err) => {
                    let attempt = attempts.entry(key.clone()).or_insert(0);
                    let delay = config.retry_delay(*attempt);
                    *attempt = attempt.saturating_add(1);
                    log::warn!("Controller {name} failed to reconcile {key}, retrying in {delay:?}: {err}");
                    match pending.get(&key) {
                        Some(queued) => retries.reset(queued, delay),
                        None => {
                            let queued = retries.insert(key.clone(), delay);
                            pending.insert(key, queued);
                        }
                    }
                }
            }
        }

        log::debug!("Controller {name} stopped");
    }
}
