use std::{
    collections::HashSet,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::{channel::mpsc, Stream, StreamExt};
use kube_runtime::{
    reflector::{self, store::Writer, ObjectRef},
    watcher,
};
use tokio_util::sync::CancellationToken;

use super::{Record, WatchStream};
use crate::QualifiedName;

/// A change observed by a [`ScopedCache`].
#[derive(Debug)]
pub enum Notification<K> {
    Created(Arc<K>),
    Updated { old: Arc<K>, new: Arc<K> },
    Deleted(Arc<K>),
}

impl<K> Clone for Notification<K> {
    fn clone(&self) -> Self {
        match self {
            Self::Created(obj) => Self::Created(Arc::clone(obj)),
            Self::Updated { old, new } => Self::Updated {
                old: Arc::clone(old),
                new: Arc::clone(new),
            },
            Self::Deleted(obj) => Self::Deleted(Arc::clone(obj)),
        }
    }
}

impl<K: Record> Notification<K> {
    /// The latest known state of the object.
    pub fn object(&self) -> &K {
        match self {
            Self::Created(obj) | Self::Deleted(obj) => obj,
            Self::Updated { new, .. } => new,
        }
    }

    pub fn key(&self) -> QualifiedName {
        QualifiedName::from_resource(self.object())
    }
}

/// Receives the notifications of one [`ScopedCache`].
pub struct Informer<K> {
    notifications: mpsc::UnboundedReceiver<Notification<K>>,
}

impl<K> Stream for Informer<K> {
    type Item = Notification<K>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.notifications.poll_next_unpin(cx)
    }
}

/// A reflector over one scoped watch that fans changes out to informers.
pub struct ScopedCache<K: Record> {
    source: WatchStream<K>,
    writer: Writer<K>,
    informers: Vec<mpsc::UnboundedSender<Notification<K>>>,
}

impl<K: Record> ScopedCache<K> {
    pub fn new(source: WatchStream<K>) -> Self {
        Self {
            source,
            writer: Writer::new(()),
            informers: Vec::new(),
        }
    }

    /// A read handle to the cached objects.
    pub fn reader(&self) -> reflector::Store<K> {
        self.writer.as_reader()
    }

    /// Subscribes to the changes this cache observes once it runs.
    pub fn informer(&mut self) -> Informer<K> {
        let (tx, rx) = mpsc::unbounded();
        self.informers.push(tx);
        Informer { notifications: rx }
    }

    /// Fills the cache until the watch ends or `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = self.source.next() => event,
            };

            match event {
                Some(Ok(event)) => {
                    let notifications = self.classify(&event);
                    self.writer.apply_watcher_event(&event);
                    for notification in notifications {
                        self.informers
                            .retain(|tx| tx.unbounded_send(notification.clone()).is_ok());
                    }
                }
                Some(Err(err)) => log::warn!("Watch stream error: {err}"),
                None => {
                    log::debug!("Watch stream ended");
                    break;
                }
            }
        }
    }

    fn classify(&self, event: &watcher::Event<K>) -> Vec<Notification<K>> {
        let store = self.writer.as_reader();
        let touched = |obj: &K| {
            let new = Arc::new(obj.clone());
            match store.get(&ObjectRef::from_obj(obj)) {
                Some(old) => Notification::Updated { old, new },
                None => Notification::Created(new),
            }
        };

        match event {
            watcher::Event::Applied(obj) => vec![touched(obj)],
            watcher::Event::Deleted(obj) => vec![Notification::Deleted(Arc::new(obj.clone()))],
            watcher::Event::Restarted(objs) => {
                let listed: HashSet<_> = objs.iter().map(ObjectRef::from_obj).collect();
                let mut notifications: Vec<_> = objs.iter().map(touched).collect();
                notifications.extend(
                    store
                        .state()
                        .into_iter()
                        .filter(|old| !listed.contains(&ObjectRef::from_obj(old.as_ref())))
                        .map(Notification::Deleted),
                );
                notifications
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use futures::{channel::mpsc, StreamExt};
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube_runtime::watcher;
    use tokio_util::sync::CancellationToken;

    use super::{Notification, ScopedCache};
    use crate::{BoxError, QualifiedName};

    fn config_map(name: &str, value: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                namespace: Some("hub".into()),
                name: Some(name.into()),
                ..ObjectMeta::default()
            },
            data: Some(BTreeMap::from([("value".to_owned(), value.to_owned())])),
            ..ConfigMap::default()
        }
    }

    #[tokio::test]
    async fn classifies_watch_events() {
        let (tx, rx) = mpsc::unbounded::<Result<watcher::Event<ConfigMap>, BoxError>>();
        let mut cache = ScopedCache::new(rx.boxed());
        let mut informer = cache.informer();
        let reader = cache.reader();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(cache.run(cancel.clone()));

        tx.unbounded_send(Ok(watcher::Event::Applied(config_map("a", "1"))))
            .unwrap();
        assert!(matches!(
            informer.next().await,
            Some(Notification::Created(obj)) if obj.metadata.name.as_deref() == Some("a")
        ));

        tx.unbounded_send(Ok(watcher::Event::Applied(config_map("a", "2"))))
            .unwrap();
        match informer.next().await {
            Some(Notification::Updated { old, new }) => {
                assert_eq!(old.data.as_ref().unwrap()["value"], "1");
                assert_eq!(new.data.as_ref().unwrap()["value"], "2");
            }
            other => panic!("expected update, got {other:?}"),
        }

        tx.unbounded_send(Ok(watcher::Event::Restarted(vec![config_map("b", "1")])))
            .unwrap();
        let created = informer.next().await.unwrap();
        assert!(matches!(created, Notification::Created(_)));
        assert_eq!(created.key(), QualifiedName::new(Some("hub"), "b"));
        let deleted = informer.next().await.unwrap();
        assert!(matches!(deleted, Notification::Deleted(_)));
        assert_eq!(deleted.key(), QualifiedName::new(Some("hub"), "a"));

        tx.unbounded_send(Err("transient".into())).unwrap();
        tx.unbounded_send(Ok(watcher::Event::Deleted(config_map("b", "1"))))
            .unwrap();
        assert!(matches!(
            informer.next().await,
            Some(Notification::Deleted(_))
        ));
        assert!(reader.state().is_empty());

        cancel.cancel();
        task.await.unwrap();
        assert!(informer.next().await.is_none());
    }
}
