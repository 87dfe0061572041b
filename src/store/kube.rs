use std::marker::PhantomData;

use futures::{StreamExt, TryStreamExt};
use k8s_openapi::NamespaceResourceScope;
use kube_client::{Api, Client};
use kube_core::Resource;
use kube_runtime::{watcher, WatchStreamExt};
use serde::de::DeserializeOwned;

use super::{Record, RecordClient, RemoteStore, WatchStream};
use crate::{BoxError, QualifiedName};

/// A [`RemoteStore`] backed by a Kubernetes apiserver.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    watcher_config: watcher::Config,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            watcher_config: watcher::Config::default(),
        }
    }

    /// Sets the list-watch parameters, e.g. label selectors, for every scoped watch.
    pub fn with_watcher_config(mut self, watcher_config: watcher::Config) -> Self {
        self.watcher_config = watcher_config;
        self
    }

    fn api<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        match namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }
}

impl<K> RemoteStore<K> for KubeStore
where
    K: Record + Resource<Scope = NamespaceResourceScope> + DeserializeOwned,
{
    type Client = KubeClient<K>;

    fn watch(&self, namespace: Option<&str>) -> Result<WatchStream<K>, BoxError> {
        let stream = watcher(self.api::<K>(namespace), self.watcher_config.clone())
            .default_backoff()
            .map_err(|err| Box::new(err) as BoxError);
        Ok(stream.boxed())
    }

    fn client(&self, _namespace: Option<&str>) -> Result<Self::Client, BoxError> {
        Ok(KubeClient {
            client: self.client.clone(),
            _ph: PhantomData,
        })
    }
}

/// Re-fetches records of type `K` from the apiserver.
pub struct KubeClient<K> {
    client: Client,
    _ph: PhantomData<fn() -> K>,
}

impl<K> RecordClient<K> for KubeClient<K>
where
    K: Record + Resource<Scope = NamespaceResourceScope> + DeserializeOwned,
{
    async fn get(&self, key: &QualifiedName) -> Result<Option<K>, BoxError> {
        let api = match &key.namespace {
            Some(namespace) => Api::<K>::namespaced(self.client.clone(), namespace),
            None => Api::<K>::all(self.client.clone()),
        };
        Ok(api.get_opt(&key.name).await?)
    }
}
