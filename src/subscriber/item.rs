use std::{
    collections::{hash_map::DefaultHasher, BTreeMap},
    hash::{Hash, Hasher},
};

use super::SubscriptionIdentity;

/// The subscription a [`SubscriptionItem`] belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SubscriptionRef {
    pub namespace: String,
    pub name: String,
    /// Incremented by the caller whenever the subscription spec changes.
    pub generation: i64,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// The channel a subscription reads from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ChannelRef {
    pub namespace: String,
    pub name: String,
    /// For namespace channels, the remote namespace holding the records.
    pub path_name: String,
}

/// Caller-supplied descriptor of one subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SubscriptionItem {
    pub subscription: SubscriptionRef,
    pub channel: ChannelRef,
}

impl SubscriptionItem {
    /// The implicit item watching a whole cluster namespace.
    pub fn cluster_default(namespace: impl Into<String>) -> Self {
        Self {
            subscription: SubscriptionRef::default(),
            channel: ChannelRef {
                path_name: namespace.into(),
                ..ChannelRef::default()
            },
        }
    }

    pub fn identity(&self) -> SubscriptionIdentity {
        SubscriptionIdentity::new(&self.subscription.namespace, &self.subscription.name)
    }

    /// The remote namespace to watch, or `None` for all namespaces.
    pub fn target_namespace(&self) -> Option<&str> {
        [&self.channel.path_name, &self.channel.namespace]
            .into_iter()
            .find(|namespace| !namespace.is_empty())
            .map(String::as_str)
    }

    /// A content hash of the whole descriptor.
    ///
    /// Equal descriptors always share a fingerprint;
    /// the registry compares fingerprints instead of whole descriptors.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelRef, SubscriptionItem};

    #[test]
    fn target_namespace_prefers_path_name() {
        let mut item = SubscriptionItem {
            channel: ChannelRef {
                namespace: "channel-ns".into(),
                name: "ch".into(),
                path_name: "hub-ns".into(),
            },
            ..SubscriptionItem::default()
        };
        assert_eq!(item.target_namespace(), Some("hub-ns"));

        item.channel.path_name.clear();
        assert_eq!(item.target_namespace(), Some("channel-ns"));

        item.channel.namespace.clear();
        assert_eq!(item.target_namespace(), None);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let mut item = SubscriptionItem::cluster_default("ns1");
        let copy = item.clone();
        assert_eq!(item.fingerprint(), copy.fingerprint());

        item.subscription
            .labels
            .insert("app".into(), "frontend".into());
        assert_ne!(item.fingerprint(), copy.fingerprint());
    }
}
