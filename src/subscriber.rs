//! Subscription identities, descriptors and the namespace subscriber registry.

use std::{fmt, str::FromStr};

use kube_core::Resource;

use crate::Error;

/// Uniquely identifies an object of a known type by namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    /// The object namespace, if any
    pub namespace: Option<String>,
    /// The object name
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_owned),
            name: name.into(),
        }
    }

    pub fn from_resource<K: Resource>(resource: &K) -> Self {
        Self {
            namespace: resource.meta().namespace.clone(),
            name: resource.meta().name.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Identifies one subscription request; the registry key.
///
/// The text form is `namespace/name`.
/// The empty identity `/` is the universal root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionIdentity {
    pub namespace: String,
    pub name: String,
}

impl SubscriptionIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Whether this is the universal root `/`, which selects no specific namespace.
    pub fn is_root(&self) -> bool {
        self.namespace.is_empty() && self.name.is_empty()
    }
}

impl fmt::Display for SubscriptionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for SubscriptionIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, name) = s
            .split_once('/')
            .ok_or_else(|| Error::InvalidIdentity(s.to_owned()))?;
        if name.contains('/') {
            return Err(Error::InvalidIdentity(s.to_owned()));
        }
        Ok(Self::new(namespace, name))
    }
}

/// Tags every directive a subscription issues,
/// so that its records can be cleaned up by host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerKey {
    host: SubscriptionIdentity,
    label: String,
}

impl OwnerKey {
    pub fn for_host(host: SubscriptionIdentity) -> Self {
        let label = format!("subscription-{host}");
        Self { host, label }
    }

    pub fn host(&self) -> &SubscriptionIdentity {
        &self.host
    }

    /// The owner label, `subscription-{namespace}/{name}`.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

pub mod item;
pub use item::{ChannelRef, SubscriptionItem, SubscriptionRef};

mod namespace;
pub use namespace::{NamespaceSubscriber, UnitStatus};

#[cfg(test)]
mod tests {
    use super::{OwnerKey, SubscriptionIdentity};

    #[test]
    fn parse_identity() {
        let root: SubscriptionIdentity = "/".parse().unwrap();
        assert!(root.is_root());

        let ns: SubscriptionIdentity = "ns1/".parse().unwrap();
        assert_eq!(ns, SubscriptionIdentity::new("ns1", ""));
        assert!(!ns.is_root());

        let full: SubscriptionIdentity = "ns1/sub".parse().unwrap();
        assert_eq!(full.to_string(), "ns1/sub");

        assert!("ns1".parse::<SubscriptionIdentity>().is_err());
        assert!("a/b/c".parse::<SubscriptionIdentity>().is_err());
    }

    #[test]
    fn owner_label_is_derived_from_identity() {
        let owner = OwnerKey::for_host(SubscriptionIdentity::new("team", "app"));
        assert_eq!(owner.label(), "subscription-team/app");
        assert_eq!(owner.host(), &SubscriptionIdentity::new("team", "app"));
    }
}
