//! Cache-backed read accessors handed to the controllers.

use kube::runtime::reflector::Store;

use crate::core::client::kube_resources::{ClusterCSIDriver, ConfigMap, Proxy, StorageClass};
use crate::core::client::store::lookup;

pub trait ConfigMapReader: Send + Sync {
    fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap>;
}

pub trait OperatorSource: Send + Sync {
    /// The operator's own custom resource, if it is cached.
    fn operator(&self) -> Option<ClusterCSIDriver>;
}

pub trait ProxySource: Send + Sync {
    fn proxy(&self) -> Option<Proxy>;
}

pub trait StorageClassReader: Send + Sync {
    fn storage_classes(&self) -> Vec<StorageClass>;
}

pub struct CachedConfigMaps {
    store: Store<ConfigMap>,
}

impl CachedConfigMaps {
    pub fn new(store: Store<ConfigMap>) -> Self {
        Self { store }
    }
}

impl ConfigMapReader for CachedConfigMaps {
    fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        lookup(&self.store, Some(namespace), name)
            .ok()
            .map(|cm| (*cm).clone())
    }
}

pub struct CachedOperator {
    store: Store<ClusterCSIDriver>,
    name: String,
}

impl CachedOperator {
    pub fn new(store: Store<ClusterCSIDriver>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }
}

impl OperatorSource for CachedOperator {
    fn operator(&self) -> Option<ClusterCSIDriver> {
        lookup(&self.store, None, &self.name)
            .ok()
            .map(|cr| (*cr).clone())
    }
}

pub struct CachedProxy {
    store: Store<Proxy>,
    name: String,
}

impl CachedProxy {
    pub fn new(store: Store<Proxy>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }
}

impl ProxySource for CachedProxy {
    fn proxy(&self) -> Option<Proxy> {
        lookup(&self.store, None, &self.name)
            .ok()
            .map(|proxy| (*proxy).clone())
    }
}

pub struct CachedStorageClasses {
    store: Store<StorageClass>,
}

impl CachedStorageClasses {
    pub fn new(store: Store<StorageClass>) -> Self {
        Self { store }
    }
}

impl StorageClassReader for CachedStorageClasses {
    fn storage_classes(&self) -> Vec<StorageClass> {
        self.store.state().iter().map(|sc| (**sc).clone()).collect()
    }
}
