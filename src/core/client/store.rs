use std::fmt::Debug;
use std::sync::Arc;

use anyhow::anyhow;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::AppError;

/// Future resolving once an informer cache has done its first full list.
pub type CacheSync = BoxFuture<'static, anyhow::Result<()>>;

/// A reflector-backed cache of one resource kind plus a change signal.
///
/// The signal is a generation counter bumped on every watch event. Receivers
/// only see the latest value, so a burst of events coalesces into one wakeup.
pub struct Informer<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    reader: Store<K>,
    events: watch::Receiver<u64>,
}

impl<K> Informer<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    /// Start a watcher + reflector pair in the background.
    pub fn spawn(api: Api<K>, config: watcher::Config, cancel: CancellationToken) -> Self {
        let (reader, writer) = reflector::store();
        let (tx, events) = watch::channel(0u64);
        let kind = K::kind(&()).to_string();

        tokio::spawn(async move {
            info!(kind = %kind, "Starting reflector");

            let mut stream = reflector::reflector(writer, watcher(api, config).default_backoff()).boxed();

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = stream.next() => match next {
                        Some(Ok(_)) => tx.send_modify(|generation| *generation += 1),
                        Some(Err(e)) => warn!(kind = %kind, error = %e, "watch error; retrying with backoff"),
                        None => break,
                    },
                }
            }

            debug!(kind = %kind, "Reflector stopped");
        });

        Self { reader, events }
    }
}

impl<K> Informer<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    /// Read handle on the cache (no API call).
    pub fn store(&self) -> Store<K> {
        self.reader.clone()
    }

    /// New receiver for the change signal.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.events.clone()
    }

    pub fn synced(&self) -> CacheSync {
        let reader = self.reader.clone();
        let kind = K::kind(&()).to_string();
        async move {
            reader
                .wait_until_ready()
                .await
                .map_err(|_| anyhow!("{kind} reflector stopped before its first list completed"))
        }
        .boxed()
    }
}

/// Cache read for a named object.
///
/// A miss is a [`AppError::TransientLookupError`]: either the object does not
/// exist or the cache has not caught up yet, and callers cannot tell which.
pub fn lookup<K>(store: &Store<K>, namespace: Option<&str>, name: &str) -> Result<Arc<K>, AppError>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    let mut object_ref = ObjectRef::<K>::new(name);
    if let Some(ns) = namespace {
        object_ref = object_ref.within(ns);
    }

    store.get(&object_ref).ok_or_else(|| {
        AppError::TransientLookupError(format!(
            "{} {}{} not in cache",
            K::kind(&()),
            namespace.map(|ns| format!("{ns}/")).unwrap_or_default(),
            name
        ))
    })
}
