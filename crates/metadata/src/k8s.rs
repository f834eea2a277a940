//! Kubernetes ReplicaSet watch source.
//!
//! [`KubeReplicaSetSource`] wraps `kube::runtime::watcher` and translates its
//! apply/delete/relist events into typed notifications through
//! [`ReplicaSetTracker`]. Reconnects use the watcher's default backoff.

use std::collections::{HashMap, HashSet};

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use k8s_openapi::api::apps::v1::ReplicaSet;
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client};
use tracing::{debug, info};

use crate::error::MetadataError;
use crate::types::{OwnerReference, ReplicaSetObject, WatchEvent, WatchNotification};
use crate::watch::WatchSource;

/// Watches `apps/v1` ReplicaSets in one namespace or cluster-wide.
pub struct KubeReplicaSetSource {
    api: Api<ReplicaSet>,
    config: watcher::Config,
}

impl KubeReplicaSetSource {
    /// Connects with the in-cluster or kubeconfig client.
    ///
    /// An empty `namespace` watches all namespaces; an empty
    /// `label_selector` selects everything.
    pub async fn try_default(namespace: &str, label_selector: &str) -> Result<Self, MetadataError> {
        let client = Client::try_default()
            .await
            .map_err(|e| MetadataError::Client(e.to_string()))?;
        Ok(Self::new(client, namespace, label_selector))
    }

    /// Builds a source from an existing client.
    pub fn new(client: Client, namespace: &str, label_selector: &str) -> Self {
        let api = if namespace.is_empty() {
            Api::all(client)
        } else {
            Api::namespaced(client, namespace)
        };

        let mut config = watcher::Config::default();
        if !label_selector.is_empty() {
            config = config.labels(label_selector);
        }

        info!(
            namespace = if namespace.is_empty() { "*" } else { namespace },
            label_selector,
            "watching replicasets"
        );
        Self { api, config }
    }
}

impl WatchSource for KubeReplicaSetSource {
    fn watch(self) -> BoxStream<'static, Result<WatchNotification, MetadataError>> {
        let mut tracker = ReplicaSetTracker::default();
        watcher(self.api, self.config)
            .default_backoff()
            .map(move |event| match event {
                Ok(event) => tracker.track(event),
                Err(e) => vec![Err(MetadataError::Watch(e.to_string()))],
            })
            .flat_map(stream::iter)
            .boxed()
    }
}

/// Turns raw watcher events into typed add/update/delete notifications.
///
/// Remembers the last seen state of every object so an apply can be told
/// apart from an add, and so objects that vanished while the watch was
/// disconnected are deleted when the relist completes.
#[derive(Debug, Default)]
pub struct ReplicaSetTracker {
    known: HashMap<String, ReplicaSetObject>,
    relisted: Option<HashSet<String>>,
}

impl ReplicaSetTracker {
    /// Translates one watcher event.
    pub fn track(
        &mut self,
        event: watcher::Event<ReplicaSet>,
    ) -> Vec<Result<WatchNotification, MetadataError>> {
        match event {
            watcher::Event::Init => {
                debug!("replicaset relist started");
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(rs) => match decode(&rs) {
                Ok(object) => {
                    if let Some(seen) = self.relisted.as_mut() {
                        seen.insert(object.key());
                    }
                    vec![Ok(self.applied(object))]
                }
                Err(e) => vec![Err(e)],
            },
            watcher::Event::InitDone => {
                let seen = self.relisted.take().unwrap_or_default();
                let stale: Vec<String> = self
                    .known
                    .keys()
                    .filter(|key| !seen.contains(*key))
                    .cloned()
                    .collect();

                let mut out = Vec::with_capacity(stale.len() + 1);
                for key in stale {
                    if let Some(object) = self.known.remove(&key) {
                        out.push(Ok(WatchNotification::Event(WatchEvent::Deleted(object))));
                    }
                }
                debug!(objects = self.known.len(), "replicaset relist done");
                out.push(Ok(WatchNotification::Synced));
                out
            }
            watcher::Event::Apply(rs) => match decode(&rs) {
                Ok(object) => vec![Ok(self.applied(object))],
                Err(e) => vec![Err(e)],
            },
            watcher::Event::Delete(rs) => match decode(&rs) {
                Ok(object) => {
                    let object = self.known.remove(&object.key()).unwrap_or(object);
                    vec![Ok(WatchNotification::Event(WatchEvent::Deleted(object)))]
                }
                Err(e) => vec![Err(e)],
            },
        }
    }

    fn applied(&mut self, object: ReplicaSetObject) -> WatchNotification {
        let event = match self.known.insert(object.key(), object.clone()) {
            Some(old) => WatchEvent::Updated { old, new: object },
            None => WatchEvent::Added(object),
        };
        WatchNotification::Event(event)
    }
}

/// Decodes the fields the cache needs.
fn decode(rs: &ReplicaSet) -> Result<ReplicaSetObject, MetadataError> {
    let meta = &rs.metadata;
    let name = meta
        .name
        .clone()
        .ok_or_else(|| MetadataError::MalformedObject("replicaset without name".to_owned()))?;
    let namespace = meta.namespace.clone().ok_or_else(|| {
        MetadataError::MalformedObject(format!("replicaset '{name}' without namespace"))
    })?;

    let owner = meta
        .owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|r| r.controller == Some(true))
        .map(|r| OwnerReference {
            name: r.name.clone(),
            kind: r.kind.clone(),
            api_version: r.api_version.clone(),
        });

    Ok(ReplicaSetObject {
        namespace,
        name,
        resource_version: meta.resource_version.clone().unwrap_or_default(),
        owner,
        labels: meta.labels.clone().unwrap_or_default(),
    })
}
