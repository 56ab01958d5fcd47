//! Object store backed by a live cluster
//!
//! Kinds are resolved through API discovery, so any served kind (including
//! Capstan's own custom resources) can be read and written as a
//! `DynamicObject`.

use async_trait::async_trait;
use kube::{
    Client,
    api::{Api, DynamicObject, ListParams, PostParams},
    discovery::{ApiCapabilities, ApiResource, Discovery, Scope},
};

use super::{ObjectKey, ObjectStore, gvk_from_api_version};
use crate::error::{KubeError, Result};

/// Kubernetes object store
pub struct KubeObjectStore {
    client: Client,
    /// Cached discovery information
    discovery: Discovery,
}

impl KubeObjectStore {
    /// Connect with the default kubeconfig or in-cluster configuration
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Self::new(client).await
    }

    /// Create a store, running discovery once
    pub async fn new(client: Client) -> Result<Self> {
        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .map_err(KubeError::Api)?;

        Ok(Self { client, discovery })
    }

    fn resolve(&self, api_version: &str, kind: &str) -> Result<(ApiResource, ApiCapabilities)> {
        let gvk = gvk_from_api_version(api_version, kind);
        self.discovery
            .resolve_gvk(&gvk)
            .ok_or_else(|| KubeError::UnknownResource {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            })
    }

    /// Api client for a kind; namespaced kinds without a namespace span all namespaces
    fn api(&self, api_version: &str, kind: &str, namespace: Option<&str>) -> Result<Api<DynamicObject>> {
        let (ar, caps) = self.resolve(api_version, kind)?;
        let api = match namespace {
            Some(ns) if caps.scope == Scope::Namespaced => {
                Api::namespaced_with(self.client.clone(), ns, &ar)
            }
            _ => Api::all_with(self.client.clone(), &ar),
        };
        Ok(api)
    }

    fn api_for_key(&self, key: &ObjectKey) -> Result<Api<DynamicObject>> {
        let (ar, caps) = self.resolve(&key.api_version, &key.kind)?;
        if caps.scope == Scope::Namespaced {
            let ns = key.namespace.as_deref().unwrap_or("default");
            Ok(Api::namespaced_with(self.client.clone(), ns, &ar))
        } else {
            Ok(Api::all_with(self.client.clone(), &ar))
        }
    }
}

#[async_trait]
impl ObjectStore for KubeObjectStore {
    async fn read(&self, key: &ObjectKey) -> Result<Option<DynamicObject>> {
        let api = self.api_for_key(key)?;
        Ok(api.get_opt(&key.name).await?)
    }

    async fn list(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let api = self.api(api_version, kind, namespace)?;
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn create(&self, obj: &DynamicObject) -> Result<DynamicObject> {
        let key = ObjectKey::from_object(obj)?;
        let api = self.api_for_key(&key)?;
        api.create(&PostParams::default(), obj).await.map_err(|e| match e {
            kube::Error::Api(resp) if resp.code == 409 => KubeError::AlreadyExists {
                key: key.to_string(),
            },
            other => KubeError::Api(other),
        })
    }

    async fn update(&self, obj: &DynamicObject) -> Result<DynamicObject> {
        let key = ObjectKey::from_object(obj)?;
        let api = self.api_for_key(&key)?;
        api.replace(&key.name, &PostParams::default(), obj)
            .await
            .map_err(|e| match e {
                kube::Error::Api(resp) if resp.code == 404 => KubeError::ObjectNotFound {
                    key: key.to_string(),
                },
                other => KubeError::Api(other),
            })
    }

    async fn is_namespaced(&self, api_version: &str, kind: &str) -> Result<bool> {
        let (_, caps) = self.resolve(api_version, kind)?;
        Ok(caps.scope == Scope::Namespaced)
    }
}
