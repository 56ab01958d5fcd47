//! Chart releases
//!
//! Chart-sourced capabilities are not rendered locally. Instead a release
//! request (chart location plus expanded values) is handed to a chart
//! executor. The default executor writes a `helm.fluxcd.io/v1 HelmRelease`
//! object and leaves installation to the Helm operator.

use async_trait::async_trait;
use capstan_core::RepoSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::ownership::{overlay, set_owner_reference};
use crate::store::{EventJournal, ObjectStore, UpsertOutcome, object_from_json};

pub const HELM_RELEASE_API_VERSION: &str = "helm.fluxcd.io/v1";
pub const HELM_RELEASE_KIND: &str = "HelmRelease";

/// A request to install or upgrade a chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRelease {
    /// Release name
    pub name: String,
    pub namespace: Option<String>,
    pub repo: RepoSpec,
    /// Nested chart values
    pub values: JsonValue,
    pub labels: BTreeMap<String, String>,
    pub owner: Option<OwnerReference>,
}

impl ChartRelease {
    pub fn display_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

/// Executes chart releases
#[async_trait]
pub trait ChartExecutor: Send + Sync {
    async fn execute(&self, release: &ChartRelease) -> Result<UpsertOutcome>;
}

/// Writes a Helm operator `HelmRelease` through an object store
pub struct HelmReleaseExecutor {
    store: Arc<dyn ObjectStore>,
}

impl HelmReleaseExecutor {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The `HelmRelease` object for a release
    pub fn helm_release(release: &ChartRelease) -> Result<DynamicObject> {
        let mut obj = object_from_json(json!({
            "apiVersion": HELM_RELEASE_API_VERSION,
            "kind": HELM_RELEASE_KIND,
            "metadata": {
                "name": release.name,
                "namespace": release.namespace,
                "labels": release.labels,
            },
            "spec": {
                "releaseName": release.name,
                "chart": {
                    "git": release.repo.uri,
                    "ref": release.repo.git_ref,
                    "path": release.repo.path,
                },
                "values": release.values,
            },
        }))?;

        if let Some(owner) = &release.owner {
            set_owner_reference(&mut obj, owner);
        }
        Ok(obj)
    }
}

#[async_trait]
impl ChartExecutor for HelmReleaseExecutor {
    async fn execute(&self, release: &ChartRelease) -> Result<UpsertOutcome> {
        let desired = Self::helm_release(release)?;
        self.store
            .upsert(&desired, &|live: &mut DynamicObject| overlay(live, &desired))
            .await
    }
}

/// Records releases instead of executing them
#[derive(Clone, Default)]
pub struct RecordingChartExecutor {
    releases: Arc<RwLock<Vec<ChartRelease>>>,
    journal: EventJournal,
}

impl RecordingChartExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record executions into a shared journal
    pub fn with_journal(mut self, journal: EventJournal) -> Self {
        self.journal = journal;
        self
    }

    /// All executed releases, in order
    pub fn releases(&self) -> Vec<ChartRelease> {
        self.releases.read().unwrap().clone()
    }
}

#[async_trait]
impl ChartExecutor for RecordingChartExecutor {
    async fn execute(&self, release: &ChartRelease) -> Result<UpsertOutcome> {
        let mut releases = self.releases.write().unwrap();
        let previous = releases
            .iter()
            .rev()
            .find(|r| r.name == release.name && r.namespace == release.namespace);

        let outcome = match previous {
            None => UpsertOutcome::Created,
            Some(prev) if prev == release => UpsertOutcome::Unchanged,
            Some(_) => UpsertOutcome::Updated,
        };

        self.journal
            .record(format!("chart {}", release.display_name()));
        releases.push(release.clone());
        Ok(outcome)
    }
}
