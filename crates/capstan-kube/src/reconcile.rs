//! App reconciliation
//!
//! One pass drives an app through a fixed sequence of phases:
//!
//! ```text
//! Start -> CapabilityResolved -> ValuesResolved -> DependenciesMaterialized
//!       -> PrimaryMaterialized -> OutputsPublished -> Done
//! ```
//!
//! Any error moves the pass to `Failed` and is returned to the caller. Work
//! already written stays in place; the next pass converges it.

use capstan_core::{
    App, Capability, CapabilityDependency, CapSource, DependencyRef, ResolvedValueSet, Value,
    APP_KIND, CAPABILITY_KIND, CLUSTER_CAPABILITY_KIND, DEPENDENCY_KIND, GROUP_VERSION,
};
use capstan_engine::{Engine, Rendered};
use indexmap::IndexMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::chart::{ChartExecutor, ChartRelease};
use crate::error::{KubeError, Result};
use crate::outputs::{extract_outputs, publish_outputs};
use crate::ownership::{managed_labels, overlay, owner_reference, place_in_namespace, stamp};
use crate::store::{ObjectKey, ObjectStore, UpsertOutcome, object_from_json};

/// Phase of a reconcile pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePhase {
    Start,
    CapabilityResolved,
    ValuesResolved,
    DependenciesMaterialized,
    PrimaryMaterialized,
    OutputsPublished,
    Done,
    Failed,
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReconcilePhase::Start => "start",
            ReconcilePhase::CapabilityResolved => "capability-resolved",
            ReconcilePhase::ValuesResolved => "values-resolved",
            ReconcilePhase::DependenciesMaterialized => "dependencies-materialized",
            ReconcilePhase::PrimaryMaterialized => "primary-materialized",
            ReconcilePhase::OutputsPublished => "outputs-published",
            ReconcilePhase::Done => "done",
            ReconcilePhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Options for reconcile passes
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Limit for each store or chart call
    pub call_timeout: Option<Duration>,

    /// Also substitute placeholders inside sequences
    pub descend_into_sequences: bool,

    /// Extra value layers applied over fixed values, in order
    pub overrides: Vec<IndexMap<String, Value>>,

    /// Stamp management labels on everything written
    pub manage_labels: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            call_timeout: None,
            descend_into_sequences: false,
            overrides: Vec::new(),
            manage_labels: true,
        }
    }
}

/// Upsert result for one manifest object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectOutcome {
    pub key: ObjectKey,
    pub outcome: UpsertOutcome,
}

/// Result of one chart release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartOutcome {
    pub release: String,
    pub outcome: UpsertOutcome,
}

/// What a pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub app: String,
    pub phase: ReconcilePhase,
    pub objects: Vec<ObjectOutcome>,
    pub charts: Vec<ChartOutcome>,
    pub outputs: BTreeMap<String, String>,
    pub outputs_secret: Option<UpsertOutcome>,
}

impl ReconcileReport {
    fn new(app: &App) -> Self {
        Self {
            app: app.display_name(),
            phase: ReconcilePhase::Start,
            objects: Vec::new(),
            charts: Vec::new(),
            outputs: BTreeMap::new(),
            outputs_secret: None,
        }
    }

    /// Whether the pass wrote nothing
    pub fn is_unchanged(&self) -> bool {
        self.objects
            .iter()
            .map(|o| o.outcome)
            .chain(self.charts.iter().map(|c| c.outcome))
            .chain(self.outputs_secret)
            .all(|o| o == UpsertOutcome::Unchanged)
    }

    /// Count of writes per outcome
    pub fn summary(&self) -> String {
        let outcomes = self
            .objects
            .iter()
            .map(|o| o.outcome)
            .chain(self.charts.iter().map(|c| c.outcome));

        let (mut created, mut updated, mut unchanged) = (0, 0, 0);
        for outcome in outcomes {
            match outcome {
                UpsertOutcome::Created => created += 1,
                UpsertOutcome::Updated => updated += 1,
                UpsertOutcome::Unchanged => unchanged += 1,
            }
        }
        format!("{created} created, {updated} updated, {unchanged} unchanged")
    }

    fn advance(&mut self, phase: ReconcilePhase) {
        info!(app = %self.app, from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
    }
}

/// Reconciles apps against an object store
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    charts: Arc<dyn ChartExecutor>,
    engine: Engine,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ObjectStore>, charts: Arc<dyn ChartExecutor>) -> Self {
        Self {
            store,
            charts,
            engine: Engine::default(),
            options: ReconcileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.engine = Engine::builder()
            .descend_into_sequences(options.descend_into_sequences)
            .build();
        self.options = options;
        self
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Run a store or chart call under the configured timeout
    async fn call<T>(&self, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.options.call_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| KubeError::Timeout(format!("{limit:?} ({what})")))?,
            None => fut.await,
        }
    }

    /// Read an app from the store
    pub async fn fetch_app(&self, name: &str, namespace: &str) -> Result<App> {
        let key = ObjectKey::new(GROUP_VERSION, APP_KIND, Some(namespace), name);
        let obj = self.call("read app", self.store.get(&key)).await?;
        Ok(App::from_json(serde_json::to_value(&obj)?)?)
    }

    /// All apps, optionally in one namespace
    pub async fn list_apps(&self, namespace: Option<&str>) -> Result<Vec<App>> {
        let objects = self
            .call("list apps", self.store.list(GROUP_VERSION, APP_KIND, namespace))
            .await?;
        objects
            .iter()
            .map(|obj| -> Result<App> { Ok(App::from_json(serde_json::to_value(obj)?)?) })
            .collect()
    }

    /// Fetch and reconcile an app by name
    pub async fn reconcile_named(&self, name: &str, namespace: &str) -> Result<ReconcileReport> {
        let app = self.fetch_app(name, namespace).await?;
        self.reconcile(&app).await
    }

    /// Run one pass for an app
    pub async fn reconcile(&self, app: &App) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(app);
        info!(app = %report.app, "reconciling app");

        match self.run(app, &mut report).await {
            Ok(()) => {
                report.advance(ReconcilePhase::Done);
                Ok(report)
            }
            Err(e) => {
                warn!(
                    app = %report.app,
                    from = %report.phase,
                    to = %ReconcilePhase::Failed,
                    error = %e,
                    "reconcile failed"
                );
                Err(e)
            }
        }
    }

    async fn run(&self, app: &App, report: &mut ReconcileReport) -> Result<()> {
        let capability = self.fetch_capability(app).await?;
        capability.spec.source.check()?;
        report.advance(ReconcilePhase::CapabilityResolved);

        let values = capability.resolve(&app.spec.values, &self.options.overrides)?;
        debug!(app = %report.app, values = ?values.display_entries(), "resolved values");

        let mut dependencies = Vec::with_capacity(capability.spec.dependencies.len());
        for dep_ref in &capability.spec.dependencies {
            let dependency = self.fetch_dependency(dep_ref, &capability, app).await?;
            dependency.spec.source.check()?;
            let dep_values = dependency.resolve(&self.options.overrides)?;
            dependencies.push((dependency, dep_values));
        }
        report.advance(ReconcilePhase::ValuesResolved);

        let owner = owner_reference(app);
        if owner.is_none() {
            debug!(app = %report.app, "app has no uid, objects will not carry an owner reference");
        }

        for (dependency, dep_values) in &dependencies {
            let release_name = format!("{}-{}", app.name(), dependency.name());
            self.materialize(app, &release_name, &dependency.spec.source, dep_values, owner.as_ref(), report)
                .await?;
        }
        report.advance(ReconcilePhase::DependenciesMaterialized);

        self.materialize(app, app.name(), &capability.spec.source, &values, owner.as_ref(), report)
            .await?;
        report.advance(ReconcilePhase::PrimaryMaterialized);

        let outputs = self
            .call(
                "extract outputs",
                extract_outputs(&capability.spec.outputs, app.namespace(), self.store.as_ref()),
            )
            .await?;
        let published = self
            .call(
                "publish outputs",
                publish_outputs(app, &outputs, self.store.as_ref()),
            )
            .await?;
        report.outputs = outputs;
        report.outputs_secret = Some(published);
        report.advance(ReconcilePhase::OutputsPublished);

        Ok(())
    }

    /// Namespaced `Capability` when the reference has a namespace, `ClusterCapability` otherwise
    async fn fetch_capability(&self, app: &App) -> Result<Capability> {
        let cap_ref = &app.spec.cap_ref;
        let key = if cap_ref.is_cluster_scoped() {
            ObjectKey::new(GROUP_VERSION, CLUSTER_CAPABILITY_KIND, None, &cap_ref.name)
        } else {
            ObjectKey::new(
                GROUP_VERSION,
                CAPABILITY_KIND,
                cap_ref.namespace.as_deref(),
                &cap_ref.name,
            )
        };

        let obj = self.call("read capability", self.store.get(&key)).await?;
        Ok(Capability::from_json(serde_json::to_value(&obj)?)?)
    }

    /// A dependency lives in its own namespace, else the capability's, else the app's
    async fn fetch_dependency(
        &self,
        dep_ref: &DependencyRef,
        capability: &Capability,
        app: &App,
    ) -> Result<CapabilityDependency> {
        let namespace = dep_ref
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .or(capability.namespace())
            .or(app.namespace());
        let key = ObjectKey::new(GROUP_VERSION, DEPENDENCY_KIND, namespace, &dep_ref.name);

        let obj = self.call("read dependency", self.store.get(&key)).await?;
        Ok(CapabilityDependency::from_json(serde_json::to_value(&obj)?)?)
    }

    async fn materialize(
        &self,
        app: &App,
        release_name: &str,
        source: &CapSource,
        values: &ResolvedValueSet,
        owner: Option<&OwnerReference>,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        let labels = if self.options.manage_labels {
            managed_labels(app.name())
        } else {
            BTreeMap::new()
        };

        match self.engine.materialize(source, values)? {
            Rendered::Manifests(manifests) => {
                for manifest in manifests {
                    let mut obj = object_from_json(manifest)?;
                    let key = ObjectKey::from_object(&obj)?;
                    if key.namespace.is_none()
                        && self
                            .call("resolve scope", self.store.is_namespaced(&key.api_version, &key.kind))
                            .await?
                    {
                        place_in_namespace(&mut obj, app.namespace());
                    }
                    stamp(&mut obj, &labels, owner, app.namespace());

                    let key = ObjectKey::from_object(&obj)?;
                    let outcome = self
                        .call(
                            "upsert object",
                            self.store
                                .upsert(&obj, &|live: &mut DynamicObject| overlay(live, &obj)),
                        )
                        .await?;
                    debug!(
                        app = %report.app,
                        kind = %key.kind,
                        name = %key.name,
                        namespace = key.namespace.as_deref().unwrap_or(""),
                        %outcome,
                        "upserted object"
                    );
                    report.objects.push(ObjectOutcome { key, outcome });
                }
            }
            Rendered::Chart { repo, values } => {
                let release = ChartRelease {
                    name: release_name.to_string(),
                    namespace: app.namespace().map(str::to_string),
                    repo,
                    values,
                    labels,
                    owner: owner.cloned(),
                };
                let outcome = self
                    .call("execute chart release", self.charts.execute(&release))
                    .await?;
                debug!(
                    app = %report.app,
                    release = %release.display_name(),
                    chart = %release.repo.uri,
                    %outcome,
                    "executed chart release"
                );
                report.charts.push(ChartOutcome {
                    release: release.display_name(),
                    outcome,
                });
            }
        }

        Ok(())
    }
}
