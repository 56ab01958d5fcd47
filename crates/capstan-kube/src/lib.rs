//! Capstan Kube - Kubernetes integration for Capstan
//!
//! This crate provides:
//! - **Object Stores**: read and write objects in a cluster (or in memory for tests)
//! - **Chart Releases**: hand chart-sourced capabilities to the Helm operator
//! - **Outputs**: read values back from live objects and publish them as a Secret
//! - **Reconciliation**: drive an app from capability lookup to published outputs

pub mod chart;
pub mod error;
pub mod outputs;
pub mod ownership;
pub mod reconcile;
pub mod store;

pub use chart::{ChartExecutor, ChartRelease, HelmReleaseExecutor, RecordingChartExecutor};
pub use error::{KubeError, Result};
pub use outputs::{decode_outputs, extract_outputs, lookup_field, publish_outputs};
pub use ownership::{managed_labels, owner_reference, place_in_namespace, stamp};
pub use reconcile::{
    ChartOutcome, ObjectOutcome, ReconcileOptions, ReconcilePhase, ReconcileReport, Reconciler,
};
pub use store::{
    CLUSTER_SCOPED_KINDS, EventJournal, KubeObjectStore, MockObjectStore, ObjectKey, ObjectStore, OperationCounts,
    UpsertOutcome, gvk_from_api_version, is_cluster_scoped_kind, object_from_json,
};
