//! Capstan Core - Core types for reusable deployment capabilities
//!
//! This crate provides the foundational types used throughout Capstan:
//! - `Capability`: typed inputs, fixed values, source and outputs
//! - `App`: an instance of a capability with caller values
//! - `Value`: dynamically typed values as a tagged variant
//! - `resolve`: layered value resolution with type checks
//! - `admission`: allow/deny validation of apps

pub mod admission;
pub mod app;
pub mod capability;
pub mod error;
pub mod resolve;
pub mod resource;
pub mod value;

pub use admission::{AdmissionVerdict, validate_app};
pub use app::{App, AppSpec, AppValue, CapReference, APP_KIND};
pub use capability::{
    CapSource, CapSpec, CapValue, Capability, CapabilityDependency, DependencyRef,
    DependencySpec, InputSpec, InputType, Materialization, ObjectRef, OutputSpec, RepoSpec,
    SourceKind, CAPABILITY_KIND, CLUSTER_CAPABILITY_KIND, DEPENDENCY_KIND,
};
pub use error::{CoreError, Result};
pub use resolve::{ResolvedValue, ResolvedValueSet, resolve_values, REDACTED};
pub use resource::{Resource, ResourceMeta, API_GROUP, API_VERSION, GROUP_VERSION};
pub use value::{Value, parse_overrides};
