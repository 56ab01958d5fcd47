//! Render command - materialize an app locally without a cluster

use capstan_core::{App, CapSource, ResolvedValueSet};
use capstan_engine::{Engine, Rendered};
use capstan_kube::{
    ChartRelease, HelmReleaseExecutor, is_cluster_scoped_kind, managed_labels, object_from_json,
    owner_reference, place_in_namespace, stamp,
};
use console::style;
use std::fs;
use std::path::{Path, PathBuf};

use super::{load_app, load_capability, load_dependency, override_layers};
use crate::error::{CliError, Result};

/// Options for the render command
pub struct RenderArgs<'a> {
    pub capability: &'a Path,
    pub app: &'a Path,
    pub dependencies: &'a [PathBuf],
    pub set_values: &'a [String],
    pub output_dir: Option<&'a Path>,
    pub show_values: bool,
    pub descend_into_sequences: bool,
    pub debug: bool,
}

/// A rendered object and where it came from
struct Document {
    source: String,
    body: serde_json::Value,
}

pub fn run(args: RenderArgs<'_>) -> Result<()> {
    let capability = load_capability(args.capability)?;
    let app = load_app(args.app)?;

    if app.spec.cap_ref.name != capability.name() {
        tracing::warn!(
            app = %app.display_name(),
            cap_ref = %app.spec.cap_ref.name,
            capability = %capability.name(),
            "app references a different capability than the one given"
        );
    }

    let overrides = override_layers(args.set_values)?;
    let values = capability.resolve(&app.spec.values, &overrides)?;

    if args.debug {
        eprintln!(
            "{} Resolved {} value(s) for {}",
            style("DEBUG").dim(),
            values.len(),
            app.display_name()
        );
    }

    let dependencies = args
        .dependencies
        .iter()
        .map(|path| load_dependency(path))
        .collect::<Result<Vec<_>>>()?;

    let engine = Engine::builder()
        .descend_into_sequences(args.descend_into_sequences)
        .build();

    let mut documents = Vec::new();

    for dep_ref in &capability.spec.dependencies {
        let dependency = dependencies
            .iter()
            .find(|d| d.name() == dep_ref.name)
            .ok_or_else(|| {
                CliError::resource_with_help(
                    format!("dependency '{}' is not provided", dep_ref.name),
                    "pass its CapabilityDependency file with --dependency",
                )
            })?;

        let dep_values = dependency.resolve(&overrides)?;
        let release_name = format!("{}-{}", app.name(), dependency.name());
        render_source(
            &engine,
            &app,
            &format!("dependency {}", dependency.name()),
            &release_name,
            &dependency.spec.source,
            &dep_values,
            &mut documents,
        )?;
    }

    render_source(
        &engine,
        &app,
        &format!("capability {}", capability.name()),
        app.name(),
        &capability.spec.source,
        &values,
        &mut documents,
    )?;

    if args.show_values {
        println!("{}", style("# Resolved Values").cyan().bold());
        println!("---");
        let yaml = serde_yaml::to_string(&values.display_entries())
            .map_err(|e| CliError::internal(format!("failed to serialize values: {e}")))?;
        println!("{}", yaml.trim_end());
        println!();
    }

    match args.output_dir {
        Some(dir) => write_documents(dir, &documents),
        None => {
            for doc in &documents {
                println!("---");
                println!("{}", style(format!("# Source: {}", doc.source)).dim());
                println!("{}", to_yaml(&doc.body)?.trim_end());
            }
            Ok(())
        }
    }
}

/// Materialize one source into documents
fn render_source(
    engine: &Engine,
    app: &App,
    source_label: &str,
    release_name: &str,
    source: &CapSource,
    values: &ResolvedValueSet,
    documents: &mut Vec<Document>,
) -> Result<()> {
    let labels = managed_labels(app.name());
    let owner = owner_reference(app);

    match engine.materialize(source, values)? {
        Rendered::Manifests(manifests) => {
            for manifest in manifests {
                let mut obj = object_from_json(manifest)?;
                // no cluster here to ask, so scope goes by kind
                let cluster_scoped = obj
                    .types
                    .as_ref()
                    .is_some_and(|types| is_cluster_scoped_kind(&types.kind));
                if !cluster_scoped {
                    place_in_namespace(&mut obj, app.namespace());
                }
                stamp(&mut obj, &labels, owner.as_ref(), app.namespace());
                documents.push(Document {
                    source: source_label.to_string(),
                    body: to_json(&obj)?,
                });
            }
        }
        Rendered::Chart { repo, values } => {
            let release = ChartRelease {
                name: release_name.to_string(),
                namespace: app.namespace().map(str::to_string),
                repo,
                values,
                labels,
                owner,
            };
            let obj = HelmReleaseExecutor::helm_release(&release)?;
            documents.push(Document {
                source: source_label.to_string(),
                body: to_json(&obj)?,
            });
        }
    }

    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| CliError::internal(format!("failed to serialize object: {e}")))
}

fn to_yaml(value: &serde_json::Value) -> Result<String> {
    serde_yaml::to_string(value)
        .map_err(|e| CliError::internal(format!("failed to serialize object: {e}")))
}

/// File name for the nth rendered document, e.g. `01-configmap-web.yaml`
fn document_file_name(index: usize, body: &serde_json::Value) -> String {
    let kind = body["kind"].as_str().unwrap_or("object").to_lowercase();
    let name = body["metadata"]["name"].as_str().unwrap_or("unnamed");
    format!("{:02}-{}-{}.yaml", index + 1, kind, name)
}

fn write_documents(dir: &Path, documents: &[Document]) -> Result<()> {
    fs::create_dir_all(dir)?;

    for (index, doc) in documents.iter().enumerate() {
        let path = dir.join(document_file_name(index, &doc.body));
        fs::write(&path, to_yaml(&doc.body)?)?;
        println!("{} {}", style("wrote").green(), path.display());
    }

    Ok(())
}
