//! Reconcile command - drive apps in a live cluster

use capstan_kube::{
    HelmReleaseExecutor, KubeObjectStore, ObjectStore, ReconcileOptions, ReconcileReport,
    Reconciler,
};
use console::style;
use std::sync::Arc;
use std::time::Duration;

use super::override_layers;
use crate::error::{CliError, Result};

/// Options for the reconcile command
pub struct ReconcileArgs<'a> {
    pub name: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub all: bool,
    pub timeout: Option<u64>,
    pub set_values: &'a [String],
    pub descend_into_sequences: bool,
}

pub async fn run(args: ReconcileArgs<'_>) -> Result<()> {
    if args.name.is_none() && !args.all {
        return Err(CliError::validation_with_help(
            "no app selected",
            "pass an app name or --all",
        ));
    }

    let options = ReconcileOptions {
        call_timeout: args.timeout.map(Duration::from_secs),
        descend_into_sequences: args.descend_into_sequences,
        overrides: override_layers(args.set_values)?,
        ..ReconcileOptions::default()
    };

    let store: Arc<dyn ObjectStore> = Arc::new(KubeObjectStore::try_default().await?);
    let charts = Arc::new(HelmReleaseExecutor::new(store.clone()));
    let reconciler = Reconciler::new(store, charts).with_options(options);

    match args.name {
        Some(name) => {
            let namespace = args.namespace.unwrap_or("default");
            println!(
                "{} Reconciling {}/{}",
                style("→").blue().bold(),
                namespace,
                style(name).cyan()
            );
            let report = reconciler.reconcile_named(name, namespace).await?;
            print_report(&report);
            Ok(())
        }
        None => reconcile_all(&reconciler, args.namespace).await,
    }
}

async fn reconcile_all(reconciler: &Reconciler, namespace: Option<&str>) -> Result<()> {
    let apps = reconciler.list_apps(namespace).await?;

    if apps.is_empty() {
        println!("{} No apps found", style("⚠").yellow());
        return Ok(());
    }

    println!(
        "{} Reconciling {} app(s)",
        style("→").blue().bold(),
        apps.len()
    );

    let mut failed = 0;
    for app in &apps {
        match reconciler.reconcile(app).await {
            Ok(report) => print_report(&report),
            Err(e) => {
                failed += 1;
                println!(
                    "  {} {}: {}",
                    style("✗").red(),
                    style(app.display_name()).cyan(),
                    e
                );
            }
        }
    }

    if failed > 0 {
        return Err(CliError::BatchFailed {
            failed,
            total: apps.len(),
        });
    }

    Ok(())
}

fn print_report(report: &ReconcileReport) {
    let marker = if report.is_unchanged() {
        style("=").dim()
    } else {
        style("✓").green()
    };
    println!(
        "  {} {} ({})",
        marker,
        style(&report.app).cyan(),
        report.summary()
    );

    if !report.outputs.is_empty() {
        let keys: Vec<&str> = report.outputs.keys().map(String::as_str).collect();
        println!("    {} outputs: {}", style("→").blue(), keys.join(", "));
    }
}
