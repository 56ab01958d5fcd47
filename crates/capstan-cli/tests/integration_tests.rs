//! Integration tests for CLI commands

use std::process::Command;

/// Helper to run capstan command
fn capstan(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_capstan"))
        .args(args)
        .env_remove("CAPSTAN_LOG")
        .output()
        .expect("Failed to execute capstan")
}

/// Get the path of a fixture file
fn fixture(name: &str) -> String {
    format!("{}/{}", concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures"), name)
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

mod render_command {
    use super::*;

    fn render_inline(extra: &[&str]) -> std::process::Output {
        let capability = fixture("capability-inline.yaml");
        let app = fixture("app.yaml");
        let mut args = vec!["render", "-c", capability.as_str(), "-a", app.as_str()];
        args.extend_from_slice(extra);
        capstan(&args)
    }

    #[test]
    fn test_render_inline_capability() {
        let output = render_inline(&[]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("# Source: capability web"));
        assert!(out.contains("kind: ConfigMap"));
        assert!(out.contains("name: shop-config"));
        assert!(out.contains("Welcome to shop (frontend)"));
        assert!(out.contains("kind: Deployment"));
        assert!(out.contains("app.kubernetes.io/managed-by: capstan"));
        assert!(out.contains("capstan.dev/app: shop"));
    }

    #[test]
    fn test_render_caller_value_beats_fixed_value() {
        let output = render_inline(&[]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("replicas: 3"));
    }

    #[test]
    fn test_render_set_overrides_fixed_value() {
        let output = render_inline(&["--set", "tier=backend"]);

        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("Welcome to shop (backend)"));
        assert!(!out.contains("frontend"));
    }

    #[test]
    fn test_render_set_does_not_beat_caller_value() {
        let output = render_inline(&["--set", "replicas=9"]);

        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("replicas: 3"));
        assert!(!out.contains("replicas: 9"));
    }

    #[test]
    fn test_render_show_values_redacts_passwords() {
        let output = render_inline(&["--show-values"]);

        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("# Resolved Values"));
        assert!(out.contains("appName: shop"));
        assert!(out.contains("<redacted>"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn test_render_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output = render_inline(&["--output-dir", dir.path().to_str().unwrap()]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let config = std::fs::read_to_string(dir.path().join("01-configmap-shop-config.yaml"))
            .expect("configmap written");
        assert!(config.contains("Welcome to shop (frontend)"));
        assert!(dir.path().join("02-deployment-shop.yaml").exists());
    }

    #[test]
    fn test_render_places_unnamespaced_objects_in_app_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let output = render_inline(&["--output-dir", dir.path().to_str().unwrap()]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let deployment = std::fs::read_to_string(dir.path().join("02-deployment-shop.yaml"))
            .expect("deployment written");
        assert!(deployment.contains("namespace: default"));
    }

    #[test]
    fn test_render_missing_input_fails_validation() {
        let output = capstan(&[
            "render",
            "-c",
            &fixture("capability-inline.yaml"),
            "-a",
            &fixture("app-missing-input.yaml"),
        ]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("required key 'size' not found in App values"));
    }

    #[test]
    fn test_render_chart_with_dependency() {
        let output = capstan(&[
            "render",
            "-c",
            &fixture("capability-chart.yaml"),
            "-a",
            &fixture("app-chart.yaml"),
            "--dependency",
            &fixture("dependency.yaml"),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let out = stdout(&output);

        let dependency = out.find("releaseName: storefront-db").expect("dependency release");
        let primary = out.find("# Source: capability storefront").expect("primary release");
        assert!(dependency < primary, "dependency must render first");

        assert!(out.contains("kind: HelmRelease"));
        assert!(out.contains("git: https://git.example.com/charts.git"));
        assert!(out.contains("path: charts/postgresql"));
        assert!(out.contains("replicaCount: 2"));
        assert!(out.contains("repository: registry.example.com/storefront"));
        assert!(out.contains("1.4.0"));
    }

    #[test]
    fn test_render_chart_without_dependency_file() {
        let output = capstan(&[
            "render",
            "-c",
            &fixture("capability-chart.yaml"),
            "-a",
            &fixture("app-chart.yaml"),
        ]);

        assert_eq!(output.status.code(), Some(4));
        assert!(stderr(&output).contains("dependency 'db' is not provided"));
    }

    #[test]
    fn test_render_rejects_wrong_kind() {
        let output = capstan(&[
            "render",
            "-c",
            &fixture("app.yaml"),
            "-a",
            &fixture("app.yaml"),
        ]);

        assert_eq!(output.status.code(), Some(4));
    }

    #[test]
    fn test_render_missing_file() {
        let output = capstan(&[
            "render",
            "-c",
            &fixture("does-not-exist.yaml"),
            "-a",
            &fixture("app.yaml"),
        ]);

        assert_eq!(output.status.code(), Some(5));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn test_validate_allows_complete_app() {
        let output = capstan(&[
            "validate",
            "-c",
            &fixture("capability-inline.yaml"),
            "-a",
            &fixture("app.yaml"),
        ]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("Allowed"));
    }

    #[test]
    fn test_validate_denies_missing_input() {
        let output = capstan(&[
            "validate",
            "-c",
            &fixture("capability-inline.yaml"),
            "-a",
            &fixture("app-missing-input.yaml"),
        ]);

        assert_eq!(output.status.code(), Some(2));
        let out = stdout(&output);
        assert!(out.contains("Denied"));
        assert!(out.contains("required key 'size' not found in App values"));
    }

    #[test]
    fn test_validate_json_output() {
        let output = capstan(&[
            "validate",
            "-c",
            &fixture("capability-inline.yaml"),
            "-a",
            &fixture("app-missing-input.yaml"),
            "--json",
        ]);

        let json: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");

        assert_eq!(json["allowed"], false);
        assert_eq!(json["reason"], "required key 'size' not found in App values");
    }
}

mod crds_command {
    use super::*;

    #[test]
    fn test_crds_prints_all_definitions() {
        let output = capstan(&["crds"]);

        assert!(output.status.success());
        let out = stdout(&output);
        assert_eq!(out.matches("kind: CustomResourceDefinition").count(), 4);
        assert!(out.contains("name: capabilities.capstan.dev"));
        assert!(out.contains("name: clustercapabilities.capstan.dev"));
        assert!(out.contains("name: capabilitydependencies.capstan.dev"));
        assert!(out.contains("name: apps.capstan.dev"));
        assert!(out.contains("x-kubernetes-preserve-unknown-fields: true"));
    }
}

mod reconcile_command {
    use super::*;

    #[test]
    fn test_reconcile_requires_name_or_all() {
        let output = capstan(&["reconcile"]);

        assert!(!output.status.success());
    }
}
