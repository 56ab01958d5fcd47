//! Admission validation of apps against their capability
//!
//! The admission layer only needs a verdict. It runs the same resolution as a
//! reconcile pass and reports its first error verbatim, so a rejected app and
//! a failed reconcile show the same message.

use serde::Serialize;

use crate::app::App;
use crate::capability::Capability;

/// Reason reported when an app is admitted
pub const ALLOWED_REASON: &str = "all required inputs for the referenced capability were provided";

/// Allow/deny decision with a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionVerdict {
    pub allowed: bool,
    pub reason: String,
}

impl AdmissionVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: ALLOWED_REASON.to_string(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Check that `app` supplies every required input of `capability` with the right type
pub fn validate_app(capability: &Capability, app: &App) -> AdmissionVerdict {
    match capability.resolve(&app.spec.values, &[]) {
        Ok(_) => AdmissionVerdict::allow(),
        Err(e) => AdmissionVerdict::deny(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;

    fn capability() -> Capability {
        Resource::from_yaml(
            r#"
apiVersion: capstan.dev/v1beta1
kind: ClusterCapability
metadata:
  name: web
spec:
  inputs:
    - key: size
      type: int
      targetId: replicas
    - key: motd
      type: string
      optional: true
  source:
    inline: []
"#,
        )
        .unwrap()
    }

    fn app(values: &str) -> App {
        Resource::from_yaml(&format!(
            r#"
apiVersion: capstan.dev/v1beta1
kind: App
metadata:
  name: shop
  namespace: default
spec:
  capRef:
    name: web
  values: {values}
"#
        ))
        .unwrap()
    }

    #[test]
    fn test_allows_complete_app() {
        let verdict = validate_app(&capability(), &app("[{key: size, value: 2}]"));
        assert_eq!(verdict, AdmissionVerdict::allow());
    }

    #[test]
    fn test_denies_missing_input_with_resolution_message() {
        let verdict = validate_app(&capability(), &app("[]"));
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason, "required key 'size' not found in App values");
    }

    #[test]
    fn test_denies_wrong_type() {
        let verdict = validate_app(&capability(), &app("[{key: size, value: two}]"));
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason, "required input 'size' is not of type 'int'");
    }
}
