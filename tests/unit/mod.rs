// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for kmm-webhook.
//!
//! These tests run without a Kubernetes cluster and exercise the public
//! validation API end to end.

#[path = "../common/mod.rs"]
mod common;

mod validator_tests {
    use crate::common::fixtures::{ModuleBuilder, empty_module, valid_module};
    use kmm_webhook::crd::KernelMapping;
    use kmm_webhook::{AdmissionValidator, ModuleValidator, ValidationError};
    use tracing::Span;

    fn validator() -> ModuleValidator {
        ModuleValidator::new(Span::none())
    }

    #[test]
    fn test_valid_module_create_and_update() {
        let module = valid_module("kmod");
        assert!(validator().validate_create(&module).is_ok());
        assert!(validator().validate_update(&module, &module).is_ok());
    }

    #[test]
    fn test_missing_image_at_index_zero() {
        let module = ModuleBuilder::default()
            .literal("5.14.0", "")
            .module_name("kmod")
            .build();
        let err = validator().validate_create(&module).unwrap_err();
        assert!(matches!(err, ValidationError::MissingImage { index: 0 }));
        assert_eq!(
            err.to_string(),
            "failed to validate kernel mappings: missing spec.moduleLoader.container.kernelMappings[0].containerImage"
        );
    }

    #[test]
    fn test_mutually_exclusive_selectors() {
        let module = ModuleBuilder::default()
            .mapping(KernelMapping {
                regexp: r"5\.14\..*".to_string(),
                literal: "5.14.0".to_string(),
                ..Default::default()
            })
            .module_name("kmod")
            .build();
        let err = validator().validate_create(&module).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to validate kernel mappings: regexp and literal are mutually exclusive properties at kernelMappings[0]"
        );
    }

    #[test]
    fn test_missing_selector_index() {
        let module = ModuleBuilder::default()
            .container_image("img")
            .literal("5.14.0", "")
            .literal("5.15.0", "")
            .mapping(KernelMapping::default())
            .module_name("kmod")
            .build();
        let err = validator().validate_create(&module).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to validate kernel mappings: regexp or literal must be set at kernelMappings[2]"
        );
    }

    #[test]
    fn test_unbalanced_group_rejected() {
        let module = ModuleBuilder::default()
            .regexp("(", "img")
            .module_name("kmod")
            .build();
        let err = validator().validate_create(&module).unwrap_err();
        assert_eq!(err.reason(), "InvalidPattern");
        assert!(
            err.to_string()
                .starts_with("failed to validate kernel mappings: invalid regexp at index 0: ")
        );
    }

    #[test]
    fn test_invalid_patterns_rejected() {
        for pattern in ["(", "[", "a{2,1}", "*", r"\", "(?P<x"] {
            let module = ModuleBuilder::default()
                .container_image("img")
                .literal("5.14.0", "")
                .regexp(pattern, "")
                .module_name("kmod")
                .build();
            let err = validator().validate_create(&module).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidPattern { index: 1, .. }),
                "pattern {pattern:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_module_name_with_raw_load_rejected() {
        let module = ModuleBuilder::default()
            .module_name("foo")
            .raw_args(&["insmod a"], &[])
            .build();
        let err = validator().validate_create(&module).unwrap_err();
        assert_eq!(err.to_string(), "rawArgs cannot be set when moduleName is set");
    }

    #[test]
    fn test_raw_load_without_unload_rejected() {
        let module = ModuleBuilder::default()
            .raw_args(&["insmod a"], &[])
            .build();
        let err = validator().validate_create(&module).unwrap_err();
        assert_eq!(
            err.to_string(),
            "load and unload rawArgs must be set when moduleName is unset"
        );
    }

    #[test]
    fn test_raw_load_and_unload_accepted() {
        let module = ModuleBuilder::default()
            .raw_args(&["insmod a"], &["rmmod a"])
            .build();
        assert!(validator().validate_create(&module).is_ok());
    }

    #[test]
    fn test_kernel_mapping_error_reported_before_modprobe() {
        let module = ModuleBuilder::default()
            .mapping(KernelMapping::default())
            .module_name("foo")
            .raw_args(&["insmod a"], &["rmmod a"])
            .build();
        let err = validator().validate_create(&module).unwrap_err();
        assert!(matches!(err, ValidationError::MissingSelector { index: 0 }));
    }

    #[test]
    fn test_delete_accepts_anything() {
        assert!(validator().validate_delete(&empty_module()).is_ok());

        let module = ModuleBuilder::default()
            .regexp("(", "")
            .raw_args(&["insmod a"], &[])
            .build();
        assert!(validator().validate_delete(&module).is_ok());
    }

    #[test]
    fn test_empty_module_rejected_on_create() {
        // No mappings, but no load mode either
        let err = validator().validate_create(&empty_module()).unwrap_err();
        assert!(matches!(err, ValidationError::IncompleteRawArgs));
    }
}

mod crd_tests {
    use kmm_webhook::crd::{Module, ModprobeSpec};
    use kube::{CustomResourceExt, Resource};
    use serde_json::json;

    #[test]
    fn test_crd_identity() {
        assert_eq!(Module::group(&()), "kmm.sigs.x-k8s.io");
        assert_eq!(Module::version(&()), "v1beta1");
        assert_eq!(Module::kind(&()), "Module");
        assert_eq!(Module::plural(&()), "modules");

        let crd = Module::crd();
        assert_eq!(crd.spec.names.kind, "Module");
        assert_eq!(crd.spec.scope, "Namespaced");
    }

    #[test]
    fn test_modprobe_dir_name_default() {
        assert_eq!(ModprobeSpec::default().dir_name, "/opt");
    }

    #[test]
    fn test_deserialize_module() {
        let module: Module = serde_json::from_value(json!({
            "apiVersion": "kmm.sigs.x-k8s.io/v1beta1",
            "kind": "Module",
            "metadata": { "name": "kmod", "namespace": "kmm" },
            "spec": {
                "moduleLoader": {
                    "container": {
                        "containerImage": "quay.io/org/kmod:latest",
                        "modprobe": {
                            "rawArgs": { "load": ["insmod /opt/kmod.ko"], "unload": ["rmmod kmod"] }
                        },
                        "kernelMappings": [
                            { "literal": "5.14.0" },
                            { "regexp": "^6\\..*$", "containerImage": "quay.io/org/kmod:6" }
                        ]
                    },
                    "serviceAccountName": "kmod-loader"
                },
                "selector": { "feature.node.kubernetes.io/cpu-cpuid.VMX": "true" }
            }
        }))
        .unwrap();

        let container = &module.spec.module_loader.container;
        assert_eq!(container.kernel_mappings.len(), 2);
        assert_eq!(container.kernel_mappings[0].literal, "5.14.0");
        assert!(container.kernel_mappings[0].regexp.is_empty());
        assert_eq!(container.kernel_mappings[1].container_image, "quay.io/org/kmod:6");
        assert!(container.modprobe.module_name.is_empty());
        assert_eq!(container.modprobe.dir_name, "/opt");
        assert_eq!(
            container.modprobe.raw_args.as_ref().unwrap().unload,
            vec!["rmmod kmod".to_string()]
        );
        assert_eq!(module.spec.module_loader.service_account_name, "kmod-loader");
    }
}

mod result_tests {
    use crate::common::fixtures::{ModuleBuilder, valid_module};
    use kmm_webhook::webhooks::{ValidationResult, validate_all};

    #[test]
    fn test_allowed_result() {
        let result = ValidationResult::from(validate_all(&valid_module("kmod").spec));
        assert!(result.allowed);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_denied_result_carries_reason_and_message() {
        let module = ModuleBuilder::default()
            .literal("5.14.0", "")
            .module_name("kmod")
            .build();
        let result = ValidationResult::from(validate_all(&module.spec));
        assert!(!result.allowed);
        assert_eq!(result.reason.as_deref(), Some("MissingImage"));
        assert!(result.message.unwrap().contains("kernelMappings[0].containerImage"));
    }
}
