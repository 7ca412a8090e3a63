//! Module Custom Resource Definition.
//!
//! Mirrors the `kmm.sigs.x-k8s.io/v1beta1` Module API. Empty strings carry
//! the wire meaning of "unset", so the webhook sees exactly what the API
//! server decoded.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{EnvVar, LocalObjectReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Module describes how a kernel module is loaded onto selected nodes.
///
/// Example:
/// ```yaml
/// apiVersion: kmm.sigs.x-k8s.io/v1beta1
/// kind: Module
/// metadata:
///   name: my-kmod
/// spec:
///   selector:
///     node-role.kubernetes.io/worker: ""
///   moduleLoader:
///     container:
///       modprobe:
///         moduleName: my-kmod
///       kernelMappings:
///         - regexp: '^.+\.el9\.x86_64$'
///           containerImage: quay.io/example/my-kmod:${KERNEL_FULL_VERSION}
///         - literal: 5.14.0-70.13.1.el9_0.x86_64
///           containerImage: quay.io/example/my-kmod:legacy
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kmm.sigs.x-k8s.io",
    version = "v1beta1",
    kind = "Module",
    plural = "modules",
    shortname = "mod",
    status = "ModuleStatus",
    namespaced,
    printcolumn = r#"{"name":"Desired", "type":"integer", "jsonPath":".status.moduleLoader.desiredNumber"}"#,
    printcolumn = r#"{"name":"Available", "type":"integer", "jsonPath":".status.moduleLoader.availableNumber"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    /// Loads the kernel module on each selected node.
    pub module_loader: ModuleLoaderSpec,

    /// Optional device plugin deployed alongside the module loader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_plugin: Option<DevicePluginSpec>,

    /// Pull secret used for every image referenced by this Module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_repo_secret: Option<LocalObjectReference>,

    /// Node selector restricting where the module is loaded.
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
}

/// Module loader configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleLoaderSpec {
    /// Container that loads and unloads the module.
    pub container: ModuleLoaderContainerSpec,

    /// Service account for the module loader pods.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_name: String,
}

/// Module loader container: default image, per-kernel overrides and modprobe settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleLoaderContainerSpec {
    /// Build instructions applied when no image exists for a kernel yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,

    /// Default image, used by kernel mappings that do not set their own.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_image: String,

    /// Image pull policy (Always, IfNotPresent, Never).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    /// Kernel version selectors, matched in declaration order.
    #[serde(default)]
    pub kernel_mappings: Vec<KernelMapping>,

    /// How the module is loaded and unloaded.
    #[serde(default)]
    pub modprobe: ModprobeSpec,
}

/// Associates a kernel version selector with an image.
///
/// Exactly one of `literal` and `regexp` must be set.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KernelMapping {
    /// Build instructions overriding the container-level ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,

    /// Image for kernels matching this mapping.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_image: String,

    /// Exact kernel version.
    #[serde(default)]
    pub literal: String,

    /// Regular expression matched against the kernel version.
    #[serde(default)]
    pub regexp: String,
}

/// modprobe settings for the module loader.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModprobeSpec {
    /// Name of the kernel module. Mutually exclusive with `rawArgs`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module_name: String,

    /// Parameters passed to modprobe when loading the module.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,

    /// Directory holding the module tree inside the image (default: /opt).
    #[serde(default = "default_dir_name")]
    pub dir_name: String,

    /// Extra arguments appended to the generated modprobe commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<ModprobeArgs>,

    /// Full modprobe command lines, used instead of `moduleName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_args: Option<ModprobeArgs>,
}

impl Default for ModprobeSpec {
    fn default() -> Self {
        Self {
            module_name: String::new(),
            parameters: Vec::new(),
            dir_name: default_dir_name(),
            args: None,
            raw_args: None,
        }
    }
}

fn default_dir_name() -> String {
    "/opt".to_string()
}

/// Load and unload argument lists.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModprobeArgs {
    /// Arguments used when loading the module.
    #[serde(default)]
    pub load: Vec<String>,

    /// Arguments used when unloading the module.
    #[serde(default)]
    pub unload: Vec<String>,
}

/// In-cluster image build configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    /// Build arguments passed to the Dockerfile.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_args: Vec<BuildArg>,

    /// ConfigMap holding the Dockerfile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_config_map: Option<LocalObjectReference>,

    /// Secrets exposed to the build.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<LocalObjectReference>,

    /// Options for pulling the base image.
    #[serde(default)]
    pub pull: PullOptions,

    /// Options for pushing the built image.
    #[serde(default)]
    pub push: PullOptions,
}

/// A single Dockerfile build argument.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildArg {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Registry access options.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PullOptions {
    /// Allow plain HTTP or self-signed registries.
    #[serde(default)]
    pub insecure: bool,
}

/// Device plugin deployment.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevicePluginSpec {
    pub container: DevicePluginContainerSpec,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_name: String,
}

/// Device plugin container.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevicePluginContainerSpec {
    /// Device plugin image.
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

/// Observed state of a Module.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStatus {
    #[serde(default)]
    pub module_loader: DaemonSetStatus,

    #[serde(default)]
    pub device_plugin: DaemonSetStatus,
}

/// Rollout counters for a DaemonSet managed on behalf of a Module.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DaemonSetStatus {
    /// Number of nodes matching the Module selector.
    #[serde(default)]
    pub nodes_matching_selector_number: i32,

    /// Number of pods that should be running.
    #[serde(default)]
    pub desired_number: i32,

    /// Number of pods available.
    #[serde(default)]
    pub available_number: i32,
}
