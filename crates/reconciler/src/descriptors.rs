//! Desired objects for a deployment target.
//!
//! Built fresh for every reconciliation and never stored.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, ContainerPort, Namespace, PodSpec, PodTemplateSpec, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use provision_core::DeploymentTarget;

/// Labels carried by the namespace.
pub const NAMESPACE_LABELS: [(&str, &str); 3] = [
    ("name", "nginx"),
    ("env", "production"),
    ("conference", "vday-2019"),
];

/// Contents of the config map.
pub const CONFIG_MAP_DATA: [(&str, &str); 1] = [("hello", "world")];

/// Port the container listens on.
pub const CONTAINER_PORT: i32 = 80;

/// Port the service exposes.
pub const SERVICE_PORT: i32 = 8090;

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn app_labels(target: &DeploymentTarget) -> BTreeMap<String, String> {
    string_map(&[("app", target.app_name.as_str())])
}

pub fn namespace(target: &DeploymentTarget) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(target.namespace.clone()),
            labels: Some(string_map(&NAMESPACE_LABELS)),
            ..ObjectMeta::default()
        },
        ..Namespace::default()
    }
}

pub fn config_map(target: &DeploymentTarget) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(target.config_map_name.clone()),
            namespace: Some(target.namespace.clone()),
            ..ObjectMeta::default()
        },
        data: Some(string_map(&CONFIG_MAP_DATA)),
        ..ConfigMap::default()
    }
}

/// One container named after the app, always pulling `target.image`.
pub fn deployment(target: &DeploymentTarget) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(target.app_name.clone()),
            namespace: Some(target.namespace.clone()),
            labels: Some(app_labels(target)),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(target.replicas),
            selector: LabelSelector {
                match_labels: Some(app_labels(target)),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(app_labels(target)),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: target.app_name.clone(),
                        image: Some(target.image.clone()),
                        image_pull_policy: Some("Always".to_string()),
                        ports: Some(vec![ContainerPort {
                            container_port: CONTAINER_PORT,
                            ..ContainerPort::default()
                        }]),
                        ..Container::default()
                    }],
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    }
}

/// NodePort service forwarding [`SERVICE_PORT`] to [`CONTAINER_PORT`].
pub fn service(target: &DeploymentTarget) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(target.app_name.clone()),
            namespace: Some(target.namespace.clone()),
            ..ObjectMeta::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(app_labels(target)),
            type_: Some("NodePort".to_string()),
            ports: Some(vec![ServicePort {
                protocol: Some("TCP".to_string()),
                port: SERVICE_PORT,
                target_port: Some(IntOrString::Int(CONTAINER_PORT)),
                ..ServicePort::default()
            }]),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}
