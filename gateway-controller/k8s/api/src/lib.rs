#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use k8s_gateway_api as gateway;
pub use k8s_openapi::{
    api::core::v1::{Secret, Service},
    apimachinery::pkg::apis::meta::v1::{Condition, Time},
    ByteString,
};
pub use kube::{
    api::{Api, ObjectMeta, Patch, PatchParams, Resource, ResourceExt},
    Client, Error,
};

/// The API group of the Gateway API resources this controller programs.
pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";
