//! Resource indexing for the gateway controller.
//!
//! Watches feed a single event channel; the event loop applies each event to
//! the [`Store`] and then derives, in order, the resource graph, the routing
//! [`Configuration`], and the status intents. The derivations are pure
//! functions of the store snapshot, so one reconciliation never observes a
//! partially-applied change.
//!
//! [`Configuration`]: gateway_controller_core::configuration::Configuration

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod configuration;
mod event;
mod graph;
mod resolve;
mod statuses;
mod store;


pub use self::{
    configuration::build_configuration,
    event::{Event, EventSender, Kind, ObjectRef, Resource, SharedEventSender},
    graph::{
        build_graph, GatewayClassEntry, GatewayEntry, Graph, IgnoredGateway, ListenerEntry,
        RouteEntry, SecretRef,
    },
    resolve::ClusterResolver,
    statuses::build_statuses,
    store::Store,
};

use std::path::PathBuf;

/// Static identity and rendering settings the builders close over.
#[derive(Clone, Debug)]
pub struct ControllerInfo {
    /// `<domain>/<namespace>/<name>` identity written into route parent
    /// statuses and compared against GatewayClass controller names.
    pub controller_name: String,

    /// Name of the GatewayClass this controller implements.
    pub gateway_class_name: String,

    /// Directory referenced certificates are materialized under.
    pub secrets_dir: PathBuf,

    /// Cluster DNS zone used to resolve backend Services.
    pub dns_domain: String,
}
