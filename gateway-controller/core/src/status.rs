//! Status intents derived from one reconciliation pass.
//!
//! The collector records what should be reported; only the reporter talks to
//! the cluster. Everything here is plain data so a cycle's intents can be
//! compared across passes in tests.

use crate::ResourceId;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Statuses {
    pub gateway_class: Option<GatewayClassStatus>,
    pub gateway: Option<GatewayStatus>,
    pub ignored_gateways: Vec<IgnoredGatewayStatus>,
    pub http_routes: Vec<HttpRouteStatus>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GatewayClassStatus {
    pub name: String,
    pub valid: bool,
    pub error_msg: Option<String>,
    pub observed_generation: Option<i64>,
}

/// Status of the gateway the controller programs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GatewayStatus {
    pub id: ResourceId,
    pub observed_generation: Option<i64>,
    pub listeners: BTreeMap<String, ListenerStatus>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListenerStatus {
    pub valid: bool,
    pub attached_routes: i32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IgnoredGatewayStatus {
    pub id: ResourceId,
    pub observed_generation: Option<i64>,
}

/// Per-section attachment outcomes for one route.
///
/// Keys are listener section names; the empty key stands for a parent ref
/// that named no section and matched no listener.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HttpRouteStatus {
    pub id: ResourceId,
    pub observed_generation: Option<i64>,
    pub parents: BTreeMap<String, bool>,
}
