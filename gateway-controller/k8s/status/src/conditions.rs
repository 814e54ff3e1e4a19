//! Builds the condition sets written back to each resource.
//!
//! The reason strings here are part of the controller's reported API; tests
//! pin them verbatim.

use chrono::{DateTime, Utc};
use gateway_controller_core::status::{
    GatewayClassStatus, GatewayStatus, HttpRouteStatus, IgnoredGatewayStatus,
};
use gateway_controller_k8s_api::{gateway, Condition, Time, GATEWAY_API_GROUP};

pub(crate) fn gateway_class(intent: &GatewayClassStatus, now: DateTime<Utc>) -> Vec<Condition> {
    let (status, reason) = if intent.valid {
        ("True", "GatewayClass has been accepted".to_string())
    } else {
        (
            "False",
            format!(
                "GatewayClass has been rejected: {}",
                intent.error_msg.as_deref().unwrap_or("unknown reason")
            ),
        )
    };
    vec![Condition {
        last_transition_time: Time(now),
        message: String::new(),
        observed_generation: intent.observed_generation,
        reason,
        status: status.to_string(),
        type_: "Accepted".to_string(),
    }]
}

pub(crate) fn gateway_listeners(
    intent: &GatewayStatus,
    now: DateTime<Utc>,
) -> Vec<gateway::ListenerStatus> {
    intent
        .listeners
        .iter()
        .map(|(name, listener)| {
            let (status, reason) = if listener.valid {
                ("True", "Ready")
            } else {
                ("False", "Invalid")
            };
            gateway::ListenerStatus {
                name: name.clone(),
                supported_kinds: vec![gateway::RouteGroupKind {
                    group: Some(GATEWAY_API_GROUP.to_string()),
                    kind: "HTTPRoute".to_string(),
                }],
                attached_routes: listener.attached_routes as _,
                conditions: vec![Condition {
                    last_transition_time: Time(now),
                    message: String::new(),
                    observed_generation: intent.observed_generation,
                    reason: reason.to_string(),
                    status: status.to_string(),
                    type_: "Ready".to_string(),
                }],
            }
        })
        .collect()
}

pub(crate) fn ignored_gateway(intent: &IgnoredGatewayStatus, now: DateTime<Utc>) -> Vec<Condition> {
    vec![Condition {
        last_transition_time: Time(now),
        message: "The Gateway is ignored by the controller".to_string(),
        observed_generation: intent.observed_generation,
        reason: "GatewayConflict".to_string(),
        status: "False".to_string(),
        type_: "Ready".to_string(),
    }]
}

/// Parent statuses for a route: one `Accepted` entry per attached section.
/// Sections that failed admission are omitted.
pub(crate) fn http_route_parents(
    intent: &HttpRouteStatus,
    gateway_id: &gateway_controller_core::ResourceId,
    controller_name: &str,
    now: DateTime<Utc>,
) -> gateway::HttpRouteStatus {
    let parents = intent
        .parents
        .iter()
        .filter(|(_, attached)| **attached)
        .map(|(section, _)| gateway::RouteParentStatus {
            parent_ref: gateway::ParentReference {
                group: Some(GATEWAY_API_GROUP.to_string()),
                kind: Some("Gateway".to_string()),
                namespace: Some(gateway_id.namespace.clone()),
                name: gateway_id.name.clone(),
                section_name: (!section.is_empty()).then(|| section.clone()),
                port: None,
            },
            controller_name: controller_name.to_string(),
            conditions: vec![Condition {
                last_transition_time: Time(now),
                message: String::new(),
                observed_generation: intent.observed_generation,
                reason: "Accepted".to_string(),
                status: "True".to_string(),
                type_: "Accepted".to_string(),
            }],
        })
        .collect();

    gateway::HttpRouteStatus {
        inner: gateway::RouteStatus { parents },
    }
}
