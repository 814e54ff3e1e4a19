//! Collects status intents from the graph. Intents are plain data; applying
//! them to the cluster is the reporter's job.

use crate::graph::Graph;
use gateway_controller_core::status::{
    GatewayClassStatus, GatewayStatus, HttpRouteStatus, IgnoredGatewayStatus, ListenerStatus,
    Statuses,
};
use gateway_controller_k8s_api::ResourceExt;

pub fn build_statuses(graph: &Graph) -> Statuses {
    let gateway_class = graph.gateway_class.as_ref().map(|gc| GatewayClassStatus {
        name: gc.source.name_unchecked(),
        valid: gc.valid,
        error_msg: gc.error_msg.clone(),
        observed_generation: gc.source.metadata.generation,
    });

    let gateway = graph.gateway.as_ref().map(|gw| GatewayStatus {
        id: gw.id.clone(),
        observed_generation: gw.source.metadata.generation,
        listeners: gw
            .listeners
            .iter()
            .map(|(name, l)| {
                let status = ListenerStatus {
                    valid: l.valid,
                    attached_routes: l.attached_routes.len() as i32,
                };
                (name.clone(), status)
            })
            .collect(),
    });

    let ignored_gateways = graph
        .ignored_gateways
        .iter()
        .map(|ig| IgnoredGatewayStatus {
            id: ig.id.clone(),
            observed_generation: ig.source.metadata.generation,
        })
        .collect();

    let http_routes = graph
        .routes
        .iter()
        .map(|(id, route)| {
            let mut parents = std::collections::BTreeMap::new();
            for section in &route.valid_section_refs {
                parents.insert(section.clone(), true);
            }
            for section in &route.invalid_section_refs {
                parents.insert(section.clone(), false);
            }
            HttpRouteStatus {
                id: id.clone(),
                observed_generation: route.source.metadata.generation,
                parents,
            }
        })
        .collect();

    Statuses {
        gateway_class,
        gateway,
        ignored_gateways,
        http_routes,
    }
}
