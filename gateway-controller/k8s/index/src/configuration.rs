//! Projects the resource graph into the routing configuration.
//!
//! The projection is order-stable end to end: servers sort by hostname,
//! paths sort by string compare, and match rules within a path keep the
//! `(route, rule index, match index)` order with routes compared by
//! `(namespace, name)`. Two projections of the same graph are identical.

use crate::graph::Graph;
use gateway_controller_core::{
    configuration::{Configuration, MatchRule, PathRule, Ssl, VirtualServer},
    ResourceId,
};
use gateway_controller_k8s_api::gateway;
use std::{collections::BTreeMap, sync::Arc};

pub fn build_configuration(graph: &Graph) -> Configuration {
    if !matches!(&graph.gateway_class, Some(gc) if gc.valid) {
        return Configuration::default();
    }
    let gateway = match &graph.gateway {
        Some(gw) => gw,
        None => return Configuration::default(),
    };

    let mut http: BTreeMap<String, ServerSources> = BTreeMap::new();
    let mut ssl: BTreeMap<String, ServerSources> = BTreeMap::new();

    for listener in gateway.listeners.values() {
        if !listener.valid {
            continue;
        }

        let (bucket, certificate) = match listener.listener.protocol.as_str() {
            "HTTP" => (&mut http, None),
            "HTTPS" => (
                &mut ssl,
                listener
                    .secret
                    .as_ref()
                    .map(|s| s.path.display().to_string()),
            ),
            _ => continue,
        };

        for (route_id, hostnames) in &listener.attached_routes {
            let route = match graph.routes.get(route_id) {
                Some(route) => route,
                None => continue,
            };
            for hostname in hostnames {
                let server = bucket.entry(hostname.clone()).or_default();
                server
                    .routes
                    .insert(route_id.clone(), route.source.clone());
                if server.certificate_path.is_none() {
                    server.certificate_path = certificate.clone();
                }
            }
        }
    }

    Configuration {
        http_servers: http.into_iter().map(virtual_server).collect(),
        ssl_servers: ssl.into_iter().map(virtual_server).collect(),
    }
}

#[derive(Default)]
struct ServerSources {
    routes: BTreeMap<ResourceId, Arc<gateway::HttpRoute>>,
    certificate_path: Option<String>,
}

fn virtual_server((hostname, sources): (String, ServerSources)) -> VirtualServer {
    let mut paths: BTreeMap<String, Vec<MatchRule>> = BTreeMap::new();
    let mut dropped = 0usize;

    for source in sources.routes.values() {
        for (rule_idx, rule) in source.spec.rules.iter().flatten().enumerate() {
            for (match_idx, m) in rule.matches.iter().flatten().enumerate() {
                let path = match match_path(m) {
                    Some(path) => path,
                    None => {
                        dropped += 1;
                        continue;
                    }
                };
                paths.entry(path).or_default().push(MatchRule {
                    rule_idx,
                    match_idx,
                    source: source.clone(),
                });
            }
        }
    }

    if dropped > 0 {
        tracing::debug!(%hostname, dropped, "Dropped matches with unsupported path types");
    }

    VirtualServer {
        hostname,
        path_rules: paths
            .into_iter()
            .map(|(path, match_rules)| PathRule { path, match_rules })
            .collect(),
        ssl: sources
            .certificate_path
            .map(|certificate_path| Ssl { certificate_path }),
    }
}

/// The bucketing path of a match: its prefix value, or `/` when the match
/// carries no path or an empty one. Exact and regex path matches are not
/// supported and exclude the match from the configuration.
fn match_path(m: &gateway::HttpRouteMatch) -> Option<String> {
    match &m.path {
        None => Some("/".to_string()),
        Some(gateway::HttpPathMatch::PathPrefix { value }) => {
            if value.is_empty() {
                Some("/".to_string())
            } else {
                Some(value.clone())
            }
        }
        Some(_) => None,
    }
}
