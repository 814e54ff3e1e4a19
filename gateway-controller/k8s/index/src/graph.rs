//! Derives the resource graph for one reconciliation.
//!
//! The graph is rebuilt from scratch on every pass and records every
//! admission decision: whether the GatewayClass is ours, which Gateway is
//! programmed, which listeners are usable, and which route parent refs
//! attach where. Nothing here touches the cluster; invalid resources are
//! annotated, never rejected with an error.

use crate::{store::Store, ControllerInfo};
use gateway_controller_k8s_api::{gateway, GATEWAY_API_GROUP};
use gateway_controller_core::ResourceId;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::Arc,
};

#[derive(Debug, Default)]
pub struct Graph {
    pub gateway_class: Option<GatewayClassEntry>,
    pub gateway: Option<GatewayEntry>,
    pub ignored_gateways: Vec<IgnoredGateway>,
    pub routes: BTreeMap<ResourceId, RouteEntry>,
}

#[derive(Debug)]
pub struct GatewayClassEntry {
    pub source: Arc<gateway::GatewayClass>,
    pub valid: bool,
    pub error_msg: Option<String>,
}

/// The Gateway elected for programming this cycle.
#[derive(Debug)]
pub struct GatewayEntry {
    pub id: ResourceId,
    pub source: Arc<gateway::Gateway>,
    pub listeners: BTreeMap<String, ListenerEntry>,
}

#[derive(Debug)]
pub struct IgnoredGateway {
    pub id: ResourceId,
    pub source: Arc<gateway::Gateway>,
}

#[derive(Debug)]
pub struct ListenerEntry {
    pub listener: gateway::Listener,
    pub valid: bool,
    pub secret: Option<SecretRef>,

    /// Route ids mapped to the hostname intersections they attach under.
    pub attached_routes: BTreeMap<ResourceId, BTreeSet<String>>,

    /// Union of every attached route's hostname intersections.
    pub accepted_hostnames: BTreeSet<String>,
}

/// A resolved TLS certificate reference.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecretRef {
    pub id: ResourceId,
    pub path: PathBuf,
}

/// Per-section admission outcomes for one route.
///
/// Every section ref lands in exactly one of the two sets. A parent ref
/// without a section name contributes the names of all listeners it matched,
/// or the empty key when it matched none.
#[derive(Debug)]
pub struct RouteEntry {
    pub source: Arc<gateway::HttpRoute>,
    pub valid_section_refs: BTreeSet<String>,
    pub invalid_section_refs: BTreeSet<String>,
}

pub fn build_graph(store: &Store, info: &ControllerInfo) -> Graph {
    let gateway_class = store.gateway_class(&info.gateway_class_name).map(|gc| {
        let valid = gc.spec.controller_name == info.controller_name;
        let error_msg = (!valid).then(|| {
            format!(
                "class controller {} is not {}",
                gc.spec.controller_name, info.controller_name
            )
        });
        GatewayClassEntry {
            source: gc.clone(),
            valid,
            error_msg,
        }
    });

    // Without an accepted class there is nothing to program.
    if !matches!(&gateway_class, Some(gc) if gc.valid) {
        return Graph {
            gateway_class,
            ..Default::default()
        };
    }

    let mut candidates = store
        .gateways()
        .filter(|(_, gw)| gw.spec.gateway_class_name == info.gateway_class_name)
        .map(|(id, gw)| (id.clone(), gw.clone()))
        .collect::<Vec<_>>();
    candidates.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut candidates = candidates.into_iter();
    let gateway = candidates.next().map(|(id, source)| {
        let listeners = source
            .spec
            .listeners
            .iter()
            .map(|l| (l.name.clone(), build_listener(l, &id.namespace, store, info)))
            .collect();
        GatewayEntry {
            id,
            source,
            listeners,
        }
    });
    let ignored_gateways = candidates
        .map(|(id, source)| IgnoredGateway { id, source })
        .collect();

    let mut graph = Graph {
        gateway_class,
        gateway,
        ignored_gateways,
        routes: BTreeMap::new(),
    };

    if let Some(gateway) = graph.gateway.as_mut() {
        for (id, route) in store.http_routes() {
            if let Some(entry) = bind_route(gateway, id, route) {
                graph.routes.insert(id.clone(), entry);
            }
        }
    }

    graph
}

fn build_listener(
    listener: &gateway::Listener,
    gateway_ns: &str,
    store: &Store,
    info: &ControllerInfo,
) -> ListenerEntry {
    let mut entry = ListenerEntry {
        listener: listener.clone(),
        valid: false,
        secret: None,
        attached_routes: BTreeMap::new(),
        accepted_hostnames: BTreeSet::new(),
    };

    match listener.protocol.as_str() {
        "HTTP" => entry.valid = true,
        "HTTPS" => match terminate_secret(listener, gateway_ns) {
            Some(id) if store.secret(&id).is_some() => {
                entry.secret = Some(SecretRef {
                    path: info.secrets_dir.join(&id.name),
                    id,
                });
                entry.valid = true;
            }
            Some(id) => {
                tracing::debug!(listener = %listener.name, secret = %id, "Certificate secret not found");
            }
            None => {}
        },
        _ => {}
    }

    entry
}

/// The certificate Secret an HTTPS listener terminates with, if its TLS
/// block is acceptable: mode `Terminate` (the API default), a first
/// certificate ref of kind Secret, and no cross-namespace reference.
fn terminate_secret(listener: &gateway::Listener, gateway_ns: &str) -> Option<ResourceId> {
    let tls = listener.tls.as_ref()?;
    if tls.mode.as_deref().unwrap_or("Terminate") != "Terminate" {
        return None;
    }

    let cert = tls.certificate_refs.as_ref()?.first()?;
    if cert.kind.as_deref().map_or(false, |k| k != "Secret") {
        return None;
    }
    let namespace = cert.namespace.as_deref().unwrap_or(gateway_ns);
    if namespace != gateway_ns {
        return None;
    }

    Some(ResourceId::new(namespace, cert.name.clone()))
}

fn bind_route(
    gateway: &mut GatewayEntry,
    id: &ResourceId,
    route: &Arc<gateway::HttpRoute>,
) -> Option<RouteEntry> {
    let parent_refs = route
        .spec
        .inner
        .parent_refs
        .iter()
        .flatten()
        .filter(|p| targets_gateway_kind(p))
        .collect::<Vec<_>>();

    // Only routes that name the chosen gateway are processed at all.
    if !parent_refs
        .iter()
        .any(|p| parent_gateway_id(p, &id.namespace) == gateway.id)
    {
        return None;
    }

    let has_rules = route
        .spec
        .rules
        .as_ref()
        .map_or(false, |rules| !rules.is_empty());
    let hostnames = route_hostnames(route);

    let mut entry = RouteEntry {
        source: route.clone(),
        valid_section_refs: BTreeSet::new(),
        invalid_section_refs: BTreeSet::new(),
    };

    // Duplicate refs to the same section collapse through the sets.
    for parent in parent_refs {
        let section = parent.section_name.clone().unwrap_or_default();

        if parent_gateway_id(parent, &id.namespace) != gateway.id || !has_rules {
            entry.invalid_section_refs.insert(section);
            continue;
        }

        match parent.section_name.as_deref() {
            Some(name) => match gateway.listeners.get_mut(name) {
                Some(listener) if listener.valid => {
                    let accepted = intersections(&hostnames, listener);
                    if accepted.is_empty() {
                        entry.invalid_section_refs.insert(section);
                    } else {
                        attach(listener, id, accepted);
                        entry.valid_section_refs.insert(section);
                    }
                }
                _ => {
                    entry.invalid_section_refs.insert(section);
                }
            },
            None => {
                // A section-less ref binds to every valid listener whose
                // hostname intersects.
                let mut matched = false;
                for (name, listener) in gateway.listeners.iter_mut() {
                    if !listener.valid {
                        continue;
                    }
                    let accepted = intersections(&hostnames, listener);
                    if accepted.is_empty() {
                        continue;
                    }
                    attach(listener, id, accepted);
                    entry.valid_section_refs.insert(name.clone());
                    matched = true;
                }
                if !matched {
                    entry.invalid_section_refs.insert(section);
                }
            }
        }
    }

    // A ref recorded invalid under a name that also attached (e.g. one ref
    // with a section name, one without) counts as attached.
    let resolved = entry
        .invalid_section_refs
        .difference(&entry.valid_section_refs)
        .cloned()
        .collect();
    entry.invalid_section_refs = resolved;

    Some(entry)
}

fn attach(listener: &mut ListenerEntry, route: &ResourceId, accepted: BTreeSet<String>) {
    listener.accepted_hostnames.extend(accepted.iter().cloned());
    listener
        .attached_routes
        .entry(route.clone())
        .or_default()
        .extend(accepted);
}

fn targets_gateway_kind(parent: &gateway::ParentReference) -> bool {
    parent.group.as_deref().map_or(true, |g| g == GATEWAY_API_GROUP)
        && parent.kind.as_deref().map_or(true, |k| k == "Gateway")
        && !parent.name.is_empty()
}

fn parent_gateway_id(parent: &gateway::ParentReference, route_ns: &str) -> ResourceId {
    let namespace = parent.namespace.as_deref().unwrap_or(route_ns);
    ResourceId::new(namespace, parent.name.clone())
}

/// The route's hostname patterns; an absent or empty list is unrestricted.
fn route_hostnames(route: &gateway::HttpRoute) -> Vec<String> {
    let hostnames = route
        .spec
        .hostnames
        .clone()
        .unwrap_or_default();
    if hostnames.is_empty() {
        vec![String::new()]
    } else {
        hostnames
    }
}

/// Every non-empty intersection of the route's hostnames with the listener
/// hostname.
fn intersections(route_hostnames: &[String], listener: &ListenerEntry) -> BTreeSet<String> {
    let listener_hostname = listener.listener.hostname.as_deref().unwrap_or("");
    route_hostnames
        .iter()
        .filter_map(|h| intersect_hostnames(listener_hostname, h))
        .collect()
}

/// Intersects two hostname patterns, each either empty (unrestricted), a
/// precise name, or a `*.`-prefixed wildcard matching exactly one extra
/// label. Returns the pattern accepting exactly the overlap, or `None` when
/// the overlap is empty.
fn intersect_hostnames(a: &str, b: &str) -> Option<String> {
    if a.is_empty() && b.is_empty() {
        return Some("*".to_string());
    }
    if a.is_empty() {
        return Some(b.to_string());
    }
    if b.is_empty() {
        return Some(a.to_string());
    }
    if a == b {
        return Some(a.to_string());
    }

    match (a.strip_prefix("*."), b.strip_prefix("*.")) {
        // Distinct wildcard suffixes never accept a common name: the shorter
        // pattern admits exactly one extra label, the longer needs more.
        (Some(_), Some(_)) => None,
        (Some(suffix), None) => wildcard_accepts(suffix, b).then(|| b.to_string()),
        (None, Some(suffix)) => wildcard_accepts(suffix, a).then(|| a.to_string()),
        (None, None) => None,
    }
}

fn wildcard_accepts(suffix: &str, precise: &str) -> bool {
    precise
        .strip_suffix(suffix)
        .and_then(|rest| rest.strip_suffix('.'))
        .map_or(false, |label| !label.is_empty() && !label.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::intersect_hostnames;

    #[test]
    fn empty_patterns_intersect_as_star() {
        assert_eq!(intersect_hostnames("", ""), Some("*".to_string()));
    }

    #[test]
    fn empty_pattern_adopts_the_other_side() {
        assert_eq!(
            intersect_hostnames("", "foo.example.com"),
            Some("foo.example.com".to_string())
        );
        assert_eq!(
            intersect_hostnames("*.example.com", ""),
            Some("*.example.com".to_string())
        );
    }

    #[test]
    fn equal_patterns_intersect_as_themselves() {
        assert_eq!(
            intersect_hostnames("foo.example.com", "foo.example.com"),
            Some("foo.example.com".to_string())
        );
        assert_eq!(
            intersect_hostnames("*.example.com", "*.example.com"),
            Some("*.example.com".to_string())
        );
    }

    #[test]
    fn wildcard_accepts_single_label_prefixes_only() {
        assert_eq!(
            intersect_hostnames("*.example.com", "foo.example.com"),
            Some("foo.example.com".to_string())
        );
        assert_eq!(intersect_hostnames("*.example.com", "foo.bar.example.com"), None);
        assert_eq!(intersect_hostnames("*.example.com", "example.com"), None);
    }

    #[test]
    fn unrelated_precise_names_do_not_intersect() {
        assert_eq!(intersect_hostnames("foo.example.com", "bar.example.com"), None);
    }

    #[test]
    fn distinct_wildcards_do_not_intersect() {
        assert_eq!(intersect_hostnames("*.example.com", "*.example.net"), None);
        assert_eq!(intersect_hostnames("*.example.com", "*.a.example.com"), None);
    }
}
