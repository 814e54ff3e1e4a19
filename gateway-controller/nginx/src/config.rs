//! The emitted configuration artifact.
//!
//! Each virtual server renders to a hostname plus an ordered list of
//! locations. A path with a single path-only match becomes one direct
//! location; anything else becomes one internal location per match plus a
//! dispatch location carrying the serialized match descriptors.

use gateway_controller_core::{
    configuration::{Configuration, MatchRule, PathRule, VirtualServer},
    dispatch::MatchDescriptor,
    resolve::{ResolveBackend, UNRESOLVED_BACKEND},
};
use serde::Serialize;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    pub http_servers: Vec<Server>,
    pub ssl_servers: Vec<Server>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl: Option<Ssl>,
    pub locations: Vec<Location>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ssl {
    pub certificate_path: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub path: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub internal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_match_var: Option<String>,
}

pub fn generate(configuration: &Configuration, resolve: &dyn ResolveBackend) -> HttpConfig {
    HttpConfig {
        http_servers: configuration
            .http_servers
            .iter()
            .map(|vs| server(vs, resolve))
            .collect(),
        ssl_servers: configuration
            .ssl_servers
            .iter()
            .map(|vs| server(vs, resolve))
            .collect(),
    }
}

fn server(vs: &VirtualServer, resolve: &dyn ResolveBackend) -> Server {
    Server {
        hostname: vs.hostname.clone(),
        ssl: vs.ssl.as_ref().map(|ssl| Ssl {
            certificate_path: ssl.certificate_path.clone(),
        }),
        locations: vs
            .path_rules
            .iter()
            .flat_map(|rule| locations(rule, resolve))
            .collect(),
    }
}

fn locations(rule: &PathRule, resolve: &dyn ResolveBackend) -> Vec<Location> {
    if let [matched] = rule.match_rules.as_slice() {
        if matched.is_path_only() {
            return vec![Location {
                path: rule.path.clone(),
                proxy_pass: Some(proxy_pass(matched, resolve)),
                ..Default::default()
            }];
        }
    }

    let mut locations = Vec::with_capacity(rule.match_rules.len() + 1);
    let mut descriptors = Vec::with_capacity(rule.match_rules.len());

    for (idx, matched) in rule.match_rules.iter().enumerate() {
        let m = match matched.route_match() {
            Some(m) => m,
            None => {
                tracing::error!(
                    route = %matched.route_id(),
                    rule = matched.rule_idx,
                    "Match rule no longer resolves in its source route"
                );
                continue;
            }
        };
        let redirect = match_location_path(&rule.path, idx);
        descriptors.push(MatchDescriptor::from_route_match(m, redirect.clone()));
        locations.push(Location {
            path: redirect,
            internal: true,
            proxy_pass: Some(proxy_pass(matched, resolve)),
            ..Default::default()
        });
    }

    locations.push(Location {
        path: rule.path.clone(),
        http_match_var: Some(
            serde_json::to_string(&descriptors).expect("descriptors always serialize"),
        ),
        ..Default::default()
    });

    locations
}

/// The internal-only location for match `idx` of a path. Prefix paths are
/// already normalized (absolute, no trailing special characters), so the
/// path itself keeps the generated names collision-free per path.
fn match_location_path(path: &str, idx: usize) -> String {
    format!("{}_route{}", path, idx)
}

fn proxy_pass(matched: &MatchRule, resolve: &dyn ResolveBackend) -> String {
    let backend = match matched.backend_ref() {
        Some(backend) if targets_service_kind(backend) => backend,
        Some(_) => {
            tracing::warn!(route = %matched.route_id(), "Unsupported backend kind");
            return format!("http://{}", UNRESOLVED_BACKEND);
        }
        None => {
            tracing::warn!(route = %matched.route_id(), "Rule has no backend");
            return format!("http://{}", UNRESOLVED_BACKEND);
        }
    };

    let route_id = matched.route_id();
    let namespace = backend
        .inner
        .namespace
        .as_deref()
        .unwrap_or(&route_id.namespace);

    match resolve.resolve(namespace, &backend.inner.name) {
        Ok(address) => match backend.inner.port {
            Some(port) => format!("http://{}:{}", address, port),
            None => format!("http://{}", address),
        },
        Err(error) => {
            tracing::warn!(%error, route = %route_id, "Failed to resolve backend");
            format!("http://{}", UNRESOLVED_BACKEND)
        }
    }
}

fn targets_service_kind(backend: &gateway_controller_k8s_api::gateway::BackendRef) -> bool {
    backend.inner.group.as_deref().map_or(true, |g| g.is_empty())
        && backend.inner.kind.as_deref().map_or(true, |k| k == "Service")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_controller_core::resolve::ResolveError;
    use gateway_controller_k8s_api::{gateway, ObjectMeta};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct StaticResolver(Vec<(String, String, String)>);

    impl ResolveBackend for StaticResolver {
        fn resolve(&self, namespace: &str, name: &str) -> Result<String, ResolveError> {
            self.0
                .iter()
                .find(|(ns, n, _)| ns == namespace && n == name)
                .map(|(_, _, addr)| addr.clone())
                .ok_or_else(|| {
                    ResolveError::NotFound(gateway_controller_core::ResourceId::new(
                        namespace, name,
                    ))
                })
        }
    }

    fn resolver() -> StaticResolver {
        StaticResolver(vec![(
            "test".to_string(),
            "service1".to_string(),
            "10.0.0.1".to_string(),
        )])
    }

    fn make_route(name: &str, rules: Vec<gateway::HttpRouteRule>) -> Arc<gateway::HttpRoute> {
        Arc::new(gateway::HttpRoute {
            metadata: ObjectMeta {
                namespace: Some("test".to_string()),
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: gateway::HttpRouteSpec {
                inner: gateway::CommonRouteSpec { parent_refs: None },
                hostnames: None,
                rules: Some(rules),
            },
            status: None,
        })
    }

    fn make_rule(
        matches: Vec<gateway::HttpRouteMatch>,
        backend: Option<(&str, u16)>,
    ) -> gateway::HttpRouteRule {
        gateway::HttpRouteRule {
            matches: Some(matches),
            filters: None,
            backend_refs: backend.map(|(name, port)| {
                vec![gateway::HttpBackendRef {
                    backend_ref: Some(gateway::BackendRef {
                        weight: None,
                        inner: gateway::BackendObjectReference {
                            group: None,
                            kind: None,
                            name: name.to_string(),
                            namespace: None,
                            port: Some(port),
                        },
                    }),
                    filters: None,
                }]
            }),
        }
    }

    fn path_match(path: &str) -> gateway::HttpRouteMatch {
        gateway::HttpRouteMatch {
            path: Some(gateway::HttpPathMatch::PathPrefix {
                value: path.to_string(),
            }),
            headers: None,
            query_params: None,
            method: None,
        }
    }

    fn path_rule(path: &str, matches: Vec<MatchRule>) -> PathRule {
        PathRule {
            path: path.to_string(),
            match_rules: matches,
        }
    }

    #[test]
    fn single_path_only_match_renders_a_direct_location() {
        let route = make_route(
            "hr1",
            vec![make_rule(vec![path_match("/")], Some(("service1", 80)))],
        );
        let configuration = Configuration {
            http_servers: vec![VirtualServer {
                hostname: "foo.example.com".to_string(),
                path_rules: vec![path_rule(
                    "/",
                    vec![MatchRule {
                        rule_idx: 0,
                        match_idx: 0,
                        source: route,
                    }],
                )],
                ssl: None,
            }],
            ssl_servers: Vec::new(),
        };

        let rendered = generate(&configuration, &resolver());

        assert_eq!(
            rendered.http_servers,
            vec![Server {
                hostname: "foo.example.com".to_string(),
                ssl: None,
                locations: vec![Location {
                    path: "/".to_string(),
                    proxy_pass: Some("http://10.0.0.1:80".to_string()),
                    ..Default::default()
                }],
            }]
        );
        assert!(rendered.ssl_servers.is_empty());
    }

    #[test]
    fn multiple_matches_render_internal_locations_and_a_dispatcher() {
        let get_match = gateway::HttpRouteMatch {
            path: Some(gateway::HttpPathMatch::PathPrefix {
                value: "/test".to_string(),
            }),
            headers: Some(vec![
                gateway::HttpHeaderMatch::Exact {
                    name: "Version".to_string(),
                    value: "V1".to_string(),
                },
                gateway::HttpHeaderMatch::Exact {
                    name: "X".to_string(),
                    value: "y".to_string(),
                },
            ]),
            query_params: None,
            method: Some("GET".to_string()),
        };
        let post_match = gateway::HttpRouteMatch {
            path: Some(gateway::HttpPathMatch::PathPrefix {
                value: "/test".to_string(),
            }),
            headers: None,
            query_params: None,
            method: Some("POST".to_string()),
        };
        let route = make_route(
            "hr1",
            vec![
                make_rule(vec![get_match], Some(("service1", 80))),
                make_rule(vec![post_match], Some(("service1", 80))),
            ],
        );

        let configuration = Configuration {
            http_servers: vec![VirtualServer {
                hostname: "foo.example.com".to_string(),
                path_rules: vec![path_rule(
                    "/test",
                    vec![
                        MatchRule {
                            rule_idx: 0,
                            match_idx: 0,
                            source: route.clone(),
                        },
                        MatchRule {
                            rule_idx: 1,
                            match_idx: 0,
                            source: route,
                        },
                    ],
                )],
                ssl: None,
            }],
            ssl_servers: Vec::new(),
        };

        let rendered = generate(&configuration, &resolver());

        assert_eq!(
            rendered.http_servers[0].locations,
            vec![
                Location {
                    path: "/test_route0".to_string(),
                    internal: true,
                    proxy_pass: Some("http://10.0.0.1:80".to_string()),
                    ..Default::default()
                },
                Location {
                    path: "/test_route1".to_string(),
                    internal: true,
                    proxy_pass: Some("http://10.0.0.1:80".to_string()),
                    ..Default::default()
                },
                Location {
                    path: "/test".to_string(),
                    http_match_var: Some(
                        r#"[{"method":"GET","headers":["Version:V1","X:y"],"redirectPath":"/test_route0"},{"method":"POST","redirectPath":"/test_route1"}]"#
                            .to_string()
                    ),
                    ..Default::default()
                },
            ]
        );
    }

    #[test]
    fn unresolvable_backend_proxies_to_the_placeholder() {
        let route = make_route(
            "hr1",
            vec![make_rule(vec![path_match("/")], Some(("missing", 80)))],
        );
        let configuration = Configuration {
            http_servers: vec![VirtualServer {
                hostname: "foo.example.com".to_string(),
                path_rules: vec![path_rule(
                    "/",
                    vec![MatchRule {
                        rule_idx: 0,
                        match_idx: 0,
                        source: route,
                    }],
                )],
                ssl: None,
            }],
            ssl_servers: Vec::new(),
        };

        let rendered = generate(&configuration, &resolver());
        assert_eq!(
            rendered.http_servers[0].locations[0].proxy_pass.as_deref(),
            Some("http://invalid-backend-ref")
        );
    }

    #[test]
    fn rule_without_backends_proxies_to_the_placeholder() {
        let route = make_route("hr1", vec![make_rule(vec![path_match("/")], None)]);
        let configuration = Configuration {
            http_servers: vec![VirtualServer {
                hostname: "foo.example.com".to_string(),
                path_rules: vec![path_rule(
                    "/",
                    vec![MatchRule {
                        rule_idx: 0,
                        match_idx: 0,
                        source: route,
                    }],
                )],
                ssl: None,
            }],
            ssl_servers: Vec::new(),
        };

        let rendered = generate(&configuration, &resolver());
        assert_eq!(
            rendered.http_servers[0].locations[0].proxy_pass.as_deref(),
            Some("http://invalid-backend-ref")
        );
    }

    #[test]
    fn ssl_server_carries_its_certificate_path() {
        let route = make_route(
            "hr1",
            vec![make_rule(vec![path_match("/")], Some(("service1", 80)))],
        );
        let configuration = Configuration {
            http_servers: Vec::new(),
            ssl_servers: vec![VirtualServer {
                hostname: "foo.example.com".to_string(),
                path_rules: vec![path_rule(
                    "/",
                    vec![MatchRule {
                        rule_idx: 0,
                        match_idx: 0,
                        source: route,
                    }],
                )],
                ssl: Some(gateway_controller_core::configuration::Ssl {
                    certificate_path: "/etc/gateway/secrets/cafe-secret".to_string(),
                }),
            }],
        };

        let rendered = generate(&configuration, &resolver());
        assert_eq!(
            rendered.ssl_servers[0].ssl,
            Some(Ssl {
                certificate_path: "/etc/gateway/secrets/cafe-secret".to_string()
            })
        );
    }

    #[test]
    fn artifact_serialization_is_stable() {
        let config = HttpConfig {
            http_servers: vec![Server {
                hostname: "foo.example.com".to_string(),
                ssl: None,
                locations: vec![Location {
                    path: "/".to_string(),
                    proxy_pass: Some("http://10.0.0.1:80".to_string()),
                    ..Default::default()
                }],
            }],
            ssl_servers: Vec::new(),
        };

        let first = serde_json::to_string(&config).expect("artifact serializes");
        let second = serde_json::to_string(&config).expect("artifact serializes");
        assert_eq!(first, second);
        assert_eq!(
            first,
            r#"{"httpServers":[{"hostname":"foo.example.com","locations":[{"path":"/","proxyPass":"http://10.0.0.1:80"}]}],"sslServers":[]}"#
        );
    }
}
