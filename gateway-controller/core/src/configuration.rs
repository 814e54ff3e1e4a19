//! The routing configuration projected from the resource graph.
//!
//! This is the intermediate the data-plane emitter consumes. Match rules do
//! not copy match or backend details out of their route; they carry indices
//! back into the source spec so the emitter reads them in place.

use crate::ResourceId;
use gateway_controller_k8s_api::{gateway, ResourceExt};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub http_servers: Vec<VirtualServer>,
    pub ssl_servers: Vec<VirtualServer>,
}

/// A server block for one hostname.
#[derive(Clone, Debug)]
pub struct VirtualServer {
    pub hostname: String,
    pub path_rules: Vec<PathRule>,
    pub ssl: Option<Ssl>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ssl {
    pub certificate_path: String,
}

/// All match rules sharing one path prefix within a server.
#[derive(Clone, Debug)]
pub struct PathRule {
    pub path: String,
    pub match_rules: Vec<MatchRule>,
}

/// One match of one rule of an attached HTTPRoute.
#[derive(Clone, Debug)]
pub struct MatchRule {
    pub rule_idx: usize,
    pub match_idx: usize,
    pub source: Arc<gateway::HttpRoute>,
}

impl MatchRule {
    /// The source route's `(namespace, name)`.
    pub fn route_id(&self) -> ResourceId {
        ResourceId::new(
            self.source.namespace().unwrap_or_default(),
            self.source.name_unchecked(),
        )
    }

    /// The match this rule points at, if the indices still resolve.
    pub fn route_match(&self) -> Option<&gateway::HttpRouteMatch> {
        self.source
            .spec
            .rules
            .as_ref()?
            .get(self.rule_idx)?
            .matches
            .as_ref()?
            .get(self.match_idx)
    }

    /// The first backend of the owning rule. Backend weighting is not
    /// supported, so any further backends are not consulted.
    pub fn backend_ref(&self) -> Option<&gateway::BackendRef> {
        self.source
            .spec
            .rules
            .as_ref()?
            .get(self.rule_idx)?
            .backend_refs
            .as_ref()?
            .first()?
            .backend_ref
            .as_ref()
    }

    /// A match is path-only when it constrains nothing besides the path; a
    /// path rule holding a single path-only match needs no dispatch step.
    pub fn is_path_only(&self) -> bool {
        self.route_match().map_or(false, |m| {
            m.method.is_none()
                && m.headers.as_ref().map_or(true, |h| h.is_empty())
                && m.query_params.as_ref().map_or(true, |q| q.is_empty())
        })
    }
}
