//! The contract between the configuration and the data-plane request
//! dispatcher.
//!
//! When several match rules share a path, the rendered location carries a
//! JSON array of [`MatchDescriptor`]s and the dispatcher picks the first one
//! that matches the request, redirecting internally to the match's dedicated
//! location. [`dispatch`] is the reference implementation of that selection;
//! the sidecar must agree with it.

use gateway_controller_k8s_api::gateway;
use serde::{Deserialize, Serialize};

/// One entry of the serialized match list for a path.
///
/// Headers are rendered as `Name:value`, query params as `name=value`.
/// Fields that do not constrain the request are omitted from the wire form.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDescriptor {
    #[serde(default, skip_serializing_if = "is_false")]
    pub any: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_params: Vec<String>,

    /// The internal-only location the dispatcher redirects to on a match.
    pub redirect_path: String,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl MatchDescriptor {
    /// Builds the descriptor for a route match.
    ///
    /// Regex-typed header and query-param matches are not expressible by the
    /// dispatcher and are dropped. A match left with no method, headers, or
    /// params matches unconditionally.
    pub fn from_route_match(m: &gateway::HttpRouteMatch, redirect_path: String) -> Self {
        let headers = m
            .headers
            .iter()
            .flatten()
            .filter_map(|h| match h {
                gateway::HttpHeaderMatch::Exact { name, value } => {
                    Some(format!("{}:{}", name, value))
                }
                gateway::HttpHeaderMatch::RegularExpression { .. } => None,
            })
            .collect::<Vec<_>>();

        let query_params = m
            .query_params
            .iter()
            .flatten()
            .filter_map(|q| match q {
                gateway::HttpQueryParamMatch::Exact { name, value } => {
                    Some(format!("{}={}", name, value))
                }
                gateway::HttpQueryParamMatch::RegularExpression { .. } => None,
            })
            .collect::<Vec<_>>();

        let method = m.method.clone();
        let any = method.is_none() && headers.is_empty() && query_params.is_empty();

        Self {
            any,
            method,
            headers,
            query_params,
            redirect_path,
        }
    }
}

/// The request facts the dispatcher selects on.
#[derive(Clone, Debug, Default)]
pub struct Request<'a> {
    pub method: &'a str,
    pub headers: Vec<(&'a str, &'a str)>,
    pub query_params: Vec<(&'a str, &'a str)>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome<'a> {
    /// Redirect internally to the selected match location.
    Redirect(&'a str),
    NotFound,
    MethodNotAllowed,
}

/// Selects among the descriptors of one path, in order.
///
/// Method comparison is case-sensitive (methods are upper-case on the wire).
/// Header names compare case-insensitively; header values, query-param names,
/// and query-param values compare exactly. When every descriptor is
/// method-guarded and none of the guards matched the request method, the
/// outcome is 405 rather than 404.
pub fn dispatch<'d>(descriptors: &'d [MatchDescriptor], req: &Request<'_>) -> Outcome<'d> {
    let mut method_guarded = !descriptors.is_empty();
    let mut method_matched = false;

    for d in descriptors {
        if d.any {
            return Outcome::Redirect(&d.redirect_path);
        }

        let mut matches = true;
        match &d.method {
            Some(method) => {
                if method == req.method {
                    method_matched = true;
                } else {
                    matches = false;
                }
            }
            None => method_guarded = false,
        }

        if matches && !headers_match(&d.headers, &req.headers) {
            matches = false;
        }
        if matches && !params_match(&d.query_params, &req.query_params) {
            matches = false;
        }

        if matches {
            return Outcome::Redirect(&d.redirect_path);
        }
    }

    if method_guarded && !method_matched {
        Outcome::MethodNotAllowed
    } else {
        Outcome::NotFound
    }
}

fn headers_match(wanted: &[String], present: &[(&str, &str)]) -> bool {
    wanted.iter().all(|spec| {
        let (name, value) = match spec.split_once(':') {
            Some(split) => split,
            None => return false,
        };
        present
            .iter()
            .any(|(n, v)| n.eq_ignore_ascii_case(name) && *v == value)
    })
}

fn params_match(wanted: &[String], present: &[(&str, &str)]) -> bool {
    wanted.iter().all(|spec| {
        let (name, value) = match spec.split_once('=') {
            Some(split) => split,
            None => return false,
        };
        present.iter().any(|(n, v)| *n == name && *v == value)
    })
}
