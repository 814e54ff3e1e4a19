use crate::ResourceId;

/// The upstream substituted when a backend cannot be resolved; the rendered
/// data-plane template answers it with an immediate 502.
pub const UNRESOLVED_BACKEND: &str = "invalid-backend-ref";

/// Resolves a Service to the single address requests are proxied to.
///
/// Endpoint slicing and per-endpoint load balancing are out of scope; one
/// address per Service is all the configuration carries.
pub trait ResolveBackend {
    fn resolve(&self, namespace: &str, name: &str) -> Result<String, ResolveError>;
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("service {0} has no resolvable address")]
    NotFound(ResourceId),
}
