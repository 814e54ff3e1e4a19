use crate::store::Store;
use gateway_controller_core::{
    resolve::{ResolveBackend, ResolveError},
    ResourceId,
};

/// Resolves backend Services through cluster DNS.
///
/// The store tracks Services by identity only, so resolution succeeds exactly
/// when the Service exists; the address is its in-cluster DNS name.
pub struct ClusterResolver<'a> {
    store: &'a Store,
    dns_domain: &'a str,
}

impl<'a> ClusterResolver<'a> {
    pub fn new(store: &'a Store, dns_domain: &'a str) -> Self {
        Self { store, dns_domain }
    }
}

impl ResolveBackend for ClusterResolver<'_> {
    fn resolve(&self, namespace: &str, name: &str) -> Result<String, ResolveError> {
        let id = ResourceId::new(namespace, name);
        if !self.store.has_service(&id) {
            return Err(ResolveError::NotFound(id));
        }
        Ok(format!("{}.{}.svc.{}", name, namespace, self.dns_domain))
    }
}
