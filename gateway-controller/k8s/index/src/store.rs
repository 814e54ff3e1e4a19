use crate::event::{Kind, ObjectRef, Resource};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use gateway_controller_k8s_api::{self as k8s, gateway, ResourceExt};
use gateway_controller_core::ResourceId;
use std::sync::Arc;

/// The latest observed spec of every tracked resource.
///
/// Mutated only by the event loop between reconciliations; the builders
/// borrow it immutably, so a pass always sees one consistent snapshot.
/// Services are tracked by identity alone, resolution being delegated to the
/// backend resolver.
#[derive(Debug, Default)]
pub struct Store {
    gateway_classes: HashMap<String, Arc<gateway::GatewayClass>>,
    gateways: HashMap<ResourceId, Arc<gateway::Gateway>>,
    http_routes: HashMap<ResourceId, Arc<gateway::HttpRoute>>,
    secrets: HashMap<ResourceId, Arc<k8s::Secret>>,
    services: HashSet<ResourceId>,
}

impl Store {
    pub fn apply(&mut self, resource: Resource) {
        match resource {
            Resource::GatewayClass(gc) => {
                self.gateway_classes.insert(gc.name_unchecked(), Arc::new(gc));
            }
            Resource::Gateway(gw) => {
                let id = namespaced_id(&gw, "Gateway");
                self.gateways.insert(id, Arc::new(gw));
            }
            Resource::HttpRoute(route) => {
                let id = namespaced_id(&route, "HTTPRoute");
                self.http_routes.insert(id, Arc::new(route));
            }
            Resource::Secret(secret) => {
                let id = namespaced_id(&secret, "Secret");
                self.secrets.insert(id, Arc::new(secret));
            }
            Resource::Service(svc) => {
                self.services.insert(namespaced_id(&svc, "Service"));
            }
        }
    }

    pub fn delete(&mut self, reference: &ObjectRef) {
        match reference.kind {
            Kind::GatewayClass => {
                self.gateway_classes.remove(&reference.name);
            }
            Kind::Gateway => {
                self.gateways.remove(&reference.id());
            }
            Kind::HttpRoute => {
                self.http_routes.remove(&reference.id());
            }
            Kind::Secret => {
                self.secrets.remove(&reference.id());
            }
            Kind::Service => {
                self.services.remove(&reference.id());
            }
        }
    }

    pub fn gateway_class(&self, name: &str) -> Option<&Arc<gateway::GatewayClass>> {
        self.gateway_classes.get(name)
    }

    pub fn gateways(&self) -> impl Iterator<Item = (&ResourceId, &Arc<gateway::Gateway>)> {
        self.gateways.iter()
    }

    pub fn http_routes(&self) -> impl Iterator<Item = (&ResourceId, &Arc<gateway::HttpRoute>)> {
        self.http_routes.iter()
    }

    pub fn secret(&self, id: &ResourceId) -> Option<&Arc<k8s::Secret>> {
        self.secrets.get(id)
    }

    pub fn has_service(&self, id: &ResourceId) -> bool {
        self.services.contains(id)
    }
}

fn namespaced_id<T: ResourceExt>(resource: &T, kind: &str) -> ResourceId {
    let namespace = resource
        .namespace()
        .unwrap_or_else(|| panic!("{} must have a namespace", kind));
    ResourceId::new(namespace, resource.name_unchecked())
}
