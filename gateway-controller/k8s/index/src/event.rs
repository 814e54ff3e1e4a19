use gateway_controller_k8s_api::{self as k8s, gateway};
use gateway_controller_core::ResourceId;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// A resource change observed by the watches.
///
/// The channel preserves per-resource order, so a `Delete` can never overtake
/// the `Upsert` it follows.
#[derive(Clone, Debug)]
pub enum Event {
    Upsert(Resource),
    Delete(ObjectRef),
}

/// The full object carried by an upsert, tagged by kind.
#[derive(Clone, Debug)]
pub enum Resource {
    GatewayClass(gateway::GatewayClass),
    Gateway(gateway::Gateway),
    HttpRoute(gateway::HttpRoute),
    Secret(k8s::Secret),
    Service(k8s::Service),
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    GatewayClass,
    Gateway,
    HttpRoute,
    Secret,
    Service,
}

/// Identifies a tracked object; `namespace` is `None` for the cluster-scoped
/// GatewayClass.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ObjectRef {
    pub kind: Kind,
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectRef {
    pub fn namespaced(kind: Kind, namespace: String, name: String) -> Self {
        Self {
            kind,
            namespace: Some(namespace),
            name,
        }
    }

    pub fn cluster(kind: Kind, name: String) -> Self {
        Self {
            kind,
            namespace: None,
            name,
        }
    }

    pub(crate) fn id(&self) -> ResourceId {
        ResourceId::new(self.namespace.clone().unwrap_or_default(), self.name.clone())
    }
}

pub type SharedEventSender = Arc<RwLock<EventSender>>;

/// Forwards watch updates into the reconciliation channel.
///
/// One shared sender indexes every watched kind; kubert drives it through the
/// `IndexNamespacedResource`/`IndexClusterResource` impls below. Watch
/// restarts use the traits' default `reset`, which replays the restart set as
/// applies plus deletes for vanished names.
pub struct EventSender {
    events: UnboundedSender<Event>,
}

impl EventSender {
    pub fn shared(events: UnboundedSender<Event>) -> SharedEventSender {
        Arc::new(RwLock::new(Self { events }))
    }

    fn send(&self, event: Event) {
        if let Err(error) = self.events.send(event) {
            tracing::error!(%error, "Failed to enqueue event; reconciler has shut down");
        }
    }
}

impl kubert::index::IndexClusterResource<gateway::GatewayClass> for EventSender {
    fn apply(&mut self, resource: gateway::GatewayClass) {
        self.send(Event::Upsert(Resource::GatewayClass(resource)));
    }

    fn delete(&mut self, name: String) {
        self.send(Event::Delete(ObjectRef::cluster(Kind::GatewayClass, name)));
    }
}

impl kubert::index::IndexNamespacedResource<gateway::Gateway> for EventSender {
    fn apply(&mut self, resource: gateway::Gateway) {
        self.send(Event::Upsert(Resource::Gateway(resource)));
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.send(Event::Delete(ObjectRef::namespaced(Kind::Gateway, namespace, name)));
    }
}

impl kubert::index::IndexNamespacedResource<gateway::HttpRoute> for EventSender {
    fn apply(&mut self, resource: gateway::HttpRoute) {
        self.send(Event::Upsert(Resource::HttpRoute(resource)));
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.send(Event::Delete(ObjectRef::namespaced(Kind::HttpRoute, namespace, name)));
    }
}

impl kubert::index::IndexNamespacedResource<k8s::Secret> for EventSender {
    fn apply(&mut self, resource: k8s::Secret) {
        self.send(Event::Upsert(Resource::Secret(resource)));
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.send(Event::Delete(ObjectRef::namespaced(Kind::Secret, namespace, name)));
    }
}

impl kubert::index::IndexNamespacedResource<k8s::Service> for EventSender {
    fn apply(&mut self, resource: k8s::Service) {
        self.send(Event::Upsert(Resource::Service(resource)));
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.send(Event::Delete(ObjectRef::namespaced(Kind::Service, namespace, name)));
    }
}

impl Resource {
    pub fn kind(&self) -> Kind {
        match self {
            Resource::GatewayClass(_) => Kind::GatewayClass,
            Resource::Gateway(_) => Kind::Gateway,
            Resource::HttpRoute(_) => Kind::HttpRoute,
            Resource::Secret(_) => Kind::Secret,
            Resource::Service(_) => Kind::Service,
        }
    }
}
