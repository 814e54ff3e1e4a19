use gateway_controller_core::status::Statuses;
use gateway_controller_k8s_index::{
    build_configuration, build_graph, build_statuses, ClusterResolver, ControllerInfo, Event,
    Graph, Store,
};
use gateway_controller_k8s_status::Reporter;
use gateway_controller_nginx::{generate, Emitter, HttpConfig, SecretFile};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::{mpsc, watch};

/// Serializes reconciliation: one event is applied to the store and carried
/// through graph, configuration, statuses, emit, and report before the next
/// event is looked at. There is no coalescing; a failed cycle is not retried
/// and the next event simply recomputes everything from the store.
pub struct EventLoop {
    info: ControllerInfo,
    events: mpsc::UnboundedReceiver<Event>,
    store: Store,
    emitter: Emitter,
    reporter: Reporter,
    shutdown: watch::Receiver<bool>,
}

impl EventLoop {
    pub fn new(
        info: ControllerInfo,
        events: mpsc::UnboundedReceiver<Event>,
        emitter: Emitter,
        reporter: Reporter,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            info,
            events,
            store: Store::default(),
            emitter,
            reporter,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        loop {
            let event = tokio::select! {
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        tracing::debug!("Shutting down");
                        return;
                    }
                    continue;
                }
                event = self.events.recv() => match event {
                    Some(event) => event,
                    None => {
                        tracing::debug!("Event channel closed");
                        return;
                    }
                },
            };

            self.reconcile(event).await;
        }
    }

    async fn reconcile(&mut self, event: Event) {
        match event {
            Event::Upsert(resource) => {
                tracing::debug!(kind = ?resource.kind(), "Applying upsert");
                self.store.apply(resource);
            }
            Event::Delete(reference) => {
                tracing::debug!(kind = ?reference.kind, name = %reference.name, "Applying delete");
                self.store.delete(&reference);
            }
        }

        // A builder panic is a bug, not a reason to stop serving events: the
        // cycle degrades to an empty configuration and no status intents.
        let derived = catch_unwind(AssertUnwindSafe(|| self.derive()));
        let (config, statuses, secrets) = match derived {
            Ok(derived) => derived,
            Err(_) => {
                tracing::error!("Reconciliation panicked; emitting an empty configuration");
                (HttpConfig::default(), Statuses::default(), Vec::new())
            }
        };

        if let Err(error) = self.emitter.emit(&config, &secrets) {
            tracing::error!(%error, "Failed to emit configuration");
        }

        self.reporter.apply(&statuses, &self.shutdown).await;
    }

    fn derive(&self) -> (HttpConfig, Statuses, Vec<SecretFile>) {
        let graph = build_graph(&self.store, &self.info);
        let configuration = build_configuration(&graph);
        let statuses = build_statuses(&graph);

        let resolver = ClusterResolver::new(&self.store, &self.info.dns_domain);
        let config = generate(&configuration, &resolver);
        let secrets = self.referenced_secrets(&graph);

        (config, statuses, secrets)
    }

    /// Certificate payloads for every secret a valid listener references.
    fn referenced_secrets(&self, graph: &Graph) -> Vec<SecretFile> {
        let mut seen = std::collections::BTreeSet::new();
        let mut files = Vec::new();

        for listener in graph
            .gateway
            .iter()
            .flat_map(|gw| gw.listeners.values())
        {
            let secret_ref = match &listener.secret {
                Some(secret_ref) => secret_ref,
                None => continue,
            };
            if !seen.insert(secret_ref.id.clone()) {
                continue;
            }
            match self.store.secret(&secret_ref.id).and_then(|s| SecretFile::from_secret(s)) {
                Some(file) => files.push(file),
                None => {
                    tracing::warn!(secret = %secret_ref.id, "Referenced secret is not a usable TLS secret");
                }
            }
        }

        files
    }
}
