use crate::conditions;
use chrono::{DateTime, Utc};
use gateway_controller_core::status::Statuses;
use gateway_controller_k8s_api::{gateway, Api, Client, Patch, PatchParams, ResourceExt};
use tokio::sync::watch;

/// Writes status intents back to their source resources.
pub struct Reporter {
    client: Client,
    controller_name: String,
    patch_params: PatchParams,
    clock: fn() -> DateTime<Utc>,
}

impl Reporter {
    pub fn new(client: Client, controller_name: String) -> Self {
        Self {
            client,
            controller_name,
            patch_params: PatchParams::apply("gateway-controller"),
            clock: Utc::now,
        }
    }

    /// Applies every intent, checking `shutdown` between resources. An
    /// update already in flight when the signal fires still completes.
    pub async fn apply(&self, statuses: &Statuses, shutdown: &watch::Receiver<bool>) {
        if let Some(class) = &statuses.gateway_class {
            self.update_gateway_class(class).await;
        }

        if let Some(intent) = &statuses.gateway {
            if *shutdown.borrow() {
                tracing::debug!("Shutting down; skipping remaining status updates");
                return;
            }
            self.update_gateway(intent).await;
        }

        for intent in &statuses.ignored_gateways {
            if *shutdown.borrow() {
                tracing::debug!("Shutting down; skipping remaining status updates");
                return;
            }
            self.update_ignored_gateway(intent).await;
        }

        for intent in &statuses.http_routes {
            if *shutdown.borrow() {
                tracing::debug!("Shutting down; skipping remaining status updates");
                return;
            }
            self.update_http_route(statuses, intent).await;
        }
    }

    async fn update_gateway_class(
        &self,
        intent: &gateway_controller_core::status::GatewayClassStatus,
    ) {
        let api = Api::<gateway::GatewayClass>::all(self.client.clone());

        // The resource may have moved on since the graph was built; the
        // read is what keeps this a status update rather than a blind write.
        if let Err(error) = api.get(&intent.name).await {
            tracing::warn!(%error, name = %intent.name, "Failed to fetch GatewayClass");
            return;
        }

        let status = gateway::GatewayClassStatus {
            conditions: Some(conditions::gateway_class(intent, (self.clock)())),
        };
        let patch = serde_json::json!({ "status": status });
        if let Err(error) = api
            .patch_status(&intent.name, &self.patch_params, &Patch::Merge(&patch))
            .await
        {
            tracing::warn!(%error, name = %intent.name, "Failed to patch GatewayClass status");
        }
    }

    async fn update_gateway(&self, intent: &gateway_controller_core::status::GatewayStatus) {
        let api = Api::<gateway::Gateway>::namespaced(self.client.clone(), &intent.id.namespace);

        if let Err(error) = api.get(&intent.id.name).await {
            tracing::warn!(%error, gateway = %intent.id, "Failed to fetch Gateway");
            return;
        }

        let status = gateway::GatewayStatus {
            addresses: None,
            conditions: None,
            listeners: Some(conditions::gateway_listeners(intent, (self.clock)())),
        };
        let patch = serde_json::json!({ "status": status });
        if let Err(error) = api
            .patch_status(&intent.id.name, &self.patch_params, &Patch::Merge(&patch))
            .await
        {
            tracing::warn!(%error, gateway = %intent.id, "Failed to patch Gateway status");
        }
    }

    async fn update_ignored_gateway(
        &self,
        intent: &gateway_controller_core::status::IgnoredGatewayStatus,
    ) {
        let api = Api::<gateway::Gateway>::namespaced(self.client.clone(), &intent.id.namespace);

        if let Err(error) = api.get(&intent.id.name).await {
            tracing::warn!(%error, gateway = %intent.id, "Failed to fetch ignored Gateway");
            return;
        }

        let status = gateway::GatewayStatus {
            addresses: None,
            conditions: Some(conditions::ignored_gateway(intent, (self.clock)())),
            listeners: None,
        };
        let patch = serde_json::json!({ "status": status });
        if let Err(error) = api
            .patch_status(&intent.id.name, &self.patch_params, &Patch::Merge(&patch))
            .await
        {
            tracing::warn!(%error, gateway = %intent.id, "Failed to patch ignored Gateway status");
        }
    }

    async fn update_http_route(
        &self,
        statuses: &Statuses,
        intent: &gateway_controller_core::status::HttpRouteStatus,
    ) {
        // Every parent status points at the chosen gateway; without one no
        // route intents are collected.
        let gateway_id = match &statuses.gateway {
            Some(gw) => &gw.id,
            None => return,
        };

        let api = Api::<gateway::HttpRoute>::namespaced(self.client.clone(), &intent.id.namespace);

        let current = match api.get(&intent.id.name).await {
            Ok(route) => route,
            Err(error) => {
                tracing::warn!(%error, route = %intent.id, "Failed to fetch HTTPRoute");
                return;
            }
        };

        let status = conditions::http_route_parents(
            intent,
            gateway_id,
            &self.controller_name,
            (self.clock)(),
        );
        let patch = serde_json::json!({ "status": status });
        if let Err(error) = api
            .patch_status(
                &current.name_unchecked(),
                &self.patch_params,
                &Patch::Merge(&patch),
            )
            .await
        {
            tracing::warn!(%error, route = %intent.id, "Failed to patch HTTPRoute status");
        }
    }
}
