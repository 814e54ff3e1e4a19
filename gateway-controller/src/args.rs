use crate::{
    event_loop::EventLoop,
    validation::{validate_controller_name, validate_resource_name},
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use gateway_controller_k8s_api::{self as k8s, gateway};
use gateway_controller_k8s_index::{ControllerInfo, EventSender};
use gateway_controller_k8s_status::Reporter;
use gateway_controller_nginx::{CommandReload, Emitter};
use kube::runtime::watcher;
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};
use tracing::{info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "gateway-controller", about = "A Gateway API controller for NGINX")]
pub struct Args {
    #[clap(
        long,
        default_value = "gateway_controller=info,warn",
        env = "GATEWAY_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Controller identity, `<domain>/<namespace>/<name>`; the namespace
    /// segment must equal the controller's own namespace.
    #[clap(long)]
    controller_name: String,

    /// Name of the GatewayClass this controller implements.
    #[clap(long)]
    gateway_class_name: String,

    /// Namespace the controller runs in.
    #[clap(long, env = "POD_NAMESPACE", default_value = "default")]
    namespace: String,

    #[clap(long, default_value = "cluster.local")]
    cluster_domain: String,

    /// Directory referenced TLS certificates are written to.
    #[clap(long)]
    secrets_dir: PathBuf,

    /// Path the rendered configuration artifact is written to.
    #[clap(long)]
    config_artifact_path: PathBuf,

    /// Command run after each configuration write.
    #[clap(long, default_value = "nginx -s reload")]
    reload_command: String,
}

// === impl Args ===

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            controller_name,
            gateway_class_name,
            namespace,
            cluster_domain,
            secrets_dir,
            config_artifact_path,
            reload_command,
        } = self;

        validate_controller_name(&controller_name, &namespace)
            .context("invalid --controller-name")?;
        validate_resource_name(&gateway_class_name).context("invalid --gateway-class-name")?;

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_admin(admin.into_builder())
            .with_client(client)
            .build()
            .await?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let events = EventSender::shared(events_tx);

        // Spawn resource watches, all feeding the one event channel.

        let gateway_classes =
            runtime.watch_all::<gateway::GatewayClass>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(events.clone(), gateway_classes)
                .instrument(info_span!("gatewayclasses")),
        );

        let gateways = runtime.watch_all::<gateway::Gateway>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(events.clone(), gateways).instrument(info_span!("gateways")),
        );

        let http_routes = runtime.watch_all::<gateway::HttpRoute>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(events.clone(), http_routes)
                .instrument(info_span!("httproutes")),
        );

        let secrets = runtime.watch_all::<k8s::Secret>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(events.clone(), secrets).instrument(info_span!("secrets")),
        );

        let services = runtime.watch_all::<k8s::Service>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(events.clone(), services).instrument(info_span!("services")),
        );

        // Bridge the runtime's drain signal into the level-triggered flag the
        // event loop and status reporter poll.
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let info = ControllerInfo {
            controller_name: controller_name.clone(),
            gateway_class_name,
            secrets_dir,
            dns_domain: cluster_domain,
        };
        let emitter = Emitter::new(
            config_artifact_path,
            info.secrets_dir.clone(),
            Box::new(CommandReload::new(&reload_command)?),
        );
        let reporter = Reporter::new(runtime.client(), controller_name);

        let event_loop = EventLoop::new(info, events_rx, emitter, reporter, shutdown_rx);
        let reconcile = tokio::spawn(event_loop.run().instrument(info_span!("reconcile")));

        let drain = runtime.shutdown_handle();
        tokio::spawn(async move {
            let release = drain.signaled().await;
            let _ = shutdown_tx.send(true);
            // Hold the drain handle until the in-flight cycle finishes.
            let _ = release.release_after(reconcile).await;
        });

        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
