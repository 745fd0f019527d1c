//! Demo Tenon server.
//!
//! Serves the tenant-scoped request pipeline and runs a worker that logs
//! each restored deferred job. Seed tenants with `--tenant 5550001` and
//! schedule work with `POST /5550001/jobs`.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use axum::ServiceExt as _;
use clap::Parser;
use tenon_core::{ResolverConfig, TenantDirectory, TenantId, TenantRecord};
use tenon_server::network::{build_app, AppState, NetworkConfig};
use tenon_server::worker::{
    DeferredRunnable, EnvelopeQueue, InMemoryQueue, JobPayload, WorkerConfig, WorkerPipeline,
};
use tenon_server::InMemoryDirectory;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "tenon-server",
    about = "Tenant-scoped context propagation demo server"
)]
struct Args {
    /// Bind address.
    #[arg(long, default_value = "127.0.0.1", env = "TENON_HOST")]
    host: String,

    /// Port to listen on (0 = OS-assigned).
    #[arg(long, default_value_t = 8080, env = "TENON_PORT")]
    port: u16,

    /// Minimum digit count for tenant path segments.
    #[arg(long, default_value_t = 7)]
    min_tenant_digits: u32,

    /// Tenant ids to seed into the directory at startup. Repeatable.
    #[arg(long = "tenant", value_name = "ID")]
    tenants: Vec<u64>,
}

/// Logs each restored job together with the tenant it runs under.
struct LoggingRunnable;

#[async_trait::async_trait]
impl DeferredRunnable for LoggingRunnable {
    type Payload = JobPayload;

    async fn run(&mut self, payload: JobPayload) -> anyhow::Result<()> {
        let tenant = tenon_core::current_tenant()?.map(|t| t.id.to_string());
        info!(
            job_id = %payload.job_id,
            kind = %payload.kind,
            tenant = tenant.as_deref(),
            "deferred job executed"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = Arc::new(NetworkConfig {
        host: args.host.clone(),
        port: args.port,
        tenancy: ResolverConfig {
            min_digits: args.min_tenant_digits,
        },
        ..NetworkConfig::default()
    });

    let directory = Arc::new(InMemoryDirectory::new());
    for id in &args.tenants {
        directory.insert(TenantRecord::new(TenantId::new(*id), format!("tenant-{id}")));
    }
    info!(tenants = args.tenants.len(), "seeded tenant directory");

    let queue = Arc::new(InMemoryQueue::new());

    let state = AppState {
        directory: Arc::clone(&directory),
        queue: Arc::clone(&queue) as Arc<dyn EnvelopeQueue>,
        config: Arc::clone(&config),
        start_time: Instant::now(),
    };

    let mut worker = WorkerPipeline::start(
        LoggingRunnable,
        queue as Arc<dyn EnvelopeQueue>,
        directory as Arc<dyn TenantDirectory>,
        WorkerConfig::default(),
    );

    let app = build_app(state).context("invalid tenancy configuration")?;

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .context("bind failed")?;
    info!(addr = %listener.local_addr()?, "tenon server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    worker.stop().await;
    Ok(())
}
