// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use kube_egress_gateway::{
    azure::arm::ArmClient,
    config::CloudConfig,
    constants::{
        DEFAULT_METRICS_BIND_ADDRESS, ERROR_REQUEUE_DURATION_SECS, KIND_GATEWAY_LB_CONFIGURATION,
        KIND_GATEWAY_VM_CONFIGURATION, KIND_STATIC_GATEWAY_CONFIGURATION, METRICS_SERVER_PATH,
        PENDING_REQUEUE_DURATION_SECS, READY_REQUEUE_DURATION_SECS, TOKIO_WORKER_THREADS,
    },
    context::Context,
    crd::{GatewayLBConfiguration, GatewayVMConfiguration, StaticGatewayConfiguration},
    gateway_errors::reason_for_error,
    metrics,
    reconcilers::{
        reconcile_gateway_lb_configuration, reconcile_gateway_vm_configuration,
        reconcile_static_gateway_configuration, status::record_failure, ReconcileOutcome,
    },
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

/// Static egress gateway controller
#[derive(Parser, Debug)]
#[command(name = "kube-egress-gateway", version, about, long_about = None)]
struct Args {
    /// Path to the cloud configuration JSON file
    #[arg(long, env = "EGRESS_GATEWAY_CLOUD_CONFIG")]
    cloud_config: PathBuf,

    /// File holding the ARM bearer token, re-read on every request
    #[arg(long, env = "EGRESS_GATEWAY_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Address the Prometheus metrics server listens on
    #[arg(long, default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    metrics_bind_address: String,

    /// Requeue interval for fully converged resources, in seconds
    #[arg(long, default_value_t = READY_REQUEUE_DURATION_SECS)]
    requeue_seconds: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("egress-gateway-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    // RUST_LOG picks the level (default info), RUST_LOG_FORMAT=json switches to JSON lines
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting static egress gateway controller");

    let config = CloudConfig::from_file(&args.cloud_config)?;
    debug!(
        subscription = %config.subscription_id,
        load_balancer = %config.load_balancer_name,
        "Cloud configuration loaded"
    );

    let cloud = ArmClient::new(&config.cloud, config.subscription_id.clone(), args.token_file)
        .context("Failed to create ARM client")?;

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;

    let ctx = Arc::new(
        Context::new(client.clone(), Arc::new(cloud), config)
            .with_ready_requeue(Duration::from_secs(args.requeue_seconds)),
    );

    info!("Starting all controllers");

    // Controllers should never exit; if one does, the process exits with it
    tokio::select! {
        result = run_static_gateway_controller(client.clone(), ctx.clone()) => {
            error!("CRITICAL: StaticGatewayConfiguration controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("StaticGatewayConfiguration controller exited unexpectedly without error")
        }
        result = run_gateway_lb_controller(client.clone(), ctx.clone()) => {
            error!("CRITICAL: GatewayLBConfiguration controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("GatewayLBConfiguration controller exited unexpectedly without error")
        }
        result = run_gateway_vm_controller(client.clone(), ctx.clone()) => {
            error!("CRITICAL: GatewayVMConfiguration controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("GatewayVMConfiguration controller exited unexpectedly without error")
        }
        result = run_metrics_server(&args.metrics_bind_address) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}

/// Serve the Prometheus registry over HTTP.
async fn run_metrics_server(bind_address: &str) -> Result<()> {
    let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind metrics server to {bind_address}"))?;
    info!("Serving metrics on {}{}", bind_address, METRICS_SERVER_PATH);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> (StatusCode, String) {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Run the `StaticGatewayConfiguration` controller
async fn run_static_gateway_controller(client: Client, ctx: Arc<Context>) -> Result<()> {
    info!("Starting StaticGatewayConfiguration controller");

    let api = Api::<StaticGatewayConfiguration>::all(client.clone());
    let lb_api = Api::<GatewayLBConfiguration>::all(client);

    Controller::new(api, Config::default())
        .owns(lb_api, Config::default())
        .run(reconcile_static_gateway_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `GatewayLBConfiguration` controller
async fn run_gateway_lb_controller(client: Client, ctx: Arc<Context>) -> Result<()> {
    info!("Starting GatewayLBConfiguration controller");

    let api = Api::<GatewayLBConfiguration>::all(client.clone());
    let vm_api = Api::<GatewayVMConfiguration>::all(client);

    Controller::new(api, Config::default())
        .owns(vm_api, Config::default())
        .run(reconcile_gateway_lb_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `GatewayVMConfiguration` controller
async fn run_gateway_vm_controller(client: Client, ctx: Arc<Context>) -> Result<()> {
    info!("Starting GatewayVMConfiguration controller");

    let api = Api::<GatewayVMConfiguration>::all(client);

    Controller::new(api, Config::default())
        .run(reconcile_gateway_vm_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Map a reconcile outcome to the controller's next action.
fn requeue_action(outcome: ReconcileOutcome, ctx: &Context) -> Action {
    match outcome {
        ReconcileOutcome::Ready => Action::requeue(ctx.ready_requeue),
        ReconcileOutcome::Progressing => {
            Action::requeue(Duration::from_secs(PENDING_REQUEUE_DURATION_SECS))
        }
        ReconcileOutcome::Removed => Action::await_change(),
    }
}

/// Reconcile wrapper for `StaticGatewayConfiguration`
async fn reconcile_static_gateway_wrapper(
    gateway: Arc<StaticGatewayConfiguration>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let kind = KIND_STATIC_GATEWAY_CONFIGURATION;

    match reconcile_static_gateway_configuration(ctx.clone(), (*gateway).clone()).await {
        Ok(outcome) => {
            info!("Successfully reconciled {}: {}", kind, gateway.name_any());
            metrics::record_reconciliation_success(kind, start.elapsed());
            Ok(requeue_action(outcome, &ctx))
        }
        Err(e) => {
            error!("Failed to reconcile {} {}: {:#}", kind, gateway.name_any(), e);
            metrics::record_reconciliation_error(kind, start.elapsed());
            metrics::record_error(kind, reason_for_error(&e));
            let current = gateway
                .status
                .as_ref()
                .map(|s| s.conditions.clone())
                .unwrap_or_default();
            if let Err(status_err) = record_failure(&ctx.client, &*gateway, &current, &e).await {
                warn!("Failed to record failure on {} {}: {}", kind, gateway.name_any(), status_err);
            }
            Err(e.into())
        }
    }
}

/// Reconcile wrapper for `GatewayLBConfiguration`
async fn reconcile_gateway_lb_wrapper(
    lb_config: Arc<GatewayLBConfiguration>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let kind = KIND_GATEWAY_LB_CONFIGURATION;

    match reconcile_gateway_lb_configuration(ctx.clone(), (*lb_config).clone()).await {
        Ok(outcome) => {
            info!("Successfully reconciled {}: {}", kind, lb_config.name_any());
            metrics::record_reconciliation_success(kind, start.elapsed());
            Ok(requeue_action(outcome, &ctx))
        }
        Err(e) => {
            error!("Failed to reconcile {} {}: {:#}", kind, lb_config.name_any(), e);
            metrics::record_reconciliation_error(kind, start.elapsed());
            metrics::record_error(kind, reason_for_error(&e));
            let current = lb_config
                .status
                .as_ref()
                .map(|s| s.conditions.clone())
                .unwrap_or_default();
            if let Err(status_err) =
                record_failure(&ctx.client, &*lb_config, &current, &e).await
            {
                warn!("Failed to record failure on {} {}: {}", kind, lb_config.name_any(), status_err);
            }
            Err(e.into())
        }
    }
}

/// Reconcile wrapper for `GatewayVMConfiguration`
async fn reconcile_gateway_vm_wrapper(
    vm_config: Arc<GatewayVMConfiguration>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let kind = KIND_GATEWAY_VM_CONFIGURATION;

    match reconcile_gateway_vm_configuration(ctx.clone(), (*vm_config).clone()).await {
        Ok(outcome) => {
            info!("Successfully reconciled {}: {}", kind, vm_config.name_any());
            metrics::record_reconciliation_success(kind, start.elapsed());
            Ok(requeue_action(outcome, &ctx))
        }
        Err(e) => {
            error!("Failed to reconcile {} {}: {:#}", kind, vm_config.name_any(), e);
            metrics::record_reconciliation_error(kind, start.elapsed());
            metrics::record_error(kind, reason_for_error(&e));
            let current = vm_config
                .status
                .as_ref()
                .map(|s| s.conditions.clone())
                .unwrap_or_default();
            if let Err(status_err) =
                record_failure(&ctx.client, &*vm_config, &current, &e).await
            {
                warn!("Failed to record failure on {} {}: {}", kind, vm_config.name_any(), status_err);
            }
            Err(e.into())
        }
    }
}

/// Error policy for all controllers
fn error_policy(
    _resource: Arc<impl std::fmt::Debug>,
    _err: &ReconcileError,
    _ctx: Arc<Context>,
) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
