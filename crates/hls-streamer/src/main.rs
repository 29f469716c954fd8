//! HLS Streamer
//!
//! Pulls an RTSP camera stream through an external transcoder and serves the
//! resulting HLS playlist and segments over HTTP.
//!
//! # Servers
//!
//! - HLS server: `/hls_stream/*`, `/health`, `/ready` (default: 0.0.0.0:8081)
//! - Metrics server: `/metrics` (default: 0.0.0.0:9090, only when
//!   `FEATURE_ENABLE_PROMETHEUS` is set)
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment (exit 1 on error)
//! 2. Initialize logging
//! 3. Create the output directory
//! 4. Install the Prometheus recorder and start the metrics server (optional)
//! 5. Bind the HLS listener
//! 6. Register `<ip>:<port>` in etcd (optional, aborts startup on failure)
//! 7. Launch the transcoder and start serving
//! 8. Wait for shutdown signal; a transcoder exit clears readiness but does
//!    not stop the process
//!
//! # Shutdown
//!
//! Readiness is cleared, the registry key is removed (bounded by
//! `DEREGISTER_TIMEOUT_SECONDS`), the transcoder is stopped (SIGTERM, then
//! SIGKILL after `TRANSCODER_STOP_GRACE_SECONDS`) and the servers drain.

#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // main.rs orchestrates startup, naturally longer

use std::net::SocketAddr;
use std::sync::Arc;

use hls_streamer::config::Config;
use hls_streamer::discovery::{DiscoveryRegistrar, EtcdRegistry, StreamIdentity};
use hls_streamer::errors::StreamerError;
use hls_streamer::host::advertised_ip;
use hls_streamer::observability::{init_metrics_recorder, HealthState, MetricsSink, PrometheusSink};
use hls_streamer::routes::{build_routes, metrics_routes};
use hls_streamer::supervisor::{ProcessSupervisor, SystemProcessRunner};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Targets covered by the default log filter.
const LOG_TARGETS: &[&str] = &["hls_streamer", "hls", "tower_http"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration errors are reported before logging exists
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("hls-streamer: {e}");
            std::process::exit(1);
        }
    };

    common::observability::init_tracing(LOG_TARGETS, &config.observability)?;

    info!("Starting HLS Streamer");
    info!(
        url = %config.settings.url,
        directory = %config.settings.directory.display(),
        segment_duration = config.settings.segment_duration,
        list_size = config.settings.list_size,
        flags = %config.settings.flags,
        backend = %config.backend,
        http_port = config.http_port,
        enable_discovery = config.enable_discovery,
        enable_prometheus = config.enable_prometheus,
        "Configuration loaded successfully"
    );

    tokio::fs::create_dir_all(&config.settings.directory)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                directory = %config.settings.directory.display(),
                "Failed to create HLS output directory"
            );
            StreamerError::Io(e)
        })?;

    let shutdown_token = CancellationToken::new();
    let health_state = Arc::new(HealthState::new());

    // Metrics: recorder first, then gauges for the active dialect
    let sink: Option<Arc<dyn MetricsSink>> = if config.enable_prometheus {
        info!("Initializing Prometheus metrics recorder...");
        let prometheus_handle = init_metrics_recorder().map_err(|e| {
            error!(error = %e, "Failed to install Prometheus metrics recorder");
            StreamerError::Metrics(e)
        })?;

        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.prom_port));
        let listener = tokio::net::TcpListener::bind(metrics_addr)
            .await
            .map_err(|e| {
                error!(error = %e, addr = %metrics_addr, "Failed to bind metrics server");
                StreamerError::Io(e)
            })?;

        let metrics_shutdown_token = shutdown_token.child_token();
        let app = metrics_routes(prometheus_handle);
        tokio::spawn(async move {
            info!(addr = %metrics_addr, "Metrics server starting");
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                metrics_shutdown_token.cancelled().await;
                info!("Metrics server shutting down");
            });
            if let Err(e) = server.await {
                error!(error = %e, "Metrics server failed");
            }
        });

        let sink: Arc<dyn MetricsSink> = Arc::new(PrometheusSink::new(config.backend.dialect()));
        Some(sink)
    } else {
        None
    };

    // Bind before registering so a taken port fails fast
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %http_addr, "Failed to bind HLS server");
            StreamerError::Io(e)
        })?;

    // Discovery: registration happens-before the transcoder starts
    let identity = StreamIdentity::from_settings(&config.settings);
    let registrar = if config.enable_discovery {
        let registrar = DiscoveryRegistrar::new(
            Arc::new(EtcdRegistry::new(config.etcd_endpoint())),
            config.service_prefix.clone(),
        );
        let ip = advertised_ip(config.advertise_ip).await;

        info!(
            etcd = %config.etcd_endpoint(),
            key = %registrar.service_key(&identity),
            ip = %ip,
            port = config.http_port,
            "Registering service..."
        );

        tokio::select! {
            () = shutdown_signal() => {
                info!("Shutdown signal received during registration, exiting");
                return Ok(());
            }
            result = registrar.register(&identity, ip, config.http_port) => {
                result.map_err(|e| {
                    error!(error = %e, "Service registration failed");
                    StreamerError::Registry(e)
                })?;
            }
        }
        Some(registrar)
    } else {
        None
    };

    // Transcoder
    let supervisor = ProcessSupervisor::new(
        config.backend,
        config.http_port,
        Arc::new(SystemProcessRunner),
        sink,
    );
    let handle = match supervisor.start(&config.settings) {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "Failed to start transcoder");
            if let Some(registrar) = &registrar {
                registrar
                    .deregister_with_timeout(&identity, config.deregister_timeout)
                    .await;
            }
            return Err(StreamerError::Start(e).into());
        }
    };
    health_state.set_ready();

    // HLS server
    let app = build_routes(&config.settings.directory, Arc::clone(&health_state));
    let http_shutdown_token = shutdown_token.child_token();
    let http_server = tokio::spawn(async move {
        info!(addr = %http_addr, "HLS server starting");
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            http_shutdown_token.cancelled().await;
            info!("HLS server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "HLS server failed");
        }
    });

    info!("HLS Streamer running - press Ctrl+C to shutdown");

    // A transcoder exit is reported once; the process keeps serving what is
    // on disk until told to stop
    tokio::select! {
        () = shutdown_signal() => {}
        end = handle.wait() => {
            health_state.set_not_ready();
            warn!(exit = %end, "Transcoder exited, no longer ready");
            shutdown_signal().await;
        }
    }

    info!("Shutdown signal received, initiating graceful shutdown...");
    health_state.set_not_ready();

    if let Some(registrar) = &registrar {
        registrar
            .deregister_with_timeout(&identity, config.deregister_timeout)
            .await;
    }

    handle.stop(config.stop_grace).await;

    shutdown_token.cancel();
    if let Err(e) = http_server.await {
        warn!(error = %e, "HLS server task failed");
    }

    info!("HLS Streamer shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
