//! Startup and shutdown sequencing tests.
//!
//! Drives the same steps `main` runs (config, registration, launch,
//! readiness, deregistration, stop) against mocks.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::IpAddr;
use std::sync::Arc;

use hls_streamer::backend::TranscoderBackend;
use hls_streamer::config::{Config, ConfigError};
use hls_streamer::discovery::{DiscoveryRegistrar, StreamIdentity};
use hls_streamer::observability::HealthState;
use hls_streamer::supervisor::{ProcessSupervisor, StreamEnd};
use streamer_test_utils::{MockProcessRunner, MockRegistry, TestEnv, GST_STATS_LINE};

#[test]
fn test_http_url_rejected_before_any_side_effect() {
    let vars = TestEnv::new().with("RTSP_URL", "http://cam.example.com/live").build();

    let result = Config::from_vars(&vars);

    assert!(matches!(result, Err(ConfigError::InvalidValue(msg)) if msg.contains("rtsp://")));
}

#[test]
fn test_missing_token_is_fatal() {
    let vars = TestEnv::new().without("RTSP_ACCESS_TOKEN").build();

    assert!(matches!(
        Config::from_vars(&vars),
        Err(ConfigError::MissingEnvVar(name)) if name == "RTSP_ACCESS_TOKEN"
    ));
}

#[test]
fn test_config_selects_ffmpeg_backend() {
    let dir = tempfile::tempdir().unwrap();
    let vars = TestEnv::new()
        .with("TRANSCODER_BACKEND", "ffmpeg")
        .with("HLS_DIRECTORY", dir.path().to_str().unwrap())
        .with("HLS_TIME", "4")
        .build();

    let config = Config::from_vars(&vars).unwrap();

    assert_eq!(config.backend, TranscoderBackend::Ffmpeg);
    let command = config.backend.command(&config.settings, config.http_port);
    assert_eq!(command.program, "ffmpeg");
    assert!(command.args.windows(2).any(|w| w == ["-hls_time", "4"]));
}

#[tokio::test]
async fn test_startup_and_shutdown_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let vars = TestEnv::new()
        .with("FEATURE_ENABLE_DISCOVERY", "true")
        .with("ADVERTISE_IP", "10.20.30.40")
        .with("HLS_DIRECTORY", dir.path().to_str().unwrap())
        .build();
    let config = Config::from_vars(&vars).unwrap();
    assert!(config.enable_discovery);

    let registry = MockRegistry::new();
    let runner = MockProcessRunner::new().with_output(GST_STATS_LINE);
    let health = HealthState::new();

    // Registration happens-before launch
    let identity = StreamIdentity::from_settings(&config.settings);
    let registrar = DiscoveryRegistrar::new(Arc::new(registry.clone()), &config.service_prefix);
    let ip: IpAddr = config.advertise_ip.unwrap();
    registrar
        .register(&identity, ip, config.http_port)
        .await
        .unwrap();
    assert_eq!(runner.launch_count(), 0);

    let supervisor = ProcessSupervisor::new(
        config.backend,
        config.http_port,
        Arc::new(runner.clone()),
        None,
    );
    let handle = supervisor.start(&config.settings).unwrap();
    health.set_ready();

    assert_eq!(
        registry.get("/services/hls_streamer_com_tok").as_deref(),
        Some("10.20.30.40:8081")
    );
    assert!(health.is_ready());

    // Shutdown: readiness, then deregistration, then stop
    health.set_not_ready();
    assert!(
        registrar
            .deregister_with_timeout(&identity, config.deregister_timeout)
            .await
    );
    assert!(!handle.has_exited());

    let report = handle.stop(config.stop_grace).await;

    assert!(registry.entries().is_empty());
    assert_eq!(report.exit, StreamEnd::signalled(15));
    assert_eq!(report.drain.lines, 1);
    assert_eq!(runner.launch_count(), 1);
}

#[tokio::test]
async fn test_transcoder_exit_clears_readiness_without_relaunch() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::from_vars(
        &TestEnv::new()
            .with("HLS_DIRECTORY", dir.path().to_str().unwrap())
            .build(),
    )
    .unwrap();
    let runner = MockProcessRunner::new();
    let health = HealthState::new();

    let handle = ProcessSupervisor::new(
        config.backend,
        config.http_port,
        Arc::new(runner.clone()),
        None,
    )
    .start(&config.settings)
    .unwrap();
    health.set_ready();

    runner.exit_last(StreamEnd::exited(255));
    let end = handle.wait().await;
    health.set_not_ready();

    assert_eq!(end, StreamEnd::exited(255));
    assert!(!health.is_ready());
    assert_eq!(runner.launch_count(), 1);
}
