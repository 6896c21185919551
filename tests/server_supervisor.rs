//! Server Supervisor Tests
//!
//! Runs real HTTP and gRPC units on ephemeral loopback ports and checks
//! start-up, draining shutdown, bounded shutdown and failure propagation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;
use txserve::grpc_server::{GreeterClient, GrpcServer, GrpcServerConfig, HelloRequest, GREETER_SERVICE_NAME};
use txserve::http_server::{HttpServer, HttpServerConfig};
use txserve::observability::MetricsRegistry;
use txserve::store::{BoxFuture, MemoryStore};
use txserve::supervisor::{ServerUnit, Supervisor, UnitError, UnitSettings, UnitState};
use txserve::users::UserService;

// =============================================================================
// Helper Functions
// =============================================================================

fn http_unit(port: u16) -> HttpServer {
    let config = HttpServerConfig {
        host: "127.0.0.1".to_string(),
        port,
        ..Default::default()
    };
    HttpServer::new(
        config,
        UserService::new(MemoryStore::new()),
        Arc::new(MetricsRegistry::new()),
    )
}

fn grpc_unit() -> GrpcServer {
    GrpcServer::new(GrpcServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    })
}

/// Minimal HTTP/1.1 GET returning the raw response text
async fn http_get(addr: SocketAddr, path: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    );
    stream.write_all(request.as_bytes()).await?;

    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    Ok(response)
}

/// An axum unit with a single `/slow` route that sleeps for `delay`
struct SlowUnit {
    name: &'static str,
    settings: UnitSettings,
    delay: Duration,
}

impl SlowUnit {
    fn new(name: &'static str, delay: Duration, shutdown_timeout: Duration) -> Self {
        Self {
            name,
            settings: UnitSettings::new("127.0.0.1", 0, shutdown_timeout),
            delay,
        }
    }
}

impl ServerUnit for SlowUnit {
    fn name(&self) -> &str {
        self.name
    }

    fn settings(&self) -> &UnitSettings {
        &self.settings
    }

    fn serve(
        self: Box<Self>,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> BoxFuture<'static, Result<(), UnitError>> {
        let delay = self.delay;
        let router = Router::new().route(
            "/slow",
            get(move || async move {
                tokio::time::sleep(delay).await;
                "finished"
            }),
        );
        Box::pin(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .map_err(UnitError::serve)
        })
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

/// Both units start, answer requests and stop cleanly on shutdown.
#[tokio::test]
async fn test_http_and_grpc_units_serve_then_stop() {
    let supervisor = Supervisor::new()
        .without_signals()
        .with_unit(http_unit(0))
        .with_unit(grpc_unit());
    let handle = supervisor.handle();
    let running = tokio::spawn(supervisor.run());

    let http_addr = handle.wait_started("http").await.unwrap();
    let grpc_addr = handle.wait_started("grpc").await.unwrap();
    assert_eq!(handle.state("http"), Some(UnitState::Running));

    let response = http_get(http_addr, "/health-check").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);

    let mut client = HealthClient::new(
        tonic::transport::Endpoint::new(format!("http://{}", grpc_addr))
            .unwrap()
            .connect()
            .await
            .unwrap(),
    );
    let reply = client
        .check(HealthCheckRequest {
            service: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(reply.into_inner().status, ServingStatus::Serving as i32);
    drop(client);

    handle.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(30), running)
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(handle.state("http"), Some(UnitState::Stopped));
    assert_eq!(handle.state("grpc"), Some(UnitState::Stopped));
}

/// The gRPC unit answers SayHello and reports the Greeter as serving.
#[tokio::test]
async fn test_greeter_says_hello() {
    let supervisor = Supervisor::new().without_signals().with_unit(grpc_unit());
    let handle = supervisor.handle();
    let running = tokio::spawn(supervisor.run());
    let grpc_addr = handle.wait_started("grpc").await.unwrap();

    let mut greeter = GreeterClient::connect(format!("http://{}", grpc_addr))
        .await
        .unwrap();
    let reply = greeter
        .say_hello(HelloRequest {
            name: "Ada".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(reply.into_inner().message, "Hello, Ada");

    let mut health = HealthClient::new(
        tonic::transport::Endpoint::new(format!("http://{}", grpc_addr))
            .unwrap()
            .connect()
            .await
            .unwrap(),
    );
    let status = health
        .check(HealthCheckRequest {
            service: GREETER_SERVICE_NAME.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(status.into_inner().status, ServingStatus::Serving as i32);
    drop(greeter);
    drop(health);

    handle.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(30), running)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok(), "{:?}", result);
}

/// An in-flight request completes before the unit stops.
#[tokio::test]
async fn test_in_flight_request_drains() {
    let supervisor = Supervisor::new().without_signals().with_unit(SlowUnit::new(
        "slow",
        Duration::from_millis(200),
        Duration::from_secs(5),
    ));
    let handle = supervisor.handle();
    let running = tokio::spawn(supervisor.run());

    let addr = handle.wait_started("slow").await.unwrap();
    let request = tokio::spawn(async move { http_get(addr, "/slow").await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    handle.shutdown();

    let response = request.await.unwrap().unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.ends_with("finished"));
    assert!(running.await.unwrap().is_ok());
}

/// Only the unit that cannot drain in time reports a shutdown timeout.
#[tokio::test]
async fn test_shutdown_timeout_reported_per_unit() {
    let supervisor = Supervisor::new()
        .without_signals()
        .with_unit(SlowUnit::new(
            "stuck",
            Duration::from_secs(30),
            Duration::from_millis(200),
        ))
        .with_unit(http_unit(0));
    let handle = supervisor.handle();
    let running = tokio::spawn(supervisor.run());

    let stuck_addr = handle.wait_started("stuck").await.unwrap();
    handle.wait_started("http").await.unwrap();
    let _request = tokio::spawn(async move { http_get(stuck_addr, "/slow").await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    handle.shutdown();
    let err = tokio::time::timeout(Duration::from_secs(30), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();

    assert_eq!(err.failures().len(), 1);
    assert!(err.failure_for("stuck").unwrap().is_shutdown_timeout());
    assert!(err.failure_for("http").is_none());
}

// =============================================================================
// Failure Propagation Tests
// =============================================================================

/// A unit that cannot bind stops its siblings and fails the run.
#[tokio::test]
async fn test_bind_failure_stops_siblings() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let supervisor = Supervisor::new()
        .without_signals()
        .with_unit(http_unit(port))
        .with_unit(grpc_unit());
    let handle = supervisor.handle();

    let err = tokio::time::timeout(Duration::from_secs(10), supervisor.run())
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(
        err.failure_for("http"),
        Some(UnitError::Bind { .. })
    ));
    assert!(err.failure_for("grpc").is_none());
    assert!(handle.is_shutting_down());
    assert_ne!(handle.state("grpc"), Some(UnitState::Running));
}

/// A disabled unit is never started and does not block the run.
#[tokio::test]
async fn test_disabled_unit_is_skipped() {
    let disabled = HttpServer::new(
        HttpServerConfig {
            enabled: false,
            ..Default::default()
        },
        UserService::new(MemoryStore::new()),
        Arc::new(MetricsRegistry::new()),
    );
    let supervisor = Supervisor::new()
        .without_signals()
        .with_unit(disabled)
        .with_unit(grpc_unit());
    let handle = supervisor.handle();
    let running = tokio::spawn(supervisor.run());

    handle.wait_started("grpc").await.unwrap();
    assert_eq!(handle.state("http"), Some(UnitState::Disabled));
    assert!(handle.local_addr("http").is_none());

    handle.shutdown();
    assert!(running.await.unwrap().is_ok());
}

// =============================================================================
// Signal Tests
// =============================================================================

/// A termination signal drains every unit instead of killing the process.
#[cfg(unix)]
#[tokio::test]
async fn test_sigterm_takes_graceful_path() {
    let supervisor = Supervisor::new()
        .with_unit(http_unit(0))
        .with_unit(grpc_unit());
    let handle = supervisor.handle();
    let running = tokio::spawn(supervisor.run());

    handle.wait_started("http").await.unwrap();
    handle.wait_started("grpc").await.unwrap();

    let status = std::process::Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let result = tokio::time::timeout(Duration::from_secs(30), running)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok(), "{:?}", result);
    assert!(handle.is_shutting_down());
    assert_eq!(handle.state("http"), Some(UnitState::Stopped));
    assert_eq!(handle.state("grpc"), Some(UnitState::Stopped));
}
