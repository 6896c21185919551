//! # gRPC Server
//!
//! Serves `grpc.health.v1.Health` and `txserve.v1.Greeter`. The empty
//! service name and the Greeter report SERVING while the unit runs and flip
//! to NOT_SERVING as soon as shutdown begins, before in-flight calls have
//! drained.

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic_health::ServingStatus;

use crate::observability::Logger;
use crate::store::BoxFuture;
use crate::supervisor::{ServerUnit, UnitError, UnitSettings};

use super::config::GrpcServerConfig;
use super::greeter::greeter_server::GreeterServer;
use super::greeter::{GreeterService, GREETER_SERVICE_NAME};

/// Service name under which overall health is reported
pub const OVERALL_HEALTH: &str = "";

/// gRPC server unit
pub struct GrpcServer {
    config: GrpcServerConfig,
    settings: UnitSettings,
}

impl GrpcServer {
    /// Unit name reported to the supervisor
    pub const NAME: &'static str = "grpc";

    pub fn new(config: GrpcServerConfig) -> Self {
        Self {
            settings: config.unit_settings(),
            config,
        }
    }

    pub fn config(&self) -> &GrpcServerConfig {
        &self.config
    }
}

impl ServerUnit for GrpcServer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn settings(&self) -> &UnitSettings {
        &self.settings
    }

    fn serve(
        self: Box<Self>,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> BoxFuture<'static, Result<(), UnitError>> {
        Box::pin(async move {
            let (mut reporter, health_service) = tonic_health::server::health_reporter();
            for service in [OVERALL_HEALTH, GREETER_SERVICE_NAME] {
                reporter
                    .set_service_status(service, ServingStatus::Serving)
                    .await;
            }

            let drain = async move {
                shutdown.cancelled().await;
                for service in [OVERALL_HEALTH, GREETER_SERVICE_NAME] {
                    reporter
                        .set_service_status(service, ServingStatus::NotServing)
                        .await;
                }
                Logger::info("GRPC_HEALTH_NOT_SERVING", &[]);
            };

            Server::builder()
                .add_service(health_service)
                .add_service(GreeterServer::new(GreeterService))
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), drain)
                .await
                .map_err(UnitError::serve)
        })
    }
}
