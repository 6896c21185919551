//! # gRPC Server Module
//!
//! The tonic-based server unit exposing the standard health service and the
//! Greeter service.

pub mod config;
pub mod greeter;
pub mod server;

pub use config::GrpcServerConfig;
pub use greeter::greeter_client::GreeterClient;
pub use greeter::greeter_server::{Greeter, GreeterServer};
pub use greeter::{GreeterService, HelloRequest, HelloResponse, GREETER_SERVICE_NAME};
pub use server::{GrpcServer, OVERALL_HEALTH};
