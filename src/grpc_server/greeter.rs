//! # Greeter Service
//!
//! `txserve.v1.Greeter/SayHello` answers `"Hello, " + name`. Messages and the
//! server/client glue are written out in the shape tonic's code generator
//! emits, so no protobuf toolchain is needed at build time.

use tonic::{Request, Response, Status};

use crate::observability::Logger;

use self::greeter_server::Greeter;

/// Fully qualified service name
pub const GREETER_SERVICE_NAME: &str = "txserve.v1.Greeter";

const SAY_HELLO_PATH: &str = "/txserve.v1.Greeter/SayHello";

#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloResponse {
    #[prost(string, tag = "1")]
    pub message: String,
}

/// Greeter handler served by the gRPC unit
#[derive(Debug, Default, Clone, Copy)]
pub struct GreeterService;

#[tonic::async_trait]
impl Greeter for GreeterService {
    async fn say_hello(
        &self,
        request: Request<HelloRequest>,
    ) -> Result<Response<HelloResponse>, Status> {
        let name = request.into_inner().name;
        Logger::info("GRPC_SAY_HELLO", &[("name", &name)]);
        Ok(Response::new(HelloResponse {
            message: format!("Hello, {}", name),
        }))
    }
}

pub mod greeter_server {
    use tonic::codegen::*;

    use super::{HelloRequest, HelloResponse, GREETER_SERVICE_NAME, SAY_HELLO_PATH};

    #[async_trait]
    pub trait Greeter: Send + Sync + 'static {
        async fn say_hello(
            &self,
            request: tonic::Request<HelloRequest>,
        ) -> Result<tonic::Response<HelloResponse>, tonic::Status>;
    }

    /// Routes Greeter calls to a [`Greeter`] implementation
    #[derive(Debug)]
    pub struct GreeterServer<T> {
        inner: Arc<T>,
    }

    impl<T> GreeterServer<T> {
        pub fn new(inner: T) -> Self {
            Self {
                inner: Arc::new(inner),
            }
        }
    }

    impl<T> Clone for GreeterServer<T> {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    struct SayHelloSvc<T>(Arc<T>);

    impl<T: Greeter> tonic::server::UnaryService<HelloRequest> for SayHelloSvc<T> {
        type Response = HelloResponse;
        type Future = BoxFuture<tonic::Response<HelloResponse>, tonic::Status>;

        fn call(&mut self, request: tonic::Request<HelloRequest>) -> Self::Future {
            let inner = Arc::clone(&self.0);
            Box::pin(async move { inner.say_hello(request).await })
        }
    }

    impl<T, B> Service<http::Request<B>> for GreeterServer<T>
    where
        T: Greeter,
        B: Body + Send + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = std::convert::Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            if req.uri().path() == SAY_HELLO_PATH {
                let method = SayHelloSvc(Arc::clone(&self.inner));
                return Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                    Ok(grpc.unary(method, req).await)
                });
            }

            Box::pin(async move {
                let mut response = http::Response::new(empty_body());
                let headers = response.headers_mut();
                headers.insert(
                    "grpc-status",
                    http::HeaderValue::from(tonic::Code::Unimplemented as i32),
                );
                headers.insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static("application/grpc"),
                );
                Ok(response)
            })
        }
    }

    impl<T> tonic::server::NamedService for GreeterServer<T> {
        const NAME: &'static str = GREETER_SERVICE_NAME;
    }
}

pub mod greeter_client {
    use tonic::codegen::*;

    use super::{HelloRequest, HelloResponse, SAY_HELLO_PATH};

    /// Client for the Greeter service
    #[derive(Debug, Clone)]
    pub struct GreeterClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl GreeterClient<tonic::transport::Channel> {
        /// Connect to `dst`, e.g. `http://127.0.0.1:50051`
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let channel = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(channel))
        }
    }

    impl<T> GreeterClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            Self {
                inner: tonic::client::Grpc::new(inner),
            }
        }

        pub async fn say_hello(
            &mut self,
            request: impl tonic::IntoRequest<HelloRequest>,
        ) -> Result<tonic::Response<HelloResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unknown(format!("service was not ready: {}", e.into()))
            })?;
            let path = http::uri::PathAndQuery::from_static(SAY_HELLO_PATH);
            self.inner
                .unary(request.into_request(), path, tonic::codec::ProstCodec::default())
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::greeter_server::GreeterServer;
    use super::*;
    use tonic::codegen::{http, Service};

    #[tokio::test]
    async fn test_say_hello_greets_by_name() {
        let reply = GreeterService
            .say_hello(Request::new(HelloRequest {
                name: "Ada".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(reply.into_inner().message, "Hello, Ada");

        let empty = GreeterService
            .say_hello(Request::new(HelloRequest::default()))
            .await
            .unwrap();
        assert_eq!(empty.into_inner().message, "Hello, ");
    }

    #[tokio::test]
    async fn test_unknown_method_is_unimplemented() {
        let mut server = GreeterServer::new(GreeterService);
        let request = http::Request::builder()
            .uri("/txserve.v1.Greeter/SayGoodbye")
            .body(tonic::codegen::empty_body())
            .unwrap();

        let response = server.call(request).await.unwrap();
        let status = response.headers().get("grpc-status").unwrap();
        assert_eq!(status.to_str().unwrap(), "12");
    }
}
