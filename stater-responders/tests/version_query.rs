use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use stater::proto::responder_service_server::{ResponderService, ResponderServiceServer};
use stater::proto::stater_service_client::StaterServiceClient;
use stater::proto::{self, CallStatus};
use stater::{MethodCall, StaterService};
use stater_responders::{PlatformVersion, VersionQueryResponder};
use tonic::{Request, Response, Status};

struct TestResponder {
    responder: VersionQueryResponder,
}

#[tonic::async_trait]
impl ResponderService for TestResponder {
    async fn initialize(
        &self,
        _request: Request<proto::InitializeRequest>,
    ) -> Result<Response<proto::InitializeResponse>, Status> {
        Ok(Response::new(proto::InitializeResponse {
            success: true,
            error: String::new(),
        }))
    }

    async fn describe_responder(
        &self,
        _request: Request<proto::DescribeResponderRequest>,
    ) -> Result<Response<proto::DescribeResponderResponse>, Status> {
        let config = self.responder.describe("stater").to_string();
        Ok(Response::new(proto::DescribeResponderResponse { config }))
    }

    async fn handle_call(
        &self,
        request: Request<proto::HandleCallRequest>,
    ) -> Result<Response<proto::HandleCallResponse>, Status> {
        let req = request.into_inner();
        let call = MethodCall::new(req.method);

        let response = match self.responder.handle(&call) {
            Ok(value) => proto::HandleCallResponse {
                status: CallStatus::Ok as i32,
                value,
                error: String::new(),
            },
            Err(err) => proto::HandleCallResponse {
                status: CallStatus::NotImplemented as i32,
                value: String::new(),
                error: err.to_string(),
            },
        };
        Ok(Response::new(response))
    }
}

async fn wait_for_socket(path: &Path) {
    for _ in 0..250 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("socket {:?} did not appear", path);
}

async fn connect_host(socket: PathBuf) -> StaterServiceClient<tonic::transport::Channel> {
    let channel = tonic::transport::Endpoint::from_static("http://[::]:50051")
        .connect_with_connector(tower::service_fn(move |_| {
            let path = socket.clone();
            async move {
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok::<_, std::io::Error>(hyper_util::rt::TokioIo::new(stream))
            }
        }))
        .await
        .expect("connect to stater service");

    StaterServiceClient::new(channel)
}

async fn invoke(
    client: &mut StaterServiceClient<tonic::transport::Channel>,
    channel: &str,
    method: &str,
) -> proto::InvokeMethodResponse {
    client
        .invoke_method(proto::InvokeMethodRequest {
            channel: channel.to_string(),
            method: method.to_string(),
            args: String::new(),
        })
        .await
        .expect("invoke_method RPC")
        .into_inner()
}

#[tokio::test(flavor = "multi_thread")]
async fn version_query_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let host_socket = dir.path().join("stater.sock");
    let responder_socket = dir.path().join("responder.sock");

    // Host service
    let host = Arc::new(StaterService::new());
    {
        let host = host.clone();
        let path = host_socket.clone();
        tokio::spawn(async move {
            if let Err(e) = host.start(&path).await {
                eprintln!("stater service exited: {}", e);
            }
        });
    }

    // Responder server
    let responder = TestResponder {
        responder: VersionQueryResponder::new(PlatformVersion::new("TestOS", "9.9")),
    };
    {
        let path = responder_socket.clone();
        tokio::spawn(async move {
            let listener = tokio::net::UnixListener::bind(&path).unwrap();
            let incoming = tokio_stream::wrappers::UnixListenerStream::new(listener);
            tonic::transport::Server::builder()
                .add_service(ResponderServiceServer::new(responder))
                .serve_with_incoming(incoming)
                .await
                .unwrap();
        });
    }

    wait_for_socket(&host_socket).await;
    wait_for_socket(&responder_socket).await;

    let mut client = connect_host(host_socket.clone()).await;

    // Bind the responder's channel
    let resp = client
        .register_responder(proto::RegisterResponderRequest {
            responder_id: "test-responder".to_string(),
            name: "test-version".to_string(),
            description: "test version responder".to_string(),
            socket_path: responder_socket.to_string_lossy().into_owned(),
            channel: "stater".to_string(),
            methods: vec!["getPlatformVersion".to_string()],
        })
        .await
        .expect("register_responder RPC")
        .into_inner();
    assert!(resp.success, "registration failed: {}", resp.error);

    // The recognized method is relayed with the responder's value
    let resp = invoke(&mut client, "stater", "getPlatformVersion").await;
    assert_eq!(resp.status(), CallStatus::Ok);
    assert_eq!(resp.value, "TestOS 9.9");

    // Repeated calls yield identical values
    let again = invoke(&mut client, "stater", "getPlatformVersion").await;
    assert_eq!(again.value, resp.value);

    // Unknown methods are relayed as not implemented
    let resp = invoke(&mut client, "stater", "ping").await;
    assert_eq!(resp.status(), CallStatus::NotImplemented);
    assert!(resp.value.is_empty());
    assert!(resp.error.contains("ping"));

    // A channel nobody registered fails without dispatch
    let resp = invoke(&mut client, "missing", "getPlatformVersion").await;
    assert_eq!(resp.status(), CallStatus::Failed);
    assert!(resp.error.contains("missing"));

    // The registry reflects the binding
    let listed = client
        .list_responders(proto::ListRespondersRequest {})
        .await
        .expect("list_responders RPC")
        .into_inner();
    assert_eq!(listed.responders.len(), 1);
    assert_eq!(listed.responders[0].channel, "stater");
}
