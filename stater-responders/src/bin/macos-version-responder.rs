use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use stater::MethodCall;
use stater_responders::platform::macos;
use stater_responders::VersionQueryResponder;
use tokio::sync::RwLock;
use tokio_stream::wrappers::UnixListenerStream;
use tonic::{Request, Response, Status};
use tracing::{error, info};

// Local proto module generated from ../stater/proto/stater.proto
mod proto {
    tonic::include_proto!("stater");
}
use proto::responder_service_server::{ResponderService, ResponderServiceServer};
use proto::stater_service_client::StaterServiceClient;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Stater version responder: macOS", long_about = None)]
struct Args {
    /// Path to the Unix socket this responder listens on
    #[clap(long)]
    socket: Option<String>,

    /// Path to the stater service Unix socket to register with
    #[clap(long)]
    service_socket: Option<String>,

    /// Channel name to bind
    #[clap(long, default_value = "stater")]
    channel: String,

    /// Do not register with the stater service automatically
    #[clap(long)]
    no_register: bool,
}

fn default_stater_socket_path() -> String {
    "/var/run/stater.sock".to_string()
}

fn default_responder_socket_path() -> String {
    "/var/run/stater-macos-version.sock".to_string()
}

struct MacosVersionResponder {
    responder: VersionQueryResponder,
    channel: String,
    inner: Arc<RwLock<ResponderState>>,
}

#[derive(Default)]
struct ResponderState {
    responder_id: Option<String>,
    service_socket_path: Option<String>,
}

#[tonic::async_trait]
impl ResponderService for MacosVersionResponder {
    async fn initialize(
        &self,
        request: Request<proto::InitializeRequest>,
    ) -> Result<Response<proto::InitializeResponse>, Status> {
        let req = request.into_inner();
        {
            let mut st = self.inner.write().await;
            st.responder_id = Some(req.responder_id.clone());
            st.service_socket_path = Some(req.service_socket_path.clone());
        }
        info!(responder_id = %req.responder_id, service = %req.service_socket_path, "macOS version responder initialized");
        Ok(Response::new(proto::InitializeResponse {
            success: true,
            error: String::new(),
        }))
    }

    async fn describe_responder(
        &self,
        _request: Request<proto::DescribeResponderRequest>,
    ) -> Result<Response<proto::DescribeResponderResponse>, Status> {
        let config = self.responder.describe(&self.channel).to_string();
        Ok(Response::new(proto::DescribeResponderResponse { config }))
    }

    async fn handle_call(
        &self,
        request: Request<proto::HandleCallRequest>,
    ) -> Result<Response<proto::HandleCallResponse>, Status> {
        let req = request.into_inner();

        let mut call = MethodCall::new(req.method);
        if !req.args.is_empty() {
            match serde_json::from_str(&req.args) {
                Ok(value) => call.args = Some(value),
                Err(e) => {
                    return Ok(Response::new(proto::HandleCallResponse {
                        status: proto::CallStatus::Failed as i32,
                        value: String::new(),
                        error: format!("invalid args JSON: {}", e),
                    }));
                }
            }
        }

        let response = match self.responder.handle(&call) {
            Ok(value) => proto::HandleCallResponse {
                status: proto::CallStatus::Ok as i32,
                value,
                error: String::new(),
            },
            Err(err) => proto::HandleCallResponse {
                status: proto::CallStatus::NotImplemented as i32,
                value: String::new(),
                error: err.to_string(),
            },
        };
        Ok(Response::new(response))
    }
}

async fn register_with_stater(
    service_socket: String,
    responder_socket: String,
    channel: String,
    methods: Vec<String>,
) {
    use hyper_util::rt::TokioIo;
    use tokio::net::UnixStream;
    use tower::service_fn;

    let responder_id = uuid::Uuid::new_v4().to_string();

    let endpoint = tonic::transport::Endpoint::from_static("http://[::]:50051");
    let sock_for_closure = service_socket.clone();
    let conn = endpoint
        .connect_with_connector(service_fn(move |_| {
            let path = sock_for_closure.clone();
            async move {
                let stream = UnixStream::connect(path).await?;
                Ok::<_, std::io::Error>(TokioIo::new(stream))
            }
        }))
        .await;

    let transport = match conn {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to connect to stater service for registration");
            return;
        }
    };

    let mut client = StaterServiceClient::new(transport);
    let req = proto::RegisterResponderRequest {
        responder_id: responder_id.clone(),
        name: "macos-version".to_string(),
        description: "Version responder for macOS: answers getPlatformVersion with the product version".to_string(),
        socket_path: responder_socket.to_string(),
        channel: channel.clone(),
        methods,
    };
    match client.register_responder(req).await {
        Ok(resp) => {
            let resp = resp.into_inner();
            if resp.success {
                info!(responder_id = %responder_id, channel = %channel, "Registered macos-version responder with stater service");
            } else {
                error!(error = %resp.error, "Responder registration rejected by stater service");
            }
        }
        Err(status) => {
            error!(code = ?status.code(), msg = %status.message(), "Responder registration RPC failed");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let responder_socket = args.socket.unwrap_or_else(default_responder_socket_path);
    let service_socket = args
        .service_socket
        .unwrap_or_else(default_stater_socket_path);

    let platform = macos::platform_version()
        .map_err(|e| format!("failed to probe macOS version: {}", e))?;
    info!(platform = %platform.name, version = %platform.version, "Probed platform version");

    let version_responder = VersionQueryResponder::new(platform);
    let methods = version_responder.methods();
    let responder = MacosVersionResponder {
        responder: version_responder,
        channel: args.channel.clone(),
        inner: Arc::new(RwLock::new(ResponderState::default())),
    };

    // Ensure no stale socket exists
    let _ = std::fs::remove_file(&responder_socket);
    if let Some(parent) = PathBuf::from(&responder_socket).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let listener = tokio::net::UnixListener::bind(&responder_socket)?;
    let incoming = UnixListenerStream::new(listener);

    info!(socket = %responder_socket, "Starting macos-version responder server");

    // Optionally register with the stater service
    if !args.no_register {
        let service_socket_clone = service_socket.clone();
        let responder_socket_clone = responder_socket.clone();
        let channel = args.channel.clone();
        tokio::spawn(async move {
            // small delay to ensure listener is up
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            register_with_stater(
                service_socket_clone,
                responder_socket_clone,
                channel,
                methods,
            )
            .await;
        });
    }

    tonic::transport::Server::builder()
        .add_service(ResponderServiceServer::new(responder))
        .serve_with_incoming(incoming)
        .await?;

    Ok(())
}
