use std::path::Path;

use crate::call::{CallError, MethodCall, MethodResult};
use crate::proto::{self, *};
use crate::{Error, Result};

/// Client for delivering calls to a responder over its Unix socket.
#[derive(Clone)]
pub struct ResponderClient {
    pub(crate) client:
        proto::responder_service_client::ResponderServiceClient<tonic::transport::Channel>,
}

impl ResponderClient {
    /// Connect to a responder's socket.
    pub async fn connect(socket_path: impl AsRef<Path> + 'static) -> Result<Self> {
        let socket_path = socket_path.as_ref().to_path_buf();
        let channel = tonic::transport::Endpoint::from_static("http://[::]:50051")
            .connect_with_connector(tower::service_fn(move |_| {
                let socket_path = socket_path.clone();
                async move {
                    let stream = tokio::net::UnixStream::connect(socket_path).await?;
                    Ok::<_, std::io::Error>(hyper_util::rt::TokioIo::new(stream))
                }
            }))
            .await?;

        let client = proto::responder_service_client::ResponderServiceClient::new(channel);

        Ok(Self { client })
    }

    /// Hand the responder its assigned identity and the service socket path.
    pub async fn initialize(
        &mut self,
        responder_id: &str,
        service_socket_path: &str,
    ) -> Result<()> {
        let request = tonic::Request::new(InitializeRequest {
            responder_id: responder_id.to_string(),
            service_socket_path: service_socket_path.to_string(),
        });

        let response = self.client.initialize(request).await?;
        let response = response.into_inner();

        if response.success {
            Ok(())
        } else {
            Err(Error::Responder(response.error))
        }
    }

    /// Fetch the responder's JSON self-description.
    pub async fn describe(&mut self) -> Result<String> {
        let request = DescribeResponderRequest {};

        let response = self.client.describe_responder(request).await?;
        let response = response.into_inner();

        Ok(response.config)
    }

    /// Deliver one call and translate the wire status back into a result.
    ///
    /// The outer error covers transport and responder failures; the inner
    /// result is the call outcome itself.
    pub async fn handle_call(&mut self, call: &MethodCall) -> Result<MethodResult> {
        let args = match &call.args {
            Some(value) => value.to_string(),
            None => String::new(),
        };
        let request = HandleCallRequest {
            method: call.method.clone(),
            args,
        };

        let response = self.client.handle_call(request).await?;
        let response = response.into_inner();

        match response.status() {
            CallStatus::Ok => Ok(Ok(response.value)),
            CallStatus::NotImplemented => {
                Ok(Err(CallError::NotImplemented(call.method.clone())))
            }
            CallStatus::Failed | CallStatus::Unspecified => {
                Err(Error::Responder(response.error))
            }
        }
    }
}
