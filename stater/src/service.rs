use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::net::UnixListener;

use crate::call::{CallError, MethodCall, MethodResult};
use crate::proto::{self, *};
use crate::responder::ResponderClient;
use crate::{Error, Result, ResponderInfo};

/// The stater host service.
///
/// Owns the channel registry and dispatches inbound method calls to the
/// responder bound to a channel.
#[derive(Debug)]
pub struct StaterService {
    /// Registered responders, keyed by channel name
    pub(crate) responders: Arc<Mutex<HashMap<String, ResponderInfo>>>,

    /// The socket the service is listening on, once started
    pub(crate) socket_path: Arc<Mutex<Option<PathBuf>>>,
}

impl StaterService {
    /// Create a new stater service with an empty registry.
    pub fn new() -> Self {
        Self {
            responders: Arc::new(Mutex::new(HashMap::new())),
            socket_path: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the service on a Unix socket.
    pub async fn start(&self, socket_path: impl AsRef<Path>) -> Result<()> {
        // Remove the socket file if it already exists
        let socket_path = socket_path.as_ref();
        if socket_path.exists() {
            std::fs::remove_file(socket_path)?;
        }

        {
            let mut current = self.socket_path.lock().unwrap();
            *current = Some(socket_path.to_path_buf());
        }

        // Create the Unix socket listener
        let listener = UnixListener::bind(socket_path)?;
        tracing::info!("Listening on Unix socket: {:?}", socket_path);

        // Accept connections
        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    tracing::debug!("Accepted connection");

                    // Clone the service for the connection handler
                    let service = self.clone();

                    // Spawn a task to handle the connection
                    tokio::spawn(async move {
                        let svc = proto::stater_service_server::StaterServiceServer::new(service);

                        match tonic::transport::Server::builder()
                            .add_service(svc)
                            .serve_with_incoming(futures::stream::iter(vec![
                                Ok::<_, std::io::Error>(stream),
                            ]))
                            .await
                        {
                            Ok(_) => tracing::debug!("Connection handled"),
                            Err(e) => tracing::error!("Error handling connection: {:?}", e),
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Error accepting connection: {:?}", e);
                }
            }
        }
    }

    /// Bind a channel to a responder.
    ///
    /// A later registration for the same channel replaces the earlier one.
    pub fn register_responder(&self, info: ResponderInfo) -> Result<()> {
        let mut responders = self.responders.lock().unwrap();
        if let Some(previous) = responders.insert(info.channel.clone(), info) {
            tracing::info!(
                channel = %previous.channel,
                responder = %previous.id,
                "Replaced previous responder registration"
            );
        }
        Ok(())
    }

    /// Get the responder bound to a channel.
    pub fn get_responder(&self, channel: &str) -> Option<ResponderInfo> {
        let responders = self.responders.lock().unwrap();
        responders.get(channel).cloned()
    }

    /// Get all registered responders.
    pub fn list_responders(&self) -> Vec<ResponderInfo> {
        let responders = self.responders.lock().unwrap();
        responders.values().cloned().collect()
    }

    /// The socket path the service is listening on, once started.
    pub fn service_socket_path(&self) -> Option<PathBuf> {
        let current = self.socket_path.lock().unwrap();
        current.clone()
    }

    /// Dispatch a method call to the responder bound to `channel`.
    pub async fn invoke(&self, channel: &str, call: &MethodCall) -> Result<MethodResult> {
        let info = self.get_responder(channel).ok_or_else(|| {
            Error::Channel(format!("no responder registered for channel: {}", channel))
        })?;

        let mut client = ResponderClient::connect(info.socket_path.clone()).await?;
        client.handle_call(call).await
    }
}

impl Default for StaterService {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StaterService {
    fn clone(&self) -> Self {
        Self {
            responders: Arc::clone(&self.responders),
            socket_path: Arc::clone(&self.socket_path),
        }
    }
}

#[tonic::async_trait]
impl proto::stater_service_server::StaterService for StaterService {
    async fn register_responder(
        &self,
        request: tonic::Request<RegisterResponderRequest>,
    ) -> std::result::Result<tonic::Response<RegisterResponderResponse>, tonic::Status> {
        let req = request.into_inner();

        // A responder may register without an id; assign one and hand it
        // back through the Initialize callback.
        let responder_id = if req.responder_id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            req.responder_id.clone()
        };

        let info = ResponderInfo {
            id: responder_id.clone(),
            name: req.name,
            description: req.description,
            socket_path: req.socket_path.clone(),
            channel: req.channel.clone(),
            methods: req.methods,
            registered_at: chrono::Utc::now(),
        };

        match self.register_responder(info) {
            Ok(_) => {
                tracing::info!(
                    channel = %req.channel,
                    responder = %responder_id,
                    "Registered responder"
                );

                // Hand the responder its identity once its socket is reachable.
                let responder_socket = req.socket_path;
                let service_socket = self
                    .service_socket_path()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                tokio::spawn(async move {
                    match ResponderClient::connect(responder_socket.clone()).await {
                        Ok(mut client) => {
                            if let Err(e) =
                                client.initialize(&responder_id, &service_socket).await
                            {
                                tracing::warn!(error = %e, "Responder initialize failed");
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                socket = %responder_socket,
                                "Could not reach responder for initialize"
                            );
                        }
                    }
                });

                let response = RegisterResponderResponse {
                    success: true,
                    error: "".to_string(),
                };
                Ok(tonic::Response::new(response))
            }
            Err(e) => {
                let response = RegisterResponderResponse {
                    success: false,
                    error: e.to_string(),
                };
                Ok(tonic::Response::new(response))
            }
        }
    }

    async fn list_responders(
        &self,
        _request: tonic::Request<ListRespondersRequest>,
    ) -> std::result::Result<tonic::Response<ListRespondersResponse>, tonic::Status> {
        let responders = self
            .list_responders()
            .into_iter()
            .map(|r| ResponderSummary {
                responder_id: r.id,
                name: r.name,
                description: r.description,
                socket_path: r.socket_path,
                channel: r.channel,
                methods: r.methods,
                registered_at: r.registered_at.timestamp(),
            })
            .collect();

        Ok(tonic::Response::new(ListRespondersResponse { responders }))
    }

    async fn invoke_method(
        &self,
        request: tonic::Request<InvokeMethodRequest>,
    ) -> std::result::Result<tonic::Response<InvokeMethodResponse>, tonic::Status> {
        let req = request.into_inner();

        let mut call = MethodCall::new(req.method);
        if !req.args.is_empty() {
            match serde_json::from_str(&req.args) {
                Ok(value) => call.args = Some(value),
                Err(e) => {
                    let response = InvokeMethodResponse {
                        status: CallStatus::Failed as i32,
                        value: "".to_string(),
                        error: format!("invalid args JSON: {}", e),
                    };
                    return Ok(tonic::Response::new(response));
                }
            }
        }

        let response = match self.invoke(&req.channel, &call).await {
            Ok(Ok(value)) => InvokeMethodResponse {
                status: CallStatus::Ok as i32,
                value,
                error: "".to_string(),
            },
            Ok(Err(err @ CallError::NotImplemented(_))) => InvokeMethodResponse {
                status: CallStatus::NotImplemented as i32,
                value: "".to_string(),
                error: err.to_string(),
            },
            Err(e) => InvokeMethodResponse {
                status: CallStatus::Failed as i32,
                value: "".to_string(),
                error: e.to_string(),
            },
        };

        Ok(tonic::Response::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn info(channel: &str, id: &str) -> ResponderInfo {
        ResponderInfo {
            id: id.to_string(),
            name: format!("{}-responder", channel),
            description: "test responder".to_string(),
            socket_path: format!("/tmp/{}.sock", id),
            channel: channel.to_string(),
            methods: vec!["getPlatformVersion".to_string()],
            registered_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn register_and_lookup() {
        let service = StaterService::new();
        service.register_responder(info("stater", "a")).unwrap();

        let found = service.get_responder("stater").unwrap();
        assert_eq!(found.id, "a");
        assert!(service.get_responder("other").is_none());
        assert_eq!(service.list_responders().len(), 1);
    }

    #[test]
    fn reregistration_replaces_channel_binding() {
        let service = StaterService::new();
        service.register_responder(info("stater", "a")).unwrap();
        service.register_responder(info("stater", "b")).unwrap();

        let found = service.get_responder("stater").unwrap();
        assert_eq!(found.id, "b");
        assert_eq!(service.list_responders().len(), 1);
    }

    #[test]
    fn invoke_without_responder_is_a_channel_error() {
        let service = StaterService::new();
        let call = MethodCall::new("getPlatformVersion");

        let err = tokio_test::block_on(service.invoke("stater", &call)).unwrap_err();
        assert_matches!(err, Error::Channel(_));
    }
}
