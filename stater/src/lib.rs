use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod call;
pub mod responder;
pub mod service;

pub mod proto {
    tonic::include_proto!("stater");
}

pub use call::{CallError, MethodCall, MethodResult};
pub use responder::ResponderClient;
pub use service::StaterService;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),

    #[error(transparent)]
    Rpc(#[from] tonic::Status),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("responder error: {0}")]
    Responder(String),

    #[error("channel error: {0}")]
    Channel(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A responder registered with the service. One responder owns one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub socket_path: String,
    pub channel: String,
    pub methods: Vec<String>,
    pub registered_at: DateTime<Utc>,
}
