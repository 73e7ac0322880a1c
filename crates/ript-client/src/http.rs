//! Gateway URLs and the shared request helper.

use bytes::Bytes;
use reqwest::StatusCode;

use ript_core::RiptError;

/// Absolute URLs of every gateway endpoint the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    origin: String,
    base: String,
}

impl Endpoints {
    pub fn new(origin: &str, base_path: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            base: base_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn join(&self) -> String {
        format!("{}/media/join", self.origin)
    }

    pub fn leave(&self) -> String {
        format!("{}/media/leave", self.origin)
    }

    pub fn trunk_groups(&self) -> String {
        format!("{}{}/providertgs", self.origin, self.base)
    }

    pub fn handlers(&self, tg_id: &str) -> String {
        format!("{}/{}/handlers", self.trunk_groups(), tg_id)
    }

    pub fn calls(&self, tg_id: &str) -> String {
        format!("{}/{}/calls", self.trunk_groups(), tg_id)
    }

    pub fn media(&self, tg_id: &str, call_id: &str) -> String {
        format!("{}/{}/calls/{}/media", self.trunk_groups(), tg_id, call_id)
    }
}

pub(crate) fn transport(e: reqwest::Error) -> RiptError {
    RiptError::TransportFailure(e.to_string())
}

/// 200 is success; 404 means the gateway had nothing for us in time.
pub(crate) fn check_status(status: StatusCode) -> Result<(), RiptError> {
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::NOT_FOUND => Err(RiptError::CorrelationTimeout),
        other => Err(RiptError::UnexpectedStatus(other.as_u16())),
    }
}

/// Send a request and return the body of a 200 response.
pub(crate) async fn exchange(request: reqwest::RequestBuilder) -> Result<Bytes, RiptError> {
    let response = request.send().await.map_err(transport)?;
    check_status(response.status())?;
    response.bytes().await.map_err(transport)
}
