pub mod deepinfra;
pub mod openai;

use crate::{
    error::{LumiereError, Result},
    models::SessionState,
    transport::{HttpReply, ProviderRequest},
};
use serde::de::DeserializeOwned;

pub use deepinfra::DeepInfraImages;
pub use openai::OpenAiImages;

/// One upstream image API: turns a session snapshot into a request and a reply into URLs.
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn build_request(&self, state: &SessionState) -> Result<ProviderRequest>;

    fn parse_response(&self, reply: &HttpReply) -> Result<Vec<String>>;
}

/// Anything but a 200 is a failure; the body is kept for the logs only.
pub(crate) fn decode_reply<T: DeserializeOwned>(provider: &str, reply: &HttpReply) -> Result<T> {
    if reply.status != 200 {
        let snippet: String = String::from_utf8_lossy(&reply.body).chars().take(200).collect();
        log::warn!(
            "{} responded with status {}: {}",
            provider,
            reply.status,
            snippet
        );
        return Err(LumiereError::GenerationFailed(format!(
            "{} responded with status {}",
            provider, reply.status
        )));
    }

    serde_json::from_slice(&reply.body).map_err(|e| {
        LumiereError::GenerationFailed(format!("{} returned an unreadable body: {}", provider, e))
    })
}
