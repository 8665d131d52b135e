use super::{decode_reply, ImageProvider};
use crate::{
    config::OpenAiConfig,
    error::{LumiereError, Result},
    models::{ImageModel, OpenAiImageRequest, OpenAiImageResponse, SessionState},
    transport::{HttpReply, ProviderRequest},
};

/// DALL-E 2 and DALL-E 3 through the OpenAI images endpoint.
#[derive(Clone)]
pub struct OpenAiImages {
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAiImages {
    pub fn new(config: OpenAiConfig) -> Self {
        if config.api_key.is_none() {
            log::warn!("OPENAI_API_KEY is not set, DALL-E requests will be rejected by the provider");
        }
        Self {
            endpoint: config.endpoint,
            api_key: config.api_key,
        }
    }

    fn build_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(key) = &self.api_key {
            headers.push(("Authorization".to_string(), format!("Bearer {}", key)));
        }
        headers
    }
}

impl ImageProvider for OpenAiImages {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn build_request(&self, state: &SessionState) -> Result<ProviderRequest> {
        let model = state.model();
        let n = match model {
            ImageModel::DallE3 => 1,
            ImageModel::DallE2 => state.image_count(),
            ImageModel::Sdxl => {
                return Err(LumiereError::InvalidModel(format!(
                    "{} is not served by OpenAI",
                    model
                )))
            }
        };

        let payload = OpenAiImageRequest {
            model: model.id().to_string(),
            prompt: state.prompt().to_string(),
            n,
            size: state.image_size().to_string(),
        };
        let body = serde_json::to_value(&payload)
            .map_err(|e| LumiereError::SerializationError(e.to_string()))?;

        Ok(ProviderRequest {
            url: self.endpoint.clone(),
            headers: self.build_headers(),
            body,
        })
    }

    fn parse_response(&self, reply: &HttpReply) -> Result<Vec<String>> {
        let response: OpenAiImageResponse = decode_reply(self.name(), reply)?;
        if response.data.is_empty() {
            return Err(LumiereError::NoImagesReturned);
        }
        Ok(response.data.into_iter().map(|image| image.url).collect())
    }
}
