use super::{decode_reply, ImageProvider};
use crate::{
    config::DeepInfraConfig,
    error::{LumiereError, Result},
    models::{DeepInfraInput, DeepInfraRequest, DeepInfraResponse, SessionState, SDXL_DIMENSION},
    transport::{HttpReply, ProviderRequest},
};

// Same header set the DeepInfra web console sends.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36"),
    ("Accept", "application/json, text/plain, */*"),
    ("Content-Type", "application/json"),
    ("Accept-Language", "en-PH,en-US;q=0.9,en;q=0.8"),
    ("Origin", "https://deepinfra.com"),
    ("Referer", "https://deepinfra.com/"),
    ("Sec-Fetch-Dest", "empty"),
    ("Sec-Fetch-Mode", "cors"),
    ("Sec-Fetch-Site", "same-site"),
    ("sec-ch-ua", "\"Not-A.Brand\";v=\"99\", \"Chromium\";v=\"124\""),
    ("sec-ch-ua-mobile", "?1"),
    ("sec-ch-ua-platform", "Android"),
];

/// Stable Diffusion XL through DeepInfra.
#[derive(Clone)]
pub struct DeepInfraImages {
    endpoint: String,
}

impl DeepInfraImages {
    pub fn new(config: DeepInfraConfig) -> Self {
        Self {
            endpoint: config.endpoint,
        }
    }
}

impl ImageProvider for DeepInfraImages {
    fn name(&self) -> &'static str {
        "DeepInfra"
    }

    fn build_request(&self, state: &SessionState) -> Result<ProviderRequest> {
        let payload = DeepInfraRequest {
            input: DeepInfraInput {
                prompt: state.prompt().to_string(),
                num_outputs: state.image_count(),
                width: SDXL_DIMENSION,
                height: SDXL_DIMENSION,
            },
        };
        let body = serde_json::to_value(&payload)
            .map_err(|e| LumiereError::SerializationError(e.to_string()))?;

        Ok(ProviderRequest {
            url: self.endpoint.clone(),
            headers: BROWSER_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            body,
        })
    }

    fn parse_response(&self, reply: &HttpReply) -> Result<Vec<String>> {
        let response: DeepInfraResponse = decode_reply(self.name(), reply)?;
        if response.output.is_empty() {
            return Err(LumiereError::NoImagesReturned);
        }
        Ok(response.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageModel;

    fn provider() -> DeepInfraImages {
        DeepInfraImages::new(DeepInfraConfig::new())
    }

    #[test]
    fn test_size_is_always_square_1024() {
        for size in ["256x256", "1792x1024", "garbage"] {
            let state = SessionState::new()
                .with_model(ImageModel::Sdxl)
                .with_image_count(2)
                .with_image_size(size);
            let request = provider().build_request(&state).unwrap();
            assert_eq!(request.body["input"]["width"], 1024);
            assert_eq!(request.body["input"]["height"], 1024);
            assert_eq!(request.body["input"]["num_outputs"], 2);
            assert!(request.body.get("size").is_none());
        }
    }

    #[test]
    fn test_browser_headers_and_no_credentials() {
        let request = provider()
            .build_request(&SessionState::new().with_model(ImageModel::Sdxl))
            .unwrap();
        assert_eq!(request.header("origin"), Some("https://deepinfra.com"));
        assert_eq!(request.header("sec-ch-ua-platform"), Some("Android"));
        assert_eq!(request.header("authorization"), None);
    }

    #[test]
    fn test_parse_output_in_order() {
        let reply = HttpReply {
            status: 200,
            body: br#"{"output":["x","y","z"],"inference_status":{"status":"succeeded"}}"#.to_vec(),
        };
        assert_eq!(provider().parse_response(&reply).unwrap(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_parse_failures() {
        let empty = HttpReply {
            status: 200,
            body: br#"{"output":[]}"#.to_vec(),
        };
        assert!(matches!(
            provider().parse_response(&empty),
            Err(LumiereError::NoImagesReturned)
        ));

        let server_error = HttpReply {
            status: 500,
            body: b"internal error".to_vec(),
        };
        assert!(matches!(
            provider().parse_response(&server_error),
            Err(LumiereError::GenerationFailed(_))
        ));
    }
}
