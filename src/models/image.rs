use super::catalog::ImageModel;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiImageRequest {
    pub model: String,
    pub prompt: String,
    pub n: u32,
    pub size: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiImageResponse {
    #[serde(default)]
    pub data: Vec<OpenAiImageData>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiImageData {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepInfraRequest {
    pub input: DeepInfraInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepInfraInput {
    pub prompt: String,
    pub num_outputs: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct DeepInfraResponse {
    #[serde(default)]
    pub output: Vec<String>,
}

/// Image URLs returned by one successful generation, in provider order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    pub request_id: Uuid,
    pub model: ImageModel,
    pub images: Vec<String>,
}

impl GenerationResult {
    /// Groups images into display rows of `per_row`.
    pub fn rows(&self, per_row: usize) -> Vec<&[String]> {
        self.images.chunks(per_row.max(1)).collect()
    }
}
