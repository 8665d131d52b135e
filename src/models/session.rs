use super::catalog::ImageModel;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROMPT: &str = "A cute baby sea otter";
pub const DEFAULT_IMAGE_COUNT: u32 = 4;
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

/// Per-session form values. Performs no validation; see [`crate::form`] for clamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    model: ImageModel,
    prompt: String,
    image_count: u32,
    image_size: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            model: ImageModel::DallE2,
            prompt: DEFAULT_PROMPT.to_string(),
            image_count: DEFAULT_IMAGE_COUNT,
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn model(&self) -> ImageModel {
        self.model
    }

    pub fn set_model(&mut self, model: ImageModel) {
        self.model = model;
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    pub fn set_image_count(&mut self, count: u32) {
        self.image_count = count;
    }

    pub fn image_size(&self) -> &str {
        &self.image_size
    }

    pub fn set_image_size(&mut self, size: impl Into<String>) {
        self.image_size = size.into();
    }

    pub fn with_model(mut self, model: ImageModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_image_count(mut self, count: u32) -> Self {
        self.image_count = count;
        self
    }

    pub fn with_image_size(mut self, size: impl Into<String>) -> Self {
        self.image_size = size.into();
        self
    }
}
