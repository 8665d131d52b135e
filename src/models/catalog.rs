use crate::error::LumiereError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Side length used by SDXL, which does not let the user pick a size.
pub const SDXL_DIMENSION: u32 = 1024;

const DALLE2_SIZES: &[&str] = &["256x256", "512x512", "1024x1024"];
const DALLE3_SIZES: &[&str] = &["1024x1024", "1792x1024", "1024x1792"];
const SDXL_SIZES: &[&str] = &["1024x1024"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageModel {
    #[serde(rename = "dall-e-2")]
    DallE2,
    #[serde(rename = "dall-e-3")]
    DallE3,
    #[serde(rename = "sdxl")]
    Sdxl,
}

/// Which upstream API serves a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    OpenAi,
    DeepInfra,
}

impl ImageModel {
    pub const ALL: [ImageModel; 3] = [ImageModel::DallE2, ImageModel::DallE3, ImageModel::Sdxl];

    pub fn id(&self) -> &'static str {
        match self {
            ImageModel::DallE2 => "dall-e-2",
            ImageModel::DallE3 => "dall-e-3",
            ImageModel::Sdxl => "sdxl",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ImageModel::DallE2 => "DALL-E 2",
            ImageModel::DallE3 => "DALL-E 3",
            ImageModel::Sdxl => "Stable Diffusion XL",
        }
    }

    pub fn family(&self) -> ProviderFamily {
        match self {
            ImageModel::DallE2 | ImageModel::DallE3 => ProviderFamily::OpenAi,
            ImageModel::Sdxl => ProviderFamily::DeepInfra,
        }
    }

    /// Maximum prompt length in characters, if the provider enforces one.
    pub fn max_prompt_chars(&self) -> Option<usize> {
        match self {
            ImageModel::DallE2 => Some(1000),
            ImageModel::DallE3 => Some(4000),
            ImageModel::Sdxl => None,
        }
    }

    pub fn count_range(&self) -> RangeInclusive<u32> {
        match self {
            ImageModel::DallE3 => 1..=1,
            ImageModel::DallE2 | ImageModel::Sdxl => 1..=4,
        }
    }

    pub fn sizes(&self) -> &'static [&'static str] {
        match self {
            ImageModel::DallE2 => DALLE2_SIZES,
            ImageModel::DallE3 => DALLE3_SIZES,
            ImageModel::Sdxl => SDXL_SIZES,
        }
    }

    pub fn size_selectable(&self) -> bool {
        self.sizes().len() > 1
    }

    pub fn clamp_count(&self, count: u32) -> u32 {
        let range = self.count_range();
        count.clamp(*range.start(), *range.end())
    }

    /// Keeps `size` if the model offers it, otherwise falls back to the first offered size.
    pub fn clamp_size(&self, size: &str) -> String {
        let sizes = self.sizes();
        sizes
            .iter()
            .find(|candidate| **candidate == size)
            .unwrap_or(&sizes[0])
            .to_string()
    }

    /// (id, name, provider) triples for listing.
    pub fn supported_models() -> Vec<(&'static str, &'static str, &'static str)> {
        ImageModel::ALL
            .iter()
            .map(|model| {
                let provider = match model.family() {
                    ProviderFamily::OpenAi => "OpenAI",
                    ProviderFamily::DeepInfra => "DeepInfra",
                };
                (model.id(), model.display_name(), provider)
            })
            .collect()
    }
}

impl Default for ImageModel {
    fn default() -> Self {
        ImageModel::DallE2
    }
}

impl fmt::Display for ImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ImageModel {
    type Err = LumiereError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageModel::ALL
            .iter()
            .copied()
            .find(|model| model.id() == s.trim())
            .ok_or_else(|| LumiereError::InvalidModel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parsing() {
        assert_eq!("dall-e-2".parse::<ImageModel>().unwrap(), ImageModel::DallE2);
        assert_eq!(" sdxl ".parse::<ImageModel>().unwrap(), ImageModel::Sdxl);
        assert!(matches!(
            "midjourney".parse::<ImageModel>(),
            Err(LumiereError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_prompt_caps() {
        assert_eq!(ImageModel::DallE2.max_prompt_chars(), Some(1000));
        assert_eq!(ImageModel::DallE3.max_prompt_chars(), Some(4000));
        assert_eq!(ImageModel::Sdxl.max_prompt_chars(), None);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(ImageModel::DallE2.clamp_count(0), 1);
        assert_eq!(ImageModel::DallE2.clamp_count(9), 4);
        assert_eq!(ImageModel::DallE3.clamp_count(4), 1);
        assert_eq!(ImageModel::Sdxl.clamp_count(3), 3);

        assert_eq!(ImageModel::DallE2.clamp_size("512x512"), "512x512");
        assert_eq!(ImageModel::DallE2.clamp_size("1792x1024"), "256x256");
        assert_eq!(ImageModel::DallE3.clamp_size("256x256"), "1024x1024");
        assert_eq!(ImageModel::Sdxl.clamp_size("512x512"), "1024x1024");
        assert!(!ImageModel::Sdxl.size_selectable());
    }

    #[test]
    fn test_serde_ids() {
        let json = serde_json::to_string(&ImageModel::DallE3).unwrap();
        assert_eq!(json, "\"dall-e-3\"");
        assert_eq!(ImageModel::supported_models().len(), 3);
    }
}
