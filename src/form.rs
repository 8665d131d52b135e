//! Applies user input to a [`SessionState`] and keeps count and size inside
//! what the selected model accepts.

use crate::{
    error::{LumiereError, Result},
    models::{ImageModel, SessionState},
};
use serde::Deserialize;

/// Raw form fields. Missing or blank fields leave the session value unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormInput {
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub image_count: Option<String>,
    pub image_size: Option<String>,
}

pub fn apply_form(state: &mut SessionState, input: &FormInput) -> Result<()> {
    // Parse first so bad input leaves the state untouched.
    let model = match &input.model {
        Some(name) => Some(name.parse::<ImageModel>()?),
        None => None,
    };
    let count = parse_count(input.image_count.as_deref())?;

    if let Some(model) = model {
        state.set_model(model);
    }
    if let Some(prompt) = &input.prompt {
        state.set_prompt(prompt.clone());
    }
    if let Some(count) = count {
        state.set_image_count(count);
    }
    if let Some(size) = &input.image_size {
        state.set_image_size(size.clone());
    }

    reclamp(state);
    Ok(())
}

fn parse_count(raw: Option<&str>) -> Result<Option<u32>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text
            .parse::<u32>()
            .map(Some)
            .map_err(|_| LumiereError::InvalidImageCount(text.to_string())),
    }
}

/// Pulls count and size back into the current model's allowed ranges.
pub fn reclamp(state: &mut SessionState) {
    let model = state.model();
    let count = model.clamp_count(state.image_count());
    let size = model.clamp_size(state.image_size());
    state.set_image_count(count);
    state.set_image_size(size);
}
